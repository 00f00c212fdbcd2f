//! Precision-parameterized numeric wrappers for constant evaluation.
//!
//! Every value carries its width tag (8..=128 bits for integers, 32..=128
//! for floats) and sticky operation flags: overflow, underflow, invalid,
//! divide-by-zero, inexact. Flags set by one operation persist through the
//! ones that follow so the evaluator can report them at the expression that
//! produced the final value.

use std::fmt;

/// Sticky floating-point exception flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FpFlags {
    pub overflow: bool,
    pub underflow: bool,
    pub invalid: bool,
    pub zerodiv: bool,
    pub inexact: bool,
}

impl FpFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn union(self, other: FpFlags) -> FpFlags {
        FpFlags {
            overflow: self.overflow || other.overflow,
            underflow: self.underflow || other.underflow,
            invalid: self.invalid || other.invalid,
            zerodiv: self.zerodiv || other.zerodiv,
            inexact: self.inexact || other.inexact,
        }
    }

    pub fn any(self) -> bool {
        self.overflow || self.underflow || self.invalid || self.zerodiv || self.inexact
    }
}

/// Scoped guard around a single host floating-point operation.
///
/// Rust exposes no portable floating-point environment, so the guard records
/// the operand state on entry and classifies the exception flags by
/// inspecting the result on exit: a NaN from non-NaN operands is `invalid`,
/// an infinity from finite operands is `overflow`, a subnormal non-zero
/// result is `underflow`. Divide-by-zero and inexact outcomes are flagged by
/// the division/narrowing sites that can observe them. Wrapping exactly one
/// primitive per guard keeps flags attributable to the operation that raised
/// them.
#[derive(Debug, Clone, Copy)]
pub struct FeGuard {
    operands_finite: bool,
    operands_nan: bool,
}

impl FeGuard {
    pub fn enter(operands: &[f64]) -> Self {
        Self {
            operands_finite: operands.iter().all(|v| v.is_finite()),
            operands_nan: operands.iter().any(|v| v.is_nan()),
        }
    }

    pub fn harvest(self, result: f64) -> FpFlags {
        let mut flags = FpFlags::none();
        if result.is_nan() && !self.operands_nan {
            flags.invalid = true;
        }
        if result.is_infinite() && self.operands_finite {
            flags.overflow = true;
        }
        if result != 0.0 && result.is_subnormal() {
            flags.underflow = true;
        }
        flags
    }
}

fn uint_mask(bits: u16) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Unsigned fixed-width integer with a sticky overflow bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UintValue {
    bits: u16,
    value: u128,
    overflow: bool,
}

impl UintValue {
    pub fn min_for(_bits: u16) -> u128 {
        0
    }

    pub fn max_for(bits: u16) -> u128 {
        uint_mask(bits)
    }

    pub fn new(bits: u16) -> Self {
        Self {
            bits,
            value: 0,
            overflow: false,
        }
    }

    pub fn with_value(bits: u16, value: u128) -> Self {
        let mut result = Self::new(bits);
        result.set_value(value);
        result
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn set_overflow(&mut self, set: bool) {
        self.overflow = set;
    }

    /// Stores `value` truncated to the width, flagging overflow when the
    /// original does not fit.
    pub fn set_value(&mut self, value: u128) {
        if value > Self::max_for(self.bits) {
            self.overflow = true;
        }
        self.value = value & uint_mask(self.bits);
    }

    /// Retags the width, re-checking the current value against the new range.
    pub fn resize(&mut self, bits: u16) {
        if self.value > Self::max_for(bits) {
            self.overflow = true;
        }
        self.bits = bits;
        self.value &= uint_mask(bits);
    }

    fn binary(self, rhs: UintValue, value: u128, overflowed: bool) -> UintValue {
        let bits = self.bits.max(rhs.bits);
        let mut result = UintValue::new(bits);
        result.overflow = self.overflow || rhs.overflow || overflowed;
        result.set_value(value);
        result
    }

    pub fn add(self, rhs: UintValue) -> UintValue {
        let (value, wrapped) = self.value.overflowing_add(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn sub(self, rhs: UintValue) -> UintValue {
        let (value, wrapped) = self.value.overflowing_sub(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn mul(self, rhs: UintValue) -> UintValue {
        let (value, wrapped) = self.value.overflowing_mul(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn rem(self, rhs: UintValue) -> UintValue {
        // the evaluator rejects zero divisors before reaching this point
        let value = self.value.checked_rem(rhs.value).unwrap_or(0);
        self.binary(rhs, value, rhs.value == 0)
    }

    pub fn shl(self, rhs: UintValue) -> UintValue {
        let shift = rhs.value.min(u128::from(u32::MAX)) as u32;
        let value = self.value.checked_shl(shift).unwrap_or(0);
        let mut result = UintValue::new(self.bits);
        result.overflow = self.overflow || rhs.overflow || shift >= u32::from(self.bits);
        result.set_value(value);
        result
    }

    pub fn shr(self, rhs: UintValue) -> UintValue {
        let shift = rhs.value.min(u128::from(u32::MAX)) as u32;
        let value = self.value.checked_shr(shift).unwrap_or(0);
        let mut result = UintValue::new(self.bits);
        result.overflow = self.overflow || rhs.overflow;
        result.set_value(value);
        result
    }

    pub fn bitand(self, rhs: UintValue) -> UintValue {
        self.binary(rhs, self.value & rhs.value, false)
    }

    pub fn bitor(self, rhs: UintValue) -> UintValue {
        self.binary(rhs, self.value | rhs.value, false)
    }

    pub fn bitxor(self, rhs: UintValue) -> UintValue {
        self.binary(rhs, self.value ^ rhs.value, false)
    }

    pub fn bitnot(self) -> UintValue {
        let mut result = self;
        result.value = !self.value & uint_mask(self.bits);
        result
    }

    /// Unsigned negation flags overflow unconditionally, `-0u` included.
    pub fn neg(self) -> UintValue {
        let mut result = self;
        result.overflow = true;
        result.value = self.value.wrapping_neg() & uint_mask(self.bits);
        result
    }
}

impl fmt::Display for UintValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Signed fixed-width integer in two's complement, with a sticky overflow
/// bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntValue {
    bits: u16,
    value: i128,
    overflow: bool,
}

impl IntValue {
    pub fn min_for(bits: u16) -> i128 {
        if bits >= 128 {
            i128::MIN
        } else {
            -(1i128 << (bits - 1))
        }
    }

    pub fn max_for(bits: u16) -> i128 {
        if bits >= 128 {
            i128::MAX
        } else {
            (1i128 << (bits - 1)) - 1
        }
    }

    pub fn new(bits: u16) -> Self {
        Self {
            bits,
            value: 0,
            overflow: false,
        }
    }

    pub fn with_value(bits: u16, value: i128) -> Self {
        let mut result = Self::new(bits);
        result.set_value(value);
        result
    }

    pub fn from_unsigned(u: UintValue) -> Self {
        let mut result = Self::new(u.bits());
        result.overflow = u.overflow();
        if u.value() > Self::max_for(u.bits()) as u128 {
            result.overflow = true;
        }
        result.value = truncate_signed(u.value() as i128, u.bits());
        result
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn value(&self) -> i128 {
        self.value
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }

    pub fn set_overflow(&mut self, set: bool) {
        self.overflow = set;
    }

    pub fn set_value(&mut self, value: i128) {
        if value < Self::min_for(self.bits) || value > Self::max_for(self.bits) {
            self.overflow = true;
        }
        self.value = truncate_signed(value, self.bits);
    }

    pub fn resize(&mut self, bits: u16) {
        if self.value < Self::min_for(bits) || self.value > Self::max_for(bits) {
            self.overflow = true;
        }
        self.bits = bits;
        self.value = truncate_signed(self.value, bits);
    }

    fn binary(self, rhs: IntValue, value: i128, overflowed: bool) -> IntValue {
        let bits = self.bits.max(rhs.bits);
        let mut result = IntValue::new(bits);
        result.overflow = self.overflow || rhs.overflow || overflowed;
        result.set_value(value);
        result
    }

    pub fn add(self, rhs: IntValue) -> IntValue {
        let (value, wrapped) = self.value.overflowing_add(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn sub(self, rhs: IntValue) -> IntValue {
        let (value, wrapped) = self.value.overflowing_sub(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn mul(self, rhs: IntValue) -> IntValue {
        let (value, wrapped) = self.value.overflowing_mul(rhs.value);
        self.binary(rhs, value, wrapped)
    }

    pub fn rem(self, rhs: IntValue) -> IntValue {
        let value = self.value.checked_rem(rhs.value).unwrap_or(0);
        self.binary(rhs, value, rhs.value == 0)
    }

    pub fn shl(self, rhs: IntValue) -> IntValue {
        let shift = rhs.value.clamp(0, i128::from(u32::MAX)) as u32;
        let value = self.value.checked_shl(shift).unwrap_or(0);
        let mut result = IntValue::new(self.bits);
        result.overflow = self.overflow || rhs.overflow || shift >= u32::from(self.bits);
        result.set_value(value);
        result
    }

    pub fn shr(self, rhs: IntValue) -> IntValue {
        let shift = rhs.value.clamp(0, i128::from(u32::MAX)) as u32;
        let value = self.value.checked_shr(shift).unwrap_or(0);
        let mut result = IntValue::new(self.bits);
        result.overflow = self.overflow || rhs.overflow;
        result.set_value(value);
        result
    }

    pub fn bitand(self, rhs: IntValue) -> IntValue {
        self.binary(rhs, self.value & rhs.value, false)
    }

    pub fn bitor(self, rhs: IntValue) -> IntValue {
        self.binary(rhs, self.value | rhs.value, false)
    }

    pub fn bitxor(self, rhs: IntValue) -> IntValue {
        self.binary(rhs, self.value ^ rhs.value, false)
    }

    pub fn bitnot(self) -> IntValue {
        let mut result = self;
        result.value = truncate_signed(!self.value, self.bits);
        result
    }

    pub fn neg(self) -> IntValue {
        // MIN has no positive counterpart at the same width
        let (value, wrapped) = self.value.overflowing_neg();
        let mut result = IntValue::new(self.bits);
        result.overflow = self.overflow || wrapped || self.value == Self::min_for(self.bits);
        result.set_value(value);
        result
    }
}

fn truncate_signed(value: i128, bits: u16) -> i128 {
    if bits >= 128 {
        value
    } else {
        let shift = 128 - u32::from(bits);
        (value << shift) >> shift
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Host-float value with an advisory precision tag and sticky flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatValue {
    bits: u16,
    value: f64,
    flags: FpFlags,
}

impl FloatValue {
    pub fn min_for(bits: u16) -> f64 {
        match bits {
            32 => f64::from(f32::MIN),
            _ => f64::MIN,
        }
    }

    pub fn max_for(bits: u16) -> f64 {
        match bits {
            32 => f64::from(f32::MAX),
            _ => f64::MAX,
        }
    }

    pub fn new(bits: u16) -> Self {
        Self {
            bits,
            value: 0.0,
            flags: FpFlags::none(),
        }
    }

    pub fn with_value(bits: u16, value: f64) -> Self {
        let mut result = Self::new(bits);
        result.value = value;
        result
    }

    pub fn infinity(bits: u16) -> Self {
        Self::with_value(bits, f64::INFINITY)
    }

    pub fn nan(bits: u16) -> Self {
        Self::with_value(bits, f64::NAN)
    }

    pub fn from_signed(i: IntValue) -> Self {
        let mut result = Self::new(i.bits().max(32));
        result.value = i.value() as f64;
        result
    }

    pub fn from_unsigned(u: UintValue) -> Self {
        let mut result = Self::new(u.bits().max(32));
        result.value = u.value() as f64;
        result
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn flags(&self) -> FpFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: FpFlags) {
        self.flags = flags;
    }

    pub fn resize(&mut self, bits: u16) {
        if bits == 32 && self.value.is_finite() {
            let narrowed = self.value as f32;
            if f64::from(narrowed) != self.value {
                self.flags.inexact = true;
            }
            if narrowed.is_infinite() {
                self.flags.overflow = true;
            }
        }
        self.bits = bits;
    }

    fn binary(self, rhs: FloatValue, value: f64, extra: FpFlags) -> FloatValue {
        FloatValue {
            bits: self.bits.max(rhs.bits),
            value,
            flags: self.flags.union(rhs.flags).union(extra),
        }
    }

    pub fn add(self, rhs: FloatValue) -> FloatValue {
        let guard = FeGuard::enter(&[self.value, rhs.value]);
        let value = self.value + rhs.value;
        self.binary(rhs, value, guard.harvest(value))
    }

    pub fn sub(self, rhs: FloatValue) -> FloatValue {
        let guard = FeGuard::enter(&[self.value, rhs.value]);
        let value = self.value - rhs.value;
        self.binary(rhs, value, guard.harvest(value))
    }

    pub fn mul(self, rhs: FloatValue) -> FloatValue {
        let guard = FeGuard::enter(&[self.value, rhs.value]);
        let value = self.value * rhs.value;
        self.binary(rhs, value, guard.harvest(value))
    }

    pub fn div(self, rhs: FloatValue) -> FloatValue {
        let guard = FeGuard::enter(&[self.value, rhs.value]);
        let value = self.value / rhs.value;
        let mut extra = guard.harvest(value);
        if rhs.value == 0.0 && self.value.is_finite() && self.value != 0.0 {
            extra.zerodiv = true;
            extra.overflow = false;
        }
        if value.is_finite() && rhs.value != 0.0 && value * rhs.value != self.value {
            extra.inexact = true;
        }
        self.binary(rhs, value, extra)
    }

    pub fn pow(self, rhs: FloatValue) -> FloatValue {
        let guard = FeGuard::enter(&[self.value, rhs.value]);
        let value = self.value.powf(rhs.value);
        self.binary(rhs, value, guard.harvest(value))
    }

    pub fn neg(self) -> FloatValue {
        FloatValue {
            bits: self.bits,
            value: -self.value,
            flags: self.flags,
        }
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Exact rational stored in lowest terms with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RationalValue {
    num: IntValue,
    den: IntValue,
}

fn gcd(x: i128, y: i128) -> i128 {
    if y == 0 {
        let magnitude = x.unsigned_abs();
        if magnitude > i128::MAX as u128 {
            i128::MAX
        } else {
            magnitude as i128
        }
    } else {
        gcd(y, x % y)
    }
}

/// Product that records saturation instead of panicking; rationals at the
/// widest precision can overflow the host carrier.
fn mul_tracked(a: i128, b: i128, overflowed: &mut bool) -> i128 {
    match a.checked_mul(b) {
        Some(product) => product,
        None => {
            *overflowed = true;
            a.saturating_mul(b)
        }
    }
}

fn add_tracked(a: i128, b: i128, overflowed: &mut bool) -> i128 {
    match a.checked_add(b) {
        Some(sum) => sum,
        None => {
            *overflowed = true;
            a.saturating_add(b)
        }
    }
}

fn sub_tracked(a: i128, b: i128, overflowed: &mut bool) -> i128 {
    match a.checked_sub(b) {
        Some(difference) => difference,
        None => {
            *overflowed = true;
            a.saturating_sub(b)
        }
    }
}

impl RationalValue {
    /// `bits` is the rational width; numerator and denominator each take
    /// half of it.
    pub fn new(bits: u16) -> Self {
        Self {
            num: IntValue::with_value(bits / 2, 0),
            den: IntValue::with_value(bits / 2, 1),
        }
    }

    pub fn from_parts(num: IntValue, den: IntValue) -> Self {
        let bits = num.bits().max(den.bits());
        let mut result = Self::new(bits * 2);
        result.assign(num.value(), den.value());
        if den.value() == 0 {
            result.num.set_overflow(true);
        }
        if num.overflow() || den.overflow() {
            result.num.set_overflow(true);
        }
        result
    }

    pub fn from_signed(i: IntValue) -> Self {
        let mut result = Self::new(i.bits() * 2);
        result.num = IntValue::with_value(i.bits(), i.value());
        result.num.set_overflow(i.overflow());
        result.den = IntValue::with_value(i.bits(), 1);
        result
    }

    pub fn from_unsigned(u: UintValue) -> Self {
        Self::from_signed(IntValue::from_unsigned(u))
    }

    /// Bounded continued-fraction approximation of a host float.
    pub fn from_float(f: FloatValue, max_denominator: i128) -> Self {
        let mut result = Self::new((f.bits() * 2).min(256));
        let (num, den) = approximate(f.value(), max_denominator);
        result.assign(num, den);
        if !f.value().is_finite() {
            result.num.set_overflow(true);
        }
        result
    }

    fn assign(&mut self, num: i128, den: i128) {
        let divisor = gcd(num, den);
        let (mut num, mut den) = if divisor != 0 {
            (num / divisor, den / divisor)
        } else {
            (num, den.max(1))
        };
        if den < 0 {
            num = -num;
            den = -den;
        }
        self.num.set_value(num);
        self.den.set_value(den.max(1));
    }

    pub fn numerator(&self) -> IntValue {
        self.num
    }

    pub fn denominator(&self) -> IntValue {
        self.den
    }

    pub fn bits(&self) -> u16 {
        self.num.bits() * 2
    }

    pub fn overflow(&self) -> bool {
        self.num.overflow() || self.den.overflow()
    }

    /// Real projection, used when a rational meets a float.
    pub fn real(&self) -> FloatValue {
        FloatValue::with_value(
            self.num.bits().max(32),
            self.num.value() as f64 / self.den.value() as f64,
        )
    }

    pub fn resize(&mut self, bits: u16) {
        self.num.resize(bits / 2);
        self.den.resize(bits / 2);
    }

    fn combine(self, rhs: RationalValue, num: i128, den: i128, overflowed: bool) -> RationalValue {
        let mut result = RationalValue::new(self.bits().max(rhs.bits()));
        result.assign(num, den);
        if overflowed || self.overflow() || rhs.overflow() {
            result.num.set_overflow(true);
        }
        result
    }

    pub fn add(self, rhs: RationalValue) -> RationalValue {
        let mut overflowed = false;
        let left = mul_tracked(self.num.value(), rhs.den.value(), &mut overflowed);
        let right = mul_tracked(rhs.num.value(), self.den.value(), &mut overflowed);
        let num = add_tracked(left, right, &mut overflowed);
        let den = mul_tracked(self.den.value(), rhs.den.value(), &mut overflowed);
        self.combine(rhs, num, den, overflowed)
    }

    pub fn sub(self, rhs: RationalValue) -> RationalValue {
        let mut overflowed = false;
        let left = mul_tracked(self.num.value(), rhs.den.value(), &mut overflowed);
        let right = mul_tracked(rhs.num.value(), self.den.value(), &mut overflowed);
        let num = sub_tracked(left, right, &mut overflowed);
        let den = mul_tracked(self.den.value(), rhs.den.value(), &mut overflowed);
        self.combine(rhs, num, den, overflowed)
    }

    pub fn mul(self, rhs: RationalValue) -> RationalValue {
        let mut overflowed = false;
        let num = mul_tracked(self.num.value(), rhs.num.value(), &mut overflowed);
        let den = mul_tracked(self.den.value(), rhs.den.value(), &mut overflowed);
        self.combine(rhs, num, den, overflowed)
    }

    pub fn div(self, rhs: RationalValue) -> RationalValue {
        let mut overflowed = false;
        let num = mul_tracked(self.num.value(), rhs.den.value(), &mut overflowed);
        let den = mul_tracked(self.den.value(), rhs.num.value(), &mut overflowed);
        let mut result = self.combine(rhs, num, den, overflowed);
        if rhs.num.value() == 0 {
            result.num.set_overflow(true);
        }
        result
    }

    pub fn neg(self) -> RationalValue {
        let mut result = self;
        result.num.set_value(-result.num.value());
        result
    }

    /// Cross-multiplied comparison.
    pub fn cmp_value(&self, rhs: &RationalValue) -> std::cmp::Ordering {
        let left = self.num.value().saturating_mul(rhs.den.value());
        let right = rhs.num.value().saturating_mul(self.den.value());
        left.cmp(&right)
    }

    pub fn eq_value(&self, rhs: &RationalValue) -> bool {
        self.cmp_value(rhs) == std::cmp::Ordering::Equal
    }
}

impl fmt::Display for RationalValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.num.value(), self.den.value())
    }
}

/// Continued-fraction approximation of `real`, denominator bounded by
/// `max_denominator`.
fn approximate(real: f64, max_denominator: i128) -> (i128, i128) {
    if !real.is_finite() {
        return (0, 1);
    }
    if max_denominator <= 1 {
        return (real as i128, 1);
    }

    let negative = real < 0.0;
    let mut x = real.abs();
    let (mut h, mut h_prev) = (1i128, 0i128);
    let (mut k, mut k_prev) = (0i128, 1i128);

    for _ in 0..64 {
        let a = x.floor();
        if a >= i128::MAX as f64 {
            break;
        }
        let a_int = a as i128;

        let h_next = a_int.saturating_mul(h).saturating_add(h_prev);
        let k_next = a_int.saturating_mul(k).saturating_add(k_prev);
        if k_next > max_denominator {
            break;
        }
        h_prev = h;
        h = h_next;
        k_prev = k;
        k = k_next;

        let frac = x - a;
        if frac < 1e-12 {
            break;
        }
        x = 1.0 / frac;
    }

    if k == 0 {
        return (0, 1);
    }
    if negative {
        (-h, k)
    } else {
        (h, k)
    }
}

/// Complex value as a pair of host floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexValue {
    re: FloatValue,
    im: FloatValue,
}

impl ComplexValue {
    /// `bits` is the complex width; each component takes half of it.
    pub fn new(bits: u16) -> Self {
        Self {
            re: FloatValue::new(bits / 2),
            im: FloatValue::new(bits / 2),
        }
    }

    pub fn from_parts(re: FloatValue, im: FloatValue) -> Self {
        Self { re, im }
    }

    pub fn from_real(re: FloatValue) -> Self {
        Self {
            re,
            im: FloatValue::new(re.bits()),
        }
    }

    pub fn from_signed(i: IntValue) -> Self {
        Self::from_real(FloatValue::from_signed(i))
    }

    pub fn from_unsigned(u: UintValue) -> Self {
        Self::from_real(FloatValue::from_unsigned(u))
    }

    pub fn real(&self) -> FloatValue {
        self.re
    }

    pub fn imag(&self) -> FloatValue {
        self.im
    }

    pub fn set_imag(&mut self, im: FloatValue) {
        self.im = im;
    }

    pub fn bits(&self) -> u16 {
        self.re.bits() * 2
    }

    pub fn flags(&self) -> FpFlags {
        self.re.flags().union(self.im.flags())
    }

    pub fn resize(&mut self, bits: u16) {
        self.re.resize(bits / 2);
        self.im.resize(bits / 2);
    }

    pub fn add(self, rhs: ComplexValue) -> ComplexValue {
        ComplexValue {
            re: self.re.add(rhs.re),
            im: self.im.add(rhs.im),
        }
    }

    pub fn sub(self, rhs: ComplexValue) -> ComplexValue {
        ComplexValue {
            re: self.re.sub(rhs.re),
            im: self.im.sub(rhs.im),
        }
    }

    pub fn mul(self, rhs: ComplexValue) -> ComplexValue {
        // (a+bi)(c+di) = (ac - bd) + (ad + bc)i
        let re = self.re.mul(rhs.re).sub(self.im.mul(rhs.im));
        let im = self.re.mul(rhs.im).add(self.im.mul(rhs.re));
        ComplexValue { re, im }
    }

    pub fn div(self, rhs: ComplexValue) -> ComplexValue {
        let denom = rhs.re.mul(rhs.re).add(rhs.im.mul(rhs.im));
        let re = self.re.mul(rhs.re).add(self.im.mul(rhs.im)).div(denom);
        let im = self.im.mul(rhs.re).sub(self.re.mul(rhs.im)).div(denom);
        ComplexValue { re, im }
    }

    /// Complex power via the polar form.
    pub fn pow(self, rhs: ComplexValue) -> ComplexValue {
        let bits = self.re.bits().max(rhs.re.bits());
        let (a, b) = (self.re.value(), self.im.value());
        let (c, d) = (rhs.re.value(), rhs.im.value());

        let guard = FeGuard::enter(&[a, b, c, d]);
        let modulus = (a * a + b * b).sqrt();
        let argument = b.atan2(a);
        let log_mod = modulus.ln();
        let magnitude = (c * log_mod - d * argument).exp();
        let angle = d * log_mod + c * argument;
        let re_value = magnitude * angle.cos();
        let im_value = magnitude * angle.sin();
        let flags = guard.harvest(re_value).union(guard.harvest(im_value));

        let mut re = FloatValue::with_value(bits, re_value);
        re.set_flags(self.flags().union(rhs.flags()).union(flags));
        let im = FloatValue::with_value(bits, im_value);
        ComplexValue { re, im }
    }

    pub fn neg(self) -> ComplexValue {
        ComplexValue {
            re: self.re.neg(),
            im: self.im.neg(),
        }
    }

    pub fn eq_value(&self, rhs: &ComplexValue) -> bool {
        self.re.value() == rhs.re.value() && self.im.value() == rhs.im.value()
    }
}

impl fmt::Display for ComplexValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.im.value() < 0.0 {
            write!(f, "{}{}i", self.re.value(), self.im.value())
        } else {
            write!(f, "{}+{}i", self.re.value(), self.im.value())
        }
    }
}

/// Width of the host machine word, for `usize`/`isize`.
pub fn word_bits() -> u16 {
    usize::BITS as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_overflow_sticky() {
        let a = UintValue::with_value(8, 255);
        let b = UintValue::with_value(8, 1);
        let sum = a.add(b);
        assert!(sum.overflow());

        // flag persists through a later operation
        let later = sum.add(UintValue::with_value(8, 0));
        assert!(later.overflow());
    }

    #[test]
    fn test_uint_in_range() {
        let a = UintValue::with_value(8, 200);
        let b = UintValue::with_value(8, 55);
        let sum = a.add(b);
        assert_eq!(sum.value(), 255);
        assert!(!sum.overflow());
    }

    #[test]
    fn test_int_extremes() {
        assert_eq!(IntValue::min_for(8), -128);
        assert_eq!(IntValue::max_for(8), 127);
        assert_eq!(IntValue::min_for(16), -32768);
        assert_eq!(IntValue::max_for(16), 32767);
        assert_eq!(UintValue::max_for(8), 255);
        assert_eq!(UintValue::max_for(16), 65535);
    }

    #[test]
    fn test_int_negation_of_min_overflows() {
        let min = IntValue::with_value(8, -128);
        let negated = min.neg();
        assert!(negated.overflow());
    }

    #[test]
    fn test_unsigned_negation_always_overflows() {
        assert!(UintValue::with_value(32, 0).neg().overflow());
        assert!(UintValue::with_value(32, 5).neg().overflow());
    }

    #[test]
    fn test_mixed_width_promotes() {
        let a = IntValue::with_value(8, 100);
        let b = IntValue::with_value(32, 100_000);
        let sum = a.add(b);
        assert_eq!(sum.bits(), 32);
        assert_eq!(sum.value(), 100_100);
        assert!(!sum.overflow());
    }

    #[test]
    fn test_rational_lowest_terms() {
        let r = RationalValue::from_parts(
            IntValue::with_value(32, 10),
            IntValue::with_value(32, 4),
        );
        assert_eq!(r.numerator().value(), 5);
        assert_eq!(r.denominator().value(), 2);
    }

    #[test]
    fn test_rational_denominator_positive() {
        let r = RationalValue::from_parts(
            IntValue::with_value(32, 3),
            IntValue::with_value(32, -6),
        );
        assert_eq!(r.numerator().value(), -1);
        assert_eq!(r.denominator().value(), 2);
    }

    #[test]
    fn test_rational_arithmetic() {
        let half = RationalValue::from_parts(
            IntValue::with_value(32, 1),
            IntValue::with_value(32, 2),
        );
        let third = RationalValue::from_parts(
            IntValue::with_value(32, 1),
            IntValue::with_value(32, 3),
        );
        let sum = half.add(third);
        assert_eq!(sum.numerator().value(), 5);
        assert_eq!(sum.denominator().value(), 6);

        let product = half.mul(third);
        assert_eq!(product.numerator().value(), 1);
        assert_eq!(product.denominator().value(), 6);
    }

    #[test]
    fn test_rational_cross_multiplied_equality() {
        let a = RationalValue::from_parts(
            IntValue::with_value(32, 2),
            IntValue::with_value(32, 4),
        );
        let b = RationalValue::from_parts(
            IntValue::with_value(64, 1),
            IntValue::with_value(64, 2),
        );
        assert!(a.eq_value(&b));
    }

    #[test]
    fn test_rational_from_float() {
        let r = RationalValue::from_float(FloatValue::with_value(64, 0.25), 1000);
        assert_eq!(r.numerator().value(), 1);
        assert_eq!(r.denominator().value(), 4);

        let r = RationalValue::from_float(FloatValue::with_value(64, -1.5), 1000);
        assert_eq!(r.numerator().value(), -3);
        assert_eq!(r.denominator().value(), 2);
    }

    #[test]
    fn test_float_zerodiv() {
        let one = FloatValue::with_value(64, 1.0);
        let zero = FloatValue::with_value(64, 0.0);
        let q = one.div(zero);
        assert!(q.flags().zerodiv);
    }

    #[test]
    fn test_float_invalid() {
        let zero = FloatValue::with_value(64, 0.0);
        let q = zero.div(zero);
        assert!(q.flags().invalid);
    }

    #[test]
    fn test_float_overflow() {
        let big = FloatValue::with_value(64, f64::MAX);
        let doubled = big.mul(FloatValue::with_value(64, 2.0));
        assert!(doubled.flags().overflow);
    }

    #[test]
    fn test_float_inexact_division() {
        let one = FloatValue::with_value(64, 1.0);
        let three = FloatValue::with_value(64, 3.0);
        assert!(one.div(three).flags().inexact);

        let four = FloatValue::with_value(64, 4.0);
        let two = FloatValue::with_value(64, 2.0);
        assert!(!four.div(two).flags().inexact);
    }

    #[test]
    fn test_complex_multiplication() {
        // (1 + 2i)(3 + 4i) = -5 + 10i
        let a = ComplexValue::from_parts(
            FloatValue::with_value(32, 1.0),
            FloatValue::with_value(32, 2.0),
        );
        let b = ComplexValue::from_parts(
            FloatValue::with_value(32, 3.0),
            FloatValue::with_value(32, 4.0),
        );
        let p = a.mul(b);
        assert_eq!(p.real().value(), -5.0);
        assert_eq!(p.imag().value(), 10.0);
    }

    #[test]
    fn test_determinism() {
        let compute = || {
            let a = FloatValue::with_value(64, 1.0);
            let b = FloatValue::with_value(64, 3.0);
            a.div(b)
        };
        let first = compute();
        let second = compute();
        assert_eq!(first.value(), second.value());
        assert_eq!(first.flags(), second.flags());
    }
}
