//! Constant values produced by the compile-time evaluator.
//!
//! A value is a pure descriptor: a type id plus a tagged payload. Numeric
//! payloads carry their precision and sticky flags (see `numeric`); aggregate
//! payloads recurse.

use crate::numeric::{ComplexValue, FloatValue, IntValue, RationalValue, UintValue};
use crate::types::{TypeId, TypeKind, TypeTable};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Unknown,
    Bool(bool),
    /// Unicode scalar.
    Char(char),
    /// Byte content for both `chars` views and owned `string`s; the type id
    /// tells them apart.
    Text(String),
    Int(IntValue),
    Uint(UintValue),
    Rational(RationalValue),
    Float(FloatValue),
    Complex(ComplexValue),
    /// Tuple or array elements in order.
    Seq(Vec<ConstValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstValue {
    pub ty: TypeId,
    pub payload: Payload,
}

impl ConstValue {
    pub fn unknown(types: &TypeTable) -> Self {
        Self {
            ty: types.unknown(),
            payload: Payload::Unknown,
        }
    }

    pub fn boolean(types: &TypeTable, value: bool) -> Self {
        Self {
            ty: types.boolean(),
            payload: Payload::Bool(value),
        }
    }

    pub fn character(types: &TypeTable, value: char) -> Self {
        Self {
            ty: types.character(),
            payload: Payload::Char(value),
        }
    }

    pub fn chars(types: &TypeTable, value: impl Into<String>) -> Self {
        Self {
            ty: types.chars(),
            payload: Payload::Text(value.into()),
        }
    }

    pub fn string(types: &TypeTable, value: impl Into<String>) -> Self {
        Self {
            ty: types.string(),
            payload: Payload::Text(value.into()),
        }
    }

    pub fn signed(types: &TypeTable, value: IntValue) -> Self {
        Self {
            ty: types.sint(value.bits()),
            payload: Payload::Int(value),
        }
    }

    pub fn unsigned(types: &TypeTable, value: UintValue) -> Self {
        Self {
            ty: types.uint(value.bits()),
            payload: Payload::Uint(value),
        }
    }

    pub fn rational(types: &TypeTable, value: RationalValue) -> Self {
        Self {
            ty: types.rational(value.bits()),
            payload: Payload::Rational(value),
        }
    }

    pub fn float(types: &TypeTable, value: FloatValue) -> Self {
        Self {
            ty: types.floating(value.bits()),
            payload: Payload::Float(value),
        }
    }

    pub fn complex(types: &TypeTable, value: ComplexValue) -> Self {
        Self {
            ty: types.complex(value.bits()),
            payload: Payload::Complex(value),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.payload, Payload::Unknown)
    }

    /// The unsigned projection of an integer payload, used for sizes and
    /// indices.
    pub fn as_index(&self) -> Option<u128> {
        match &self.payload {
            Payload::Uint(u) => Some(u.value()),
            Payload::Int(i) if i.value() >= 0 => Some(i.value() as u128),
            _ => None,
        }
    }

    /// True when any sticky numeric flag that makes the value unusable is
    /// set.
    pub fn overflowed(&self) -> bool {
        match &self.payload {
            Payload::Int(i) => i.overflow(),
            Payload::Uint(u) => u.overflow(),
            Payload::Rational(r) => r.overflow(),
            Payload::Float(f) => f.flags().overflow,
            Payload::Complex(c) => c.flags().overflow,
            _ => false,
        }
    }

    /// Order-insensitive structural fingerprint used to deduplicate generic
    /// instantiations.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_payload(&mut hasher);
        hasher.finish()
    }

    fn hash_payload<H: Hasher>(&self, state: &mut H) {
        match &self.payload {
            Payload::Unknown => 0u8.hash(state),
            Payload::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Payload::Char(c) => {
                2u8.hash(state);
                c.hash(state);
            }
            Payload::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Payload::Int(i) => {
                4u8.hash(state);
                i.value().hash(state);
            }
            Payload::Uint(u) => {
                5u8.hash(state);
                u.value().hash(state);
            }
            Payload::Rational(r) => {
                6u8.hash(state);
                r.numerator().value().hash(state);
                r.denominator().value().hash(state);
            }
            Payload::Float(f) => {
                7u8.hash(state);
                f.value().to_bits().hash(state);
            }
            Payload::Complex(c) => {
                8u8.hash(state);
                c.real().value().to_bits().hash(state);
                c.imag().value().to_bits().hash(state);
            }
            Payload::Seq(values) => {
                9u8.hash(state);
                values.len().hash(state);
                for value in values {
                    value.hash_payload(state);
                }
            }
        }
    }

    /// Human-readable rendering for diagnostics.
    pub fn render(&self, types: &TypeTable) -> String {
        match &self.payload {
            Payload::Unknown => "_".to_string(),
            Payload::Bool(b) => b.to_string(),
            Payload::Char(c) => format!("'{}'", c),
            Payload::Text(s) => match types.kind(self.ty) {
                TypeKind::Str => format!("\"{}\"s", s),
                _ => format!("\"{}\"", s),
            },
            Payload::Int(i) => format!("{}i{}", i.value(), i.bits()),
            Payload::Uint(u) => format!("{}u{}", u.value(), u.bits()),
            Payload::Rational(r) => r.to_string(),
            Payload::Float(f) => format!("{}f{}", f.value(), f.bits()),
            Payload::Complex(c) => c.to_string(),
            Payload::Seq(values) => {
                let (open, close) = match types.kind(self.ty) {
                    TypeKind::Array { .. } => ('[', ']'),
                    _ => ('(', ')'),
                };
                let mut out = String::new();
                out.push(open);
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(out, ", ");
                    }
                    let _ = write!(out, "{}", value.render(types));
                }
                out.push(close);
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::IntValue;
    use crate::types::TypeTable;

    #[test]
    fn test_fingerprint_distinguishes_values() {
        let types = TypeTable::new();
        let five = ConstValue::signed(&types, IntValue::with_value(32, 5));
        let six = ConstValue::signed(&types, IntValue::with_value(32, 6));
        assert_ne!(five.fingerprint(), six.fingerprint());

        let five_again = ConstValue::signed(&types, IntValue::with_value(32, 5));
        assert_eq!(five.fingerprint(), five_again.fingerprint());
    }

    #[test]
    fn test_render() {
        let types = TypeTable::new();
        assert_eq!(
            ConstValue::signed(&types, IntValue::with_value(32, 7)).render(&types),
            "7i32"
        );
        assert_eq!(ConstValue::string(&types, "hi").render(&types), "\"hi\"s");
        assert_eq!(ConstValue::chars(&types, "hi").render(&types), "\"hi\"");
    }

    #[test]
    fn test_as_index() {
        let types = TypeTable::new();
        let value = ConstValue::signed(&types, IntValue::with_value(32, 3));
        assert_eq!(value.as_index(), Some(3));
        let negative = ConstValue::signed(&types, IntValue::with_value(32, -1));
        assert_eq!(negative.as_index(), None);
    }
}
