//! Compile-time constant evaluator.
//!
//! A recursive, value-returning walk over the expression subset that is
//! legal in constant context: literals, constant and type-metadata
//! references, arithmetic, bitwise and logical operators, comparisons,
//! conversions, member and index access, and tuple/array construction.
//! Everything else is rejected with a structured diagnostic.
//!
//! Outcomes are explicit: `Ok(value)`, `NeedsGeneric` (an operand depends on
//! an unbound generic parameter, so the checker retries after substitution),
//! or `Reported` (a diagnostic was already published).

use crate::checker::{Checker, Interrupt};
use crate::numeric::{ComplexValue, FloatValue, IntValue, RationalValue, UintValue};
use crate::types::{TypeId, TypeKind};
use crate::value::{ConstValue, Payload};
use nemesis_ast::{BinaryOp, Decl, Expr, ExprId, Literal, Span, UnaryOp};
use nemesis_diagnostics::{codes, Diagnostic};

/// Non-value outcomes of constant evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalInterrupt {
    /// A diagnostic was already published.
    Reported,
    /// The expression depends on an unbound generic parameter; retry after
    /// substitution.
    NeedsGeneric,
}

pub type EvalResult = Result<ConstValue, EvalInterrupt>;

impl From<Interrupt> for EvalInterrupt {
    fn from(_: Interrupt) -> Self {
        EvalInterrupt::Reported
    }
}

const CONST_EXPR_EXPLANATION: &str = "only numbers, characters, strings, tuples and arrays are \
     allowed inside constant expressions: arithmetic, comparisons, `as` conversions, string \
     concatenation, and tuple or array access";

impl Checker {
    /// Evaluates `expr` in constant context.
    pub fn evaluate(&mut self, expr: ExprId) -> EvalResult {
        // a value stored by substitution or an earlier pass wins
        if let Some(value) = &self.expr_note(expr).value {
            if !value.is_unknown() {
                return Ok(value.clone());
            }
        }
        if self.expr_note(expr).invalid {
            return Err(EvalInterrupt::Reported);
        }

        let node = self.ast.expr(expr).clone();
        match node {
            Expr::Literal { lit, span } => self.eval_literal(&lit, &span),
            Expr::Ident { name, generics, span } => {
                if !generics.is_empty() {
                    self.error(
                        codes::CONST_NOT_CONSTANT,
                        "generic symbols cannot be used directly in constant expressions",
                        &span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                self.eval_identifier(expr, &name, &span)
            }
            Expr::Paren { inner, .. } => self.evaluate(inner),
            Expr::Tuple { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                let mut component_types = Vec::with_capacity(elements.len());
                for element in elements {
                    let value = self.evaluate(element)?;
                    component_types.push(value.ty);
                    values.push(value);
                }
                let ty = self.types.tuple(component_types);
                Ok(ConstValue {
                    ty,
                    payload: Payload::Seq(values),
                })
            }
            Expr::Array { elements, .. } => {
                if elements.is_empty() {
                    return Ok(ConstValue::unknown(&self.types));
                }
                let mut values = Vec::with_capacity(elements.len());
                for element in &elements {
                    values.push(self.evaluate(*element)?);
                }
                let elem_ty = values[0].ty;
                let ty = self.types.array(elem_ty, values.len() as u64);
                Ok(ConstValue {
                    ty,
                    payload: Payload::Seq(values),
                })
            }
            Expr::ArraySized { value, size, span } => {
                let value = self.evaluate(value)?;
                let size = self.evaluate(size)?;
                let Some(count) = size.as_index() else {
                    self.error(
                        codes::CONST_NOT_CONSTANT,
                        "array repetition count must be a non-negative integer",
                        &span,
                    );
                    return Err(EvalInterrupt::Reported);
                };
                if count > u128::from(u32::MAX) {
                    self.error(
                        codes::CONST_OUT_OF_RANGE,
                        format!("array repetition count {} is too large", count),
                        &span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                let values = vec![value.clone(); count as usize];
                let ty = self.types.array(value.ty, count as u64);
                Ok(ConstValue {
                    ty,
                    payload: Payload::Seq(values),
                })
            }
            Expr::Member { object, member, span } => self.eval_member(object, member, &span),
            Expr::Index { object, index, span } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.eval_index(&object, &index, &span)
            }
            Expr::TupleIndex { object, index, span } => {
                let object = self.evaluate(object)?;
                let value = ConstValue::unsigned(
                    &self.types,
                    UintValue::with_value(crate::numeric::word_bits(), u128::from(index)),
                );
                self.eval_index(&object, &value, &span)
            }
            Expr::Unary { op, operand, span } => {
                let operand = self.evaluate(operand)?;
                self.eval_unary(op, operand, &span)
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.eval_binary(op, left, right, &span)
            }
            Expr::Cast { value, target, span } => {
                let value = self.evaluate(value)?;
                let target = self.resolve_type_expr(target).map_err(EvalInterrupt::from)?;
                self.eval_cast(value, target, &span)
            }
            Expr::Range { span, .. } => {
                self.reject_in_const("ranges", &span)
            }
            Expr::Call { span, .. } => self.reject_in_const("function calls", &span),
            Expr::Lambda { span, .. } => self.reject_in_const("anonymous functions", &span),
            Expr::RecordInit { span, .. } => {
                self.reject_in_const("record constructions", &span)
            }
            Expr::Block { span, .. } => self.reject_in_const("blocks", &span),
            Expr::If { span, .. } => self.reject_in_const("`if` expressions", &span),
            Expr::When { span, .. } => self.reject_in_const("`when` expressions", &span),
            Expr::ForIn { span, .. } | Expr::Loop { span, .. } => {
                self.reject_in_const("loops", &span)
            }
            Expr::Is { span, .. } => self.reject_in_const("type tests", &span),
        }
    }

    /// Literal evaluation for pattern positions, where `NeedsGeneric` can
    /// never occur.
    pub(crate) fn eval_literal_in_pattern(
        &mut self,
        lit: &Literal,
        span: &Span,
    ) -> Option<ConstValue> {
        self.eval_literal(lit, span).ok()
    }

    fn reject_in_const(&mut self, what: &str, span: &Span) -> EvalResult {
        let diag = Diagnostic::error(
            codes::CONST_NOT_CONSTANT,
            format!("{} cannot be used in constant expressions", what),
            span.clone(),
        )
        .with_explanation(CONST_EXPR_EXPLANATION);
        self.publish(diag);
        Err(EvalInterrupt::Reported)
    }

    // Literals

    fn eval_literal(&mut self, lit: &Literal, span: &Span) -> EvalResult {
        match lit {
            Literal::Bool(value) => Ok(ConstValue::boolean(&self.types, *value)),
            Literal::Integer(lexeme) => Ok(self.parse_integer(lexeme)),
            Literal::Real(lexeme) => Ok(self.parse_real(lexeme)),
            Literal::Imaginary(lexeme) => Ok(self.parse_imaginary(lexeme)),
            Literal::Char(lexeme) => match decode_char(lexeme) {
                Some(c) => Ok(ConstValue::character(&self.types, c)),
                None => {
                    self.error(
                        codes::CONST_INVALID,
                        format!("invalid character literal `{}`", lexeme),
                        span,
                    );
                    Err(EvalInterrupt::Reported)
                }
            },
            Literal::Text { value, owned } => {
                let decoded = decode_text(value);
                if *owned {
                    Ok(ConstValue::string(&self.types, decoded))
                } else {
                    Ok(ConstValue::chars(&self.types, decoded))
                }
            }
        }
    }

    /// Parses an integer lexeme with optional base prefix and width suffix.
    /// Out-of-range text sets the overflow flag rather than failing.
    fn parse_integer(&self, lexeme: &str) -> ConstValue {
        let (digits, signed, bits) = match lexeme.find(|c| c == 'u' || c == 'i') {
            Some(at) => {
                let suffix = &lexeme[at..];
                let signed = suffix.starts_with('i');
                let bits: u16 = match &suffix[1..] {
                    "" | "size" => crate::numeric::word_bits(),
                    rest => rest.parse().unwrap_or(32),
                };
                (&lexeme[..at], signed, bits)
            }
            None => (lexeme, true, 32),
        };

        let (radix, body) = match digits.get(..2) {
            Some("0x") => (16, &digits[2..]),
            Some("0o") => (8, &digits[2..]),
            Some("0b") => (2, &digits[2..]),
            _ => (10, digits),
        };
        let body = body.replace('_', "");

        if signed {
            let mut value = IntValue::new(bits);
            match i128::from_str_radix(&body, radix) {
                Ok(parsed) => value.set_value(parsed),
                Err(_) => value.set_overflow(true),
            }
            ConstValue::signed(&self.types, value)
        } else {
            let mut value = UintValue::new(bits);
            match u128::from_str_radix(&body, radix) {
                Ok(parsed) => value.set_value(parsed),
                Err(_) => value.set_overflow(true),
            }
            ConstValue::unsigned(&self.types, value)
        }
    }

    fn parse_real(&self, lexeme: &str) -> ConstValue {
        let (digits, bits) = match lexeme.find('f') {
            Some(at) => {
                let bits: u16 = lexeme[at + 1..].parse().unwrap_or(32);
                (&lexeme[..at], bits)
            }
            None => (lexeme, 32),
        };

        let mut value = FloatValue::new(bits);
        match digits.replace('_', "").parse::<f64>() {
            Ok(parsed) => value = FloatValue::with_value(bits, parsed),
            Err(_) => {
                let mut flags = value.flags();
                flags.invalid = true;
                value.set_flags(flags);
            }
        }
        ConstValue::float(&self.types, value)
    }

    fn parse_imaginary(&self, lexeme: &str) -> ConstValue {
        let digits = lexeme.strip_suffix('i').unwrap_or(lexeme);
        let mut imag = FloatValue::new(32);
        match digits.parse::<f64>() {
            Ok(parsed) => imag = FloatValue::with_value(32, parsed),
            Err(_) => {
                let mut flags = imag.flags();
                flags.invalid = true;
                imag.set_flags(flags);
            }
        }
        let mut complex = ComplexValue::new(64);
        complex.set_imag(imag);
        ConstValue::complex(&self.types, complex)
    }

    // Identifiers

    fn eval_identifier(&mut self, expr: ExprId, name: &str, span: &Span) -> EvalResult {
        // a bare builtin type name is a type reference, not a value; member
        // access handles it before evaluating the object
        if self.types.builtin(name).is_some() {
            self.error(
                codes::CONST_NOT_CONSTANT,
                format!("`{}` is a type, not a constant value", name),
                span,
            );
            return Err(EvalInterrupt::Reported);
        }

        let decl = match self.expr_note(expr).referenced.or_else(|| self.resolve_name(name)) {
            Some(decl) => decl,
            None => {
                self.unresolved(name, span);
                return Err(EvalInterrupt::Reported);
            }
        };

        if self.expr_note(expr).is_parametric {
            return Err(EvalInterrupt::NeedsGeneric);
        }

        match self.ast.decl(decl).clone() {
            Decl::GenericConstParam { .. } => Err(EvalInterrupt::NeedsGeneric),
            Decl::Const { .. } => {
                let value = self.resolve_constant_on_demand(decl, span)?;
                Ok(value)
            }
            Decl::ConstTupled { names, .. } => {
                let tuple = self.resolve_constant_on_demand(decl, span)?;
                let index = names.iter().position(|n| n == name);
                match (index, &tuple.payload) {
                    (Some(index), Payload::Seq(values)) if index < values.len() => {
                        Ok(values[index].clone())
                    }
                    _ => {
                        self.error(
                            codes::CONST_NOT_CONSTANT,
                            format!("`{}` does not name a component of its tuple initializer", name),
                            span,
                        );
                        Err(EvalInterrupt::Reported)
                    }
                }
            }
            Decl::Var { span: decl_span, .. } | Decl::VarTupled { span: decl_span, .. } => {
                let diag = Diagnostic::error(
                    codes::CONST_NOT_CONSTANT,
                    "variables cannot be read inside constant expressions",
                    span.clone(),
                )
                .with_highlight(span.clone(), Some("expected constant".to_string()))
                .with_note(
                    decl_span.clone(),
                    format!("`{}` is not declared as a constant", name),
                );
                self.publish(diag);
                Err(EvalInterrupt::Reported)
            }
            Decl::Param { span: decl_span, .. } => {
                let diag = Diagnostic::error(
                    codes::CONST_NOT_CONSTANT,
                    "parameters cannot be read inside constant expressions",
                    span.clone(),
                )
                .with_note(
                    decl_span.clone(),
                    format!("`{}` is a run-time parameter", name),
                );
                self.publish(diag);
                Err(EvalInterrupt::Reported)
            }
            _ => {
                self.error(
                    codes::CONST_NOT_CONSTANT,
                    format!("`{}` does not name a constant", name),
                    span,
                );
                Err(EvalInterrupt::Reported)
            }
        }
    }

    /// Resolves a constant declaration the first time it is referenced,
    /// with cycle detection, and returns its stored value. Routing through
    /// `check_constant_decl` keeps declared-type coercion in one place.
    fn resolve_constant_on_demand(&mut self, decl: nemesis_ast::DeclId, span: &Span) -> EvalResult {
        if self.const_stack.contains(&decl) {
            self.report_cycle(decl, span);
            return Err(EvalInterrupt::Reported);
        }
        if let Some(cached) = &self.decl_note(decl).value {
            return Ok(cached.clone());
        }
        if self.decl_note(decl).invalid {
            return Err(EvalInterrupt::Reported);
        }

        self.const_stack.push(decl);
        let checked = self.check_constant_decl(decl);
        self.const_stack.pop();
        checked.map_err(EvalInterrupt::from)?;

        match self.decl_note(decl).value.clone() {
            Some(value) => Ok(value),
            // the initializer still depends on an unbound generic parameter
            None => Err(EvalInterrupt::NeedsGeneric),
        }
    }

    // Member access: type metadata and value members

    fn eval_member(&mut self, object: ExprId, member: ExprId, span: &Span) -> EvalResult {
        let member_name = match self.ast.expr(member).clone() {
            Expr::Ident { name, generics, span } => {
                if !generics.is_empty() {
                    self.error(
                        codes::CONST_NOT_CONSTANT,
                        "generic symbols cannot be used in constant expressions",
                        &span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                name
            }
            other => {
                let span = other.span().clone();
                self.error(
                    codes::CONST_NOT_CONSTANT,
                    "expected a member name",
                    &span,
                );
                return Err(EvalInterrupt::Reported);
            }
        };

        // `i32.MAX`, `f64.INFINITY`, ... — the object is a type name
        if let Expr::Ident { name, .. } = self.ast.expr(object) {
            if let Some(builtin) = self.types.builtin(name) {
                return self.eval_type_metadata(builtin, &member_name, span);
            }
        }

        // `util.VALUE` — a constant qualified through a workspace import
        if let Expr::Ident { name: head, .. } = self.ast.expr(object).clone() {
            if let Some(head_decl) = self.resolve_name(&head) {
                if matches!(self.ast.decl(head_decl), Decl::Use { .. }) {
                    if let Some(target) = self.resolve_member_in(head_decl, &member_name) {
                        if matches!(
                            self.ast.decl(target),
                            Decl::Const { .. } | Decl::ConstTupled { .. }
                        ) {
                            if self.decl_note(target).value.is_none() {
                                let home =
                                    self.decl_note(target).scope.unwrap_or(self.scope);
                                self.in_existing_scope(home, |c| c.check_constant_decl(target))
                                    .map_err(EvalInterrupt::from)?;
                            }
                            if let Some(value) = self.decl_note(target).value.clone() {
                                return Ok(value);
                            }
                        }
                    }
                    self.error(
                        codes::CONST_NOT_CONSTANT,
                        format!("`{}.{}` does not name a constant", head, member_name),
                        span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
            }
        }

        let object = self.evaluate(object)?;
        self.eval_value_member(&object, &member_name, span)
    }

    /// Metadata lookup shared with the expression checker.
    pub(crate) fn eval_type_metadata_entry(
        &mut self,
        ty: TypeId,
        item: &str,
        span: &Span,
    ) -> EvalResult {
        self.eval_type_metadata(ty, item, span)
    }

    /// Compile-time metadata constants attached to primitive types.
    fn eval_type_metadata(&mut self, ty: TypeId, item: &str, span: &Span) -> EvalResult {
        let word = crate::numeric::word_bits();
        match self.types.kind(ty).clone() {
            TypeKind::Integer { bits, signed } => match item {
                "BITS" => Ok(ConstValue::unsigned(
                    &self.types,
                    UintValue::with_value(word, u128::from(bits)),
                )),
                "MIN" => {
                    if signed {
                        Ok(ConstValue::signed(
                            &self.types,
                            IntValue::with_value(bits, IntValue::min_for(bits)),
                        ))
                    } else {
                        Ok(ConstValue::unsigned(
                            &self.types,
                            UintValue::with_value(bits, UintValue::min_for(bits)),
                        ))
                    }
                }
                "MAX" => {
                    if signed {
                        Ok(ConstValue::signed(
                            &self.types,
                            IntValue::with_value(bits, IntValue::max_for(bits)),
                        ))
                    } else {
                        Ok(ConstValue::unsigned(
                            &self.types,
                            UintValue::with_value(bits, UintValue::max_for(bits)),
                        ))
                    }
                }
                _ => self.unknown_metadata(ty, item, span),
            },
            TypeKind::Rational { bits } | TypeKind::Complex { bits } => match item {
                "BITS" => Ok(ConstValue::unsigned(
                    &self.types,
                    UintValue::with_value(word, u128::from(bits)),
                )),
                _ => self.unknown_metadata(ty, item, span),
            },
            TypeKind::Float { bits } => match item {
                "BITS" => Ok(ConstValue::unsigned(
                    &self.types,
                    UintValue::with_value(word, u128::from(bits)),
                )),
                "MIN" => Ok(ConstValue::float(
                    &self.types,
                    FloatValue::with_value(bits, FloatValue::min_for(bits)),
                )),
                "MAX" => Ok(ConstValue::float(
                    &self.types,
                    FloatValue::with_value(bits, FloatValue::max_for(bits)),
                )),
                "INFINITY" => Ok(ConstValue::float(&self.types, FloatValue::infinity(bits))),
                "NAN" => Ok(ConstValue::float(&self.types, FloatValue::nan(bits))),
                _ => self.unknown_metadata(ty, item, span),
            },
            _ => self.unknown_metadata(ty, item, span),
        }
    }

    fn unknown_metadata(&mut self, ty: TypeId, item: &str, span: &Span) -> EvalResult {
        let ty = self.types.display(ty, &self.ast);
        self.error(
            codes::NO_SUCH_MEMBER,
            format!("type `{}` has no constant `{}`", ty, item),
            span,
        );
        Err(EvalInterrupt::Reported)
    }

    /// Members readable on constant values: rational parts, complex parts,
    /// aggregate and text sizes.
    fn eval_value_member(&mut self, object: &ConstValue, item: &str, span: &Span) -> EvalResult {
        let word = crate::numeric::word_bits();
        match (&object.payload, item) {
            (Payload::Rational(r), "numerator") => {
                Ok(ConstValue::signed(&self.types, r.numerator()))
            }
            (Payload::Rational(r), "denominator") => {
                Ok(ConstValue::signed(&self.types, r.denominator()))
            }
            (Payload::Complex(c), "real") => Ok(ConstValue::float(&self.types, c.real())),
            (Payload::Complex(c), "imaginary") => Ok(ConstValue::float(&self.types, c.imag())),
            (Payload::Seq(values), "size") => Ok(ConstValue::unsigned(
                &self.types,
                UintValue::with_value(word, values.len() as u128),
            )),
            (Payload::Text(s), "size") => Ok(ConstValue::unsigned(
                &self.types,
                UintValue::with_value(word, s.len() as u128),
            )),
            (Payload::Text(s), "length") => Ok(ConstValue::unsigned(
                &self.types,
                UintValue::with_value(word, s.chars().count() as u128),
            )),
            _ => {
                let ty = self.types.display(object.ty, &self.ast);
                self.error(
                    codes::NO_SUCH_MEMBER,
                    format!("value of type `{}` has no member `{}` in constant context", ty, item),
                    span,
                );
                Err(EvalInterrupt::Reported)
            }
        }
    }

    fn eval_index(&mut self, object: &ConstValue, index: &ConstValue, span: &Span) -> EvalResult {
        let Payload::Seq(values) = &object.payload else {
            let ty = self.types.display(object.ty, &self.ast);
            self.error(
                codes::CONST_NOT_CONSTANT,
                format!("value of type `{}` cannot be indexed in constant context", ty),
                span,
            );
            return Err(EvalInterrupt::Reported);
        };

        let Some(at) = index.as_index() else {
            self.error(
                codes::CONST_OUT_OF_RANGE,
                "index must be a non-negative integer",
                span,
            );
            return Err(EvalInterrupt::Reported);
        };

        if at as usize >= values.len() {
            self.error(
                codes::CONST_OUT_OF_RANGE,
                format!(
                    "index {} is out of range for a sequence of {} elements",
                    at,
                    values.len()
                ),
                span,
            );
            return Err(EvalInterrupt::Reported);
        }

        Ok(values[at as usize].clone())
    }

    // Unary operators

    fn eval_unary(&mut self, op: UnaryOp, operand: ConstValue, span: &Span) -> EvalResult {
        let operand_ty = operand.ty;
        let result = match op {
            UnaryOp::Plus => match &operand.payload {
                Payload::Int(_) | Payload::Uint(_) | Payload::Rational(_) | Payload::Float(_)
                | Payload::Complex(_) => operand,
                _ => ConstValue::unknown(&self.types),
            },
            UnaryOp::Minus => match &operand.payload {
                Payload::Int(i) => ConstValue::signed(&self.types, i.neg()),
                // negating an unsigned value always flags overflow, `-0u`
                // included
                Payload::Uint(u) => ConstValue::signed(&self.types, {
                    let mut negated = IntValue::from_unsigned(*u);
                    negated = negated.neg();
                    negated.set_overflow(true);
                    negated
                }),
                Payload::Rational(r) => ConstValue::rational(&self.types, r.neg()),
                Payload::Float(f) => ConstValue::float(&self.types, f.neg()),
                Payload::Complex(c) => ConstValue::complex(&self.types, c.neg()),
                _ => ConstValue::unknown(&self.types),
            },
            UnaryOp::BitNot => match &operand.payload {
                Payload::Int(i) => ConstValue::signed(&self.types, i.bitnot()),
                Payload::Uint(u) => ConstValue::unsigned(&self.types, u.bitnot()),
                _ => ConstValue::unknown(&self.types),
            },
            UnaryOp::Not => match &operand.payload {
                Payload::Bool(b) => ConstValue::boolean(&self.types, !b),
                _ => ConstValue::unknown(&self.types),
            },
            UnaryOp::AddrOf => {
                return self.reject_in_const("address-of operations", span);
            }
            UnaryOp::Deref => {
                return self.reject_in_const("dereference operations", span);
            }
        };

        if result.is_unknown() {
            let ty = self.types.display(operand_ty, &self.ast);
            self.error(
                codes::CONST_INVALID,
                format!("unary `{}` cannot be applied to `{}`", op.symbol(), ty),
                span,
            );
            return Err(EvalInterrupt::Reported);
        }

        self.check_operation(span, unary_operation_name(op), &result)?;
        Ok(result)
    }

    // Binary operators

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: ConstValue,
        right: ConstValue,
        span: &Span,
    ) -> EvalResult {
        match op {
            BinaryOp::Add => {
                if let Some(text) = self.try_text_concat(&left, &right) {
                    return Ok(text);
                }
                let result = self.arithmetic(op, &left, &right, span)?;
                self.check_operation(span, "addition", &result)?;
                Ok(result)
            }
            BinaryOp::Sub => {
                let result = self.arithmetic(op, &left, &right, span)?;
                self.check_operation(span, "subtraction", &result)?;
                Ok(result)
            }
            BinaryOp::Mul => {
                let result = self.arithmetic(op, &left, &right, span)?;
                self.check_operation(span, "multiplication", &result)?;
                Ok(result)
            }
            BinaryOp::Div => {
                let result = self.arithmetic(op, &left, &right, span)?;
                self.check_operation(span, "division", &result)?;
                Ok(result)
            }
            BinaryOp::Pow => {
                let result = self.power(&left, &right, span)?;
                self.check_operation(span, "power", &result)?;
                Ok(result)
            }
            BinaryOp::Rem => {
                let result = self.modulus(&left, &right, span)?;
                self.check_operation(span, "modulus", &result)?;
                Ok(result)
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                let result = self.shift(op, &left, &right, span)?;
                self.check_operation(span, "shift", &result)?;
                Ok(result)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                self.bitwise(op, &left, &right, span)
            }
            BinaryOp::And | BinaryOp::Or => match (&left.payload, &right.payload) {
                (Payload::Bool(l), Payload::Bool(r)) => Ok(ConstValue::boolean(
                    &self.types,
                    if op == BinaryOp::And { *l && *r } else { *l || *r },
                )),
                _ => self.binary_type_error(op, &left, &right, span),
            },
            BinaryOp::Eq | BinaryOp::Ne => {
                let equal = self.values_equal(&left, &right, span)?;
                Ok(ConstValue::boolean(
                    &self.types,
                    if op == BinaryOp::Eq { equal } else { !equal },
                ))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = self.values_compare(&left, &right, span)?;
                let verdict = match op {
                    BinaryOp::Lt => ordering == std::cmp::Ordering::Less,
                    BinaryOp::Le => ordering != std::cmp::Ordering::Greater,
                    BinaryOp::Gt => ordering == std::cmp::Ordering::Greater,
                    _ => ordering != std::cmp::Ordering::Less,
                };
                Ok(ConstValue::boolean(&self.types, verdict))
            }
        }
    }

    /// `char`/`chars`/`string` concatenation always promotes to an owned
    /// string.
    fn try_text_concat(&self, left: &ConstValue, right: &ConstValue) -> Option<ConstValue> {
        let text = |value: &ConstValue| -> Option<String> {
            match &value.payload {
                Payload::Char(c) => Some(c.to_string()),
                Payload::Text(s) => Some(s.clone()),
                _ => None,
            }
        };
        // two chars are not concatenation, and two numbers are arithmetic
        let textual = |value: &ConstValue| matches!(value.payload, Payload::Text(_));
        if !textual(left) && !textual(right) {
            return None;
        }
        Some(ConstValue::string(&self.types, text(left)? + &text(right)?))
    }

    /// Mixed-type arithmetic with the promotion matrix: result width is the
    /// max of the operand widths, integers lift to rationals at twice their
    /// width, rationals collapse against floats at half of theirs, anything
    /// against a complex lifts to complex. Integer division produces an
    /// exact rational at twice the max input width.
    fn arithmetic(
        &mut self,
        op: BinaryOp,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> EvalResult {
        use Payload::*;

        let value = match (&left.payload, &right.payload) {
            // integer ∘ integer
            (Int(_), Int(_)) | (Int(_), Uint(_)) | (Uint(_), Int(_)) | (Uint(_), Uint(_)) => {
                if op == BinaryOp::Div {
                    let (lnum, rnum) = (as_signed(&left.payload), as_signed(&right.payload));
                    if rnum.value() == 0 {
                        return self.divide_by_zero(span);
                    }
                    let bits = 2 * lnum.bits().max(rnum.bits());
                    let mut rational = RationalValue::from_parts(lnum, rnum);
                    rational.resize(bits.min(256));
                    ConstValue::rational(&self.types, rational)
                } else if op != BinaryOp::Sub && matches!((&left.payload, &right.payload), (Uint(_), Uint(_))) {
                    // two unsigned operands stay unsigned (subtraction is
                    // always signed)
                    let (l, r) = match (&left.payload, &right.payload) {
                        (Uint(l), Uint(r)) => (*l, *r),
                        _ => return Err(EvalInterrupt::Reported),
                    };
                    let result = match op {
                        BinaryOp::Add => l.add(r),
                        _ => l.mul(r),
                    };
                    ConstValue::unsigned(&self.types, result)
                } else {
                    let (l, r) = (as_signed(&left.payload), as_signed(&right.payload));
                    let result = match op {
                        BinaryOp::Add => l.add(r),
                        BinaryOp::Sub => l.sub(r),
                        _ => l.mul(r),
                    };
                    ConstValue::signed(&self.types, result)
                }
            }

            // integer ∘ rational and rational ∘ integer
            (Int(_) | Uint(_), Rational(r)) => {
                let l = RationalValue::from_signed(as_signed(&left.payload));
                let bits = (2 * int_bits(&left.payload)).max(r.bits()).min(256);
                self.rational_result(op, l, *r, bits, span)?
            }
            (Rational(l), Int(_) | Uint(_)) => {
                let r = RationalValue::from_signed(as_signed(&right.payload));
                let bits = l.bits().max(2 * int_bits(&right.payload)).min(256);
                self.rational_result(op, *l, r, bits, span)?
            }

            // integer ∘ float and float ∘ integer
            (Int(_) | Uint(_), Float(r)) => {
                let l = FloatValue::from_signed(as_signed(&left.payload));
                let bits = int_bits(&left.payload).max(r.bits()).clamp(32, 128);
                self.float_result(op, l, *r, bits, span)?
            }
            (Float(l), Int(_) | Uint(_)) => {
                let r = FloatValue::from_signed(as_signed(&right.payload));
                let bits = l.bits().max(int_bits(&right.payload)).clamp(32, 128);
                self.float_result(op, *l, r, bits, span)?
            }

            // integer ∘ complex and complex ∘ integer
            (Int(_) | Uint(_), Complex(r)) => {
                let l = ComplexValue::from_signed(as_signed(&left.payload));
                let bits = (2 * int_bits(&left.payload)).max(r.bits()).clamp(64, 256);
                self.complex_result(op, l, *r, bits)?
            }
            (Complex(l), Int(_) | Uint(_)) => {
                let r = ComplexValue::from_signed(as_signed(&right.payload));
                let bits = l.bits().max(2 * int_bits(&right.payload)).clamp(64, 256);
                self.complex_result(op, *l, r, bits)?
            }

            // rational ∘ rational
            (Rational(l), Rational(r)) => {
                let bits = l.bits().max(r.bits());
                self.rational_result(op, *l, *r, bits, span)?
            }

            // rational ∘ float and float ∘ rational
            (Rational(l), Float(r)) => {
                let bits = (l.bits() / 2).max(r.bits()).clamp(32, 128);
                self.float_result(op, l.real(), *r, bits, span)?
            }
            (Float(l), Rational(r)) => {
                let bits = l.bits().max(r.bits() / 2).clamp(32, 128);
                self.float_result(op, *l, r.real(), bits, span)?
            }

            // rational ∘ complex and complex ∘ rational
            (Rational(l), Complex(r)) => {
                let bits = l.bits().max(r.bits()).clamp(64, 256);
                self.complex_result(op, ComplexValue::from_real(l.real()), *r, bits)?
            }
            (Complex(l), Rational(r)) => {
                let bits = l.bits().max(r.bits()).clamp(64, 256);
                self.complex_result(op, *l, ComplexValue::from_real(r.real()), bits)?
            }

            // float ∘ float
            (Float(l), Float(r)) => {
                let bits = l.bits().max(r.bits());
                self.float_result(op, *l, *r, bits, span)?
            }

            // float ∘ complex and complex ∘ float
            (Float(l), Complex(r)) => {
                let bits = (2 * l.bits()).max(r.bits()).clamp(64, 256);
                self.complex_result(op, ComplexValue::from_real(*l), *r, bits)?
            }
            (Complex(l), Float(r)) => {
                let bits = l.bits().max(2 * r.bits()).clamp(64, 256);
                self.complex_result(op, *l, ComplexValue::from_real(*r), bits)?
            }

            // complex ∘ complex
            (Complex(l), Complex(r)) => {
                let bits = l.bits().max(r.bits());
                self.complex_result(op, *l, *r, bits)?
            }

            _ => return self.binary_type_error(op, left, right, span),
        };

        Ok(value)
    }

    fn rational_result(
        &mut self,
        op: BinaryOp,
        l: RationalValue,
        r: RationalValue,
        bits: u16,
        span: &Span,
    ) -> EvalResult {
        if op == BinaryOp::Div && r.numerator().value() == 0 {
            return self.divide_by_zero(span);
        }
        let mut result = match op {
            BinaryOp::Add => l.add(r),
            BinaryOp::Sub => l.sub(r),
            BinaryOp::Mul => l.mul(r),
            _ => l.div(r),
        };
        result.resize(bits);
        Ok(ConstValue::rational(&self.types, result))
    }

    fn float_result(
        &mut self,
        op: BinaryOp,
        l: FloatValue,
        r: FloatValue,
        bits: u16,
        span: &Span,
    ) -> EvalResult {
        if op == BinaryOp::Div && r.value() == 0.0 {
            return self.divide_by_zero(span);
        }
        let mut result = match op {
            BinaryOp::Add => l.add(r),
            BinaryOp::Sub => l.sub(r),
            BinaryOp::Mul => l.mul(r),
            _ => l.div(r),
        };
        result.resize(bits);
        Ok(ConstValue::float(&self.types, result))
    }

    fn complex_result(
        &mut self,
        op: BinaryOp,
        l: ComplexValue,
        r: ComplexValue,
        bits: u16,
    ) -> EvalResult {
        let mut result = match op {
            BinaryOp::Add => l.add(r),
            BinaryOp::Sub => l.sub(r),
            BinaryOp::Mul => l.mul(r),
            _ => l.div(r),
        };
        result.resize(bits);
        Ok(ConstValue::complex(&self.types, result))
    }

    /// `**` always yields a float, or a complex when either operand is
    /// complex.
    fn power(&mut self, left: &ConstValue, right: &ConstValue, span: &Span) -> EvalResult {
        use Payload::*;

        let to_float = |payload: &Payload| -> Option<(FloatValue, u16)> {
            match payload {
                Int(_) | Uint(_) => {
                    let signed = as_signed(payload);
                    Some((FloatValue::from_signed(signed), int_bits(payload)))
                }
                Rational(r) => Some((r.real(), r.bits() / 2)),
                Float(f) => Some((*f, f.bits())),
                _ => None,
            }
        };

        let to_complex = |payload: &Payload| -> Option<(ComplexValue, u16)> {
            match payload {
                Complex(c) => Some((*c, c.bits())),
                other => to_float(other).map(|(f, bits)| (ComplexValue::from_real(f), 2 * bits)),
            }
        };

        if matches!(left.payload, Complex(_)) || matches!(right.payload, Complex(_)) {
            let (Some((l, lbits)), Some((r, rbits))) =
                (to_complex(&left.payload), to_complex(&right.payload))
            else {
                return self.binary_type_error(BinaryOp::Pow, left, right, span);
            };
            let bits = lbits.max(rbits).clamp(64, 256);
            let mut result = l.pow(r);
            result.resize(bits);
            return Ok(ConstValue::complex(&self.types, result));
        }

        let (Some((l, lbits)), Some((r, rbits))) =
            (to_float(&left.payload), to_float(&right.payload))
        else {
            return self.binary_type_error(BinaryOp::Pow, left, right, span);
        };
        let bits = lbits.max(rbits).clamp(32, 128);
        let mut result = l.pow(r);
        result.resize(bits);
        Ok(ConstValue::float(&self.types, result))
    }

    /// Integer modulus: both operands must be integers with a nonzero
    /// divisor.
    fn modulus(&mut self, left: &ConstValue, right: &ConstValue, span: &Span) -> EvalResult {
        use Payload::*;
        match (&left.payload, &right.payload) {
            (Uint(l), Uint(r)) => {
                if r.value() == 0 {
                    return self.divide_by_zero(span);
                }
                Ok(ConstValue::unsigned(&self.types, l.rem(*r)))
            }
            (Int(_) | Uint(_), Int(_) | Uint(_)) => {
                let (l, r) = (as_signed(&left.payload), as_signed(&right.payload));
                if r.value() == 0 {
                    return self.divide_by_zero(span);
                }
                Ok(ConstValue::signed(&self.types, l.rem(r)))
            }
            _ => self.binary_type_error(BinaryOp::Rem, left, right, span),
        }
    }

    /// Shifts keep the left operand's type.
    fn shift(
        &mut self,
        op: BinaryOp,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> EvalResult {
        use Payload::*;
        match (&left.payload, &right.payload) {
            (Int(l), Int(_) | Uint(_)) => {
                let r = as_signed(&right.payload);
                let result = if op == BinaryOp::Shl { l.shl(r) } else { l.shr(r) };
                Ok(ConstValue::signed(&self.types, result))
            }
            (Uint(l), Int(_) | Uint(_)) => {
                let r = match &right.payload {
                    Uint(r) => *r,
                    Int(r) => UintValue::with_value(r.bits(), r.value().max(0) as u128),
                    _ => return self.binary_type_error(op, left, right, span),
                };
                let result = if op == BinaryOp::Shl { l.shl(r) } else { l.shr(r) };
                Ok(ConstValue::unsigned(&self.types, result))
            }
            _ => self.binary_type_error(op, left, right, span),
        }
    }

    /// `& | ^` on integers, with the signedness promotion of addition.
    fn bitwise(
        &mut self,
        op: BinaryOp,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> EvalResult {
        use Payload::*;
        match (&left.payload, &right.payload) {
            (Uint(l), Uint(r)) => {
                let result = match op {
                    BinaryOp::BitAnd => l.bitand(*r),
                    BinaryOp::BitOr => l.bitor(*r),
                    _ => l.bitxor(*r),
                };
                Ok(ConstValue::unsigned(&self.types, result))
            }
            (Int(_) | Uint(_), Int(_) | Uint(_)) => {
                let (l, r) = (as_signed(&left.payload), as_signed(&right.payload));
                let result = match op {
                    BinaryOp::BitAnd => l.bitand(r),
                    BinaryOp::BitOr => l.bitor(r),
                    _ => l.bitxor(r),
                };
                Ok(ConstValue::signed(&self.types, result))
            }
            _ => self.binary_type_error(op, left, right, span),
        }
    }

    /// Structural equality. Signedness must agree on integers; rationals
    /// compare cross-multiplied; complex compares componentwise; `chars`
    /// and `string` payloads are interchangeable.
    fn values_equal(
        &mut self,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> Result<bool, EvalInterrupt> {
        use Payload::*;
        match (&left.payload, &right.payload) {
            (Bool(l), Bool(r)) => Ok(l == r),
            (Char(l), Char(r)) => Ok(l == r),
            (Text(l), Text(r)) => Ok(l == r),
            (Int(l), Int(r)) => Ok(l.value() == r.value()),
            (Uint(l), Uint(r)) => Ok(l.value() == r.value()),
            (Int(_), Uint(_)) | (Uint(_), Int(_)) => {
                self.mixed_signedness_comparison(span)
            }
            (Rational(l), Rational(r)) => Ok(l.eq_value(r)),
            (Float(l), Float(r)) => Ok(l.value() == r.value()),
            (Complex(l), Complex(r)) => Ok(l.eq_value(r)),
            (Seq(l), Seq(r)) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                for (lv, rv) in l.iter().zip(r.iter()) {
                    if !self.values_equal(lv, rv, span)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => {
                let lty = self.types.display(left.ty, &self.ast);
                let rty = self.types.display(right.ty, &self.ast);
                self.error(
                    codes::TYPE_MISMATCH,
                    format!("values of types `{}` and `{}` cannot be compared", lty, rty),
                    span,
                );
                Err(EvalInterrupt::Reported)
            }
        }
    }

    fn values_compare(
        &mut self,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> Result<std::cmp::Ordering, EvalInterrupt> {
        use Payload::*;
        match (&left.payload, &right.payload) {
            (Int(l), Int(r)) => Ok(l.value().cmp(&r.value())),
            (Uint(l), Uint(r)) => Ok(l.value().cmp(&r.value())),
            (Int(_), Uint(_)) | (Uint(_), Int(_)) => {
                self.mixed_signedness_comparison(span)?;
                Err(EvalInterrupt::Reported)
            }
            (Rational(l), Rational(r)) => Ok(l.cmp_value(r)),
            (Float(l), Float(r)) => Ok(l
                .value()
                .partial_cmp(&r.value())
                .unwrap_or(std::cmp::Ordering::Equal)),
            (Char(l), Char(r)) => Ok(l.cmp(r)),
            (Text(l), Text(r)) => Ok(l.cmp(r)),
            _ => {
                let lty = self.types.display(left.ty, &self.ast);
                let rty = self.types.display(right.ty, &self.ast);
                self.error(
                    codes::TYPE_MISMATCH,
                    format!("values of types `{}` and `{}` cannot be ordered", lty, rty),
                    span,
                );
                Err(EvalInterrupt::Reported)
            }
        }
    }

    fn mixed_signedness_comparison(&mut self, span: &Span) -> Result<bool, EvalInterrupt> {
        self.error(
            codes::TYPE_MISMATCH,
            "comparison between signed and unsigned integers is ill-formed in constant context",
            span,
        );
        Err(EvalInterrupt::Reported)
    }

    // Conversions

    /// `value as T` over the numeric matrix plus `char → integer` and
    /// `chars ↔ string`. Payloads are resized to the target width, tripping
    /// overflow flags when the value does not fit.
    pub(crate) fn eval_cast(&mut self, value: ConstValue, target: TypeId, span: &Span) -> EvalResult {
        use Payload::*;

        let target_kind = self.types.kind(target).clone();
        let result = match (&value.payload, &target_kind) {
            (Int(_) | Uint(_), TypeKind::Integer { bits, signed }) => {
                if *signed {
                    let mut converted = as_signed(&value.payload);
                    converted.resize(*bits);
                    ConstValue::signed(&self.types, converted)
                } else {
                    let mut converted = match &value.payload {
                        Uint(u) => *u,
                        Int(i) => UintValue::with_value(i.bits(), i.value() as u128),
                        _ => return Err(EvalInterrupt::Reported),
                    };
                    converted.resize(*bits);
                    ConstValue::unsigned(&self.types, converted)
                }
            }
            (Int(_) | Uint(_), TypeKind::Rational { bits }) => {
                let mut converted = RationalValue::from_signed(as_signed(&value.payload));
                converted.resize(*bits);
                ConstValue::rational(&self.types, converted)
            }
            (Int(_) | Uint(_), TypeKind::Float { bits }) => {
                let mut converted = FloatValue::from_signed(as_signed(&value.payload));
                converted.resize(*bits);
                ConstValue::float(&self.types, converted)
            }
            (Int(_) | Uint(_), TypeKind::Complex { bits }) => {
                let mut converted = ComplexValue::from_signed(as_signed(&value.payload));
                converted.resize(*bits);
                ConstValue::complex(&self.types, converted)
            }
            (Rational(r), TypeKind::Integer { bits, signed }) => {
                let real = r.real().value();
                if *signed {
                    ConstValue::signed(&self.types, IntValue::with_value(*bits, real as i128))
                } else {
                    ConstValue::unsigned(&self.types, UintValue::with_value(*bits, real as u128))
                }
            }
            (Rational(r), TypeKind::Rational { bits }) => {
                let mut converted = *r;
                converted.resize(*bits);
                ConstValue::rational(&self.types, converted)
            }
            (Rational(r), TypeKind::Float { bits }) => {
                let mut converted = r.real();
                converted.resize(*bits);
                ConstValue::float(&self.types, converted)
            }
            (Rational(r), TypeKind::Complex { bits }) => {
                let mut converted = ComplexValue::from_real(r.real());
                converted.resize(*bits);
                ConstValue::complex(&self.types, converted)
            }
            (Float(f), TypeKind::Integer { bits, signed }) => {
                if *signed {
                    ConstValue::signed(
                        &self.types,
                        IntValue::with_value(*bits, f.value() as i128),
                    )
                } else {
                    ConstValue::unsigned(
                        &self.types,
                        UintValue::with_value(*bits, f.value().max(0.0) as u128),
                    )
                }
            }
            (Float(f), TypeKind::Rational { bits }) => {
                let mut converted = RationalValue::from_float(*f, 1000);
                converted.resize(*bits);
                ConstValue::rational(&self.types, converted)
            }
            (Float(f), TypeKind::Float { bits }) => {
                let mut converted = *f;
                converted.resize(*bits);
                ConstValue::float(&self.types, converted)
            }
            (Float(f), TypeKind::Complex { bits }) => {
                let mut converted = ComplexValue::from_real(*f);
                converted.resize(*bits);
                ConstValue::complex(&self.types, converted)
            }
            (Complex(c), TypeKind::Integer { bits, signed }) => {
                let real = c.real().value();
                if *signed {
                    ConstValue::signed(&self.types, IntValue::with_value(*bits, real as i128))
                } else {
                    ConstValue::unsigned(
                        &self.types,
                        UintValue::with_value(*bits, real.max(0.0) as u128),
                    )
                }
            }
            (Complex(c), TypeKind::Rational { bits }) => {
                let mut converted = RationalValue::from_float(c.real(), 1000);
                converted.resize(*bits);
                ConstValue::rational(&self.types, converted)
            }
            (Complex(c), TypeKind::Float { bits }) => {
                let mut converted = c.real();
                converted.resize(*bits);
                ConstValue::float(&self.types, converted)
            }
            (Complex(c), TypeKind::Complex { bits }) => {
                let mut converted = *c;
                converted.resize(*bits);
                ConstValue::complex(&self.types, converted)
            }
            (Char(c), TypeKind::Integer { bits, signed }) => {
                if *signed {
                    ConstValue::signed(
                        &self.types,
                        IntValue::with_value(*bits, *c as i128),
                    )
                } else {
                    ConstValue::unsigned(
                        &self.types,
                        UintValue::with_value(*bits, *c as u128),
                    )
                }
            }
            (Text(s), TypeKind::Chars) => ConstValue::chars(&self.types, s.clone()),
            (Text(s), TypeKind::Str) => ConstValue::string(&self.types, s.clone()),
            _ => {
                let from = self.types.display(value.ty, &self.ast);
                let to = self.types.display(target, &self.ast);
                self.error(
                    codes::INVALID_CAST,
                    format!("`{}` cannot be converted to `{}` in constant context", from, to),
                    span,
                );
                return Err(EvalInterrupt::Reported);
            }
        };

        self.check_operation(span, "conversion", &result)?;
        Ok(result)
    }

    // Flag harvesting

    /// Inspects the sticky flags of `result` and reports: overflow, divide
    /// by zero and invalid outcomes are fatal for the expression; inexact
    /// results only warn.
    pub(crate) fn check_operation(
        &mut self,
        span: &Span,
        operation: &str,
        result: &ConstValue,
    ) -> Result<(), EvalInterrupt> {
        let ty = self.types.display(result.ty, &self.ast);

        let flags = match &result.payload {
            Payload::Int(i) => {
                if i.overflow() {
                    self.error(
                        codes::CONST_OVERFLOW,
                        format!("this {} overflows `{}`", operation, ty),
                        span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                return Ok(());
            }
            Payload::Uint(u) => {
                if u.overflow() {
                    self.error(
                        codes::CONST_OVERFLOW,
                        format!("this {} overflows `{}`", operation, ty),
                        span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                return Ok(());
            }
            Payload::Rational(r) => {
                if r.overflow() {
                    self.error(
                        codes::CONST_OVERFLOW,
                        format!("this {} overflows `{}`", operation, ty),
                        span,
                    );
                    return Err(EvalInterrupt::Reported);
                }
                return Ok(());
            }
            Payload::Float(f) => f.flags(),
            Payload::Complex(c) => c.flags(),
            _ => return Ok(()),
        };

        if flags.zerodiv {
            self.error(codes::CONST_DIVIDE_BY_ZERO, "division by zero", span);
            return Err(EvalInterrupt::Reported);
        }
        if flags.overflow {
            self.error(
                codes::CONST_OVERFLOW,
                format!("this {} overflows `{}`", operation, ty),
                span,
            );
            return Err(EvalInterrupt::Reported);
        }
        if flags.invalid {
            self.error(
                codes::CONST_INVALID,
                format!("this {} produces an invalid number", operation),
                span,
            );
            return Err(EvalInterrupt::Reported);
        }
        if flags.inexact {
            self.warning(
                codes::INEXACT_RESULT,
                format!("this {} may produce an inexact result", operation),
                span,
            );
        }
        Ok(())
    }

    fn divide_by_zero(&mut self, span: &Span) -> EvalResult {
        let diag = Diagnostic::error(
            codes::CONST_DIVIDE_BY_ZERO,
            "division by zero",
            span.clone(),
        )
        .with_highlight(span.clone(), Some("zero divisor".to_string()));
        self.publish(diag);
        Err(EvalInterrupt::Reported)
    }

    fn binary_type_error(
        &mut self,
        op: BinaryOp,
        left: &ConstValue,
        right: &ConstValue,
        span: &Span,
    ) -> EvalResult {
        let lty = self.types.display(left.ty, &self.ast);
        let rty = self.types.display(right.ty, &self.ast);
        self.error(
            codes::TYPE_MISMATCH,
            format!(
                "operator `{}` cannot be applied to `{}` and `{}` in constant context",
                op.symbol(),
                lty,
                rty
            ),
            span,
        );
        Err(EvalInterrupt::Reported)
    }
}

fn unary_operation_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Minus => "negation",
        UnaryOp::BitNot => "complement",
        _ => "operation",
    }
}

/// Signed projection of an integer payload (used when a signed operand
/// forces a signed result).
fn as_signed(payload: &Payload) -> IntValue {
    match payload {
        Payload::Int(i) => *i,
        Payload::Uint(u) => IntValue::from_unsigned(*u),
        _ => IntValue::new(32),
    }
}

fn int_bits(payload: &Payload) -> u16 {
    match payload {
        Payload::Int(i) => i.bits(),
        Payload::Uint(u) => u.bits(),
        _ => 32,
    }
}

/// Decodes a char lexeme: plain characters and escape sequences
/// (`\n`, `\t`, `\u…` hex, `\x…` hex, `\o…` octal, `\b…` binary).
pub(crate) fn decode_char(lexeme: &str) -> Option<char> {
    let mut chars = lexeme.chars();
    let first = chars.next()?;
    if first != '\\' {
        return if chars.next().is_none() {
            Some(first)
        } else {
            None
        };
    }

    let escape = chars.next()?;
    let rest: String = chars.collect();
    match escape {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '0' => Some('\0'),
        'a' => Some('\u{07}'),
        'f' => Some('\u{0C}'),
        'v' => Some('\u{0B}'),
        '\'' => Some('\''),
        '"' => Some('"'),
        '\\' => Some('\\'),
        'u' | 'x' => u32::from_str_radix(&rest, 16).ok().and_then(char::from_u32),
        'o' => u32::from_str_radix(&rest, 8).ok().and_then(char::from_u32),
        'b' => u32::from_str_radix(&rest, 2).ok().and_then(char::from_u32),
        _ => None,
    }
}

/// Decodes escape sequences inside a text lexeme.
pub(crate) fn decode_text(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('0') => result.push('\0'),
            Some('a') => result.push('\u{07}'),
            Some('f') => result.push('\u{0C}'),
            Some('v') => result.push('\u{0B}'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('u') | Some('x') => {
                let mut digits = String::new();
                while let Some(d) = chars.peek() {
                    if d.is_ascii_hexdigit() {
                        digits.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if let Some(decoded) =
                    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
                {
                    result.push(decoded);
                }
            }
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_char() {
        assert_eq!(decode_char("a"), Some('a'));
        assert_eq!(decode_char("\\n"), Some('\n'));
        assert_eq!(decode_char("\\u1F30E"), Some('\u{1F30E}'));
        assert_eq!(decode_char("\\x41"), Some('A'));
        assert_eq!(decode_char("ab"), None);
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("hello\\nworld"), "hello\nworld");
        assert_eq!(decode_text("tab\\t!"), "tab\t!");
        assert_eq!(decode_text("\\u48i"), "Hi");
    }
}
