//! Structural pattern checking for `when`, `is`, and destructuring forms.
//!
//! Matching a pattern against a scrutinee type computes the bindings it
//! introduces (name, type, span), which the caller installs into the
//! branch-local scope; bindings inherit mutability from the scrutinee
//! source. The matcher enforces the structural obligations: subpattern
//! types must be assignment-compatible with the matching slice of the
//! scrutinee, rest patterns appear at most once and only at a boundary,
//! or-alternatives must agree on their binding sets, range bounds must be
//! constants of the same numeric or character category.

use crate::checker::{Checked, Checker, Interrupt};
use crate::compat::{assignment_compatible, compatible, variant_contains};
use crate::types::{TypeId, TypeKind};
use nemesis_ast::{Pattern, PatId, Span};
use nemesis_diagnostics::codes;

pub type Bindings = Vec<(String, TypeId, Span)>;

impl Checker {
    /// Checks `pat` against `scrutinee` and returns the bindings it
    /// introduces.
    pub(crate) fn check_pattern(&mut self, pat: PatId, scrutinee: TypeId) -> Checked<Bindings> {
        let node = self.ast.pat(pat).clone();
        let mut bindings = Bindings::new();

        match node {
            Pattern::Wildcard { .. } => {}
            Pattern::Rest { span } => {
                self.error(
                    codes::PATTERN_TYPE,
                    "a rest pattern is only allowed inside tuple and array patterns",
                    &span,
                );
                return Err(Interrupt::Reported);
            }
            Pattern::Literal { lit, span } => {
                let value = self
                    .eval_literal_in_pattern(&lit, &span)
                    .ok_or(Interrupt::Reported)?;
                if !assignment_compatible(&self.types, scrutinee, value.ty) {
                    self.pattern_type_error(scrutinee, value.ty, &span);
                    return Err(Interrupt::Reported);
                }
                self.pat_note_mut(pat).value = Some(value);
            }
            Pattern::Bind { name, span } => {
                bindings.push((name, scrutinee, span));
            }
            Pattern::Path { segments, span } => {
                let names: Vec<String> =
                    segments.iter().map(|segment| segment.name.clone()).collect();
                let decl = self.resolve_path(&names, &span)?;
                let member_ty = self.decl_note(decl).ty.ok_or(Interrupt::Reported)?;

                let accepted = variant_contains(&self.types, scrutinee, member_ty)
                    || compatible(&self.types, scrutinee, member_ty, true);
                if !accepted {
                    self.pattern_type_error(scrutinee, member_ty, &span);
                    return Err(Interrupt::Reported);
                }
                let note = self.pat_note_mut(pat);
                note.referenced = Some(decl);
                note.ty = Some(member_ty);
            }
            Pattern::Tuple { elements, span } => {
                let components = match self.types.kind(scrutinee) {
                    TypeKind::Tuple { components } => components.clone(),
                    _ => {
                        let ty = self.types.display(scrutinee, &self.ast);
                        self.error(
                            codes::PATTERN_TYPE,
                            format!("tuple pattern cannot match a value of type `{}`", ty),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };
                self.check_sequence(&elements, &components, &span, &mut bindings)?;
            }
            Pattern::Array { elements, span } => {
                let (elem, known_size) = match self.types.kind(scrutinee) {
                    TypeKind::Array { elem, size, .. } => (*elem, Some(*size)),
                    TypeKind::Slice { elem } => (*elem, None),
                    _ => {
                        let ty = self.types.display(scrutinee, &self.ast);
                        self.error(
                            codes::PATTERN_TYPE,
                            format!("array pattern cannot match a value of type `{}`", ty),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };

                let rest_count = elements
                    .iter()
                    .filter(|e| matches!(self.ast.pat(**e), Pattern::Rest { .. }))
                    .count();
                self.check_rest_shape(&elements, rest_count, &span)?;

                let plain = elements.len() - rest_count;
                if let Some(size) = known_size {
                    let fits = if rest_count > 0 {
                        plain as u64 <= size
                    } else {
                        plain as u64 == size
                    };
                    if !fits {
                        self.error(
                            codes::PATTERN_TYPE,
                            format!(
                                "pattern has {} elements but the array has {}",
                                plain, size
                            ),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                }

                for element in &elements {
                    if matches!(self.ast.pat(*element), Pattern::Rest { .. }) {
                        continue;
                    }
                    bindings.extend(self.check_pattern(*element, elem)?);
                }
            }
            Pattern::Record {
                segments,
                elements,
                span,
            } => {
                let record_ty = self.resolve_pattern_record(&segments, scrutinee, &span)?;
                let fields = match self.types.kind(record_ty) {
                    TypeKind::Record { fields } => fields.clone(),
                    _ => {
                        let ty = self.types.display(record_ty, &self.ast);
                        self.error(
                            codes::PATTERN_TYPE,
                            format!("`{}` is not a record type", ty),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };

                if elements.len() != fields.len() {
                    self.error(
                        codes::PATTERN_TYPE,
                        format!(
                            "pattern has {} fields but the record has {}",
                            elements.len(),
                            fields.len()
                        ),
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }

                for (element, field) in elements.iter().zip(fields.iter()) {
                    bindings.extend(self.check_pattern(*element, field.ty)?);
                }
                self.pat_note_mut(pat).ty = Some(record_ty);
            }
            Pattern::LabeledRecord {
                segments,
                fields: labeled,
                span,
            } => {
                let record_ty = self.resolve_pattern_record(&segments, scrutinee, &span)?;
                let fields = match self.types.kind(record_ty) {
                    TypeKind::Record { fields } => fields.clone(),
                    _ => {
                        let ty = self.types.display(record_ty, &self.ast);
                        self.error(
                            codes::PATTERN_TYPE,
                            format!("`{}` is not a record type", ty),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };

                for (label, sub) in &labeled {
                    match fields.iter().find(|field| &field.name == label) {
                        Some(field) => {
                            bindings.extend(self.check_pattern(*sub, field.ty)?);
                        }
                        None => {
                            let ty = self.types.display(record_ty, &self.ast);
                            self.error(
                                codes::NO_SUCH_MEMBER,
                                format!("record `{}` has no field `{}`", ty, label),
                                &span,
                            );
                            return Err(Interrupt::Reported);
                        }
                    }
                }
                self.pat_note_mut(pat).ty = Some(record_ty);
            }
            Pattern::Range {
                start,
                end,
                span,
                ..
            } => {
                let start = self.evaluate(start).map_err(|_| Interrupt::Reported)?;
                let end = self.evaluate(end).map_err(|_| Interrupt::Reported)?;

                let same_category = std::mem::discriminant(self.types.kind(start.ty))
                    == std::mem::discriminant(self.types.kind(end.ty));
                let orderable = matches!(
                    self.types.kind(start.ty),
                    TypeKind::Integer { .. }
                        | TypeKind::Rational { .. }
                        | TypeKind::Float { .. }
                        | TypeKind::Char
                );
                if !same_category || !orderable {
                    self.error(
                        codes::PATTERN_TYPE,
                        "range pattern bounds must be constants of the same numeric or character type",
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }

                if !assignment_compatible(&self.types, start.ty, scrutinee)
                    && !compatible(&self.types, scrutinee, start.ty, false)
                {
                    self.pattern_type_error(scrutinee, start.ty, &span);
                    return Err(Interrupt::Reported);
                }
            }
            Pattern::Or { alternatives, span } => {
                let mut first: Option<Bindings> = None;
                for alternative in &alternatives {
                    let mut alt_bindings = self.check_pattern(*alternative, scrutinee)?;
                    alt_bindings.sort_by(|a, b| a.0.cmp(&b.0));
                    match &first {
                        None => first = Some(alt_bindings),
                        Some(reference) => {
                            let agree = reference.len() == alt_bindings.len()
                                && reference.iter().zip(alt_bindings.iter()).all(
                                    |((lname, lty, _), (rname, rty, _))| {
                                        lname == rname
                                            && compatible(&self.types, *lty, *rty, true)
                                    },
                                );
                            if !agree {
                                self.error(
                                    codes::PATTERN_BINDINGS,
                                    "all alternatives of an or-pattern must introduce the same \
                                     bindings with identical types",
                                    &span,
                                );
                                return Err(Interrupt::Reported);
                            }
                        }
                    }
                }
                bindings = first.unwrap_or_default();
            }
            Pattern::Is { target, span } => {
                let target_ty = self.resolve_type_expr(target)?;
                let accepted = variant_contains(&self.types, scrutinee, target_ty)
                    || matches!(self.types.kind(scrutinee), TypeKind::Behaviour)
                        && self.types.is_implementor(scrutinee, target_ty)
                    || assignment_compatible(&self.types, target_ty, scrutinee)
                    || assignment_compatible(&self.types, scrutinee, target_ty);
                if !accepted {
                    self.pattern_type_error(scrutinee, target_ty, &span);
                    return Err(Interrupt::Reported);
                }
                self.pat_note_mut(pat).ty = Some(target_ty);
            }
        }

        let note = self.pat_note_mut(pat);
        if note.ty.is_none() {
            note.ty = Some(scrutinee);
        }
        Ok(bindings)
    }

    /// Tuple-shaped sequence matching shared by tuple patterns.
    fn check_sequence(
        &mut self,
        elements: &[PatId],
        components: &[TypeId],
        span: &Span,
        bindings: &mut Bindings,
    ) -> Checked<()> {
        let rest_count = elements
            .iter()
            .filter(|e| matches!(self.ast.pat(**e), Pattern::Rest { .. }))
            .count();
        self.check_rest_shape(elements, rest_count, span)?;

        if rest_count == 0 {
            if elements.len() != components.len() {
                self.error(
                    codes::PATTERN_TYPE,
                    format!(
                        "pattern has {} elements but the tuple has {}",
                        elements.len(),
                        components.len()
                    ),
                    span,
                );
                return Err(Interrupt::Reported);
            }
            for (element, component) in elements.iter().zip(components.iter()) {
                bindings.extend(self.check_pattern(*element, *component)?);
            }
            return Ok(());
        }

        // one rest pattern at a boundary: match the prefix or the suffix
        let plain = elements.len() - 1;
        if plain > components.len() {
            self.error(
                codes::PATTERN_TYPE,
                format!(
                    "pattern has {} elements but the tuple has {}",
                    plain,
                    components.len()
                ),
                span,
            );
            return Err(Interrupt::Reported);
        }

        if matches!(self.ast.pat(elements[elements.len() - 1]), Pattern::Rest { .. }) {
            for (element, component) in elements[..plain].iter().zip(components.iter()) {
                bindings.extend(self.check_pattern(*element, *component)?);
            }
        } else {
            let offset = components.len() - plain;
            for (element, component) in elements[1..].iter().zip(components[offset..].iter()) {
                bindings.extend(self.check_pattern(*element, *component)?);
            }
        }
        Ok(())
    }

    /// A rest pattern appears at most once, and only first or last.
    fn check_rest_shape(
        &mut self,
        elements: &[PatId],
        rest_count: usize,
        span: &Span,
    ) -> Checked<()> {
        if rest_count == 0 {
            return Ok(());
        }
        let boundary = matches!(
            self.ast.pat(elements[0]),
            Pattern::Rest { .. }
        ) || matches!(
            self.ast.pat(elements[elements.len() - 1]),
            Pattern::Rest { .. }
        );
        if rest_count > 1 || !boundary {
            self.error(
                codes::PATTERN_TYPE,
                "a rest pattern may appear at most once, at the start or the end",
                span,
            );
            return Err(Interrupt::Reported);
        }
        Ok(())
    }

    /// Resolves the nominal head of a record pattern, falling back to the
    /// scrutinee when the path names the scrutinee's own type.
    fn resolve_pattern_record(
        &mut self,
        segments: &[nemesis_ast::PathSegment],
        scrutinee: TypeId,
        span: &Span,
    ) -> Checked<TypeId> {
        let names: Vec<String> = segments.iter().map(|segment| segment.name.clone()).collect();
        let decl = self.resolve_path(&names, span)?;
        let ty = self.decl_note(decl).ty.ok_or(Interrupt::Reported)?;

        let accepted = compatible(&self.types, scrutinee, ty, true)
            || variant_contains(&self.types, scrutinee, ty);
        if !accepted {
            self.pattern_type_error(scrutinee, ty, span);
            return Err(Interrupt::Reported);
        }
        Ok(ty)
    }

    fn pattern_type_error(&mut self, scrutinee: TypeId, found: TypeId, span: &Span) {
        let scrutinee = self.types.display(scrutinee, &self.ast);
        let found = self.types.display(found, &self.ast);
        self.error(
            codes::PATTERN_TYPE,
            format!(
                "pattern of type `{}` cannot match a value of type `{}`",
                found, scrutinee
            ),
            span,
        );
    }

    /// The variant member a `when` arm pattern covers, when it covers
    /// exactly one.
    pub(crate) fn covered_variant_member(&self, pat: PatId, variant: TypeId) -> Option<TypeId> {
        let covered = match self.ast.pat(pat) {
            Pattern::Path { .. } | Pattern::Is { .. } => self.pat_note(pat).ty?,
            _ => return None,
        };
        match self.types.kind(variant) {
            TypeKind::Variant { members } => members
                .iter()
                .copied()
                .find(|member| compatible(&self.types, covered, *member, true)),
            _ => None,
        }
    }

    /// True when the pattern matches any value of the scrutinee type
    /// unconditionally.
    pub(crate) fn pattern_is_irrefutable(&self, pat: PatId) -> bool {
        matches!(
            self.ast.pat(pat),
            Pattern::Wildcard { .. } | Pattern::Bind { .. }
        )
    }
}
