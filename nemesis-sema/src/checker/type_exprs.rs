//! Resolution of type expressions into registry types.

use crate::checker::{Checked, Checker, Interrupt};
use crate::eval::EvalInterrupt;
use crate::types::{FunctionParam, RecordField, TypeId, TypeKind};
use nemesis_ast::{Decl, DeclId, Expr, ExprId, GenericArg, PathSegment, Span, TypeExpr, TypeExprId};
use nemesis_diagnostics::codes;

impl Checker {
    /// Resolves a type expression to a registry type, evaluating array
    /// lengths and materializing generic instantiations on demand.
    pub(crate) fn resolve_type_expr(&mut self, id: TypeExprId) -> Checked<TypeId> {
        if let Some(ty) = self.type_expr_note(id).ty {
            if !matches!(self.types.kind(ty), TypeKind::Unknown) {
                return Ok(ty);
            }
        }
        if self.type_expr_note(id).invalid {
            return Err(Interrupt::Reported);
        }

        let node = self.ast.type_expr(id).clone();
        let result = match node {
            TypeExpr::Path { segments, span } => self.resolve_type_path(id, &segments, &span),
            TypeExpr::Array { elem, size, span } => {
                let elem_ty = self.resolve_type_expr(elem)?;
                match self.evaluate(size) {
                    Ok(value) => match value.as_index() {
                        Some(count) => Ok(self.types.array(elem_ty, count as u64)),
                        None => {
                            self.error(
                                codes::CONST_OUT_OF_RANGE,
                                "array length must be a non-negative integer constant",
                                &span,
                            );
                            Err(Interrupt::Reported)
                        }
                    },
                    Err(EvalInterrupt::NeedsGeneric) => {
                        // `[T : $N]` — the length is still parametric
                        match self.generic_const_param_of(size) {
                            Some(param) => {
                                self.type_expr_note_mut(id).is_parametric = true;
                                Ok(self.types.array_parametric(elem_ty, param))
                            }
                            None => {
                                self.error(
                                    codes::CONST_NOT_CONSTANT,
                                    "array length cannot be computed at analysis time",
                                    &span,
                                );
                                Err(Interrupt::Reported)
                            }
                        }
                    }
                    Err(EvalInterrupt::Reported) => Err(Interrupt::Reported),
                }
            }
            TypeExpr::Slice { elem, .. } => {
                let elem_ty = self.resolve_type_expr(elem)?;
                Ok(self.types.slice(elem_ty))
            }
            TypeExpr::Tuple { components, .. } => {
                let mut resolved = Vec::with_capacity(components.len());
                for component in components {
                    resolved.push(self.resolve_type_expr(component)?);
                }
                Ok(self.types.tuple(resolved))
            }
            TypeExpr::Pointer { pointee, .. } => {
                let pointee_ty = self.resolve_type_expr(pointee)?;
                Ok(self.types.pointer(pointee_ty))
            }
            TypeExpr::Function { params, result, .. } => {
                let mut resolved = Vec::with_capacity(params.len());
                for param in params {
                    resolved.push(FunctionParam {
                        ty: self.resolve_type_expr(param)?,
                        mutable: false,
                    });
                }
                let result_ty = match result {
                    Some(result) => self.resolve_type_expr(result)?,
                    None => self.types.unit(),
                };
                Ok(self.types.function(resolved, result_ty, false))
            }
            TypeExpr::Record { fields, .. } => {
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    match self.ast.decl(field).clone() {
                        Decl::Field { name, ty, .. } => {
                            let field_ty = self.resolve_type_expr(ty)?;
                            self.decl_note_mut(field).ty = Some(field_ty);
                            resolved.push(RecordField { name, ty: field_ty });
                        }
                        Decl::TupleField { index, ty, .. } => {
                            let field_ty = self.resolve_type_expr(ty)?;
                            self.decl_note_mut(field).ty = Some(field_ty);
                            resolved.push(RecordField {
                                name: index.to_string(),
                                ty: field_ty,
                            });
                        }
                        _ => {}
                    }
                }
                Ok(self.types.record(resolved))
            }
            TypeExpr::Variant { members, .. } => {
                let mut resolved = Vec::with_capacity(members.len());
                for member in members {
                    resolved.push(self.resolve_type_expr(member)?);
                }
                Ok(self.types.variant(resolved))
            }
        };

        match result {
            Ok(ty) => {
                let parametric = self.type_is_parametric(ty);
                let note = self.type_expr_note_mut(id);
                note.ty = Some(ty);
                note.is_type = true;
                if parametric {
                    note.is_parametric = true;
                }
                Ok(ty)
            }
            Err(interrupt) => {
                self.type_expr_note_mut(id).invalid = true;
                Err(interrupt)
            }
        }
    }

    fn resolve_type_path(
        &mut self,
        id: TypeExprId,
        segments: &[PathSegment],
        span: &Span,
    ) -> Checked<TypeId> {
        // builtin primitive names resolve without touching scopes
        if segments.len() == 1 && segments[0].generics.is_empty() {
            if let Some(builtin) = self.types.builtin(&segments[0].name) {
                return Ok(builtin);
            }
        }

        let names: Vec<String> = segments.iter().map(|segment| segment.name.clone()).collect();
        let decl = match self.resolve_path(&names, span) {
            Ok(decl) => decl,
            Err(interrupt) => return Err(interrupt),
        };

        let generic_args = segments
            .last()
            .map(|segment| segment.generics.clone())
            .unwrap_or_default();

        match self.ast.decl(decl).clone() {
            Decl::GenericTypeParam { .. } => {
                if !generic_args.is_empty() {
                    self.error(
                        codes::GENERIC_ARITY,
                        "a generic type parameter takes no generic arguments",
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
                let note = self.type_expr_note_mut(id);
                note.referenced = Some(decl);
                note.is_parametric = true;
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            node @ (Decl::Record { .. }
            | Decl::Variant { .. }
            | Decl::RangeDecl { .. }
            | Decl::Alias { .. }
            | Decl::Behaviour { .. }) => {
                if self.type_stack.contains(&decl) {
                    self.report_cycle(decl, span);
                    return Err(Interrupt::Reported);
                }

                // resolve the declaration on demand: pass 2 may reach a type
                // before its own declaration was checked
                if self
                    .decl_note(decl)
                    .ty
                    .map(|ty| matches!(self.types.kind(ty), TypeKind::Unknown))
                    .unwrap_or(true)
                {
                    self.check_type_declaration(decl)?;
                }

                let has_clause = match &node {
                    Decl::Record { generics, .. }
                    | Decl::Variant { generics, .. }
                    | Decl::RangeDecl { generics, .. }
                    | Decl::Alias { generics, .. }
                    | Decl::Behaviour { generics, .. } => generics.is_some(),
                    _ => false,
                };

                if !generic_args.is_empty() {
                    if !has_clause {
                        self.error(
                            codes::GENERIC_ARITY,
                            format!(
                                "type `{}` takes no generic arguments",
                                node.name().unwrap_or("<anonymous>")
                            ),
                            span,
                        );
                        return Err(Interrupt::Reported);
                    }
                    let ty = self.instantiate_type(decl, &generic_args, span)?;
                    self.type_expr_note_mut(id).referenced = Some(decl);
                    return Ok(ty);
                }

                if has_clause {
                    // a bare parametric name is only legal inside its own
                    // template, where it stays parametric
                    self.type_expr_note_mut(id).is_parametric = true;
                }

                self.type_expr_note_mut(id).referenced = Some(decl);
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::Use { .. } => {
                self.error(
                    codes::UNRESOLVED_TYPE,
                    format!("`{}` names a workspace, not a type", names.join(".")),
                    span,
                );
                Err(Interrupt::Reported)
            }
            other => {
                let suggestions = self
                    .scopes
                    .similars(self.scope, other.name().unwrap_or_default());
                let mut diag = nemesis_diagnostics::Diagnostic::error(
                    codes::UNRESOLVED_TYPE,
                    format!("`{}` does not name a type", names.join(".")),
                    span.clone(),
                );
                if !suggestions.is_empty() {
                    diag = diag.with_help(format!("did you mean `{}`?", suggestions.join("`, `")));
                }
                self.publish(diag);
                Err(Interrupt::Reported)
            }
        }
    }

    /// The generic constant parameter an array-size expression refers to,
    /// when it does.
    pub(crate) fn generic_const_param_of(&mut self, size: ExprId) -> Option<DeclId> {
        if let Some(referenced) = self.expr_note(size).referenced {
            if matches!(self.ast.decl(referenced), Decl::GenericConstParam { .. }) {
                return Some(referenced);
            }
        }
        match self.ast.expr(size) {
            Expr::Ident { name, .. } => {
                let name = name.clone();
                let decl = self.resolve_name(&name)?;
                if matches!(self.ast.decl(decl), Decl::GenericConstParam { .. }) {
                    self.expr_note_mut(size).referenced = Some(decl);
                    Some(decl)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// True when a type still mentions an unbound generic parameter.
    pub(crate) fn type_is_parametric(&self, ty: TypeId) -> bool {
        match self.types.kind(ty) {
            TypeKind::Generic => true,
            TypeKind::Array {
                elem,
                parametric_size,
                ..
            } => parametric_size.is_some() || self.type_is_parametric(*elem),
            TypeKind::Slice { elem } => self.type_is_parametric(*elem),
            TypeKind::Pointer { pointee } => self.type_is_parametric(*pointee),
            TypeKind::Range { base, .. } => self.type_is_parametric(*base),
            TypeKind::Tuple { components } => components
                .iter()
                .any(|component| self.type_is_parametric(*component)),
            TypeKind::Record { fields } => {
                fields.iter().any(|field| self.type_is_parametric(field.ty))
            }
            TypeKind::Variant { members } => {
                members.iter().any(|member| self.type_is_parametric(*member))
            }
            TypeKind::Function { params, result, .. } => {
                params.iter().any(|param| self.type_is_parametric(param.ty))
                    || self.type_is_parametric(*result)
            }
            _ => false,
        }
    }

    /// Resolves a type path written in expression position (record
    /// constructions, `is` tests written through value paths).
    pub(crate) fn resolve_type_from_expr(&mut self, expr: ExprId) -> Checked<TypeId> {
        let node = self.ast.expr(expr).clone();
        match node {
            Expr::Ident { name, generics, span } => {
                if generics.is_empty() {
                    if let Some(builtin) = self.types.builtin(&name) {
                        let note = self.expr_note_mut(expr);
                        note.ty = Some(builtin);
                        note.is_type = true;
                        return Ok(builtin);
                    }
                }
                let decl = match self.resolve_name(&name) {
                    Some(decl) => decl,
                    None => {
                        self.unresolved(&name, &span);
                        return Err(Interrupt::Reported);
                    }
                };
                if !self.ast.decl(decl).is_type_decl()
                    && !matches!(self.ast.decl(decl), Decl::Behaviour { .. })
                {
                    self.error(
                        codes::UNRESOLVED_TYPE,
                        format!("`{}` does not name a type", name),
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                if self.type_stack.contains(&decl) {
                    self.report_cycle(decl, &span);
                    return Err(Interrupt::Reported);
                }
                if self
                    .decl_note(decl)
                    .ty
                    .map(|ty| matches!(self.types.kind(ty), TypeKind::Unknown))
                    .unwrap_or(true)
                {
                    self.check_type_declaration(decl)?;
                }
                if !generics.is_empty() {
                    let ty = self.instantiate_type(decl, &generics, &span)?;
                    let note = self.expr_note_mut(expr);
                    note.referenced = Some(decl);
                    note.ty = Some(ty);
                    note.is_type = true;
                    return Ok(ty);
                }
                let ty = self.decl_note(decl).ty.ok_or(Interrupt::Reported)?;
                let note = self.expr_note_mut(expr);
                note.referenced = Some(decl);
                note.ty = Some(ty);
                note.is_type = true;
                Ok(ty)
            }
            Expr::Member { object, member, span } => {
                let names = self.expr_path_names(object, member);
                match names {
                    Some(names) => {
                        let decl = self.resolve_path(&names, &span)?;
                        let ty = self.decl_note(decl).ty.ok_or(Interrupt::Reported)?;
                        let note = self.expr_note_mut(expr);
                        note.referenced = Some(decl);
                        note.ty = Some(ty);
                        note.is_type = true;
                        Ok(ty)
                    }
                    None => {
                        self.error(codes::UNRESOLVED_TYPE, "expected a type name", &span);
                        Err(Interrupt::Reported)
                    }
                }
            }
            other => {
                let span = other.span().clone();
                self.error(codes::UNRESOLVED_TYPE, "expected a type name", &span);
                Err(Interrupt::Reported)
            }
        }
    }

    /// Flattens nested member expressions into a dotted name list.
    pub(crate) fn expr_path_names(&self, object: ExprId, member: ExprId) -> Option<Vec<String>> {
        let mut names = match self.ast.expr(object) {
            Expr::Ident { name, .. } => vec![name.clone()],
            Expr::Member {
                object: inner_object,
                member: inner_member,
                ..
            } => self.expr_path_names(*inner_object, *inner_member)?,
            _ => return None,
        };
        match self.ast.expr(member) {
            Expr::Ident { name, .. } => names.push(name.clone()),
            _ => return None,
        }
        Some(names)
    }

    /// Checks a `GenericArg` wrapper written at a use site: type arguments
    /// resolve to types, constant arguments evaluate to values.
    pub(crate) fn describe_generic_arg(&mut self, arg: &GenericArg) -> String {
        match arg {
            GenericArg::Type(ty) => match self.resolve_type_expr(*ty) {
                Ok(resolved) => self.types.display(resolved, &self.ast),
                Err(_) => "_".to_string(),
            },
            GenericArg::Const(expr) => match self.evaluate(*expr) {
                Ok(value) => value.render(&self.types),
                Err(_) => "_".to_string(),
            },
        }
    }
}
