//! Declaration checking: type bodies (pass 2) and executable declarations
//! (pass 3).

use crate::checker::{Checked, Checker, Interrupt};
use crate::compat::{assignment_compatible, compatible, unsafe_coercion};
use crate::eval::EvalInterrupt;
use crate::scope::{NodeRef, ScopeKind};
use crate::types::{RecordField, TypeId, TypeKind};
use nemesis_ast::{Decl, DeclId, Expr, Span, TypeExprId};
use nemesis_diagnostics::{codes, Diagnostic};

impl Checker {
    /// Pass 2 entry: fully checks a top-level type declaration. Also called
    /// on demand when a type expression names a declaration that has not
    /// been checked yet.
    pub(crate) fn check_type_declaration(&mut self, decl: DeclId) -> Checked<()> {
        if let Some(ty) = self.decl_note(decl).ty {
            if !matches!(self.types.kind(ty), TypeKind::Unknown) {
                return Ok(());
            }
        }
        if self.decl_note(decl).invalid {
            return Err(Interrupt::Reported);
        }

        let node = self.ast.decl(decl).clone();
        match node {
            Decl::Record {
                generics, fields, ..
            } => {
                self.type_stack.push(decl);
                let resolved = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    if let Some(clause) = generics {
                        c.check_generic_clause(clause)?;
                    }
                    c.resolve_record_fields(&fields)
                });
                self.type_stack.pop();

                let fields = resolved?;
                let ty = self.types.record(fields);
                self.types.set_decl(ty, decl);
                self.finish_type_decl(decl, ty, generics);
            }
            Decl::Variant {
                generics, members, ..
            } => {
                self.type_stack.push(decl);
                let resolved = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    if let Some(clause) = generics {
                        c.check_generic_clause(clause)?;
                    }
                    let mut resolved = Vec::with_capacity(members.len());
                    for member in &members {
                        resolved.push(c.resolve_type_expr(*member)?);
                    }
                    Ok(resolved)
                });
                self.type_stack.pop();

                let members = resolved?;
                let ty = self.types.variant(members);
                self.types.set_decl(ty, decl);
                self.finish_type_decl(decl, ty, generics);
            }
            Decl::RangeDecl {
                generics,
                constraint,
                span,
                ..
            } => {
                self.type_stack.push(decl);
                let resolved = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    if let Some(clause) = generics {
                        c.check_generic_clause(clause)?;
                    }
                    c.resolve_range_constraint(constraint, &span)
                });
                self.type_stack.pop();

                let (base, open) = resolved?;
                let ty = self.types.range(base, open);
                self.types.set_decl(ty, decl);
                self.finish_type_decl(decl, ty, generics);
            }
            Decl::Alias {
                generics, target, ..
            } => {
                self.type_stack.push(decl);
                let resolved = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    if let Some(clause) = generics {
                        c.check_generic_clause(clause)?;
                    }
                    c.resolve_type_expr(target)
                });
                self.type_stack.pop();

                // an alias names an existing type; it creates no nominal
                // identity of its own
                let ty = resolved?;
                self.finish_type_decl(decl, ty, generics);
            }
            Decl::Concept {
                generics,
                prototypes,
                ..
            } => {
                let result = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    c.check_generic_clause(generics)?;
                    for prototype in &prototypes {
                        c.declare_executable(*prototype)?;
                    }
                    Ok(())
                });
                result?;
                self.decl_note_mut(decl).is_parametric = true;
            }
            Decl::Behaviour {
                generics, items, ..
            } => {
                let ty = self.types.behaviour();
                self.types.set_decl(ty, decl);
                self.decl_note_mut(decl).ty = Some(ty);
                let result = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                    if let Some(clause) = generics {
                        c.check_generic_clause(clause)?;
                    }
                    for item in &items {
                        c.declare_executable(*item)?;
                    }
                    Ok(())
                });
                result?;
                if let Some(clause) = generics {
                    self.types.record_parametric(ty, clause);
                    self.decl_note_mut(decl).is_parametric = true;
                }
            }
            Decl::Extend {
                generics,
                target,
                behaviours,
                items,
                span,
            } => {
                self.check_extension(decl, generics, target, &behaviours, &items, &span)?;
            }
            // hoisted in pass 1, signatures resolved in pass 3
            Decl::Extern { .. } => {}
            _ => {}
        }

        Ok(())
    }

    fn finish_type_decl(&mut self, decl: DeclId, ty: TypeId, generics: Option<DeclId>) {
        if let Some(clause) = generics {
            self.types.record_parametric(ty, clause);
            self.decl_note_mut(decl).is_parametric = true;
        }
        self.decl_note_mut(decl).ty = Some(ty);
        if self.decl_note(decl).scope.is_none() {
            let scope = self.scope;
            self.decl_note_mut(decl).scope = Some(scope);
        }
    }

    fn resolve_record_fields(&mut self, fields: &[DeclId]) -> Checked<Vec<RecordField>> {
        let mut resolved = Vec::with_capacity(fields.len());
        let mut seen: Vec<String> = Vec::new();

        for field in fields {
            match self.ast.decl(*field).clone() {
                Decl::Field { name, ty, span } => {
                    if seen.contains(&name) {
                        self.error(
                            codes::DUPLICATE_DEFINITION,
                            format!("field `{}` is declared twice", name),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                    seen.push(name.clone());
                    let field_ty = self.resolve_type_expr(ty)?;
                    self.decl_note_mut(*field).ty = Some(field_ty);
                    resolved.push(RecordField { name, ty: field_ty });
                }
                Decl::TupleField { index, ty, .. } => {
                    let field_ty = self.resolve_type_expr(ty)?;
                    self.decl_note_mut(*field).ty = Some(field_ty);
                    resolved.push(RecordField {
                        name: index.to_string(),
                        ty: field_ty,
                    });
                }
                _ => {}
            }
        }

        Ok(resolved)
    }

    /// `type Digit is range 0..=9` — bounds must be constants of the same
    /// type; the base type of the range is the type of its bounds.
    fn resolve_range_constraint(
        &mut self,
        constraint: nemesis_ast::ExprId,
        span: &Span,
    ) -> Checked<(TypeId, bool)> {
        let node = self.ast.expr(constraint).clone();
        let Expr::Range {
            start: Some(start),
            end: Some(end),
            inclusive,
            ..
        } = node
        else {
            self.error(
                codes::TYPE_MISMATCH,
                "a range type needs bounded constant limits",
                span,
            );
            return Err(Interrupt::Reported);
        };

        let start = self.evaluate(start).map_err(|_| Interrupt::Reported)?;
        let end = self.evaluate(end).map_err(|_| Interrupt::Reported)?;

        if !compatible(&self.types, start.ty, end.ty, false) {
            self.error(
                codes::TYPE_MISMATCH,
                "range limits must have the same type",
                span,
            );
            return Err(Interrupt::Reported);
        }

        Ok((start.ty, !inclusive))
    }

    /// `extend T as B { … }`: opens the extension scope, registers the
    /// extension and any behaviour conformances, and checks that every item
    /// the behaviour declares is supplied with a matching signature.
    fn check_extension(
        &mut self,
        decl: DeclId,
        generics: Option<DeclId>,
        target: TypeExprId,
        behaviours: &[TypeExprId],
        items: &[DeclId],
        span: &Span,
    ) -> Checked<()> {
        let prepared = self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
            if let Some(clause) = generics {
                c.check_generic_clause(clause)?;
            }
            let target_ty = c.resolve_type_expr(target)?;
            for item in items {
                c.declare_executable(*item)?;
            }
            Ok(target_ty)
        });
        let target_ty = prepared?;

        // the scope exists only for member lookup inside the extended type
        if let Some(scope) = self.scopes.of_node(NodeRef::Decl(decl)) {
            self.scopes.mark_extension(scope);
        }
        self.types.record_extension(target_ty, decl);
        self.decl_note_mut(decl).ty = Some(target_ty);

        for behaviour_expr in behaviours {
            let behaviour_ty = self.resolve_type_expr(*behaviour_expr)?;
            if !matches!(self.types.kind(behaviour_ty), TypeKind::Behaviour) {
                let name = self.types.display(behaviour_ty, &self.ast);
                let span = self.ast.type_expr(*behaviour_expr).span().clone();
                self.error(
                    codes::MISSING_CONFORMANCE,
                    format!("`{}` is not a behaviour", name),
                    &span,
                );
                return Err(Interrupt::Reported);
            }

            self.types.record_implementor(behaviour_ty, target_ty);
            self.check_conformance(decl, target_ty, behaviour_ty, items, span)?;
        }

        Ok(())
    }

    /// Every item the behaviour declares must be supplied by the extension
    /// with a matching signature, modulo the receiver's self type.
    fn check_conformance(
        &mut self,
        extension: DeclId,
        target_ty: TypeId,
        behaviour_ty: TypeId,
        items: &[DeclId],
        span: &Span,
    ) -> Checked<()> {
        let Some(behaviour_decl) = self.types.decl(behaviour_ty) else {
            return Ok(());
        };
        let required: Vec<DeclId> = match self.ast.decl(behaviour_decl) {
            Decl::Behaviour { items, .. } => items.clone(),
            _ => return Ok(()),
        };

        let _ = extension;
        for requirement in required {
            let Some(required_name) = self.ast.decl(requirement).name().map(str::to_string) else {
                continue;
            };

            let supplied = items.iter().copied().find(|item| {
                self.ast.decl(*item).name() == Some(required_name.as_str())
            });

            let Some(supplied) = supplied else {
                let behaviour_name = self.types.display(behaviour_ty, &self.ast);
                let requirement_span = self.ast.decl(requirement).span().clone();
                let diag = Diagnostic::error(
                    codes::MISSING_CONFORMANCE,
                    format!(
                        "extension does not supply `{}` required by behaviour `{}`",
                        required_name, behaviour_name
                    ),
                    span.clone(),
                )
                .with_note(requirement_span, "required by this declaration");
                self.publish(diag);
                return Err(Interrupt::Reported);
            };

            let (Some(required_ty), Some(supplied_ty)) = (
                self.decl_note(requirement).ty,
                self.decl_note(supplied).ty,
            ) else {
                continue;
            };

            if !self.signatures_conform(required_ty, supplied_ty, behaviour_ty, target_ty) {
                let supplied_span = self.ast.decl(supplied).span().clone();
                let required_span = self.ast.decl(requirement).span().clone();
                let diag = Diagnostic::error(
                    codes::MISSING_CONFORMANCE,
                    format!(
                        "`{}` does not match the signature declared by the behaviour",
                        required_name
                    ),
                    supplied_span,
                )
                .with_note(required_span, "behaviour declares this signature");
                self.publish(diag);
                return Err(Interrupt::Reported);
            }
        }

        Ok(())
    }

    /// Signature comparison where occurrences of the behaviour's self type
    /// stand for the extended type.
    fn signatures_conform(
        &self,
        required: TypeId,
        supplied: TypeId,
        behaviour_ty: TypeId,
        target_ty: TypeId,
    ) -> bool {
        let (
            TypeKind::Function {
                params: required_params,
                result: required_result,
                ..
            },
            TypeKind::Function {
                params: supplied_params,
                result: supplied_result,
                ..
            },
        ) = (self.types.kind(required), self.types.kind(supplied))
        else {
            return compatible(&self.types, required, supplied, true);
        };

        if required_params.len() != supplied_params.len() {
            return false;
        }

        let position_matches = |required: TypeId, supplied: TypeId| {
            if required == behaviour_ty {
                return compatible(&self.types, supplied, target_ty, true)
                    || supplied == target_ty;
            }
            compatible(&self.types, required, supplied, true)
        };

        required_params
            .iter()
            .zip(supplied_params.iter())
            .all(|(r, s)| position_matches(r.ty, s.ty))
            && position_matches(*required_result, *supplied_result)
    }

    /// Opens a generic clause: each parameter gets its placeholder type and
    /// its name in the enclosing (template) scope.
    pub(crate) fn check_generic_clause(&mut self, clause: DeclId) -> Checked<()> {
        let params = match self.ast.decl(clause).clone() {
            Decl::GenericClause { params, .. } => params,
            _ => return Err(Interrupt::Reported),
        };

        for param in params {
            match self.ast.decl(param).clone() {
                Decl::GenericTypeParam { name, .. } => {
                    if self.decl_note(param).ty.is_none() {
                        let generic = self.types.generic();
                        self.types.set_decl(generic, param);
                        let note = self.decl_note_mut(param);
                        note.ty = Some(generic);
                        note.is_parametric = true;
                    }
                    let scope = self.scope;
                    self.add_to_scope(scope, &name, param);
                }
                Decl::GenericConstParam { name, ty, .. } => {
                    if self.decl_note(param).ty.is_none() {
                        let declared = self.resolve_type_expr(ty)?;
                        let note = self.decl_note_mut(param);
                        note.ty = Some(declared);
                        note.is_parametric = true;
                    }
                    let scope = self.scope;
                    self.add_to_scope(scope, &name, param);
                }
                _ => {}
            }
        }

        let scope = self.scope;
        self.decl_note_mut(clause).scope = Some(scope);
        Ok(())
    }

    /// Pass 3a: binds executable names and resolves signatures so bodies in
    /// any unit can reference them.
    pub(crate) fn declare_executable(&mut self, decl: DeclId) -> Checked<()> {
        let node = self.ast.decl(decl).clone();
        match node {
            Decl::Function { ref name, .. } | Decl::Property { ref name, .. } => {
                let scope = self.scope;
                self.add_to_scope(scope, name, decl);
                self.resolve_signature(decl)?;
            }
            Decl::Const { ref name, .. } | Decl::Var { ref name, .. } => {
                let scope = self.scope;
                self.add_to_scope(scope, name, decl);
                self.decl_note_mut(decl).scope = Some(scope);
            }
            Decl::ConstTupled { ref names, .. } | Decl::VarTupled { ref names, .. } => {
                let scope = self.scope;
                for name in names {
                    self.add_to_scope(scope, name, decl);
                }
                self.decl_note_mut(decl).scope = Some(scope);
            }
            Decl::Test { ref name, .. } => {
                let scope = self.scope;
                self.add_to_scope(scope, name, decl);
                self.decl_note_mut(decl).scope = Some(scope);
            }
            Decl::Extern { ref items, .. } => {
                for item in items.clone() {
                    self.declare_executable(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolves a function or property signature into its function type
    /// without touching the enclosing scope's names. Instantiation calls
    /// this directly on clones, which are registered under their mangled
    /// name instead.
    pub(crate) fn resolve_signature(&mut self, decl: DeclId) -> Checked<()> {
        if self.decl_note(decl).ty.is_some() {
            return Ok(());
        }

        let (generics, params, result) = match self.ast.decl(decl).clone() {
            Decl::Function {
                generics,
                params,
                result,
                ..
            } => (generics, params, result),
            Decl::Property { params, result, .. } => (None, params, result),
            _ => return Ok(()),
        };

        let scope = self.scope;
        self.decl_note_mut(decl).scope = Some(scope);

        let signature = self.in_scope(ScopeKind::Function, Some(NodeRef::Decl(decl)), |c| {
            if let Some(clause) = generics {
                c.check_generic_clause(clause)?;
            }
            let mut resolved = Vec::with_capacity(params.len());
            for param in &params {
                resolved.push(c.declare_parameter(*param)?);
            }
            let result_ty = match result {
                Some(result) => c.resolve_type_expr(result)?,
                None => c.types.unit(),
            };
            Ok((resolved, result_ty))
        });

        let (param_types, result_ty) = signature?;
        let fn_ty = self.types.function(param_types, result_ty, false);
        self.decl_note_mut(decl).ty = Some(fn_ty);
        if let Some(clause) = generics {
            self.types.record_parametric(fn_ty, clause);
            self.decl_note_mut(decl).is_parametric = true;
        }
        Ok(())
    }

    fn declare_parameter(&mut self, param: DeclId) -> Checked<crate::types::FunctionParam> {
        match self.ast.decl(param).clone() {
            Decl::Param {
                name, mutable, ty, ..
            } => {
                let param_ty = self.resolve_type_expr(ty)?;
                self.decl_note_mut(param).ty = Some(param_ty);
                let scope = self.scope;
                self.add_to_scope(scope, &name, param);
                Ok(crate::types::FunctionParam {
                    ty: param_ty,
                    mutable,
                })
            }
            _ => Err(Interrupt::Reported),
        }
    }

    /// Pass 3b: checks bodies, initializers and tests.
    pub(crate) fn check_executable(&mut self, decl: DeclId) -> Checked<()> {
        let node = self.ast.decl(decl).clone();
        match node {
            Decl::Function { generics, body, .. } => {
                // template bodies are checked per instantiation, on the
                // clone only
                if generics.is_some() && !self.instantiated.contains(&decl) {
                    return Ok(());
                }
                let Some(body) = body else {
                    return Ok(());
                };
                self.in_scope(ScopeKind::Function, Some(NodeRef::Decl(decl)), |c| {
                    c.function_stack.push(decl);
                    let result = c.check_expr(body);
                    c.function_stack.pop();
                    result.map(|_| ())
                })?;
            }
            Decl::Property { body, .. } => {
                let Some(body) = body else {
                    return Ok(());
                };
                self.in_scope(ScopeKind::Function, Some(NodeRef::Decl(decl)), |c| {
                    c.function_stack.push(decl);
                    let result = c.check_expr(body);
                    c.function_stack.pop();
                    result.map(|_| ())
                })?;
            }
            Decl::Const { .. } | Decl::ConstTupled { .. } => {
                self.check_constant_decl(decl)?;
            }
            Decl::Var { .. } | Decl::VarTupled { .. } => {
                self.check_variable_decl(decl)?;
            }
            Decl::Test { name, body, .. } => {
                log::trace!("checking test `{}`", name);
                self.in_scope(ScopeKind::Function, Some(NodeRef::Decl(decl)), |c| {
                    c.check_expr(body).map(|_| ())
                })?;
            }
            Decl::Extend { items, .. } => {
                for item in items {
                    self.in_scope(ScopeKind::Type, Some(NodeRef::Decl(decl)), |c| {
                        c.check_executable(item)
                    })?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Constant declarations: the evaluator runs on the initializer, the
    /// result is coerced to the declared type, and the value is stored on
    /// the declaration.
    pub(crate) fn check_constant_decl(&mut self, decl: DeclId) -> Checked<()> {
        // the evaluator may have resolved this constant on demand already
        if self.decl_note(decl).value.is_some() {
            return Ok(());
        }
        if self.decl_note(decl).invalid {
            return Err(Interrupt::Reported);
        }

        let node = self.ast.decl(decl).clone();
        match node {
            Decl::Const { ty, value, span, .. } => {
                let declared = match ty {
                    Some(ty) => Some(self.resolve_type_expr(ty)?),
                    None => None,
                };

                match self.evaluate(value) {
                    Ok(evaluated) => {
                        let finished = match declared {
                            Some(declared) => {
                                match self.coerce_constant(evaluated, declared, &span) {
                                    Ok(coerced) => coerced,
                                    Err(_) => {
                                        self.decl_note_mut(decl).invalid = true;
                                        self.expr_note_mut(value).invalid = true;
                                        return Err(Interrupt::Reported);
                                    }
                                }
                            }
                            None => evaluated,
                        };
                        self.expr_note_mut(value).value = Some(finished.clone());
                        self.expr_note_mut(value).ty = Some(finished.ty);
                        let note = self.decl_note_mut(decl);
                        note.ty = Some(finished.ty);
                        note.value = Some(finished);
                    }
                    Err(EvalInterrupt::NeedsGeneric) => {
                        // legal inside a template; the instantiation clone
                        // re-evaluates with parameters bound
                        self.decl_note_mut(decl).is_parametric = true;
                    }
                    Err(EvalInterrupt::Reported) => {
                        self.decl_note_mut(decl).invalid = true;
                        self.expr_note_mut(value).invalid = true;
                        return Err(Interrupt::Reported);
                    }
                }
            }
            Decl::ConstTupled { names, value, span } => {
                match self.evaluate(value) {
                    Ok(evaluated) => {
                        match &evaluated.payload {
                            crate::value::Payload::Seq(elements)
                                if elements.len() == names.len() => {}
                            _ => {
                                self.error(
                                    codes::TYPE_MISMATCH,
                                    format!(
                                        "expected a tuple of {} components to destructure",
                                        names.len()
                                    ),
                                    &span,
                                );
                                self.decl_note_mut(decl).invalid = true;
                                return Err(Interrupt::Reported);
                            }
                        }
                        self.expr_note_mut(value).value = Some(evaluated.clone());
                        let note = self.decl_note_mut(decl);
                        note.ty = Some(evaluated.ty);
                        note.value = Some(evaluated);
                    }
                    Err(EvalInterrupt::NeedsGeneric) => {
                        self.decl_note_mut(decl).is_parametric = true;
                    }
                    Err(EvalInterrupt::Reported) => {
                        self.decl_note_mut(decl).invalid = true;
                        return Err(Interrupt::Reported);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Variable declarations: initializer type checking plus the coercion
    /// rules (array to slice, unsafe array to pointer, chars/string).
    pub(crate) fn check_variable_decl(&mut self, decl: DeclId) -> Checked<()> {
        let node = self.ast.decl(decl).clone();
        match node {
            Decl::Var {
                name,
                ty,
                value,
                span,
                ..
            } => {
                let declared = match ty {
                    Some(ty) => Some(self.resolve_type_expr(ty)?),
                    None => None,
                };

                let value_ty = match value {
                    Some(value) => Some(self.check_expr(value)?),
                    None => None,
                };

                let final_ty = match (declared, value_ty) {
                    (Some(declared), Some(value_ty)) => {
                        if !assignment_compatible(&self.types, declared, value_ty) {
                            self.mismatch(declared, value_ty, &span);
                            self.decl_note_mut(decl).invalid = true;
                            return Err(Interrupt::Reported);
                        }
                        if unsafe_coercion(&self.types, declared, value_ty) {
                            let declared_name = self.types.display(declared, &self.ast);
                            self.warning(
                                codes::UNSAFE_COERCION,
                                format!(
                                    "initialization of `{}` from a sequence is unsafe",
                                    declared_name
                                ),
                                &span,
                            );
                        }
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(value_ty)) => value_ty,
                    (None, None) => {
                        self.error(
                            codes::TYPE_MISMATCH,
                            format!("`{}` needs a type or an initializer", name),
                            &span,
                        );
                        self.decl_note_mut(decl).invalid = true;
                        return Err(Interrupt::Reported);
                    }
                };

                self.decl_note_mut(decl).ty = Some(final_ty);
            }
            Decl::VarTupled {
                names,
                ty,
                value,
                span,
                ..
            } => {
                let value_ty = self.check_expr(value)?;
                let components = match self.types.kind(value_ty) {
                    TypeKind::Tuple { components } => components.clone(),
                    _ => {
                        self.error(
                            codes::TYPE_MISMATCH,
                            "destructuring needs a tuple initializer",
                            &span,
                        );
                        self.decl_note_mut(decl).invalid = true;
                        return Err(Interrupt::Reported);
                    }
                };
                if components.len() != names.len() {
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!(
                            "expected a tuple of {} components but the initializer has {}",
                            names.len(),
                            components.len()
                        ),
                        &span,
                    );
                    self.decl_note_mut(decl).invalid = true;
                    return Err(Interrupt::Reported);
                }

                if let Some(ty) = ty {
                    let declared = self.resolve_type_expr(ty)?;
                    if !assignment_compatible(&self.types, declared, value_ty) {
                        self.mismatch(declared, value_ty, &span);
                        self.decl_note_mut(decl).invalid = true;
                        return Err(Interrupt::Reported);
                    }
                }

                self.decl_note_mut(decl).ty = Some(value_ty);
            }
            _ => {}
        }
        Ok(())
    }

    /// Publishes a type-mismatch diagnostic naming both sides.
    pub(crate) fn mismatch(&mut self, expected: TypeId, found: TypeId, span: &Span) {
        let expected = self.types.display(expected, &self.ast);
        let found = self.types.display(found, &self.ast);
        let diag = Diagnostic::error(
            codes::TYPE_MISMATCH,
            "mismatched types",
            span.clone(),
        )
        .with_explanation(format!("expected `{}`, found `{}`", expected, found));
        self.publish(diag);
    }
}
