//! Expression type checking.

use crate::checker::{Assignability, Checked, Checker, Interrupt};
use crate::compat::{assignment_compatible, compatible};
use crate::eval::EvalInterrupt;
use crate::scope::{NodeRef, ScopeKind};
use crate::types::{FunctionParam, TypeId, TypeKind};
use nemesis_ast::{BinaryOp, Decl, DeclId, Expr, ExprId, Span, UnaryOp, WhenArm};
use nemesis_diagnostics::{codes, Diagnostic};

impl Checker {
    /// Types `expr`, records the annotation, and returns the type. Every
    /// expression node ends up either typed or flagged invalid with a
    /// published diagnostic.
    pub(crate) fn check_expr(&mut self, expr: ExprId) -> Checked<TypeId> {
        if let Some(ty) = self.expr_note(expr).ty {
            if !matches!(self.types.kind(ty), TypeKind::Unknown) {
                return Ok(ty);
            }
        }
        if self.expr_note(expr).invalid {
            return Err(Interrupt::Reported);
        }

        match self.check_expr_inner(expr) {
            Ok(ty) => {
                self.expr_note_mut(expr).ty = Some(ty);
                Ok(ty)
            }
            Err(interrupt) => {
                self.expr_note_mut(expr).invalid = true;
                Err(interrupt)
            }
        }
    }

    fn check_expr_inner(&mut self, expr: ExprId) -> Checked<TypeId> {
        let node = self.ast.expr(expr).clone();
        match node {
            Expr::Literal { lit, span } => {
                let value = self
                    .eval_literal_in_pattern(&lit, &span)
                    .ok_or(Interrupt::Reported)?;
                let ty = value.ty;
                self.expr_note_mut(expr).value = Some(value);
                Ok(ty)
            }
            Expr::Ident {
                name,
                generics,
                span,
            } => self.check_ident(expr, &name, &generics, &span),
            Expr::Paren { inner, .. } => self.check_expr(inner),
            Expr::Tuple { elements, .. } => {
                let mut components = Vec::with_capacity(elements.len());
                for element in elements {
                    components.push(self.check_expr(element)?);
                }
                Ok(self.types.tuple(components))
            }
            Expr::Array { elements, span } => {
                if elements.is_empty() {
                    // the element type stays unknown so the empty array can
                    // flow into any slice
                    let unknown = self.types.unknown();
                    return Ok(self.types.array(unknown, 0));
                }
                let first = self.check_expr(elements[0])?;
                for element in elements.iter().skip(1) {
                    let elem_ty = self.check_expr(*element)?;
                    if !assignment_compatible(&self.types, first, elem_ty) {
                        self.mismatch(first, elem_ty, &span);
                        return Err(Interrupt::Reported);
                    }
                }
                Ok(self.types.array(first, elements.len() as u64))
            }
            Expr::ArraySized { value, size, span } => {
                let elem_ty = self.check_expr(value)?;
                match self.evaluate(size) {
                    Ok(count) => match count.as_index() {
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
                        match self.generic_const_param_of(size) {
                            Some(param) => Ok(self.types.array_parametric(elem_ty, param)),
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
            Expr::Block { stmts, .. } => {
                self.in_scope(ScopeKind::Block, Some(NodeRef::Expr(expr)), |c| {
                    for stmt in &stmts {
                        match c.check_stmt(*stmt) {
                            Ok(()) | Err(Interrupt::Reported) => {}
                            Err(Interrupt::AbortUnit) => return Err(Interrupt::AbortUnit),
                        }
                        // safe point: deferred insertions from the statement
                        // just checked become visible to the next one
                        c.commit_pending();
                    }
                    Ok(())
                })?;
                Ok(self.types.unit())
            }
            Expr::Lambda {
                params,
                result,
                body,
                span: _,
            } => {
                let signature =
                    self.in_scope(ScopeKind::Function, Some(NodeRef::Expr(expr)), |c| {
                        let mut resolved = Vec::with_capacity(params.len());
                        for param in &params {
                            match c.ast.decl(*param).clone() {
                                Decl::Param {
                                    name, mutable, ty, ..
                                } => {
                                    let param_ty = c.resolve_type_expr(ty)?;
                                    c.decl_note_mut(*param).ty = Some(param_ty);
                                    let scope = c.scope;
                                    c.add_to_scope(scope, &name, *param);
                                    resolved.push(FunctionParam {
                                        ty: param_ty,
                                        mutable,
                                    });
                                }
                                _ => return Err(Interrupt::Reported),
                            }
                        }
                        let body_ty = c.check_expr(body)?;
                        let result_ty = match result {
                            Some(result) => c.resolve_type_expr(result)?,
                            None => body_ty,
                        };
                        Ok((resolved, result_ty))
                    });
                let (params, result_ty) = signature?;
                Ok(self.types.function(params, result_ty, true))
            }
            Expr::Call { callee, args, span } => self.check_call(callee, &args, &span),
            Expr::Member {
                object,
                member,
                span,
            } => self.check_member(expr, object, member, &span),
            Expr::Index {
                object,
                index,
                span,
            } => {
                let object_ty = self.check_expr(object)?;
                let index_ty = self.check_expr(index)?;
                if !matches!(self.types.kind(index_ty), TypeKind::Integer { .. }) {
                    let found = self.types.display(index_ty, &self.ast);
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!("index must be an integer, found `{}`", found),
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                match self.types.kind(object_ty) {
                    TypeKind::Array { elem, .. } | TypeKind::Slice { elem } => Ok(*elem),
                    TypeKind::Chars | TypeKind::Str => Ok(self.types.character()),
                    _ => {
                        let found = self.types.display(object_ty, &self.ast);
                        self.error(
                            codes::TYPE_MISMATCH,
                            format!("values of type `{}` cannot be indexed", found),
                            &span,
                        );
                        Err(Interrupt::Reported)
                    }
                }
            }
            Expr::TupleIndex {
                object,
                index,
                span,
            } => {
                let object_ty = self.check_expr(object)?;
                let components = match self.types.kind(object_ty) {
                    TypeKind::Tuple { components } => components.clone(),
                    TypeKind::Record { fields } => {
                        fields.iter().map(|field| field.ty).collect()
                    }
                    _ => {
                        let found = self.types.display(object_ty, &self.ast);
                        self.error(
                            codes::TYPE_MISMATCH,
                            format!("values of type `{}` have no positional components", found),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };
                components.get(index as usize).copied().ok_or_else(|| {
                    self.error(
                        codes::CONST_OUT_OF_RANGE,
                        format!(
                            "component {} is out of range for a value of {} components",
                            index,
                            components.len()
                        ),
                        &span,
                    );
                    Interrupt::Reported
                })
            }
            Expr::RecordInit { path, fields, span } => self.check_record_init(path, &fields, &span),
            Expr::Unary { op, operand, span } => self.check_unary(op, operand, &span),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left_ty = self.check_expr(left)?;
                let right_ty = self.check_expr(right)?;
                self.binary_result_type(op, left_ty, right_ty, &span)
            }
            Expr::Cast { value, target, span } => {
                let value_ty = self.check_expr(value)?;
                let target_ty = self.resolve_type_expr(target)?;
                if !self.cast_allowed(value_ty, target_ty) {
                    let from = self.types.display(value_ty, &self.ast);
                    let to = self.types.display(target_ty, &self.ast);
                    self.error(
                        codes::INVALID_CAST,
                        format!("`{}` cannot be cast to `{}`", from, to),
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                Ok(target_ty)
            }
            Expr::Range {
                start,
                end,
                inclusive,
                span,
            } => {
                let base = match (start, end) {
                    (Some(start), Some(end)) => {
                        let start_ty = self.check_expr(start)?;
                        let end_ty = self.check_expr(end)?;
                        if !compatible(&self.types, start_ty, end_ty, false) {
                            self.mismatch(start_ty, end_ty, &span);
                            return Err(Interrupt::Reported);
                        }
                        start_ty
                    }
                    (Some(bound), None) | (None, Some(bound)) => self.check_expr(bound)?,
                    (None, None) => self.types.isize_type(),
                };
                Ok(self.types.range(base, !inclusive))
            }
            Expr::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => {
                self.expect_bool(condition, &span)?;
                let then_ty = self.check_expr(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let else_ty = self.check_expr(else_branch)?;
                        if compatible(&self.types, then_ty, else_ty, false) {
                            Ok(then_ty)
                        } else {
                            Ok(self.types.unit())
                        }
                    }
                    None => Ok(self.types.unit()),
                }
            }
            Expr::When {
                scrutinee,
                arms,
                else_arm,
                span,
            } => self.check_when(scrutinee, &arms, else_arm, &span),
            Expr::ForIn {
                pattern,
                iterable,
                body,
                contracts,
                span,
            } => {
                let iterable_ty = self.check_expr(iterable)?;
                let element_ty = match self.types.kind(iterable_ty) {
                    TypeKind::Range { base, .. } => *base,
                    TypeKind::Array { elem, .. } | TypeKind::Slice { elem } => *elem,
                    TypeKind::Chars | TypeKind::Str => self.types.character(),
                    _ => {
                        let found = self.types.display(iterable_ty, &self.ast);
                        self.error(
                            codes::TYPE_MISMATCH,
                            format!("values of type `{}` cannot be iterated", found),
                            &span,
                        );
                        return Err(Interrupt::Reported);
                    }
                };

                let mutable = matches!(self.assignability(iterable), Assignability::Assignable);
                self.in_scope(ScopeKind::Loop, Some(NodeRef::Expr(expr)), |c| {
                    let bindings = c.check_pattern(pattern, element_ty)?;
                    c.install_bindings(bindings, mutable);
                    for contract in &contracts {
                        let _ = c.check_stmt(*contract);
                    }
                    c.loop_depth += 1;
                    let result = c.check_expr(body);
                    c.loop_depth -= 1;
                    result.map(|_| ())
                })?;
                Ok(self.types.unit())
            }
            Expr::Loop {
                condition,
                body,
                contracts,
                span,
            } => {
                if let Some(condition) = condition {
                    self.expect_bool(condition, &span)?;
                }
                self.in_scope(ScopeKind::Loop, Some(NodeRef::Expr(expr)), |c| {
                    for contract in &contracts {
                        let _ = c.check_stmt(*contract);
                    }
                    c.loop_depth += 1;
                    let result = c.check_expr(body);
                    c.loop_depth -= 1;
                    result.map(|_| ())
                })?;
                Ok(self.types.unit())
            }
            Expr::Is { value, target, .. } => {
                self.check_expr(value)?;
                self.resolve_type_expr(target)?;
                Ok(self.types.boolean())
            }
        }
    }

    fn check_ident(
        &mut self,
        expr: ExprId,
        name: &str,
        generics: &[nemesis_ast::GenericArg],
        span: &Span,
    ) -> Checked<TypeId> {
        // builtin type names resolve without scopes
        if generics.is_empty() {
            if let Some(builtin) = self.types.builtin(name) {
                if self.expr_note(expr).must_value {
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!("expected a value, found type `{}`", name),
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
                self.expr_note_mut(expr).is_type = true;
                return Ok(builtin);
            }
        }

        let decl = match self.resolve_name(name) {
            Some(decl) => decl,
            None => {
                self.unresolved(name, span);
                return Err(Interrupt::Reported);
            }
        };
        self.expr_note_mut(expr).referenced = Some(decl);

        // explicit generic arguments: materialize the instantiation
        if !generics.is_empty() {
            match self.ast.decl(decl).clone() {
                Decl::Function { .. } => {
                    let instance = self.instantiate_function(decl, generics, span)?;
                    self.expr_note_mut(expr).referenced = Some(instance);
                    return self.decl_note(instance).ty.ok_or(Interrupt::Reported);
                }
                node if node.is_type_decl() || matches!(node, Decl::Behaviour { .. }) => {
                    let ty = self.instantiate_type(decl, generics, span)?;
                    self.expr_note_mut(expr).is_type = true;
                    return Ok(ty);
                }
                _ => {
                    self.error(
                        codes::GENERIC_ARITY,
                        format!("`{}` takes no generic arguments", name),
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
            }
        }

        match self.ast.decl(decl).clone() {
            node if node.is_type_decl() || matches!(node, Decl::Behaviour { .. }) => {
                if self.expr_note(expr).must_value {
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!("expected a value, found type `{}`", name),
                        span,
                    );
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
                self.expr_note_mut(expr).is_type = true;
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::GenericTypeParam { .. } => {
                let note = self.expr_note_mut(expr);
                note.is_type = true;
                note.is_parametric = true;
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::GenericConstParam { .. } => {
                self.expr_note_mut(expr).is_parametric = true;
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::Const { .. } | Decl::ConstTupled { .. } => {
                if self.decl_note(decl).ty.is_none() {
                    self.check_constant_decl(decl)?;
                }
                if let Some(value) = self.decl_note(decl).value.clone() {
                    self.expr_note_mut(expr).value = Some(value);
                }
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::Var { .. } | Decl::VarTupled { .. } | Decl::Param { .. } => {
                match self.decl_note(decl).ty {
                    Some(ty) => Ok(ty),
                    None => {
                        self.error(
                            codes::UNRESOLVED_NAME,
                            format!("`{}` is used before its declaration is checked", name),
                            span,
                        );
                        Err(Interrupt::Reported)
                    }
                }
            }
            Decl::Function { .. } | Decl::Property { .. } => {
                if self.decl_note(decl).ty.is_none() {
                    self.declare_executable(decl)?;
                }
                self.decl_note(decl).ty.ok_or(Interrupt::Reported)
            }
            Decl::Use { .. } => {
                self.used_imports.insert(decl);
                Ok(self.types.workspace_marker())
            }
            _ => {
                self.error(
                    codes::UNRESOLVED_NAME,
                    format!("`{}` cannot be used as a value", name),
                    span,
                );
                Err(Interrupt::Reported)
            }
        }
    }

    fn check_call(&mut self, callee: ExprId, args: &[ExprId], span: &Span) -> Checked<TypeId> {
        let callee_ty = self.check_expr(callee)?;

        // calling an uninstantiated template needs explicit arguments; no
        // inference happens here
        if let Some(referenced) = self.expr_note(callee).referenced {
            if self.decl_note(referenced).is_parametric
                && matches!(self.ast.decl(referenced), Decl::Function { .. })
                && !self.instantiated.contains(&referenced)
            {
                self.error(
                    codes::GENERIC_ARITY,
                    "a parametric function needs explicit generic arguments here",
                    span,
                );
                return Err(Interrupt::Reported);
            }
        }

        let (params, result) = match self.types.kind(callee_ty) {
            TypeKind::Function { params, result, .. } => (params.clone(), *result),
            _ => {
                let found = self.types.display(callee_ty, &self.ast);
                self.error(
                    codes::NOT_CALLABLE,
                    format!("expected a function, found `{}`", found),
                    span,
                );
                return Err(Interrupt::Reported);
            }
        };

        if params.len() != args.len() {
            self.publish(
                Diagnostic::error(
                    codes::ARGUMENT_COUNT,
                    format!(
                        "this function takes {} argument{} but {} {} supplied",
                        params.len(),
                        if params.len() == 1 { "" } else { "s" },
                        args.len(),
                        if args.len() == 1 { "was" } else { "were" }
                    ),
                    span.clone(),
                ),
            );
            return Err(Interrupt::Reported);
        }

        for (param, arg) in params.iter().zip(args.iter()) {
            self.expr_note_mut(*arg).must_value = true;
            let arg_ty = self.check_expr(*arg)?;
            if !assignment_compatible(&self.types, param.ty, arg_ty) {
                let arg_span = self.ast.expr(*arg).span().clone();
                self.mismatch(param.ty, arg_ty, &arg_span);
                return Err(Interrupt::Reported);
            }
        }

        Ok(result)
    }

    fn check_member(
        &mut self,
        expr: ExprId,
        object: ExprId,
        member: ExprId,
        span: &Span,
    ) -> Checked<TypeId> {
        let member_name = match self.ast.expr(member) {
            Expr::Ident { name, .. } => name.clone(),
            _ => {
                self.error(codes::NO_SUCH_MEMBER, "expected a member name", span);
                return Err(Interrupt::Reported);
            }
        };

        // dotted paths through workspaces, types and variants resolve as
        // declarations before value members are considered
        if let Some(names) = self.expr_path_names(object, member) {
            if let Some(head) = names.first() {
                let head_is_value = self
                    .resolve_name(head)
                    .map(|decl| {
                        matches!(
                            self.ast.decl(decl),
                            Decl::Var { .. }
                                | Decl::VarTupled { .. }
                                | Decl::Param { .. }
                                | Decl::Const { .. }
                                | Decl::ConstTupled { .. }
                        )
                    })
                    .unwrap_or(false);

                if !head_is_value {
                    // `f64.INFINITY` and friends
                    if names.len() == 2 {
                        if let Some(builtin) = self.types.builtin(head) {
                            let value = self
                                .eval_type_metadata_public(builtin, &member_name, span)
                                .map_err(|_| Interrupt::Reported)?;
                            let ty = value.ty;
                            self.expr_note_mut(expr).value = Some(value);
                            return Ok(ty);
                        }
                    }

                    let decl = self.resolve_path(&names, span)?;
                    self.expr_note_mut(expr).referenced = Some(decl);

                    // the target may live in a unit whose pass has not
                    // reached it yet; resolve it on demand in its own scope
                    if self.decl_note(decl).ty.is_none() {
                        let home = self.decl_note(decl).scope.unwrap_or(self.scope);
                        match self.ast.decl(decl).clone() {
                            Decl::Const { .. } | Decl::ConstTupled { .. } => {
                                self.in_existing_scope(home, |c| c.check_constant_decl(decl))?;
                            }
                            Decl::Function { .. } | Decl::Property { .. } => {
                                self.in_existing_scope(home, |c| c.resolve_signature(decl))?;
                            }
                            node if node.is_type_decl() => {
                                self.in_existing_scope(home, |c| {
                                    c.check_type_declaration(decl)
                                })?;
                            }
                            _ => {}
                        }
                    }

                    if self.ast.decl(decl).is_type_decl() {
                        self.expr_note_mut(expr).is_type = true;
                    }
                    if let Some(value) = self.decl_note(decl).value.clone() {
                        self.expr_note_mut(expr).value = Some(value);
                    }
                    if let Some(ty) = self.decl_note(decl).ty {
                        return Ok(ty);
                    }
                    self.error(
                        codes::UNRESOLVED_NAME,
                        format!("`{}` cannot be used here", names.join(".")),
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
            }
        }

        let object_ty = self.check_expr(object)?;

        // record fields
        if let TypeKind::Record { fields } = self.types.kind(object_ty) {
            if let Some(field) = fields.iter().find(|field| field.name == member_name) {
                return Ok(field.ty);
            }
        }

        // members injected by extensions of the object's type
        let extensions: Vec<DeclId> = self.types.extensions(object_ty).collect();
        for extension in extensions {
            if let Some(scope) = self.scopes.of_node(NodeRef::Decl(extension)) {
                if let Some(found) = self.scopes.lookup_local(scope, &member_name) {
                    self.expr_note_mut(expr).referenced = Some(found);
                    if self.decl_note(found).ty.is_none() {
                        let _ = self.in_existing_scope(scope, |c| c.declare_executable(found));
                    }
                    if let Some(ty) = self.decl_note(found).ty {
                        return Ok(ty);
                    }
                }
            }
        }

        // builtin members on sequences, text and numeric composites
        let builtin = match (self.types.kind(object_ty), member_name.as_str()) {
            (TypeKind::Array { .. } | TypeKind::Slice { .. } | TypeKind::Tuple { .. }, "size") => {
                Some(self.types.usize_type())
            }
            (TypeKind::Chars | TypeKind::Str, "size" | "length") => Some(self.types.usize_type()),
            (TypeKind::Rational { bits }, "numerator" | "denominator") => {
                Some(self.types.sint(bits / 2))
            }
            (TypeKind::Complex { bits }, "real" | "imaginary") => {
                Some(self.types.floating(bits / 2))
            }
            _ => None,
        };
        if let Some(ty) = builtin {
            return Ok(ty);
        }

        let found = self.types.display(object_ty, &self.ast);
        let mut diag = Diagnostic::error(
            codes::NO_SUCH_MEMBER,
            format!("no member `{}` on type `{}`", member_name, found),
            span.clone(),
        );
        let mut candidates = Vec::new();
        let extensions: Vec<DeclId> = self.types.extensions(object_ty).collect();
        for extension in extensions {
            if let Some(scope) = self.scopes.of_node(NodeRef::Decl(extension)) {
                for (name, _) in self.scopes.get(scope).names() {
                    candidates.push(name.clone());
                }
            }
        }
        let suggestions = nemesis_diagnostics::fuzzy::similar_names(&member_name, &candidates);
        if !suggestions.is_empty() {
            diag = diag.with_help(format!("did you mean `{}`?", suggestions.join("`, `")));
        }
        self.publish(diag);
        Err(Interrupt::Reported)
    }

    fn check_record_init(
        &mut self,
        path: ExprId,
        fields: &[(Option<String>, ExprId)],
        span: &Span,
    ) -> Checked<TypeId> {
        let record_ty = self.resolve_type_from_expr(path)?;
        let declared = match self.types.kind(record_ty) {
            TypeKind::Record { fields } => fields.clone(),
            _ => {
                let found = self.types.display(record_ty, &self.ast);
                self.error(
                    codes::TYPE_MISMATCH,
                    format!("`{}` is not a record type", found),
                    span,
                );
                return Err(Interrupt::Reported);
            }
        };

        if fields.len() != declared.len() {
            self.error(
                codes::ARGUMENT_COUNT,
                format!(
                    "record has {} field{} but {} {} supplied",
                    declared.len(),
                    if declared.len() == 1 { "" } else { "s" },
                    fields.len(),
                    if fields.len() == 1 { "was" } else { "were" }
                ),
                span,
            );
            return Err(Interrupt::Reported);
        }

        for (position, (label, value)) in fields.iter().enumerate() {
            let expected = match label {
                Some(label) => match declared.iter().find(|field| &field.name == label) {
                    Some(field) => field.ty,
                    None => {
                        let found = self.types.display(record_ty, &self.ast);
                        self.error(
                            codes::NO_SUCH_MEMBER,
                            format!("record `{}` has no field `{}`", found, label),
                            span,
                        );
                        return Err(Interrupt::Reported);
                    }
                },
                None => declared[position].ty,
            };
            let value_ty = self.check_expr(*value)?;
            if !assignment_compatible(&self.types, expected, value_ty) {
                let value_span = self.ast.expr(*value).span().clone();
                self.mismatch(expected, value_ty, &value_span);
                return Err(Interrupt::Reported);
            }
        }

        Ok(record_ty)
    }

    fn check_unary(&mut self, op: UnaryOp, operand: ExprId, span: &Span) -> Checked<TypeId> {
        let operand_ty = self.check_expr(operand)?;
        match op {
            UnaryOp::Plus => match self.types.kind(operand_ty) {
                TypeKind::Integer { .. }
                | TypeKind::Rational { .. }
                | TypeKind::Float { .. }
                | TypeKind::Complex { .. } => Ok(operand_ty),
                _ => self.unary_type_error(op, operand_ty, span),
            },
            UnaryOp::Minus => match self.types.kind(operand_ty) {
                TypeKind::Integer { bits, .. } => Ok(self.types.sint(*bits)),
                TypeKind::Rational { .. } | TypeKind::Float { .. } | TypeKind::Complex { .. } => {
                    Ok(operand_ty)
                }
                _ => self.unary_type_error(op, operand_ty, span),
            },
            UnaryOp::BitNot => match self.types.kind(operand_ty) {
                TypeKind::Integer { .. } => Ok(operand_ty),
                _ => self.unary_type_error(op, operand_ty, span),
            },
            UnaryOp::Not => match self.types.kind(operand_ty) {
                TypeKind::Bool => Ok(operand_ty),
                _ => self.unary_type_error(op, operand_ty, span),
            },
            UnaryOp::AddrOf => Ok(self.types.pointer(operand_ty)),
            UnaryOp::Deref => match self.types.kind(operand_ty) {
                TypeKind::Pointer { pointee } => Ok(*pointee),
                _ => {
                    let found = self.types.display(operand_ty, &self.ast);
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!("`{}` cannot be dereferenced", found),
                        span,
                    );
                    Err(Interrupt::Reported)
                }
            },
        }
    }

    fn unary_type_error(&mut self, op: UnaryOp, ty: TypeId, span: &Span) -> Checked<TypeId> {
        let found = self.types.display(ty, &self.ast);
        self.error(
            codes::TYPE_MISMATCH,
            format!("unary `{}` cannot be applied to `{}`", op.symbol(), found),
            span,
        );
        Err(Interrupt::Reported)
    }

    fn check_when(
        &mut self,
        scrutinee: ExprId,
        arms: &[WhenArm],
        else_arm: Option<ExprId>,
        span: &Span,
    ) -> Checked<TypeId> {
        let scrutinee_ty = self.check_expr(scrutinee)?;
        let mutable = matches!(self.assignability(scrutinee), Assignability::Assignable);

        let mut covered: Vec<TypeId> = Vec::new();
        let mut catch_all = else_arm.is_some();
        let mut result_ty: Option<TypeId> = None;

        for arm in arms {
            let arm_result = self.in_scope(ScopeKind::MatchArm, None, |c| {
                let bindings = c.check_pattern(arm.pattern, scrutinee_ty)?;
                c.install_bindings(bindings, mutable);
                if let Some(guard) = arm.guard {
                    let guard_span = c.ast.expr(guard).span().clone();
                    c.expect_bool(guard, &guard_span)?;
                }
                c.check_expr(arm.body)
            });

            match arm_result {
                Ok(arm_ty) => {
                    result_ty = self.merge_arm_type(result_ty, arm_ty);
                }
                Err(Interrupt::Reported) => {}
                Err(Interrupt::AbortUnit) => return Err(Interrupt::AbortUnit),
            }

            // an unguarded irrefutable arm covers everything
            if arm.guard.is_none() && self.pattern_is_irrefutable(arm.pattern) {
                catch_all = true;
            }
            if arm.guard.is_none() {
                if let Some(member) = self.covered_variant_member(arm.pattern, scrutinee_ty) {
                    if !covered.contains(&member) {
                        covered.push(member);
                    }
                }
            }
        }

        // the else branch participates in result unification like any arm
        if let Some(else_arm) = else_arm {
            match self.check_expr(else_arm) {
                Ok(else_ty) => {
                    result_ty = self.merge_arm_type(result_ty, else_ty);
                }
                Err(Interrupt::Reported) => {}
                Err(Interrupt::AbortUnit) => return Err(Interrupt::AbortUnit),
            }
        }

        // exhaustiveness: a when over a variant must cover every member or
        // provide an else branch
        if !catch_all {
            if let TypeKind::Variant { members } = self.types.kind(scrutinee_ty) {
                let missing: Vec<String> = members
                    .clone()
                    .into_iter()
                    .filter(|member| !covered.contains(member))
                    .map(|member| self.types.display(member, &self.ast))
                    .collect();
                if !missing.is_empty() {
                    let scrutinee_name = self.types.display(scrutinee_ty, &self.ast);
                    let diag = Diagnostic::error(
                        codes::NON_EXHAUSTIVE,
                        format!(
                            "non-exhaustive `when` over `{}`: missing `{}`",
                            scrutinee_name,
                            missing.join("`, `")
                        ),
                        span.clone(),
                    )
                    .with_help("add the missing arms or an `else` branch");
                    self.publish(diag);
                    return Err(Interrupt::Reported);
                }
            } else if arms.iter().all(|arm| {
                arm.guard.is_some() || !self.pattern_is_irrefutable(arm.pattern)
            }) && !matches!(self.types.kind(scrutinee_ty), TypeKind::Bool)
            {
                self.warning(
                    codes::UNREACHABLE_BRANCH,
                    "`when` without an `else` branch may fall through",
                    span,
                );
            }
        }

        Ok(result_ty.unwrap_or_else(|| self.types.unit()))
    }

    /// Folds one branch's type into the `when` result: the first branch
    /// decides, later branches must agree laxly or the whole expression
    /// collapses to `unit`.
    fn merge_arm_type(&self, result_ty: Option<TypeId>, arm_ty: TypeId) -> Option<TypeId> {
        match result_ty {
            None => Some(arm_ty),
            Some(previous) if compatible(&self.types, previous, arm_ty, false) => Some(previous),
            Some(_) => Some(self.types.unit()),
        }
    }

    /// Installs pattern bindings as synthetic variable declarations in the
    /// current (branch-local) scope; bindings inherit mutability from the
    /// scrutinee source.
    pub(crate) fn install_bindings(
        &mut self,
        bindings: crate::pattern::Bindings,
        mutable: bool,
    ) {
        for (name, ty, span) in bindings {
            let decl = self.ast.push_decl(Decl::Var {
                name: name.clone(),
                mutable,
                ty: None,
                value: None,
                span,
            });
            self.sync_notes();
            self.decl_note_mut(decl).ty = Some(ty);
            let scope = self.scope;
            self.defer_insertion(scope, name, decl);
        }
        self.commit_pending();
    }

    pub(crate) fn expect_bool(&mut self, expr: ExprId, span: &Span) -> Checked<()> {
        let ty = self.check_expr(expr)?;
        if !matches!(self.types.kind(ty), TypeKind::Bool) {
            let found = self.types.display(ty, &self.ast);
            self.error(
                codes::TYPE_MISMATCH,
                format!("expected `bool`, found `{}`", found),
                span,
            );
            return Err(Interrupt::Reported);
        }
        Ok(())
    }

    /// Type-level promotion for binary operators; mirrors the constant
    /// evaluator's value-level matrix.
    pub(crate) fn binary_result_type(
        &mut self,
        op: BinaryOp,
        left: TypeId,
        right: TypeId,
        span: &Span,
    ) -> Checked<TypeId> {
        use TypeKind::*;

        let lkind = self.types.kind(left).clone();
        let rkind = self.types.kind(right).clone();

        // generic operands postpone the decision until substitution
        if matches!(lkind, Generic) || matches!(rkind, Generic) {
            return Ok(self.types.unknown());
        }

        match op {
            BinaryOp::And | BinaryOp::Or => {
                if matches!(lkind, Bool) && matches!(rkind, Bool) {
                    Ok(self.types.boolean())
                } else {
                    self.binary_op_type_error(op, left, right, span)
                }
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let text = |kind: &TypeKind| matches!(kind, Chars | Str);
                let same_category =
                    std::mem::discriminant(&lkind) == std::mem::discriminant(&rkind);
                if text(&lkind) && text(&rkind) {
                    return Ok(self.types.boolean());
                }
                if let (
                    Integer { signed: lsigned, .. },
                    Integer { signed: rsigned, .. },
                ) = (&lkind, &rkind)
                {
                    if lsigned != rsigned {
                        self.error(
                            codes::TYPE_MISMATCH,
                            "comparison between signed and unsigned integers is ill-formed",
                            span,
                        );
                        return Err(Interrupt::Reported);
                    }
                }
                if same_category && compatible(&self.types, left, right, false) {
                    Ok(self.types.boolean())
                } else {
                    self.binary_op_type_error(op, left, right, span)
                }
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let orderable = |kind: &TypeKind| {
                    matches!(
                        kind,
                        Integer { .. } | Rational { .. } | Float { .. } | Char | Chars | Str
                    )
                };
                if let (
                    Integer { signed: lsigned, .. },
                    Integer { signed: rsigned, .. },
                ) = (&lkind, &rkind)
                {
                    if lsigned != rsigned {
                        self.error(
                            codes::TYPE_MISMATCH,
                            "comparison between signed and unsigned integers is ill-formed",
                            span,
                        );
                        return Err(Interrupt::Reported);
                    }
                }
                let text = |kind: &TypeKind| matches!(kind, Chars | Str);
                let same_category =
                    std::mem::discriminant(&lkind) == std::mem::discriminant(&rkind);
                if (same_category || (text(&lkind) && text(&rkind)))
                    && orderable(&lkind)
                    && orderable(&rkind)
                {
                    Ok(self.types.boolean())
                } else {
                    self.binary_op_type_error(op, left, right, span)
                }
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                if matches!(lkind, Integer { .. }) && matches!(rkind, Integer { .. }) {
                    Ok(left)
                } else {
                    self.binary_op_type_error(op, left, right, span)
                }
            }
            BinaryOp::Rem => match (&lkind, &rkind) {
                (
                    Integer { bits: lbits, signed: lsigned },
                    Integer { bits: rbits, signed: rsigned },
                ) => {
                    let bits = (*lbits).max(*rbits);
                    if *lsigned || *rsigned {
                        Ok(self.types.sint(bits))
                    } else {
                        Ok(self.types.uint(bits))
                    }
                }
                _ => self.binary_op_type_error(op, left, right, span),
            },
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => match (&lkind, &rkind) {
                (
                    Integer { bits: lbits, signed: lsigned },
                    Integer { bits: rbits, signed: rsigned },
                ) => {
                    let bits = (*lbits).max(*rbits);
                    if *lsigned || *rsigned {
                        Ok(self.types.sint(bits))
                    } else {
                        Ok(self.types.uint(bits))
                    }
                }
                _ => self.binary_op_type_error(op, left, right, span),
            },
            BinaryOp::Pow => match (&lkind, &rkind) {
                (Complex { bits: lbits }, _) => {
                    let rbits = numeric_bits(&rkind).unwrap_or(64);
                    Ok(self.types.complex((*lbits).max(2 * rbits).clamp(64, 256)))
                }
                (_, Complex { bits: rbits }) => {
                    let lbits = numeric_bits(&lkind).unwrap_or(64);
                    Ok(self.types.complex((2 * lbits).max(*rbits).clamp(64, 256)))
                }
                _ => {
                    let (Some(lbits), Some(rbits)) =
                        (float_lift_bits(&lkind), float_lift_bits(&rkind))
                    else {
                        return self.binary_op_type_error(op, left, right, span);
                    };
                    Ok(self.types.floating(lbits.max(rbits).clamp(32, 128)))
                }
            },
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                // string building with +
                if op == BinaryOp::Add {
                    let textual = |kind: &TypeKind| matches!(kind, Char | Chars | Str);
                    if textual(&lkind) && textual(&rkind) {
                        if matches!(lkind, Char) && matches!(rkind, Char) {
                            return self.binary_op_type_error(op, left, right, span);
                        }
                        return Ok(self.types.string());
                    }
                }

                match (&lkind, &rkind) {
                    (
                        Integer { bits: lbits, signed: lsigned },
                        Integer { bits: rbits, signed: rsigned },
                    ) => {
                        let bits = (*lbits).max(*rbits);
                        if op == BinaryOp::Div {
                            Ok(self.types.rational((2 * bits).min(256)))
                        } else if op == BinaryOp::Sub || *lsigned || *rsigned {
                            Ok(self.types.sint(bits))
                        } else {
                            Ok(self.types.uint(bits))
                        }
                    }
                    (Integer { bits: ibits, .. }, Rational { bits: rbits })
                    | (Rational { bits: rbits }, Integer { bits: ibits, .. }) => {
                        Ok(self.types.rational((2 * ibits).max(*rbits).min(256)))
                    }
                    (Integer { bits: ibits, .. }, Float { bits: fbits })
                    | (Float { bits: fbits }, Integer { bits: ibits, .. }) => {
                        Ok(self.types.floating((*ibits).max(*fbits).clamp(32, 128)))
                    }
                    (Integer { bits: ibits, .. }, Complex { bits: cbits })
                    | (Complex { bits: cbits }, Integer { bits: ibits, .. }) => {
                        Ok(self.types.complex((2 * ibits).max(*cbits).clamp(64, 256)))
                    }
                    (Rational { bits: lbits }, Rational { bits: rbits }) => {
                        Ok(self.types.rational((*lbits).max(*rbits)))
                    }
                    (Rational { bits: rbits }, Float { bits: fbits })
                    | (Float { bits: fbits }, Rational { bits: rbits }) => {
                        Ok(self.types.floating((rbits / 2).max(*fbits).clamp(32, 128)))
                    }
                    (Rational { bits: rbits }, Complex { bits: cbits })
                    | (Complex { bits: cbits }, Rational { bits: rbits }) => {
                        Ok(self.types.complex((*rbits).max(*cbits).clamp(64, 256)))
                    }
                    (Float { bits: lbits }, Float { bits: rbits }) => {
                        Ok(self.types.floating((*lbits).max(*rbits)))
                    }
                    (Float { bits: fbits }, Complex { bits: cbits })
                    | (Complex { bits: cbits }, Float { bits: fbits }) => {
                        Ok(self.types.complex((2 * fbits).max(*cbits).clamp(64, 256)))
                    }
                    (Complex { bits: lbits }, Complex { bits: rbits }) => {
                        Ok(self.types.complex((*lbits).max(*rbits)))
                    }
                    _ => self.binary_op_type_error(op, left, right, span),
                }
            }
        }
    }

    fn binary_op_type_error(
        &mut self,
        op: BinaryOp,
        left: TypeId,
        right: TypeId,
        span: &Span,
    ) -> Checked<TypeId> {
        let left = self.types.display(left, &self.ast);
        let right = self.types.display(right, &self.ast);
        self.error(
            codes::TYPE_MISMATCH,
            format!(
                "operator `{}` cannot be applied to `{}` and `{}`",
                op.symbol(),
                left,
                right
            ),
            span,
        );
        Err(Interrupt::Reported)
    }

    /// Casts allowed by `as`: the numeric matrix, `char` to integer,
    /// `chars`/`string` interchange, and pointer reinterpretation.
    fn cast_allowed(&self, from: TypeId, to: TypeId) -> bool {
        use TypeKind::*;
        let numeric = |kind: &TypeKind| {
            matches!(
                kind,
                Integer { .. } | Rational { .. } | Float { .. } | Complex { .. }
            )
        };
        let from_kind = self.types.kind(from);
        let to_kind = self.types.kind(to);
        match (from_kind, to_kind) {
            (a, b) if numeric(a) && numeric(b) => true,
            (Char, Integer { .. }) => true,
            (Chars | Str, Chars | Str) => true,
            (Pointer { .. }, Pointer { .. }) => true,
            _ => compatible(&self.types, from, to, false),
        }
    }

    /// Evaluator metadata entry point reachable from expression checking.
    fn eval_type_metadata_public(
        &mut self,
        ty: TypeId,
        item: &str,
        span: &Span,
    ) -> Result<crate::value::ConstValue, EvalInterrupt> {
        self.eval_type_metadata_entry(ty, item, span)
    }
}

fn numeric_bits(kind: &TypeKind) -> Option<u16> {
    match kind {
        TypeKind::Integer { bits, .. }
        | TypeKind::Rational { bits }
        | TypeKind::Float { bits }
        | TypeKind::Complex { bits } => Some(*bits),
        _ => None,
    }
}

/// Width a numeric type carries into a float-producing operation.
fn float_lift_bits(kind: &TypeKind) -> Option<u16> {
    match kind {
        TypeKind::Integer { bits, .. } => Some(*bits),
        TypeKind::Rational { bits } => Some(bits / 2),
        TypeKind::Float { bits } => Some(*bits),
        _ => None,
    }
}
