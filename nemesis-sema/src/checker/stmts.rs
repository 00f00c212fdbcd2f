//! Statement checking.

use crate::checker::{Assignability, Checked, Checker, Interrupt};
use crate::compat::{assignment_compatible, unsafe_coercion};
use crate::types::TypeKind;
use nemesis_ast::{AssignOp, BinaryOp, ContractKind, Decl, Span, Stmt, StmtId};
use nemesis_diagnostics::{codes, Diagnostic};

impl Checker {
    pub(crate) fn check_stmt(&mut self, stmt: StmtId) -> Checked<()> {
        let node = self.ast.stmt(stmt).clone();
        match node {
            Stmt::Null { .. } => Ok(()),
            Stmt::Expr { expr, .. } => self.check_expr(expr).map(|_| ()),
            Stmt::Assign {
                op,
                target,
                value,
                span,
            } => self.check_assignment(op, target, value, &span),
            Stmt::Return { value, span } => self.check_return(value, &span),
            Stmt::Break { value, span } => {
                if self.loop_depth == 0 {
                    self.error(
                        codes::UNASSIGNABLE,
                        "`break` outside of a loop",
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                if let Some(value) = value {
                    self.check_expr(value)?;
                }
                Ok(())
            }
            Stmt::Continue { span } => {
                if self.loop_depth == 0 {
                    self.error(
                        codes::UNASSIGNABLE,
                        "`continue` outside of a loop",
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                Ok(())
            }
            Stmt::Contract {
                kind,
                condition,
                span,
            } => {
                // contracts are validated here and lowered to runtime
                // checks by a later stage
                if matches!(kind, ContractKind::Require | ContractKind::Ensure)
                    && self.function_stack.is_empty()
                {
                    self.error(
                        codes::UNASSIGNABLE,
                        "`require` and `ensure` belong to a function",
                        &span,
                    );
                    return Err(Interrupt::Reported);
                }
                self.expect_bool(condition, &span)
            }
            Stmt::Decl { decl, .. } => {
                let decl_node = self.ast.decl(decl).clone();
                match decl_node {
                    Decl::Var { ref name, .. } => {
                        self.check_variable_decl(decl)?;
                        let scope = self.scope;
                        self.defer_insertion(scope, name.clone(), decl);
                        Ok(())
                    }
                    Decl::VarTupled { ref names, .. } => {
                        self.check_variable_decl(decl)?;
                        let scope = self.scope;
                        for name in names {
                            self.defer_insertion(scope, name.clone(), decl);
                        }
                        Ok(())
                    }
                    Decl::Const { ref name, .. } => {
                        self.check_constant_decl(decl)?;
                        let scope = self.scope;
                        self.defer_insertion(scope, name.clone(), decl);
                        Ok(())
                    }
                    Decl::ConstTupled { ref names, .. } => {
                        self.check_constant_decl(decl)?;
                        let scope = self.scope;
                        for name in names {
                            self.defer_insertion(scope, name.clone(), decl);
                        }
                        Ok(())
                    }
                    Decl::Function { .. } => {
                        self.declare_executable(decl)?;
                        self.check_executable(decl)
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    fn check_assignment(
        &mut self,
        op: AssignOp,
        target: nemesis_ast::ExprId,
        value: nemesis_ast::ExprId,
        span: &Span,
    ) -> Checked<()> {
        let target_ty = self.check_expr(target)?;
        self.expr_note_mut(value).must_value = true;
        let value_ty = self.check_expr(value)?;

        match self.assignability(target) {
            Assignability::Assignable => {}
            Assignability::Immutable(decl) => {
                let decl_span = self.ast.decl(decl).span().clone();
                let name = self.ast.decl(decl).name().unwrap_or("<anonymous>").to_string();
                let diag = Diagnostic::error(
                    codes::IMMUTABLE_ASSIGN,
                    format!("cannot assign through immutable `{}`", name),
                    span.clone(),
                )
                .with_note(decl_span, "the immutability is introduced here")
                .with_help("declare the binding as mutable to allow assignment");
                self.publish(diag);
                return Err(Interrupt::Reported);
            }
            Assignability::NotAssignable => {
                self.error(
                    codes::UNASSIGNABLE,
                    "this expression does not denote a storage location",
                    span,
                );
                return Err(Interrupt::Reported);
            }
        }

        let incoming = match compound_operator(op) {
            Some(binary) => self.binary_result_type(binary, target_ty, value_ty, span)?,
            None => value_ty,
        };

        if !assignment_compatible(&self.types, target_ty, incoming) {
            self.mismatch(target_ty, incoming, span);
            return Err(Interrupt::Reported);
        }
        if unsafe_coercion(&self.types, target_ty, incoming) {
            let target_name = self.types.display(target_ty, &self.ast);
            self.warning(
                codes::UNSAFE_COERCION,
                format!("assignment into `{}` from a sequence is unsafe", target_name),
                span,
            );
        }
        Ok(())
    }

    fn check_return(&mut self, value: Option<nemesis_ast::ExprId>, span: &Span) -> Checked<()> {
        let Some(function) = self.function_stack.last().copied() else {
            self.error(codes::UNASSIGNABLE, "`return` outside of a function", span);
            return Err(Interrupt::Reported);
        };

        let result_ty = match self.decl_note(function).ty.map(|ty| self.types.kind(ty).clone()) {
            Some(TypeKind::Function { result, .. }) => result,
            _ => self.types.unit(),
        };

        match value {
            Some(value) => {
                self.expr_note_mut(value).must_value = true;
                let value_ty = self.check_expr(value)?;
                if !assignment_compatible(&self.types, result_ty, value_ty) {
                    let fn_span = self.ast.decl(function).span().clone();
                    let expected = self.types.display(result_ty, &self.ast);
                    let found = self.types.display(value_ty, &self.ast);
                    let diag = Diagnostic::error(
                        codes::TYPE_MISMATCH,
                        format!(
                            "returning `{}` from a function resulting in `{}`",
                            found, expected
                        ),
                        span.clone(),
                    )
                    .with_note(fn_span, "the function's result type is declared here");
                    self.publish(diag);
                    return Err(Interrupt::Reported);
                }
            }
            None => {
                if result_ty != self.types.unit() {
                    let expected = self.types.display(result_ty, &self.ast);
                    self.error(
                        codes::TYPE_MISMATCH,
                        format!("this function must return a value of type `{}`", expected),
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
            }
        }
        Ok(())
    }
}

fn compound_operator(op: AssignOp) -> Option<BinaryOp> {
    match op {
        AssignOp::Plain => None,
        AssignOp::Add => Some(BinaryOp::Add),
        AssignOp::Sub => Some(BinaryOp::Sub),
        AssignOp::Mul => Some(BinaryOp::Mul),
        AssignOp::Div => Some(BinaryOp::Div),
        AssignOp::Rem => Some(BinaryOp::Rem),
        AssignOp::Pow => Some(BinaryOp::Pow),
        AssignOp::BitAnd => Some(BinaryOp::BitAnd),
        AssignOp::BitOr => Some(BinaryOp::BitOr),
        AssignOp::BitXor => Some(BinaryOp::BitXor),
        AssignOp::Shl => Some(BinaryOp::Shl),
        AssignOp::Shr => Some(BinaryOp::Shr),
    }
}
