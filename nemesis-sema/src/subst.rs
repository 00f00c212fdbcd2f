//! Generic substitution engine.
//!
//! Rewrites a parametric syntax subtree by cloning it and binding every
//! reference to a generic parameter to the supplied argument. Clones keep
//! the original spans (diagnostics must point at real source) but get fresh
//! annotation slots; the only annotations written here are the bindings
//! themselves — the checker re-runs on the clone and fills in the rest.

use crate::checker::Checker;
use crate::types::TypeId;
use crate::value::ConstValue;
use nemesis_ast::{
    Decl, DeclId, Expr, ExprId, PatId, Pattern, Stmt, StmtId, TypeExpr, TypeExprId, WhenArm,
};
use std::collections::HashMap;

/// Argument bound to one generic parameter.
#[derive(Debug, Clone)]
pub enum SubstArg {
    Type(TypeId),
    Value(ConstValue),
    /// Partial specialization: the parameter is rewritten to another
    /// generic parameter.
    Rebind(DeclId),
}

/// A substitution map. Parameters are addressed both by their declaration
/// id (when the template was already resolved) and by their lexeme (when a
/// reference has not been resolved yet).
#[derive(Debug, Default, Clone)]
pub struct Substitution {
    by_decl: HashMap<DeclId, SubstArg>,
    by_name: HashMap<String, SubstArg>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, param: DeclId, name: impl Into<String>, arg: SubstArg) {
        self.by_decl.insert(param, arg.clone());
        self.by_name.insert(name.into(), arg);
    }

    pub fn is_empty(&self) -> bool {
        self.by_decl.is_empty() && self.by_name.is_empty()
    }

    fn lookup(&self, referenced: Option<DeclId>, name: &str) -> Option<&SubstArg> {
        if let Some(decl) = referenced {
            if let Some(arg) = self.by_decl.get(&decl) {
                return Some(arg);
            }
        }
        self.by_name.get(name)
    }
}

impl Checker {
    /// Clones the declaration subtree rooted at `root`, rewriting generic
    /// parameter references per `subst`. The clone is appended to the arena
    /// and is not checked here.
    pub(crate) fn substitute_decl(&mut self, root: DeclId, subst: &Substitution) -> DeclId {
        let cloned = self.subst_decl(root, subst);
        self.sync_notes();
        cloned
    }

    fn subst_decl(&mut self, id: DeclId, s: &Substitution) -> DeclId {
        let node = self.ast.decl(id).clone();
        let replacement = match node {
            Decl::Var {
                name,
                mutable,
                ty,
                value,
                span,
            } => Decl::Var {
                name,
                mutable,
                ty: ty.map(|t| self.subst_type_expr(t, s)),
                value: value.map(|v| self.subst_expr(v, s)),
                span,
            },
            Decl::VarTupled {
                names,
                mutable,
                ty,
                value,
                span,
            } => Decl::VarTupled {
                names,
                mutable,
                ty: ty.map(|t| self.subst_type_expr(t, s)),
                value: self.subst_expr(value, s),
                span,
            },
            Decl::Const { name, ty, value, span } => Decl::Const {
                name,
                ty: ty.map(|t| self.subst_type_expr(t, s)),
                value: self.subst_expr(value, s),
                span,
            },
            Decl::ConstTupled { names, value, span } => Decl::ConstTupled {
                names,
                value: self.subst_expr(value, s),
                span,
            },
            Decl::Field { name, ty, span } => Decl::Field {
                name,
                ty: self.subst_type_expr(ty, s),
                span,
            },
            Decl::TupleField { index, ty, span } => Decl::TupleField {
                index,
                ty: self.subst_type_expr(ty, s),
                span,
            },
            Decl::Param {
                name,
                mutable,
                ty,
                span,
            } => Decl::Param {
                name,
                mutable,
                ty: self.subst_type_expr(ty, s),
                span,
            },
            Decl::GenericClause {
                params,
                constraint,
                span,
            } => Decl::GenericClause {
                params: params.iter().map(|p| self.subst_decl(*p, s)).collect(),
                constraint: constraint.map(|c| self.subst_expr(c, s)),
                span,
            },
            Decl::GenericTypeParam { .. } | Decl::GenericConstParam { .. } => node,
            Decl::Record {
                name,
                generics,
                fields,
                span,
            } => Decl::Record {
                name,
                generics: generics.map(|g| self.subst_decl(g, s)),
                fields: fields.iter().map(|f| self.subst_decl(*f, s)).collect(),
                span,
            },
            Decl::Variant {
                name,
                generics,
                members,
                span,
            } => Decl::Variant {
                name,
                generics: generics.map(|g| self.subst_decl(g, s)),
                members: members
                    .iter()
                    .map(|m| self.subst_type_expr(*m, s))
                    .collect(),
                span,
            },
            Decl::RangeDecl {
                name,
                generics,
                constraint,
                span,
            } => Decl::RangeDecl {
                name,
                generics: generics.map(|g| self.subst_decl(g, s)),
                constraint: self.subst_expr(constraint, s),
                span,
            },
            Decl::Alias {
                name,
                generics,
                target,
                span,
            } => Decl::Alias {
                name,
                generics: generics.map(|g| self.subst_decl(g, s)),
                target: self.subst_type_expr(target, s),
                span,
            },
            Decl::Concept {
                name,
                generics,
                prototypes,
                span,
            } => Decl::Concept {
                name,
                generics: self.subst_decl(generics, s),
                prototypes: prototypes.iter().map(|p| self.subst_decl(*p, s)).collect(),
                span,
            },
            Decl::Behaviour {
                name,
                generics,
                items,
                span,
            } => Decl::Behaviour {
                name,
                generics: generics.map(|g| self.subst_decl(g, s)),
                items: items.iter().map(|i| self.subst_decl(*i, s)).collect(),
                span,
            },
            Decl::Extend {
                generics,
                target,
                behaviours,
                items,
                span,
            } => Decl::Extend {
                generics: generics.map(|g| self.subst_decl(g, s)),
                target: self.subst_type_expr(target, s),
                behaviours: behaviours
                    .iter()
                    .map(|b| self.subst_type_expr(*b, s))
                    .collect(),
                items: items.iter().map(|i| self.subst_decl(*i, s)).collect(),
                span,
            },
            Decl::Extern { items, span } => Decl::Extern {
                items: items.iter().map(|i| self.subst_decl(*i, s)).collect(),
                span,
            },
            Decl::Function {
                name,
                generics,
                params,
                result,
                body,
                span,
            } => Decl::Function {
                name,
                // the clause survives so partially specialized clones stay
                // parametric over their remaining parameters
                generics: generics.map(|g| self.subst_decl(g, s)),
                params: params.iter().map(|p| self.subst_decl(*p, s)).collect(),
                result: result.map(|r| self.subst_type_expr(r, s)),
                body: body.map(|b| self.subst_expr(b, s)),
                span,
            },
            Decl::Property {
                name,
                params,
                result,
                body,
                span,
            } => Decl::Property {
                name,
                params: params.iter().map(|p| self.subst_decl(*p, s)).collect(),
                result: result.map(|r| self.subst_type_expr(r, s)),
                body: body.map(|b| self.subst_expr(b, s)),
                span,
            },
            Decl::Test { name, body, span } => Decl::Test {
                name,
                body: self.subst_expr(body, s),
                span,
            },
            Decl::Use { .. } => node,
        };

        self.ast.push_decl(replacement)
    }

    pub(crate) fn subst_expr(&mut self, id: ExprId, s: &Substitution) -> ExprId {
        let node = self.ast.expr(id).clone();
        let original_note = self.expr_note(id).clone();

        let replacement = match node {
            Expr::Literal { .. } => node,
            Expr::Ident {
                ref name,
                ref generics,
                ref span,
            } => {
                let binding = s.lookup(original_note.referenced, name).cloned();
                let cloned = Expr::Ident {
                    name: name.clone(),
                    generics: generics
                        .iter()
                        .map(|g| self.subst_generic_arg(g, s))
                        .collect(),
                    span: span.clone(),
                };
                let new_id = self.ast.push_expr(cloned);
                match binding {
                    Some(SubstArg::Value(value)) => {
                        self.expr_note_mut(new_id).value = Some(value);
                    }
                    Some(SubstArg::Type(ty)) => {
                        let note = self.expr_note_mut(new_id);
                        note.ty = Some(ty);
                        note.is_type = true;
                    }
                    Some(SubstArg::Rebind(param)) => {
                        let note = self.expr_note_mut(new_id);
                        note.referenced = Some(param);
                        note.is_parametric = true;
                    }
                    None => {}
                }
                return new_id;
            }
            Expr::Tuple { elements, span } => Expr::Tuple {
                elements: elements.iter().map(|e| self.subst_expr(*e, s)).collect(),
                span,
            },
            Expr::Array { elements, span } => Expr::Array {
                elements: elements.iter().map(|e| self.subst_expr(*e, s)).collect(),
                span,
            },
            Expr::ArraySized { value, size, span } => Expr::ArraySized {
                value: self.subst_expr(value, s),
                size: self.subst_expr(size, s),
                span,
            },
            Expr::Paren { inner, span } => Expr::Paren {
                inner: self.subst_expr(inner, s),
                span,
            },
            Expr::Block { stmts, span } => Expr::Block {
                stmts: stmts.iter().map(|st| self.subst_stmt(*st, s)).collect(),
                span,
            },
            Expr::Lambda {
                params,
                result,
                body,
                span,
            } => Expr::Lambda {
                params: params.iter().map(|p| self.subst_decl(*p, s)).collect(),
                result: result.map(|r| self.subst_type_expr(r, s)),
                body: self.subst_expr(body, s),
                span,
            },
            Expr::Call { callee, args, span } => Expr::Call {
                callee: self.subst_expr(callee, s),
                args: args.iter().map(|a| self.subst_expr(*a, s)).collect(),
                span,
            },
            Expr::Member { object, member, span } => Expr::Member {
                object: self.subst_expr(object, s),
                member: self.subst_expr(member, s),
                span,
            },
            Expr::Index { object, index, span } => Expr::Index {
                object: self.subst_expr(object, s),
                index: self.subst_expr(index, s),
                span,
            },
            Expr::TupleIndex { object, index, span } => Expr::TupleIndex {
                object: self.subst_expr(object, s),
                index,
                span,
            },
            Expr::RecordInit { path, fields, span } => Expr::RecordInit {
                path: self.subst_expr(path, s),
                fields: fields
                    .iter()
                    .map(|(name, value)| (name.clone(), self.subst_expr(*value, s)))
                    .collect(),
                span,
            },
            Expr::Unary { op, operand, span } => Expr::Unary {
                op,
                operand: self.subst_expr(operand, s),
                span,
            },
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => Expr::Binary {
                op,
                left: self.subst_expr(left, s),
                right: self.subst_expr(right, s),
                span,
            },
            Expr::Cast { value, target, span } => Expr::Cast {
                value: self.subst_expr(value, s),
                target: self.subst_type_expr(target, s),
                span,
            },
            Expr::Range {
                start,
                end,
                inclusive,
                span,
            } => Expr::Range {
                start: start.map(|e| self.subst_expr(e, s)),
                end: end.map(|e| self.subst_expr(e, s)),
                inclusive,
                span,
            },
            Expr::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => Expr::If {
                condition: self.subst_expr(condition, s),
                then_branch: self.subst_expr(then_branch, s),
                else_branch: else_branch.map(|e| self.subst_expr(e, s)),
                span,
            },
            Expr::When {
                scrutinee,
                arms,
                else_arm,
                span,
            } => Expr::When {
                scrutinee: self.subst_expr(scrutinee, s),
                arms: arms
                    .iter()
                    .map(|arm| WhenArm {
                        pattern: self.subst_pat(arm.pattern, s),
                        guard: arm.guard.map(|g| self.subst_expr(g, s)),
                        body: self.subst_expr(arm.body, s),
                    })
                    .collect(),
                else_arm: else_arm.map(|e| self.subst_expr(e, s)),
                span,
            },
            Expr::ForIn {
                pattern,
                iterable,
                body,
                contracts,
                span,
            } => Expr::ForIn {
                pattern: self.subst_pat(pattern, s),
                iterable: self.subst_expr(iterable, s),
                body: self.subst_expr(body, s),
                contracts: contracts.iter().map(|c| self.subst_stmt(*c, s)).collect(),
                span,
            },
            Expr::Loop {
                condition,
                body,
                contracts,
                span,
            } => Expr::Loop {
                condition: condition.map(|c| self.subst_expr(c, s)),
                body: self.subst_expr(body, s),
                contracts: contracts.iter().map(|c| self.subst_stmt(*c, s)).collect(),
                span,
            },
            Expr::Is { value, target, span } => Expr::Is {
                value: self.subst_expr(value, s),
                target: self.subst_type_expr(target, s),
                span,
            },
        };

        self.ast.push_expr(replacement)
    }

    fn subst_stmt(&mut self, id: StmtId, s: &Substitution) -> StmtId {
        let node = self.ast.stmt(id).clone();
        let replacement = match node {
            Stmt::Null { .. } | Stmt::Continue { .. } => node,
            Stmt::Expr { expr, span } => Stmt::Expr {
                expr: self.subst_expr(expr, s),
                span,
            },
            Stmt::Assign {
                op,
                target,
                value,
                span,
            } => Stmt::Assign {
                op,
                target: self.subst_expr(target, s),
                value: self.subst_expr(value, s),
                span,
            },
            Stmt::Return { value, span } => Stmt::Return {
                value: value.map(|v| self.subst_expr(v, s)),
                span,
            },
            Stmt::Break { value, span } => Stmt::Break {
                value: value.map(|v| self.subst_expr(v, s)),
                span,
            },
            Stmt::Contract {
                kind,
                condition,
                span,
            } => Stmt::Contract {
                kind,
                condition: self.subst_expr(condition, s),
                span,
            },
            Stmt::Decl { decl, span } => Stmt::Decl {
                decl: self.subst_decl(decl, s),
                span,
            },
        };

        self.ast.push_stmt(replacement)
    }

    fn subst_pat(&mut self, id: PatId, s: &Substitution) -> PatId {
        let node = self.ast.pat(id).clone();
        let replacement = match node {
            Pattern::Wildcard { .. }
            | Pattern::Rest { .. }
            | Pattern::Literal { .. }
            | Pattern::Bind { .. }
            | Pattern::Path { .. } => node,
            Pattern::Tuple { elements, span } => Pattern::Tuple {
                elements: elements.iter().map(|e| self.subst_pat(*e, s)).collect(),
                span,
            },
            Pattern::Array { elements, span } => Pattern::Array {
                elements: elements.iter().map(|e| self.subst_pat(*e, s)).collect(),
                span,
            },
            Pattern::Record {
                segments,
                elements,
                span,
            } => Pattern::Record {
                segments,
                elements: elements.iter().map(|e| self.subst_pat(*e, s)).collect(),
                span,
            },
            Pattern::LabeledRecord {
                segments,
                fields,
                span,
            } => Pattern::LabeledRecord {
                segments,
                fields: fields
                    .iter()
                    .map(|(name, pat)| (name.clone(), self.subst_pat(*pat, s)))
                    .collect(),
                span,
            },
            Pattern::Range {
                start,
                end,
                inclusive,
                span,
            } => Pattern::Range {
                start: self.subst_expr(start, s),
                end: self.subst_expr(end, s),
                inclusive,
                span,
            },
            Pattern::Or { alternatives, span } => Pattern::Or {
                alternatives: alternatives.iter().map(|a| self.subst_pat(*a, s)).collect(),
                span,
            },
            Pattern::Is { target, span } => Pattern::Is {
                target: self.subst_type_expr(target, s),
                span,
            },
        };

        self.ast.push_pat(replacement)
    }

    pub(crate) fn subst_type_expr(&mut self, id: TypeExprId, s: &Substitution) -> TypeExprId {
        let node = self.ast.type_expr(id).clone();
        let original_note = self.type_expr_note(id).clone();

        let replacement = match node {
            TypeExpr::Path { ref segments, ref span } => {
                // a single plain segment naming a bound type parameter is
                // rewritten to the argument
                if segments.len() == 1 && segments[0].generics.is_empty() {
                    let binding = s
                        .lookup(original_note.referenced, &segments[0].name)
                        .cloned();
                    let new_id = self.ast.push_type_expr(TypeExpr::Path {
                        segments: segments.clone(),
                        span: span.clone(),
                    });
                    match binding {
                        Some(SubstArg::Type(ty)) => {
                            let note = self.type_expr_note_mut(new_id);
                            note.ty = Some(ty);
                            note.is_type = true;
                        }
                        Some(SubstArg::Rebind(param)) => {
                            let note = self.type_expr_note_mut(new_id);
                            note.referenced = Some(param);
                            note.is_parametric = true;
                        }
                        _ => {}
                    }
                    return new_id;
                }

                TypeExpr::Path {
                    segments: segments
                        .iter()
                        .map(|segment| nemesis_ast::PathSegment {
                            name: segment.name.clone(),
                            generics: segment
                                .generics
                                .iter()
                                .map(|g| self.subst_generic_arg(g, s))
                                .collect(),
                        })
                        .collect(),
                    span: span.clone(),
                }
            }
            TypeExpr::Array { elem, size, span } => TypeExpr::Array {
                elem: self.subst_type_expr(elem, s),
                size: self.subst_expr(size, s),
                span,
            },
            TypeExpr::Slice { elem, span } => TypeExpr::Slice {
                elem: self.subst_type_expr(elem, s),
                span,
            },
            TypeExpr::Tuple { components, span } => TypeExpr::Tuple {
                components: components
                    .iter()
                    .map(|c| self.subst_type_expr(*c, s))
                    .collect(),
                span,
            },
            TypeExpr::Pointer { pointee, span } => TypeExpr::Pointer {
                pointee: self.subst_type_expr(pointee, s),
                span,
            },
            TypeExpr::Function {
                params,
                result,
                span,
            } => TypeExpr::Function {
                params: params.iter().map(|p| self.subst_type_expr(*p, s)).collect(),
                result: result.map(|r| self.subst_type_expr(r, s)),
                span,
            },
            TypeExpr::Record { fields, span } => TypeExpr::Record {
                fields: fields.iter().map(|f| self.subst_decl(*f, s)).collect(),
                span,
            },
            TypeExpr::Variant { members, span } => TypeExpr::Variant {
                members: members
                    .iter()
                    .map(|m| self.subst_type_expr(*m, s))
                    .collect(),
                span,
            },
        };

        self.ast.push_type_expr(replacement)
    }

    fn subst_generic_arg(
        &mut self,
        arg: &nemesis_ast::GenericArg,
        s: &Substitution,
    ) -> nemesis_ast::GenericArg {
        match arg {
            nemesis_ast::GenericArg::Type(ty) => {
                nemesis_ast::GenericArg::Type(self.subst_type_expr(*ty, s))
            }
            nemesis_ast::GenericArg::Const(expr) => {
                nemesis_ast::GenericArg::Const(self.subst_expr(*expr, s))
            }
        }
    }

}
