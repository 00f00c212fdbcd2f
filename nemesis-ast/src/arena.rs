//! Index-based arenas for syntax nodes.
//!
//! Nodes are appended during parsing (and during generic substitution, which
//! clones subtrees) and are never removed, so every id stays valid for the
//! whole analysis.

use crate::{
    Decl, DeclId, Expr, ExprId, GenericArg, Literal, PatId, Pattern, SourceUnit, Span, Stmt,
    StmtId, TypeExpr, TypeExprId, UnitId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Ast {
    exprs: Vec<Expr>,
    stmts: Vec<Stmt>,
    decls: Vec<Decl>,
    pats: Vec<Pattern>,
    type_exprs: Vec<TypeExpr>,
    units: Vec<SourceUnit>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn push_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn push_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn push_pat(&mut self, pat: Pattern) -> PatId {
        let id = PatId(self.pats.len() as u32);
        self.pats.push(pat);
        id
    }

    pub fn push_type_expr(&mut self, ty: TypeExpr) -> TypeExprId {
        let id = TypeExprId(self.type_exprs.len() as u32);
        self.type_exprs.push(ty);
        id
    }

    pub fn push_unit(&mut self, unit: SourceUnit) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(unit);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn pat(&self, id: PatId) -> &Pattern {
        &self.pats[id.index()]
    }

    pub fn type_expr(&self, id: TypeExprId) -> &TypeExpr {
        &self.type_exprs[id.index()]
    }

    pub fn unit(&self, id: UnitId) -> &SourceUnit {
        &self.units[id.index()]
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn pat_count(&self) -> usize {
        self.pats.len()
    }

    pub fn type_expr_count(&self) -> usize {
        self.type_exprs.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len() as u32).map(UnitId)
    }
}

/// Construction helpers. These are what the parser drives when building the
/// tree; tests use them to assemble programs directly.
impl Ast {
    pub fn lit_bool(&mut self, value: bool, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Bool(value),
            span,
        })
    }

    pub fn lit_int(&mut self, lexeme: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Integer(lexeme.into()),
            span,
        })
    }

    pub fn lit_real(&mut self, lexeme: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Real(lexeme.into()),
            span,
        })
    }

    pub fn lit_imag(&mut self, lexeme: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Imaginary(lexeme.into()),
            span,
        })
    }

    pub fn lit_char(&mut self, lexeme: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Char(lexeme.into()),
            span,
        })
    }

    pub fn lit_chars(&mut self, value: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Text {
                value: value.into(),
                owned: false,
            },
            span,
        })
    }

    pub fn lit_string(&mut self, value: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Literal {
            lit: Literal::Text {
                value: value.into(),
                owned: true,
            },
            span,
        })
    }

    pub fn ident(&mut self, name: impl Into<String>, span: Span) -> ExprId {
        self.push_expr(Expr::Ident {
            name: name.into(),
            generics: Vec::new(),
            span,
        })
    }

    pub fn ident_with_generics(
        &mut self,
        name: impl Into<String>,
        generics: Vec<GenericArg>,
        span: Span,
    ) -> ExprId {
        self.push_expr(Expr::Ident {
            name: name.into(),
            generics,
            span,
        })
    }

    pub fn binary(
        &mut self,
        op: crate::BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
    ) -> ExprId {
        self.push_expr(Expr::Binary {
            op,
            left,
            right,
            span,
        })
    }

    pub fn unary(&mut self, op: crate::UnaryOp, operand: ExprId, span: Span) -> ExprId {
        self.push_expr(Expr::Unary { op, operand, span })
    }

    pub fn type_path(&mut self, name: impl Into<String>, span: Span) -> TypeExprId {
        self.push_type_expr(TypeExpr::Path {
            segments: vec![crate::PathSegment::plain(name)],
            span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryOp;

    fn span() -> Span {
        Span::unknown()
    }

    #[test]
    fn test_ids_are_stable() {
        let mut ast = Ast::new();
        let a = ast.lit_int("1", span());
        let b = ast.lit_int("2", span());
        let sum = ast.binary(BinaryOp::Add, a, b, span());

        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert!(matches!(
            ast.expr(sum),
            Expr::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut ast = Ast::new();
        let lhs = ast.lit_int("40", span());
        let rhs = ast.lit_int("2", span());
        ast.binary(BinaryOp::Add, lhs, rhs, span());

        let json = serde_json::to_string(&ast).unwrap();
        let back: Ast = serde_json::from_str(&json).unwrap();
        assert_eq!(back.expr_count(), 3);
    }
}
