//! Shared helpers for assembling test programs the way the parser would.

use nemesis_ast::{
    Ast, Decl, DeclId, ExprId, SourceUnit, Span, Stmt, StmtId, TypeExprId, WorkspaceKind,
};
use nemesis_sema::Checker;

pub fn sp() -> Span {
    Span::new("test.ns", 1, 1, 1)
}

/// Accumulates declarations for a single source unit and runs the analysis.
pub struct TestUnit {
    pub ast: Ast,
    pub decls: Vec<DeclId>,
    pub uses: Vec<DeclId>,
}

#[allow(dead_code)]
impl TestUnit {
    pub fn new() -> Self {
        Self {
            ast: Ast::new(),
            decls: Vec::new(),
            uses: Vec::new(),
        }
    }

    pub fn konst(&mut self, name: &str, ty: Option<TypeExprId>, value: ExprId) -> DeclId {
        let decl = self.ast.push_decl(Decl::Const {
            name: name.to_string(),
            ty,
            value,
            span: sp(),
        });
        self.decls.push(decl);
        decl
    }

    pub fn var(
        &mut self,
        name: &str,
        mutable: bool,
        ty: Option<TypeExprId>,
        value: Option<ExprId>,
    ) -> DeclId {
        let decl = self.ast.push_decl(Decl::Var {
            name: name.to_string(),
            mutable,
            ty,
            value,
            span: sp(),
        });
        self.decls.push(decl);
        decl
    }

    pub fn record(&mut self, name: &str, fields: Vec<(&str, TypeExprId)>) -> DeclId {
        let fields = fields
            .into_iter()
            .map(|(field_name, ty)| {
                self.ast.push_decl(Decl::Field {
                    name: field_name.to_string(),
                    ty,
                    span: sp(),
                })
            })
            .collect();
        let decl = self.ast.push_decl(Decl::Record {
            name: name.to_string(),
            generics: None,
            fields,
            span: sp(),
        });
        self.decls.push(decl);
        decl
    }

    pub fn param(&mut self, name: &str, ty: TypeExprId) -> DeclId {
        self.ast.push_decl(Decl::Param {
            name: name.to_string(),
            mutable: false,
            ty,
            span: sp(),
        })
    }

    pub fn block(&mut self, stmts: Vec<StmtId>) -> ExprId {
        self.ast.push_expr(nemesis_ast::Expr::Block { stmts, span: sp() })
    }

    pub fn function(
        &mut self,
        name: &str,
        generics: Option<DeclId>,
        params: Vec<DeclId>,
        result: Option<TypeExprId>,
        body: ExprId,
    ) -> DeclId {
        let decl = self.ast.push_decl(Decl::Function {
            name: name.to_string(),
            generics,
            params,
            result,
            body: Some(body),
            span: sp(),
        });
        self.decls.push(decl);
        decl
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.ast.push_stmt(Stmt::Expr { expr, span: sp() })
    }

    pub fn analyze(self, name: &str, kind: WorkspaceKind) -> Checker {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ast = self.ast;
        ast.push_unit(SourceUnit {
            path: format!("{}.ns", name),
            workspace: Some((name.to_string(), kind)),
            uses: self.uses,
            decls: self.decls,
            span: sp(),
        });
        let mut checker = Checker::new(ast);
        checker.check();
        checker
    }

    pub fn analyze_lib(self) -> Checker {
        self.analyze("demo", WorkspaceKind::Lib)
    }

    pub fn analyze_app(self) -> Checker {
        self.analyze("demo", WorkspaceKind::App)
    }
}

/// True when some published diagnostic carries `code`.
#[allow(dead_code)]
pub fn has_code(checker: &Checker, code: &str) -> bool {
    checker
        .diagnostics()
        .diagnostics()
        .iter()
        .any(|diag| diag.code == code)
}

/// True when some published diagnostic message contains `fragment`.
#[allow(dead_code)]
pub fn has_message(checker: &Checker, fragment: &str) -> bool {
    checker
        .diagnostics()
        .diagnostics()
        .iter()
        .any(|diag| diag.message.contains(fragment))
}
