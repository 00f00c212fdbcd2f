//! The checker: a multi-pass walker over the syntax tree.
//!
//! Pass 0 registers workspaces and imports. Pass 1 hoists top-level type
//! names as placeholders. Pass 2 checks type declaration bodies. Pass 3
//! checks signatures, initializers, bodies and tests, calling the constant
//! evaluator and the substitution engine on demand. Pass 4 identifies the
//! entry point and reports unused imports. Each pass runs to completion
//! across every source unit before the next begins, so diagnostics are
//! stable across runs.
//!
//! Control flow uses explicit sentinels instead of unwinding: `Reported`
//! (a diagnostic was already published) is caught at statement and
//! declaration boundaries, `AbortUnit` abandons the current source unit and
//! resumes with the next one.

mod decls;
mod exprs;
mod generics;
mod stmts;
mod type_exprs;

use crate::scope::{NodeRef, ScopeId, ScopeKind, ScopeTree};
use crate::types::{TypeId, TypeKind, TypeTable};
use crate::value::ConstValue;
use nemesis_ast::{Ast, Decl, DeclId, ExprId, PatId, Span, TypeExprId, UnitId, WorkspaceKind};
use nemesis_diagnostics::{codes, Diagnostic, DiagnosticEngine};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub use generics::InstantiationRecord;

/// Analysis results attached to a syntax node. The parser leaves all fields
/// defaulted; the checker fills them in.
#[derive(Debug, Clone, Default)]
pub struct Annotation {
    pub ty: Option<TypeId>,
    pub value: Option<ConstValue>,
    pub referenced: Option<DeclId>,
    pub scope: Option<ScopeId>,
    /// The node names a type rather than a value.
    pub is_type: bool,
    /// The node depends on an unbound generic parameter.
    pub is_parametric: bool,
    /// The context requires a value here; a type name is an error.
    pub must_value: bool,
    /// Deep checking of this node was abandoned after a diagnosed error.
    pub invalid: bool,
}

/// Side tables holding one annotation per node, indexed by node id. Kept
/// outside the tree so the arena stays immutable during analysis; the
/// tables grow when substitution clones subtrees.
#[derive(Debug, Default)]
pub struct NodeNotes {
    exprs: Vec<Annotation>,
    decls: Vec<Annotation>,
    pats: Vec<Annotation>,
    type_exprs: Vec<Annotation>,
}

impl NodeNotes {
    fn sync(&mut self, ast: &Ast) {
        self.exprs.resize(ast.expr_count(), Annotation::default());
        self.decls.resize(ast.decl_count(), Annotation::default());
        self.pats.resize(ast.pat_count(), Annotation::default());
        self.type_exprs
            .resize(ast.type_expr_count(), Annotation::default());
    }
}

/// Non-local exits of the checker, caught at statement and declaration
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupt {
    /// A diagnostic was already published; skip the enclosing construct.
    #[error("semantic error already reported")]
    Reported,
    /// Unrecoverable inconsistency; abandon the current source unit.
    #[error("analysis of the current source unit aborted")]
    AbortUnit,
}

pub type Checked<T> = Result<T, Interrupt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Pass {
    Zero,
    First,
    Second,
    Third,
    Fourth,
}

/// A named aggregate of source units sharing exported declarations.
#[derive(Debug)]
pub struct Workspace {
    pub name: String,
    pub kind: WorkspaceKind,
    pub scope: ScopeId,
    pub units: Vec<UnitId>,
    /// Workspace names this one imports (the core workspace is implicit).
    pub imports: BTreeSet<String>,
}

pub struct Checker {
    pub(crate) ast: Ast,
    pub(crate) types: TypeTable,
    pub(crate) scopes: ScopeTree,
    pub(crate) notes: NodeNotes,
    pub(crate) diagnostics: DiagnosticEngine,
    pub(crate) workspaces: BTreeMap<String, Workspace>,
    pub(crate) pass: Pass,
    pub(crate) scope: ScopeId,
    pub(crate) current_unit: Option<UnitId>,
    /// Enclosing function declarations, innermost last.
    pub(crate) function_stack: Vec<DeclId>,
    pub(crate) loop_depth: usize,
    pub(crate) entry_point: Option<DeclId>,
    /// Declarations scheduled for insertion while a scope's statement list
    /// is being walked; committed at the next safe point.
    pub(crate) pending_insertions: Vec<(ScopeId, String, DeclId)>,
    pub(crate) instantiations: Vec<InstantiationRecord>,
    /// Constants currently being evaluated, for cycle detection.
    pub(crate) const_stack: Vec<DeclId>,
    /// Type declarations currently being resolved, for cycle detection.
    pub(crate) type_stack: Vec<DeclId>,
    pub(crate) used_imports: HashSet<DeclId>,
    /// Clones produced by full instantiation; checked as concrete even
    /// though they still carry a generic clause.
    pub(crate) instantiated: HashSet<DeclId>,
}

impl Checker {
    pub fn new(ast: Ast) -> Self {
        let mut notes = NodeNotes::default();
        notes.sync(&ast);
        Self {
            ast,
            types: TypeTable::new(),
            scopes: ScopeTree::new(),
            notes,
            diagnostics: DiagnosticEngine::new(),
            workspaces: BTreeMap::new(),
            pass: Pass::Zero,
            scope: ScopeId(0),
            current_unit: None,
            function_stack: Vec::new(),
            loop_depth: 0,
            entry_point: None,
            pending_insertions: Vec::new(),
            instantiations: Vec::new(),
            const_stack: Vec::new(),
            type_stack: Vec::new(),
            used_imports: HashSet::new(),
            instantiated: HashSet::new(),
        }
    }

    /// Runs the whole pipeline.
    pub fn check(&mut self) {
        self.scope = self.scopes.root();

        log::debug!("pass 0: workspace registration");
        self.pass = Pass::Zero;
        self.register_workspaces();

        log::debug!("pass 1: type name hoisting");
        self.pass = Pass::First;
        self.hoist_type_names();

        log::debug!("pass 2: type bodies");
        self.pass = Pass::Second;
        self.check_type_bodies();

        log::debug!("pass 3: executables");
        self.pass = Pass::Third;
        self.check_executables();

        log::debug!("pass 4: post-check");
        self.pass = Pass::Fourth;
        self.post_check();
    }

    // Accessors for analysis results

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn diagnostics(&self) -> &DiagnosticEngine {
        &self.diagnostics
    }

    pub fn entry_point(&self) -> Option<DeclId> {
        self.entry_point
    }

    pub fn instantiations(&self) -> &[InstantiationRecord] {
        &self.instantiations
    }

    pub fn workspace(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.get(name)
    }

    pub fn expr_note(&self, id: ExprId) -> &Annotation {
        &self.notes.exprs[id.index()]
    }

    pub fn decl_note(&self, id: DeclId) -> &Annotation {
        &self.notes.decls[id.index()]
    }

    pub fn pat_note(&self, id: PatId) -> &Annotation {
        &self.notes.pats[id.index()]
    }

    pub fn type_expr_note(&self, id: TypeExprId) -> &Annotation {
        &self.notes.type_exprs[id.index()]
    }

    pub(crate) fn expr_note_mut(&mut self, id: ExprId) -> &mut Annotation {
        self.notes.sync(&self.ast);
        &mut self.notes.exprs[id.index()]
    }

    pub(crate) fn decl_note_mut(&mut self, id: DeclId) -> &mut Annotation {
        self.notes.sync(&self.ast);
        &mut self.notes.decls[id.index()]
    }

    pub(crate) fn pat_note_mut(&mut self, id: PatId) -> &mut Annotation {
        self.notes.sync(&self.ast);
        &mut self.notes.pats[id.index()]
    }

    pub(crate) fn type_expr_note_mut(&mut self, id: TypeExprId) -> &mut Annotation {
        self.notes.sync(&self.ast);
        &mut self.notes.type_exprs[id.index()]
    }

    /// Grows the note tables after substitution appended cloned nodes.
    pub(crate) fn sync_notes(&mut self) {
        self.notes.sync(&self.ast);
    }

    // Diagnostics helpers

    pub(crate) fn error(&mut self, code: &str, message: impl Into<String>, span: &Span) {
        self.diagnostics
            .publish(Diagnostic::error(code, message, span.clone()));
    }

    pub(crate) fn warning(&mut self, code: &str, message: impl Into<String>, span: &Span) {
        self.diagnostics
            .publish(Diagnostic::warning(code, message, span.clone()));
    }

    pub(crate) fn publish(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.publish(diagnostic);
    }

    /// Reports an unresolved name with up to three nearby suggestions.
    pub(crate) fn unresolved(&mut self, name: &str, span: &Span) {
        let suggestions = self.scopes.similars(self.scope, name);
        let mut diag = Diagnostic::error(
            codes::UNRESOLVED_NAME,
            format!("cannot find `{}` in this scope", name),
            span.clone(),
        );
        if !suggestions.is_empty() {
            diag = diag.with_help(format!("did you mean `{}`?", suggestions.join("`, `")));
        }
        self.publish(diag);
    }

    // Scope discipline

    /// Opens a child scope, runs `f` inside it, and restores the previous
    /// scope afterwards. Deferred insertions are committed on exit, the safe
    /// point where no statement list is being iterated.
    pub(crate) fn in_scope<T>(
        &mut self,
        kind: ScopeKind,
        origin: Option<NodeRef>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let opened = match origin.and_then(|node| self.scopes.of_node(node)) {
            Some(existing) => existing,
            None => self.scopes.open(self.scope, kind, origin),
        };
        let previous = std::mem::replace(&mut self.scope, opened);
        let result = f(self);
        self.scope = previous;
        self.commit_pending();
        result
    }

    /// Runs `f` with `scope` as the current scope.
    pub(crate) fn in_existing_scope<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    /// Binds `decl` under `name` in `scope`, reporting a redefinition error
    /// that points at both sites when the name is already taken there.
    pub(crate) fn add_to_scope(&mut self, scope: ScopeId, name: &str, decl: DeclId) {
        if let Err(existing) = self.scopes.define(scope, name, decl) {
            if existing == decl {
                return;
            }
            let span = self.ast.decl(decl).span().clone();
            let previous = self.ast.decl(existing).span().clone();
            let diag = Diagnostic::error(
                codes::DUPLICATE_DEFINITION,
                format!("the name `{}` is defined multiple times", name),
                span.clone(),
            )
            .with_note(previous.clone(), "previous definition is here");
            self.publish(diag);
            self.decl_note_mut(decl).invalid = true;
        }
    }

    /// Schedules an insertion for the next safe point, so walks over the
    /// enclosing statement list are not invalidated.
    pub(crate) fn defer_insertion(&mut self, scope: ScopeId, name: String, decl: DeclId) {
        self.pending_insertions.push((scope, name, decl));
    }

    /// Drains the deferred-insertion queue in insertion order.
    pub(crate) fn commit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_insertions);
        for (scope, name, decl) in pending {
            self.add_to_scope(scope, &name, decl);
        }
    }

    // Path resolution

    /// Resolves a plain identifier by walking the scope chain.
    pub(crate) fn resolve_name(&self, name: &str) -> Option<DeclId> {
        self.scopes.lookup(self.scope, name).map(|(decl, _)| decl)
    }

    /// Resolves a dotted path. The head resolves in the current chain; each
    /// further component descends into the named scope of the previous one
    /// (workspace members, type extension members, variant member kinds).
    pub(crate) fn resolve_path(&mut self, segments: &[String], span: &Span) -> Checked<DeclId> {
        let Some((first, rest)) = segments.split_first() else {
            return Err(Interrupt::Reported);
        };

        let mut current = match self.resolve_name(first) {
            Some(decl) => decl,
            None => {
                self.unresolved(first, span);
                return Err(Interrupt::Reported);
            }
        };

        for segment in rest {
            match self.resolve_member_in(current, segment) {
                Some(next) => current = next,
                None => {
                    let owner = self
                        .ast
                        .decl(current)
                        .name()
                        .unwrap_or("<anonymous>")
                        .to_string();
                    self.error(
                        codes::UNRESOLVED_NAME,
                        format!("cannot find `{}` in `{}`", segment, owner),
                        span,
                    );
                    return Err(Interrupt::Reported);
                }
            }
        }

        Ok(current)
    }

    /// Finds `name` among the members reachable from declaration `owner`.
    pub(crate) fn resolve_member_in(&mut self, owner: DeclId, name: &str) -> Option<DeclId> {
        // workspace member
        if let Some(scope) = self.scopes.of_node(NodeRef::Decl(owner)) {
            if let Some(found) = self.scopes.lookup_local(scope, name) {
                return Some(found);
            }
        }

        // a use declaration forwards to the imported workspace
        if let Decl::Use { path, .. } = self.ast.decl(owner) {
            let target = path.last().cloned();
            if let Some(target) = target {
                self.used_imports.insert(owner);
                if let Some(workspace) = self.workspaces.get(&target) {
                    let scope = workspace.scope;
                    return self.scopes.lookup_local(scope, name);
                }
            }
        }

        // members injected by extensions of the owner's type
        if let Some(ty) = self.decl_note(owner).ty {
            let extensions: Vec<DeclId> = self.types.extensions(ty).collect();
            for extension in extensions {
                if let Some(scope) = self.scopes.of_node(NodeRef::Decl(extension)) {
                    if let Some(found) = self.scopes.lookup_local(scope, name) {
                        return Some(found);
                    }
                }
            }

            // variant member kind: `Shape.Circle`
            if let TypeKind::Variant { members } = self.types.kind(ty) {
                for member in members.clone() {
                    if let Some(member_decl) = self.types.decl(member) {
                        if self.ast.decl(member_decl).name() == Some(name) {
                            return Some(member_decl);
                        }
                    }
                }
            }
        }

        None
    }

    // Immutability and assignability

    /// Decides whether `expr` denotes a storage location that may be
    /// assigned through, and if not, why.
    pub(crate) fn assignability(&self, expr: ExprId) -> Assignability {
        match self.ast.expr(expr) {
            nemesis_ast::Expr::Ident { .. } => match self.expr_note(expr).referenced {
                Some(decl) => match self.ast.decl(decl) {
                    Decl::Var { mutable: true, .. } | Decl::VarTupled { mutable: true, .. } => {
                        Assignability::Assignable
                    }
                    Decl::Param { mutable: true, .. } => Assignability::Assignable,
                    Decl::Var { mutable: false, .. }
                    | Decl::VarTupled { mutable: false, .. }
                    | Decl::Param { mutable: false, .. }
                    | Decl::Const { .. }
                    | Decl::ConstTupled { .. } => Assignability::Immutable(decl),
                    _ => Assignability::NotAssignable,
                },
                None => Assignability::NotAssignable,
            },
            nemesis_ast::Expr::Paren { inner, .. } => self.assignability(*inner),
            nemesis_ast::Expr::Unary {
                op: nemesis_ast::UnaryOp::Deref,
                operand,
                ..
            } => self.assignability(*operand),
            nemesis_ast::Expr::Index { object, .. }
            | nemesis_ast::Expr::TupleIndex { object, .. }
            | nemesis_ast::Expr::Member { object, .. } => self.assignability(*object),
            _ => Assignability::NotAssignable,
        }
    }

    // Pass 0: workspace registration

    fn register_workspaces(&mut self) {
        let unit_ids: Vec<UnitId> = self.ast.unit_ids().collect();

        // the core workspace exists even when no unit declares it
        self.ensure_workspace("core", WorkspaceKind::Lib);

        for unit in unit_ids {
            let (name, kind) = self
                .ast
                .unit(unit)
                .workspace
                .clone()
                .unwrap_or_else(|| ("main".to_string(), WorkspaceKind::App));
            let workspace_scope = self.ensure_workspace(&name, kind);

            let uses: Vec<DeclId> = self.ast.unit(unit).uses.clone();
            for use_decl in uses {
                if let Decl::Use { path, .. } = self.ast.decl(use_decl).clone() {
                    if let Some(imported) = path.last() {
                        if let Some(workspace) = self.workspaces.get_mut(&name) {
                            workspace.imports.insert(imported.clone());
                        }
                        // the name becomes visible in the workspace scope
                        self.add_to_scope(workspace_scope, imported, use_decl);
                    }
                }
            }

            if let Some(workspace) = self.workspaces.get_mut(&name) {
                workspace.units.push(unit);
            }
        }
    }

    fn ensure_workspace(&mut self, name: &str, kind: WorkspaceKind) -> ScopeId {
        if let Some(workspace) = self.workspaces.get(name) {
            return workspace.scope;
        }
        let scope = self.scopes.open(self.scopes.root(), ScopeKind::Workspace, None);
        let mut imports = BTreeSet::new();
        if name != "core" {
            imports.insert("core".to_string());
        }
        self.workspaces.insert(
            name.to_string(),
            Workspace {
                name: name.to_string(),
                kind,
                scope,
                units: Vec::new(),
                imports,
            },
        );
        scope
    }

    /// Iterates `(workspace scope, unit)` pairs in the deterministic order
    /// used by every pass.
    fn units_in_order(&self) -> Vec<(ScopeId, UnitId)> {
        let mut result = Vec::new();
        for workspace in self.workspaces.values() {
            for unit in &workspace.units {
                result.push((workspace.scope, *unit));
            }
        }
        result
    }

    // Pass 1: hoist top-level type names as placeholders

    fn hoist_type_names(&mut self) {
        for (scope, unit) in self.units_in_order() {
            let decls = self.ast.unit(unit).decls.clone();
            for decl in decls {
                let node = self.ast.decl(decl).clone();
                match &node {
                    Decl::Record { name, .. }
                    | Decl::Variant { name, .. }
                    | Decl::RangeDecl { name, .. }
                    | Decl::Alias { name, .. }
                    | Decl::Concept { name, .. }
                    | Decl::Behaviour { name, .. } => {
                        let name = name.clone();
                        self.add_to_scope(scope, &name, decl);
                        let unknown = self.types.unknown();
                        let note = self.decl_note_mut(decl);
                        note.ty = Some(unknown);
                        note.scope = Some(scope);
                    }
                    Decl::Extern { items, .. } => {
                        let items = items.clone();
                        for item in items {
                            if let Some(name) = self.ast.decl(item).name().map(str::to_string) {
                                self.add_to_scope(scope, &name, item);
                                self.decl_note_mut(item).scope = Some(scope);
                            }
                        }
                    }
                    // extensions are anonymous; handled in pass 2
                    _ => {}
                }
            }
        }
    }

    // Pass 2: type declaration bodies

    fn check_type_bodies(&mut self) {
        for (scope, unit) in self.units_in_order() {
            self.current_unit = Some(unit);
            let decls = self.ast.unit(unit).decls.clone();
            let aborted = self.in_existing_scope(scope, |checker| {
                for decl in &decls {
                    match checker.check_type_declaration(*decl) {
                        Ok(()) | Err(Interrupt::Reported) => {}
                        Err(Interrupt::AbortUnit) => return true,
                    }
                }
                false
            });
            if aborted {
                log::debug!("pass 2 aborted for unit {:?}", unit);
            }
        }
        self.current_unit = None;
    }

    // Pass 3: executables

    fn check_executables(&mut self) {
        // declare signatures first so bodies can reference functions and
        // constants from any unit
        for (scope, unit) in self.units_in_order() {
            self.current_unit = Some(unit);
            let decls = self.ast.unit(unit).decls.clone();
            self.in_existing_scope(scope, |checker| {
                for decl in &decls {
                    match checker.declare_executable(*decl) {
                        Ok(()) | Err(Interrupt::Reported) => {}
                        Err(Interrupt::AbortUnit) => break,
                    }
                }
            });
        }

        for (scope, unit) in self.units_in_order() {
            self.current_unit = Some(unit);
            let decls = self.ast.unit(unit).decls.clone();
            let aborted = self.in_existing_scope(scope, |checker| {
                for decl in &decls {
                    match checker.check_executable(*decl) {
                        Ok(()) | Err(Interrupt::Reported) => {}
                        Err(Interrupt::AbortUnit) => return true,
                    }
                }
                false
            });
            if aborted {
                log::debug!("pass 3 aborted for unit {:?}", unit);
            }
        }
        self.current_unit = None;
    }

    // Pass 4: entry point, unused imports

    fn post_check(&mut self) {
        let workspace_names: Vec<String> = self.workspaces.keys().cloned().collect();

        for name in workspace_names {
            let (kind, scope, units) = {
                let workspace = &self.workspaces[&name];
                (workspace.kind, workspace.scope, workspace.units.clone())
            };

            if kind == WorkspaceKind::App {
                self.identify_entry_point(&name, scope);
            }

            for unit in units {
                let uses = self.ast.unit(unit).uses.clone();
                for use_decl in uses {
                    if !self.used_imports.contains(&use_decl) {
                        let span = self.ast.decl(use_decl).span().clone();
                        if let Decl::Use { path, .. } = self.ast.decl(use_decl) {
                            let path = path.join(".");
                            self.warning(
                                codes::UNUSED_IMPORT,
                                format!("unused import `{}`", path),
                                &span,
                            );
                        }
                    }
                }
            }
        }
    }

    fn identify_entry_point(&mut self, workspace: &str, scope: ScopeId) {
        let main = self.scopes.lookup_local(scope, "main");

        let Some(main) = main else {
            // an app workspace without units contributes nothing to check
            if !self.workspaces[workspace].units.is_empty() {
                let span = self
                    .workspaces[workspace]
                    .units
                    .first()
                    .map(|unit| self.ast.unit(*unit).span.clone())
                    .unwrap_or_else(Span::unknown);
                self.error(
                    codes::ENTRY_POINT,
                    format!(
                        "workspace `{}` is an application but declares no `main` function",
                        workspace
                    ),
                    &span,
                );
            }
            return;
        };

        let node = self.ast.decl(main).clone();
        let Decl::Function {
            generics,
            params,
            result,
            span,
            ..
        } = &node
        else {
            let span = node.span().clone();
            self.error(
                codes::ENTRY_POINT,
                "`main` must be a function",
                &span,
            );
            return;
        };

        if generics.is_some() {
            self.error(codes::ENTRY_POINT, "`main` cannot be generic", span);
            return;
        }
        if !params.is_empty() {
            self.error(codes::ENTRY_POINT, "`main` takes no parameters", span);
            return;
        }

        // result must be unit or a signed integer type
        let result_ok = match result {
            None => true,
            Some(_) => match self.decl_note(main).ty {
                Some(fn_ty) => match self.types.kind(fn_ty) {
                    TypeKind::Function { result, .. } => {
                        let result = *result;
                        result == self.types.unit()
                            || matches!(
                                self.types.kind(result),
                                TypeKind::Integer { signed: true, .. }
                            )
                    }
                    _ => false,
                },
                None => false,
            },
        };

        if !result_ok {
            self.error(
                codes::ENTRY_POINT,
                "`main` must result in `unit` or a signed integer type",
                span,
            );
            return;
        }

        if self.entry_point.is_some() {
            let span = span.clone();
            let previous = self
                .entry_point
                .map(|decl| self.ast.decl(decl).span().clone())
                .unwrap_or_else(Span::unknown);
            let diag = Diagnostic::error(
                codes::ENTRY_POINT,
                "multiple `main` functions found",
                span.clone(),
            )
            .with_note(previous.clone(), "previous `main` is here");
            self.publish(diag);
            return;
        }

        log::debug!("entry point identified in workspace `{}`", workspace);
        self.entry_point = Some(main);
    }

    // Cycle reporting shared by type and constant checking

    /// Publishes the cyclic-definition diagnostic, adding the
    /// indirect-pointer suggestion for type cycles.
    pub(crate) fn report_cycle(&mut self, declaration: DeclId, offending: &Span) {
        let node = self.ast.decl(declaration).clone();
        let name = node.name().unwrap_or("<anonymous>").to_string();
        let decl_span = node.span().clone();

        let kind = match &node {
            Decl::Var { .. } | Decl::VarTupled { .. } => "variable",
            Decl::Const { .. } | Decl::ConstTupled { .. } => "constant",
            Decl::Concept { .. } => "concept",
            _ => "type",
        };

        let mut diag = Diagnostic::error(
            codes::CYCLIC_DEFINITION,
            format!("cyclic definition for {} `{}`", kind, name),
            offending.clone(),
        )
        .with_note(
            decl_span.clone(),
            format!("this is the declaration of `{}`", name),
        );

        if node.is_type_decl() {
            diag = diag.with_suggestion(
                "break the cycle with an indirect link through a pointer",
                "*",
                offending.clone(),
            );
        }

        self.publish(diag);
        self.decl_note_mut(declaration).invalid = true;
    }
}

/// Verdict of the assignability analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignability {
    Assignable,
    /// The path is rooted in this immutable declaration.
    Immutable(DeclId),
    NotAssignable,
}
