//! Lexical scope tree.
//!
//! Scopes are arena-allocated and linked to their parents by index. Each
//! scope records the syntax node that opened it and whether it is an
//! extension scope (a scope that exists only for member lookup inside an
//! extended type). Name lookup walks the parent chain; dotted-path lookup
//! is layered on top by the checker, which knows how to descend into
//! workspace and type scopes.

use nemesis_ast::{DeclId, ExprId, StmtId, UnitId};
use nemesis_diagnostics::fuzzy;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The syntax node a scope originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Unit(UnitId),
    Decl(DeclId),
    Expr(ExprId),
    Stmt(StmtId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Root of the whole compilation; holds workspace names.
    Root,
    Workspace,
    Unit,
    Block,
    Function,
    Type,
    Loop,
    Conditional,
    MatchArm,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub origin: Option<NodeRef>,
    /// Extension scopes exist only for member lookup inside an extended
    /// type; they do not participate in plain identifier resolution.
    pub extension: bool,
    names: BTreeMap<String, DeclId>,
}

impl Scope {
    pub fn names(&self) -> impl Iterator<Item = (&String, &DeclId)> {
        self.names.iter()
    }
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    by_node: HashMap<NodeRef, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        let root = Scope {
            kind: ScopeKind::Root,
            parent: None,
            origin: None,
            extension: false,
            names: BTreeMap::new(),
        };
        Self {
            scopes: vec![root],
            by_node: HashMap::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn open(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        origin: Option<NodeRef>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            origin,
            extension: false,
            names: BTreeMap::new(),
        });
        if let Some(origin) = origin {
            self.by_node.insert(origin, id);
        }
        id
    }

    pub fn open_extension(&mut self, parent: ScopeId, origin: Option<NodeRef>) -> ScopeId {
        let id = self.open(parent, ScopeKind::Type, origin);
        self.scopes[id.index()].extension = true;
        id
    }

    /// Retags an already-open scope as an extension scope.
    pub fn mark_extension(&mut self, id: ScopeId) {
        self.scopes[id.index()].extension = true;
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.index()].parent
    }

    /// The scope a given syntax node opened, if any.
    pub fn of_node(&self, node: NodeRef) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Binds `name` in `scope`. Fails with the previous declaration when the
    /// name is already bound in this same scope (shadowing is only legal in
    /// strictly nested scopes).
    pub fn define(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        decl: DeclId,
    ) -> Result<(), DeclId> {
        let name = name.into();
        let names = &mut self.scopes[scope.index()].names;
        match names.get(&name) {
            Some(existing) => Err(*existing),
            None => {
                names.insert(name, decl);
                Ok(())
            }
        }
    }

    /// Rebinds unconditionally; used when committing a deferred insertion
    /// that was validated earlier.
    pub fn define_unchecked(&mut self, scope: ScopeId, name: impl Into<String>, decl: DeclId) {
        self.scopes[scope.index()].names.insert(name.into(), decl);
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.scopes[scope.index()].names.get(name).copied()
    }

    /// Resolves `name` by walking the parent chain. Extension scopes are
    /// skipped: their members are only reachable through qualified lookup.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(DeclId, ScopeId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.index()];
            if !entry.extension || id == scope {
                if let Some(decl) = entry.names.get(name) {
                    return Some((*decl, id));
                }
            }
            current = entry.parent;
        }
        None
    }

    /// All names visible from `scope`, nearest binding first.
    pub fn visible_names(&self, scope: ScopeId) -> Vec<String> {
        let mut seen = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.index()];
            for name in entry.names.keys() {
                if !seen.contains(name) {
                    seen.push(name.clone());
                }
            }
            current = entry.parent;
        }
        seen
    }

    /// Visible names within edit distance two of `name`, for "did you mean"
    /// suggestions.
    pub fn similars(&self, scope: ScopeId, name: &str) -> Vec<String> {
        fuzzy::similar_names(name, &self.visible_names(scope))
    }

    /// The nearest enclosing scope of `kind`, the scope itself included.
    pub fn enclosing(&self, scope: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.scopes[id.index()].kind == kind {
                return Some(id);
            }
            current = self.scopes[id.index()].parent;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut tree = ScopeTree::new();
        let outer = tree.open(tree.root(), ScopeKind::Block, None);
        let inner = tree.open(outer, ScopeKind::Block, None);

        tree.define(outer, "x", DeclId(0)).unwrap();
        assert_eq!(tree.lookup(inner, "x"), Some((DeclId(0), outer)));
        assert_eq!(tree.lookup(inner, "y"), None);
    }

    #[test]
    fn test_shadowing_only_in_nested_scope() {
        let mut tree = ScopeTree::new();
        let outer = tree.open(tree.root(), ScopeKind::Block, None);
        let inner = tree.open(outer, ScopeKind::Block, None);

        tree.define(outer, "x", DeclId(0)).unwrap();
        // same scope: redefinition error pointing at the first declaration
        assert_eq!(tree.define(outer, "x", DeclId(1)), Err(DeclId(0)));
        // nested scope: shadowing allowed
        tree.define(inner, "x", DeclId(1)).unwrap();
        assert_eq!(tree.lookup(inner, "x"), Some((DeclId(1), inner)));
    }

    #[test]
    fn test_extension_scope_skipped_in_plain_lookup() {
        let mut tree = ScopeTree::new();
        let outer = tree.open(tree.root(), ScopeKind::Block, None);
        let extension = tree.open_extension(outer, None);
        let inner = tree.open(extension, ScopeKind::Block, None);

        tree.define(extension, "member", DeclId(3)).unwrap();
        assert_eq!(tree.lookup(inner, "member"), None);
        // but reachable when the extension scope is the lookup start
        assert_eq!(
            tree.lookup(extension, "member"),
            Some((DeclId(3), extension))
        );
    }

    #[test]
    fn test_similars() {
        let mut tree = ScopeTree::new();
        let scope = tree.open(tree.root(), ScopeKind::Block, None);
        tree.define(scope, "count", DeclId(0)).unwrap();
        tree.define(scope, "total", DeclId(1)).unwrap();

        let suggestions = tree.similars(scope, "coutn");
        assert_eq!(suggestions, vec!["count".to_string()]);
    }

    #[test]
    fn test_enclosing() {
        let mut tree = ScopeTree::new();
        let function = tree.open(tree.root(), ScopeKind::Function, None);
        let block = tree.open(function, ScopeKind::Block, None);
        let looped = tree.open(block, ScopeKind::Loop, None);

        assert_eq!(tree.enclosing(looped, ScopeKind::Function), Some(function));
        assert_eq!(tree.enclosing(looped, ScopeKind::Loop), Some(looped));
        assert_eq!(tree.enclosing(function, ScopeKind::Loop), None);
    }
}
