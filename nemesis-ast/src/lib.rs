//! Syntax tree for the Nemesis language.
//!
//! The parser (an external collaborator) produces this tree; the semantic
//! analyzer consumes it. Nodes live in index-based arenas with stable typed
//! ids so that long-lived back-references (scopes, declarations, types) can
//! be stored as plain indices. Analysis results are kept in side tables owned
//! by the analyzer, never on the nodes themselves.

use serde::{Deserialize, Serialize};

pub use nemesis_diagnostics::Span;

pub mod arena;
pub use arena::Ast;

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index of an expression node.
    ExprId
);
arena_id!(
    /// Index of a statement node.
    StmtId
);
arena_id!(
    /// Index of a declaration node.
    DeclId
);
arena_id!(
    /// Index of a pattern node.
    PatId
);
arena_id!(
    /// Index of a type-expression node.
    TypeExprId
);
arena_id!(
    /// Index of a source unit.
    UnitId
);

/// Literal lexeme as the tokenizer produced it. Numeric payloads keep their
/// raw text (including base prefixes and width suffixes); the constant
/// evaluator parses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    /// `42`, `0xff`, `0b1010u8`, `7i64`
    Integer(String),
    /// `2.5`, `1e9f64`
    Real(String),
    /// `2.5i` — imaginary part of a complex literal
    Imaginary(String),
    /// Raw char content without quotes, escapes undecoded: `a`, `\n`, `ἰE`
    Char(String),
    /// Raw text content without quotes. `owned` distinguishes `"…"s` (string)
    /// from `"…"` (chars view).
    Text { value: String, owned: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `*` dereference
    Deref,
    /// `&` address-of
    AddrOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
        }
    }
}

/// Explicit generic argument attached to a path segment: `Pair!(i32, 4)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericArg {
    Type(TypeExprId),
    Const(ExprId),
}

/// One component of a dotted path, with optional explicit generic arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
    pub generics: Vec<GenericArg>,
}

impl PathSegment {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
        }
    }
}

/// One arm of a `when` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhenArm {
    pub pattern: PatId,
    pub guard: Option<ExprId>,
    pub body: ExprId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Literal {
        lit: Literal,
        span: Span,
    },
    /// Identifier reference, possibly with explicit generic arguments.
    Ident {
        name: String,
        generics: Vec<GenericArg>,
        span: Span,
    },
    Tuple {
        elements: Vec<ExprId>,
        span: Span,
    },
    Array {
        elements: Vec<ExprId>,
        span: Span,
    },
    /// `[value : count]` — repetition
    ArraySized {
        value: ExprId,
        size: ExprId,
        span: Span,
    },
    Paren {
        inner: ExprId,
        span: Span,
    },
    Block {
        stmts: Vec<StmtId>,
        span: Span,
    },
    /// Anonymous function literal.
    Lambda {
        params: Vec<DeclId>,
        result: Option<TypeExprId>,
        body: ExprId,
        span: Span,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
        span: Span,
    },
    /// `object.member` where member is an identifier (possibly generic).
    Member {
        object: ExprId,
        member: ExprId,
        span: Span,
    },
    Index {
        object: ExprId,
        index: ExprId,
        span: Span,
    },
    TupleIndex {
        object: ExprId,
        index: u32,
        span: Span,
    },
    /// Nominal record construction: `Point(x: 1, y: 2)`.
    RecordInit {
        path: ExprId,
        fields: Vec<(Option<String>, ExprId)>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
    },
    /// `value as T`
    Cast {
        value: ExprId,
        target: TypeExprId,
        span: Span,
    },
    Range {
        start: Option<ExprId>,
        end: Option<ExprId>,
        inclusive: bool,
        span: Span,
    },
    If {
        condition: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
        span: Span,
    },
    When {
        scrutinee: ExprId,
        arms: Vec<WhenArm>,
        else_arm: Option<ExprId>,
        span: Span,
    },
    /// `for pattern in iterable { … }`
    ForIn {
        pattern: PatId,
        iterable: ExprId,
        body: ExprId,
        contracts: Vec<StmtId>,
        span: Span,
    },
    /// `for condition { … }` / `for { … }` — conditional and infinite loops.
    Loop {
        condition: Option<ExprId>,
        body: ExprId,
        contracts: Vec<StmtId>,
        span: Span,
    },
    /// `expr is T` type test.
    Is {
        value: ExprId,
        target: TypeExprId,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Tuple { span, .. }
            | Expr::Array { span, .. }
            | Expr::ArraySized { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Block { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::Call { span, .. }
            | Expr::Member { span, .. }
            | Expr::Index { span, .. }
            | Expr::TupleIndex { span, .. }
            | Expr::RecordInit { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Cast { span, .. }
            | Expr::Range { span, .. }
            | Expr::If { span, .. }
            | Expr::When { span, .. }
            | Expr::ForIn { span, .. }
            | Expr::Loop { span, .. }
            | Expr::Is { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    /// Dotted path naming a type, with optional generic arguments.
    Path {
        segments: Vec<PathSegment>,
        span: Span,
    },
    /// `[T : N]` — the size expression is evaluated at analysis time.
    Array {
        elem: TypeExprId,
        size: ExprId,
        span: Span,
    },
    /// `[T]`
    Slice {
        elem: TypeExprId,
        span: Span,
    },
    Tuple {
        components: Vec<TypeExprId>,
        span: Span,
    },
    /// `*T`
    Pointer {
        pointee: TypeExprId,
        span: Span,
    },
    Function {
        params: Vec<TypeExprId>,
        result: Option<TypeExprId>,
        span: Span,
    },
    /// Anonymous record: `(x: i32, y: i32)`
    Record {
        fields: Vec<DeclId>,
        span: Span,
    },
    /// Anonymous union: `i32 | f32`
    Variant {
        members: Vec<TypeExprId>,
        span: Span,
    },
}

impl TypeExpr {
    pub fn span(&self) -> &Span {
        match self {
            TypeExpr::Path { span, .. }
            | TypeExpr::Array { span, .. }
            | TypeExpr::Slice { span, .. }
            | TypeExpr::Tuple { span, .. }
            | TypeExpr::Pointer { span, .. }
            | TypeExpr::Function { span, .. }
            | TypeExpr::Record { span, .. }
            | TypeExpr::Variant { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// `_`
    Wildcard { span: Span },
    /// `...` inside a sequence pattern
    Rest { span: Span },
    Literal {
        lit: Literal,
        span: Span,
    },
    /// Identifier binding.
    Bind {
        name: String,
        span: Span,
    },
    /// Nominal path (variant member kind).
    Path {
        segments: Vec<PathSegment>,
        span: Span,
    },
    Tuple {
        elements: Vec<PatId>,
        span: Span,
    },
    Array {
        elements: Vec<PatId>,
        span: Span,
    },
    /// Positional record pattern: `Point(a, b)`.
    Record {
        segments: Vec<PathSegment>,
        elements: Vec<PatId>,
        span: Span,
    },
    /// Labeled record pattern: `Point(x: a, y: b)`.
    LabeledRecord {
        segments: Vec<PathSegment>,
        fields: Vec<(String, PatId)>,
        span: Span,
    },
    Range {
        start: ExprId,
        end: ExprId,
        inclusive: bool,
        span: Span,
    },
    Or {
        alternatives: Vec<PatId>,
        span: Span,
    },
    /// `is T` type-cast pattern.
    Is {
        target: TypeExprId,
        span: Span,
    },
}

impl Pattern {
    pub fn span(&self) -> &Span {
        match self {
            Pattern::Wildcard { span }
            | Pattern::Rest { span }
            | Pattern::Literal { span, .. }
            | Pattern::Bind { span, .. }
            | Pattern::Path { span, .. }
            | Pattern::Tuple { span, .. }
            | Pattern::Array { span, .. }
            | Pattern::Record { span, .. }
            | Pattern::LabeledRecord { span, .. }
            | Pattern::Range { span, .. }
            | Pattern::Or { span, .. }
            | Pattern::Is { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractKind {
    Require,
    Ensure,
    Invariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Plain,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    Null {
        span: Span,
    },
    Expr {
        expr: ExprId,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: ExprId,
        value: ExprId,
        span: Span,
    },
    Return {
        value: Option<ExprId>,
        span: Span,
    },
    Break {
        value: Option<ExprId>,
        span: Span,
    },
    Continue {
        span: Span,
    },
    Contract {
        kind: ContractKind,
        condition: ExprId,
        span: Span,
    },
    Decl {
        decl: DeclId,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Null { span }
            | Stmt::Expr { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Break { span, .. }
            | Stmt::Continue { span }
            | Stmt::Contract { span, .. }
            | Stmt::Decl { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decl {
    /// `val x = …` / `mutable val x = …`
    Var {
        name: String,
        mutable: bool,
        ty: Option<TypeExprId>,
        value: Option<ExprId>,
        span: Span,
    },
    /// `val (a, b) = …`
    VarTupled {
        names: Vec<String>,
        mutable: bool,
        ty: Option<TypeExprId>,
        value: ExprId,
        span: Span,
    },
    Const {
        name: String,
        ty: Option<TypeExprId>,
        value: ExprId,
        span: Span,
    },
    ConstTupled {
        names: Vec<String>,
        value: ExprId,
        span: Span,
    },
    /// Named record field.
    Field {
        name: String,
        ty: TypeExprId,
        span: Span,
    },
    /// Positional (tuple-record) field.
    TupleField {
        index: u32,
        ty: TypeExprId,
        span: Span,
    },
    Param {
        name: String,
        mutable: bool,
        ty: TypeExprId,
        span: Span,
    },
    /// Generic clause `(T, C: usize) if Constraint!(T)`.
    GenericClause {
        params: Vec<DeclId>,
        constraint: Option<ExprId>,
        span: Span,
    },
    GenericTypeParam {
        name: String,
        span: Span,
    },
    GenericConstParam {
        name: String,
        ty: TypeExprId,
        span: Span,
    },
    /// `type Point(…) is (x: f64, y: f64)`
    Record {
        name: String,
        generics: Option<DeclId>,
        fields: Vec<DeclId>,
        span: Span,
    },
    /// `type Shape is Circle | Square`
    Variant {
        name: String,
        generics: Option<DeclId>,
        members: Vec<TypeExprId>,
        span: Span,
    },
    /// `type Digit is range 0..=9`
    RangeDecl {
        name: String,
        generics: Option<DeclId>,
        constraint: ExprId,
        span: Span,
    },
    /// `type Meters is f64`
    Alias {
        name: String,
        generics: Option<DeclId>,
        target: TypeExprId,
        span: Span,
    },
    Concept {
        name: String,
        generics: DeclId,
        prototypes: Vec<DeclId>,
        span: Span,
    },
    Behaviour {
        name: String,
        generics: Option<DeclId>,
        items: Vec<DeclId>,
        span: Span,
    },
    /// `extend T as B { … }` — `behaviours` empty for anonymous extensions.
    Extend {
        generics: Option<DeclId>,
        target: TypeExprId,
        behaviours: Vec<TypeExprId>,
        items: Vec<DeclId>,
        span: Span,
    },
    Extern {
        items: Vec<DeclId>,
        span: Span,
    },
    Function {
        name: String,
        generics: Option<DeclId>,
        params: Vec<DeclId>,
        result: Option<TypeExprId>,
        body: Option<ExprId>,
        span: Span,
    },
    Property {
        name: String,
        params: Vec<DeclId>,
        result: Option<TypeExprId>,
        body: Option<ExprId>,
        span: Span,
    },
    Test {
        name: String,
        body: ExprId,
        span: Span,
    },
    Use {
        path: Vec<String>,
        span: Span,
    },
}

impl Decl {
    pub fn span(&self) -> &Span {
        match self {
            Decl::Var { span, .. }
            | Decl::VarTupled { span, .. }
            | Decl::Const { span, .. }
            | Decl::ConstTupled { span, .. }
            | Decl::Field { span, .. }
            | Decl::TupleField { span, .. }
            | Decl::Param { span, .. }
            | Decl::GenericClause { span, .. }
            | Decl::GenericTypeParam { span, .. }
            | Decl::GenericConstParam { span, .. }
            | Decl::Record { span, .. }
            | Decl::Variant { span, .. }
            | Decl::RangeDecl { span, .. }
            | Decl::Alias { span, .. }
            | Decl::Concept { span, .. }
            | Decl::Behaviour { span, .. }
            | Decl::Extend { span, .. }
            | Decl::Extern { span, .. }
            | Decl::Function { span, .. }
            | Decl::Property { span, .. }
            | Decl::Test { span, .. }
            | Decl::Use { span, .. } => span,
        }
    }

    /// The lexeme this declaration binds, when it binds a single name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Decl::Var { name, .. }
            | Decl::Const { name, .. }
            | Decl::Field { name, .. }
            | Decl::Param { name, .. }
            | Decl::GenericTypeParam { name, .. }
            | Decl::GenericConstParam { name, .. }
            | Decl::Record { name, .. }
            | Decl::Variant { name, .. }
            | Decl::RangeDecl { name, .. }
            | Decl::Alias { name, .. }
            | Decl::Concept { name, .. }
            | Decl::Behaviour { name, .. }
            | Decl::Function { name, .. }
            | Decl::Property { name, .. }
            | Decl::Test { name, .. } => Some(name),
            _ => None,
        }
    }

    /// True for `type`-introducing declarations.
    pub fn is_type_decl(&self) -> bool {
        matches!(
            self,
            Decl::Record { .. }
                | Decl::Variant { .. }
                | Decl::RangeDecl { .. }
                | Decl::Alias { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceKind {
    App,
    Lib,
}

/// One parsed file. The `workspace` directive names the workspace the unit
/// joins; units without a directive join the anonymous default workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub workspace: Option<(String, WorkspaceKind)>,
    pub uses: Vec<DeclId>,
    pub decls: Vec<DeclId>,
    pub span: Span,
}
