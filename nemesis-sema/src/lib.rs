//! Semantic analysis pipeline for the Nemesis language.
//!
//! The entry point is [`Checker`]: it consumes a parsed [`nemesis_ast::Ast`],
//! runs the multi-pass analysis (workspace registration, type-name hoisting,
//! type bodies, executables, post-check), and leaves behind a fully annotated
//! tree, the set of generic instantiations, the identified entry point, and
//! a diagnostic stream.

pub mod checker;
pub mod compat;
pub mod eval;
pub mod numeric;
pub mod pattern;
pub mod scope;
pub mod subst;
pub mod types;
pub mod value;

pub use checker::{Annotation, Checker, Interrupt, Pass, Workspace};
pub use eval::EvalInterrupt;
pub use types::{TypeId, TypeKind, TypeTable};
pub use value::{ConstValue, Payload};
