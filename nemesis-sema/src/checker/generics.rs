//! Generic instantiation: unify explicit arguments against a generic
//! clause, reuse an existing instantiation when the argument map matches,
//! otherwise substitute, install the clone under the origin's workspace
//! scope, and re-check the clone only.

use crate::checker::{Checked, Checker, Interrupt};
use crate::eval::EvalInterrupt;
use crate::subst::{SubstArg, Substitution};
use crate::types::{GenericBinding, TypeId};
use crate::value::ConstValue;
use nemesis_ast::{Decl, DeclId, GenericArg, Span};
use nemesis_diagnostics::codes;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// One monomorphized entity: the parametric origin, the argument map, and
/// the produced declaration (plus its type, for parametric types).
#[derive(Debug, Clone)]
pub struct InstantiationRecord {
    pub origin: DeclId,
    pub arguments: BTreeMap<String, GenericBinding>,
    pub result: DeclId,
    pub result_type: Option<TypeId>,
    /// Stable fingerprint of the argument map, used for deduplication.
    pub key: u64,
}

struct UnifiedArgs {
    subst: Substitution,
    arguments: BTreeMap<String, GenericBinding>,
    key: u64,
    /// Some argument is itself a generic parameter (partial
    /// specialization); the clone stays parametric.
    partial: bool,
}

impl Checker {
    /// Finds an existing instantiation of `origin` with fingerprint `key`.
    fn find_instantiation(&self, origin: DeclId, key: u64) -> Option<&InstantiationRecord> {
        self.instantiations
            .iter()
            .find(|record| record.origin == origin && record.key == key)
    }

    /// Instantiates a parametric type named with explicit arguments.
    pub(crate) fn instantiate_type(
        &mut self,
        origin: DeclId,
        args: &[GenericArg],
        span: &Span,
    ) -> Checked<TypeId> {
        let clause = self.generic_clause_of(origin, span)?;
        let unified = self.unify_generic_args(clause, args, span)?;

        if let Some(existing) = self.find_instantiation(origin, unified.key) {
            log::trace!("reusing instantiation of {:?}", origin);
            return existing.result_type.ok_or(Interrupt::Reported);
        }

        let clone = self.substitute_decl(origin, &unified.subst);
        if !unified.partial {
            self.instantiated.insert(clone);
        }

        let install_scope = self.decl_note(origin).scope.unwrap_or(self.scope);
        let mangled = self.mangled_name(origin, args);
        self.add_to_scope(install_scope, &mangled, clone);
        self.decl_note_mut(clone).scope = Some(install_scope);

        // the clone is checked like any other type declaration, but only
        // the clone — the origin template is left untouched
        self.in_existing_scope(install_scope, |checker| {
            checker.check_type_declaration(clone)
        })?;

        let result_type = self.decl_note(clone).ty.ok_or(Interrupt::Reported)?;
        if let Some(origin_type) = self.decl_note(origin).ty {
            self.types
                .record_instantiation(result_type, origin_type, unified.arguments.clone());
        }

        log::debug!(
            "instantiated type `{}` as `{}`",
            self.ast.decl(origin).name().unwrap_or("<anonymous>"),
            mangled
        );
        self.instantiations.push(InstantiationRecord {
            origin,
            arguments: unified.arguments,
            result: clone,
            result_type: Some(result_type),
            key: unified.key,
        });

        Ok(result_type)
    }

    /// Instantiates a parametric function called with explicit arguments.
    /// Returns the concrete clone's declaration.
    pub(crate) fn instantiate_function(
        &mut self,
        origin: DeclId,
        args: &[GenericArg],
        span: &Span,
    ) -> Checked<DeclId> {
        let clause = self.generic_clause_of(origin, span)?;
        let unified = self.unify_generic_args(clause, args, span)?;

        if let Some(existing) = self.find_instantiation(origin, unified.key) {
            log::trace!("reusing instantiation of {:?}", origin);
            return Ok(existing.result);
        }

        let clone = self.substitute_decl(origin, &unified.subst);
        if !unified.partial {
            self.instantiated.insert(clone);
        }

        let install_scope = self.decl_note(origin).scope.unwrap_or(self.scope);
        let mangled = self.mangled_name(origin, args);
        self.add_to_scope(install_scope, &mangled, clone);
        self.decl_note_mut(clone).scope = Some(install_scope);

        self.in_existing_scope(install_scope, |checker| {
            checker.resolve_signature(clone)?;
            if !unified.partial {
                checker.check_executable(clone)?;
            }
            Ok(())
        })?;

        let result_type = self.decl_note(clone).ty;

        log::debug!(
            "instantiated function `{}` as `{}`",
            self.ast.decl(origin).name().unwrap_or("<anonymous>"),
            mangled
        );
        self.instantiations.push(InstantiationRecord {
            origin,
            arguments: unified.arguments,
            result: clone,
            result_type,
            key: unified.key,
        });

        Ok(clone)
    }

    fn generic_clause_of(&mut self, origin: DeclId, span: &Span) -> Checked<DeclId> {
        let clause = match self.ast.decl(origin) {
            Decl::Record { generics, .. }
            | Decl::Variant { generics, .. }
            | Decl::RangeDecl { generics, .. }
            | Decl::Alias { generics, .. }
            | Decl::Behaviour { generics, .. }
            | Decl::Function { generics, .. } => *generics,
            Decl::Concept { generics, .. } => Some(*generics),
            _ => None,
        };
        match clause {
            Some(clause) => Ok(clause),
            None => {
                self.error(
                    codes::GENERIC_ARITY,
                    format!(
                        "`{}` is not generic and takes no explicit arguments",
                        self.ast.decl(origin).name().unwrap_or("<anonymous>")
                    ),
                    span,
                );
                Err(Interrupt::Reported)
            }
        }
    }

    /// Unifies explicit arguments against the clause: arity, kinds
    /// (type vs. constant), constraint satisfaction.
    fn unify_generic_args(
        &mut self,
        clause: DeclId,
        args: &[GenericArg],
        span: &Span,
    ) -> Checked<UnifiedArgs> {
        let (params, constraint) = match self.ast.decl(clause).clone() {
            Decl::GenericClause {
                params, constraint, ..
            } => (params, constraint),
            _ => return Err(Interrupt::Reported),
        };

        if params.len() != args.len() {
            self.error(
                codes::GENERIC_ARITY,
                format!(
                    "expected {} generic argument{} but {} {} supplied",
                    params.len(),
                    if params.len() == 1 { "" } else { "s" },
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" }
                ),
                span,
            );
            return Err(Interrupt::Reported);
        }

        let mut subst = Substitution::new();
        let mut arguments = BTreeMap::new();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        let mut partial = false;

        for (param, arg) in params.iter().zip(args.iter()) {
            match self.ast.decl(*param).clone() {
                Decl::GenericTypeParam { name, .. } => {
                    let ty = match arg {
                        GenericArg::Type(type_expr) => {
                            let resolved = self.resolve_type_expr(*type_expr)?;
                            if let Some(referenced) = self.type_expr_note(*type_expr).referenced {
                                if matches!(
                                    self.ast.decl(referenced),
                                    Decl::GenericTypeParam { .. }
                                ) {
                                    partial = true;
                                    subst.bind(*param, name.clone(), SubstArg::Rebind(referenced));
                                    name.hash(&mut hasher);
                                    format!("${}", referenced.0).hash(&mut hasher);
                                    arguments
                                        .insert(name.clone(), GenericBinding::Type(resolved));
                                    continue;
                                }
                            }
                            resolved
                        }
                        GenericArg::Const(expr) => {
                            // the parser cannot always tell a type name from
                            // a value path; retry as a type
                            self.resolve_type_from_expr(*expr)?
                        }
                    };
                    subst.bind(*param, name.clone(), SubstArg::Type(ty));
                    name.hash(&mut hasher);
                    self.types.display(ty, &self.ast).hash(&mut hasher);
                    arguments.insert(name.clone(), GenericBinding::Type(ty));
                }
                Decl::GenericConstParam { name, ty, .. } => {
                    let expr = match arg {
                        GenericArg::Const(expr) => *expr,
                        GenericArg::Type(type_expr) => {
                            let span = self.ast.type_expr(*type_expr).span().clone();
                            self.error(
                                codes::GENERIC_ARITY,
                                format!("generic parameter `{}` expects a constant value", name),
                                &span,
                            );
                            return Err(Interrupt::Reported);
                        }
                    };

                    if let Some(rebound) = self.generic_const_param_of(expr) {
                        partial = true;
                        subst.bind(*param, name.clone(), SubstArg::Rebind(rebound));
                        name.hash(&mut hasher);
                        format!("${}", rebound.0).hash(&mut hasher);
                        continue;
                    }

                    let declared = self.resolve_type_expr(ty)?;
                    let value = match self.evaluate(expr) {
                        Ok(value) => {
                            let span = self.ast.expr(expr).span().clone();
                            self.coerce_constant(value, declared, &span)
                                .map_err(|_| Interrupt::Reported)?
                        }
                        Err(EvalInterrupt::NeedsGeneric) => {
                            let span = self.ast.expr(expr).span().clone();
                            self.error(
                                codes::CONST_NOT_CONSTANT,
                                "generic value is not bound yet in this context",
                                &span,
                            );
                            return Err(Interrupt::Reported);
                        }
                        Err(EvalInterrupt::Reported) => return Err(Interrupt::Reported),
                    };

                    name.hash(&mut hasher);
                    value.fingerprint().hash(&mut hasher);
                    subst.bind(*param, name.clone(), SubstArg::Value(value.clone()));
                    arguments.insert(name.clone(), GenericBinding::Value(value));
                }
                _ => return Err(Interrupt::Reported),
            }
        }

        // constraint satisfaction: a concept application resolves its named
        // operations against the bound types; any other predicate is
        // substituted and evaluated
        if let Some(constraint) = constraint {
            if !partial {
                match self.check_concept_constraint(constraint, &subst)? {
                    Some(satisfied) => {
                        if !satisfied {
                            let span = self.ast.expr(constraint).span().clone();
                            self.error(
                                codes::MISSING_CONFORMANCE,
                                "generic constraint is not satisfied by these arguments",
                                &span,
                            );
                            return Err(Interrupt::Reported);
                        }
                    }
                    None => {
                        let substituted = self.subst_expr(constraint, &subst);
                        self.sync_notes();
                        match self.evaluate(substituted) {
                            Ok(value) => {
                                if matches!(value.payload, crate::value::Payload::Bool(false)) {
                                    let span = self.ast.expr(constraint).span().clone();
                                    self.error(
                                        codes::MISSING_CONFORMANCE,
                                        "generic constraint is not satisfied by these arguments",
                                        &span,
                                    );
                                    return Err(Interrupt::Reported);
                                }
                            }
                            // a predicate that cannot be decided here is
                            // deferred to the clone's own checking
                            Err(EvalInterrupt::NeedsGeneric) => {}
                            Err(EvalInterrupt::Reported) => return Err(Interrupt::Reported),
                        }
                    }
                }
            }
        }

        Ok(UnifiedArgs {
            subst,
            arguments,
            key: hasher.finish(),
            partial,
        })
    }

    /// Decides a constraint written as a concept application, like
    /// `Comparable!(T)`: the concept holds when every operation it declares
    /// is reachable through an extension of each bound type. Returns `None`
    /// when the constraint is not a concept application.
    fn check_concept_constraint(
        &mut self,
        constraint: nemesis_ast::ExprId,
        subst: &Substitution,
    ) -> Checked<Option<bool>> {
        let nemesis_ast::Expr::Call { callee, args, .. } = self.ast.expr(constraint).clone()
        else {
            return Ok(None);
        };
        let nemesis_ast::Expr::Ident { name, .. } = self.ast.expr(callee).clone() else {
            return Ok(None);
        };
        let Some(decl) = self.resolve_name(&name) else {
            return Ok(None);
        };
        let Decl::Concept { prototypes, .. } = self.ast.decl(decl).clone() else {
            return Ok(None);
        };

        let mut bound_types = Vec::with_capacity(args.len());
        for arg in &args {
            let cloned = self.subst_expr(*arg, subst);
            self.sync_notes();
            match self.expr_note(cloned).ty {
                Some(ty) => bound_types.push(ty),
                None => return Ok(None),
            }
        }

        for prototype in prototypes {
            let Some(required) = self.ast.decl(prototype).name().map(str::to_string) else {
                continue;
            };
            for ty in &bound_types {
                let found = self.types.extensions(*ty).any(|extension| {
                    self.scopes
                        .of_node(crate::scope::NodeRef::Decl(extension))
                        .and_then(|scope| self.scopes.lookup_local(scope, &required))
                        .is_some()
                });
                if !found {
                    return Ok(Some(false));
                }
            }
        }

        Ok(Some(true))
    }

    /// Converts a constant to the declared parameter type, reporting
    /// overflow through the usual evaluator channel.
    pub(crate) fn coerce_constant(
        &mut self,
        value: ConstValue,
        target: TypeId,
        span: &Span,
    ) -> Result<ConstValue, EvalInterrupt> {
        if crate::compat::compatible(&self.types, value.ty, target, true) {
            return Ok(value);
        }
        self.eval_cast(value, target, span)
    }

    /// Rendering of an instantiation for scope registration and
    /// diagnostics: `Pair!(i32, 4)`.
    pub(crate) fn mangled_name(&mut self, origin: DeclId, args: &[GenericArg]) -> String {
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| self.describe_generic_arg(arg))
            .collect();
        format!(
            "{}!({})",
            self.ast.decl(origin).name().unwrap_or("<anonymous>"),
            rendered.join(", ")
        )
    }
}
