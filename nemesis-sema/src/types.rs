//! Type registry: hash-consed primitive singletons, structural type
//! construction, and the registries that track behaviour implementors,
//! type extensions, and generic instantiations.
//!
//! The registry is an explicit context object threaded through the analysis;
//! there is no process-wide state. During a pass it is append-only.

use crate::value::ConstValue;
use dashmap::DashMap;
use nemesis_ast::{Ast, DeclId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::numeric::word_bits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionParam {
    pub ty: TypeId,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Unknown,
    /// Marker for workspace names appearing at the head of a path.
    Workspace,
    /// Unbound generic type parameter; identity comes from the declaration.
    Generic,
    Integer {
        bits: u16,
        signed: bool,
    },
    Rational {
        bits: u16,
    },
    Float {
        bits: u16,
    },
    Complex {
        bits: u16,
    },
    Bool,
    Char,
    /// Byte view over character data.
    Chars,
    /// Owned string.
    Str,
    Array {
        elem: TypeId,
        size: u64,
        /// Set when the length is an unbound generic constant parameter.
        parametric_size: Option<DeclId>,
    },
    Slice {
        elem: TypeId,
    },
    Tuple {
        components: Vec<TypeId>,
    },
    Record {
        fields: Vec<RecordField>,
    },
    Variant {
        members: Vec<TypeId>,
    },
    Pointer {
        pointee: TypeId,
    },
    Range {
        base: TypeId,
        open: bool,
    },
    Function {
        params: Vec<FunctionParam>,
        result: TypeId,
        lambda: bool,
    },
    /// Implementor set lives in the registry.
    Behaviour,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub kind: TypeKind,
    /// Back-link to the declaration that named this type, when nominal.
    pub decl: Option<DeclId>,
}

/// Argument bound to a generic parameter during instantiation.
#[derive(Debug, Clone, PartialEq)]
pub enum GenericBinding {
    Type(TypeId),
    Value(ConstValue),
}

/// Record linking a monomorphized type to its parametric origin and the
/// argument map that produced it.
#[derive(Debug, Clone)]
pub struct ParametrizedInfo {
    pub origin: TypeId,
    pub arguments: BTreeMap<String, GenericBinding>,
}

#[derive(Debug)]
pub struct TypeTable {
    types: Vec<Type>,
    /// Interning cache for primitive singletons, keyed by builtin name.
    builtins: DashMap<String, TypeId>,
    implementors: HashMap<TypeId, BTreeSet<TypeId>>,
    extenders: HashMap<TypeId, BTreeSet<DeclId>>,
    parametrized: HashMap<TypeId, ParametrizedInfo>,
    parametrics: HashMap<TypeId, DeclId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            builtins: DashMap::new(),
            implementors: HashMap::new(),
            extenders: HashMap::new(),
            parametrized: HashMap::new(),
            parametrics: HashMap::new(),
        };
        table.install_builtins();
        table
    }

    fn intern_builtin(&mut self, name: &str, kind: TypeKind) -> TypeId {
        let id = self.push(Type { kind, decl: None });
        self.builtins.insert(name.to_string(), id);
        id
    }

    fn install_builtins(&mut self) {
        self.intern_builtin("_", TypeKind::Unknown);
        self.intern_builtin(
            "unit",
            TypeKind::Tuple {
                components: Vec::new(),
            },
        );
        self.intern_builtin("bool", TypeKind::Bool);
        self.intern_builtin("char", TypeKind::Char);
        self.intern_builtin("chars", TypeKind::Chars);
        self.intern_builtin("string", TypeKind::Str);

        for bits in [8u16, 16, 32, 64, 128] {
            self.intern_builtin(
                &format!("u{}", bits),
                TypeKind::Integer { bits, signed: false },
            );
            self.intern_builtin(
                &format!("i{}", bits),
                TypeKind::Integer { bits, signed: true },
            );
        }

        for bits in [16u16, 32, 64, 128, 256] {
            self.intern_builtin(&format!("r{}", bits), TypeKind::Rational { bits });
        }

        for bits in [32u16, 64, 128] {
            self.intern_builtin(&format!("f{}", bits), TypeKind::Float { bits });
        }

        for bits in [64u16, 128, 256] {
            self.intern_builtin(&format!("c{}", bits), TypeKind::Complex { bits });
        }
    }

    fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.index()].kind
    }

    pub fn decl(&self, id: TypeId) -> Option<DeclId> {
        self.types[id.index()].decl
    }

    pub fn set_decl(&mut self, id: TypeId, decl: DeclId) {
        self.types[id.index()].decl = Some(decl);
    }

    /// Canonical primitive type for a builtin name (`i32`, `f64`, `usize`,
    /// `string`, ...). Machine-word aliases resolve to the fixed-width type
    /// of the host word.
    pub fn builtin(&self, name: &str) -> Option<TypeId> {
        let resolved = match name {
            "usize" => format!("u{}", word_bits()),
            "isize" => format!("i{}", word_bits()),
            other => other.to_string(),
        };
        self.builtins.get(&resolved).map(|entry| *entry.value())
    }

    pub fn unknown(&self) -> TypeId {
        self.named_builtin("_")
    }

    pub fn unit(&self) -> TypeId {
        self.named_builtin("unit")
    }

    pub fn boolean(&self) -> TypeId {
        self.named_builtin("bool")
    }

    pub fn character(&self) -> TypeId {
        self.named_builtin("char")
    }

    pub fn chars(&self) -> TypeId {
        self.named_builtin("chars")
    }

    pub fn string(&self) -> TypeId {
        self.named_builtin("string")
    }

    pub fn sint(&self, bits: u16) -> TypeId {
        self.named_builtin(&format!("i{}", bits))
    }

    pub fn uint(&self, bits: u16) -> TypeId {
        self.named_builtin(&format!("u{}", bits))
    }

    pub fn usize_type(&self) -> TypeId {
        self.sint_or_uint(false, word_bits())
    }

    pub fn isize_type(&self) -> TypeId {
        self.sint_or_uint(true, word_bits())
    }

    fn sint_or_uint(&self, signed: bool, bits: u16) -> TypeId {
        if signed {
            self.sint(bits)
        } else {
            self.uint(bits)
        }
    }

    pub fn rational(&self, bits: u16) -> TypeId {
        self.named_builtin(&format!("r{}", bits))
    }

    pub fn floating(&self, bits: u16) -> TypeId {
        self.named_builtin(&format!("f{}", bits))
    }

    pub fn complex(&self, bits: u16) -> TypeId {
        self.named_builtin(&format!("c{}", bits))
    }

    fn named_builtin(&self, name: &str) -> TypeId {
        match self.builtins.get(name) {
            Some(entry) => *entry.value(),
            // every name passed here was installed in `install_builtins`
            None => TypeId(0),
        }
    }

    // Structural constructors. No hash-consing: identity is by id,
    // compatibility is computed structurally (see `compat`).

    pub fn generic(&mut self) -> TypeId {
        self.push(Type {
            kind: TypeKind::Generic,
            decl: None,
        })
    }

    pub fn workspace_marker(&mut self) -> TypeId {
        self.push(Type {
            kind: TypeKind::Workspace,
            decl: None,
        })
    }

    pub fn array(&mut self, elem: TypeId, size: u64) -> TypeId {
        self.push(Type {
            kind: TypeKind::Array {
                elem,
                size,
                parametric_size: None,
            },
            decl: None,
        })
    }

    pub fn array_parametric(&mut self, elem: TypeId, size_param: DeclId) -> TypeId {
        self.push(Type {
            kind: TypeKind::Array {
                elem,
                size: 0,
                parametric_size: Some(size_param),
            },
            decl: None,
        })
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.push(Type {
            kind: TypeKind::Slice { elem },
            decl: None,
        })
    }

    pub fn tuple(&mut self, components: Vec<TypeId>) -> TypeId {
        if components.is_empty() {
            return self.unit();
        }
        self.push(Type {
            kind: TypeKind::Tuple { components },
            decl: None,
        })
    }

    pub fn record(&mut self, fields: Vec<RecordField>) -> TypeId {
        self.push(Type {
            kind: TypeKind::Record { fields },
            decl: None,
        })
    }

    pub fn variant(&mut self, members: Vec<TypeId>) -> TypeId {
        self.push(Type {
            kind: TypeKind::Variant { members },
            decl: None,
        })
    }

    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.push(Type {
            kind: TypeKind::Pointer { pointee },
            decl: None,
        })
    }

    pub fn range(&mut self, base: TypeId, open: bool) -> TypeId {
        self.push(Type {
            kind: TypeKind::Range { base, open },
            decl: None,
        })
    }

    pub fn function(
        &mut self,
        params: Vec<FunctionParam>,
        result: TypeId,
        lambda: bool,
    ) -> TypeId {
        self.push(Type {
            kind: TypeKind::Function {
                params,
                result,
                lambda,
            },
            decl: None,
        })
    }

    pub fn behaviour(&mut self) -> TypeId {
        self.push(Type {
            kind: TypeKind::Behaviour,
            decl: None,
        })
    }

    // Registries

    /// Adds `implementor` to `behaviour`'s implementor set.
    pub fn record_implementor(&mut self, behaviour: TypeId, implementor: TypeId) {
        self.implementors
            .entry(behaviour)
            .or_default()
            .insert(implementor);
    }

    pub fn is_implementor(&self, behaviour: TypeId, candidate: TypeId) -> bool {
        self.implementors
            .get(&behaviour)
            .map(|set| set.contains(&candidate))
            .unwrap_or(false)
    }

    pub fn implementors(&self, behaviour: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.implementors
            .get(&behaviour)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Registers that `extender` (an `extend` declaration) attaches members
    /// to `ty`.
    pub fn record_extension(&mut self, ty: TypeId, extender: DeclId) {
        self.extenders.entry(ty).or_default().insert(extender);
    }

    pub fn extensions(&self, ty: TypeId) -> impl Iterator<Item = DeclId> + '_ {
        self.extenders
            .get(&ty)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Records that `instantiated` was produced from parametric `origin`
    /// under `arguments`.
    pub fn record_instantiation(
        &mut self,
        instantiated: TypeId,
        origin: TypeId,
        arguments: BTreeMap<String, GenericBinding>,
    ) {
        self.parametrized
            .insert(instantiated, ParametrizedInfo { origin, arguments });
    }

    pub fn instantiation(&self, instantiated: TypeId) -> Option<&ParametrizedInfo> {
        self.parametrized.get(&instantiated)
    }

    /// Records that `base` depends on the generic clause `clause`.
    pub fn record_parametric(&mut self, base: TypeId, clause: DeclId) {
        self.parametrics.insert(base, clause);
    }

    pub fn parametric_clause(&self, base: TypeId) -> Option<DeclId> {
        self.parametrics.get(&base).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Diagnostic rendering of a type. Nominal types print their declared
    /// name; structural types recurse.
    pub fn display(&self, id: TypeId, ast: &Ast) -> String {
        if let Some(decl) = self.decl(id) {
            if let Some(name) = ast.decl(decl).name() {
                return name.to_string();
            }
        }

        match self.kind(id) {
            TypeKind::Unknown => "_".to_string(),
            TypeKind::Workspace => "<workspace>".to_string(),
            TypeKind::Generic => "$_".to_string(),
            TypeKind::Integer { bits, signed } => {
                format!("{}{}", if *signed { "i" } else { "u" }, bits)
            }
            TypeKind::Rational { bits } => format!("r{}", bits),
            TypeKind::Float { bits } => format!("f{}", bits),
            TypeKind::Complex { bits } => format!("c{}", bits),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Char => "char".to_string(),
            TypeKind::Chars => "chars".to_string(),
            TypeKind::Str => "string".to_string(),
            TypeKind::Array {
                elem,
                size,
                parametric_size,
            } => match parametric_size {
                Some(param) => format!(
                    "[{} : ${}]",
                    self.display(*elem, ast),
                    ast.decl(*param).name().unwrap_or("_")
                ),
                None => format!("[{} : {}]", self.display(*elem, ast), size),
            },
            TypeKind::Slice { elem } => format!("[{}]", self.display(*elem, ast)),
            TypeKind::Tuple { components } => {
                if components.is_empty() {
                    "()".to_string()
                } else {
                    let inner: Vec<String> =
                        components.iter().map(|c| self.display(*c, ast)).collect();
                    format!("({})", inner.join(", "))
                }
            }
            TypeKind::Record { fields } => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, self.display(f.ty, ast)))
                    .collect();
                format!("({})", inner.join(", "))
            }
            TypeKind::Variant { members } => {
                let inner: Vec<String> = members.iter().map(|m| self.display(*m, ast)).collect();
                inner.join(" | ")
            }
            TypeKind::Pointer { pointee } => format!("*{}", self.display(*pointee, ast)),
            TypeKind::Range { base, open } => {
                let base = self.display(*base, ast);
                format!("{}{}{}", base, if *open { ".." } else { "..=" }, base)
            }
            TypeKind::Function { params, result, .. } => {
                let inner: Vec<String> = params
                    .iter()
                    .map(|p| {
                        if p.mutable {
                            format!("mutable {}", self.display(p.ty, ast))
                        } else {
                            self.display(p.ty, ast)
                        }
                    })
                    .collect();
                format!(
                    "function({}) {}",
                    inner.join(", "),
                    self.display(*result, ast)
                )
            }
            TypeKind::Behaviour => "<behaviour>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_singletons_are_unique() {
        let types = TypeTable::new();
        assert_eq!(types.builtin("i32"), types.builtin("i32"));
        assert_ne!(types.builtin("i32"), types.builtin("u32"));
        assert_ne!(types.builtin("i32"), types.builtin("i64"));
        assert_eq!(types.builtin("bool").unwrap(), types.boolean());
        assert!(types.builtin("q17").is_none());
    }

    #[test]
    fn test_machine_word_aliases() {
        let types = TypeTable::new();
        assert_eq!(types.builtin("usize"), Some(types.usize_type()));
        assert_eq!(types.builtin("isize"), Some(types.isize_type()));
        match types.kind(types.usize_type()) {
            TypeKind::Integer { signed, .. } => assert!(!signed),
            other => panic!("expected integer, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_types_not_consed() {
        let mut types = TypeTable::new();
        let elem = types.sint(32);
        let a = types.array(elem, 4);
        let b = types.array(elem, 4);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_tuple_is_unit() {
        let mut types = TypeTable::new();
        assert_eq!(types.tuple(Vec::new()), types.unit());
    }

    #[test]
    fn test_implementor_registry() {
        let mut types = TypeTable::new();
        let behaviour = types.behaviour();
        let concrete = types.record(vec![]);
        assert!(!types.is_implementor(behaviour, concrete));
        types.record_implementor(behaviour, concrete);
        assert!(types.is_implementor(behaviour, concrete));
    }

    #[test]
    fn test_instantiation_registry() {
        let mut types = TypeTable::new();
        let origin = types.record(vec![]);
        let instance = types.record(vec![]);
        let mut arguments = BTreeMap::new();
        arguments.insert("T".to_string(), GenericBinding::Type(types.sint(32)));
        types.record_instantiation(instance, origin, arguments);

        let info = types.instantiation(instance).unwrap();
        assert_eq!(info.origin, origin);
        assert!(matches!(
            info.arguments.get("T"),
            Some(GenericBinding::Type(_))
        ));
    }
}
