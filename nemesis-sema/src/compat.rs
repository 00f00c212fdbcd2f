//! Type equivalence and assignment compatibility.
//!
//! `compatible` is the symmetric equivalence relation: nominal for declared
//! types, structural otherwise. With `strict` off, numeric width and
//! signedness differences are ignored. `assignment_compatible` is the
//! one-directional relation used at assignment and call sites; it layers
//! coercions (array to slice, auto address-of, chars/string interchange,
//! subtype to variant, behaviour upcast) on top of lax equivalence.

use crate::types::{TypeId, TypeKind, TypeTable};

/// Symmetric equivalence. `strict` demands exact numeric widths.
pub fn compatible(types: &TypeTable, left: TypeId, right: TypeId, strict: bool) -> bool {
    if matches!(types.kind(left), TypeKind::Unknown) || matches!(types.kind(right), TypeKind::Unknown)
    {
        return false;
    }

    if std::mem::discriminant(types.kind(left)) != std::mem::discriminant(types.kind(right)) {
        return false;
    }

    // name equivalence for declared types
    match (types.decl(left), types.decl(right)) {
        (Some(ldecl), Some(rdecl)) => return ldecl == rdecl,
        (Some(_), None) | (None, Some(_)) => return false,
        (None, None) => {}
    }

    match (types.kind(left), types.kind(right)) {
        (TypeKind::Bool, _) | (TypeKind::Char, _) | (TypeKind::Chars, _) | (TypeKind::Str, _) => {
            true
        }
        (
            TypeKind::Integer {
                bits: lbits,
                signed: lsigned,
            },
            TypeKind::Integer {
                bits: rbits,
                signed: rsigned,
            },
        ) => !strict || (lbits == rbits && lsigned == rsigned),
        (TypeKind::Rational { bits: lbits }, TypeKind::Rational { bits: rbits })
        | (TypeKind::Float { bits: lbits }, TypeKind::Float { bits: rbits })
        | (TypeKind::Complex { bits: lbits }, TypeKind::Complex { bits: rbits }) => {
            !strict || lbits == rbits
        }
        (
            TypeKind::Array {
                elem: lelem,
                size: lsize,
                ..
            },
            TypeKind::Array {
                elem: relem,
                size: rsize,
                ..
            },
        ) => lsize == rsize && compatible(types, *lelem, *relem, strict),
        (TypeKind::Slice { elem: lelem }, TypeKind::Slice { elem: relem }) => {
            compatible(types, *lelem, *relem, strict)
        }
        (TypeKind::Tuple { components: lc }, TypeKind::Tuple { components: rc }) => {
            lc.len() == rc.len()
                && lc
                    .iter()
                    .zip(rc.iter())
                    .all(|(l, r)| compatible(types, *l, *r, strict))
        }
        (TypeKind::Record { fields: lf }, TypeKind::Record { fields: rf }) => {
            lf.len() == rf.len()
                && lf.iter().zip(rf.iter()).all(|(l, r)| {
                    l.name == r.name && compatible(types, l.ty, r.ty, strict)
                })
        }
        (TypeKind::Variant { members: lm }, TypeKind::Variant { members: rm }) => {
            lm.len() == rm.len()
                && lm
                    .iter()
                    .zip(rm.iter())
                    .all(|(l, r)| compatible(types, *l, *r, strict))
        }
        (
            TypeKind::Function {
                params: lp,
                result: lr,
                ..
            },
            TypeKind::Function {
                params: rp,
                result: rr,
                ..
            },
        ) => {
            lp.len() == rp.len()
                && compatible(types, *lr, *rr, strict)
                && lp.iter().zip(rp.iter()).all(|(l, r)| {
                    l.mutable == r.mutable && compatible(types, l.ty, r.ty, strict)
                })
        }
        (TypeKind::Pointer { pointee: lp }, TypeKind::Pointer { pointee: rp }) => {
            // a pointer to a behaviour matches a pointer to any implementor
            if behaviour_implements(types, *lp, *rp) || behaviour_implements(types, *rp, *lp) {
                return true;
            }
            compatible(types, *lp, *rp, strict)
        }
        (
            TypeKind::Range {
                base: lb,
                open: lopen,
            },
            TypeKind::Range {
                base: rb,
                open: ropen,
            },
        ) => lopen == ropen && compatible(types, *lb, *rb, strict),
        _ => false,
    }
}

fn behaviour_implements(types: &TypeTable, behaviour: TypeId, candidate: TypeId) -> bool {
    if !matches!(types.kind(behaviour), TypeKind::Behaviour) {
        return false;
    }
    types
        .implementors(behaviour)
        .any(|implementor| compatible(types, candidate, implementor, true))
}

/// True when `member` of a variant accepts `candidate`.
pub fn variant_contains(types: &TypeTable, variant: TypeId, candidate: TypeId) -> bool {
    match types.kind(variant) {
        TypeKind::Variant { members } => members
            .iter()
            .any(|member| compatible(types, candidate, *member, true)),
        _ => false,
    }
}

/// One-directional assignment compatibility: can a value of type `right` be
/// stored where `left` is expected? Reflexive but not symmetric.
pub fn assignment_compatible(types: &TypeTable, left: TypeId, right: TypeId) -> bool {
    if matches!(types.kind(left), TypeKind::Unknown) || matches!(types.kind(right), TypeKind::Unknown)
    {
        return false;
    }

    // automatic dereference
    if let TypeKind::Pointer { pointee } = types.kind(left) {
        if compatible(types, right, *pointee, false) {
            return true;
        }
    }

    // behaviour switch: retry with the behaviour on the expected side
    if matches!(types.kind(right), TypeKind::Behaviour)
        && !matches!(types.kind(left), TypeKind::Behaviour)
    {
        return assignment_compatible(types, right, left);
    }

    match types.kind(left) {
        TypeKind::Tuple { components: lc } => {
            if let TypeKind::Tuple { components: rc } = types.kind(right) {
                return lc.len() == rc.len()
                    && lc
                        .iter()
                        .zip(rc.iter())
                        .all(|(l, r)| assignment_compatible(types, *l, *r));
            }
            compatible(types, left, right, false)
        }
        TypeKind::Array {
            elem: lelem,
            size: lsize,
            ..
        } => match types.kind(right) {
            TypeKind::Array {
                elem: relem,
                size: rsize,
                ..
            } => lsize == rsize && assignment_compatible(types, *lelem, *relem),
            // array to pointer, not safe
            TypeKind::Pointer { pointee } => assignment_compatible(types, *lelem, *pointee),
            _ => compatible(types, left, right, false),
        },
        TypeKind::Slice { elem: lelem } => match types.kind(right) {
            TypeKind::Array {
                elem: relem,
                size: rsize,
                ..
            } => {
                // array to slice
                if assignment_compatible(types, *lelem, *relem) {
                    return true;
                }
                // empty array of unknown element type to any slice
                matches!(types.kind(*relem), TypeKind::Unknown) && *rsize == 0
            }
            // slice to pointer, not safe
            TypeKind::Pointer { pointee } => assignment_compatible(types, *lelem, *pointee),
            _ => compatible(types, left, right, false),
        },
        // chars and string interchange freely on assignment
        TypeKind::Chars | TypeKind::Str => {
            matches!(types.kind(right), TypeKind::Chars | TypeKind::Str)
        }
        TypeKind::Pointer { pointee: lpointee } => {
            // automatic address-of
            if compatible(types, *lpointee, right, true) {
                return true;
            }
            match types.kind(right) {
                TypeKind::Pointer { pointee: rpointee } => {
                    // behaviour upcast through pointers
                    if behaviour_implements(types, *lpointee, *rpointee)
                        || behaviour_implements(types, *rpointee, *lpointee)
                    {
                        return true;
                    }
                    assignment_compatible(types, *lpointee, *rpointee)
                }
                // array/slice decay to a pointer to their element, not safe
                TypeKind::Array { elem, .. } | TypeKind::Slice { elem } => {
                    assignment_compatible(types, *lpointee, *elem)
                }
                _ => compatible(types, left, right, false),
            }
        }
        TypeKind::Variant { .. } => {
            // a subtype flows into the variant that contains it
            if variant_contains(types, left, right) {
                return true;
            }
            compatible(types, left, right, false)
        }
        _ => compatible(types, left, right, false),
    }
}

/// Coercions classified as unsafe: assignments that are accepted but
/// reported with an "unsafe" classification.
pub fn unsafe_coercion(types: &TypeTable, left: TypeId, right: TypeId) -> bool {
    match (types.kind(left), types.kind(right)) {
        // array/slice to pointer-to-element
        (TypeKind::Pointer { pointee }, TypeKind::Array { elem, .. })
        | (TypeKind::Pointer { pointee }, TypeKind::Slice { elem }) => {
            assignment_compatible(types, *pointee, *elem)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FunctionParam, RecordField, TypeTable};

    #[test]
    fn test_compatible_reflexive_and_symmetric() {
        let mut types = TypeTable::new();
        let i32_ty = types.sint(32);
        let tuple = types.tuple(vec![i32_ty, types.boolean()]);

        for strict in [true, false] {
            assert!(compatible(&types, i32_ty, i32_ty, strict));
            assert!(compatible(&types, tuple, tuple, strict));
        }

        let other = types.tuple(vec![i32_ty, types.boolean()]);
        assert_eq!(
            compatible(&types, tuple, other, true),
            compatible(&types, other, tuple, true)
        );
    }

    #[test]
    fn test_lax_ignores_widths() {
        let types = TypeTable::new();
        let a = types.sint(32);
        let b = types.uint(64);
        assert!(!compatible(&types, a, b, true));
        assert!(compatible(&types, a, b, false));

        let f32_ty = types.floating(32);
        let f64_ty = types.floating(64);
        assert!(!compatible(&types, f32_ty, f64_ty, true));
        assert!(compatible(&types, f32_ty, f64_ty, false));
    }

    #[test]
    fn test_unknown_never_compatible() {
        let types = TypeTable::new();
        assert!(!compatible(&types, types.unknown(), types.unknown(), false));
        assert!(!assignment_compatible(
            &types,
            types.unknown(),
            types.sint(32)
        ));
    }

    #[test]
    fn test_array_to_slice() {
        let mut types = TypeTable::new();
        let elem = types.sint(32);
        let array = types.array(elem, 3);
        let slice = types.slice(elem);
        assert!(assignment_compatible(&types, slice, array));
        assert!(!assignment_compatible(&types, array, slice));
    }

    #[test]
    fn test_empty_unknown_array_to_slice() {
        let mut types = TypeTable::new();
        let unknown = types.unknown();
        let empty = types.array(unknown, 0);
        let elem = types.sint(32);
        let slice = types.slice(elem);
        assert!(assignment_compatible(&types, slice, empty));
    }

    #[test]
    fn test_array_to_pointer_is_unsafe() {
        let mut types = TypeTable::new();
        let elem = types.sint(32);
        let array = types.array(elem, 3);
        let pointer = types.pointer(elem);
        assert!(assignment_compatible(&types, pointer, array));
        assert!(unsafe_coercion(&types, pointer, array));
    }

    #[test]
    fn test_chars_string_interchange() {
        let types = TypeTable::new();
        assert!(assignment_compatible(&types, types.chars(), types.string()));
        assert!(assignment_compatible(&types, types.string(), types.chars()));
    }

    #[test]
    fn test_subtype_into_variant() {
        let mut types = TypeTable::new();
        let i32_ty = types.sint(32);
        let f64_ty = types.floating(64);
        let variant = types.variant(vec![i32_ty, f64_ty]);
        assert!(assignment_compatible(&types, variant, i32_ty));
        assert!(!assignment_compatible(&types, variant, types.string()));
    }

    #[test]
    fn test_pointer_to_behaviour_upcast() {
        let mut types = TypeTable::new();
        let behaviour = types.behaviour();
        let concrete = types.record(vec![RecordField {
            name: "x".to_string(),
            ty: types.sint(32),
        }]);
        let ptr_concrete = types.pointer(concrete);
        let ptr_behaviour = types.pointer(behaviour);

        assert!(!assignment_compatible(&types, ptr_behaviour, ptr_concrete));
        types.record_implementor(behaviour, concrete);
        assert!(assignment_compatible(&types, ptr_behaviour, ptr_concrete));
    }

    #[test]
    fn test_auto_address_of() {
        let mut types = TypeTable::new();
        let i32_ty = types.sint(32);
        let pointer = types.pointer(i32_ty);
        assert!(assignment_compatible(&types, pointer, i32_ty));
    }

    #[test]
    fn test_function_mutability_matters() {
        let mut types = TypeTable::new();
        let i32_ty = types.sint(32);
        let unit = types.unit();
        let f = types.function(
            vec![FunctionParam {
                ty: i32_ty,
                mutable: false,
            }],
            unit,
            false,
        );
        let g = types.function(
            vec![FunctionParam {
                ty: i32_ty,
                mutable: true,
            }],
            unit,
            false,
        );
        assert!(!compatible(&types, f, g, true));
    }
}
