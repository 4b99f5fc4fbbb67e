//! Equality-strategy classification and storage-size estimation
//!
//! Both are total functions: every type classifies to *some* strategy
//! (the generic comparer is the universal fallback) and every type has a
//! size (unrecognized shapes cost 0). Neither can fail.

use serde::Serialize;

use crate::types::{TypeInfo, TypeKind, TypeResolver};

/// How two values of a type are compared in emitted code.
///
/// Exactly one applies per type. Precedence is fixed: a native operator
/// beats an instance method, which beats a static method; the generic
/// comparer catches everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EqualityKind {
    /// `a == b`
    OperatorEq,
    /// `a.Equals(b)`
    InstanceEquals,
    /// `T.Equals(a, b)`
    StaticEquals,
    /// `EqualityComparer<T>.Default.Equals(a, b)`
    DefaultComparer,
}

/// Classify a type's equality strategy. First match wins.
pub fn classify(info: &TypeInfo) -> EqualityKind {
    if has_operator_eq(info) {
        return EqualityKind::OperatorEq;
    }
    if has_instance_equals(info) {
        return EqualityKind::InstanceEquals;
    }
    if has_static_equals(info) {
        return EqualityKind::StaticEquals;
    }
    EqualityKind::DefaultComparer
}

fn param_is_self(info: &TypeInfo, param: &str) -> bool {
    let p = param.trim();
    p == info.name || p == info.full_name
}

/// Enumerations, operator-bearing built-ins, or a declared
/// `op_Equality(T, T)` whose both parameters are exactly the type itself.
pub fn has_operator_eq(info: &TypeInfo) -> bool {
    if info.kind == TypeKind::Enum {
        return true;
    }
    if info.builtin.is_some_and(|b| b.has_operator_eq()) {
        return true;
    }
    info.methods.iter().any(|m| {
        m.name == "op_Equality"
            && m.params.len() == 2
            && m.params.iter().all(|p| param_is_self(info, p))
    })
}

/// Built-ins with a by-value instance comparison, or a declared non-static
/// `Equals(T)` taking exactly the type itself.
pub fn has_instance_equals(info: &TypeInfo) -> bool {
    if info.builtin.is_some_and(|b| b.has_instance_equals()) {
        return true;
    }
    info.methods.iter().any(|m| {
        m.name == "Equals"
            && !m.is_static
            && m.params.len() == 1
            && param_is_self(info, &m.params[0])
    })
}

/// decimal/string/date-time, or a declared static `Equals(T, T)`.
pub fn has_static_equals(info: &TypeInfo) -> bool {
    if info.builtin.is_some_and(|b| b.has_static_equals()) {
        return true;
    }
    info.methods.iter().any(|m| {
        m.name == "Equals"
            && m.is_static
            && m.params.len() == 2
            && m.params.iter().all(|p| param_is_self(info, p))
    })
}

/// Reference members are charged a fixed placeholder cost.
pub const SIZE_OF_REF: usize = 4;

// C# rejects by-value struct cycles, but a manifest can still declare one.
const MAX_NESTING: usize = 32;

/// Estimate the storage footprint of one value of `info`, in bytes.
///
/// Built-ins map to fixed widths; enums recurse into their underlying
/// integer; optional wrappers cost one flag byte plus their payload;
/// reference kinds cost [`SIZE_OF_REF`]; composite value types sum their
/// instance data members, with events charged as references. Unrecognized
/// shapes yield 0.
pub fn size_of(info: &TypeInfo, resolver: &mut TypeResolver) -> usize {
    size_of_bounded(info, resolver, 0)
}

fn size_of_bounded(info: &TypeInfo, resolver: &mut TypeResolver, depth: usize) -> usize {
    if depth > MAX_NESTING {
        return 0;
    }
    if let Some(builtin) = info.builtin {
        return builtin.fixed_width().unwrap_or(SIZE_OF_REF);
    }
    if info.is_nullable {
        let payload = match info.nullable_underlying.as_deref() {
            Some(raw) => {
                let inner = resolver.resolve(raw);
                size_of_bounded(&inner, resolver, depth + 1)
            }
            None => 0,
        };
        return 1 + payload;
    }
    if let Some(underlying) = info.enum_underlying {
        return underlying.fixed_width().unwrap_or(0);
    }
    if !info.kind.is_value() {
        return SIZE_OF_REF;
    }

    let mut size = 0;
    for field in &info.fields {
        if field.is_static {
            continue;
        }
        let field_ty = resolver.resolve(&field.ty);
        size += size_of_bounded(&field_ty, resolver, depth + 1);
    }
    size + info.event_count * SIZE_OF_REF
}
