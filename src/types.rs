//! Type metadata — built-in classification, the type index, and the
//! memoizing resolver
//!
//! This is the crate's answer to a compiler symbol table: given a type
//! reference from the manifest, resolve what kind of type it names, which
//! members it declares, and how values of it compare. Resolution is
//! memoized per run; resolved entries are shared as `Arc<TypeInfo>` so the
//! emitter can run on worker threads without re-resolving anything.

use std::collections::HashMap;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::equality::{classify, EqualityKind};
use crate::manifest::{FieldSig, Manifest, MethodSig, TypeDecl};

/// Type kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Struct,
    Class,
    Interface,
    Enum,
}

impl TypeKind {
    /// Structs and enums are value types; classes and interfaces are not.
    pub fn is_value(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Enum)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Struct => "struct",
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        }
    }
}

/// The fixed set of built-in scalar/primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Builtin {
    Object,
    Bool,
    Char,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    String,
    IntPtr,
    UIntPtr,
    DateTime,
}

impl Builtin {
    /// Look up a built-in by its C# keyword or CLR name.
    pub fn from_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "object" | "System.Object" => Builtin::Object,
            "bool" | "System.Boolean" => Builtin::Bool,
            "char" | "System.Char" => Builtin::Char,
            "sbyte" | "System.SByte" => Builtin::SByte,
            "byte" | "System.Byte" => Builtin::Byte,
            "short" | "System.Int16" => Builtin::Short,
            "ushort" | "System.UInt16" => Builtin::UShort,
            "int" | "System.Int32" => Builtin::Int,
            "uint" | "System.UInt32" => Builtin::UInt,
            "long" | "System.Int64" => Builtin::Long,
            "ulong" | "System.UInt64" => Builtin::ULong,
            "float" | "System.Single" => Builtin::Float,
            "double" | "System.Double" => Builtin::Double,
            "decimal" | "System.Decimal" => Builtin::Decimal,
            "string" | "System.String" => Builtin::String,
            "nint" | "IntPtr" | "System.IntPtr" => Builtin::IntPtr,
            "nuint" | "UIntPtr" | "System.UIntPtr" => Builtin::UIntPtr,
            "DateTime" | "System.DateTime" => Builtin::DateTime,
            _ => return None,
        })
    }

    /// The C# keyword where one exists, else the CLR simple name.
    pub fn display_name(self) -> &'static str {
        match self {
            Builtin::Object => "object",
            Builtin::Bool => "bool",
            Builtin::Char => "char",
            Builtin::SByte => "sbyte",
            Builtin::Byte => "byte",
            Builtin::Short => "short",
            Builtin::UShort => "ushort",
            Builtin::Int => "int",
            Builtin::UInt => "uint",
            Builtin::Long => "long",
            Builtin::ULong => "ulong",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::Decimal => "decimal",
            Builtin::String => "string",
            Builtin::IntPtr => "IntPtr",
            Builtin::UIntPtr => "UIntPtr",
            Builtin::DateTime => "DateTime",
        }
    }

    /// Fixed storage width; `None` for the reference kinds.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Builtin::Bool | Builtin::Byte | Builtin::SByte => Some(1),
            Builtin::Char | Builtin::Short | Builtin::UShort => Some(2),
            Builtin::Int | Builtin::UInt | Builtin::Float => Some(4),
            Builtin::Long | Builtin::ULong | Builtin::Double | Builtin::DateTime => Some(8),
            Builtin::IntPtr | Builtin::UIntPtr => Some(8),
            Builtin::Decimal => Some(16),
            Builtin::Object | Builtin::String => None,
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Builtin::Object | Builtin::String)
    }

    /// Built-ins with a native `==` operator.
    pub fn has_operator_eq(self) -> bool {
        matches!(
            self,
            Builtin::Bool
                | Builtin::Char
                | Builtin::SByte
                | Builtin::Byte
                | Builtin::Short
                | Builtin::UShort
                | Builtin::Int
                | Builtin::UInt
                | Builtin::Long
                | Builtin::ULong
                | Builtin::Decimal
                | Builtin::Float
                | Builtin::Double
                | Builtin::String
                | Builtin::IntPtr
                | Builtin::UIntPtr
                | Builtin::DateTime
        )
    }

    /// Built-ins known to carry a correct by-value instance `Equals`.
    pub fn has_instance_equals(self) -> bool {
        self.has_operator_eq()
    }

    /// Built-ins with a static two-argument `Equals`.
    pub fn has_static_equals(self) -> bool {
        matches!(self, Builtin::Decimal | Builtin::String | Builtin::DateTime)
    }
}

/// A resolved type: everything downstream stages need to know about one
/// type reference. Immutable once built; shared via `Arc`.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// Short display name (`int`, `Vector2`, `int?`)
    pub name: String,

    /// Qualified display name (`Example.Math.Vector2`)
    pub full_name: String,

    pub kind: TypeKind,

    pub builtin: Option<Builtin>,

    /// Whether this is an optional wrapper (`T?`)
    pub is_nullable: bool,

    /// Raw reference of the wrapped type, when `is_nullable`
    pub nullable_underlying: Option<String>,

    pub is_generic: bool,

    /// Underlying integer type, for enum kinds
    pub enum_underlying: Option<Builtin>,

    /// Instance data members, for storage-size estimation
    pub fields: Vec<FieldSig>,

    /// Declared method signatures, for equality probing
    pub methods: Vec<MethodSig>,

    /// Event members each cost one reference slot
    pub event_count: usize,

    /// Classified equality strategy; computed once at resolution
    pub equality: EqualityKind,
}

impl TypeInfo {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name)
    }
}

/// Index of user-declared types, keyed by simple and qualified name.
pub struct TypeIndex {
    by_name: HashMap<String, TypeDecl>,
}

impl TypeIndex {
    pub fn from_manifest(manifest: &Manifest) -> TypeIndex {
        let mut by_name = HashMap::new();
        for decl in &manifest.types {
            // first declaration wins; duplicates are flagged by validate()
            by_name
                .entry(decl.name.clone())
                .or_insert_with(|| decl.clone());
            if let Some(ns) = &decl.namespace {
                by_name
                    .entry(format!("{}.{}", ns, decl.name))
                    .or_insert_with(|| decl.clone());
            }
        }
        TypeIndex { by_name }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.by_name.get(name)
    }
}

/// Memoizing get-or-create lookup over the type index.
///
/// Resolution happens entirely during descriptor building; the cache is
/// fully populated before emission fans out across workers.
pub struct TypeResolver<'a> {
    index: &'a TypeIndex,
    cache: HashMap<String, Arc<TypeInfo>>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(index: &'a TypeIndex) -> Self {
        Self {
            index,
            cache: HashMap::new(),
        }
    }

    /// Resolve a raw type reference, reusing a prior resolution if one exists.
    pub fn resolve(&mut self, raw: &str) -> Arc<TypeInfo> {
        let key = raw.trim().to_string();
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit);
        }
        let info = Arc::new(self.resolve_uncached(&key));
        self.cache.insert(key, Arc::clone(&info));
        info
    }

    /// Number of distinct resolved entries
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    fn resolve_uncached(&mut self, key: &str) -> TypeInfo {
        if let Some(bare) = key.strip_suffix('?') {
            return self.resolve_nullable(bare.trim());
        }
        if let Some(builtin) = Builtin::from_name(key) {
            return finish(TypeInfo {
                name: builtin.display_name().into(),
                full_name: builtin.display_name().into(),
                kind: if builtin.is_reference() {
                    TypeKind::Class
                } else {
                    TypeKind::Struct
                },
                builtin: Some(builtin),
                is_nullable: false,
                nullable_underlying: None,
                is_generic: false,
                enum_underlying: None,
                fields: Vec::new(),
                methods: Vec::new(),
                event_count: 0,
                equality: EqualityKind::DefaultComparer,
            });
        }
        if let Some(decl) = self.index.get(key) {
            let full_name = match &decl.namespace {
                Some(ns) => format!("{}.{}", ns, decl.name),
                None => decl.name.clone(),
            };
            let enum_underlying = (decl.kind == TypeKind::Enum).then(|| {
                decl.underlying
                    .as_deref()
                    .and_then(Builtin::from_name)
                    .unwrap_or(Builtin::Int)
            });
            return finish(TypeInfo {
                name: decl.name.clone(),
                full_name,
                kind: decl.kind,
                builtin: None,
                is_nullable: false,
                nullable_underlying: None,
                is_generic: decl.generic,
                enum_underlying,
                fields: decl.fields.clone(),
                methods: decl.methods.clone(),
                event_count: decl.events.len(),
                equality: EqualityKind::DefaultComparer,
            });
        }
        // Unknown shape: an external reference type with no probeable members.
        finish(TypeInfo {
            name: key.into(),
            full_name: key.into(),
            kind: TypeKind::Class,
            builtin: None,
            is_nullable: false,
            nullable_underlying: None,
            is_generic: key.contains('<'),
            enum_underlying: None,
            fields: Vec::new(),
            methods: Vec::new(),
            event_count: 0,
            equality: EqualityKind::DefaultComparer,
        })
    }

    fn resolve_nullable(&mut self, bare: &str) -> TypeInfo {
        let inner = self.resolve(bare);
        finish(TypeInfo {
            name: format!("{}?", inner.name),
            full_name: format!("{}?", inner.full_name),
            kind: TypeKind::Struct,
            builtin: None,
            is_nullable: true,
            nullable_underlying: Some(bare.to_string()),
            is_generic: true,
            enum_underlying: None,
            fields: Vec::new(),
            methods: Vec::new(),
            event_count: 0,
            equality: EqualityKind::DefaultComparer,
        })
    }
}

fn finish(mut info: TypeInfo) -> TypeInfo {
    info.equality = classify(&info);
    info
}
