//! Manifest types — the declarative input model
//!
//! A `Manifest` carries two sections:
//! - `types:` — a registry of user-defined types with the member signatures
//!   the equality classifier probes
//! - `declarations:` — candidate type declarations, each optionally carrying
//!   a `union:` annotation (the variant tuple plus an invalid-access policy)
//!
//! ## Example Manifest
//!
//! ```yaml
//! id: app_unions
//! namespace: Example.App
//! declarations:
//!   - name: IntOrLabel
//!     readonly: true
//!     union:
//!       variants:
//!         - name: Count
//!           type: int
//!         - name: Label
//!           type: string
//!       invalid_access: throw
//! ```

use crate::descriptor::AccessPolicy;
use crate::error::{Error, Result};
use crate::types::{Builtin, TypeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap());

/// A complete manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "uniongen Manifest", description = "Union declaration manifest")]
pub struct Manifest {
    /// Unique identifier (used in provenance headers)
    pub id: String,

    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default namespace for declarations that do not set their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Namespace of the runtime support library the generated code imports
    #[serde(default = "default_support_namespace")]
    pub support_namespace: String,

    /// User-defined type registry
    #[serde(default)]
    pub types: Vec<TypeDecl>,

    /// Candidate type declarations
    #[serde(default)]
    pub declarations: Vec<Declaration>,

    /// Metadata
    #[serde(default, skip_serializing_if = "ManifestMeta::is_empty")]
    pub meta: ManifestMeta,
}

fn default_support_namespace() -> String {
    "Unions".into()
}

/// A user-defined type in the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TypeDecl {
    /// Simple type name
    pub name: String,

    /// Namespace (optional; unqualified types are matched by simple name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Type kind
    #[serde(default)]
    pub kind: TypeKind,

    /// Underlying integer type (enums only; defaults to int)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,

    /// Whether the type has open type parameters
    #[serde(default)]
    pub generic: bool,

    /// Instance data members (used for storage-size estimation)
    #[serde(default)]
    pub fields: Vec<FieldSig>,

    /// Method signatures (probed by the equality classifier)
    #[serde(default)]
    pub methods: Vec<MethodSig>,

    /// Event member names (each costs one reference slot)
    #[serde(default)]
    pub events: Vec<String>,
}

/// A data member signature
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldSig {
    /// Member name
    pub name: String,

    /// Member type
    #[serde(rename = "type")]
    pub ty: String,

    /// Static members carry no per-instance storage
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

/// A method signature
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MethodSig {
    /// Method name (`Equals`, `op_Equality`, ...)
    pub name: String,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    /// Parameter types, in order
    #[serde(default)]
    pub params: Vec<String>,
}

/// A candidate type declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Declaration {
    /// Declared type name
    pub name: String,

    /// Namespace override (falls back to the manifest default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Declaration kind; only value types (struct) qualify as unions
    #[serde(default)]
    pub kind: TypeKind,

    /// Read-only declarations get read-only storage
    #[serde(default)]
    pub readonly: bool,

    /// Generic declarations are skipped
    #[serde(default)]
    pub generic: bool,

    /// Enclosing type chain, outermost first
    #[serde(default)]
    pub containers: Vec<Container>,

    /// The union annotation; absent means the declaration is not a union
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub union: Option<UnionSpec>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One enclosing container of a nested declaration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Container {
    /// Container kind
    #[serde(default = "default_container_kind")]
    pub kind: TypeKind,

    /// Container name
    pub name: String,
}

fn default_container_kind() -> TypeKind {
    TypeKind::Class
}

/// The union annotation carried by a declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UnionSpec {
    /// Variant tuple, in declaration order (order fixes the tag values)
    #[serde(default)]
    pub variants: Vec<Variant>,

    /// What a wrong-variant read does; malformed values degrade to `allow`
    #[serde(default, deserialize_with = "AccessPolicy::deserialize_lenient")]
    pub invalid_access: AccessPolicy,
}

/// One (name, type) variant
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Variant {
    /// Variant name (becomes the emitted member name)
    pub name: String,

    /// Variant type reference; a trailing `?` marks an optional wrapper
    #[serde(rename = "type")]
    pub ty: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Manifest metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ManifestMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ManifestMeta {
    pub fn is_empty(&self) -> bool {
        self.version.is_none() && self.author.is_none() && self.tags.is_empty()
    }
}

impl Manifest {
    /// Parse manifest from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_norway::from_str(yaml).map_err(|e| Error::ManifestParse(e.to_string()))
    }

    /// Serialize manifest to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_norway::to_string(self).map_err(|e| Error::ManifestParse(e.to_string()))
    }

    /// Parse manifest from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ManifestParse(e.to_string()))
    }

    /// Serialize manifest to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::ManifestParse(e.to_string()))
    }

    /// Default namespace for declarations without their own
    pub fn default_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// Get a declaration by name
    pub fn get_declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Compute hash of manifest for change detection
    pub fn hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let content = self.to_yaml().unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("sha256:{}", hex::encode(&hasher.finalize()[..8]))
    }

    /// Validate the manifest; returns human-readable issues.
    ///
    /// Shape mismatches that merely cause a declaration to be skipped are
    /// reported as warnings, not errors — skipping must never abort a batch.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.id.is_empty() {
            issues.push("Manifest ID is required".into());
        }

        if self.declarations.is_empty() {
            issues.push("At least one declaration is required".into());
        }

        if let Some(ns) = &self.namespace {
            if !NAMESPACE_RE.is_match(ns) {
                issues.push(format!("Invalid namespace: {}", ns));
            }
        }

        let mut seen_types = HashSet::new();
        for decl in &self.types {
            if !seen_types.insert(decl.name.as_str()) {
                issues.push(format!("Duplicate type: {}", decl.name));
            }
            if !IDENT_RE.is_match(&decl.name) {
                issues.push(format!("Invalid type name: {}", decl.name));
            }
        }

        let mut seen_decls = HashSet::new();
        for decl in &self.declarations {
            if !seen_decls.insert(decl.name.as_str()) {
                issues.push(format!("Duplicate declaration: {}", decl.name));
            }
            if !IDENT_RE.is_match(&decl.name) {
                issues.push(format!("Invalid declaration name: {}", decl.name));
            }
            if let Some(ns) = &decl.namespace {
                if !NAMESPACE_RE.is_match(ns) {
                    issues.push(format!("{}: invalid namespace: {}", decl.name, ns));
                }
            }
            self.validate_union(decl, &mut issues);
        }

        issues
    }

    fn validate_union(&self, decl: &Declaration, issues: &mut Vec<String>) {
        let Some(union) = &decl.union else {
            return;
        };

        if union.variants.is_empty() {
            issues.push(format!(
                "Warning: {} has no variants and will be skipped",
                decl.name
            ));
        }
        if decl.kind != TypeKind::Struct {
            issues.push(format!(
                "Warning: {} is not a value type and will be skipped",
                decl.name
            ));
        }
        if decl.generic {
            issues.push(format!(
                "Warning: {} is generic and will be skipped",
                decl.name
            ));
        }

        let mut seen_variants = HashSet::new();
        for variant in &union.variants {
            if !IDENT_RE.is_match(&variant.name) {
                issues.push(format!(
                    "{}: invalid variant name: {}",
                    decl.name, variant.name
                ));
            }
            if !seen_variants.insert(crate::util::to_pascal_case(&variant.name)) {
                issues.push(format!(
                    "{}: duplicate variant name: {}",
                    decl.name, variant.name
                ));
            }
            if !self.is_known_type(&variant.ty) {
                issues.push(format!(
                    "Warning: {}: unknown type '{}' treated as an external reference",
                    decl.name, variant.ty
                ));
            }
        }
    }

    fn is_known_type(&self, raw: &str) -> bool {
        let bare = raw.trim().trim_end_matches('?');
        Builtin::from_name(bare).is_some()
            || bare.contains('<')
            || self.types.iter().any(|t| {
                t.name == bare
                    || t.namespace
                        .as_deref()
                        .is_some_and(|ns| format!("{}.{}", ns, t.name) == bare)
            })
    }
}
