//! Union descriptors — the validated, immutable model the emitter consumes
//!
//! `build` is the gate between raw declarations and code generation: a
//! declaration either yields a complete descriptor or is skipped. A skip is
//! not an error and never aborts a batch.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::equality::size_of;
use crate::manifest::{Container, Declaration};
use crate::types::{TypeInfo, TypeKind, TypeResolver};
use crate::util::{to_camel_case, to_pascal_case};

/// Discriminant width: the smallest unsigned integer representation that
/// can enumerate all variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagWidth {
    U8,
    U16,
    U32,
    U64,
}

impl TagWidth {
    /// Smallest width covering `variant_count` tag values.
    pub fn select(variant_count: usize) -> TagWidth {
        let count = variant_count as u64;
        if count <= u64::from(u8::MAX) {
            TagWidth::U8
        } else if count <= u64::from(u16::MAX) {
            TagWidth::U16
        } else if count <= u64::from(u32::MAX) {
            TagWidth::U32
        } else {
            TagWidth::U64
        }
    }

    /// The C# keyword of the underlying representation.
    pub fn keyword(self) -> &'static str {
        match self {
            TagWidth::U8 => "byte",
            TagWidth::U16 => "ushort",
            TagWidth::U32 => "uint",
            TagWidth::U64 => "ulong",
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            TagWidth::U8 => 8,
            TagWidth::U16 => 16,
            TagWidth::U32 => 32,
            TagWidth::U64 => 64,
        }
    }
}

/// What a wrong-variant read or narrowing conversion does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    /// Unchecked: the stored bytes are reinterpreted as the requested type
    #[default]
    Allow,
    /// Checked: a mismatch yields the requested type's default value
    ReturnDefault,
    /// Checked: a mismatch raises an invalid-access failure
    Throw,
    /// Like `Throw`, but the check only exists in debug builds
    ThrowDebugOnly,
}

impl AccessPolicy {
    /// Parse a policy string, degrading to the default on anything
    /// unrecognized.
    pub fn parse_lenient(raw: &str) -> AccessPolicy {
        let normalized: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "returndefault" | "default" => AccessPolicy::ReturnDefault,
            "throw" | "throwalways" | "throwexception" => AccessPolicy::Throw,
            "throwdebug" | "throwdebugonly" | "throwindebug" | "throwexceptionindebug" => {
                AccessPolicy::ThrowDebugOnly
            }
            _ => AccessPolicy::Allow,
        }
    }

    pub(crate) fn deserialize_lenient<'de, D>(deserializer: D) -> Result<AccessPolicy, D::Error>
    where
        D: Deserializer<'de>,
    {
        // anything that is not a policy string degrades to the default
        let raw = Option::<serde_norway::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(serde_norway::Value::as_str)
            .map(AccessPolicy::parse_lenient)
            .unwrap_or_default())
    }

    pub fn label(self) -> &'static str {
        match self {
            AccessPolicy::Allow => "allow",
            AccessPolicy::ReturnDefault => "return-default",
            AccessPolicy::Throw => "throw",
            AccessPolicy::ThrowDebugOnly => "throw-debug-only",
        }
    }
}

/// One variant of a union: emitted member name plus resolved type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Emitted member name (PascalCase)
    pub name: String,

    /// Resolved declared type
    pub ty: Arc<TypeInfo>,

    /// Resolved wrapped type, when `ty` is an optional wrapper; drives the
    /// dual-typed constructor/conversion overloads
    pub nullable_underlying: Option<Arc<TypeInfo>>,
}

impl FieldDescriptor {
    /// Private backing slot name for this variant.
    pub fn backing_name(&self) -> String {
        format!("_{}", to_camel_case(&self.name))
    }
}

/// A validated union declaration, ready for emission.
///
/// Field order equals declaration order and is significant: it fixes the
/// tag values and every emitted member list.
#[derive(Debug, Clone)]
pub struct UnionDescriptor {
    pub namespace: String,
    pub name: String,

    /// Enclosing type chain, outermost first
    pub containers: Vec<Container>,

    pub is_readonly: bool,
    pub access: AccessPolicy,
    pub fields: Vec<FieldDescriptor>,
    pub tag_width: TagWidth,

    /// Width of the widest variant, in bytes
    pub payload_size: usize,
}

impl UnionDescriptor {
    /// Read-only unions under the unchecked policy expose their slots
    /// directly; every other combination goes through private backing
    /// slots.
    pub fn has_backing_fields(&self) -> bool {
        !(self.is_readonly && self.access == AccessPolicy::Allow)
    }
}

/// Validate a declaration and assemble its descriptor.
///
/// Returns `None` — skip, not failure — when the declaration is not
/// union-shaped: wrong kind, generic, no annotation, or zero variants.
pub fn build(
    decl: &Declaration,
    fallback_namespace: &str,
    resolver: &mut TypeResolver,
) -> Option<UnionDescriptor> {
    if decl.kind != TypeKind::Struct || decl.generic {
        return None;
    }
    let union = decl.union.as_ref()?;
    if union.variants.is_empty() {
        return None;
    }

    let mut fields = Vec::with_capacity(union.variants.len());
    for variant in &union.variants {
        let ty = resolver.resolve(&variant.ty);
        let nullable_underlying = ty
            .nullable_underlying
            .clone()
            .map(|raw| resolver.resolve(&raw));
        fields.push(FieldDescriptor {
            name: to_pascal_case(&variant.name),
            ty,
            nullable_underlying,
        });
    }

    let payload_size = fields
        .iter()
        .map(|f| size_of(&f.ty, resolver))
        .max()
        .unwrap_or(0);

    Some(UnionDescriptor {
        namespace: decl
            .namespace
            .clone()
            .unwrap_or_else(|| fallback_namespace.to_string()),
        name: decl.name.clone(),
        containers: decl.containers.clone(),
        is_readonly: decl.readonly,
        access: union.invalid_access,
        tag_width: TagWidth::select(fields.len()),
        payload_size,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use crate::types::TypeIndex;

    fn build_first(yaml: &str) -> Option<UnionDescriptor> {
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let index = TypeIndex::from_manifest(&manifest);
        let mut resolver = TypeResolver::new(&index);
        build(
            &manifest.declarations[0],
            manifest.default_namespace(),
            &mut resolver,
        )
    }

    #[test]
    fn test_select_width_thresholds() {
        assert_eq!(TagWidth::select(1), TagWidth::U8);
        assert_eq!(TagWidth::select(255), TagWidth::U8);
        assert_eq!(TagWidth::select(256), TagWidth::U16);
        assert_eq!(TagWidth::select(65535), TagWidth::U16);
        assert_eq!(TagWidth::select(65536), TagWidth::U32);
        assert_eq!(TagWidth::select(4294967295), TagWidth::U32);
        assert_eq!(TagWidth::select(4294967296), TagWidth::U64);
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(AccessPolicy::parse_lenient("throw"), AccessPolicy::Throw);
        assert_eq!(
            AccessPolicy::parse_lenient("Return_Default"),
            AccessPolicy::ReturnDefault
        );
        assert_eq!(
            AccessPolicy::parse_lenient("throw-debug-only"),
            AccessPolicy::ThrowDebugOnly
        );
        assert_eq!(AccessPolicy::parse_lenient("gibberish"), AccessPolicy::Allow);
        assert_eq!(AccessPolicy::parse_lenient(""), AccessPolicy::Allow);
    }

    #[test]
    fn test_build_basic() {
        let descriptor = build_first(
            r#"
id: m
namespace: Example.App
declarations:
  - name: IntOrLabel
    readonly: true
    union:
      variants:
        - name: Count
          type: int
        - name: Label
          type: string
"#,
        )
        .unwrap();

        assert_eq!(descriptor.namespace, "Example.App");
        assert_eq!(descriptor.name, "IntOrLabel");
        assert_eq!(descriptor.tag_width, TagWidth::U8);
        assert_eq!(descriptor.fields.len(), 2);
        assert_eq!(descriptor.fields[0].name, "Count");
        assert!(descriptor.is_readonly);
        assert_eq!(descriptor.access, AccessPolicy::Allow);
        assert!(!descriptor.has_backing_fields());
        // widest variant: the string reference placeholder
        assert_eq!(descriptor.payload_size, 4);
    }

    #[test]
    fn test_build_skips_non_struct() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: NotAUnion
    kind: class
    union:
      variants:
        - name: A
          type: int
"#,
        );
        assert!(descriptor.is_none());
    }

    #[test]
    fn test_build_skips_generic() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: Generic
    generic: true
    union:
      variants:
        - name: A
          type: int
"#,
        );
        assert!(descriptor.is_none());
    }

    #[test]
    fn test_build_skips_unannotated() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: Plain
"#,
        );
        assert!(descriptor.is_none());
    }

    #[test]
    fn test_build_skips_empty_variants() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: Empty
    union:
      variants: []
"#,
        );
        assert!(descriptor.is_none());
    }

    #[test]
    fn test_build_resolves_nullable_underlying() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: MaybeCount
    union:
      variants:
        - name: Count
          type: int?
        - name: Label
          type: string
"#,
        )
        .unwrap();

        let count = &descriptor.fields[0];
        assert!(count.ty.is_nullable);
        let underlying = count.nullable_underlying.as_ref().unwrap();
        assert_eq!(underlying.name, "int");
        // one flag byte plus the int payload
        assert_eq!(descriptor.payload_size, 5);
    }

    #[test]
    fn test_backing_names() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: U
    union:
      variants:
        - name: LabelText
          type: string
"#,
        )
        .unwrap();
        assert!(descriptor.has_backing_fields());
        assert_eq!(descriptor.fields[0].backing_name(), "_labelText");
    }

    #[test]
    fn test_mutable_allow_uses_backing_fields() {
        let descriptor = build_first(
            r#"
id: m
declarations:
  - name: U
    union:
      variants:
        - name: A
          type: int
"#,
        )
        .unwrap();
        assert!(!descriptor.is_readonly);
        assert!(descriptor.has_backing_fields());
    }
}
