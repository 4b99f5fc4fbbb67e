//! Code rendering — union source synthesis
//!
//! A [`Renderer`] turns a completed [`UnionDescriptor`] into one generated
//! C# source unit. Rendering is a pure function of the descriptor and the
//! render configuration; the same inputs always produce the same text.

mod csharp;
mod support;

use serde::Serialize;

use crate::descriptor::UnionDescriptor;
use crate::manifest::Manifest;

/// One generated source unit
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    /// Output-relative path, derived from namespace + type name +
    /// enclosing-type chain
    pub path: String,

    /// Full source text
    pub code: String,

    /// Which generator produced the file
    pub generator: &'static str,
}

/// Render configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Include the provenance header
    pub provenance: bool,

    /// Include a generation timestamp in the header. Off by default so
    /// output is byte-reproducible.
    pub timestamp: bool,

    /// Namespace of the runtime support library the generated code imports
    pub support_namespace: String,

    /// Manifest identity for the provenance header
    pub manifest_id: String,

    /// Manifest content hash for the provenance header
    pub manifest_hash: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            provenance: true,
            timestamp: false,
            support_namespace: "Unions".into(),
            manifest_id: String::new(),
            manifest_hash: String::new(),
        }
    }
}

impl RenderConfig {
    /// Config carrying a manifest's identity, hash, and support namespace.
    pub fn for_manifest(manifest: &Manifest) -> Self {
        Self {
            support_namespace: manifest.support_namespace.clone(),
            manifest_id: manifest.id.clone(),
            manifest_hash: manifest.hash(),
            ..Self::default()
        }
    }
}

/// Union source renderer
#[derive(Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render one union declaration to its source unit.
    pub fn render(&self, descriptor: &UnionDescriptor) -> GeneratedFile {
        GeneratedFile {
            path: output_path(descriptor),
            code: csharp::render(descriptor, &self.config),
            generator: "uniongen",
        }
    }

    /// Render the runtime support sources the generated unions reference.
    pub fn render_support(&self) -> Vec<GeneratedFile> {
        support::render(&self.config)
    }
}

/// Deterministic file identity: type name, then enclosing types, then
/// namespace, `-`-delimited.
pub fn output_path(descriptor: &UnionDescriptor) -> String {
    let mut stem = descriptor.name.clone();
    for container in &descriptor.containers {
        stem.push('-');
        stem.push_str(&container.name);
    }
    if !descriptor.namespace.is_empty() {
        stem.push('-');
        stem.push_str(&descriptor.namespace);
    }
    format!("unions/{}.cs", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::build;
    use crate::types::{TypeIndex, TypeResolver};

    fn descriptor_from(yaml: &str) -> UnionDescriptor {
        let manifest = Manifest::from_yaml(yaml).unwrap();
        let index = TypeIndex::from_manifest(&manifest);
        let mut resolver = TypeResolver::new(&index);
        build(
            &manifest.declarations[0],
            manifest.default_namespace(),
            &mut resolver,
        )
        .unwrap()
    }

    #[test]
    fn test_output_path() {
        let descriptor = descriptor_from(
            r#"
id: m
namespace: Example.App
declarations:
  - name: IntOrLabel
    union:
      variants:
        - name: Count
          type: int
"#,
        );
        assert_eq!(output_path(&descriptor), "unions/IntOrLabel-Example.App.cs");
    }

    #[test]
    fn test_output_path_with_containers() {
        let descriptor = descriptor_from(
            r#"
id: m
namespace: Example.App
declarations:
  - name: Inner
    containers:
      - name: Outer
      - name: Middle
        kind: struct
    union:
      variants:
        - name: Count
          type: int
"#,
        );
        assert_eq!(
            output_path(&descriptor),
            "unions/Inner-Outer-Middle-Example.App.cs"
        );
    }

    #[test]
    fn test_output_path_without_namespace() {
        let descriptor = descriptor_from(
            r#"
id: m
declarations:
  - name: Bare
    union:
      variants:
        - name: Count
          type: int
"#,
        );
        assert_eq!(output_path(&descriptor), "unions/Bare.cs");
    }
}
