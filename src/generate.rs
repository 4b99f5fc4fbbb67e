//! The generation pipeline — manifest in, source units out
//!
//! Descriptor building runs single-threaded and fully populates the shared
//! type cache; emission is a pure function per descriptor and fans out
//! across the rayon pool with one output buffer per worker.

use rayon::prelude::*;
use serde::Serialize;

use crate::descriptor::{build, AccessPolicy, TagWidth, UnionDescriptor};
use crate::manifest::{Declaration, Manifest};
use crate::render::{output_path, GeneratedFile, RenderConfig, Renderer};
use crate::types::{TypeIndex, TypeKind, TypeResolver};

/// Generation options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Emit the provenance header
    pub provenance: bool,

    /// Include a generation timestamp in the header
    pub timestamp: bool,

    /// Emit the runtime support sources alongside the unions
    pub support: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            provenance: true,
            timestamp: false,
            support: true,
        }
    }
}

/// Build descriptors for every union-shaped declaration, in manifest order.
///
/// Declarations that fail the shape checks are skipped, never reported as
/// errors; a single malformed candidate cannot abort the batch.
pub fn build_descriptors(manifest: &Manifest) -> Vec<UnionDescriptor> {
    let index = TypeIndex::from_manifest(manifest);
    let mut resolver = TypeResolver::new(&index);
    manifest
        .declarations
        .iter()
        .filter_map(|decl| build(decl, manifest.default_namespace(), &mut resolver))
        .collect()
}

/// Generate all source units for a manifest with default options.
pub fn generate(manifest: &Manifest) -> Vec<GeneratedFile> {
    generate_with(manifest, &GenerateOptions::default())
}

/// Generate all source units for a manifest.
pub fn generate_with(manifest: &Manifest, options: &GenerateOptions) -> Vec<GeneratedFile> {
    let descriptors = build_descriptors(manifest);

    let mut config = RenderConfig::for_manifest(manifest);
    config.provenance = options.provenance;
    config.timestamp = options.timestamp;
    let renderer = Renderer::with_config(config);

    // descriptors carry fully resolved types, so workers never touch the cache
    let mut files: Vec<GeneratedFile> = descriptors
        .par_iter()
        .map(|descriptor| renderer.render(descriptor))
        .collect();

    if options.support {
        files.extend(renderer.render_support());
    }
    files
}

/// Per-declaration outcome, for reporting
#[derive(Debug, Serialize)]
pub struct DeclarationReport {
    pub name: String,
    #[serde(flatten)]
    pub status: DeclarationStatus,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeclarationStatus {
    Union {
        variants: usize,
        tag_width: TagWidth,
        payload_size: usize,
        policy: AccessPolicy,
        path: String,
    },
    Skipped {
        reason: String,
    },
}

/// Report every declaration as a union (with its layout summary) or a
/// skip with the reason.
pub fn report(manifest: &Manifest) -> Vec<DeclarationReport> {
    let index = TypeIndex::from_manifest(manifest);
    let mut resolver = TypeResolver::new(&index);
    manifest
        .declarations
        .iter()
        .map(|decl| {
            let status = match build(decl, manifest.default_namespace(), &mut resolver) {
                Some(descriptor) => DeclarationStatus::Union {
                    variants: descriptor.fields.len(),
                    tag_width: descriptor.tag_width,
                    payload_size: descriptor.payload_size,
                    policy: descriptor.access,
                    path: output_path(&descriptor),
                },
                None => DeclarationStatus::Skipped {
                    reason: skip_reason(decl).into(),
                },
            };
            DeclarationReport {
                name: decl.name.clone(),
                status,
            }
        })
        .collect()
}

fn skip_reason(decl: &Declaration) -> &'static str {
    if decl.kind != TypeKind::Struct {
        "not a value type"
    } else if decl.generic {
        "generic"
    } else if decl.union.is_none() {
        "no union annotation"
    } else {
        "no variants"
    }
}
