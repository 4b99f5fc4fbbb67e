// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # uniongen — declarative discriminated-union synthesis
//!
//! uniongen treats a **manifest** as the source of truth. The manifest
//! declares candidate types; each one carrying a union annotation — an
//! ordered list of (name, type) variants plus an invalid-access policy —
//! is synthesized into a complete C# union struct:
//!
//! - **Layout**: an explicit-offset overlapping store, one discriminant of
//!   the narrowest width that enumerates the variants, every variant slot
//!   one byte past it
//! - **API**: per-variant constructors (with by-reference and optional
//!   wrapper overloads), accessors, `Set`, `TryGet`, `GetUnderlyingType`
//! - **Semantics**: structural equality over the active variant only,
//!   each variant compared under its classified equality strategy;
//!   consistent hashing; `ToString`; implicit conversions in both
//!   directions whose narrowing behavior follows the access policy
//!
//! ## Quick Start
//!
//! ```rust
//! use uniongen::{generate, Manifest};
//!
//! let manifest = Manifest::from_yaml(r#"
//! id: app_unions
//! namespace: Example.App
//! declarations:
//!   - name: IntOrLabel
//!     union:
//!       variants:
//!         - name: Count
//!           type: int
//!         - name: Label
//!           type: string
//! "#).unwrap();
//!
//! let files = generate(&manifest);
//! let union = files.iter().find(|f| f.path.contains("IntOrLabel")).unwrap();
//! assert!(union.code.contains("public enum Tags : byte"));
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! MANIFEST (YAML/JSON)
//!      │
//!      ├──► build(declaration) ──► UnionDescriptor | skip
//!      │         │
//!      │         └── TypeResolver (memoized) ── classify / size_of
//!      │
//!      └──► render(descriptor) ──► GeneratedFile { path, code }
//! ```
//!
//! Descriptor building is single-threaded and resolves every type once;
//! emission is a pure function of the descriptor and fans out in parallel.
//! A declaration that is not union-shaped (wrong kind, generic, missing
//! annotation, zero variants) is skipped, never an error.

// Core analysis
pub mod descriptor;
pub mod equality;
pub mod error;
pub mod manifest;
pub mod types;

// Emission and orchestration
pub mod generate;
pub mod render;
pub mod util;

// Re-exports
pub use descriptor::{build, AccessPolicy, FieldDescriptor, TagWidth, UnionDescriptor};
pub use equality::{classify, size_of, EqualityKind};
pub use error::{Error, Result};
pub use generate::{
    build_descriptors, generate, generate_with, report, DeclarationReport, DeclarationStatus,
    GenerateOptions,
};
pub use manifest::{
    Container, Declaration, FieldSig, Manifest, ManifestMeta, MethodSig, TypeDecl, UnionSpec,
    Variant,
};
pub use render::{output_path, GeneratedFile, RenderConfig, Renderer};
pub use types::{Builtin, TypeIndex, TypeInfo, TypeKind, TypeResolver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
