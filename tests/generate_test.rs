//! End-to-end generation tests

use pretty_assertions::assert_eq;
use std::fs;
use uniongen::{generate, generate_with, report, DeclarationStatus, GenerateOptions, Manifest};

const SCENARIO: &str = r#"
id: app_unions
namespace: Example.App
types:
  - name: Vector2
    namespace: Example.Math
    fields:
      - name: X
        type: float
      - name: Y
        type: float
    methods:
      - name: op_Equality
        static: true
        params: [Vector2, Vector2]
declarations:
  - name: IntOrLabel
    union:
      variants:
        - name: Count
          type: int
        - name: Label
          type: string
  - name: Payload
    readonly: true
    containers:
      - name: Messages
    union:
      variants:
        - name: Position
          type: Vector2
        - name: Code
          type: byte
        - name: Text
          type: string
      invalid_access: throw
  - name: NotGenerated
    kind: interface
"#;

#[test]
fn scenario_produces_expected_surface() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let files = generate(&manifest);

    let union = files
        .iter()
        .find(|f| f.path == "unions/IntOrLabel-Example.App.cs")
        .unwrap();

    // a two-variant union gets a 2-valued 8-bit discriminant
    assert!(union.code.contains("public enum Tags : byte"));
    assert!(union.code.contains("Count,"));
    assert!(union.code.contains("Label,"));

    // constructors plus their by-reference overloads
    assert!(union.code.contains("public IntOrLabel(int value)"));
    assert!(union.code.contains("public IntOrLabel(in int value)"));
    assert!(union.code.contains("public IntOrLabel(string value)"));
    assert!(union.code.contains("public IntOrLabel(in string value)"));

    // implicit conversions both directions
    assert!(union
        .code
        .contains("public static implicit operator IntOrLabel(int value)"));
    assert!(union
        .code
        .contains("public static implicit operator int(IntOrLabel value)"));

    // equality compares only the active field
    assert!(union.code.contains("if (a._tag != b._tag)"));
    assert!(union.code.contains("return a._count == b._count;"));
}

#[test]
fn scenario_three_variants_dispatch_by_switch() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let files = generate(&manifest);

    let payload = files
        .iter()
        .find(|f| f.path == "unions/Payload-Messages-Example.App.cs")
        .unwrap();

    // nested in its container, readonly, three variants
    assert!(payload.code.contains("partial class Messages"));
    assert!(payload.code.contains("switch (_tag)"));
    assert!(payload.code.contains("case Tags.Position:"));

    // the registered operator drives the comparison
    assert!(payload
        .code
        .contains("return a._position == b._position;"));

    // widest variant is the two-float struct
    assert!(payload.code.contains("// PAYLOAD: 8 byte(s) + byte tag"));
}

#[test]
fn declarations_without_union_shape_are_reported_not_failed() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let reports = report(&manifest);
    assert_eq!(reports.len(), 3);

    match &reports[2].status {
        DeclarationStatus::Skipped { reason } => assert_eq!(reason, "not a value type"),
        other => panic!("expected skip, got {:?}", other),
    }

    // and generation still succeeds for the rest
    let files = generate(&manifest);
    assert!(files.iter().any(|f| f.path.contains("IntOrLabel")));
    assert!(!files.iter().any(|f| f.path.contains("NotGenerated")));
}

#[test]
fn generated_tree_round_trips_through_disk() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let files = generate(&manifest);

    let dir = tempfile::tempdir().unwrap();
    for file in &files {
        let path = dir.path().join(&file.path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, &file.code).unwrap();
    }

    for file in &files {
        let written = fs::read_to_string(dir.path().join(&file.path)).unwrap();
        assert_eq!(written, file.code);
    }

    // support sources land next to the unions
    assert!(dir.path().join("unions/IUnion.cs").exists());
    assert!(dir.path().join("unions/InvalidAccessException.cs").exists());
    assert!(dir.path().join("unions/TypeDisplay.cs").exists());
}

#[test]
fn default_output_is_reproducible() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let first = generate(&manifest);
    let second = generate(&manifest);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.code, b.code);
    }
}

#[test]
fn provenance_can_be_disabled() {
    let manifest = Manifest::from_yaml(SCENARIO).unwrap();
    let options = GenerateOptions {
        provenance: false,
        support: false,
        ..GenerateOptions::default()
    };
    let files = generate_with(&manifest, &options);
    for file in &files {
        assert!(!file.code.contains("// GENERATED FROM:"));
        assert!(file.code.starts_with("using System;"));
    }
}

#[test]
fn empty_manifest_yields_only_support() {
    let manifest = Manifest::from_yaml("id: empty\ndeclarations: []").unwrap();
    let files = generate(&manifest);
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| !f.code.is_empty()));
}
