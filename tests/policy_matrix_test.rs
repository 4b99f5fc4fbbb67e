//! Access-policy matrix over the emitted source
//!
//! The four policies change the accessor surface and the narrowing
//! conversions; everything else must stay identical. These tests pin the
//! shape each policy produces.

use rstest::rstest;
use uniongen::{generate_with, GenerateOptions, Manifest};

fn render_union(policy: &str, readonly: bool) -> String {
    let yaml = format!(
        r#"
id: matrix
namespace: Example.App
declarations:
  - name: Sample
    readonly: {readonly}
    union:
      variants:
        - name: Count
          type: int
        - name: Label
          type: string
      invalid_access: {policy}
"#
    );
    let manifest = Manifest::from_yaml(&yaml).unwrap();
    let options = GenerateOptions {
        provenance: false,
        support: false,
        ..GenerateOptions::default()
    };
    let files = generate_with(&manifest, &options);
    assert_eq!(files.len(), 1);
    files[0].code.clone()
}

#[rstest]
#[case::allow("allow")]
#[case::return_default("return-default")]
#[case::throw("throw")]
#[case::throw_debug("throw-debug-only")]
fn every_policy_shares_the_core_surface(#[case] policy: &str) {
    let code = render_union(policy, false);

    assert!(code.contains("[StructLayout(LayoutKind.Explicit, Pack = 1)]"));
    assert!(code.contains("public enum Tags : byte"));
    assert!(code.contains("[FieldOffset(0)]"));
    assert!(code.contains("[FieldOffset(1)]"));
    assert!(code.contains("public Sample(int value)"));
    assert!(code.contains("public Sample(in int value)"));
    assert!(code.contains("public Sample(Tags tag)"));
    assert!(code.contains("public bool TryGet(out int value)"));
    assert!(code.contains("public bool TryGet(out string value)"));
    assert!(code.contains("public Type GetUnderlyingType()"));
    assert!(code.contains("public override int GetHashCode()"));
    assert!(code.contains("public override string ToString()"));
    assert!(code.contains("public static bool Equals(Sample a, Sample b)"));
    assert!(code.contains("public static bool Equals(in Sample a, in Sample b)"));
    assert!(code.contains("public static bool operator ==(in Sample left, in Sample right)"));
    assert!(code.contains("public static bool operator !=(in Sample left, in Sample right)"));
    assert!(code.contains("public static implicit operator Sample(int value)"));
    assert!(code.contains("public static implicit operator int(Sample value)"));
}

#[rstest]
#[case::allow("allow", false)]
#[case::return_default("return-default", false)]
#[case::throw("throw", true)]
#[case::throw_debug("throw-debug-only", true)]
fn only_throwing_policies_raise(#[case] policy: &str, #[case] throws: bool) {
    let code = render_union(policy, false);
    assert_eq!(code.contains("throw new InvalidAccessException"), throws);
}

#[test]
fn allow_readonly_exposes_raw_slots() {
    let code = render_union("allow", true);

    // no private backing names, no checks: the overlapping slots are public
    assert!(code.contains("public readonly Tags Tag;"));
    assert!(code.contains("public readonly int Count;"));
    assert!(code.contains("public readonly string Label;"));
    assert!(!code.contains("_count"));
    assert!(!code.contains("_tag"));
    assert!(!code.contains("return default;"));
    assert!(!code.contains("throw new"));
    // readonly suppresses Set
    assert!(!code.contains("public void Set("));
}

#[test]
fn allow_mutable_keeps_unchecked_accessors() {
    let code = render_union("allow", false);

    assert!(code.contains("private Tags _tag;"));
    assert!(code.contains("public int Count => _count;"));
    assert!(code.contains("public void Set(int value)"));
    assert!(code.contains("public void Set(string value)"));
    // unchecked narrowing conversion
    assert!(code.contains("=> value._count;"));
}

#[test]
fn return_default_checks_and_defaults() {
    let code = render_union("return-default", false);

    assert!(code.contains("if (_tag == Tags.Count)"));
    assert!(code.contains("return default;"));
    assert!(code.contains("if (value._tag == Tags.Count)"));
    assert!(!code.contains("InvalidAccessException"));
}

#[test]
fn throw_carries_the_active_type_name() {
    let code = render_union("throw", false);

    assert!(code.contains("var typeName = GetUnderlyingType().GetDisplayName();"));
    assert!(code.contains("Cannot convert underlying type '{typeName}' to 'int'"));
    assert!(code.contains("var typeName = value.GetUnderlyingType().GetDisplayName();"));
    assert!(code.contains("Cannot implicitly convert underlying type '{typeName}' to 'string'"));
    // the check is unconditional
    assert!(!code.contains("#if DEBUG"));
}

#[test]
fn throw_debug_only_compiles_checks_out_of_release() {
    let code = render_union("throw-debug-only", false);

    assert!(code.contains("#if DEBUG"));
    assert!(code.contains("#endif"));
    assert!(code.contains("throw new InvalidAccessException"));

    // every guard is fenced: equal numbers of opens and closes,
    // one pair per accessor and one per narrowing conversion
    let opens = code.matches("#if DEBUG").count();
    let closes = code.matches("#endif").count();
    assert_eq!(opens, closes);
    assert_eq!(opens, 4);
}

#[test]
fn constructors_write_tag_and_slot_together() {
    let code = render_union("allow", false);

    // the Count constructor sets the tag, clears the other slot, then
    // writes its own
    assert!(code.contains("_tag = Tags.Count;"));
    assert!(code.contains("_label = default;"));
    assert!(code.contains("_count = value;"));
}

#[test]
fn try_get_matches_tag_then_yields() {
    let code = render_union("throw", false);

    // TryGet never throws, under any policy
    assert!(code.contains("if (_tag != Tags.Count)"));
    assert!(code.contains("value = _count;"));
    assert!(code.contains("return true;"));
    assert!(code.contains("value = default;"));
    assert!(code.contains("return false;"));
}

#[test]
fn equality_compares_active_field_only() {
    let code = render_union("allow", false);

    // discriminant mismatch short-circuits
    assert!(code.contains("if (a._tag != b._tag)"));
    // each arm compares its own slot under the classified strategy
    assert!(code.contains("if (a._tag == Tags.Count)"));
    assert!(code.contains("return a._count == b._count;"));
    assert!(code.contains("return a._label == b._label;"));
    // inactive slots are never cross-compared
    assert!(!code.contains("a._count == b._label"));
}

#[test]
fn hashing_folds_tag_then_active_field() {
    let code = render_union("allow", false);

    assert!(code.contains("var hash = new HashCode();"));
    assert!(code.contains("hash.Add(_tag);"));
    assert!(code.contains("hash.Add(_count);"));
    assert!(code.contains("hash.Add(_label);"));
    assert!(code.contains("return hash.ToHashCode();"));
}
