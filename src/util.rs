//! Shared utility functions
//!
//! Casing helpers for emitted C# identifiers.

/// Convert snake_case to PascalCase
///
/// # Examples
/// ```
/// use uniongen::util::to_pascal_case;
/// assert_eq!(to_pascal_case("label_text"), "LabelText");
/// assert_eq!(to_pascal_case("Count"), "Count");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Convert snake_case or PascalCase to camelCase
///
/// # Examples
/// ```
/// use uniongen::util::to_camel_case;
/// assert_eq!(to_camel_case("label_text"), "labelText");
/// assert_eq!(to_camel_case("Count"), "count");
/// ```
pub fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
