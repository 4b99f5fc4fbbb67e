//! Runtime support sources
//!
//! The generated unions reference a small hand-shaped support layer: a
//! marker interface, the invalid-access failure kind, and a display-name
//! helper for runtime type objects. Emitting it alongside the unions keeps
//! the output self-contained.

use genco::prelude::*;

use super::{GeneratedFile, RenderConfig};

/// Built-ins with a C# keyword spelling; everything else displays its full
/// CLR name.
const KEYWORD_TYPES: &[&str] = &[
    "object", "bool", "byte", "sbyte", "short", "ushort", "int", "uint", "long", "ulong", "float",
    "double", "char", "string", "decimal",
];

pub(super) fn render(config: &RenderConfig) -> Vec<GeneratedFile> {
    vec![
        file("IUnion.cs", render_marker_interface(config)),
        file("InvalidAccessException.cs", render_exception(config)),
        file("TypeDisplay.cs", render_type_display(config)),
    ]
}

fn file(name: &str, tokens: csharp::Tokens) -> GeneratedFile {
    GeneratedFile {
        path: format!("unions/{}", name),
        code: tokens.to_file_string().unwrap_or_default(),
        generator: "uniongen",
    }
}

fn render_marker_interface(config: &RenderConfig) -> csharp::Tokens {
    quote! {
        $(format!("namespace {}", config.support_namespace))
        {
            public interface IUnion
            {
            }
        }
    }
}

fn render_exception(config: &RenderConfig) -> csharp::Tokens {
    quote! {
        using System;
        $['\n']
        $(format!("namespace {}", config.support_namespace))
        {
            public class InvalidAccessException : InvalidCastException
            {
                public InvalidAccessException()
                    $(": base()")
                {
                }
                $['\n']
                public InvalidAccessException(string message)
                    $(": base(message)")
                {
                }
                $['\n']
                public InvalidAccessException(string message, Exception innerException)
                    $(": base(message, innerException)")
                {
                }
            }
        }
    }
}

fn render_type_display(config: &RenderConfig) -> csharp::Tokens {
    let mut entries = csharp::Tokens::new();
    for name in KEYWORD_TYPES {
        entries.append(quote!($(format!("{{ typeof({}), \"{}\" }},", name, name))));
        entries.push();
    }

    quote! {
        using System;
        using System.Collections.Generic;
        $['\n']
        $(format!("namespace {}", config.support_namespace))
        {
            public static class TypeDisplay
            {
                private static readonly Dictionary<Type, string> s_names = new Dictionary<Type, string>
                {
                    $entries
                };
                $['\n']
                $("public static string GetDisplayName(this Type self)")
                {
                    $("if (s_names.TryGetValue(self, out var name))")
                        $("return name;")
                    $['\n']
                    $("return self.FullName;")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_files() {
        let files = render(&RenderConfig::default());
        assert_eq!(files.len(), 3);

        let marker = &files[0];
        assert_eq!(marker.path, "unions/IUnion.cs");
        assert!(marker.code.contains("public interface IUnion"));
        assert!(marker.code.contains("namespace Unions"));

        let exception = &files[1];
        assert!(exception
            .code
            .contains("public class InvalidAccessException : InvalidCastException"));

        let display = &files[2];
        assert!(display.code.contains("public static string GetDisplayName(this Type self)"));
        assert!(display.code.contains("{ typeof(int), \"int\" },"));
        assert!(display.code.contains("return self.FullName;"));
    }

    #[test]
    fn test_support_respects_namespace() {
        let config = RenderConfig {
            support_namespace: "Example.Runtime".into(),
            ..RenderConfig::default()
        };
        let files = render(&config);
        for generated in &files {
            assert!(generated.code.contains("namespace Example.Runtime"));
        }
    }
}
