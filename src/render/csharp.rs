//! C# union synthesis using genco
//!
//! One emitter for all access policies; the policy value selects the body
//! of the accessors and outward conversions, never a different emitter.
//! Member order is fixed so output is reproducible. Declaration order is
//! authoritative for every emitted list: tag values, constructor order,
//! and dispatch-case order all follow the variant tuple.

use genco::prelude::*;

use crate::descriptor::{AccessPolicy, FieldDescriptor, UnionDescriptor};
use crate::equality::EqualityKind;
use crate::types::{TypeInfo, TypeKind};

use super::RenderConfig;

/// Per-field checks switch from sequential conditionals to a tag `switch`
/// at this variant count. The two shapes are observably identical.
const SWITCH_MIN_CASES: usize = 3;

const TAGS_NAME: &str = "Tags";
const TAG_PROP: &str = "Tag";
const TAG_FIELD: &str = "_tag";

/// Render a union descriptor to C# source text
pub(super) fn render(descriptor: &UnionDescriptor, config: &RenderConfig) -> String {
    let tokens = UnionRenderer { descriptor, config }.render();
    tokens.to_file_string().unwrap_or_default()
}

struct UnionRenderer<'a> {
    descriptor: &'a UnionDescriptor,
    config: &'a RenderConfig,
}

impl<'a> UnionRenderer<'a> {
    fn render(&self) -> csharp::Tokens {
        let d = self.descriptor;

        let body = self.render_struct();
        let unit = if d.namespace.is_empty() {
            body
        } else {
            quote! {
                namespace $(&d.namespace)
                {
                    $body
                }
            }
        };

        let mut tokens = csharp::Tokens::new();
        if self.config.provenance {
            self.append_header(&mut tokens);
        }
        tokens.append(quote! {
            using System;
            using System.Runtime.InteropServices;
            using $(&self.config.support_namespace);
        });
        tokens.line();
        tokens.append(unit);
        tokens.push();
        tokens
    }

    fn append_header(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let payload = format!(
            "// PAYLOAD: {} byte(s) + {} tag",
            d.payload_size,
            d.tag_width.keyword()
        );
        out.append(quote!($(format!("// GENERATED FROM: {}", self.config.manifest_id))));
        out.push();
        out.append(quote!($(format!("// MANIFEST HASH: {}", self.config.manifest_hash))));
        out.push();
        out.append(quote!($payload));
        out.push();
        if self.config.timestamp {
            let stamp = format!("// GENERATED: {}", chrono::Utc::now().to_rfc3339());
            out.append(quote!($stamp));
            out.push();
        }
        out.append(quote!($("// DO NOT EDIT - regenerate from manifest")));
        out.push();
        out.line();
    }

    fn render_struct(&self) -> csharp::Tokens {
        let d = self.descriptor;

        let mut members = csharp::Tokens::new();
        self.append_tag_enum(&mut members);
        self.append_storage(&mut members);
        self.append_accessors(&mut members);
        self.append_constructors(&mut members);
        self.append_tag_constructor(&mut members);
        self.append_set(&mut members);
        self.append_try_get(&mut members);
        self.append_get_underlying_type(&mut members);
        self.append_get_hash_code(&mut members);
        self.append_equality(&mut members);
        self.append_to_string(&mut members);
        self.append_conversions(&mut members);

        let header = format!("partial struct {} : IUnion, IEquatable<{}>", d.name, d.name);
        let body = quote! {
            [StructLayout(LayoutKind.Explicit, Pack = 1)]
            $header
            {
                $members
            }
        };
        self.wrap_containers(body)
    }

    fn wrap_containers(&self, inner: csharp::Tokens) -> csharp::Tokens {
        let mut current = inner;
        for container in self.descriptor.containers.iter().rev() {
            let keyword = match container.kind {
                TypeKind::Class | TypeKind::Struct | TypeKind::Interface => {
                    container.kind.keyword()
                }
                TypeKind::Enum => continue,
            };
            let header = format!("partial {} {}", keyword, container.name);
            current = quote! {
                $header
                {
                    $current
                }
            };
        }
        current
    }

    // Storage access goes through the private backing slots whenever they
    // exist; only readonly unions under the unchecked policy read and
    // write the public fields directly.

    fn tag_slot(&self) -> &'static str {
        if self.descriptor.has_backing_fields() {
            TAG_FIELD
        } else {
            TAG_PROP
        }
    }

    fn slot(&self, field: &FieldDescriptor) -> String {
        if self.descriptor.has_backing_fields() {
            field.backing_name()
        } else {
            field.name.clone()
        }
    }

    fn tag_of(&self, field: &FieldDescriptor) -> String {
        format!("{}.{}", TAGS_NAME, field.name)
    }

    fn ty_text<'t>(&self, ty: &'t TypeInfo) -> &'t str {
        &ty.full_name
    }

    fn append_tag_enum(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let header = format!("public enum {} : {}", TAGS_NAME, d.tag_width.keyword());
        let mut items = csharp::Tokens::new();
        for field in &d.fields {
            items.append(quote!($(&field.name),));
            items.push();
        }
        out.append(quote! {
            $header
            {
                $items
            }
        });
        out.push();
    }

    fn append_storage(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        if d.has_backing_fields() {
            let readonly = if d.is_readonly { "readonly " } else { "" };
            let tag_field = format!("private {}{} {};", readonly, TAGS_NAME, TAG_FIELD);
            let tag_prop = format!("public {} {} => {};", TAGS_NAME, TAG_PROP, TAG_FIELD);
            out.line();
            out.append(quote! {
                [FieldOffset(0)]
                $tag_field
                $['\n']
                $tag_prop
            });
            out.push();
            for field in &d.fields {
                let slot = format!(
                    "private {}{} {};",
                    readonly,
                    self.ty_text(&field.ty),
                    field.backing_name()
                );
                out.line();
                out.append(quote! {
                    [FieldOffset(1)]
                    $slot
                });
                out.push();
            }
        } else {
            let tag_field = format!("public readonly {} {};", TAGS_NAME, TAG_PROP);
            out.line();
            out.append(quote! {
                [FieldOffset(0)]
                $tag_field
            });
            out.push();
            for field in &d.fields {
                let slot = format!(
                    "public readonly {} {};",
                    self.ty_text(&field.ty),
                    field.name
                );
                out.line();
                out.append(quote! {
                    [FieldOffset(1)]
                    $slot
                });
                out.push();
            }
        }
    }

    fn append_accessors(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        if !d.has_backing_fields() {
            // the public fields are the accessors
            return;
        }
        match d.access {
            AccessPolicy::Allow => {
                for field in &d.fields {
                    let accessor = format!(
                        "public {} {} => {};",
                        self.ty_text(&field.ty),
                        field.name,
                        field.backing_name()
                    );
                    out.line();
                    out.append(quote!($accessor));
                    out.push();
                }
            }
            AccessPolicy::ReturnDefault => {
                for field in &d.fields {
                    let header = format!("public {} {}", self.ty_text(&field.ty), field.name);
                    let check = format!("if ({} == {})", TAG_FIELD, self.tag_of(field));
                    let matched = format!("return {};", field.backing_name());
                    out.line();
                    out.append(quote! {
                        $header
                        {
                            get
                            {
                                $check
                                    $matched
                                $['\n']
                                return default;
                            }
                        }
                    });
                    out.push();
                }
            }
            AccessPolicy::Throw | AccessPolicy::ThrowDebugOnly => {
                let debug_only = d.access == AccessPolicy::ThrowDebugOnly;
                for field in &d.fields {
                    let header = format!("public {} {}", self.ty_text(&field.ty), field.name);
                    let guard = self.throw_guard("", field, debug_only, false);
                    let matched = format!("return {};", field.backing_name());
                    out.line();
                    out.append(quote! {
                        $header
                        {
                            get
                            {
                                $guard
                                $matched
                            }
                        }
                    });
                    out.push();
                }
            }
        }
    }

    /// The discriminant check and invalid-access raise shared by checked
    /// accessors and outward conversions. `receiver` is empty for instance
    /// members and `"value."` inside conversion operators.
    fn throw_guard(
        &self,
        receiver: &str,
        field: &FieldDescriptor,
        debug_only: bool,
        implicitly: bool,
    ) -> csharp::Tokens {
        let verb = if implicitly {
            "implicitly convert"
        } else {
            "convert"
        };
        let check = format!("if ({}{} != {})", receiver, TAG_FIELD, self.tag_of(field));
        let name_of = format!(
            "var typeName = {}GetUnderlyingType().GetDisplayName();",
            receiver
        );
        let raise = format!(
            "throw new InvalidAccessException($\"Cannot {} underlying type '{{typeName}}' to '{}'\");",
            verb,
            self.ty_text(&field.ty)
        );

        let mut tokens = csharp::Tokens::new();
        if debug_only {
            tokens.append(quote!($("#if DEBUG")));
            tokens.push();
        }
        tokens.append(quote! {
            $check
            {
                $name_of
                $raise
            }
        });
        tokens.push();
        if debug_only {
            tokens.append(quote!($("#endif")));
            tokens.push();
        }
        tokens
    }

    fn append_constructors(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        for (index, field) in d.fields.iter().enumerate() {
            self.append_constructor(out, index, field, &field.ty, false);
            self.append_constructor(out, index, field, &field.ty, true);
            if let Some(underlying) = &field.nullable_underlying {
                self.append_constructor(out, index, field, underlying, false);
                self.append_constructor(out, index, field, underlying, true);
            }
        }
    }

    fn append_constructor(
        &self,
        out: &mut csharp::Tokens,
        index: usize,
        field: &FieldDescriptor,
        ty: &TypeInfo,
        by_ref: bool,
    ) {
        let d = self.descriptor;
        let modifier = if by_ref { "in " } else { "" };
        let header = format!("public {}({}{} value)", d.name, modifier, self.ty_text(ty));
        let set_tag = format!("{} = {};", self.tag_slot(), self.tag_of(field));
        let set_active = format!("{} = value;", self.slot(field));

        let mut body = csharp::Tokens::new();
        body.append(quote!($set_tag));
        body.push();
        for (k, other) in d.fields.iter().enumerate() {
            if k == index {
                continue;
            }
            let clear = format!("{} = default;", self.slot(other));
            body.append(quote!($clear));
            body.push();
        }
        body.line();
        body.append(quote!($set_active));

        out.line();
        out.append(quote! {
            $header
            {
                $body
            }
        });
        out.push();
    }

    fn append_tag_constructor(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let header = format!("public {}({} tag)", d.name, TAGS_NAME);
        let set_tag = format!("{} = tag;", self.tag_slot());

        let mut body = csharp::Tokens::new();
        body.append(quote!($set_tag));
        body.push();
        for field in &d.fields {
            let clear = format!("{} = default;", self.slot(field));
            body.append(quote!($clear));
            body.push();
        }

        out.line();
        out.append(quote! {
            $header
            {
                $body
            }
        });
        out.push();
    }

    fn append_set(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        if d.is_readonly {
            return;
        }
        for field in &d.fields {
            let header = format!("public void Set({} value)", self.ty_text(&field.ty));
            let set_tag = format!("{} = {};", TAG_FIELD, self.tag_of(field));
            let set_slot = format!("{} = value;", field.backing_name());
            out.line();
            out.append(quote! {
                $header
                {
                    $set_tag
                    $set_slot
                }
            });
            out.push();
        }
    }

    fn append_try_get(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        for field in &d.fields {
            let header = format!("public bool TryGet(out {} value)", self.ty_text(&field.ty));
            let check = format!("if ({} != {})", self.tag_slot(), self.tag_of(field));
            let yielded = format!("value = {};", self.slot(field));
            out.line();
            out.append(quote! {
                $header
                {
                    $check
                    {
                        value = default;
                        return false;
                    }
                    $['\n']
                    $yielded
                    return true;
                }
            });
            out.push();
        }
    }

    fn append_get_underlying_type(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let mut body = csharp::Tokens::new();
        if d.fields.len() < SWITCH_MIN_CASES {
            for field in &d.fields {
                let check = format!("if ({} == {})", self.tag_slot(), self.tag_of(field));
                let matched = format!("return {}.GetType();", self.slot(field));
                body.append(quote! {
                    $check
                        $matched
                });
                body.push();
                body.line();
            }
            body.append(quote!(return GetType();));
        } else {
            let dispatch = format!("switch ({})", self.tag_slot());
            let mut cases = csharp::Tokens::new();
            for field in &d.fields {
                let case =
                    format!("case {}: return {}.GetType();", self.tag_of(field), self.slot(field));
                cases.append(quote!($case));
                cases.push();
            }
            body.append(quote! {
                $dispatch
                {
                    $cases
                }
                $['\n']
                return GetType();
            });
        }
        out.line();
        out.append(quote! {
            public Type GetUnderlyingType()
            {
                $body
            }
        });
        out.push();
    }

    fn append_get_hash_code(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let seed = format!("hash.Add({});", self.tag_slot());

        let mut body = csharp::Tokens::new();
        if d.fields.len() < SWITCH_MIN_CASES {
            for field in &d.fields {
                let check = format!("if ({} == {})", self.tag_slot(), self.tag_of(field));
                let fold = format!("hash.Add({});", self.slot(field));
                body.append(quote! {
                    $check
                        $fold
                });
                body.push();
                body.line();
            }
        } else {
            let dispatch = format!("switch ({})", self.tag_slot());
            let mut cases = csharp::Tokens::new();
            for field in &d.fields {
                let case = format!(
                    "case {}: hash.Add({}); break;",
                    self.tag_of(field),
                    self.slot(field)
                );
                cases.append(quote!($case));
                cases.push();
            }
            body.append(quote! {
                $dispatch
                {
                    $cases
                }
            });
            body.push();
            body.line();
        }

        out.line();
        out.append(quote! {
            public override int GetHashCode()
            {
                var hash = new HashCode();
                $seed
                $['\n']
                $body
                return hash.ToHashCode();
            }
        });
        out.push();
    }

    fn append_equality(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let name = &d.name;

        let object_arm = format!("=> obj is {} other && Equals(this, other);", name);
        out.line();
        out.append(quote! {
            public override bool Equals(object obj)
                $object_arm
        });
        out.push();

        self.append_equals_pair(out, false);
        self.append_equals_pair(out, true);

        let eq_header = format!(
            "public static bool operator ==(in {} left, in {} right)",
            name, name
        );
        let ne_header = format!(
            "public static bool operator !=(in {} left, in {} right)",
            name, name
        );
        out.line();
        out.append(quote! {
            $eq_header
                $("=> Equals(in left, in right);")
            $['\n']
            $ne_header
                $("=> !Equals(in left, in right);")
        });
        out.push();
    }

    fn append_equals_pair(&self, out: &mut csharp::Tokens, by_ref: bool) {
        let d = self.descriptor;
        let name = &d.name;
        let modifier = if by_ref { "in " } else { "" };

        let instance_header = format!("public bool Equals({}{} other)", modifier, name);
        let instance_arm = format!("=> Equals({}this, {}other);", modifier, modifier);
        out.line();
        out.append(quote! {
            $instance_header
                $instance_arm
        });
        out.push();

        let tag_check = format!("if (a.{} != b.{})", self.tag_slot(), self.tag_slot());
        let mut body = csharp::Tokens::new();
        body.append(quote! {
            $tag_check
                return false;
        });
        body.push();
        body.line();
        if d.fields.len() < SWITCH_MIN_CASES {
            for field in &d.fields {
                let check = format!("if (a.{} == {})", self.tag_slot(), self.tag_of(field));
                let compare = format!("return {};", self.field_comparison(field));
                body.append(quote! {
                    $check
                        $compare
                });
                body.push();
                body.line();
            }
            body.append(quote!(return false;));
        } else {
            let dispatch = format!("switch (a.{})", self.tag_slot());
            let mut cases = csharp::Tokens::new();
            for field in &d.fields {
                let case = format!("case {}:", self.tag_of(field));
                let compare = format!("return {};", self.field_comparison(field));
                cases.append(quote! {
                    $case
                        $compare
                });
                cases.push();
            }
            body.append(quote! {
                $dispatch
                {
                    $cases
                }
                $['\n']
                return false;
            });
        }

        let static_header = format!(
            "public static bool Equals({}{} a, {}{} b)",
            modifier, name, modifier, name
        );
        out.line();
        out.append(quote! {
            $static_header
            {
                $body
            }
        });
        out.push();
    }

    /// The active-field comparison under the field's classified strategy.
    fn field_comparison(&self, field: &FieldDescriptor) -> String {
        let a = format!("a.{}", self.slot(field));
        let b = format!("b.{}", self.slot(field));
        match field.ty.equality {
            EqualityKind::OperatorEq => format!("{} == {}", a, b),
            EqualityKind::InstanceEquals => format!("{}.Equals({})", a, b),
            EqualityKind::StaticEquals => {
                format!("{}.Equals({}, {})", self.ty_text(&field.ty), a, b)
            }
            EqualityKind::DefaultComparer => format!(
                "System.Collections.Generic.EqualityComparer<{}>.Default.Equals({}, {})",
                self.ty_text(&field.ty),
                a,
                b
            ),
        }
    }

    fn append_to_string(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        let mut body = csharp::Tokens::new();
        if d.fields.len() < SWITCH_MIN_CASES {
            for field in &d.fields {
                let check = format!("if ({} == {})", self.tag_slot(), self.tag_of(field));
                let matched = format!("return {}.ToString();", self.slot(field));
                body.append(quote! {
                    $check
                        $matched
                });
                body.push();
                body.line();
            }
            body.append(quote!(return string.Empty;));
        } else {
            let dispatch = format!("switch ({})", self.tag_slot());
            let mut cases = csharp::Tokens::new();
            for field in &d.fields {
                let case = format!(
                    "case {}: return {}.ToString();",
                    self.tag_of(field),
                    self.slot(field)
                );
                cases.append(quote!($case));
                cases.push();
            }
            body.append(quote! {
                $dispatch
                {
                    $cases
                }
                $['\n']
                return string.Empty;
            });
        }
        out.line();
        out.append(quote! {
            public override string ToString()
            {
                $body
            }
        });
        out.push();
    }

    fn append_conversions(&self, out: &mut csharp::Tokens) {
        let d = self.descriptor;
        for field in &d.fields {
            // user-defined conversions to or from an interface are illegal
            if field.ty.is_interface() {
                continue;
            }
            self.append_conversion_into(out, field, &field.ty);
            self.append_conversion_out(out, field);
            if let Some(underlying) = &field.nullable_underlying {
                self.append_conversion_into(out, field, underlying);
            }
        }
    }

    fn append_conversion_into(
        &self,
        out: &mut csharp::Tokens,
        _field: &FieldDescriptor,
        ty: &TypeInfo,
    ) {
        let name = &self.descriptor.name;
        let header = format!(
            "public static implicit operator {}({} value)",
            name,
            self.ty_text(ty)
        );
        let arm = format!("=> new {}(value);", name);
        out.line();
        out.append(quote! {
            $header
                $arm
        });
        out.push();
    }

    fn append_conversion_out(&self, out: &mut csharp::Tokens, field: &FieldDescriptor) {
        let d = self.descriptor;
        let ty = self.ty_text(&field.ty);
        let header = format!("public static implicit operator {}({} value)", ty, d.name);
        let yielded = format!("return value.{};", self.slot(field));

        out.line();
        match d.access {
            AccessPolicy::Allow => {
                let arm = format!("=> value.{};", self.slot(field));
                out.append(quote! {
                    $header
                        $arm
                });
            }
            AccessPolicy::ReturnDefault => {
                let check = format!(
                    "if (value.{} == {})",
                    self.tag_slot(),
                    self.tag_of(field)
                );
                let matched = format!("return value.{};", self.slot(field));
                out.append(quote! {
                    $header
                    {
                        $check
                            $matched
                        $['\n']
                        return default;
                    }
                });
            }
            AccessPolicy::Throw | AccessPolicy::ThrowDebugOnly => {
                let debug_only = d.access == AccessPolicy::ThrowDebugOnly;
                let guard = self.throw_guard("value.", field, debug_only, true);
                out.append(quote! {
                    $header
                    {
                        $guard
                        $yielded
                    }
                });
            }
        }
        out.push();
    }
}
