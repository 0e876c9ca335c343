//! Proto definition reconstruction module.
//!
//! [`ProtoRenderer`] turns a decoded `FileDescriptorProto` back into `.proto`
//! source. Output order is fixed (syntax, package, options, imports, enums,
//! messages, extensions, services) so the same descriptor always renders to
//! the same text.
//!
//! Every message or enum reference is shortened with
//! [`resolve_type_name`](crate::resolve::resolve_type_name) against the scope
//! it is written in. The renderer does not validate the tree: a field whose
//! `oneof_index` points past the declared oneofs is written as a plain field.

mod options;

use crate::error::Result;
use crate::resolve::{package_namespace, resolve_type_name};
use crate::MAX_FIELD_NUMBER;
use options::{escape_string, option_pairs, OptionPair};
use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use std::fmt::Write as FmtWrite;

/// Configuration for proto rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Render map entry fields as `map<K, V>` and hide the entry messages
    pub map_fields: bool,
    /// Emit `json_name` when it differs from the derived name
    pub json_names: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            map_fields: true,
            json_names: true,
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets whether map entries render as `map<K, V>`
    pub fn map_fields(mut self, enabled: bool) -> Self {
        self.map_fields = enabled;
        self
    }

    /// Sets whether non-default `json_name`s are emitted
    pub fn json_names(mut self, enabled: bool) -> Self {
        self.json_names = enabled;
        self
    }
}

/// Proto syntax dialect, as far as it changes rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoSyntax {
    /// Proto2 syntax (also used when the syntax field is unset)
    Proto2,
    /// Proto3 syntax
    Proto3,
}

impl ProtoSyntax {
    /// Returns the syntax declaration string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtoSyntax::Proto2 => "proto2",
            ProtoSyntax::Proto3 => "proto3",
        }
    }

    /// Classifies a declared syntax string; unknown values follow proto2 rules
    pub fn from_declared(syntax: &str) -> Self {
        match syntax {
            "proto3" => ProtoSyntax::Proto3,
            _ => ProtoSyntax::Proto2,
        }
    }
}

/// Renders `.proto` source from a FileDescriptorProto
#[derive(Debug, Clone)]
pub struct ProtoRenderer {
    proto: FileDescriptorProto,
    config: RenderConfig,
}

impl ProtoRenderer {
    /// Creates a new renderer by decoding raw descriptor bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(Self::new(FileDescriptorProto::decode(data)?))
    }

    /// Creates a new renderer for a decoded descriptor
    pub fn new(proto: FileDescriptorProto) -> Self {
        Self {
            proto,
            config: RenderConfig::default(),
        }
    }

    /// Replaces the render configuration
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the declared path of the descriptor
    pub fn path(&self) -> &str {
        self.proto.name()
    }

    /// Returns the dialect used for label rules
    pub fn syntax(&self) -> ProtoSyntax {
        ProtoSyntax::from_declared(self.proto.syntax())
    }

    /// Returns the underlying descriptor
    pub fn proto(&self) -> &FileDescriptorProto {
        &self.proto
    }

    /// Render the proto definition as a string
    pub fn render(&self) -> String {
        let mut output = String::new();
        self.write_to(&mut output).expect("String write cannot fail");
        output
    }

    /// Write the rendered proto to a writer
    pub fn write_to(&self, w: &mut impl FmtWrite) -> std::fmt::Result {
        IdlWriter::new(w, &self.config, self.syntax()).write_file(&self.proto)
    }
}

/// Indentation-tracking `.proto` emitter
struct IdlWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
    syntax: ProtoSyntax,
    indent_level: usize,
}

impl<'a, W: FmtWrite> IdlWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a RenderConfig, syntax: ProtoSyntax) -> Self {
        Self {
            writer,
            config,
            syntax,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn write_options(&mut self, options: &[OptionPair]) -> std::fmt::Result {
        for (name, value) in options {
            self.writeln(&format!("option {} = {};", name, value))?;
        }
        Ok(())
    }

    fn write_file(&mut self, proto: &FileDescriptorProto) -> std::fmt::Result {
        let syntax = match proto.syntax() {
            "" => self.syntax.as_str(),
            declared => declared,
        };
        writeln!(self.writer, "syntax = \"{}\";", syntax)?;
        writeln!(self.writer)?;

        if !proto.package().is_empty() {
            writeln!(self.writer, "package {};", proto.package())?;
            writeln!(self.writer)?;
        }

        if let Some(opts) = &proto.options {
            let options = option_pairs(opts, &[]);
            if !options.is_empty() {
                self.write_options(&options)?;
                writeln!(self.writer)?;
            }
        }

        self.write_imports(proto)?;

        let namespace = package_namespace(proto.package());

        for enum_type in &proto.enum_type {
            self.write_enum(enum_type)?;
        }

        for message in &proto.message_type {
            self.write_message(message, &namespace)?;
        }

        for extension in &proto.extension {
            self.write_extension(extension, &namespace)?;
        }

        for service in &proto.service {
            self.write_service(service, &namespace)?;
        }

        Ok(())
    }

    fn write_imports(&mut self, proto: &FileDescriptorProto) -> std::fmt::Result {
        if proto.dependency.is_empty() {
            return Ok(());
        }

        for (i, dep) in proto.dependency.iter().enumerate() {
            let index = i as i32;
            let modifier = if proto.public_dependency.contains(&index) {
                "public "
            } else if proto.weak_dependency.contains(&index) {
                "weak "
            } else {
                ""
            };
            writeln!(self.writer, "import {}\"{}\";", modifier, dep)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn write_enum(&mut self, enum_type: &EnumDescriptorProto) -> std::fmt::Result {
        self.writeln(&format!("enum {} {{", enum_type.name()))?;
        self.indent();

        if let Some(opts) = &enum_type.options {
            self.write_options(&option_pairs(opts, &[]))?;
        }

        // Enum reserved ranges are inclusive
        if !enum_type.reserved_range.is_empty() {
            let ranges: Vec<String> = enum_type
                .reserved_range
                .iter()
                .map(|range| {
                    if range.start() == range.end() {
                        range.start().to_string()
                    } else {
                        format!("{} to {}", range.start(), range.end())
                    }
                })
                .collect();
            self.writeln(&format!("reserved {};", ranges.join(", ")))?;
        }

        if !enum_type.reserved_name.is_empty() {
            self.writeln(&format!("reserved {};", quoted_list(&enum_type.reserved_name)))?;
        }

        for value in &enum_type.value {
            let deprecated = value
                .options
                .as_ref()
                .and_then(|o| o.deprecated)
                .unwrap_or(false);
            self.writeln(&format!(
                "{} = {}{};",
                value.name(),
                value.number(),
                if deprecated { " [deprecated = true]" } else { "" }
            ))?;
        }

        self.dedent();
        self.writeln("}")?;
        writeln!(self.writer)
    }

    fn write_message(&mut self, message: &DescriptorProto, namespace: &[&str]) -> std::fmt::Result {
        self.writeln(&format!("message {} {{", message.name()))?;
        self.indent();

        if let Some(opts) = &message.options {
            self.write_options(&option_pairs(opts, &["map_entry"]))?;
        }

        for enum_type in &message.enum_type {
            self.write_enum(enum_type)?;
        }

        let mut scope = namespace.to_vec();
        scope.push(message.name());

        for nested in &message.nested_type {
            if self.config.map_fields && is_map_entry(nested) {
                continue;
            }
            self.write_message(nested, &scope)?;
        }

        for extension in &message.extension {
            self.write_extension(extension, &scope)?;
        }

        self.write_fields(message, namespace)?;
        self.write_ranges(message)?;

        self.dedent();
        self.writeln("}")?;
        writeln!(self.writer)
    }

    /// Writes real oneofs in declaration order, then every other field
    fn write_fields(&mut self, message: &DescriptorProto, namespace: &[&str]) -> std::fmt::Result {
        let mut groups: Vec<Vec<&FieldDescriptorProto>> = vec![Vec::new(); message.oneof_decl.len()];
        let mut plain = Vec::new();

        for field in &message.field {
            match real_oneof(field, message) {
                Some(index) => groups[index].push(field),
                None => plain.push(field),
            }
        }

        for (oneof, fields) in message.oneof_decl.iter().zip(&groups) {
            if fields.is_empty() {
                continue;
            }
            self.writeln(&format!("oneof {} {{", oneof.name()))?;
            self.indent();
            for field in fields {
                self.write_field(field, Some(message), namespace, message.name(), false)?;
            }
            self.dedent();
            self.writeln("}")?;
        }

        for field in plain {
            self.write_field(field, Some(message), namespace, message.name(), true)?;
        }

        Ok(())
    }

    fn write_ranges(&mut self, message: &DescriptorProto) -> std::fmt::Result {
        if !message.reserved_range.is_empty() {
            let ranges: Vec<String> = message
                .reserved_range
                .iter()
                .map(|range| format_range(range.start(), range.end()))
                .collect();
            self.writeln(&format!("reserved {};", ranges.join(", ")))?;
        }

        if !message.reserved_name.is_empty() {
            self.writeln(&format!("reserved {};", quoted_list(&message.reserved_name)))?;
        }

        if !message.extension_range.is_empty() {
            let ranges: Vec<String> = message
                .extension_range
                .iter()
                .map(|range| format_range(range.start(), range.end()))
                .collect();
            self.writeln(&format!("extensions {};", ranges.join(", ")))?;
        }

        Ok(())
    }

    /// Writes one field line.
    ///
    /// `message` is the containing message, used to recognise map entries;
    /// extensions have none. Oneof members are written without a label.
    fn write_field(
        &mut self,
        field: &FieldDescriptorProto,
        message: Option<&DescriptorProto>,
        namespace: &[&str],
        enclosing: &str,
        labelled: bool,
    ) -> std::fmt::Result {
        let map_entry = message
            .filter(|_| self.config.map_fields)
            .and_then(|message| map_entry_for(field, message));

        let mut line = String::new();
        match map_entry {
            Some(entry) => {
                let key = entry.field.iter().find(|f| f.number() == 1);
                let value = entry.field.iter().find(|f| f.number() == 2);
                match (key, value) {
                    (Some(key), Some(value)) => line.push_str(&format!(
                        "map<{}, {}>",
                        field_type_name(key, namespace, enclosing),
                        field_type_name(value, namespace, enclosing)
                    )),
                    _ => {
                        line.push_str("repeated ");
                        line.push_str(&field_type_name(field, namespace, enclosing));
                    }
                }
            }
            None => {
                if labelled {
                    if let Some(label) = self.field_label(field) {
                        line.push_str(label);
                        line.push(' ');
                    }
                }
                line.push_str(&field_type_name(field, namespace, enclosing));
            }
        }

        line.push_str(&format!(" {} = {}", field.name(), field.number()));

        let options = self.field_options(field);
        if !options.is_empty() {
            line.push_str(&format!(" [{}]", options.join(", ")));
        }
        line.push(';');

        self.writeln(&line)
    }

    fn field_label(&self, field: &FieldDescriptorProto) -> Option<&'static str> {
        match field.label() {
            Label::Repeated => Some("repeated"),
            Label::Required => Some("required"),
            Label::Optional => match self.syntax {
                ProtoSyntax::Proto2 => Some("optional"),
                ProtoSyntax::Proto3 if field.proto3_optional() => Some("optional"),
                ProtoSyntax::Proto3 => None,
            },
        }
    }

    fn field_options(&self, field: &FieldDescriptorProto) -> Vec<String> {
        let mut options = Vec::new();

        if let Some(default) = &field.default_value {
            let formatted = match field.r#type() {
                Type::String => format!("\"{}\"", escape_string(default)),
                // Stored already C-escaped
                Type::Bytes => format!("\"{}\"", default),
                _ => default.clone(),
            };
            options.push(format!("default = {}", formatted));
        }

        if let Some(opts) = &field.options {
            if let Some(packed) = opts.packed {
                options.push(format!("packed = {}", packed));
            }
            if opts.deprecated == Some(true) {
                options.push("deprecated = true".to_string());
            }
        }

        if self.config.json_names {
            if let Some(json_name) = &field.json_name {
                if json_name != &to_lower_camel_case(field.name()) {
                    options.push(format!("json_name = \"{}\"", escape_string(json_name)));
                }
            }
        }

        options
    }

    fn write_extension(
        &mut self,
        extension: &FieldDescriptorProto,
        namespace: &[&str],
    ) -> std::fmt::Result {
        let extendee = resolve_type_name(extension.extendee(), namespace, "");
        self.writeln(&format!("extend {} {{", extendee))?;
        self.indent();
        self.write_field(extension, None, namespace, "", true)?;
        self.dedent();
        self.writeln("}")?;
        writeln!(self.writer)
    }

    fn write_service(
        &mut self,
        service: &ServiceDescriptorProto,
        namespace: &[&str],
    ) -> std::fmt::Result {
        self.writeln(&format!("service {} {{", service.name()))?;
        self.indent();

        if let Some(opts) = &service.options {
            self.write_options(&option_pairs(opts, &[]))?;
        }

        for method in &service.method {
            self.write_method(method, namespace)?;
        }

        self.dedent();
        self.writeln("}")?;
        writeln!(self.writer)
    }

    fn write_method(&mut self, method: &MethodDescriptorProto, namespace: &[&str]) -> std::fmt::Result {
        let stream = |flag: Option<bool>| if flag.unwrap_or(false) { "stream " } else { "" };
        let signature = format!(
            "rpc {}({}{}) returns ({}{})",
            method.name(),
            stream(method.client_streaming),
            resolve_type_name(method.input_type(), namespace, ""),
            stream(method.server_streaming),
            resolve_type_name(method.output_type(), namespace, ""),
        );

        let options = method
            .options
            .as_ref()
            .map(|opts| option_pairs(opts, &[]))
            .unwrap_or_default();

        if options.is_empty() {
            return self.writeln(&format!("{};", signature));
        }

        self.writeln(&format!("{} {{", signature))?;
        self.indent();
        self.write_options(&options)?;
        self.dedent();
        self.writeln("}")
    }
}

/// Type keyword for scalars, resolved reference for messages, enums and groups
fn field_type_name(field: &FieldDescriptorProto, namespace: &[&str], enclosing: &str) -> String {
    let keyword = match field.r#type() {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Fixed64 => "fixed64",
        Type::Fixed32 => "fixed32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Uint32 => "uint32",
        Type::Sfixed32 => "sfixed32",
        Type::Sfixed64 => "sfixed64",
        Type::Sint32 => "sint32",
        Type::Sint64 => "sint64",
        Type::Message | Type::Enum | Type::Group => {
            return resolve_type_name(field.type_name(), namespace, enclosing)
        }
    };
    keyword.to_string()
}

/// Index of the real (non-synthetic) oneof `field` belongs to
fn real_oneof(field: &FieldDescriptorProto, message: &DescriptorProto) -> Option<usize> {
    let index = usize::try_from(field.oneof_index?).ok()?;
    if index >= message.oneof_decl.len() {
        return None;
    }

    // A proto3 `optional` field sits alone in a synthetic oneof
    let synthetic = message
        .field
        .iter()
        .filter(|f| f.oneof_index == field.oneof_index)
        .all(|f| f.proto3_optional());
    (!synthetic).then_some(index)
}

fn is_map_entry(message: &DescriptorProto) -> bool {
    message
        .options
        .as_ref()
        .and_then(|o| o.map_entry)
        .unwrap_or(false)
}

/// The nested map entry message a repeated message field refers to
fn map_entry_for<'m>(
    field: &FieldDescriptorProto,
    message: &'m DescriptorProto,
) -> Option<&'m DescriptorProto> {
    if field.label() != Label::Repeated || field.r#type() != Type::Message {
        return None;
    }

    let simple_name = field.type_name().rsplit('.').next()?;
    message
        .nested_type
        .iter()
        .find(|nested| nested.name() == simple_name && is_map_entry(nested))
}

/// Formats a half-open range, collapsing singletons
///
/// Bounds come straight from decoded bytes, so the inclusive end is
/// computed in `i64` to stay defined for `end == i32::MIN`.
fn format_range(start: i32, end: i32) -> String {
    let last = i64::from(end) - 1;
    if i64::from(start) == last {
        start.to_string()
    } else if i64::from(end) == i64::from(MAX_FIELD_NUMBER) + 1 {
        format!("{} to max", start)
    } else {
        format!("{} to {}", start, last)
    }
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("\"{}\"", escape_string(name)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a snake_case name to lowerCamelCase
fn to_lower_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = false;

    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use prost_types::descriptor_proto::{ExtensionRange, ReservedRange};
    use prost_types::{
        EnumValueDescriptorProto, FieldOptions, FileOptions, MessageOptions,
        OneofDescriptorProto,
    };

    fn field(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(label as i32),
            r#type: Some(ty as i32),
            ..Default::default()
        }
    }

    fn typed(name: &str, number: i32, label: Label, ty: Type, type_name: &str) -> FieldDescriptorProto {
        FieldDescriptorProto {
            type_name: Some(type_name.to_string()),
            ..field(name, number, label, ty)
        }
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn file(package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("test.proto".to_string()),
            package: Some(package.to_string()),
            message_type: messages,
            ..Default::default()
        }
    }

    fn render(proto: FileDescriptorProto) -> String {
        ProtoRenderer::new(proto).render()
    }

    #[test]
    fn test_proto_syntax() {
        assert_eq!(ProtoSyntax::from_declared(""), ProtoSyntax::Proto2);
        assert_eq!(ProtoSyntax::from_declared("proto2"), ProtoSyntax::Proto2);
        assert_eq!(ProtoSyntax::from_declared("proto3"), ProtoSyntax::Proto3);
        assert_eq!(ProtoSyntax::from_declared("editions"), ProtoSyntax::Proto2);
    }

    #[test]
    fn test_to_lower_camel_case() {
        assert_eq!(to_lower_camel_case("hello_world"), "helloWorld");
        assert_eq!(to_lower_camel_case("simple"), "simple");
    }

    #[test]
    fn test_format_range() {
        assert_eq!(format_range(5, 6), "5");
        assert_eq!(format_range(5, 8), "5 to 7");
        assert_eq!(format_range(1000, MAX_FIELD_NUMBER as i32 + 1), "1000 to max");
        assert_eq!(format_range(1, i32::MIN), "1 to -2147483649");
    }

    #[test]
    fn test_header_order() {
        let proto = FileDescriptorProto {
            name: Some("a/b.proto".to_string()),
            package: Some("a.b".to_string()),
            dependency: vec!["x.proto".to_string(), "y.proto".to_string()],
            public_dependency: vec![1],
            options: Some(FileOptions {
                java_package: Some("com.a.b".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            render(proto),
            "syntax = \"proto2\";\n\
             \n\
             package a.b;\n\
             \n\
             option java_package = \"com.a.b\";\n\
             \n\
             import \"x.proto\";\n\
             import public \"y.proto\";\n\
             \n"
        );
    }

    #[test]
    fn test_empty_package_is_omitted() {
        let proto = FileDescriptorProto {
            name: Some("a.proto".to_string()),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        };
        assert_eq!(render(proto), "syntax = \"proto3\";\n\n");
    }

    #[test]
    fn test_reserved_and_extension_ranges() {
        let mut msg = message("M", vec![field("id", 1, Label::Optional, Type::Int32)]);
        msg.reserved_range = vec![
            ReservedRange { start: Some(5), end: Some(6) },
            ReservedRange { start: Some(8), end: Some(11) },
        ];
        msg.reserved_name = vec!["old".to_string(), "older".to_string()];
        msg.extension_range = vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }];

        assert_eq!(
            render(file("", vec![msg])),
            "syntax = \"proto2\";\n\
             \n\
             message M {\n\
             \x20 optional int32 id = 1;\n\
             \x20 reserved 5, 8 to 10;\n\
             \x20 reserved \"old\", \"older\";\n\
             \x20 extensions 100 to 199;\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_single_reserved_number() {
        let mut msg = message("M", vec![]);
        msg.reserved_range = vec![ReservedRange { start: Some(5), end: Some(6) }];
        assert!(render(file("", vec![msg])).contains("  reserved 5;\n"));
    }

    #[test]
    fn test_malformed_range_bounds_render() {
        let mut msg = message("M", vec![]);
        msg.reserved_range = vec![ReservedRange { start: Some(1), end: Some(i32::MIN) }];
        msg.extension_range = vec![ExtensionRange {
            start: Some(i32::MIN),
            end: Some(i32::MIN),
            ..Default::default()
        }];

        let rendered = render(file("", vec![msg]));
        assert!(rendered.contains("  reserved 1 to -2147483649;\n"));
        assert!(rendered.contains("  extensions -2147483648 to -2147483649;\n"));
    }

    #[test]
    fn test_oneof_then_plain_fields() {
        let mut a = field("a", 2, Label::Optional, Type::String);
        a.oneof_index = Some(0);
        let mut b = field("b", 3, Label::Optional, Type::Int64);
        b.oneof_index = Some(0);
        let mut msg = message("M", vec![field("id", 1, Label::Required, Type::Int32), a, b]);
        msg.oneof_decl = vec![OneofDescriptorProto {
            name: Some("choice".to_string()),
            options: None,
        }];

        assert_eq!(
            render(file("", vec![msg])),
            "syntax = \"proto2\";\n\
             \n\
             message M {\n\
             \x20 oneof choice {\n\
             \x20   string a = 2;\n\
             \x20   int64 b = 3;\n\
             \x20 }\n\
             \x20 required int32 id = 1;\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_out_of_range_oneof_renders_plain() {
        let mut a = field("a", 1, Label::Optional, Type::String);
        a.oneof_index = Some(3);
        let rendered = render(file("", vec![message("M", vec![a])]));
        assert!(rendered.contains("  optional string a = 1;\n"));
        assert!(!rendered.contains("oneof"));
    }

    #[test]
    fn test_nested_types_resolve_in_scope() {
        let inner = message("Inner", vec![field("v", 1, Label::Optional, Type::Bool)]);
        let mut outer = message(
            "Outer",
            vec![
                typed("inner", 1, Label::Optional, Type::Message, ".pkg.Outer.Inner"),
                typed("kind", 2, Label::Repeated, Type::Enum, ".pkg.Kind"),
                typed("self_ref", 3, Label::Optional, Type::Message, ".pkg.Outer"),
            ],
        );
        outer.nested_type = vec![inner];

        let mut proto = file("pkg", vec![outer]);
        proto.enum_type = vec![EnumDescriptorProto {
            name: Some("Kind".to_string()),
            value: vec![EnumValueDescriptorProto {
                name: Some("KIND_UNKNOWN".to_string()),
                number: Some(0),
                options: None,
            }],
            ..Default::default()
        }];

        assert_eq!(
            render(proto),
            "syntax = \"proto2\";\n\
             \n\
             package pkg;\n\
             \n\
             enum Kind {\n\
             \x20 KIND_UNKNOWN = 0;\n\
             }\n\
             \n\
             message Outer {\n\
             \x20 message Inner {\n\
             \x20   optional bool v = 1;\n\
             \x20 }\n\
             \n\
             \x20 optional Inner inner = 1;\n\
             \x20 repeated Kind kind = 2;\n\
             \x20 optional Outer self_ref = 3;\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_field_option_clause_order() {
        let mut f = field("name", 1, Label::Optional, Type::String);
        f.default_value = Some("a\"b".to_string());
        f.options = Some(FieldOptions {
            deprecated: Some(true),
            ..Default::default()
        });
        let mut nums = field("nums", 2, Label::Repeated, Type::Int32);
        nums.options = Some(FieldOptions {
            packed: Some(true),
            deprecated: Some(true),
            ..Default::default()
        });
        let mut e = typed("e", 3, Label::Optional, Type::Enum, ".E");
        e.default_value = Some("E_ONE".to_string());

        let rendered = render(file("", vec![message("M", vec![f, nums, e])]));
        assert!(rendered.contains("  optional string name = 1 [default = \"a\\\"b\", deprecated = true];\n"));
        assert!(rendered.contains("  repeated int32 nums = 2 [packed = true, deprecated = true];\n"));
        assert!(rendered.contains("  optional E e = 3 [default = E_ONE];\n"));
    }

    #[test]
    fn test_json_name_only_when_custom() {
        let mut plain = field("user_id", 1, Label::Optional, Type::Int64);
        plain.json_name = Some("userId".to_string());
        let mut custom = field("other", 2, Label::Optional, Type::Int64);
        custom.json_name = Some("OTHER".to_string());

        let rendered = render(file("", vec![message("M", vec![plain, custom])]));
        assert!(rendered.contains("  optional int64 user_id = 1;\n"));
        assert!(rendered.contains("  optional int64 other = 2 [json_name = \"OTHER\"];\n"));
    }

    #[test]
    fn test_proto3_labels_and_synthetic_oneof() {
        let mut maybe = field("maybe", 2, Label::Optional, Type::String);
        maybe.oneof_index = Some(0);
        maybe.proto3_optional = Some(true);
        let mut msg = message(
            "M",
            vec![
                field("id", 1, Label::Optional, Type::Int32),
                maybe,
                field("tags", 3, Label::Repeated, Type::String),
            ],
        );
        msg.oneof_decl = vec![OneofDescriptorProto {
            name: Some("_maybe".to_string()),
            options: None,
        }];

        let mut proto = file("", vec![msg]);
        proto.syntax = Some("proto3".to_string());

        assert_eq!(
            render(proto),
            "syntax = \"proto3\";\n\
             \n\
             message M {\n\
             \x20 int32 id = 1;\n\
             \x20 optional string maybe = 2;\n\
             \x20 repeated string tags = 3;\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_map_field() {
        let entry = DescriptorProto {
            name: Some("LabelsEntry".to_string()),
            field: vec![
                field("key", 1, Label::Optional, Type::String),
                typed("value", 2, Label::Optional, Type::Message, ".pkg.M.Value"),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut msg = message(
            "M",
            vec![typed("labels", 1, Label::Repeated, Type::Message, ".pkg.M.LabelsEntry")],
        );
        msg.nested_type = vec![entry, message("Value", vec![])];

        let rendered = render(file("pkg", vec![msg.clone()]));
        assert!(rendered.contains("  map<string, Value> labels = 1;\n"));
        assert!(!rendered.contains("LabelsEntry"));

        let expanded = ProtoRenderer::new(file("pkg", vec![msg]))
            .with_config(RenderConfig::new().map_fields(false))
            .render();
        assert!(expanded.contains("  repeated LabelsEntry labels = 1;\n"));
        assert!(expanded.contains("  message LabelsEntry {\n"));
        assert!(!expanded.contains("map_entry"));
    }

    #[test]
    fn test_extensions() {
        let mut ext = typed("note", 100, Label::Optional, Type::Message, ".pkg.Note");
        ext.extendee = Some(".pkg.Base".to_string());
        let mut nested_ext = field("flag", 101, Label::Optional, Type::Bool);
        nested_ext.extendee = Some(".pkg.Base".to_string());

        let mut holder = message("Holder", vec![]);
        holder.extension = vec![nested_ext];

        let mut proto = file("pkg", vec![holder]);
        proto.extension = vec![ext];

        assert_eq!(
            render(proto),
            "syntax = \"proto2\";\n\
             \n\
             package pkg;\n\
             \n\
             message Holder {\n\
             \x20 extend Base {\n\
             \x20   optional bool flag = 101;\n\
             \x20 }\n\
             \n\
             }\n\
             \n\
             extend Base {\n\
             \x20 optional Note note = 100;\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_service() {
        let proto = FileDescriptorProto {
            name: Some("svc.proto".to_string()),
            package: Some("pkg".to_string()),
            syntax: Some("proto3".to_string()),
            service: vec![ServiceDescriptorProto {
                name: Some("Greeter".to_string()),
                method: vec![
                    MethodDescriptorProto {
                        name: Some("Hello".to_string()),
                        input_type: Some(".pkg.HelloRequest".to_string()),
                        output_type: Some(".other.HelloReply".to_string()),
                        ..Default::default()
                    },
                    MethodDescriptorProto {
                        name: Some("Chat".to_string()),
                        input_type: Some(".pkg.Msg".to_string()),
                        output_type: Some(".pkg.Msg".to_string()),
                        client_streaming: Some(true),
                        server_streaming: Some(true),
                        options: Some(prost_types::MethodOptions {
                            deprecated: Some(true),
                            ..Default::default()
                        }),
                    },
                ],
                options: None,
            }],
            ..Default::default()
        };

        assert_eq!(
            render(proto),
            "syntax = \"proto3\";\n\
             \n\
             package pkg;\n\
             \n\
             service Greeter {\n\
             \x20 rpc Hello(HelloRequest) returns (other.HelloReply);\n\
             \x20 rpc Chat(stream Msg) returns (stream Msg) {\n\
             \x20   option deprecated = true;\n\
             \x20 }\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_enum_options_and_reserved() {
        let enum_type = EnumDescriptorProto {
            name: Some("Color".to_string()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("RED".to_string()),
                    number: Some(0),
                    options: None,
                },
                EnumValueDescriptorProto {
                    name: Some("CRIMSON".to_string()),
                    number: Some(0),
                    options: Some(prost_types::EnumValueOptions {
                        deprecated: Some(true),
                        ..Default::default()
                    }),
                },
            ],
            options: Some(prost_types::EnumOptions {
                allow_alias: Some(true),
                ..Default::default()
            }),
            reserved_range: vec![
                prost_types::enum_descriptor_proto::EnumReservedRange {
                    start: Some(2),
                    end: Some(2),
                },
                prost_types::enum_descriptor_proto::EnumReservedRange {
                    start: Some(4),
                    end: Some(6),
                },
            ],
            reserved_name: vec!["BLUE".to_string()],
        };
        let mut proto = file("", vec![]);
        proto.enum_type = vec![enum_type];

        assert_eq!(
            render(proto),
            "syntax = \"proto2\";\n\
             \n\
             enum Color {\n\
             \x20 option allow_alias = true;\n\
             \x20 reserved 2, 4 to 6;\n\
             \x20 reserved \"BLUE\";\n\
             \x20 RED = 0;\n\
             \x20 CRIMSON = 0 [deprecated = true];\n\
             }\n\
             \n"
        );
    }

    #[test]
    fn test_custom_indent() {
        let msg = message("M", vec![field("id", 1, Label::Optional, Type::Int32)]);
        let rendered = ProtoRenderer::new(file("", vec![msg]))
            .with_config(RenderConfig::new().indent_str("\t"))
            .render();
        assert!(rendered.contains("\toptional int32 id = 1;\n"));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(ProtoRenderer::from_bytes(&[0x0A, 0x7F]).is_err());
    }
}
