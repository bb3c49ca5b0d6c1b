/// Output component tree and its command-grammar serializer
use indexmap::IndexMap;
use std::fmt::Write;

/// Ordered property map. Insertion order is emission order.
pub type Properties = IndexMap<String, PropertyValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// `#rrggbb` or `#rrggbb(alpha)`, emitted verbatim
    Color(String),
    /// Computed by the runtime, emitted verbatim
    Expression(String),
    Object(Properties),
}

impl PropertyValue {
    /// Type a raw attribute literal: booleans, then numbers, else a string.
    pub fn literal(raw: &str) -> Self {
        match raw {
            "true" => PropertyValue::Bool(true),
            "false" => PropertyValue::Bool(false),
            _ => match raw.parse::<f64>() {
                Ok(n) if n.is_finite() && !raw.trim().is_empty() => PropertyValue::Number(n),
                _ => PropertyValue::String(raw.to_string()),
            },
        }
    }

    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, PropertyValue)>) -> Self {
        PropertyValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    fn write_to(&self, out: &mut String) {
        match self {
            PropertyValue::String(s) => {
                out.push('"');
                for ch in s.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(ch),
                    }
                }
                out.push('"');
            }
            PropertyValue::Number(n) => out.push_str(&format_number(*n)),
            PropertyValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            PropertyValue::Color(c) | PropertyValue::Expression(c) => out.push_str(c),
            PropertyValue::Object(entries) => {
                out.push('(');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    value.write_to(out);
                }
                out.push(')');
            }
        }
    }
}

pub(crate) fn render_value(value: &PropertyValue) -> String {
    let mut out = String::new();
    value.write_to(&mut out);
    out
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Merge `incoming` into `target`. Nested objects merge key-wise, everything
/// else is replaced.
pub(crate) fn merge_properties(target: &mut Properties, incoming: Properties) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(PropertyValue::Object(existing)), PropertyValue::Object(nested)) => {
                merge_properties(existing, nested);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// One component of the compiled output.
///
/// A node without a name is tagless: it serializes as `#id { ... }` and only
/// marks an anchor point for the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentNode {
    name: Option<String>,
    id: Option<String>,
    properties: Properties,
    children: Vec<ComponentNode>,
    text_bearing: bool,
}

impl ComponentNode {
    pub fn new(name: impl Into<String>) -> Self {
        ComponentNode {
            name: Some(name.into()),
            id: None,
            properties: Properties::new(),
            children: Vec::new(),
            text_bearing: false,
        }
    }

    /// A node whose text content becomes its `Text` property.
    pub fn text(name: impl Into<String>) -> Self {
        ComponentNode {
            text_bearing: true,
            ..ComponentNode::new(name)
        }
    }

    pub fn tagless(id: impl Into<String>) -> Self {
        ComponentNode {
            name: None,
            id: Some(id.into()),
            properties: Properties::new(),
            children: Vec::new(),
            text_bearing: false,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn is_tagless(&self) -> bool {
        self.name.is_none()
    }

    pub fn is_text_bearing(&self) -> bool {
        self.text_bearing
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn children(&self) -> &[ComponentNode] {
        &self.children
    }

    /// Last write wins.
    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }

    pub fn set_properties(&mut self, properties: Properties) {
        merge_properties(&mut self.properties, properties);
    }

    pub fn add_child(&mut self, child: ComponentNode) {
        self.children.push(child);
    }

    /// Set the displayed text. `%some.key` is a localization key and is
    /// stored under `TextKey` instead of `Text`.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        match text.strip_prefix('%') {
            Some(key) if !key.is_empty() => {
                self.properties.shift_remove("Text");
                self.properties
                    .insert("TextKey".to_string(), PropertyValue::String(key.to_string()));
            }
            _ => {
                self.properties.shift_remove("TextKey");
                self.properties
                    .insert("Text".to_string(), PropertyValue::String(text));
            }
        }
    }

    /// Serialize this node and its descendants.
    pub fn build(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match (&self.name, &self.id) {
            (Some(name), Some(id)) => {
                let _ = write!(out, "{} #{}", name, id);
            }
            (Some(name), None) => out.push_str(name),
            (None, Some(id)) => {
                let _ = write!(out, "#{}", id);
            }
            (None, None) => out.push('#'),
        }
        out.push_str(" {");
        for (key, value) in &self.properties {
            out.push(' ');
            out.push_str(key);
            out.push_str(": ");
            value.write_to(out);
            out.push(';');
        }
        for child in &self.children {
            out.push(' ');
            child.write_to(out);
        }
        out.push_str(" }");
    }
}
