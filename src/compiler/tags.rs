/// Default HTML tag mappings and the unsupported-tag denylist
use crate::compiler::node::{ComponentNode, PropertyValue};
use crate::compiler::registry::Attributes;

/// HTML elements with no counterpart in the output grammar. Checked before
/// the uppercase passthrough so these never become bogus component names.
pub const UNSUPPORTED_TAGS: &[&str] = &[
    // tabular
    "table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption", "colgroup", "col",
    // forms
    "form", "fieldset", "legend", "datalist", "output",
    // media and embedded content
    "audio", "video", "source", "track", "canvas", "svg", "iframe", "object", "embed",
    "picture", "map", "area",
    // document metadata
    "html", "head", "body", "title", "meta", "link", "style", "script", "base", "noscript",
    "template",
];

pub fn is_unsupported(tag: &str) -> bool {
    UNSUPPORTED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Elements that never have a closing tag.
pub fn is_void(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "input" | "img" | "br" | "hr" | "meta" | "link" | "source"
    )
}

fn heading(size: f64) -> ComponentNode {
    ComponentNode::text("Label").with_property(
        "Style",
        PropertyValue::object([
            ("FontSize", PropertyValue::Number(size)),
            ("RenderBold", PropertyValue::Bool(true)),
        ]),
    )
}

fn styled_label(flag: &str) -> ComponentNode {
    ComponentNode::text("Label")
        .with_property("Style", PropertyValue::object([(flag, PropertyValue::Bool(true))]))
}

fn input(attributes: &Attributes) -> ComponentNode {
    let input_type = attributes
        .get("type")
        .map(|t| t.to_ascii_lowercase())
        .unwrap_or_default();

    match input_type.as_str() {
        "password" => ComponentNode::new("TextField")
            .with_property("PasswordChar", PropertyValue::String("*".to_string())),
        "number" => ComponentNode::new("NumberField"),
        "color" => ComponentNode::new("ColorPicker"),
        "checkbox" => ComponentNode::text("CheckBoxWithLabel"),
        _ => ComponentNode::new("TextField"),
    }
}

/// Look up `tag` (lowercase) in the default table.
pub fn default_component(tag: &str, attributes: &Attributes) -> Option<ComponentNode> {
    let node = match tag {
        "div" | "section" | "main" | "header" | "footer" | "nav" | "article" | "aside" | "li" => {
            ComponentNode::new("Group")
        }
        "ul" | "ol" => ComponentNode::new("Group")
            .with_property("LayoutMode", PropertyValue::Expression("Top".to_string())),
        "p" | "span" | "label" | "small" => ComponentNode::text("Label"),
        "h1" => heading(32.0),
        "h2" => heading(28.0),
        "h3" => heading(24.0),
        "h4" => heading(20.0),
        "h5" => heading(18.0),
        "h6" => heading(16.0),
        "b" | "strong" => styled_label("RenderBold"),
        "i" | "em" => styled_label("RenderItalic"),
        "button" | "a" => ComponentNode::text("TextButton"),
        "input" => input(attributes),
        "textarea" => ComponentNode::new("MultilineTextField"),
        "img" => ComponentNode::new("AssetImage"),
        "select" => ComponentNode::new("DropdownBox"),
        "option" => ComponentNode::text("DropdownEntry"),
        "progress" => ComponentNode::new("ProgressBar"),
        "hr" => ComponentNode::new("Group").with_property(
            "Anchor",
            PropertyValue::object([("Height", PropertyValue::Number(1.0))]),
        ),
        "br" => ComponentNode::new("Group"),
        _ => return None,
    };
    Some(node)
}
