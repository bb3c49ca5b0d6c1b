/// Turns parsed elements into output component trees
use std::path::Path;

use crate::compiler::aliases::AliasContext;
use crate::compiler::ast::{Attribute, Element, Markup};
use crate::compiler::node::{ComponentNode, PropertyValue};
use crate::compiler::registry::Attributes;
use crate::compiler::resolver::{ComponentResolver, Resolution, TagRequest};
use crate::compiler::style;
use crate::compiler::variables::VariableTable;
use crate::error::Result;

pub struct TreeBuilder<'a> {
    resolver: &'a ComponentResolver,
    variables: &'a VariableTable,
    aliases: &'a AliasContext,
    base_dir: Option<&'a Path>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        resolver: &'a ComponentResolver,
        variables: &'a VariableTable,
        aliases: &'a AliasContext,
        base_dir: Option<&'a Path>,
    ) -> Self {
        TreeBuilder {
            resolver,
            variables,
            aliases,
            base_dir,
        }
    }

    /// One root node per top-level element.
    pub fn build(&self, elements: &[Element]) -> Result<Vec<ComponentNode>> {
        elements.iter().map(|element| self.build_element(element)).collect()
    }

    fn build_element(&self, element: &Element) -> Result<ComponentNode> {
        let (alias_prefix, original) = split_alias(&element.tag);
        let tag = original.to_ascii_lowercase();

        // Static attributes with variables expanded; bindings stay verbatim
        let expanded: Vec<(&Attribute, Option<String>)> = element
            .attributes
            .iter()
            .map(|attr| {
                let value = match (&attr.value, attr.binding) {
                    (Some(value), false) => Some(self.variables.substitute(value)),
                    (value, _) => value.clone(),
                };
                (attr, value)
            })
            .collect();

        let attributes: Attributes = expanded
            .iter()
            .filter(|(attr, _)| !attr.binding)
            .map(|(attr, value)| {
                (
                    attr.name.to_ascii_lowercase(),
                    value.clone().unwrap_or_default(),
                )
            })
            .collect();

        let (mut node, resolution) = self.resolver.resolve(&TagRequest {
            tag: &tag,
            original,
            attributes: &attributes,
            alias_prefix,
            aliases: self.aliases,
            base_dir: self.base_dir,
        })?;
        log::debug!(
            "line {}: <{}> -> {} ({:?})",
            element.line,
            element.tag,
            node.name().unwrap_or("#"),
            resolution
        );

        for (attr, value) in &expanded {
            if attr.binding {
                node.set_property(
                    pascal_case(&attr.name),
                    PropertyValue::Expression(value.clone().unwrap_or_default()),
                );
            } else {
                apply_attribute(&mut node, resolution, &attr.name, value.as_deref())?;
            }
        }

        let mut text_runs = Vec::new();
        for child in &element.children {
            match child {
                Markup::Element(child) => node.add_child(self.build_element(child)?),
                Markup::Text(text) => {
                    let text = self.variables.substitute(text);
                    if node.is_text_bearing() {
                        text_runs.push(text);
                    } else {
                        let mut label = ComponentNode::text("Label");
                        label.set_text(text);
                        node.add_child(label);
                    }
                }
            }
        }
        if !text_runs.is_empty() {
            node.set_text(text_runs.join(" "));
        }

        Ok(node)
    }
}

/// `$C.TextButton` → (`Some("$C")`, `"TextButton"`)
fn split_alias(tag: &str) -> (Option<&str>, &str) {
    match tag.split_once('.') {
        Some((prefix, rest)) if prefix.starts_with('$') && !rest.is_empty() => (Some(prefix), rest),
        _ => (None, tag),
    }
}

fn apply_attribute(
    node: &mut ComponentNode,
    resolution: Resolution,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    let name = name.to_ascii_lowercase();
    let flag = value.map_or(true, |v| !v.eq_ignore_ascii_case("false"));
    let text = value.unwrap_or_default();

    match name.as_str() {
        "id" => node.set_id(text),
        "style" => node.set_properties(style::parse(text)?),
        _ if resolution.owns_attributes() => {}
        "class" | "type" => {}
        "text" => node.set_text(text),
        "src" => node.set_property("AssetPath", PropertyValue::String(text.to_string())),
        "placeholder" => node.set_property("PlaceholderText", PropertyValue::String(text.to_string())),
        "title" | "tooltip" => node.set_property("TooltipText", PropertyValue::String(text.to_string())),
        "disabled" => node.set_property("Disabled", PropertyValue::Bool(flag)),
        "checked" => node.set_property("Value", PropertyValue::Bool(flag)),
        "hidden" => node.set_property("Visible", PropertyValue::Bool(!flag)),
        "maxlength" => node.set_property("MaxLength", PropertyValue::literal(text)),
        other => {
            let value = match value {
                Some(v) => PropertyValue::literal(v),
                None => PropertyValue::Bool(true),
            };
            node.set_property(pascal_case(other), value);
        }
    }
    Ok(())
}

/// `max-value` → `MaxValue`, `flexWeight` → `FlexWeight`
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("$C.TextButton"), (Some("$C"), "TextButton"));
        assert_eq!(split_alias("div"), (None, "div"));
        assert_eq!(split_alias("$C."), (None, "$C."));
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("max-value"), "MaxValue");
        assert_eq!(pascal_case("flexWeight"), "FlexWeight");
        assert_eq!(pascal_case("text_spans"), "TextSpans");
    }
}
