//! Inline `style="..."` parsing.
//!
//! Only an enumerated set of CSS properties has a counterpart in the output
//! grammar. Anything else fails with [`Error::UnsupportedStyleProperty`]
//! rather than being dropped.

use crate::compiler::node::{format_number, merge_properties, Properties, PropertyValue};
use crate::error::{Error, Result};

/// Parse a declaration block into output properties, in declaration order.
/// Declarations targeting the same nested object (`Anchor`, `Padding`,
/// `Style`) are merged.
pub fn parse(block: &str) -> Result<Properties> {
    let mut properties = Properties::new();

    for segment in block.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((name, value)) = segment.split_once(':') else {
            return Err(Error::invalid_style(segment, "expected `property: value`"));
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        let value = value.strip_suffix("!important").unwrap_or(value).trim();
        if value.is_empty() {
            return Err(Error::invalid_style(&name, "missing value"));
        }

        merge_properties(&mut properties, translate(&name, value)?);
    }

    Ok(properties)
}

fn translate(property: &str, value: &str) -> Result<Properties> {
    let single = |key: &str, v: PropertyValue| -> Properties {
        let mut out = Properties::new();
        out.insert(key.to_string(), v);
        out
    };
    let nested = |outer: &str, inner: &str, v: PropertyValue| -> Properties {
        single(outer, PropertyValue::object([(inner, v)]))
    };

    let translated = match property {
        "color" => single("Color", parse_color(property, value)?),
        "background" | "background-color" => single("Background", parse_color(property, value)?),

        "width" => nested("Anchor", "Width", parse_length(property, value)?),
        "height" => nested("Anchor", "Height", parse_length(property, value)?),
        "top" => nested("Anchor", "Top", parse_length(property, value)?),
        "left" => nested("Anchor", "Left", parse_length(property, value)?),
        "right" => nested("Anchor", "Right", parse_length(property, value)?),
        "bottom" => nested("Anchor", "Bottom", parse_length(property, value)?),
        "margin" => single("Anchor", parse_box(property, value)?),

        "padding" => single("Padding", parse_box(property, value)?),
        "padding-left" => nested("Padding", "Left", parse_length(property, value)?),
        "padding-top" => nested("Padding", "Top", parse_length(property, value)?),
        "padding-right" => nested("Padding", "Right", parse_length(property, value)?),
        "padding-bottom" => nested("Padding", "Bottom", parse_length(property, value)?),

        "font-size" => nested("Style", "FontSize", parse_length(property, value)?),
        "font-weight" => nested("Style", "RenderBold", parse_font_weight(property, value)?),
        "font-style" => nested(
            "Style",
            "RenderItalic",
            keyword(property, value, &[("italic", true), ("oblique", true), ("normal", false)])?,
        ),
        "font-family" => nested(
            "Style",
            "FontName",
            PropertyValue::String(value.trim_matches(|c| c == '"' || c == '\'').to_string()),
        ),
        "text-transform" => nested(
            "Style",
            "RenderUppercase",
            keyword(property, value, &[("uppercase", true), ("none", false)])?,
        ),
        "text-align" => nested(
            "Style",
            "HorizontalAlignment",
            alignment(property, value, &[("left", "Start"), ("start", "Start"), ("center", "Center"), ("right", "End"), ("end", "End")])?,
        ),
        "vertical-align" => nested(
            "Style",
            "VerticalAlignment",
            alignment(property, value, &[("top", "Start"), ("middle", "Center"), ("center", "Center"), ("bottom", "End")])?,
        ),
        "letter-spacing" => nested("Style", "LetterSpacing", parse_length(property, value)?),
        "white-space" => nested(
            "Style",
            "Wrap",
            keyword(property, value, &[("nowrap", false), ("normal", true), ("pre-wrap", true)])?,
        ),

        "display" => single(
            "Visible",
            keyword(
                property,
                value,
                &[
                    ("none", false),
                    ("block", true),
                    ("inline", true),
                    ("inline-block", true),
                    ("flex", true),
                    ("inline-flex", true),
                    ("grid", true),
                    ("contents", true),
                ],
            )?,
        ),
        "visibility" => single(
            "Visible",
            keyword(property, value, &[("visible", true), ("hidden", false), ("collapse", false)])?,
        ),
        "flex-direction" => single(
            "LayoutMode",
            alignment(property, value, &[("row", "Left"), ("column", "Top"), ("row-reverse", "Right"), ("column-reverse", "Bottom")])?,
        ),
        "flex" | "flex-grow" => {
            let first = value.split_whitespace().next().unwrap_or(value);
            single("FlexWeight", parse_number(property, first)?)
        }

        other => return Err(Error::UnsupportedStyleProperty(other.to_string())),
    };

    Ok(translated)
}

fn parse_number(property: &str, value: &str) -> Result<PropertyValue> {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(PropertyValue::Number(n)),
        _ => Err(Error::invalid_style(property, format!("expected a number, got {:?}", value))),
    }
}

/// Plain numbers or pixel lengths. Relative units have no equivalent.
fn parse_length(property: &str, value: &str) -> Result<PropertyValue> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value);
    parse_number(property, number).map_err(|_| {
        Error::invalid_style(property, format!("expected a pixel length, got {:?}", value))
    })
}

/// CSS box shorthand into `(Left, Top, Right, Bottom)`.
///
/// - 1 value: all sides
/// - 2 values: vertical, horizontal
/// - 3 values: top, horizontal, bottom
/// - 4 values: top, right, bottom, left
fn parse_box(property: &str, value: &str) -> Result<PropertyValue> {
    let parts = value
        .split_whitespace()
        .map(|part| parse_length(property, part))
        .collect::<Result<Vec<_>>>()?;

    let (top, right, bottom, left) = match parts.as_slice() {
        [all] => (all, all, all, all),
        [vertical, horizontal] => (vertical, horizontal, vertical, horizontal),
        [top, horizontal, bottom] => (top, horizontal, bottom, horizontal),
        [top, right, bottom, left] => (top, right, bottom, left),
        _ => {
            return Err(Error::invalid_style(
                property,
                format!("expected 1-4 values, got {}", parts.len()),
            ))
        }
    };

    Ok(PropertyValue::object([
        ("Left", left.clone()),
        ("Top", top.clone()),
        ("Right", right.clone()),
        ("Bottom", bottom.clone()),
    ]))
}

fn parse_font_weight(property: &str, value: &str) -> Result<PropertyValue> {
    match value.to_ascii_lowercase().as_str() {
        "bold" | "bolder" => Ok(PropertyValue::Bool(true)),
        "normal" | "lighter" => Ok(PropertyValue::Bool(false)),
        numeric => match numeric.parse::<u32>() {
            Ok(weight) => Ok(PropertyValue::Bool(weight >= 600)),
            Err(_) => Err(Error::invalid_style(
                property,
                format!("expected bold, normal or a numeric weight, got {:?}", value),
            )),
        },
    }
}

fn keyword(property: &str, value: &str, table: &[(&str, bool)]) -> Result<PropertyValue> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, flag)| PropertyValue::Bool(*flag))
        .ok_or_else(|| unknown_keyword(property, value, table.iter().map(|(name, _)| *name)))
}

fn alignment(property: &str, value: &str, table: &[(&str, &str)]) -> Result<PropertyValue> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, target)| PropertyValue::Expression(target.to_string()))
        .ok_or_else(|| unknown_keyword(property, value, table.iter().map(|(name, _)| *name)))
}

fn unknown_keyword<'a>(property: &str, value: &str, allowed: impl Iterator<Item = &'a str>) -> Error {
    let allowed: Vec<&str> = allowed.collect();
    Error::invalid_style(
        property,
        format!("expected one of {}, got {:?}", allowed.join("|"), value),
    )
}

const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("red", "#ff0000"),
    ("green", "#008000"),
    ("lime", "#00ff00"),
    ("blue", "#0000ff"),
    ("yellow", "#ffff00"),
    ("orange", "#ffa500"),
    ("purple", "#800080"),
    ("gray", "#808080"),
    ("grey", "#808080"),
];

fn parse_color(property: &str, value: &str) -> Result<PropertyValue> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();

    if lower == "transparent" {
        return Ok(PropertyValue::Color("#000000(0)".to_string()));
    }
    if let Some((_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
        return Ok(PropertyValue::Color(hex.to_string()));
    }

    if let Some(hex) = lower.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid_style(property, format!("invalid hex color {:?}", value)));
        }
        return match hex.len() {
            3 => {
                let expanded: String = hex.chars().flat_map(|c| [c, c]).collect();
                Ok(PropertyValue::Color(format!("#{}", expanded)))
            }
            6 => Ok(PropertyValue::Color(format!("#{}", hex))),
            8 => {
                let alpha = u8::from_str_radix(&hex[6..8], 16).unwrap_or(255);
                Ok(PropertyValue::Color(with_alpha(&hex[..6], f64::from(alpha) / 255.0)))
            }
            _ => Err(Error::invalid_style(property, format!("invalid hex color {:?}", value))),
        };
    }

    let functional = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(args) = functional {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(Error::invalid_style(
                property,
                format!("expected 3 or 4 components in {:?}", value),
            ));
        }
        let mut hex = String::new();
        for part in &parts[..3] {
            let channel: u8 = part.parse().map_err(|_| {
                Error::invalid_style(property, format!("invalid color channel {:?}", part))
            })?;
            hex.push_str(&format!("{:02x}", channel));
        }
        return match parts.get(3) {
            Some(alpha) => {
                let alpha: f64 = alpha
                    .parse()
                    .ok()
                    .filter(|a: &f64| (0.0..=1.0).contains(a))
                    .ok_or_else(|| {
                        Error::invalid_style(property, format!("invalid alpha {:?}", alpha))
                    })?;
                Ok(PropertyValue::Color(with_alpha(&hex, alpha)))
            }
            None => Ok(PropertyValue::Color(format!("#{}", hex))),
        };
    }

    Err(Error::invalid_style(property, format!("unrecognized color {:?}", value)))
}

fn with_alpha(hex: &str, alpha: f64) -> String {
    let rounded = (alpha * 100.0).round() / 100.0;
    format!("#{}({})", hex, format_number(rounded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::node::ComponentNode;

    fn render(block: &str) -> String {
        let mut node = ComponentNode::new("Group");
        node.set_properties(parse(block).unwrap());
        node.build()
    }

    #[test]
    fn test_color_passthrough() {
        assert_eq!(render("color: #ff8800"), "Group { Color: #ff8800; }");
        assert_eq!(render("color: #f80"), "Group { Color: #ff8800; }");
        assert_eq!(render("background: rgba(255, 0, 0, 0.5)"), "Group { Background: #ff0000(0.5); }");
        assert_eq!(render("background-color: white"), "Group { Background: #ffffff; }");
    }

    #[test]
    fn test_padding_shorthand() {
        assert_eq!(
            render("padding: 4px"),
            "Group { Padding: (Left: 4, Top: 4, Right: 4, Bottom: 4); }"
        );
        assert_eq!(
            render("padding: 4 8"),
            "Group { Padding: (Left: 8, Top: 4, Right: 8, Bottom: 4); }"
        );
        assert_eq!(
            render("padding: 1 2 3 4"),
            "Group { Padding: (Left: 4, Top: 1, Right: 2, Bottom: 3); }"
        );
    }

    #[test]
    fn test_nested_targets_merge() {
        assert_eq!(
            render("width: 200px; height: 40px; font-size: 18; font-weight: bold;"),
            "Group { Anchor: (Width: 200, Height: 40); Style: (FontSize: 18, RenderBold: true); }"
        );
    }

    #[test]
    fn test_layout_and_visibility() {
        assert_eq!(
            render("flex-direction: column; flex: 1; display: none"),
            "Group { LayoutMode: Top; FlexWeight: 1; Visible: false; }"
        );
        assert_eq!(render("display: Flex"), "Group { Visible: true; }");
        assert_eq!(
            render("text-align: center"),
            "Group { Style: (HorizontalAlignment: Center); }"
        );
    }

    #[test]
    fn test_unsupported_property() {
        for block in ["border-radius: 4px", "color: red; transform: rotate(4deg)"] {
            match parse(block) {
                Err(Error::UnsupportedStyleProperty(name)) => {
                    assert!(name == "border-radius" || name == "transform")
                }
                other => panic!("expected unsupported property, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(parse("width: 50%"), Err(Error::InvalidStyleValue { .. })));
        assert!(matches!(parse("color: #12"), Err(Error::InvalidStyleValue { .. })));
        assert!(matches!(parse("padding: 1 2 3 4 5"), Err(Error::InvalidStyleValue { .. })));
        assert!(matches!(parse("color"), Err(Error::InvalidStyleValue { .. })));
        assert!(matches!(parse("display: banana"), Err(Error::InvalidStyleValue { .. })));
    }
}
