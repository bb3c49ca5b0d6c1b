//! Tag name → initial output node.
//!
//! Resolution order, first match wins:
//!
//! 1. custom-tag registry (case-insensitive, on the tag as written)
//! 2. alias-qualified tags, `$C.Name` → `$C.@Name`
//! 3. internal `_tags`; unknown ones degrade to a `Group`
//! 4. the default HTML table
//! 5. the unsupported denylist, then uppercase passthrough

use std::path::Path;
use std::sync::Arc;

use crate::compiler::aliases::AliasContext;
use crate::compiler::image;
use crate::compiler::node::ComponentNode;
use crate::compiler::registry::{Attributes, CustomTagRegistry};
use crate::compiler::tags;
use crate::error::{Error, Result};

/// Everything the resolver needs to know about one element.
#[derive(Debug, Clone, Copy)]
pub struct TagRequest<'a> {
    /// Lowercased tag, without the alias prefix
    pub tag: &'a str,
    /// Tag as written, without the alias prefix
    pub original: &'a str,
    pub attributes: &'a Attributes,
    pub alias_prefix: Option<&'a str>,
    pub aliases: &'a AliasContext,
    /// Directory relative asset paths resolve against
    pub base_dir: Option<&'a Path>,
}

/// How the resolved node was produced. Custom and internal tags own their
/// attributes, so the builder only applies `id` and `style` to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Custom,
    Alias,
    Internal,
    Default,
    Passthrough,
}

impl Resolution {
    pub fn owns_attributes(self) -> bool {
        matches!(self, Resolution::Custom | Resolution::Internal)
    }
}

pub struct ComponentResolver {
    registry: Arc<CustomTagRegistry>,
}

impl ComponentResolver {
    pub fn new(registry: Arc<CustomTagRegistry>) -> Self {
        ComponentResolver { registry }
    }

    pub fn resolve(&self, request: &TagRequest<'_>) -> Result<(ComponentNode, Resolution)> {
        let written = match request.alias_prefix {
            Some(prefix) => format!("{}.{}", prefix, request.original),
            None => request.original.to_string(),
        };

        if let Some(factory) = self.registry.get(&written) {
            log::debug!("<{}> resolved through the custom tag registry", written);
            return Ok((factory(request.attributes), Resolution::Custom));
        }

        if let Some(prefix) = request.alias_prefix {
            let Some(canonical) = request.aliases.resolve_prefix(prefix) else {
                return Err(Error::unsupported_tag(
                    &written,
                    format!("alias {} is not declared", prefix),
                ));
            };
            let name = format!("{}.@{}", canonical, request.original);
            return Ok((ComponentNode::text(name), Resolution::Alias));
        }

        if let Some(internal) = request.tag.strip_prefix('_') {
            return self
                .resolve_internal(internal, request)
                .map(|node| (node, Resolution::Internal));
        }

        if let Some(node) = tags::default_component(request.tag, request.attributes) {
            return Ok((node, Resolution::Default));
        }

        if tags::is_unsupported(request.tag) {
            return Err(Error::unsupported_tag(
                request.original,
                "this element has no equivalent UI component",
            ));
        }

        if request
            .original
            .chars()
            .next()
            .map_or(false, |c| c.is_uppercase())
        {
            return Ok((ComponentNode::text(request.original), Resolution::Passthrough));
        }

        Err(Error::unsupported_tag(
            request.original,
            "unknown lowercase tag (component names start with an uppercase letter)",
        ))
    }

    fn resolve_internal(&self, name: &str, request: &TagRequest<'_>) -> Result<ComponentNode> {
        match name {
            "image" => image::rasterize(request.attributes, request.base_dir),
            "anchor" => match request.attributes.get("id") {
                Some(id) if !id.is_empty() => Ok(ComponentNode::tagless(id.clone())),
                _ => {
                    log::warn!("<_anchor> without an id, emitting a plain Group");
                    Ok(ComponentNode::new("Group"))
                }
            },
            other => {
                log::debug!("unknown internal tag <_{}>, emitting a plain Group", other);
                Ok(ComponentNode::new("Group"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        resolver: ComponentResolver,
        aliases: AliasContext,
        attributes: Attributes,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(CustomTagRegistry::new());
            registry.register("table", |_| ComponentNode::new("$C.@Grid"));
            let mut aliases = AliasContext::new();
            aliases.declare("$Shop", "Shop.ui");
            Fixture {
                resolver: ComponentResolver::new(registry),
                aliases,
                attributes: Attributes::new(),
            }
        }

        fn resolve(&self, written: &str) -> Result<(ComponentNode, Resolution)> {
            let (prefix, original) = match written.split_once('.') {
                Some((prefix, rest)) if prefix.starts_with('$') => (Some(prefix), rest),
                _ => (None, written),
            };
            let tag = original.to_ascii_lowercase();
            self.resolver.resolve(&TagRequest {
                tag: &tag,
                original,
                attributes: &self.attributes,
                alias_prefix: prefix,
                aliases: &self.aliases,
                base_dir: None,
            })
        }

        fn name(&self, written: &str) -> String {
            let (node, _) = self.resolve(written).unwrap();
            node.build()
        }
    }

    #[test]
    fn test_custom_registration_overrides_denylist() {
        let fixture = Fixture::new();
        let (node, resolution) = fixture.resolve("TABLE").unwrap();
        assert_eq!(node.name(), Some("$C.@Grid"));
        assert_eq!(resolution, Resolution::Custom);
    }

    #[test]
    fn test_alias_resolution() {
        let fixture = Fixture::new();
        assert_eq!(fixture.name("$C.TextButton"), "$C.@TextButton { }");
        assert_eq!(fixture.name("$common.Panel"), "$Common.@Panel { }");
        assert_eq!(fixture.name("$shop.ItemSlot"), "$Shop.@ItemSlot { }");
        assert!(matches!(
            fixture.resolve("$Nope.Panel"),
            Err(Error::UnsupportedTag { .. })
        ));
    }

    #[test]
    fn test_internal_tags_degrade() {
        let fixture = Fixture::new();
        assert_eq!(fixture.name("_spacer"), "Group { }");
        let (_, resolution) = fixture.resolve("_whatever").unwrap();
        assert_eq!(resolution, Resolution::Internal);
    }

    #[test]
    fn test_anchor_is_tagless() {
        let mut fixture = Fixture::new();
        fixture.attributes.insert("id".into(), "Slot".into());
        let (node, _) = fixture.resolve("_anchor").unwrap();
        assert!(node.is_tagless());
        assert_eq!(node.build(), "#Slot { }");
    }

    #[test]
    fn test_default_table_and_passthrough() {
        let fixture = Fixture::new();
        assert_eq!(fixture.name("div"), "Group { }");
        assert_eq!(fixture.name("ItemGrid"), "ItemGrid { }");
        assert!(matches!(
            fixture.resolve("video"),
            Err(Error::UnsupportedTag { .. })
        ));
        assert!(matches!(
            fixture.resolve("Form"),
            Err(Error::UnsupportedTag { .. })
        ));
        assert!(matches!(
            fixture.resolve("widget"),
            Err(Error::UnsupportedTag { .. })
        ));
    }
}
