/// Runtime-registered custom tags
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::node::ComponentNode;

/// Static attributes of an element after variable substitution, keyed by
/// lowercase name in declaration order.
pub type Attributes = IndexMap<String, String>;

/// Builds the initial node for a custom tag.
pub type TagFactory = Arc<dyn Fn(&Attributes) -> ComponentNode + Send + Sync>;

/// A typed custom tag, registered with [`CustomTagRegistry::register_tag`].
pub trait CustomTag: Send + Sync + 'static {
    fn tag_name(&self) -> &str;
    fn create(&self, attributes: &Attributes) -> ComponentNode;
}

/// Case-insensitive tag name → factory map, safe to share between threads.
#[derive(Default)]
pub struct CustomTagRegistry {
    factories: RwLock<HashMap<String, TagFactory>>,
}

impl CustomTagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(&Attributes) -> ComponentNode + Send + Sync + 'static,
    {
        log::debug!("registering custom tag <{}>", name);
        self.factories
            .write()
            .insert(name.to_ascii_lowercase(), Arc::new(factory));
    }

    pub fn register_tag<T: CustomTag>(&self, tag: T) {
        let name = tag.tag_name().to_string();
        self.register(&name, move |attributes| tag.create(attributes));
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.factories
            .write()
            .remove(&name.to_ascii_lowercase())
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<TagFactory> {
        self.factories
            .read()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl std::fmt::Debug for CustomTagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let factories = self.factories.read();
        let mut names: Vec<&String> = factories.keys().collect();
        names.sort();
        f.debug_struct("CustomTagRegistry").field("tags", &names).finish()
    }
}
