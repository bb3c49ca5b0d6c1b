/// Markup dialect to UI command-string compiler
pub mod aliases;
pub mod ast;
pub mod builder;
pub mod image;
pub mod node;
pub mod parser;
pub mod registry;
pub mod resolver;
pub mod script;
pub mod style;
pub mod tags;
pub mod template;
pub mod variables;

pub use node::{ComponentNode, Properties, PropertyValue};
pub use registry::{Attributes, CustomTag, CustomTagRegistry};
pub use template::CompiledTemplate;

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TemplateCache;
use crate::compiler::builder::TreeBuilder;
use crate::compiler::parser::Parser;
use crate::compiler::resolver::ComponentResolver;
use crate::error::{Error, Result};
use crate::watcher::{FileWatcher, Invalidation, DEFAULT_SHUTDOWN_TIMEOUT};

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// How long `stop_all_watches` waits for the watch worker
    pub watch_shutdown_timeout: Duration,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            watch_shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Owns the custom-tag registry, the template cache and the file watcher.
///
/// Every `Compiler` starts with fresh services unless they are passed in via
/// [`Compiler::with_services`].
#[derive(Debug)]
pub struct Compiler {
    registry: Arc<CustomTagRegistry>,
    cache: Arc<TemplateCache>,
    watcher: FileWatcher,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Self::with_services(
            Arc::new(CustomTagRegistry::new()),
            Arc::new(TemplateCache::new()),
            options,
        )
    }

    pub fn with_services(
        registry: Arc<CustomTagRegistry>,
        cache: Arc<TemplateCache>,
        options: CompilerOptions,
    ) -> Self {
        let watcher =
            FileWatcher::with_shutdown_timeout(Arc::clone(&cache), options.watch_shutdown_timeout);
        Compiler {
            registry,
            cache,
            watcher,
        }
    }

    pub fn registry(&self) -> &Arc<CustomTagRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.cache
    }

    /// Map `tag` (case-insensitive) to `factory`. Registered tags take
    /// precedence over aliases, the default table and the denylist.
    pub fn register_custom_tag<F>(&self, tag: &str, factory: F)
    where
        F: Fn(&Attributes) -> ComponentNode + Send + Sync + 'static,
    {
        self.registry.register(tag, factory);
    }

    pub fn register_tag<T: CustomTag>(&self, tag: T) {
        self.registry.register_tag(tag);
    }

    pub fn parse_str(&self, source: &str) -> Result<CompiledTemplate> {
        self.compile(source, &HashMap::new(), None)
    }

    /// Compile with variable overrides applied after the script block.
    pub fn parse_str_with(
        &self,
        source: &str,
        overrides: &HashMap<String, String>,
    ) -> Result<CompiledTemplate> {
        self.compile(source, overrides, None)
    }

    /// Compile `path`, reusing the cached template when there is one.
    pub fn parse_file(&self, path: &Path) -> Result<Arc<CompiledTemplate>> {
        if let Some(template) = self.cache.get(path) {
            log::debug!("cache hit for {}", path.display());
            return Ok(template);
        }

        let epoch = self.cache.epoch(path);
        let source = read_source(path)?;
        let template = Arc::new(self.compile(&source, &HashMap::new(), path.parent())?);
        self.cache.put_if_current(path, epoch, Arc::clone(&template));
        Ok(template)
    }

    /// Compile `path` with overrides. Always reads the file and never touches
    /// the cache.
    pub fn parse_file_with(
        &self,
        path: &Path,
        overrides: &HashMap<String, String>,
    ) -> Result<CompiledTemplate> {
        let source = read_source(path)?;
        self.compile(&source, overrides, path.parent())
    }

    /// Evict the cached template for `path` whenever the file changes.
    pub fn watch_file_changes(&self, path: &Path) -> Result<()> {
        self.watcher.watch(path)
    }

    pub fn stop_watching(&self, path: &Path) -> bool {
        self.watcher.stop_watching(path)
    }

    pub fn stop_all_watches(&self) {
        self.watcher.stop_all();
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watcher.is_watching(path)
    }

    pub fn subscribe(&self) -> Receiver<Invalidation> {
        self.watcher.subscribe()
    }

    fn compile(
        &self,
        source: &str,
        overrides: &HashMap<String, String>,
        base_dir: Option<&Path>,
    ) -> Result<CompiledTemplate> {
        let document = Parser::new(source).parse()?;

        let script::ScriptOutput {
            mut variables,
            aliases,
        } = match &document.script {
            Some(block) => script::evaluate(&block.content, block.line)?,
            None => script::ScriptOutput::default(),
        };

        let mut overrides: Vec<(&String, &String)> = overrides.iter().collect();
        overrides.sort();
        variables.apply_overrides(overrides)?;

        let resolver = ComponentResolver::new(Arc::clone(&self.registry));
        let roots = TreeBuilder::new(&resolver, &variables, &aliases, base_dir)
            .build(&document.elements)?;
        log::debug!(
            "compiled {} root(s), {} variable(s)",
            roots.len(),
            variables.len()
        );

        Ok(CompiledTemplate::new(roots, variables, aliases))
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_nested_label() {
        let template = Compiler::new()
            .parse_str(r#"<div id="c"><label id="t">Hello</label></div>"#)
            .unwrap();
        assert_eq!(template.build(), r#"Group #c { Label #t { Text: "Hello"; } }"#);
    }

    #[test]
    fn test_variable_and_override() {
        let source = r#"
<script type="text/customui">
@Title = "X";
</script>
<h1>@Title</h1>
"#;
        let compiler = Compiler::new();
        let plain = compiler.parse_str(source).unwrap();
        assert_eq!(
            plain.roots()[0].property("Text"),
            Some(&PropertyValue::String("X".to_string()))
        );

        let overridden = compiler
            .parse_str_with(source, &overrides(&[("Title", "Y")]))
            .unwrap();
        assert_eq!(
            overridden.roots()[0].property("Text"),
            Some(&PropertyValue::String("Y".to_string()))
        );
        assert_eq!(overridden.variable("Title"), Some("Y"));
    }

    #[test]
    fn test_invalid_override_name() {
        let err = Compiler::new()
            .parse_str_with("<div/>", &overrides(&[("bad name", "1")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidVariableName(_)));
    }

    #[test]
    fn test_custom_tag_per_compiler() {
        let compiler = Compiler::new();
        compiler.register_custom_tag("table", |_| ComponentNode::new("ItemGrid"));
        assert_eq!(compiler.parse_str("<table/>").unwrap().build(), "ItemGrid { }");

        // Fresh compiler, fresh registry
        assert!(matches!(
            Compiler::new().parse_str("<table/>"),
            Err(Error::UnsupportedTag { .. })
        ));
    }

    #[test]
    fn test_parse_file_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menu.html");
        std::fs::write(&path, "<p>one</p>").unwrap();

        let compiler = Compiler::new();
        let first = compiler.parse_file(&path).unwrap();
        std::fs::write(&path, "<p>two</p>").unwrap();
        let second = compiler.parse_file(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let fresh = compiler.parse_file_with(&path, &HashMap::new()).unwrap();
        assert_eq!(fresh.build(), r#"Label { Text: "two"; }"#);
        assert_eq!(second.build(), r#"Label { Text: "one"; }"#);
    }

    #[test]
    fn test_missing_file() {
        let err = Compiler::new()
            .parse_file(Path::new("/definitely/not/here.html"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
