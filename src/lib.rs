//! Compiles an HTML-like markup dialect into UI command strings.
//!
//! ```no_run
//! let template = customui::parse(r#"<div id="c"><label id="t">Hello</label></div>"#)?;
//! assert_eq!(template.build(), r#"Group #c { Label #t { Text: "Hello"; } }"#);
//! # Ok::<(), customui::Error>(())
//! ```

pub mod cache;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod error;
pub mod logging;
pub mod watcher;

use std::collections::HashMap;

pub use cache::TemplateCache;
pub use compiler::{
    Attributes, CompiledTemplate, Compiler, CompilerOptions, ComponentNode, CustomTag,
    CustomTagRegistry, Properties, PropertyValue,
};
pub use error::{Error, Result};
pub use watcher::{FileWatcher, Invalidation, InvalidationKind};

/// Compile `source` with a fresh [`Compiler`].
pub fn parse(source: &str) -> Result<CompiledTemplate> {
    Compiler::new().parse_str(source)
}

/// Compile `source` with variable overrides using a fresh [`Compiler`].
pub fn parse_with(source: &str, overrides: &HashMap<String, String>) -> Result<CompiledTemplate> {
    Compiler::new().parse_str_with(source, overrides)
}
