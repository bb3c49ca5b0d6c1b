/// Alias tokens (`$C`, `$Common`, script-declared) qualifying tag names
use indexmap::IndexMap;

use crate::compiler::node::{render_value, PropertyValue};

/// Always available and never shadowed by script declarations.
pub const BUILTIN_ALIASES: [&str; 2] = ["$C", "$Common"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasContext {
    declared: IndexMap<String, String>,
}

impl AliasContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_builtin(alias: &str) -> bool {
        BUILTIN_ALIASES
            .iter()
            .any(|builtin| builtin.eq_ignore_ascii_case(alias))
    }

    /// Declare `alias` (including its `$`). Returns `false` when the alias is
    /// a built-in and the declaration was ignored.
    pub fn declare(&mut self, alias: &str, path: impl Into<String>) -> bool {
        if Self::is_builtin(alias) {
            log::warn!("ignoring redeclaration of built-in alias {}", alias);
            return false;
        }
        self.declared.insert(alias.to_string(), path.into());
        true
    }

    /// Canonical spelling of `prefix` if it names a built-in or declared alias.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        if let Some(builtin) = BUILTIN_ALIASES
            .iter()
            .find(|builtin| builtin.eq_ignore_ascii_case(prefix))
        {
            return Some(*builtin);
        }
        self.declared
            .keys()
            .find(|declared| declared.eq_ignore_ascii_case(prefix))
            .map(String::as_str)
    }

    pub fn path_of(&self, alias: &str) -> Option<&str> {
        self.declared.get(alias).map(String::as_str)
    }

    pub fn declared(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declared.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `$Name = "path";` for every declared alias, space separated.
    pub fn preamble(&self) -> String {
        self.declared
            .iter()
            .map(|(alias, path)| {
                format!("{} = {};", alias, render_value(&PropertyValue::String(path.clone())))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
