/// Compile-time variable table and `@Name` substitution
use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::{Error, Result};

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").expect("valid reference regex"))
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Variables in declaration order. Redefining a name keeps its original
/// position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    values: IndexMap<String, String>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if !is_identifier(name) {
            return Err(Error::InvalidVariableName(name.to_string()));
        }
        self.values.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Apply caller overrides on top of the current values.
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (name, value) in overrides {
            self.set(name, value.clone())?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &IndexMap<String, String> {
        &self.values
    }

    /// Replace every known `@Name` in `text` with its value. Unknown names are
    /// left as written.
    pub fn substitute(&self, text: &str) -> String {
        if self.values.is_empty() || !text.contains('@') {
            return text.to_string();
        }
        reference_pattern()
            .replace_all(text, |caps: &Captures| match self.values.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
