/// Output of one parse call
use indexmap::IndexMap;

use crate::compiler::aliases::AliasContext;
use crate::compiler::node::ComponentNode;
use crate::compiler::variables::VariableTable;
use crate::error::Result;

/// Compiled component trees plus the variables they were compiled with.
///
/// Variables are substituted while parsing. [`CompiledTemplate::set_variable`]
/// therefore only updates [`CompiledTemplate::variables`]; it never changes
/// what [`CompiledTemplate::build`] returns. Re-parse with an override map to
/// change the output.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    roots: Vec<ComponentNode>,
    variables: VariableTable,
    aliases: AliasContext,
}

impl CompiledTemplate {
    pub fn new(roots: Vec<ComponentNode>, variables: VariableTable, aliases: AliasContext) -> Self {
        CompiledTemplate {
            roots,
            variables,
            aliases,
        }
    }

    /// The full command string: declared aliases first, then one line per
    /// root.
    pub fn build(&self) -> String {
        let mut lines = Vec::with_capacity(self.roots.len() + 1);
        let preamble = self.aliases.preamble();
        if !preamble.is_empty() {
            lines.push(preamble);
        }
        lines.extend(self.roots.iter().map(ComponentNode::build));
        lines.join("\n")
    }

    /// One command string per top-level element, without the alias preamble.
    pub fn commands(&self) -> Vec<String> {
        self.roots.iter().map(ComponentNode::build).collect()
    }

    pub fn roots(&self) -> &[ComponentNode] {
        &self.roots
    }

    pub fn variables(&self) -> &IndexMap<String, String> {
        self.variables.as_map()
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name)
    }

    pub fn aliases(&self) -> &AliasContext {
        &self.aliases
    }

    /// Record a variable value. Does not affect [`CompiledTemplate::build`].
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        self.variables.set(name, value)
    }
}
