/// Syntax tree of a markup document

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub script: Option<ScriptBlock>,
    pub elements: Vec<Element>,
}

/// Raw content of the leading `<script type="text/customui">` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptBlock {
    pub content: String,
    pub line: usize, // document line the content starts on
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String, // as written, including any `$Alias.` prefix
    pub attributes: Vec<Attribute>,
    pub children: Vec<Markup>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,          // without the `:` binding marker
    pub value: Option<String>, // None for bare boolean attributes
    pub binding: bool,         // written as `:name="expr"`
}

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .rev()
            .find(|a| !a.binding && a.name.eq_ignore_ascii_case(name))
    }
}
