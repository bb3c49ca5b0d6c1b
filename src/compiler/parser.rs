/// Parser for the markup dialect
use crate::compiler::ast::{Attribute, Document, Element, Markup, ScriptBlock};
use crate::compiler::tags;
use crate::error::{Error, Result};

const SCRIPT_TYPE: &str = "text/customui";

/// Deepest element nesting accepted. Building and serializing recurse per
/// level, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 256;

pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Convert byte position to (line, column) for error messages
    fn pos_to_line_col(&self, pos: usize) -> (usize, usize) {
        let before = &self.input[..pos.min(self.input.len())];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> Error {
        let (line, column) = self.pos_to_line_col(pos);
        Error::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn error_at_pos(&self, message: impl Into<String>) -> Error {
        self.error_at(self.pos, message)
    }

    pub fn parse(&mut self) -> Result<Document> {
        self.skip_trivia()?;
        let script = self.try_parse_script_block()?;

        let mut elements = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek_char() {
                None => break,
                Some('<') if self.peek_ahead(1) == Some('/') => {
                    return Err(self.error_at_pos("Closing tag without a matching opening tag"));
                }
                Some('<') => elements.push(self.parse_element()?),
                Some(_) => return Err(self.error_at_pos("Text outside of an element")),
            }
        }

        Ok(Document { script, elements })
    }

    /// Parse a leading `<script type="text/customui">` block. Returns `None`
    /// (without advancing) when the next tag is not a script.
    fn try_parse_script_block(&mut self) -> Result<Option<ScriptBlock>> {
        if !self.starts_with_tag("script") {
            return Ok(None);
        }

        let start = self.pos;
        self.expect_char('<')?;
        self.parse_name()?;
        let attributes = self.parse_attributes()?;
        self.skip_whitespace();
        self.expect_char('>')?;

        let script_type = attributes
            .iter()
            .rev()
            .find(|a| a.name.eq_ignore_ascii_case("type"))
            .and_then(|a| a.value.as_deref());
        if script_type != Some(SCRIPT_TYPE) {
            return Err(Error::unsupported_tag(
                "script",
                format!("only type=\"{}\" script blocks are supported", SCRIPT_TYPE),
            ));
        }

        let content_start = self.pos;
        let (line, _) = self.pos_to_line_col(content_start);
        let Some(offset) = find_ignore_case(&self.input[content_start..], "</script") else {
            return Err(self.error_at(start, "Unclosed <script> block"));
        };
        let content = self.input[content_start..content_start + offset].to_string();

        self.pos = content_start + offset + "</script".len();
        self.skip_whitespace();
        self.expect_char('>')?;

        Ok(Some(ScriptBlock { content, line }))
    }

    fn parse_element(&mut self) -> Result<Element> {
        let start = self.pos;
        let (line, column) = self.pos_to_line_col(start);
        self.expect_char('<')?;
        let tag = self.parse_name()?;

        if tag.eq_ignore_ascii_case("script") {
            return Err(Error::unsupported_tag(
                "script",
                "the script block must come before any markup",
            ));
        }
        if self.depth >= MAX_DEPTH {
            return Err(self.error_at(
                start,
                format!("Elements nested deeper than {} levels", MAX_DEPTH),
            ));
        }

        let attributes = self.parse_attributes()?;
        self.skip_whitespace();

        let children = if self.consume("/>") {
            Vec::new()
        } else {
            self.expect_char('>')?;
            if tags::is_void(&tag) {
                Vec::new()
            } else {
                self.depth += 1;
                let children = self.parse_children(&tag, start);
                self.depth -= 1;
                children?
            }
        };

        Ok(Element {
            tag,
            attributes,
            children,
            line,
            column,
        })
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => return Err(self.error_at_pos("Unexpected end of input inside a tag")),
                Some('>') => break,
                Some('/') if self.peek_ahead(1) == Some('>') => break,
                _ => {}
            }

            let name_start = self.pos;
            while let Some(ch) = self.peek_char() {
                if ch.is_whitespace() || matches!(ch, '=' | '>' | '/' | '"' | '\'' | '<') {
                    break;
                }
                self.advance_char();
            }
            let raw_name = &self.input[name_start..self.pos];
            if raw_name.is_empty() {
                let found = self.peek_char().unwrap_or('\0');
                return Err(self.error_at_pos(format!("Unexpected '{}' in attribute list", found)));
            }

            let (name, binding) = match raw_name.strip_prefix(':') {
                Some(stripped) if !stripped.is_empty() => (stripped.to_string(), true),
                Some(_) => return Err(self.error_at(name_start, "Empty binding attribute name")),
                None => (raw_name.to_string(), false),
            };

            self.skip_whitespace();
            let value = if self.peek_char() == Some('=') {
                self.advance_char();
                self.skip_whitespace();
                Some(self.parse_attribute_value()?)
            } else {
                None
            };

            attributes.push(Attribute {
                name,
                value,
                binding,
            });
        }

        Ok(attributes)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        match self.peek_char() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos;
                self.advance_char();
                let value_start = self.pos;
                while let Some(ch) = self.peek_char() {
                    if ch == quote {
                        let raw = &self.input[value_start..self.pos];
                        self.advance_char();
                        return Ok(decode_entities(raw));
                    }
                    self.advance_char();
                }
                Err(self.error_at(start, "Unterminated attribute value"))
            }
            Some(_) => {
                let start = self.pos;
                while let Some(ch) = self.peek_char() {
                    if ch.is_whitespace() || ch == '>' || (ch == '/' && self.peek_ahead(1) == Some('>')) {
                        break;
                    }
                    self.advance_char();
                }
                if start == self.pos {
                    return Err(self.error_at_pos("Expected attribute value"));
                }
                Ok(decode_entities(&self.input[start..self.pos]))
            }
            None => Err(self.error_at_pos("Expected attribute value, found EOF")),
        }
    }

    fn parse_children(&mut self, parent: &str, parent_start: usize) -> Result<Vec<Markup>> {
        let mut children = Vec::new();

        loop {
            if self.starts_with("<!--") {
                self.skip_comment()?;
                continue;
            }

            match self.peek_char() {
                None => {
                    return Err(self.error_at(parent_start, format!("Unclosed <{}>", parent)));
                }
                Some('<') if self.peek_ahead(1) == Some('/') => {
                    let close_start = self.pos;
                    self.advance_char();
                    self.advance_char();
                    let closing = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect_char('>')?;

                    if !closing.eq_ignore_ascii_case(parent) {
                        return Err(self.error_at(
                            close_start,
                            format!("Mismatched tags: opening <{}> vs closing </{}>", parent, closing),
                        ));
                    }
                    break;
                }
                Some('<') => children.push(Markup::Element(self.parse_element()?)),
                Some(_) => {
                    let start = self.pos;
                    while let Some(ch) = self.peek_char() {
                        if ch == '<' {
                            break;
                        }
                        self.advance_char();
                    }
                    let text = collapse_whitespace(&decode_entities(&self.input[start..self.pos]));
                    if !text.is_empty() {
                        children.push(Markup::Text(text));
                    }
                }
            }
        }

        Ok(children)
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            let valid = if self.pos == start {
                ch.is_alphanumeric() || ch == '_' || ch == '$'
            } else {
                ch.is_alphanumeric() || matches!(ch, '_' | '$' | '-' | '.' | ':')
            };
            if !valid {
                break;
            }
            self.advance_char();
        }

        if start == self.pos {
            return Err(self.error_at_pos("Expected tag name"));
        }

        Ok(self.input[start..self.pos].to_string())
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let start = self.pos;
        match self.input[self.pos..].find("-->") {
            Some(end) => {
                self.pos += end + "-->".len();
                Ok(())
            }
            None => Err(self.error_at(start, "Unclosed comment")),
        }
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    /// `<name` followed by whitespace, `>` or `/`, case-insensitive
    fn starts_with_tag(&self, name: &str) -> bool {
        let rest = &self.input[self.pos..];
        let Some(after_lt) = rest.strip_prefix('<') else {
            return false;
        };
        match after_lt.get(..name.len()) {
            Some(candidate) if candidate.eq_ignore_ascii_case(name) => after_lt[name.len()..]
                .chars()
                .next()
                .map_or(false, |c| c.is_whitespace() || c == '>' || c == '/'),
            _ => false,
        }
    }

    fn consume(&mut self, token: &str) -> bool {
        if self.starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.pos += ch.len_utf8();
                Ok(())
            }
            Some(ch) => Err(self.error_at_pos(format!("Expected '{}', found '{}'", expected, ch))),
            None => Err(self.error_at_pos(format!("Expected '{}', found EOF", expected))),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance_char();
        }
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack
                .get(i..i + needle.len())
                .map_or(false, |candidate| candidate.eq_ignore_ascii_case(needle))
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of entities markup authors actually write. Unknown
/// entities are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').and_then(|semi| {
            let entity = &candidate[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(|c| c == 'x' || c == 'X') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|ch| (ch, semi + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Document> {
        Parser::new(source).parse()
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "<div>".repeat(depth), "</div>".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(parse(&nested(MAX_DEPTH)).is_ok());

        match parse(&nested(MAX_DEPTH + 1)) {
            Err(Error::Syntax { line, column, message }) => {
                assert_eq!((line, column), (1, MAX_DEPTH * "<div>".len() + 1));
                assert!(message.contains("nested deeper"));
            }
            other => panic!("expected a nesting error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_elements() {
        let doc = parse(r#"<div id="c"><label id="t">Hello</label></div>"#).unwrap();
        assert!(doc.script.is_none());
        assert_eq!(doc.elements.len(), 1);

        let root = &doc.elements[0];
        assert_eq!(root.tag, "div");
        assert_eq!(root.attribute("id").and_then(|a| a.value.as_deref()), Some("c"));
        match &root.children[0] {
            Markup::Element(label) => {
                assert_eq!(label.tag, "label");
                assert_eq!(label.children, vec![Markup::Text("Hello".into())]);
            }
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_script_block_extracted() {
        let source = "<!-- header -->\n<script type=\"text/customui\">\n@Title = \"X\"\n</script>\n<h1>@Title</h1>";
        let doc = parse(source).unwrap();
        let script = doc.script.unwrap();
        assert_eq!(script.line, 2);
        assert!(script.content.contains("@Title = \"X\""));
        assert_eq!(doc.elements.len(), 1);
    }

    #[test]
    fn test_script_with_other_type_rejected() {
        let err = parse("<script>alert(1)</script><div></div>").unwrap_err();
        assert!(matches!(err, Error::UnsupportedTag { .. }));

        let err = parse("<div></div><script type=\"text/customui\"></script>").unwrap_err();
        assert!(matches!(err, Error::UnsupportedTag { .. }));
    }

    #[test]
    fn test_attributes() {
        let doc = parse(r#"<input type=checkbox checked :value="Model.Enabled" title='a &amp; b'/>"#).unwrap();
        let attrs = &doc.elements[0].attributes;
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0].value.as_deref(), Some("checkbox"));
        assert_eq!(attrs[1].value, None);
        assert!(attrs[2].binding);
        assert_eq!(attrs[2].name, "value");
        assert_eq!(attrs[2].value.as_deref(), Some("Model.Enabled"));
        assert_eq!(attrs[3].value.as_deref(), Some("a & b"));
    }

    #[test]
    fn test_void_elements_and_siblings() {
        let doc = parse("<div><input type=\"text\"><img src=\"a.png\"></div>\n<div/>").unwrap();
        assert_eq!(doc.elements.len(), 2);
        assert_eq!(doc.elements[0].children.len(), 2);
    }

    #[test]
    fn test_alias_tag_name() {
        let doc = parse("<$C.TextButton id=\"Ok\">Go</$C.TextButton>").unwrap();
        assert_eq!(doc.elements[0].tag, "$C.TextButton");
    }

    #[test]
    fn test_text_is_collapsed_and_decoded() {
        let doc = parse("<p>\n  Fish &amp;\n   Chips &#33;\n</p>").unwrap();
        assert_eq!(doc.elements[0].children, vec![Markup::Text("Fish & Chips !".into())]);
    }

    #[test]
    fn test_syntax_errors_have_positions() {
        match parse("<div>\n  <span>text</div>") {
            Err(Error::Syntax { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("Mismatched"), "{}", message);
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
        assert!(matches!(parse("<div>"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("hello"), Err(Error::Syntax { .. })));
        assert!(matches!(parse("<div title=\"open></div>"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&lt;b&gt; &#x41; &unknown; & x"), "<b> A &unknown; & x");
    }
}
