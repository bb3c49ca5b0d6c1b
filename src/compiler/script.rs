/// Evaluator for the `<script type="text/customui">` declaration block
///
/// Grammar, one declaration per line:
///
/// ```text
/// @Name = "string"      variable, string literal
/// @Name = 42 | true     variable, number or boolean literal
/// $Alias = "path"       alias declaration
/// ```
///
/// Blank lines and `//` comments are skipped. A trailing `;` is optional.
use crate::compiler::aliases::AliasContext;
use crate::compiler::variables::{is_identifier, VariableTable};
use crate::error::{Error, Result};

/// Result of evaluating a script block.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub variables: VariableTable,
    pub aliases: AliasContext,
}

/// Evaluate `content` line by line. `first_line` is the document line the
/// content starts on, used for error positions.
pub fn evaluate(content: &str, first_line: usize) -> Result<ScriptOutput> {
    let mut output = ScriptOutput::default();

    for (offset, raw) in content.lines().enumerate() {
        let line_no = first_line + offset;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let Some((target, value)) = line.split_once('=') else {
            return Err(Error::ScriptSyntax {
                line: line_no,
                message: format!(
                    "expected `@Name = value` or `$Alias = \"path\"`, found {:?}",
                    line
                ),
            });
        };
        let target = target.trim();
        let value = value.trim();

        if let Some(name) = target.strip_prefix('@') {
            if !is_identifier(name) {
                return Err(Error::InvalidVariableName(name.to_string()));
            }
            let literal = match parse_literal(value, line_no)? {
                Literal::String(s) => output.variables.substitute(&s),
                Literal::Bare(s) => s,
            };
            output.variables.set(name, literal)?;
        } else if let Some(alias) = target.strip_prefix('$') {
            if !is_identifier(alias) {
                return Err(Error::ScriptSyntax {
                    line: line_no,
                    message: format!("invalid alias name {:?}", target),
                });
            }
            match parse_literal(value, line_no)? {
                Literal::String(path) => {
                    output.aliases.declare(target, path);
                }
                Literal::Bare(_) => {
                    return Err(Error::ScriptSyntax {
                        line: line_no,
                        message: format!("alias {} must be bound to a quoted path", target),
                    });
                }
            }
        } else {
            return Err(Error::ScriptSyntax {
                line: line_no,
                message: format!(
                    "declaration target {:?} must start with '@' (variable) or '$' (alias)",
                    target
                ),
            });
        }
    }

    Ok(output)
}

enum Literal {
    String(String),
    Bare(String),
}

fn parse_literal(value: &str, line: usize) -> Result<Literal> {
    if let Some(body) = value.strip_prefix('"') {
        let mut literal = String::new();
        let mut chars = body.char_indices();
        let mut end = None;

        while let Some((i, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, 'n')) => literal.push('\n'),
                    Some((_, 't')) => literal.push('\t'),
                    Some((_, escaped)) => literal.push(escaped),
                    None => break,
                },
                '"' => {
                    end = Some(i + 1);
                    break;
                }
                _ => literal.push(ch),
            }
        }

        let end = end.ok_or(Error::UnterminatedLiteral { line })?;
        let rest = body[end..].trim();
        if !rest.is_empty() && rest != ";" {
            return Err(Error::ScriptSyntax {
                line,
                message: format!("unexpected {:?} after string literal", rest),
            });
        }
        return Ok(Literal::String(literal));
    }

    let bare = value.strip_suffix(';').unwrap_or(value).trim();
    let is_number = bare.parse::<f64>().map_or(false, |n| n.is_finite());
    if bare == "true" || bare == "false" || is_number {
        Ok(Literal::Bare(bare.to_string()))
    } else if bare.starts_with('\'') {
        Err(Error::ScriptSyntax {
            line,
            message: "string literals use double quotes".to_string(),
        })
    } else {
        Err(Error::ScriptSyntax {
            line,
            message: format!("expected a quoted string, number or boolean, found {:?}", bare),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_and_aliases() {
        let script = r#"
            // shared
            @Title = "Shop";
            @Columns = 3
            @Enabled = true
            $Shop = "Shop/Common.ui";
        "#;
        let output = evaluate(script, 1).unwrap();
        assert_eq!(output.variables.get("Title"), Some("Shop"));
        assert_eq!(output.variables.get("Columns"), Some("3"));
        assert_eq!(output.variables.get("Enabled"), Some("true"));
        assert_eq!(output.aliases.path_of("$Shop"), Some("Shop/Common.ui"));
    }

    #[test]
    fn test_later_declaration_wins() {
        let output = evaluate("@A = \"one\"\n@A = \"two\"", 1).unwrap();
        assert_eq!(output.variables.get("A"), Some("two"));
    }

    #[test]
    fn test_string_references_earlier_variables() {
        let output = evaluate("@First = \"Ada\"\n@Full = \"@First Lovelace\"", 1).unwrap();
        assert_eq!(output.variables.get("Full"), Some("Ada Lovelace"));
    }

    #[test]
    fn test_escapes() {
        let output = evaluate(r#"@Quote = "say \"hi\"; ok""#, 1).unwrap();
        assert_eq!(output.variables.get("Quote"), Some("say \"hi\"; ok"));
    }

    #[test]
    fn test_unterminated_literal() {
        let err = evaluate("\n@Title = \"open", 4).unwrap_err();
        assert!(matches!(err, Error::UnterminatedLiteral { line: 5 }));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(
            evaluate("Title = \"x\"", 1),
            Err(Error::ScriptSyntax { .. })
        ));
        assert!(matches!(
            evaluate("@Title \"x\"", 1),
            Err(Error::ScriptSyntax { .. })
        ));
        assert!(matches!(
            evaluate("@Title = banana", 1),
            Err(Error::ScriptSyntax { .. })
        ));
        assert!(matches!(
            evaluate("@Title = \"x\" extra", 1),
            Err(Error::ScriptSyntax { .. })
        ));
    }

    #[test]
    fn test_invalid_variable_name() {
        assert!(matches!(
            evaluate("@my-title = \"x\"", 1),
            Err(Error::InvalidVariableName(name)) if name == "my-title"
        ));
    }
}
