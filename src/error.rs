use std::path::PathBuf;

/// Errors produced while compiling or watching templates.
///
/// Every variant is terminal for the call that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("[Line {line}:{column}] {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("[Script line {line}] {message}")]
    ScriptSyntax { line: usize, message: String },
    #[error("[Script line {line}] unterminated string literal")]
    UnterminatedLiteral { line: usize },
    #[error("unsupported tag <{tag}>: {reason}")]
    UnsupportedTag { tag: String, reason: String },
    #[error("unsupported style property '{0}'")]
    UnsupportedStyleProperty(String),
    #[error("invalid value for style property '{property}': {message}")]
    InvalidStyleValue { property: String, message: String },
    #[error("invalid variable name '{0}' (expected letters, digits and underscores)")]
    InvalidVariableName(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to rasterize image '{src}': {message}")]
    Image { src: String, message: String },
    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    pub(crate) fn unsupported_tag(tag: &str, reason: impl Into<String>) -> Self {
        Error::UnsupportedTag {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_style(property: &str, message: impl Into<String>) -> Self {
        Error::InvalidStyleValue {
            property: property.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
