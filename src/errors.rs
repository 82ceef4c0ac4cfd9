use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while parsing or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Malformed template or tag markup, reported at parse time.
    #[error("Liquid syntax error: {0}")]
    Syntax(String),

    /// The snippet provider had no content for a name a render tag asked for.
    #[error("Unknown snippet '{0}'")]
    UnknownSnippet(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ParseError> for TemplateError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidSyntax(msg) => TemplateError::Syntax(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
