pub mod errors;
pub mod context;
pub mod engine;
pub mod snippets;
pub mod tags;       // tag registry, built-in tags, render + capture
pub mod template;
pub mod forloop;
mod expression;
mod comparison;
mod parser;

use serde_json::Value;

pub use context::Context;
pub use engine::{EngineOptions, Environment};
pub use errors::{Result, TemplateError};
pub use snippets::{FileSnippets, MemorySnippets, SnippetProvider, SnippetStore};
pub use template::Template;

/// Convenience: render `source` in a default environment with no snippets
/// registered.
pub fn render(source: &str, assigns: &Value) -> Result<String> {
    Environment::default().render_str(source, assigns)
}
