use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::context::Context;
use crate::errors::{Result, TemplateError};
use crate::snippets::{FileSnippets, SnippetProvider, SnippetStore};
use crate::tags::{register_custom_tags, Registry};
use crate::template::Template;

/// Engine configuration; every field has a default so partial JSON works.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Directory searched for snippets not registered in memory.
    pub snippets_dir: PathBuf,
    /// Snippet file extension, without the dot.
    pub extension: String,
    /// Trim surrounding whitespace from [`Environment::render_file`] output.
    pub strip_output: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            snippets_dir: PathBuf::from("snippets"),
            extension: "liquid".to_string(),
            strip_output: true,
        }
    }
}

impl EngineOptions {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// One logical execution context: the tag table plus its own snippet store.
/// Separate environments never share snippets or resets.
pub struct Environment {
    options: EngineOptions,
    tags: Registry,
    snippets: SnippetStore,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Environment {
    /// Snippets fall back to files under `options.snippets_dir`.
    pub fn new(options: EngineOptions) -> Self {
        let files = FileSnippets::new(options.snippets_dir.clone(), options.extension.clone());
        Self::with_provider(options, files)
    }

    /// Snippets fall back to `provider` instead of the file system.
    pub fn with_provider(options: EngineOptions, provider: impl SnippetProvider + 'static) -> Self {
        let mut tags = Registry::with_builtins();
        register_custom_tags(&mut tags);
        Self {
            options,
            tags,
            snippets: SnippetStore::with_fallback(provider),
        }
    }

    pub fn tags(&self) -> &Registry {
        &self.tags
    }

    /// Register extra tags before parsing templates that use them.
    pub fn tags_mut(&mut self) -> &mut Registry {
        &mut self.tags
    }

    pub fn snippets(&self) -> &SnippetStore {
        &self.snippets
    }

    pub fn register_snippet(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.snippets.register(name, content);
    }

    pub fn reset_snippets(&mut self) {
        debug!("resetting snippet store");
        self.snippets.reset();
    }

    pub fn parse(&self, source: &str) -> Result<Template> {
        Template::parse(source, &self.tags)
    }

    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Template> {
        self.parse(&std::fs::read_to_string(path)?)
    }

    /// Render with `assigns` (a JSON object, or null for none) as the
    /// outermost scope.
    pub fn render(&self, template: &Template, assigns: &Value) -> Result<String> {
        let assigns = match assigns {
            Value::Object(map) => map.clone(),
            Value::Null => Default::default(),
            other => {
                return Err(TemplateError::Runtime(format!(
                    "assigns must be a JSON object, got {other}"
                )))
            }
        };
        let mut ctx = Context::with_assigns(self, assigns);
        template.render(&mut ctx)
    }

    pub fn render_str(&self, source: &str, assigns: &Value) -> Result<String> {
        self.render(&self.parse(source)?, assigns)
    }

    pub fn render_file(&self, path: impl AsRef<Path>, assigns: &Value) -> Result<String> {
        let rendered = self.render(&self.parse_file(path)?, assigns)?;
        Ok(if self.options.strip_output {
            rendered.trim().to_string()
        } else {
            rendered
        })
    }
}
