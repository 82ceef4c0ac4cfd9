use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::errors::Result;
use crate::template::TokenStream;

pub mod builtins;
pub mod capture;
pub mod render;

/// A parsed tag instance, rendered once per template execution that reaches it.
pub trait Renderable: fmt::Debug + Send + Sync {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()>;
}

/// Factory for a named tag. Block tags pull their body from `tokens`.
pub trait Tag: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(
        &self,
        tag_name: &str,
        markup: &str,
        tokens: &mut TokenStream<'_>,
        registry: &Registry,
    ) -> Result<Box<dyn Renderable>>;
}

/// Tag table consulted by the template parser. Cloning shares the table.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Arc<dyn Tag>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// `assign`, `for`, `if`, `unless` and `comment`.
    pub fn with_builtins() -> Self {
        let mut map: HashMap<String, Arc<dyn Tag>> = HashMap::new();
        map.insert("assign".into(), Arc::new(builtins::Assign));
        map.insert("for".into(), Arc::new(builtins::For));
        map.insert("if".into(), Arc::new(builtins::If));
        map.insert("unless".into(), Arc::new(builtins::Unless));
        map.insert("comment".into(), Arc::new(builtins::Comment));
        Self { inner: Arc::new(map) }
    }

    pub fn register<T: Tag + 'static>(&mut self, tag: T) {
        let name = tag.name();
        self.register_as(name, tag);
    }

    /// Register `tag` under a name other than its own, e.g. an alias.
    pub fn register_as<T: Tag + 'static>(&mut self, name: &str, tag: T) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(name.to_string(), Arc::new(tag));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tag>> {
        self.inner.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.keys().sorted().cloned().collect()
    }
}

/// Install the scoped `render` tag (also reachable as `include`) and `capture`.
pub fn register_custom_tags(registry: &mut Registry) {
    registry.register(render::RenderTag);
    registry.register_as("include", render::RenderTag);
    registry.register(capture::CaptureTag);
}
