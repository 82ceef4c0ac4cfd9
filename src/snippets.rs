use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::errors::Result;

/// Source of snippet text by name. `Ok(None)` means "not found"; whether
/// that is fatal is up to the caller.
pub trait SnippetProvider {
    fn lookup(&self, name: &str) -> Result<Option<String>>;
}

/// Snippets registered in memory, e.g. by test setup.
#[derive(Debug, Clone, Default)]
pub struct MemorySnippets {
    inner: HashMap<String, String>,
}

impl MemorySnippets {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.inner.insert(name.into(), content.into());
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl SnippetProvider for MemorySnippets {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        Ok(self.inner.get(name).cloned())
    }
}

/// Snippets stored as `<dir>/<name>.<extension>`.
#[derive(Debug, Clone)]
pub struct FileSnippets {
    dir: PathBuf,
    extension: String,
}

impl FileSnippets {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { dir: dir.into(), extension: extension.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }
}

impl SnippetProvider for FileSnippets {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "snippet not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Snippet store owned by one environment: registered snippets first, then
/// the fallback provider, whose hits are cached until [`SnippetStore::reset`].
#[derive(Default)]
pub struct SnippetStore {
    registered: MemorySnippets,
    cache: RefCell<HashMap<String, String>>,
    fallback: Option<Box<dyn SnippetProvider>>,
}

impl SnippetStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_fallback(fallback: impl SnippetProvider + 'static) -> Self {
        Self {
            fallback: Some(Box::new(fallback)),
            ..Self::default()
        }
    }

    pub fn register(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.registered.register(name, content);
    }

    /// Forget registered snippets and cached fallback loads.
    pub fn reset(&mut self) {
        self.registered.clear();
        self.cache.get_mut().clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl SnippetProvider for SnippetStore {
    fn lookup(&self, name: &str) -> Result<Option<String>> {
        if let Some(content) = self.registered.lookup(name)? {
            return Ok(Some(content));
        }
        if let Some(content) = self.cache.borrow().get(name) {
            return Ok(Some(content.clone()));
        }
        let Some(fallback) = &self.fallback else {
            return Ok(None);
        };
        let loaded = fallback.lookup(name)?;
        if let Some(content) = &loaded {
            debug!(snippet = name, "caching loaded snippet");
            self.cache.borrow_mut().insert(name.to_string(), content.clone());
        }
        Ok(loaded)
    }
}
