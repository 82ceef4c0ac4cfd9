use serde_json::{Map, Value};

use crate::engine::Environment;
use crate::expression::parse_expr;

/// Variable scopes for one render, innermost last, plus a handle to the
/// environment that owns the tag registry and the snippet store.
pub struct Context<'env> {
    scopes: Vec<Map<String, Value>>,
    env: &'env Environment,
    depth: usize,
}

impl<'env> Context<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self::with_assigns(env, Map::new())
    }

    pub fn with_assigns(env: &'env Environment, assigns: Map<String, Value>) -> Self {
        Self {
            scopes: vec![assigns],
            env,
            depth: 0,
        }
    }

    pub fn environment(&self) -> &'env Environment {
        self.env
    }

    /// Number of isolated children between this context and the top-level one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Look a name up from the innermost scope outwards.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bind `name` in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Map::new());
    }

    /// The outermost scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// A fresh context sharing this one's environment but none of its bindings.
    pub fn isolated_child(&self) -> Context<'env> {
        Context {
            scopes: vec![Map::new()],
            env: self.env,
            depth: self.depth + 1,
        }
    }

    /// Parse and evaluate `raw` as an expression. `None` when it does not
    /// parse or evaluates to nil.
    pub fn evaluate(&self, raw: &str) -> Option<Value> {
        let expr = parse_expr(raw).ok()?;
        Some(expr.eval(self)).filter(|v| !v.is_null())
    }
}
