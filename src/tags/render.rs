use serde_json::Value;
use tracing::debug;

use super::{Registry, Renderable, Tag};
use crate::context::Context;
use crate::errors::{Result, TemplateError};
use crate::forloop::{iterable, ForLoop};
use crate::parser::Parser;
use crate::snippets::SnippetProvider;
use crate::template::TokenStream;

/// Snippets rendering snippets deeper than this abort the render.
pub const MAX_RENDER_DEPTH: usize = 100;

const DEFAULT_OBJECT_ALIAS: &str = "object";
const DEFAULT_ITEM_ALIAS: &str = "item";

/// Parsed `render` markup. Expressions are kept as raw source fragments and
/// resolved against the caller's context at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub snippet: String,
    pub value: Option<String>,
    pub iterate: bool,
    pub alias: Option<String>,
    /// Source order; a repeated key keeps its first position and last value.
    pub params: Vec<(String, String)>,
}

impl RenderRequest {
    /// `'snippet' [with|for value] [as alias] [, key: value]*`
    pub fn parse(tag_name: &str, markup: &str) -> Result<Self> {
        parse_markup(markup).map_err(|_| {
            TemplateError::Syntax(format!(
                "Syntax Error in '{tag_name}' - Valid syntax: {tag_name} 'snippet' [with object|for array] [as alias] [, key: value]"
            ))
        })
    }

    fn alias(&self) -> &str {
        match (&self.alias, self.iterate) {
            (Some(alias), _) => alias.as_str(),
            (None, true) => DEFAULT_ITEM_ALIAS,
            (None, false) => DEFAULT_OBJECT_ALIAS,
        }
    }
}

fn parse_markup(markup: &str) -> std::result::Result<RenderRequest, crate::parser::ParseError> {
    let mut p = Parser::new(markup);
    p.skip_ws();
    let snippet = p.parse_fragment()?.to_string();

    p.skip_ws();
    let iterate = if p.consume_keyword("with") {
        Some(false)
    } else if p.consume_keyword("for") {
        Some(true)
    } else {
        None
    };
    let mut value = None;
    if iterate.is_some() {
        p.skip_ws();
        value = Some(p.parse_fragment()?.to_string());
        p.skip_ws();
    }

    let mut alias = None;
    if p.consume_keyword("as") {
        p.skip_ws();
        alias = Some(p.parse_identifier()?);
    }

    let mut params: Vec<(String, String)> = Vec::new();
    loop {
        p.skip_ws();
        p.consume_char(',');
        p.skip_ws();
        if p.eof() {
            break;
        }
        let key = p.parse_identifier()?;
        p.skip_ws();
        p.expect(':')?;
        p.skip_ws();
        let raw = p.parse_fragment()?.to_string();
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = raw,
            None => params.push((key, raw)),
        }
    }

    Ok(RenderRequest { snippet, value, iterate: iterate.unwrap_or(false), alias, params })
}

/// Renders a snippet in an isolated scope: `{% render 'name' ... %}`.
pub struct RenderTag;

impl Tag for RenderTag {
    fn name(&self) -> &'static str { "render" }

    fn parse(&self, tag_name: &str, markup: &str, _: &mut TokenStream<'_>, _: &Registry) -> Result<Box<dyn Renderable>> {
        Ok(Box::new(ScopedRender { request: RenderRequest::parse(tag_name, markup)? }))
    }
}

#[derive(Debug)]
pub struct ScopedRender {
    request: RenderRequest,
}

impl ScopedRender {
    fn snippet_name(&self, ctx: &Context<'_>) -> String {
        let raw = &self.request.snippet;
        let name = match ctx.get(raw).cloned().or_else(|| ctx.evaluate(raw)) {
            Some(Value::String(s)) => s,
            _ => raw.clone(),
        };
        name.replace(['\'', '"'], "")
    }

    /// Variable, then expression, then the raw text itself.
    fn resolve_param(ctx: &Context<'_>, raw: &str) -> Value {
        ctx.get(raw)
            .filter(|v| !v.is_null())
            .cloned()
            .or_else(|| ctx.evaluate(raw))
            .unwrap_or_else(|| Value::String(raw.to_string()))
    }

    fn bind_params(&self, caller: &Context<'_>, scope: &mut Context<'_>) {
        for (key, raw) in &self.request.params {
            scope.set(key.clone(), Self::resolve_param(caller, raw));
        }
    }
}

impl Renderable for ScopedRender {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        if ctx.depth() >= MAX_RENDER_DEPTH {
            return Err(TemplateError::Runtime(format!(
                "snippet nesting exceeds {MAX_RENDER_DEPTH} levels"
            )));
        }
        let env = ctx.environment();
        let name = self.snippet_name(ctx);
        let source = env
            .snippets()
            .lookup(&name)?
            .ok_or_else(|| TemplateError::UnknownSnippet(name.clone()))?;
        let value = self
            .request
            .value
            .as_deref()
            .and_then(|raw| ctx.evaluate(raw))
            .unwrap_or(Value::Null);
        let alias = self.request.alias();

        if !self.request.iterate {
            let mut scope = ctx.isolated_child();
            if self.request.value.is_some() {
                scope.set(alias, value);
            }
            self.bind_params(ctx, &mut scope);
            return env.parse(&source)?.render_to(&mut scope, out);
        }

        let Some(items) = iterable(&value) else {
            debug!(snippet = %name, "render target is not iterable, producing no output");
            return Ok(());
        };
        debug!(snippet = %name, count = items.len(), "rendering snippet per item");
        let length = items.len();
        for (i, item) in items.into_iter().enumerate() {
            let mut scope = ctx.isolated_child();
            scope.set(alias, item);
            scope.set("forloop", ForLoop::new(i, length).to_value());
            self.bind_params(ctx, &mut scope);
            env.parse(&source)?.render_to(&mut scope, out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(markup: &str) -> RenderRequest {
        RenderRequest::parse("render", markup).unwrap()
    }

    #[test]
    fn bare_snippet() {
        let req = parse("'simple'");
        assert_eq!(req.snippet, "'simple'");
        assert_eq!(req.value, None);
        assert!(!req.iterate);
        assert_eq!(req.alias(), "object");
        assert!(req.params.is_empty());
    }

    #[test]
    fn with_clause_and_alias() {
        let req = parse("'simple' with 'Inner' as name");
        assert_eq!(req.value.as_deref(), Some("'Inner'"));
        assert!(!req.iterate);
        assert_eq!(req.alias(), "name");
    }

    #[test]
    fn for_clause_defaults_alias_to_item() {
        let req = parse("'for_loop' for items");
        assert!(req.iterate);
        assert_eq!(req.value.as_deref(), Some("items"));
        assert_eq!(req.alias(), "item");
    }

    #[test]
    fn params_comma_or_space_separated_last_wins() {
        let req = parse("'card', title: 'A' size: 2, title: product.title");
        assert_eq!(
            req.params,
            vec![
                ("title".to_string(), "product.title".to_string()),
                ("size".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn bareword_snippet_with_everything() {
        let req = parse("card_name for products as product, featured: true");
        assert_eq!(req.snippet, "card_name");
        assert_eq!(req.alias.as_deref(), Some("product"));
        assert_eq!(req.params, vec![("featured".to_string(), "true".to_string())]);
    }

    #[test]
    fn malformed_markup_is_syntax_error() {
        for markup in ["", "   ", "'x' with", "'x' as", "'x' name 'y'", "'x', : 1", "'unterminated"] {
            let err = RenderRequest::parse("render", markup).unwrap_err();
            assert!(
                matches!(&err, TemplateError::Syntax(msg) if msg.contains("Valid syntax: render 'snippet'")),
                "markup {markup:?} gave {err:?}"
            );
        }
    }
}
