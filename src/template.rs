use serde_json::Value;

use crate::context::Context;
use crate::errors::{Result, TemplateError};
use crate::expression::{parse_expr, to_output, Expr};
use crate::tags::{Registry, Renderable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a str),
    /// Inner text of `{{ ... }}`, trimmed.
    Output(&'a str),
    /// Inner text of `{% ... %}`, trimmed.
    Tag(&'a str),
}

/// Split source into text, output and tag tokens, applying `-` whitespace
/// control to the neighbouring text.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut trim_next = false;
    loop {
        let next = [rest.find("{{"), rest.find("{%")].into_iter().flatten().min();
        let Some(pos) = next else {
            push_text(&mut tokens, rest, trim_next, false);
            return Ok(tokens);
        };
        let is_output = rest[pos..].starts_with("{{");
        let close = if is_output { "}}" } else { "%}" };
        let after = &rest[pos + 2..];
        let end = after.find(close).ok_or_else(|| {
            TemplateError::Syntax(format!("'{}' was not properly terminated with '{close}'", &rest[pos..pos + 2]))
        })?;
        let mut inner = &after[..end];
        let trim_left = inner.starts_with('-');
        if trim_left {
            inner = &inner[1..];
        }
        let trim_right = inner.ends_with('-');
        if trim_right {
            inner = &inner[..inner.len() - 1];
        }
        push_text(&mut tokens, &rest[..pos], trim_next, trim_left);
        let inner = inner.trim();
        tokens.push(if is_output { Token::Output(inner) } else { Token::Tag(inner) });
        trim_next = trim_right;
        rest = &after[end + 2..];
    }
}

fn push_text<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str, trim_start: bool, trim_end: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    let text = if trim_end { text.trim_end() } else { text };
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
}

/// Cursor over tokens, handed to tags so block tags can consume their body.
pub struct TokenStream<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: Vec<Token<'a>>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }
}

/// Split tag token text into its name and markup.
pub fn split_tag(inner: &str) -> (&str, &str) {
    match inner.split_once(char::is_whitespace) {
        Some((name, markup)) => (name, markup.trim()),
        None => (inner, ""),
    }
}

#[derive(Debug)]
pub enum Node {
    Text(String),
    Output(Expr),
    Tag(Box<dyn Renderable>),
}

/// The tag that ended a block body, e.g. `else` or `endfor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEnd {
    pub name: String,
    pub markup: String,
}

/// A parsed template, or the body of a block tag.
#[derive(Debug, Default)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str, registry: &Registry) -> Result<Template> {
        let mut tokens = TokenStream::new(tokenize(source)?);
        let (template, _) = Template::parse_until(&mut tokens, registry, &[])?;
        Ok(template)
    }

    /// Parse nodes until one of `terminators` (or end of input) is reached.
    pub fn parse_until(
        tokens: &mut TokenStream<'_>,
        registry: &Registry,
        terminators: &[&str],
    ) -> Result<(Template, Option<BlockEnd>)> {
        let mut nodes = Vec::new();
        while let Some(tok) = tokens.next_token() {
            match tok {
                Token::Text(text) => nodes.push(Node::Text(text.to_string())),
                Token::Output("") => nodes.push(Node::Output(Expr::Literal(Value::Null))),
                Token::Output(inner) => nodes.push(Node::Output(parse_expr(inner)?)),
                Token::Tag(inner) => {
                    let (name, markup) = split_tag(inner);
                    if terminators.contains(&name) {
                        let end = BlockEnd {
                            name: name.to_string(),
                            markup: markup.to_string(),
                        };
                        return Ok((Template { nodes }, Some(end)));
                    }
                    let tag = registry.get(name).ok_or_else(|| {
                        TemplateError::Syntax(format!(
                            "Unknown tag '{name}' (known tags: {})",
                            registry.names().join(", ")
                        ))
                    })?;
                    nodes.push(Node::Tag(tag.parse(name, markup, tokens, registry)?));
                }
            }
        }
        Ok((Template { nodes }, None))
    }

    /// Parse a block body that must be closed by one of `terminators`.
    pub fn parse_block(
        tag_name: &str,
        tokens: &mut TokenStream<'_>,
        registry: &Registry,
        terminators: &[&str],
    ) -> Result<(Template, BlockEnd)> {
        match Template::parse_until(tokens, registry, terminators)? {
            (body, Some(end)) => Ok((body, end)),
            (_, None) => Err(TemplateError::Syntax(format!(
                "'{tag_name}' tag was never closed"
            ))),
        }
    }

    pub fn render(&self, ctx: &mut Context<'_>) -> Result<String> {
        let mut out = String::new();
        self.render_to(ctx, &mut out)?;
        Ok(out)
    }

    pub fn render_to(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => out.push_str(&to_output(&expr.eval(ctx))),
                Node::Tag(tag) => tag.render(ctx, out)?,
            }
        }
        Ok(())
    }
}
