use super::{Registry, Renderable, Tag};
use crate::comparison::{parse_condition, Condition};
use crate::context::Context;
use crate::errors::{Result, TemplateError};
use crate::expression::{parse_expr, Expr};
use crate::forloop::{iterable, ForLoop};
use crate::parser::Parser;
use crate::template::{split_tag, Template, Token, TokenStream};

fn syntax(msg: impl Into<String>) -> TemplateError {
    TemplateError::Syntax(msg.into())
}

/// `{% assign name = expr %}`, written to the innermost scope like `capture`.
pub struct Assign;

#[derive(Debug)]
pub struct AssignNode {
    name: String,
    value: Expr,
}

impl Tag for Assign {
    fn name(&self) -> &'static str { "assign" }

    fn parse(&self, _: &str, markup: &str, _: &mut TokenStream<'_>, _: &Registry) -> Result<Box<dyn Renderable>> {
        let (name, value) = markup
            .split_once('=')
            .ok_or_else(|| syntax("Syntax Error in 'assign' - Valid syntax: assign [var] = [source]"))?;
        let name = Parser::new(name.trim()).parse_identifier()?;
        Ok(Box::new(AssignNode { name, value: parse_expr(value)? }))
    }
}

impl Renderable for AssignNode {
    fn render(&self, ctx: &mut Context<'_>, _: &mut String) -> Result<()> {
        let value = self.value.eval(ctx);
        ctx.set(self.name.clone(), value);
        Ok(())
    }
}

/// `{% for item in collection [reversed] %} ... [{% else %} ...] {% endfor %}`
pub struct For;

#[derive(Debug)]
pub struct ForNode {
    variable: String,
    collection: Expr,
    reversed: bool,
    body: Template,
    empty: Option<Template>,
}

impl Tag for For {
    fn name(&self) -> &'static str { "for" }

    fn parse(&self, tag_name: &str, markup: &str, tokens: &mut TokenStream<'_>, registry: &Registry) -> Result<Box<dyn Renderable>> {
        let invalid = || syntax("Syntax Error in 'for loop' - Valid syntax: for [item] in [collection]");
        let mut p = Parser::new(markup);
        let variable = p.parse_identifier().map_err(|_| invalid())?;
        p.skip_ws();
        if !p.consume_keyword("in") {
            return Err(invalid());
        }
        p.skip_ws();
        let source = p.parse_fragment().map_err(|_| invalid())?;
        let collection = parse_expr(source)?;
        p.skip_ws();
        let reversed = p.consume_keyword("reversed");
        p.skip_ws();
        if !p.eof() {
            return Err(invalid());
        }

        let (body, end) = Template::parse_block(tag_name, tokens, registry, &["else", "endfor"])?;
        let empty = if end.name == "else" {
            Some(Template::parse_block(tag_name, tokens, registry, &["endfor"])?.0)
        } else {
            None
        };
        Ok(Box::new(ForNode { variable, collection, reversed, body, empty }))
    }
}

impl Renderable for ForNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let mut items = iterable(&self.collection.eval(ctx)).unwrap_or_default();
        if items.is_empty() {
            if let Some(empty) = &self.empty {
                empty.render_to(ctx, out)?;
            }
            return Ok(());
        }
        if self.reversed {
            items.reverse();
        }
        let length = items.len();
        ctx.push_scope();
        let result = items.into_iter().enumerate().try_for_each(|(i, item)| {
            ctx.set(self.variable.clone(), item);
            ctx.set("forloop", ForLoop::new(i, length).to_value());
            self.body.render_to(ctx, out)
        });
        ctx.pop_scope();
        result
    }
}

/// `{% if %}` / `{% elsif %}` / `{% else %}` / `{% endif %}`
pub struct If;

/// Shared by `if` and `unless`: the first branch whose condition holds renders.
#[derive(Debug)]
pub struct Branches {
    branches: Vec<(Condition, Template)>,
    otherwise: Option<Template>,
    negate_first: bool,
}

fn parse_branches(tag_name: &str, markup: &str, tokens: &mut TokenStream<'_>, registry: &Registry, negate_first: bool) -> Result<Branches> {
    let end_tag = format!("end{tag_name}");
    let terminators = ["elsif", "else", end_tag.as_str()];
    let mut branches = Vec::new();
    let mut otherwise = None;
    let mut condition = parse_condition(markup)?;
    loop {
        let (body, end) = Template::parse_block(tag_name, tokens, registry, &terminators)?;
        branches.push((condition, body));
        match end.name.as_str() {
            "elsif" => condition = parse_condition(&end.markup)?,
            "else" => {
                otherwise = Some(Template::parse_block(tag_name, tokens, registry, &[end_tag.as_str()])?.0);
                break;
            }
            _ => break,
        }
    }
    Ok(Branches { branches, otherwise, negate_first })
}

impl Tag for If {
    fn name(&self) -> &'static str { "if" }

    fn parse(&self, tag_name: &str, markup: &str, tokens: &mut TokenStream<'_>, registry: &Registry) -> Result<Box<dyn Renderable>> {
        Ok(Box::new(parse_branches(tag_name, markup, tokens, registry, false)?))
    }
}

/// `{% unless %}`: like `if` with the first condition negated.
pub struct Unless;

impl Tag for Unless {
    fn name(&self) -> &'static str { "unless" }

    fn parse(&self, tag_name: &str, markup: &str, tokens: &mut TokenStream<'_>, registry: &Registry) -> Result<Box<dyn Renderable>> {
        Ok(Box::new(parse_branches(tag_name, markup, tokens, registry, true)?))
    }
}

impl Renderable for Branches {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        for (i, (condition, body)) in self.branches.iter().enumerate() {
            let holds = condition.eval(ctx) != (i == 0 && self.negate_first);
            if holds {
                return body.render_to(ctx, out);
            }
        }
        match &self.otherwise {
            Some(body) => body.render_to(ctx, out),
            None => Ok(()),
        }
    }
}

/// `{% comment %} ... {% endcomment %}`; the body is skipped unparsed.
pub struct Comment;

#[derive(Debug)]
pub struct CommentNode;

impl Tag for Comment {
    fn name(&self) -> &'static str { "comment" }

    fn parse(&self, _: &str, _: &str, tokens: &mut TokenStream<'_>, _: &Registry) -> Result<Box<dyn Renderable>> {
        let mut depth = 0usize;
        while let Some(tok) = tokens.next_token() {
            if let Token::Tag(inner) = tok {
                match split_tag(inner).0 {
                    "comment" => depth += 1,
                    "endcomment" if depth == 0 => return Ok(Box::new(CommentNode)),
                    "endcomment" => depth -= 1,
                    _ => {}
                }
            }
        }
        Err(syntax("'comment' tag was never closed"))
    }
}

impl Renderable for CommentNode {
    fn render(&self, _: &mut Context<'_>, _: &mut String) -> Result<()> {
        Ok(())
    }
}
