use serde_json::Value;

use super::{Registry, Renderable, Tag};
use crate::context::Context;
use crate::errors::{Result, TemplateError};
use crate::template::{Template, TokenStream};

/// `{% capture var %}...{% endcapture %}` renders its body into `var`
/// instead of the output. The variable lands in the innermost scope, so a
/// capture inside a `for` body is gone after `endfor`; stock Liquid writes
/// to the root scope instead.
pub struct CaptureTag;

impl Tag for CaptureTag {
    fn name(&self) -> &'static str { "capture" }

    fn parse(&self, tag_name: &str, markup: &str, tokens: &mut TokenStream<'_>, registry: &Registry) -> Result<Box<dyn Renderable>> {
        let variable = markup.trim();
        if variable.is_empty() || variable.contains(char::is_whitespace) {
            return Err(TemplateError::Syntax(
                "Syntax Error in 'capture' - Valid syntax: capture [var]".into(),
            ));
        }
        let end_tag = format!("end{tag_name}");
        let (body, _) = Template::parse_block(tag_name, tokens, registry, &[end_tag.as_str()])?;
        Ok(Box::new(Capture { variable: variable.to_string(), body }))
    }
}

#[derive(Debug)]
pub struct Capture {
    variable: String,
    body: Template,
}

impl Renderable for Capture {
    fn render(&self, ctx: &mut Context<'_>, _: &mut String) -> Result<()> {
        let captured = self.body.render(ctx)?;
        ctx.set(self.variable.clone(), Value::String(captured));
        Ok(())
    }
}
