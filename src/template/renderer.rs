//! Renders parsed page nodes against a context.
//!
//! Every interpolated value is HTML-escaped.

use super::parser::Node;
use super::{escape_html, Result, TemplateContext, TemplateError, Value};

/// Writes nodes into an output buffer.
pub struct Renderer<'a> {
    context: &'a TemplateContext,
}

impl<'a> Renderer<'a> {
    pub fn new(context: &'a TemplateContext) -> Self {
        Self { context }
    }

    /// Render nodes to a new string.
    pub fn render(&self, nodes: &[Node]) -> Result<String> {
        let mut out = String::new();
        self.render_into(nodes, &mut out)?;
        Ok(out)
    }

    fn render_into(&self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable(path) => {
                    // Missing values render as nothing
                    if let Some(value) = self.context.get(path) {
                        out.push_str(&escape_html(&value.to_display_string()));
                    }
                }
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let truthy = self.context.get(condition).is_some_and(Value::is_truthy);
                    let branch = if truthy { then_branch } else { else_branch };
                    self.render_into(branch, out)?;
                }
                Node::Each { list, body } => self.render_each(list, body, out)?,
            }
        }
        Ok(())
    }

    /// Render `body` once per item. The item is `this`; an object item also
    /// exposes its fields by name.
    fn render_each(&self, list: &str, body: &[Node], out: &mut String) -> Result<()> {
        let items = match self.context.get(list) {
            Some(Value::List(items)) => items,
            Some(Value::Null) | None => return Ok(()),
            Some(_) => return Err(TemplateError::Render(format!("'{list}' is not a list"))),
        };

        for item in items {
            let mut scope = self.context.child();
            if let Value::Object(fields) = item {
                for (key, value) in fields {
                    scope.set(key.clone(), value.clone());
                }
            }
            scope.set("this", item.clone());
            Renderer::new(&scope).render_into(body, out)?;
        }
        Ok(())
    }
}
