use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use super::ast::Node;
use super::linker::ResolvedTemplate;
use crate::error::{Error, Result};

/// Variable bindings for one render
pub struct RenderContext {
    /// Template data (model)
    model: Value,
    /// Local bindings (loop variables); innermost scope shadows
    scopes: Vec<HashMap<String, Value>>,
}

impl RenderContext {
    pub fn new(model: Value) -> Self {
        Self {
            model,
            scopes: Vec::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    /// Dotted-path lookup, local scopes (innermost first) before the model.
    /// Path segments index objects by key and arrays by integer.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;

        let mut current = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(first).cloned())
            .or_else(|| self.model.get(first).cloned())?;

        for part in parts {
            current = match current.get(part) {
                Some(value) => value.clone(),
                None => part
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| current.get(i).cloned())?,
            };
        }
        Some(current)
    }

    /// Minimal opaque-payload evaluation: string literals and dotted
    /// variable paths. Anything richer renders empty with a warning.
    fn eval(&self, expr: &str) -> String {
        let expr = expr.trim();
        if let Some(literal) = string_literal(expr) {
            return literal;
        }
        if is_path(expr) {
            return match self.lookup(expr) {
                Some(value) => value_to_string(&value),
                None => {
                    debug!("undefined variable '{}'", expr);
                    String::new()
                }
            };
        }
        warn!("cannot evaluate expression '{}'", expr);
        String::new()
    }

    fn truthy(&self, condition: &str) -> bool {
        let condition = condition.trim();
        let (negate, condition) = match condition.strip_prefix("not ") {
            Some(rest) => (true, rest.trim()),
            None => (false, condition),
        };
        let value = match condition {
            "true" => true,
            "false" => false,
            path => self
                .lookup(path)
                .map(|value| value_truthy(&value))
                .unwrap_or(false),
        };
        value != negate
    }
}

fn string_literal(expr: &str) -> Option<String> {
    let inner = expr
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| expr.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))?;
    Some(inner.to_string())
}

fn is_path(expr: &str) -> bool {
    let mut chars = expr.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The override currently executing, for `super()` lookups
#[derive(Debug, Clone, Copy)]
struct BlockFrame<'r> {
    name: &'r str,
    index: usize,
}

/// Render driver over a [`ResolvedTemplate`].
///
/// Executes the leaf's prelude first (output discarded), then the root
/// layout's markup. Every structural block reference renders the leaf-most
/// override of that block; `super(n)` inside an override renders the
/// override `n` steps up the chain and composes as an expression.
pub struct Renderer<'r> {
    resolved: &'r ResolvedTemplate,
}

impl<'r> Renderer<'r> {
    pub fn new(resolved: &'r ResolvedTemplate) -> Self {
        Self { resolved }
    }

    pub fn render(&self, ctx: &mut RenderContext) -> Result<String> {
        if !self.resolved.prelude.is_empty() {
            let mut discard = String::new();
            self.render_nodes(&self.resolved.prelude, ctx, None, &mut discard)?;
        }

        let root = self
            .resolved
            .root()
            .ok_or_else(|| Error::Render("resolved template has an empty ancestry".to_string()))?;
        let mut out = String::new();
        self.render_nodes(&root.nodes, ctx, None, &mut out)?;
        Ok(out)
    }

    fn render_nodes(
        &self,
        nodes: &'r [Node],
        ctx: &mut RenderContext,
        frame: Option<BlockFrame<'r>>,
        out: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Extends { .. } => {}
                Node::Output { expr, .. } => self.render_output(expr, ctx, frame, out)?,
                Node::Block { name, .. } => self.render_primary(name, ctx, out)?,
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => {
                    if ctx.truthy(condition) {
                        self.render_nodes(then_branch, ctx, frame, out)?;
                    } else if let Some(nodes) = else_branch {
                        self.render_nodes(nodes, ctx, frame, out)?;
                    }
                }
                Node::For {
                    item,
                    collection,
                    body,
                    ..
                } => match ctx.lookup(collection) {
                    Some(Value::Array(items)) => {
                        for value in items {
                            ctx.push_scope();
                            ctx.bind(item, value);
                            let result = self.render_nodes(body, ctx, frame, out);
                            ctx.pop_scope();
                            result?;
                        }
                    }
                    Some(other) => {
                        warn!("'{}' is not iterable: {}", collection, other);
                    }
                    None => debug!("undefined collection '{}'", collection),
                },
            }
        }
        Ok(())
    }

    /// Render the most-derived override of a block.
    fn render_primary(&self, name: &'r str, ctx: &mut RenderContext, out: &mut String) -> Result<()> {
        let chain = self
            .resolved
            .chains
            .chain(name)
            .ok_or_else(|| Error::Render(format!("unknown block '{}'", name)))?;
        if chain.is_empty() {
            return Err(Error::Render(format!("empty chain for block '{}'", name)));
        }
        self.render_override(name, chain.len() - 1, ctx, out)
    }

    fn render_override(
        &self,
        name: &'r str,
        index: usize,
        ctx: &mut RenderContext,
        out: &mut String,
    ) -> Result<()> {
        let chain = self
            .resolved
            .chains
            .chain(name)
            .ok_or_else(|| Error::Render(format!("unknown block '{}'", name)))?;
        let decl = chain
            .overrides
            .get(index)
            .ok_or_else(|| Error::Render(format!("corrupt chain for block '{}'", name)))?;
        let frame = BlockFrame { name, index };
        self.render_nodes(&decl.body, ctx, Some(frame), out)
    }

    fn render_output(
        &self,
        expr: &'r str,
        ctx: &mut RenderContext,
        frame: Option<BlockFrame<'r>>,
        out: &mut String,
    ) -> Result<()> {
        match parse_super_call(expr)? {
            Some(offset) => {
                let frame = frame.ok_or_else(|| {
                    Error::Render("super() called outside of a block".to_string())
                })?;
                let decl = self
                    .resolved
                    .chains
                    .resolve(frame.name, frame.index, offset)?;
                let ancestor = BlockFrame {
                    name: frame.name,
                    index: frame.index - offset,
                };
                self.render_nodes(&decl.body, ctx, Some(ancestor), out)
            }
            None => {
                out.push_str(&ctx.eval(expr));
                Ok(())
            }
        }
    }
}

/// Recognize `super()` / `super(n)` in an output expression. Returns the
/// offset, defaulting to 1 for the bare form. Anything that is not a super
/// call at all yields `None`.
fn parse_super_call(expr: &str) -> Result<Option<usize>> {
    let rest = match expr.trim().strip_prefix("super") {
        Some(rest) => rest.trim_start(),
        None => return Ok(None),
    };
    let args = match rest.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(args) => args.trim(),
        None => return Ok(None),
    };
    if args.is_empty() {
        return Ok(Some(1));
    }
    args.parse::<usize>()
        .map(Some)
        .map_err(|_| Error::Render(format!("super() offset must be an integer literal, got '{}'", args)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryProvider;
    use crate::template::linker;
    use serde_json::json;

    fn render_one(source: &str, model: Value) -> Result<String> {
        let provider = MemoryProvider::new();
        let resolved = linker::resolve_source(&provider, "test", source)?;
        Renderer::new(&resolved).render(&mut RenderContext::new(model))
    }

    #[test]
    fn test_text_and_variables() {
        let out = render_one("Hello {{ user.name }}!", json!({"user": {"name": "Ada"}})).unwrap();
        assert_eq!(out, "Hello Ada!");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let out = render_one("[{{ missing }}]", json!({})).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_string_literal_output() {
        let out = render_one(r#"{{ "x" }}{{ 'y' }}"#, json!({})).unwrap();
        assert_eq!(out, "xy");
    }

    #[test]
    fn test_conditional_truthiness() {
        let model = json!({"on": true, "empty": "", "items": [1]});
        assert_eq!(
            render_one("{% if on %}yes{% else %}no{% endif %}", model.clone()).unwrap(),
            "yes"
        );
        assert_eq!(
            render_one("{% if empty %}yes{% else %}no{% endif %}", model.clone()).unwrap(),
            "no"
        );
        assert_eq!(
            render_one("{% if not empty %}yes{% endif %}", model.clone()).unwrap(),
            "yes"
        );
        assert_eq!(
            render_one("{% if items %}yes{% endif %}", model).unwrap(),
            "yes"
        );
        assert_eq!(render_one("{% if false %}yes{% endif %}", json!({})).unwrap(), "");
    }

    #[test]
    fn test_for_loop_binds_and_shadows() {
        let model = json!({"x": "outer", "items": ["a", "b"]});
        let out = render_one(
            "{% for x in items %}{{ x }}{% endfor %}{{ x }}",
            model,
        )
        .unwrap();
        assert_eq!(out, "abouter");
    }

    #[test]
    fn test_for_over_objects() {
        let model = json!({"users": [{"name": "a"}, {"name": "b"}]});
        let out = render_one("{% for u in users %}{{ u.name }};{% endfor %}", model).unwrap();
        assert_eq!(out, "a;b;");
    }

    #[test]
    fn test_numbers_and_null() {
        let out = render_one("{{ n }}|{{ z }}", json!({"n": 42, "z": null})).unwrap();
        assert_eq!(out, "42|");
    }

    #[test]
    fn test_block_renders_in_place_when_standalone() {
        let out = render_one("a{% block b %}B{% endblock %}c", json!({})).unwrap();
        assert_eq!(out, "aBc");
    }

    #[test]
    fn test_super_outside_block_fails() {
        let err = render_one("{{ super() }}", json!({})).unwrap_err();
        match err {
            Error::Render(msg) => assert!(msg.contains("outside of a block")),
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_super_call_forms() {
        assert_eq!(parse_super_call("super()").unwrap(), Some(1));
        assert_eq!(parse_super_call("super( 2 )").unwrap(), Some(2));
        assert_eq!(parse_super_call("super (3)").unwrap(), Some(3));
        assert_eq!(parse_super_call("superman").unwrap(), None);
        assert_eq!(parse_super_call("user.name").unwrap(), None);
        assert!(parse_super_call("super(x)").is_err());
    }
}
