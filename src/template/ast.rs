/// AST node types for parsed templates.
///
/// Expression payloads (`Output`, `If` conditions, `For` collections) are
/// kept as opaque strings; the renderer gives them a minimal interpretation
/// and the inheritance machinery never looks inside them, with one
/// exception: `super()` calls are recognized structurally at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Plain text content
    Text(String),

    /// Output expression `{{ expr }}`
    Output { expr: String, line: usize },

    /// Inheritance declaration `{% extends "name" %}`
    Extends { parent: String, line: usize },

    /// Block declaration, explicit `{% block name %}...{% endblock %}` or
    /// shortcut `{% block name expr %}` (body is the single expression)
    Block {
        name: String,
        body: Vec<Node>,
        shortcut: bool,
        line: usize,
    },

    /// Conditional `{% if cond %}...{% else %}...{% endif %}`
    If {
        condition: String,
        then_branch: Vec<Node>,
        else_branch: Option<Vec<Node>>,
        line: usize,
    },

    /// Loop `{% for item in collection %}...{% endfor %}`
    For {
        item: String,
        collection: String,
        body: Vec<Node>,
        line: usize,
    },
}

/// Reference to a parent template, hoisted out of the node list by
/// placement validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendsRef {
    pub parent: String,
    pub line: usize,
}

/// One parsed template.
///
/// `extends` is `None` until [`crate::template::validate::validate`] has
/// checked the structure; the `Extends` node itself stays in `nodes` so the
/// validator can see its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAst {
    pub source_name: String,
    pub nodes: Vec<Node>,
    pub extends: Option<ExtendsRef>,
}

impl TemplateAst {
    pub fn new(source_name: &str, nodes: Vec<Node>) -> Self {
        Self {
            source_name: source_name.to_string(),
            nodes,
            extends: None,
        }
    }

    /// Whether this template is a layout (no parent).
    pub fn is_layout(&self) -> bool {
        self.extends.is_none()
    }
}

/// One block declaration inside one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDecl {
    pub name: String,
    /// Name of the template that declared this body
    pub owner: String,
    pub body: Vec<Node>,
    /// Number of enclosing blocks; 0 means top-level
    pub depth: usize,
    pub line: usize,
}
