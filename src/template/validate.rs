use std::collections::HashMap;

use super::ast::{ExtendsRef, Node, TemplateAst};
use crate::error::{Error, Result};

/// Placement validation.
///
/// Enforces the structural rules that make the override chain computable
/// without executing the template:
///
/// - `extends`, if present, must be the first significant node (leading
///   whitespace and comments excepted) and must be unique
/// - block names must be unique within one template, at any nesting depth
/// - in a child template (one that extends), a block not enclosed by
///   another block must sit at the structural top level, never inside a
///   conditional or loop
///
/// Layout templates (no `extends`) may place blocks anywhere; there is no
/// override chain to keep branch-independent.
///
/// On success the `extends` reference is hoisted into
/// [`TemplateAst::extends`]; the node itself stays in place and is skipped
/// by later stages.
pub fn validate(mut ast: TemplateAst) -> Result<TemplateAst> {
    ast.extends = check_extends(&ast)?;
    check_blocks(&ast)?;
    Ok(ast)
}

fn check_extends(ast: &TemplateAst) -> Result<Option<ExtendsRef>> {
    let mut extends: Option<ExtendsRef> = None;
    let mut seen_significant = false;
    check_extends_nodes(ast, &ast.nodes, true, &mut extends, &mut seen_significant)?;
    Ok(extends)
}

fn check_extends_nodes(
    ast: &TemplateAst,
    nodes: &[Node],
    top_level: bool,
    extends: &mut Option<ExtendsRef>,
    seen_significant: &mut bool,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(text) => {
                if !text.trim().is_empty() {
                    *seen_significant = true;
                }
            }
            Node::Extends { parent, line } => {
                if extends.is_some() {
                    return Err(Error::MultipleInheritance {
                        name: ast.source_name.clone(),
                        line: *line,
                    });
                }
                if *seen_significant || !top_level {
                    return Err(Error::MisplacedExtends {
                        name: ast.source_name.clone(),
                        line: *line,
                    });
                }
                *extends = Some(ExtendsRef {
                    parent: parent.clone(),
                    line: *line,
                });
                *seen_significant = true;
            }
            Node::Block { body, .. } => {
                *seen_significant = true;
                check_extends_nodes(ast, body, false, extends, seen_significant)?;
            }
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                *seen_significant = true;
                check_extends_nodes(ast, then_branch, false, extends, seen_significant)?;
                if let Some(nodes) = else_branch {
                    check_extends_nodes(ast, nodes, false, extends, seen_significant)?;
                }
            }
            Node::For { body, .. } => {
                *seen_significant = true;
                check_extends_nodes(ast, body, false, extends, seen_significant)?;
            }
            Node::Output { .. } => *seen_significant = true,
        }
    }
    Ok(())
}

fn check_blocks(ast: &TemplateAst) -> Result<()> {
    let is_child = ast.extends.is_some();
    let mut seen: HashMap<String, usize> = HashMap::new();
    check_block_nodes(ast, &ast.nodes, is_child, false, false, &mut seen)
}

fn check_block_nodes(
    ast: &TemplateAst,
    nodes: &[Node],
    is_child: bool,
    enclosed_in_block: bool,
    in_container: bool,
    seen: &mut HashMap<String, usize>,
) -> Result<()> {
    for node in nodes {
        match node {
            Node::Block {
                name, body, line, ..
            } => {
                if seen.insert(name.clone(), *line).is_some() {
                    return Err(Error::DuplicateBlockName {
                        name: ast.source_name.clone(),
                        block: name.clone(),
                        line: *line,
                    });
                }
                if is_child && !enclosed_in_block && in_container {
                    return Err(Error::InvalidBlockPlacement {
                        name: ast.source_name.clone(),
                        block: name.clone(),
                        line: *line,
                    });
                }
                check_block_nodes(ast, body, is_child, true, false, seen)?;
            }
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                check_block_nodes(ast, then_branch, is_child, enclosed_in_block, true, seen)?;
                if let Some(nodes) = else_branch {
                    check_block_nodes(ast, nodes, is_child, enclosed_in_block, true, seen)?;
                }
            }
            Node::For { body, .. } => {
                check_block_nodes(ast, body, is_child, enclosed_in_block, true, seen)?;
            }
            _ => {}
        }
    }
    Ok(())
}
