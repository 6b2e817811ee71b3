use log::debug;

use super::ast::{BlockDecl, Node, TemplateAst};
use super::chains::BlockChainIndex;
use super::parser::Parser;
use super::validate::validate;
use crate::error::{Error, Result};
use crate::loader::{ChangeToken, SourceProvider};

/// A leaf template statically linked to its layout chain.
///
/// Built once per resolution and shared read-only afterwards; nothing
/// mutates a `ResolvedTemplate` after construction.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    pub leaf_name: String,
    /// Root layout first, resolved leaf last.
    pub ancestry: Vec<TemplateAst>,
    /// Override chain per block name, across the whole ancestry.
    pub chains: BlockChainIndex,
    /// The leaf's top-level content outside any block. Executed once per
    /// render before the root layout's markup; empty when the leaf is its
    /// own root.
    pub prelude: Vec<Node>,
    /// Change token per ancestor as observed during resolution, for
    /// staleness checks. Any changed ancestor invalidates the whole
    /// resolution.
    pub tokens: Vec<(String, ChangeToken)>,
}

impl ResolvedTemplate {
    pub fn root(&self) -> Option<&TemplateAst> {
        self.ancestry.first()
    }
}

/// Resolve a leaf template name into a [`ResolvedTemplate`].
pub fn resolve(provider: &dyn SourceProvider, leaf: &str) -> Result<ResolvedTemplate> {
    let source = provider.fetch(leaf)?;
    resolve_with_source(provider, leaf, &source.text, source.change_token)
}

/// Resolve a template given directly as source text. The provider is still
/// consulted for any ancestors it names.
pub fn resolve_source(
    provider: &dyn SourceProvider,
    name: &str,
    text: &str,
) -> Result<ResolvedTemplate> {
    resolve_with_source(provider, name, text, ChangeToken::Always)
}

fn resolve_with_source(
    provider: &dyn SourceProvider,
    leaf: &str,
    text: &str,
    token: ChangeToken,
) -> Result<ResolvedTemplate> {
    // Walk child -> parent. The parent name is only known after parsing
    // the child, so this is inherently sequential.
    let mut path = vec![leaf.to_string()];
    let ast = validate(Parser::new(leaf, text)?.parse()?)?;
    let mut next = ast.extends.clone();
    let mut chain = vec![(ast, token)];

    while let Some(ext) = next {
        if path.iter().any(|name| *name == ext.parent) {
            path.push(ext.parent.clone());
            return Err(Error::CircularInheritance { path });
        }
        let source = provider.fetch(&ext.parent)?;
        let ast = validate(Parser::new(&ext.parent, &source.text)?.parse()?)?;
        path.push(ext.parent.clone());
        next = ast.extends.clone();
        chain.push((ast, source.change_token));
    }

    debug!("resolved '{}' through {} template(s)", leaf, chain.len());

    // Merge block declarations root-first so every chain ends up ordered
    // strictly by ancestry distance.
    chain.reverse();
    let mut chains = BlockChainIndex::default();
    let mut ancestry = Vec::with_capacity(chain.len());
    let mut tokens = Vec::with_capacity(chain.len());
    for (ast, token) in chain {
        for decl in collect_blocks(&ast) {
            chains.push(decl);
        }
        tokens.push((ast.source_name.clone(), token));
        ancestry.push(ast);
    }

    let prelude = if ancestry.len() > 1 {
        ancestry
            .last()
            .map(|ast| {
                ast.nodes
                    .iter()
                    .filter(|node| !matches!(node, Node::Block { .. } | Node::Extends { .. }))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Ok(ResolvedTemplate {
        leaf_name: leaf.to_string(),
        ancestry,
        chains,
        prelude,
        tokens,
    })
}

/// All block declarations of one template, in document order, nested
/// declarations included.
fn collect_blocks(ast: &TemplateAst) -> Vec<BlockDecl> {
    let mut out = Vec::new();
    collect_nodes(&ast.nodes, &ast.source_name, 0, &mut out);
    out
}

fn collect_nodes(nodes: &[Node], owner: &str, depth: usize, out: &mut Vec<BlockDecl>) {
    for node in nodes {
        match node {
            Node::Block {
                name, body, line, ..
            } => {
                out.push(BlockDecl {
                    name: name.clone(),
                    owner: owner.to_string(),
                    body: body.clone(),
                    depth,
                    line: *line,
                });
                collect_nodes(body, owner, depth + 1, out);
            }
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_nodes(then_branch, owner, depth, out);
                if let Some(nodes) = else_branch {
                    collect_nodes(nodes, owner, depth, out);
                }
            }
            Node::For { body, .. } => collect_nodes(body, owner, depth, out),
            _ => {}
        }
    }
}
