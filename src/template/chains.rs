use std::collections::HashMap;

use super::ast::BlockDecl;
use crate::error::{Error, Result};

/// Root-to-leaf sequence of a block's successive overrides.
#[derive(Debug, Clone, Default)]
pub struct BlockChain {
    pub name: String,
    /// Ordered strictly by ancestry distance, root layout first.
    pub overrides: Vec<BlockDecl>,
}

impl BlockChain {
    /// The most-derived override; what the renderer executes when the
    /// block is referenced structurally.
    pub fn primary(&self) -> Option<&BlockDecl> {
        self.overrides.last()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Per-template mapping from block name to its override chain.
#[derive(Debug, Clone, Default)]
pub struct BlockChainIndex {
    chains: HashMap<String, BlockChain>,
}

impl BlockChainIndex {
    /// Append a declaration to its chain, creating the chain on first
    /// sight. Declarations must arrive in root-to-leaf ancestry order.
    pub(crate) fn push(&mut self, decl: BlockDecl) {
        self.chains
            .entry(decl.name.clone())
            .or_insert_with(|| BlockChain {
                name: decl.name.clone(),
                overrides: Vec::new(),
            })
            .overrides
            .push(decl);
    }

    pub fn chain(&self, name: &str) -> Option<&BlockChain> {
        self.chains.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Resolve a `super(offset)` lookup from the override at
    /// `current_index` in the chain for `name`. Offset 1 is the nearest
    /// enclosing ancestor (the default for a bare `super()`).
    pub fn resolve(&self, name: &str, current_index: usize, offset: usize) -> Result<&BlockDecl> {
        let chain = self
            .chain(name)
            .ok_or_else(|| Error::Render(format!("unknown block '{}'", name)))?;
        if offset == 0 {
            return Err(Error::Render(
                "super() offset must be at least 1".to_string(),
            ));
        }
        if offset > current_index {
            return Err(Error::SuperOutOfRange {
                block: name.to_string(),
                requested: offset,
                available: current_index,
            });
        }
        chain
            .overrides
            .get(current_index - offset)
            .ok_or_else(|| Error::Render(format!("corrupt chain for block '{}'", name)))
    }
}
