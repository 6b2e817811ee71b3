//! Template parsing and inheritance resolution
//!
//! The pipeline is: lexer -> parser -> placement validation -> inheritance
//! linking -> rendering. Linking turns a leaf template name into a
//! [`ResolvedTemplate`] carrying the full ancestry and one override chain
//! per block name; the renderer walks the root ancestor's structure and
//! executes the leaf-most override for every block it meets.

pub mod ast;
pub mod chains;
pub mod lexer;
pub mod linker;
pub mod parser;
pub mod renderer;
pub mod validate;

pub use ast::{BlockDecl, ExtendsRef, Node, TemplateAst};
pub use chains::{BlockChain, BlockChainIndex};
pub use linker::ResolvedTemplate;
pub use parser::Parser;
pub use renderer::{RenderContext, Renderer};
