//! Sablon - a text template engine built around static template inheritance
//!
//! Sablon provides:
//! - Jinja-style `{% extends %}` / `{% block %}` template inheritance
//! - Static (parse-time) validation of inheritance structure
//! - `{{ super() }}` / `{{ super(n) }}` access to overridden ancestor blocks
//! - Pluggable template sources with caching and change detection

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod template;

// Re-export main types for public API
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use loader::{
    CachingProvider, ChangeToken, ChoiceProvider, FileSystemProvider, MemoryProvider,
    SourceProvider, TemplateSource,
};
pub use template::{
    BlockChain, BlockChainIndex, BlockDecl, Node, RenderContext, Renderer, ResolvedTemplate,
    TemplateAst,
};
