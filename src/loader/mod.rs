//! Template source providers
//!
//! A [`SourceProvider`] hands raw template text to the engine and reports a
//! [`ChangeToken`] used for cache invalidation. Providers compose explicitly:
//! [`CachingProvider`] decorates any provider with memoization, and
//! [`ChoiceProvider`] chains an ordered list of providers configured at
//! startup.

mod caching;
mod filesystem;
mod memory;

pub use caching::CachingProvider;
pub use filesystem::FileSystemProvider;
pub use memory::MemoryProvider;

use crate::error::{Error, Result};

/// Change detection token reported by a provider for a template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeToken {
    /// Always treat the template as changed. Also the required answer for a
    /// name the provider no longer has.
    Always,
    /// Never treat the template as changed.
    Never,
    /// Changed when a later observation is greater than the last seen value.
    Stamp(u64),
}

impl ChangeToken {
    /// Whether a template whose token was `last_seen` at resolution time
    /// must be considered stale given the current token `self`.
    pub fn invalidates(self, last_seen: ChangeToken) -> bool {
        match self {
            ChangeToken::Always => true,
            ChangeToken::Never => false,
            ChangeToken::Stamp(now) => match last_seen {
                ChangeToken::Always => true,
                ChangeToken::Never => false,
                ChangeToken::Stamp(then) => now > then,
            },
        }
    }
}

/// Raw template source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub text: String,
    pub change_token: ChangeToken,
}

/// Supplies raw template source text by name.
pub trait SourceProvider: Send + Sync {
    /// Fetch the source for `name`, failing with
    /// [`Error::TemplateNotFound`] if the provider does not have it.
    fn fetch(&self, name: &str) -> Result<TemplateSource>;

    /// Current change token for `name`. Returns [`ChangeToken::Always`] for
    /// a name the provider cannot answer for.
    fn change_token(&self, name: &str) -> ChangeToken;
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn fetch(&self, name: &str) -> Result<TemplateSource> {
        (**self).fetch(name)
    }

    fn change_token(&self, name: &str) -> ChangeToken {
        (**self).change_token(name)
    }
}

/// Ordered pipeline of providers; the first provider that has a name wins.
pub struct ChoiceProvider {
    providers: Vec<Box<dyn SourceProvider>>,
}

impl ChoiceProvider {
    pub fn new(providers: Vec<Box<dyn SourceProvider>>) -> Self {
        Self { providers }
    }
}

impl SourceProvider for ChoiceProvider {
    fn fetch(&self, name: &str) -> Result<TemplateSource> {
        for provider in &self.providers {
            match provider.fetch(name) {
                Err(Error::TemplateNotFound(_)) => continue,
                other => return other,
            }
        }
        Err(Error::TemplateNotFound(name.to_string()))
    }

    // `Always` doubles as the not-found answer, so fall through on it and
    // keep asking later providers.
    fn change_token(&self, name: &str) -> ChangeToken {
        for provider in &self.providers {
            match provider.change_token(name) {
                ChangeToken::Always => continue,
                token => return token,
            }
        }
        ChangeToken::Always
    }
}
