use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;

use super::{ChangeToken, SourceProvider, TemplateSource};
use crate::error::{Error, Result};

/// Memoizing decorator over another provider.
///
/// Wraps any [`SourceProvider`] and caches fetched sources, revalidating a
/// hit against the inner provider's current change token. Composition
/// happens at construction: `CachingProvider::new(FileSystemProvider::new(..))`.
pub struct CachingProvider<P: SourceProvider> {
    inner: P,
    entries: RwLock<HashMap<String, TemplateSource>>,
}

impl<P: SourceProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn invalidate(&self, name: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(name);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl<P: SourceProvider> SourceProvider for CachingProvider<P> {
    fn fetch(&self, name: &str) -> Result<TemplateSource> {
        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(name) {
                let current = self.inner.change_token(name);
                if !current.invalidates(hit.change_token) {
                    debug!("source cache hit for '{}'", name);
                    return Ok(hit.clone());
                }
                debug!("source cache stale for '{}'", name);
            }
        }

        let source = self.inner.fetch(name)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| Error::Io("source cache lock poisoned".to_string()))?;
        entries.insert(name.to_string(), source.clone());
        Ok(source)
    }

    fn change_token(&self, name: &str) -> ChangeToken {
        self.inner.change_token(name)
    }
}
