use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::{ChangeToken, SourceProvider, TemplateSource};
use crate::error::{Error, Result};

/// In-memory template provider.
///
/// Every `insert` bumps a monotonic stamp for the name, so resolved
/// templates built from earlier contents go stale. Mainly used for tests
/// and for embedding small template sets directly in an application.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    templates: RwLock<HashMap<String, (String, u64)>>,
    counter: AtomicU64,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a provider from `(name, source)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let provider = Self::new();
        for (name, text) in pairs {
            provider.insert(name, text);
        }
        provider
    }

    /// Insert or replace a template. Replacing bumps the change stamp.
    pub fn insert(&self, name: &str, text: &str) {
        let stamp = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(name.to_string(), (text.to_string(), stamp));
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut templates) = self.templates.write() {
            templates.remove(name);
        }
    }
}

impl SourceProvider for MemoryProvider {
    fn fetch(&self, name: &str) -> Result<TemplateSource> {
        let templates = self
            .templates
            .read()
            .map_err(|_| Error::Io("memory provider lock poisoned".to_string()))?;
        match templates.get(name) {
            Some((text, stamp)) => Ok(TemplateSource {
                name: name.to_string(),
                text: text.clone(),
                change_token: ChangeToken::Stamp(*stamp),
            }),
            None => Err(Error::TemplateNotFound(name.to_string())),
        }
    }

    fn change_token(&self, name: &str) -> ChangeToken {
        match self.templates.read() {
            Ok(templates) => match templates.get(name) {
                Some((_, stamp)) => ChangeToken::Stamp(*stamp),
                None => ChangeToken::Always,
            },
            Err(_) => ChangeToken::Always,
        }
    }
}
