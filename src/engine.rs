use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, RwLock};

use log::debug;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::loader::{FileSystemProvider, SourceProvider};
use crate::template::linker::{self, ResolvedTemplate};
use crate::template::{RenderContext, Renderer};

/// One in-flight resolution. Joiners block on the slot until the leader
/// deposits the terminal result; every joiner receives the same `Result`.
struct Flight {
    slot: Mutex<Option<Result<Arc<ResolvedTemplate>>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<Arc<ResolvedTemplate>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::Io("resolution slot poisoned".to_string()))?;
        while slot.is_none() {
            slot = self
                .done
                .wait(slot)
                .map_err(|_| Error::Io("resolution slot poisoned".to_string()))?;
        }
        match slot.as_ref() {
            Some(result) => result.clone(),
            None => Err(Error::Io("resolution slot empty".to_string())),
        }
    }

    fn finish(&self, result: Result<Arc<ResolvedTemplate>>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(result);
        }
        self.done.notify_all();
    }
}

/// Template engine facade.
///
/// Resolves leaf templates through a [`SourceProvider`], caches the
/// resulting [`ResolvedTemplate`]s, and guarantees at most one concurrent
/// resolution per leaf name: a second request for a name being resolved
/// joins the in-flight resolution instead of duplicating the work.
pub struct Engine<P: SourceProvider> {
    provider: P,
    config: EngineConfig,
    cache: RwLock<HashMap<String, Arc<ResolvedTemplate>>>,
    in_flight: Mutex<HashMap<String, Arc<Flight>>>,
}

enum Role {
    Leader(Arc<Flight>),
    Joiner(Arc<Flight>),
}

impl Engine<FileSystemProvider> {
    /// Engine over a template directory with default configuration.
    pub fn from_directory(directory: &str) -> Self {
        Self::from_config(EngineConfig {
            directory: directory.to_string(),
            ..EngineConfig::default()
        })
    }

    pub fn from_config(config: EngineConfig) -> Self {
        let provider =
            FileSystemProvider::new(&config.directory).with_extension(&config.extension);
        Self::with_config(provider, config)
    }
}

impl<P: SourceProvider> Engine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, EngineConfig::default())
    }

    pub fn with_config(provider: P, config: EngineConfig) -> Self {
        Self {
            provider,
            config,
            cache: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve a leaf template, serving from cache when every ancestor is
    /// still fresh.
    pub fn resolve(&self, name: &str) -> Result<Arc<ResolvedTemplate>> {
        if !self.config.cache_enabled {
            return linker::resolve(&self.provider, name).map(Arc::new);
        }
        if let Some(hit) = self.cached_if_fresh(name) {
            return Ok(hit);
        }

        let role = {
            let mut in_flight = self
                .in_flight
                .lock()
                .map_err(|_| Error::Io("in-flight table poisoned".to_string()))?;
            match in_flight.get(name) {
                Some(flight) => Role::Joiner(flight.clone()),
                None => {
                    let flight = Arc::new(Flight::new());
                    in_flight.insert(name.to_string(), flight.clone());
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Joiner(flight) => {
                debug!("joining in-flight resolution of '{}'", name);
                flight.wait()
            }
            Role::Leader(flight) => {
                // A previous leader may have published while we raced for
                // the slot; recheck before doing the work.
                let result = match self.cached_if_fresh(name) {
                    Some(hit) => Ok(hit),
                    None => linker::resolve(&self.provider, name).map(Arc::new),
                };
                // Publish to the cache before releasing the slot so a
                // later leader's recheck finds it. Failures are never
                // published.
                if let Ok(resolved) = &result {
                    if let Ok(mut cache) = self.cache.write() {
                        cache.insert(name.to_string(), resolved.clone());
                    }
                }
                flight.finish(result.clone());
                if let Ok(mut in_flight) = self.in_flight.lock() {
                    in_flight.remove(name);
                }
                result
            }
        }
    }

    /// Render a template by name against a model.
    pub fn render(&self, name: &str, model: &Value) -> Result<String> {
        let resolved = self.resolve(name)?;
        let mut ctx = RenderContext::new(model.clone());
        Renderer::new(&resolved).render(&mut ctx)
    }

    /// Render source text directly. The provider is still consulted for
    /// any templates the source extends; nothing is cached.
    pub fn render_str(&self, source: &str, model: &Value) -> Result<String> {
        let resolved = linker::resolve_source(&self.provider, "<string>", source)?;
        let mut ctx = RenderContext::new(model.clone());
        Renderer::new(&resolved).render(&mut ctx)
    }

    pub fn invalidate(&self, name: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(name);
        }
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn cached_if_fresh(&self, name: &str) -> Option<Arc<ResolvedTemplate>> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(name)?;
        if !self.config.auto_reload {
            return Some(entry.clone());
        }
        for (ancestor, seen) in &entry.tokens {
            let current = self.provider.change_token(ancestor);
            if current.invalidates(*seen) {
                debug!(
                    "cached resolution of '{}' is stale: '{}' changed",
                    name, ancestor
                );
                return None;
            }
        }
        Some(entry.clone())
    }
}
