//! Versioned Request Proxy
//!
//! Serves `/app/{name}/{version}/...` by delegating to the stored handler of that
//! project version.
//!
//! ## Workflow
//! 1. `latest` is resolved through the registry's semver ordering.
//! 2. The handler is loaded on first access and cached per `(name, version)`.
//! 3. It is mounted under `/app/{name}/{version-as-requested}` so its own routes stay
//!    relative to its root, and the request is delegated verbatim.
//!
//! Cache entries are evicted when their version or project is deleted. Uploads never
//! overwrite an existing version, so entries cannot go stale otherwise. Each eviction
//! bumps the project's generation; a load that started under an older generation
//! still answers its own request but is never cached.

pub mod handlers;

use crate::error::{HostError, HostResult};
use crate::plugin::{Handler, Loader, load_handler};
use crate::registry::{Registry, VersionSelector};

use dashmap::DashMap;
use std::sync::Arc;

pub struct Proxy {
    registry: Arc<Registry>,
    loader: Arc<dyn Loader>,
    cache: DashMap<(String, String), Arc<dyn Handler>>,
    generations: DashMap<String, u64>,
}

impl Proxy {
    pub fn new(registry: Arc<Registry>, loader: Arc<dyn Loader>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            loader,
            cache: DashMap::new(),
            generations: DashMap::new(),
        })
    }

    /// Handler for `name` at `version` (which may be `latest`).
    pub async fn handler(&self, name: &str, version: &str) -> HostResult<Arc<dyn Handler>> {
        let generation = self.generation(name);
        let resolved = self.registry.resolve(name, version).await?;
        let key = (name.to_string(), resolved);

        if let Some(handler) = self.cache.get(&key) {
            return Ok(handler.value().clone());
        }

        let artifact = self.registry.artifact_path(&key.0, &key.1);
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return Err(HostError::NotFound("Project not found".to_string()));
        }

        let loader = self.loader.clone();
        let handler = tokio::task::spawn_blocking(move || load_handler(loader.as_ref(), &artifact))
            .await
            .map_err(|e| HostError::Internal(format!("Loader task failed: {}", e)))?
            .map_err(|e| HostError::Load(e.to_string()))?;

        tracing::info!("Loaded handler for {}/{}", key.0, key.1);

        // Held across the insert so an eviction cannot slip in between check and insert.
        let current = self.generations.entry(key.0.clone()).or_insert(0);
        if *current != generation {
            tracing::debug!("Not caching {}/{}: evicted while loading", key.0, key.1);
            return Ok(handler);
        }
        // A concurrent first access may have won; keep whichever landed first.
        let handler = self.cache.entry(key).or_insert(handler).value().clone();
        drop(current);
        Ok(handler)
    }

    pub fn evict(&self, name: &str, selector: &VersionSelector) {
        let mut generation = self.generations.entry(name.to_string()).or_insert(0);
        *generation += 1;

        match selector {
            VersionSelector::All => self.cache.retain(|(project, _), _| project != name),
            VersionSelector::Version(version) => {
                self.cache.remove(&(name.to_string(), version.clone()));
            }
        }
    }

    fn generation(&self, name: &str) -> u64 {
        self.generations.get(name).map(|generation| *generation).unwrap_or(0)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
