use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use k8s_openapi::chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogSource, Discovered, GroupVersion, GroupVersionBucket};

pub mod client;

/// How long a discovery cache file is served before the server is asked again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Represent the discovery cache file format,
/// which includes the timestamp of when the resource lists were fetched
/// and the lists themselves.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryCacheFile {
    /// The timestamp when the resource lists were saved to the cache.
    pub updated_at: DateTime<Utc>,
    /// The preferred resource lists, grouped by group-version.
    pub buckets: Vec<GroupVersionBucket>,
}

impl DiscoveryCacheFile {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        Utc::now() - self.updated_at <= ttl
    }
}

/// Load the discovery cache from a file at the specified path.
pub fn load_discovery_cache(path: &Path) -> anyhow::Result<DiscoveryCacheFile> {
    let cache_data = fs::read_to_string(path).context("Failed to read discovery cache file")?;
    serde_json::from_str(&cache_data).context("Failed to parse discovery cache file")
}

/// Save the discovery cache to a file at the specified path.
///
/// The file is written next to its final location first and then renamed,
/// so readers never observe a partially written cache.
pub fn save_discovery_cache(path: &Path, buckets: &[GroupVersionBucket]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory at {:?}", parent))?;
    }

    let cache_file = DiscoveryCacheFile {
        updated_at: Utc::now(),
        buckets: buckets.to_vec(),
    };

    let cache_data = serde_json::to_vec(&cache_file)
        .context("Failed to serialize discovery cache data to JSON")?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, cache_data)
        .with_context(|| format!("Failed to write discovery cache to {:?}", tmp_path))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move discovery cache into place at {:?}", path))?;
    Ok(())
}

/// The directory discovery caches are kept in when none is configured.
pub fn default_cache_dir() -> Option<PathBuf> {
    Some(dirs::cache_dir()?.join("kubex").join("discovery"))
}

/// The cache file of `context` inside `cache_dir`.
pub fn discovery_cache_path(cache_dir: &Path, context: &str) -> PathBuf {
    let sanitized_context = context
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();

    cache_dir.join(format!("{sanitized_context}.json"))
}

/// The distinct API group names recorded in a discovery cache, in cache order.
/// The core group is not listed.
pub fn cached_api_groups(path: &Path) -> anyhow::Result<Vec<String>> {
    let cache = load_discovery_cache(path)?;
    let mut groups: Vec<String> = Vec::new();
    for bucket in &cache.buckets {
        let Ok(gv) = bucket.group_version().parse::<GroupVersion>() else {
            continue;
        };
        if !gv.group.is_empty() && !groups.contains(&gv.group) {
            groups.push(gv.group);
        }
    }
    Ok(groups)
}

/// [`CatalogSource`] that serves a fresh on-disk copy of another source's
/// resource lists, and refreshes it after every complete fetch.
pub struct CachedCatalog<S> {
    inner: S,
    path: Option<PathBuf>,
    ttl: Duration,
    invalidated: bool,
}

impl<S: CatalogSource> CachedCatalog<S> {
    /// Caches `inner` at `path`. Without a path the inner source is used as is.
    pub fn new(inner: S, path: Option<PathBuf>) -> Self {
        Self {
            inner,
            path,
            ttl: DEFAULT_CACHE_TTL,
            invalidated: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load_fresh(&self) -> Option<Vec<GroupVersionBucket>> {
        let path = self.path.as_deref()?;
        match load_discovery_cache(path) {
            Ok(cache) if cache.is_fresh(self.ttl) => {
                tracing::debug!(?path, "serving discovery cache");
                Some(cache.buckets)
            }
            Ok(cache) => {
                tracing::debug!(?path, updated_at = %cache.updated_at, "discovery cache expired");
                None
            }
            Err(err) => {
                tracing::debug!(?path, "discovery cache unavailable: {err:#}");
                None
            }
        }
    }
}

impl<S: CatalogSource> CatalogSource for CachedCatalog<S> {
    async fn fetch_preferred_resources(&mut self) -> Discovered {
        if !self.invalidated {
            if let Some(buckets) = self.load_fresh() {
                return Discovered::complete(buckets);
            }
        }

        let discovered = self.inner.fetch_preferred_resources().await;
        self.invalidated = false;

        if let (Some(path), None) = (&self.path, &discovered.error) {
            if let Err(err) = save_discovery_cache(path, &discovered.buckets) {
                tracing::warn!("failed to update discovery cache: {err:#}");
            }
        }
        discovered
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
        self.inner.invalidate();
    }
}
