//! Opt-in cache of derived tables, keyed by source path and campaign cost.
//!
//! Results are identical with or without the cache; it only skips re-reading and
//! re-deriving a source that was already processed with the same parameters.

use crate::data::{DataLoader, DerivedTable, MetricDeriver};
use crate::error::PipelineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: PathBuf,
    campaign_cost_bits: u64,
}

#[derive(Debug)]
struct CacheEntry {
    /// Path as the caller gave it; the canonical form is unavailable once the file is gone.
    requested: PathBuf,
    table: Arc<DerivedTable>,
}

/// Caller-owned cache of derived tables.
#[derive(Debug, Default)]
pub struct PipelineCache {
    loader: DataLoader,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl PipelineCache {
    pub fn new(loader: DataLoader) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
        }
    }

    /// Return the derived table for `path`, loading and deriving it on first use.
    pub fn get_or_load(
        &mut self,
        path: impl AsRef<Path>,
        campaign_cost: f64,
    ) -> Result<Arc<DerivedTable>, PipelineError> {
        let path = path.as_ref();
        // Canonicalizing fails for missing files; the loader reports those.
        let source = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let key = CacheKey {
            source,
            campaign_cost_bits: campaign_cost.to_bits(),
        };

        if let Some(hit) = self.entries.get(&key) {
            debug!(source = %key.source.display(), "Derived table cache hit");
            return Ok(Arc::clone(&hit.table));
        }

        let table = self.loader.load_csv(path)?;
        let derived = Arc::new(MetricDeriver::derive(&table, campaign_cost)?);
        self.entries.insert(
            key,
            CacheEntry {
                requested: path.to_path_buf(),
                table: Arc::clone(&derived),
            },
        );
        Ok(derived)
    }

    /// Drop every cached entry for `path`.
    pub fn invalidate(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let source = path.canonicalize().ok();
        self.entries.retain(|key, entry| {
            entry.requested != path && source.as_deref() != Some(key.source.as_path())
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
