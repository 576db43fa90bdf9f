//! The retrieval and tagging capability consumed by the engine.
//!
//! Storage backends live outside this crate. They implement
//! [`ObjectProvider`] to load a [`Table`] for an object key and to write a
//! metadata tag back onto the stored object. [`InMemoryProvider`] is a
//! map-backed implementation for embedding and tests.

use crate::prelude::*;
use crate::table::Table;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A source of tabular objects that can also store metadata tags.
///
/// # Examples
///
/// ```rust,ignore
/// use daqual::provider::ObjectProvider;
///
/// # async fn example(provider: &dyn ObjectProvider) -> daqual::prelude::Result<()> {
/// let table = provider.retrieve("daqual/iso-currencies.csv").await?;
/// provider.tag("daqual/iso-currencies.csv", "quality_score", "1").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ObjectProvider: Debug + Send + Sync {
    /// Loads the object stored under `object_key`.
    ///
    /// A missing or inaccessible object must be reported as
    /// [`DaqualError::Retrieval`].
    async fn retrieve(&self, object_key: &str) -> Result<Table>;

    /// Sets a metadata tag on the stored object, replacing any previous value.
    ///
    /// Failures are reported as [`DaqualError::Tag`].
    async fn tag(&self, object_key: &str, tag: &str, value: &str) -> Result<()>;

    /// Returns a human-readable description of this provider.
    fn description(&self) -> String;
}

/// A parsed `<container>/<path>` object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    container: String,
    path: String,
}

impl ObjectKey {
    /// Splits a key at its first `/`.
    pub fn parse(key: &str) -> Result<Self> {
        match key.split_once('/') {
            Some((container, path)) if !container.is_empty() && !path.is_empty() => Ok(Self {
                container: container.to_string(),
                path: path.to_string(),
            }),
            _ => Err(DaqualError::Format(format!(
                "object key '{key}' is not of the form <container>/<path>"
            ))),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.path)
    }
}

/// Provider backed by an in-memory map of tables.
///
/// Tags are kept per object; retrievals are counted so callers can check
/// memoization.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    tables: HashMap<String, Table>,
    tags: Mutex<HashMap<String, HashMap<String, String>>>,
    failing_tags: HashSet<String>,
    retrievals: AtomicUsize,
    tag_writes: AtomicUsize,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a table under the given key.
    pub fn with_table(mut self, object_key: impl Into<String>, table: Table) -> Self {
        self.tables.insert(object_key.into(), table);
        self
    }

    /// Makes every tag write for this key fail.
    pub fn with_failing_tags(mut self, object_key: impl Into<String>) -> Self {
        self.failing_tags.insert(object_key.into());
        self
    }

    /// Number of successful and failed `retrieve` calls so far.
    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    /// Number of successful tag writes so far.
    pub fn tag_writes(&self) -> usize {
        self.tag_writes.load(Ordering::SeqCst)
    }

    /// Current value of a tag, if set.
    pub async fn tag_value(&self, object_key: &str, tag: &str) -> Option<String> {
        self.tags
            .lock()
            .await
            .get(object_key)
            .and_then(|tags| tags.get(tag).cloned())
    }
}

#[async_trait]
impl ObjectProvider for InMemoryProvider {
    async fn retrieve(&self, object_key: &str) -> Result<Table> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        match self.tables.get(object_key) {
            Some(table) => {
                info!(object.key = %object_key, rows = table.num_rows(), "Retrieved object");
                Ok(table.clone())
            }
            None => Err(DaqualError::retrieval(object_key, "object not found")),
        }
    }

    async fn tag(&self, object_key: &str, tag: &str, value: &str) -> Result<()> {
        if self.failing_tags.contains(object_key) {
            return Err(DaqualError::tag(object_key, tag, "tagging rejected"));
        }
        debug!(object.key = %object_key, tag, value, "Setting tag");
        self.tags
            .lock()
            .await
            .entry(object_key.to_string())
            .or_default()
            .insert(tag.to_string(), value.to_string());
        self.tag_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn description(&self) -> String {
        format!("in-memory provider ({} objects)", self.tables.len())
    }
}
