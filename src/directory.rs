//! Factory directory collaborator seam
//!
//! The directory that owns factory records lives outside this crate; the
//! queue engine trusts any factory id unless a [`FactoryDirectory`] is wired
//! into the manager, in which case mutating calls reject unknown ids.

use async_trait::async_trait;
use std::collections::HashSet;

/// Lookup interface onto the external factory directory
#[async_trait]
pub trait FactoryDirectory: Send + Sync {
    /// Whether a factory with this id exists
    async fn contains(&self, factory_id: &str) -> bool;
}

/// Fixed in-memory directory
///
/// Useful for tests and for deployments whose factory set is loaded once at
/// startup.
pub struct StaticDirectory {
    ids: HashSet<String>,
}

impl StaticDirectory {
    /// Create a directory from a list of factory ids
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of known factories
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[async_trait]
impl FactoryDirectory for StaticDirectory {
    async fn contains(&self, factory_id: &str) -> bool {
        self.ids.contains(factory_id)
    }
}
