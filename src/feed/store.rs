//! The atomically swapped snapshot store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::error::FeedError;
use super::static_data::ScheduleTables;
use super::types::VehicleRecord;

/// The complete fused dataset of one refresh. Replaced as a whole; a reader
/// holding the `Arc` never observes fields from two different refreshes.
#[derive(Debug)]
pub struct Snapshot {
    pub schedule: Arc<ScheduleTables>,
    pub delays: HashMap<String, i32>,
    pub vehicles: Vec<VehicleRecord>,
    pub last_updated: DateTime<Utc>,
}

/// Holder of the current snapshot. The only write is a single pointer swap
/// under the write lock; a failed refresh never touches it.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Current snapshot, or `NoDataYet` before the first successful refresh.
    pub async fn current(&self) -> Result<Arc<Snapshot>, FeedError> {
        self.inner
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or(FeedError::NoDataYet)
    }

    /// Swap in a freshly built snapshot.
    pub async fn replace(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        let mut guard = self.inner.write().await;
        *guard = Some(snapshot);
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.as_ref().map(|s| s.last_updated)
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
