//! Transit feed pipeline.
//!
//! Downloads and caches the static schedule archive and the two GTFS-RT
//! protobuf feeds, fuses them into per-vehicle records, and publishes the
//! result as an atomically swapped in-memory snapshot.

pub mod error;
pub mod fetch;
pub mod fusion;
pub mod realtime;
pub mod static_data;
pub mod store;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::config::FeedConfig;

use error::FeedError;
use fetch::FetchOutcome;
use static_data::ScheduleTables;
use store::{Snapshot, SnapshotStore};
use types::VehicleRecord;

pub struct FeedService {
    client: reqwest::Client,
    config: FeedConfig,
    store: SnapshotStore,
    tables: RwLock<Option<Arc<ScheduleTables>>>,
    /// Serializes refresh runs. A trigger landing during a run waits here and
    /// then executes as its own run against possibly fresh cache files.
    refresh_gate: Mutex<()>,
}

impl FeedService {
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent("poznan-live-api/0.2")
            .build()?;

        Ok(Self {
            client,
            config,
            store: SnapshotStore::new(),
            tables: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        })
    }

    fn cache_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.cache_dir)
    }

    fn archive_path(&self) -> PathBuf {
        self.cache_dir().join("gtfs.zip")
    }

    fn tables_dir(&self) -> PathBuf {
        self.cache_dir().join("gtfs")
    }

    fn vehicle_positions_path(&self) -> PathBuf {
        self.cache_dir().join("vehicle_positions.pb")
    }

    fn trip_updates_path(&self) -> PathBuf {
        self.cache_dir().join("trip_updates.pb")
    }

    /// Run one full refresh to completion. Called once at startup, before
    /// the HTTP listener starts accepting reads.
    pub async fn initialize(&self) -> Result<(), FeedError> {
        info!("Running initial feed refresh...");
        self.refresh().await
    }

    /// Run the pipeline once: fetch all three resources, (re)load the static
    /// tables when needed, decode the realtime feeds, fuse, and swap the new
    /// snapshot in. Any stage failure aborts the run and leaves the published
    /// snapshot untouched.
    pub async fn refresh(&self) -> Result<(), FeedError> {
        let _gate = self.refresh_gate.lock().await;
        let started = std::time::Instant::now();

        let realtime_max_age = Duration::from_secs(self.config.realtime_max_age_secs);
        let static_max_age = Duration::from_secs(self.config.static_max_age_secs);
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        fetch::fetch_cached(
            &self.client,
            &self.config.vehicle_positions_url,
            &self.vehicle_positions_path(),
            realtime_max_age,
            timeout,
        )
        .await?;

        fetch::fetch_cached(
            &self.client,
            &self.config.trip_updates_url,
            &self.trip_updates_path(),
            realtime_max_age,
            timeout,
        )
        .await?;

        let archive_outcome = fetch::fetch_cached(
            &self.client,
            &self.config.static_zip_url,
            &self.archive_path(),
            static_max_age,
            timeout,
        )
        .await?;

        let tables = self.schedule_tables(archive_outcome).await?;

        let vehicle_bytes = tokio::fs::read(self.vehicle_positions_path()).await?;
        let update_bytes = tokio::fs::read(self.trip_updates_path()).await?;
        let vehicle_feed = realtime::decode_feed(&vehicle_bytes)?;
        let update_feed = realtime::decode_feed(&update_bytes)?;

        let vehicles = realtime::vehicle_entities(&vehicle_feed);
        let delays = realtime::trip_delays(&update_feed);
        let records = fusion::fuse_vehicles(&vehicles, &delays, &tables);

        let snapshot = Snapshot {
            schedule: tables,
            delays,
            vehicles: records,
            last_updated: Utc::now(),
        };
        info!(
            vehicles = snapshot.vehicles.len(),
            delayed_trips = snapshot.delays.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Publishing refreshed snapshot"
        );
        self.store.replace(snapshot).await;
        Ok(())
    }

    /// Spawn a refresh without blocking the caller. Failures are logged and
    /// the previous snapshot stays published.
    pub fn trigger_refresh(self: &Arc<Self>) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.refresh().await {
                error!(error = %e, "Background refresh failed");
            }
        });
    }

    /// Parsed static tables, re-extracted and reloaded only when the archive
    /// was freshly downloaded or nothing has been loaded yet.
    async fn schedule_tables(
        &self,
        archive_outcome: FetchOutcome,
    ) -> Result<Arc<ScheduleTables>, FeedError> {
        if archive_outcome == FetchOutcome::CacheFresh {
            if let Some(tables) = self.tables.read().await.as_ref() {
                return Ok(Arc::clone(tables));
            }
        }

        let zip_path = self.archive_path();
        let dest = self.tables_dir();
        let tables = tokio::task::spawn_blocking(move || {
            static_data::extract_archive(&zip_path, &dest)?;
            static_data::load_tables(&dest)
        })
        .await??;

        info!(
            shapes = tables.shapes.len(),
            trips = tables.trips.len(),
            "Loaded static schedule tables into memory"
        );

        let tables = Arc::new(tables);
        let mut guard = self.tables.write().await;
        *guard = Some(Arc::clone(&tables));
        Ok(tables)
    }

    /// Fused vehicle list from the current snapshot.
    pub async fn current_vehicles(&self) -> Result<Vec<VehicleRecord>, FeedError> {
        Ok(self.store.current().await?.vehicles.clone())
    }

    /// Current snapshot, for handlers that need more than the vehicle list.
    pub async fn snapshot(&self) -> Result<Arc<Snapshot>, FeedError> {
        self.store.current().await
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store.last_updated().await
    }

    pub async fn is_loaded(&self) -> bool {
        self.store.is_loaded().await
    }
}
