//! Over-the-air bundle updates with atomic activation.
//!
//! This crate fetches a remote manifest describing the latest application
//! bundle, decides through a pluggable [`ManifestComparator`] whether the
//! running bundle is stale, downloads the replacement into a staging area,
//! and atomically activates it. The engine guarantees that
//! [`UpdateEngine::bundle_path`] always points at a complete, consistent
//! bundle: the embedded one on first run, or the last fully activated
//! generation afterwards. Network failures, partial downloads, and store
//! errors end the cycle without ever disturbing the active bundle.
//!
//! ```ignore
//! use ota_updater::{
//!     DirEmbeddedSource, RevisionComparator, UpdateConfig, UpdateEngine, UpdateStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> ota_updater::Result<()> {
//! let config = UpdateConfig::new("https://updates.example/manifest.json".parse().unwrap())
//!     .channel_identifier("stable");
//! let store = UpdateStore::open("/var/lib/app/updates")?;
//! let embedded = DirEmbeddedSource::load("/opt/app/embedded")?;
//! let engine = UpdateEngine::new(
//!     config,
//!     Arc::new(RevisionComparator::new()),
//!     store,
//!     Arc::new(embedded),
//! )?;
//!
//! engine.check_and_update().await?;
//! let bundle = engine.bundle_path();
//! // load application code from `bundle`
//! # Ok(())
//! # }
//! ```

mod comparator;
mod config;
mod downloader;
mod embedded;
mod engine;
mod error;
mod fetcher;
mod manifest;
mod store;

pub use comparator::{
    IdComparator, ManifestComparator, MissingRevisionPolicy, RevisionComparator,
    TimestampComparator,
};
pub use config::UpdateConfig;
pub use downloader::{BundleDownloader, HttpBundleDownloader, StagedBundle};
pub use embedded::{
    DirEmbeddedSource, EmbeddedSource, EMBEDDED_BUNDLE_FILE, EMBEDDED_MANIFEST_FILE,
};
pub use engine::{CycleOutcome, CycleStage, LastError, UpdateEngine, UpdateEngineBuilder};
pub use error::{DownloadError, FetchError, Result, StoreError, UpdaterError};
pub use fetcher::{HttpManifestFetcher, ManifestFetcher, CHANNEL_HEADER};
pub use manifest::{Manifest, BUNDLE_URL_KEY, ID_KEY, REVISION_KEY};
pub use store::{ActivationRecord, UpdateStore};
