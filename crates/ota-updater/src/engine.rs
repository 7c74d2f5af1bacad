use crate::comparator::ManifestComparator;
use crate::config::UpdateConfig;
use crate::downloader::{BundleDownloader, HttpBundleDownloader};
use crate::embedded::EmbeddedSource;
use crate::error::{FetchError, Result, UpdaterError};
use crate::fetcher::{HttpManifestFetcher, ManifestFetcher};
use crate::manifest::Manifest;
use crate::store::{ActivationRecord, UpdateStore};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Result of one completed update cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// The candidate manifest did not warrant a download.
    NoUpdate,
    /// A new bundle was downloaded and activated.
    Updated(ActivationRecord),
}

/// Stage of the cycle at which the last failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Fetch,
    Download,
    Activate,
}

/// Snapshot of the most recent cycle failure, for caller-side retry
/// scheduling or telemetry.
#[derive(Debug, Clone)]
pub struct LastError {
    pub stage: CycleStage,
    pub message: String,
}

/// Orchestrates the update cycle:
/// load current state, fetch the candidate manifest, compare, download if
/// warranted, activate atomically.
///
/// The engine performs exactly one cycle per [`check_and_update`] call and
/// admits at most one in-flight cycle; a second call while one is running is
/// rejected with [`UpdaterError::CycleInProgress`]. Whatever happens during a
/// cycle, [`bundle_path`] keeps pointing at the last fully activated bundle,
/// or the embedded one if nothing was ever activated.
///
/// [`check_and_update`]: UpdateEngine::check_and_update
/// [`bundle_path`]: UpdateEngine::bundle_path
pub struct UpdateEngine {
    config: UpdateConfig,
    comparator: Arc<dyn ManifestComparator>,
    fetcher: Arc<dyn ManifestFetcher>,
    downloader: Arc<dyn BundleDownloader>,
    store: UpdateStore,
    embedded: Arc<dyn EmbeddedSource>,
    // Snapshot of the active record; the store stays the source of truth.
    current: RwLock<Option<ActivationRecord>>,
    last_error: RwLock<Option<LastError>>,
    // Single-flight guard for the whole cycle.
    cycle: Mutex<()>,
}

/// Builder for [`UpdateEngine`], mainly to swap the network transports.
pub struct UpdateEngineBuilder {
    config: UpdateConfig,
    comparator: Arc<dyn ManifestComparator>,
    store: UpdateStore,
    embedded: Arc<dyn EmbeddedSource>,
    fetcher: Option<Arc<dyn ManifestFetcher>>,
    downloader: Option<Arc<dyn BundleDownloader>>,
}

impl UpdateEngineBuilder {
    /// Replace the default HTTP manifest fetcher.
    pub fn fetcher(mut self, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Replace the default HTTP bundle downloader.
    pub fn downloader(mut self, downloader: Arc<dyn BundleDownloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    /// Build the engine, loading the persisted activation record if any.
    pub fn build(self) -> Result<UpdateEngine> {
        let current = self.store.load_current()?;
        Ok(UpdateEngine {
            config: self.config,
            comparator: self.comparator,
            fetcher: self
                .fetcher
                .unwrap_or_else(|| Arc::new(HttpManifestFetcher::new())),
            downloader: self
                .downloader
                .unwrap_or_else(|| Arc::new(HttpBundleDownloader::new())),
            store: self.store,
            embedded: self.embedded,
            current: RwLock::new(current),
            last_error: RwLock::new(None),
            cycle: Mutex::new(()),
        })
    }
}

impl UpdateEngine {
    /// Start building an engine over the given collaborators.
    pub fn builder(
        config: UpdateConfig,
        comparator: Arc<dyn ManifestComparator>,
        store: UpdateStore,
        embedded: Arc<dyn EmbeddedSource>,
    ) -> UpdateEngineBuilder {
        UpdateEngineBuilder {
            config,
            comparator,
            store,
            embedded,
            fetcher: None,
            downloader: None,
        }
    }

    /// Construct an engine with the default HTTP transports.
    pub fn new(
        config: UpdateConfig,
        comparator: Arc<dyn ManifestComparator>,
        store: UpdateStore,
        embedded: Arc<dyn EmbeddedSource>,
    ) -> Result<Self> {
        Self::builder(config, comparator, store, embedded).build()
    }

    /// Run one update cycle to completion.
    ///
    /// Any failure ends the cycle without touching the previously active
    /// generation; the error is returned and also retained for
    /// [`last_error`](UpdateEngine::last_error).
    pub async fn check_and_update(&self) -> Result<CycleOutcome> {
        let _in_flight = self
            .cycle
            .try_lock()
            .map_err(|_| UpdaterError::CycleInProgress)?;
        *self
            .last_error
            .write()
            .unwrap_or_else(|err| err.into_inner()) = None;

        let current_manifest = match self.read_current() {
            Some(record) => record.manifest,
            None => self.embedded.manifest(),
        };

        tracing::debug!(url = %self.config.manifest_url(), "checking for bundle update");
        let candidate = match self.fetcher.fetch_manifest(&self.config).await {
            Ok(candidate) => candidate,
            Err(err) => {
                self.record_failure(CycleStage::Fetch, &err);
                return Err(err.into());
            }
        };

        if !self
            .comparator
            .should_download(&current_manifest, &candidate)
        {
            tracing::debug!("candidate manifest does not warrant a download");
            return Ok(CycleOutcome::NoUpdate);
        }

        let bundle_url = match candidate.bundle_url() {
            Some(url) => url.to_string(),
            None => {
                let err = FetchError::MalformedResponse(
                    "candidate manifest has no bundle URL".to_string(),
                );
                self.record_failure(CycleStage::Fetch, &err);
                return Err(err.into());
            }
        };

        let staged = match self
            .downloader
            .download(
                &bundle_url,
                self.config.bundle_timeout(),
                &self.store.staging_dir(),
            )
            .await
        {
            Ok(staged) => staged,
            Err(err) => {
                self.record_failure(CycleStage::Download, &err);
                return Err(err.into());
            }
        };
        tracing::info!(url = %bundle_url, bytes = staged.len, "bundle downloaded, activating");

        let record = match self.store.activate(&candidate, &staged.path) {
            Ok(record) => record,
            Err(err) => {
                if let Err(cleanup) = fs::remove_file(&staged.path) {
                    tracing::warn!(
                        path = %staged.path.display(),
                        "failed to discard staged bundle: {cleanup}"
                    );
                }
                self.record_failure(CycleStage::Activate, &err);
                return Err(err.into());
            }
        };

        *self
            .current
            .write()
            .unwrap_or_else(|err| err.into_inner()) = Some(record.clone());
        Ok(CycleOutcome::Updated(record))
    }

    /// Path of the bundle the application should execute.
    ///
    /// Always the last fully activated bundle, or the embedded one on first
    /// run; never a partial artifact.
    pub fn bundle_path(&self) -> PathBuf {
        match self.read_current() {
            Some(record) => record.bundle_path,
            None => self.embedded.bundle_path(),
        }
    }

    /// Manifest describing the bundle at [`bundle_path`](UpdateEngine::bundle_path).
    pub fn current_manifest(&self) -> Manifest {
        match self.read_current() {
            Some(record) => record.manifest,
            None => self.embedded.manifest(),
        }
    }

    /// The active activation record, if any generation has ever activated.
    pub fn current_record(&self) -> Option<ActivationRecord> {
        self.read_current()
    }

    /// The failure recorded by the most recent cycle, if it failed.
    pub fn last_error(&self) -> Option<LastError> {
        self.last_error
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn read_current(&self) -> Option<ActivationRecord> {
        self.current
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn record_failure(&self, stage: CycleStage, err: &dyn std::fmt::Display) {
        let message = err.to_string();
        tracing::warn!(?stage, "update cycle failed: {message}");
        *self
            .last_error
            .write()
            .unwrap_or_else(|err| err.into_inner()) = Some(LastError { stage, message });
    }
}
