/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Failures while retrieving the remote manifest.
///
/// All of these are recoverable at the engine level: they end the current
/// update cycle without touching persisted state.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// No response within the configured manifest request timeout.
    #[error("manifest request timed out")]
    Timeout,
    /// Connection-level failure talking to the update server.
    #[error("manifest request failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The response body could not be parsed into a manifest.
    #[error("manifest response is malformed: {0}")]
    MalformedResponse(String),
    /// The update server answered with a non-success status.
    #[error("manifest request returned HTTP {0}")]
    Http(reqwest::StatusCode),
}

/// Failures while downloading a bundle into the staging area.
#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    /// No response within the configured bundle request timeout.
    #[error("bundle download timed out")]
    Timeout,
    /// Connection-level failure or non-success status from the bundle host.
    #[error("bundle download failed: {0}")]
    Network(#[source] reqwest::Error),
    /// The body ended before the declared content length was reached.
    #[error("bundle download truncated: expected {expected} bytes, got {actual}")]
    IncompleteWrite {
        /// Bytes declared by the server.
        expected: u64,
        /// Bytes actually written to the staging file.
        actual: u64,
    },
    /// The staging file could not be created or written.
    #[error("bundle could not be staged: {0}")]
    Storage(#[from] std::io::Error),
}

/// Failures in the durable update store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The final marker swap could not be committed atomically.
    #[error("activation could not be committed: {0}")]
    Atomicity(#[source] std::io::Error),
    /// An I/O operation on the store directory failed.
    #[error("update store I/O failed: {0}")]
    Storage(#[from] std::io::Error),
    /// Persisted state references a generation that is missing or unreadable.
    #[error("update store is corrupt: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the update engine.
#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    /// Fetching the candidate manifest failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Downloading the candidate bundle failed.
    #[error(transparent)]
    Download(#[from] DownloadError),
    /// Persisting the new activation record failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The embedded manifest or bundle is missing from the package.
    #[error("embedded bundle is not packaged correctly: {0}")]
    Embedded(String),
    /// Another update cycle is already running on this engine.
    #[error("an update cycle is already in progress")]
    CycleInProgress,
}
