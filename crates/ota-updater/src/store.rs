use crate::error::StoreError;
use crate::manifest::Manifest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

const STAGING_DIR: &str = "staging";
const GENERATIONS_DIR: &str = "generations";
const CURRENT_MARKER: &str = "current";
const RECORD_FILE: &str = "manifest.json";
const BUNDLE_FILE: &str = "bundle";

/// The persisted (manifest, bundle) pair for one activated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationRecord {
    /// Manifest snapshot taken at activation time.
    pub manifest: Manifest,
    /// Absolute path of the activated bundle file.
    pub bundle_path: PathBuf,
    /// Monotonically increasing generation counter.
    pub generation: u64,
}

/// Durable store for activation records, laid out as an arena of immutable
/// generation directories plus one marker file naming the active generation:
///
/// ```text
/// <root>/staging/           in-progress downloads
/// <root>/generations/<N>/   bundle + manifest.json, never mutated
/// <root>/current            name of the active generation, swapped atomically
/// ```
///
/// Activation writes the new generation completely, then replaces the marker
/// via write-to-temp-and-rename. A crash at any point leaves either the old
/// or the new marker in place, each naming a fully written generation.
pub struct UpdateStore {
    root: PathBuf,
    // Serializes activations; readers never need it.
    write_lock: Mutex<()>,
}

impl UpdateStore {
    /// Open (creating if necessary) a store rooted at `root`.
    ///
    /// Leftover staged files from an interrupted download are removed here;
    /// generation directories are left alone until the next activation prunes
    /// them.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR))?;
        fs::create_dir_all(root.join(GENERATIONS_DIR))?;
        let store = Self {
            root,
            write_lock: Mutex::new(()),
        };
        store.clear_staging();
        Ok(store)
    }

    /// Directory downloads are staged into, on the same filesystem as the
    /// generation arena so activation can rename instead of copy.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Load the active record, or `None` on first run.
    pub fn load_current(&self) -> Result<Option<ActivationRecord>, StoreError> {
        let marker = self.root.join(CURRENT_MARKER);
        let name = match fs::read_to_string(&marker) {
            Ok(name) => name.trim().to_string(),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if name.is_empty() {
            return Ok(None);
        }

        let dir = self.root.join(GENERATIONS_DIR).join(&name);
        let raw = fs::read(dir.join(RECORD_FILE)).map_err(|err| {
            StoreError::Corrupt(format!("record for generation {name} unreadable: {err}"))
        })?;
        let record: ActivationRecord = serde_json::from_slice(&raw).map_err(|err| {
            StoreError::Corrupt(format!("record for generation {name} undecodable: {err}"))
        })?;
        if !record.bundle_path.is_file() {
            return Err(StoreError::Corrupt(format!(
                "bundle for generation {name} missing at {}",
                record.bundle_path.display()
            )));
        }
        Ok(Some(record))
    }

    /// Promote a fully staged bundle to the active generation.
    ///
    /// The staged file is moved (not copied) into the new generation
    /// directory, the record is written and fsynced, and only then is the
    /// marker swapped. Until the swap, `load_current` keeps returning the
    /// previous record.
    pub fn activate(
        &self,
        manifest: &Manifest,
        staged_bundle: &Path,
    ) -> Result<ActivationRecord, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|err| err.into_inner());

        let previous = self.load_current()?;
        let generation = previous.as_ref().map(|r| r.generation + 1).unwrap_or(1);
        let dir = self.root.join(GENERATIONS_DIR).join(generation.to_string());
        fs::create_dir_all(&dir)?;

        let bundle_path = dir.join(BUNDLE_FILE);
        fs::rename(staged_bundle, &bundle_path)?;

        let record = ActivationRecord {
            manifest: manifest.clone(),
            bundle_path,
            generation,
        };
        let raw = serde_json::to_vec_pretty(&record)
            .map_err(|err| StoreError::Corrupt(format!("record not serializable: {err}")))?;
        let record_path = dir.join(RECORD_FILE);
        let mut file = fs::File::create(&record_path)?;
        file.write_all(&raw)?;
        file.sync_all()?;

        // Marker swap is the commit point.
        let mut marker = NamedTempFile::new_in(&self.root)?;
        marker.write_all(generation.to_string().as_bytes())?;
        marker.as_file().sync_all()?;
        marker
            .persist(self.root.join(CURRENT_MARKER))
            .map_err(|err| StoreError::Atomicity(err.error))?;

        tracing::info!(generation, "activated bundle generation");

        // Keep the immediately previous generation for rollback; reclaim the
        // rest lazily.
        if let Some(previous) = previous {
            self.prune_older_than(previous.generation);
        }
        Ok(record)
    }

    fn prune_older_than(&self, keep_from: u64) {
        let generations = self.root.join(GENERATIONS_DIR);
        let entries = match fs::read_dir(&generations) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("failed to scan generations for pruning: {err}");
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(number) = name.to_str().and_then(|n| n.parse::<u64>().ok()) else {
                continue;
            };
            if number < keep_from {
                if let Err(err) = fs::remove_dir_all(entry.path()) {
                    tracing::warn!(generation = number, "failed to prune generation: {err}");
                }
            }
        }
    }

    fn clear_staging(&self) {
        let staging = self.staging_dir();
        let Ok(entries) = fs::read_dir(&staging) else {
            return;
        };
        for entry in entries.flatten() {
            if let Err(err) = fs::remove_file(entry.path()) {
                tracing::warn!(path = %entry.path().display(), "failed to clear staged file: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn manifest(id: &str) -> Manifest {
        Manifest::from_value(json!({ "id": id, "version": "1.0.0" })).unwrap()
    }

    fn stage(store: &UpdateStore, body: &[u8]) -> PathBuf {
        let path = store.staging_dir().join(format!("staged-{}", body.len()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn first_run_has_no_current_record() {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path()).unwrap();
        assert!(store.load_current().unwrap().is_none());
    }

    #[test]
    fn activate_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path()).unwrap();

        let staged = stage(&store, b"bundle-one");
        let record = store.activate(&manifest("v1"), &staged).unwrap();
        assert_eq!(record.generation, 1);
        assert_eq!(fs::read(&record.bundle_path).unwrap(), b"bundle-one");
        assert!(!staged.exists());

        let loaded = store.load_current().unwrap().expect("record persisted");
        assert_eq!(loaded, record);
    }

    #[test]
    fn reopening_the_store_sees_the_last_activation() {
        let dir = tempdir().unwrap();
        {
            let store = UpdateStore::open(dir.path()).unwrap();
            let staged = stage(&store, b"bundle-one");
            store.activate(&manifest("v1"), &staged).unwrap();
        }
        let reopened = UpdateStore::open(dir.path()).unwrap();
        let record = reopened.load_current().unwrap().expect("record survives");
        assert_eq!(record.manifest.id(), Some("v1"));
    }

    #[test]
    fn crash_before_marker_swap_preserves_previous_record() {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path()).unwrap();
        let staged = stage(&store, b"bundle-one");
        let first = store.activate(&manifest("v1"), &staged).unwrap();

        // Simulate a crash after the new generation was written but before
        // the marker swap: generation 2 exists on disk, marker still says 1.
        let orphan = dir.path().join(GENERATIONS_DIR).join("2");
        fs::create_dir_all(&orphan).unwrap();
        fs::write(orphan.join(BUNDLE_FILE), b"bundle-two").unwrap();
        let orphan_record = ActivationRecord {
            manifest: manifest("v2"),
            bundle_path: orphan.join(BUNDLE_FILE),
            generation: 2,
        };
        fs::write(
            orphan.join(RECORD_FILE),
            serde_json::to_vec(&orphan_record).unwrap(),
        )
        .unwrap();

        let reopened = UpdateStore::open(dir.path()).unwrap();
        let current = reopened.load_current().unwrap().expect("record intact");
        assert_eq!(current, first);
    }

    #[test]
    fn retains_exactly_one_prior_generation() {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path()).unwrap();

        let releases: [(&str, &[u8]); 3] = [("v1", b"one"), ("v2", b"two"), ("v3", b"three")];
        for (id, body) in releases {
            let staged = stage(&store, body);
            store.activate(&manifest(id), &staged).unwrap();
        }

        let generations = dir.path().join(GENERATIONS_DIR);
        let mut names: Vec<String> = fs::read_dir(&generations)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn marker_naming_a_missing_generation_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = UpdateStore::open(dir.path()).unwrap();
        fs::write(dir.path().join(CURRENT_MARKER), "99").unwrap();
        assert!(matches!(
            store.load_current(),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn opening_clears_leftover_staged_files() {
        let dir = tempdir().unwrap();
        {
            let store = UpdateStore::open(dir.path()).unwrap();
            stage(&store, b"interrupted");
        }
        let store = UpdateStore::open(dir.path()).unwrap();
        let leftovers: Vec<_> = fs::read_dir(store.staging_dir()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
