use crate::error::UpdaterError;
use crate::manifest::Manifest;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the manifest packaged next to the embedded bundle.
pub const EMBEDDED_MANIFEST_FILE: &str = "manifest.json";
/// File name of the bundle shipped inside the application package.
pub const EMBEDDED_BUNDLE_FILE: &str = "app.bundle";

/// Read-only access to the manifest and bundle shipped with the application.
///
/// Accessors are infallible by contract: the data is packaged at build time,
/// so a missing embedded bundle is a packaging defect surfaced when the
/// source is constructed, never during an update cycle.
pub trait EmbeddedSource: Send + Sync {
    /// Manifest describing the embedded bundle.
    fn manifest(&self) -> Manifest;
    /// Path of the embedded bundle file.
    fn bundle_path(&self) -> PathBuf;
}

/// Embedded source backed by a directory inside the application package
/// containing `manifest.json` and `app.bundle`.
#[derive(Debug, Clone)]
pub struct DirEmbeddedSource {
    manifest: Manifest,
    bundle_path: PathBuf,
}

impl DirEmbeddedSource {
    /// Validate and load the packaged manifest and bundle from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, UpdaterError> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(EMBEDDED_MANIFEST_FILE);
        let raw = fs::read(&manifest_path).map_err(|err| {
            UpdaterError::Embedded(format!(
                "manifest unreadable at {}: {err}",
                manifest_path.display()
            ))
        })?;
        let manifest: Manifest = serde_json::from_slice(&raw).map_err(|err| {
            UpdaterError::Embedded(format!(
                "manifest undecodable at {}: {err}",
                manifest_path.display()
            ))
        })?;

        let bundle_path = dir.join(EMBEDDED_BUNDLE_FILE);
        if !bundle_path.is_file() {
            return Err(UpdaterError::Embedded(format!(
                "bundle missing at {}",
                bundle_path.display()
            )));
        }

        Ok(Self {
            manifest,
            bundle_path,
        })
    }
}

impl EmbeddedSource for DirEmbeddedSource {
    fn manifest(&self) -> Manifest {
        self.manifest.clone()
    }

    fn bundle_path(&self) -> PathBuf {
        self.bundle_path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn loads_packaged_manifest_and_bundle() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(EMBEDDED_MANIFEST_FILE),
            serde_json::to_vec(&json!({ "id": "embedded", "version": "1.0.0" })).unwrap(),
        )
        .unwrap();
        fs::write(dir.path().join(EMBEDDED_BUNDLE_FILE), b"embedded-bundle").unwrap();

        let source = DirEmbeddedSource::load(dir.path()).unwrap();
        assert_eq!(source.manifest().id(), Some("embedded"));
        assert_eq!(source.bundle_path(), dir.path().join(EMBEDDED_BUNDLE_FILE));
    }

    #[test]
    fn missing_bundle_is_a_packaging_error() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(EMBEDDED_MANIFEST_FILE),
            serde_json::to_vec(&json!({ "id": "embedded" })).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            DirEmbeddedSource::load(dir.path()),
            Err(UpdaterError::Embedded(_))
        ));
    }
}
