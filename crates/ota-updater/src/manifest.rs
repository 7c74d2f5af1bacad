use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the URL of the bundle described by a manifest.
pub const BUNDLE_URL_KEY: &str = "bundleUrl";
/// Key holding the opaque identity of a bundle revision.
pub const ID_KEY: &str = "id";
/// Key holding the revision/version string of a bundle.
pub const REVISION_KEY: &str = "version";

/// Metadata describing one bundle revision.
///
/// A manifest is an opaque JSON object. The engine only ever extracts the
/// bundle URL from it; everything else is interpreted exclusively by the
/// installed [`ManifestComparator`](crate::ManifestComparator). Equality via
/// `PartialEq` is raw document equality and carries no staleness meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(Map<String, Value>);

impl Manifest {
    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Look up an arbitrary field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a field expected to be a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// URL of the bundle this manifest describes, if present.
    pub fn bundle_url(&self) -> Option<&str> {
        self.str_field(BUNDLE_URL_KEY)
    }

    /// Opaque revision identity, if present.
    pub fn id(&self) -> Option<&str> {
        self.str_field(ID_KEY)
    }

    /// Revision/version string, if present.
    pub fn revision(&self) -> Option<&str> {
        self.str_field(REVISION_KEY)
    }
}

impl From<Map<String, Value>> for Manifest {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: Value) -> Manifest {
        Manifest::from_value(value).expect("manifest must be a JSON object")
    }

    #[test]
    fn extracts_bundle_url_and_identity() {
        let m = manifest(json!({
            "id": "rev-7",
            "version": "1.2.0",
            "bundleUrl": "https://updates.example/bundles/rev-7.bundle",
        }));
        assert_eq!(
            m.bundle_url(),
            Some("https://updates.example/bundles/rev-7.bundle")
        );
        assert_eq!(m.id(), Some("rev-7"));
        assert_eq!(m.revision(), Some("1.2.0"));
    }

    #[test]
    fn missing_or_non_string_fields_are_none() {
        let m = manifest(json!({ "bundleUrl": 42 }));
        assert_eq!(m.bundle_url(), None);
        assert_eq!(m.id(), None);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(Manifest::from_value(json!(["not", "an", "object"])).is_none());
        assert!(Manifest::from_value(json!("plain string")).is_none());
    }

    #[test]
    fn serde_round_trip_is_lossless() {
        let m = manifest(json!({ "id": "a", "nested": { "k": [1, 2] } }));
        let raw = serde_json::to_vec(&m).unwrap();
        let back: Manifest = serde_json::from_slice(&raw).unwrap();
        assert_eq!(m, back);
    }
}
