use crate::manifest::{Manifest, ID_KEY, REVISION_KEY};

/// Policy answering whether a candidate manifest warrants a download.
///
/// Implementations must be pure and deterministic: no I/O, no hidden state,
/// identical inputs always yield the identical answer. Returning `false` is
/// the normal "no update" outcome, never an error.
pub trait ManifestComparator: Send + Sync {
    /// Decide whether `candidate` should replace `current`.
    fn should_download(&self, current: &Manifest, candidate: &Manifest) -> bool;
}

/// What a comparator does when the field it compares is missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRevisionPolicy {
    /// Download anyway, favouring freshness over stability.
    FailOpen,
    /// Keep the current bundle, favouring stability over freshness.
    #[default]
    FailClosed,
}

impl MissingRevisionPolicy {
    fn should_download(self) -> bool {
        matches!(self, MissingRevisionPolicy::FailOpen)
    }
}

/// Compares semantic versions in a designated revision field.
///
/// Downloads only when the candidate's version is strictly greater than the
/// current one. The [`MissingRevisionPolicy`] decides the outcome whenever
/// either manifest lacks the field or it does not parse as semver.
#[derive(Debug, Clone)]
pub struct RevisionComparator {
    field: String,
    policy: MissingRevisionPolicy,
}

impl RevisionComparator {
    pub fn new() -> Self {
        Self {
            field: REVISION_KEY.to_string(),
            policy: MissingRevisionPolicy::default(),
        }
    }

    /// Compare a different manifest field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Override the missing/malformed-field policy.
    pub fn with_policy(mut self, policy: MissingRevisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn parse(&self, manifest: &Manifest) -> Option<semver::Version> {
        let raw = manifest.str_field(&self.field)?;
        semver::Version::parse(raw).ok()
    }
}

impl Default for RevisionComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestComparator for RevisionComparator {
    fn should_download(&self, current: &Manifest, candidate: &Manifest) -> bool {
        match (self.parse(current), self.parse(candidate)) {
            (Some(current), Some(candidate)) => candidate > current,
            _ => self.policy.should_download(),
        }
    }
}

/// Downloads whenever the identity field differs between the two manifests.
///
/// Both manifests lacking the field compare equal, so nothing is downloaded;
/// one side lacking it counts as a difference.
#[derive(Debug, Clone)]
pub struct IdComparator {
    field: String,
}

impl IdComparator {
    pub fn new() -> Self {
        Self {
            field: ID_KEY.to_string(),
        }
    }

    /// Compare a different manifest field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

impl Default for IdComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestComparator for IdComparator {
    fn should_download(&self, current: &Manifest, candidate: &Manifest) -> bool {
        current.get(&self.field) != candidate.get(&self.field)
    }
}

/// Compares a numeric timestamp field, downloading when the candidate is
/// strictly newer. Missing or non-numeric fields follow the policy.
#[derive(Debug, Clone)]
pub struct TimestampComparator {
    field: String,
    policy: MissingRevisionPolicy,
}

impl TimestampComparator {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            policy: MissingRevisionPolicy::default(),
        }
    }

    /// Override the missing/malformed-field policy.
    pub fn with_policy(mut self, policy: MissingRevisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn parse(&self, manifest: &Manifest) -> Option<i64> {
        manifest.get(&self.field).and_then(|value| value.as_i64())
    }
}

impl ManifestComparator for TimestampComparator {
    fn should_download(&self, current: &Manifest, candidate: &Manifest) -> bool {
        match (self.parse(current), self.parse(candidate)) {
            (Some(current), Some(candidate)) => candidate > current,
            _ => self.policy.should_download(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> Manifest {
        Manifest::from_value(value).unwrap()
    }

    #[test]
    fn revision_comparator_downloads_strictly_newer() {
        let cmp = RevisionComparator::new();
        let v1 = manifest(json!({ "version": "1.0.0" }));
        let v2 = manifest(json!({ "version": "1.0.1" }));
        assert!(cmp.should_download(&v1, &v2));
        assert!(!cmp.should_download(&v2, &v1));
        assert!(!cmp.should_download(&v1, &v1));
    }

    #[test]
    fn revision_comparator_is_deterministic() {
        let cmp = RevisionComparator::new();
        let a = manifest(json!({ "version": "2.3.4" }));
        let b = manifest(json!({ "version": "2.4.0" }));
        let first = cmp.should_download(&a, &b);
        let second = cmp.should_download(&a, &b);
        assert_eq!(first, second);
    }

    #[test]
    fn revision_comparator_fails_closed_by_default() {
        let cmp = RevisionComparator::new();
        let good = manifest(json!({ "version": "1.0.0" }));
        let bad = manifest(json!({ "version": "not-a-version" }));
        let empty = manifest(json!({}));
        assert!(!cmp.should_download(&good, &bad));
        assert!(!cmp.should_download(&good, &empty));
    }

    #[test]
    fn revision_comparator_can_fail_open() {
        let cmp = RevisionComparator::new().with_policy(MissingRevisionPolicy::FailOpen);
        let good = manifest(json!({ "version": "1.0.0" }));
        let empty = manifest(json!({}));
        assert!(cmp.should_download(&good, &empty));
    }

    #[test]
    fn id_comparator_matches_identity_only() {
        let cmp = IdComparator::new();
        let v1 = manifest(json!({ "id": "v1" }));
        let v1_again = manifest(json!({ "id": "v1", "extra": true }));
        let v2 = manifest(json!({ "id": "v2" }));
        assert!(!cmp.should_download(&v1, &v1_again));
        assert!(cmp.should_download(&v1, &v2));
    }

    #[test]
    fn id_comparator_treats_both_missing_as_equal() {
        let cmp = IdComparator::new();
        let empty = manifest(json!({}));
        let tagged = manifest(json!({ "id": "v1" }));
        assert!(!cmp.should_download(&empty, &empty.clone()));
        assert!(cmp.should_download(&empty, &tagged));
    }

    #[test]
    fn timestamp_comparator_orders_numerically() {
        let cmp = TimestampComparator::new("commitTime");
        let older = manifest(json!({ "commitTime": 1_700_000_000 }));
        let newer = manifest(json!({ "commitTime": 1_700_000_100 }));
        assert!(cmp.should_download(&older, &newer));
        assert!(!cmp.should_download(&newer, &older));
        assert!(!cmp.should_download(&older, &older.clone()));
    }
}
