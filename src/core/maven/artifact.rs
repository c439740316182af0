use serde::{Deserialize, Serialize};
use std::fmt;

/// A family of versioned artifacts in one Maven repository.
///
/// Feeds live at `<repo>/releases/<path>/` and `<repo>/snapshots/<path>/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ArtifactIdentity {
    pub repository_url: String,
    /// Group path plus artifact id, e.g. `com/lambda/lambda`.
    pub artifact_path: String,
    /// Artifact id used in file names, e.g. `lambda`.
    pub artifact_name: String,
}

impl ArtifactIdentity {
    pub fn new(
        repository_url: impl Into<String>,
        artifact_path: impl Into<String>,
        artifact_name: impl Into<String>,
    ) -> Self {
        Self {
            repository_url: repository_url.into().trim_end_matches('/').to_string(),
            artifact_path: artifact_path.into().trim_matches('/').to_string(),
            artifact_name: artifact_name.into(),
        }
    }

    /// `<repo>/releases/<path>/maven-metadata.xml`
    pub fn stable_metadata_url(&self) -> String {
        format!(
            "{}/releases/{}/maven-metadata.xml",
            self.repository_url, self.artifact_path
        )
    }

    /// `<repo>/snapshots/<path>/maven-metadata.xml`
    pub fn snapshot_metadata_url(&self) -> String {
        format!(
            "{}/snapshots/{}/maven-metadata.xml",
            self.repository_url, self.artifact_path
        )
    }

    /// `<repo>/snapshots/<path>/<version>/maven-metadata.xml`
    pub fn snapshot_version_metadata_url(&self, version: &str) -> String {
        format!(
            "{}/snapshots/{}/{}/maven-metadata.xml",
            self.repository_url, self.artifact_path, version
        )
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.artifact_name, self.artifact_path)
    }
}

/// The timestamped build behind a `-SNAPSHOT` version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotDescriptor {
    pub version: String,
    pub timestamp: String,
    pub build_number: String,
}

impl SnapshotDescriptor {
    /// Version with every `-SNAPSHOT` marker removed.
    pub fn base_version(&self) -> String {
        self.version.replace("-SNAPSHOT", "")
    }
}

/// A concrete build chosen from one of the two feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedVersion {
    Stable(String),
    Snapshot(SnapshotDescriptor),
}

impl ResolvedVersion {
    /// File name of the build; doubles as the cache key.
    pub fn file_name(&self, identity: &ArtifactIdentity) -> String {
        match self {
            ResolvedVersion::Stable(v) => format!("{}-{}.jar", identity.artifact_name, v),
            ResolvedVersion::Snapshot(s) => format!(
                "{}-{}-{}-{}.jar",
                identity.artifact_name,
                s.base_version(),
                s.timestamp,
                s.build_number
            ),
        }
    }

    pub fn jar_url(&self, identity: &ArtifactIdentity) -> String {
        let (feed, version) = match self {
            ResolvedVersion::Stable(v) => ("releases", v.as_str()),
            ResolvedVersion::Snapshot(s) => ("snapshots", s.version.as_str()),
        };
        format!(
            "{}/{}/{}/{}/{}",
            identity.repository_url,
            feed,
            identity.artifact_path,
            version,
            self.file_name(identity)
        )
    }

    pub fn checksum_url(&self, identity: &ArtifactIdentity) -> String {
        format!("{}.md5", self.jar_url(identity))
    }
}
