use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{LoaderError, LoaderResult};

/// Minimal `maven-metadata.xml` model – only the nodes the resolver reads.
///
/// The same shape covers both the artifact-level index (`versioning/versions`)
/// and the per-version snapshot index (`versioning/snapshot`).
#[derive(Debug, Deserialize, Default)]
pub struct MavenMetadata {
    #[serde(default)]
    pub versioning: Option<MavenVersioning>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MavenVersioning {
    #[serde(default)]
    pub versions: Option<MavenVersions>,
    #[serde(default)]
    pub snapshot: Option<MavenSnapshot>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MavenVersions {
    #[serde(rename = "version", default)]
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MavenSnapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "buildNumber", default)]
    pub build_number: Option<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> LoaderResult<Self> {
        let doc: MavenMetadata = from_str(xml)?;
        Ok(doc)
    }

    /// Listed versions in document order (oldest first), trimmed.
    pub fn versions(&self) -> Vec<String> {
        self.versioning
            .as_ref()
            .and_then(|v| v.versions.as_ref())
            .map(|v| {
                v.items
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `(timestamp, buildNumber)` of a snapshot build, if both are present.
    pub fn snapshot_build(&self) -> LoaderResult<(String, String)> {
        let snapshot = self
            .versioning
            .as_ref()
            .and_then(|v| v.snapshot.as_ref())
            .ok_or_else(|| LoaderError::MetadataIncomplete("missing <snapshot>".into()))?;

        let timestamp = snapshot
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LoaderError::MetadataIncomplete("missing <timestamp>".into()))?;
        let build_number = snapshot
            .build_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LoaderError::MetadataIncomplete("missing <buildNumber>".into()))?;

        Ok((timestamp.to_string(), build_number.to_string()))
    }
}

/// First whitespace-separated token of a `.md5` sidecar, lowercased.
pub fn parse_checksum(text: &str) -> LoaderResult<String> {
    text.split_whitespace()
        .next()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| LoaderError::MetadataIncomplete("empty checksum file".into()))
}
