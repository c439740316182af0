use std::sync::Arc;

use tracing::{debug, warn};

use super::artifact::{ArtifactIdentity, SnapshotDescriptor};
use super::metadata::{parse_checksum, MavenMetadata};
use crate::core::downloader::Fetch;
use crate::core::error::{LoaderError, Lookup};

/// Queries the stable and snapshot feeds of one artifact family.
///
/// Every query is a fresh network round-trip; nothing is memoised between
/// calls.
pub struct RepositoryResolver {
    identity: ArtifactIdentity,
    fetcher: Arc<dyn Fetch>,
    /// Version token the artifact must embed after `+` (e.g. a game version).
    match_target: Option<String>,
    matching_enabled: bool,
}

impl RepositoryResolver {
    pub fn new(identity: ArtifactIdentity, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            identity,
            fetcher,
            match_target: None,
            matching_enabled: false,
        }
    }

    /// Only accept versions built for `target`.
    pub fn with_match_target(mut self, target: impl Into<String>) -> Self {
        self.match_target = Some(target.into());
        self.matching_enabled = true;
        self
    }

    pub fn identity(&self) -> &ArtifactIdentity {
        &self.identity
    }

    pub fn match_target(&self) -> Option<&str> {
        self.match_target.as_deref()
    }

    fn effective_target(&self) -> Option<&str> {
        if self.matching_enabled {
            self.match_target.as_deref()
        } else {
            None
        }
    }

    // ── Version feeds ───────────────────────────────────

    pub async fn fetch_stable_version(&self) -> Lookup<String> {
        self.fetch_version(&self.identity.stable_metadata_url()).await
    }

    pub async fn fetch_snapshot_version(&self) -> Lookup<String> {
        self.fetch_version(&self.identity.snapshot_metadata_url()).await
    }

    async fn fetch_version(&self, metadata_url: &str) -> Lookup<String> {
        let xml = match self.fetcher.fetch_text(metadata_url).await {
            Ok(xml) => xml,
            Err(e) => {
                debug!("Metadata fetch failed for {}: {}", metadata_url, e);
                return Lookup::from_result(Err(e));
            }
        };

        let metadata = match MavenMetadata::parse(&xml) {
            Ok(m) => m,
            Err(e) => {
                warn!("Failed to parse {}: {}", metadata_url, e);
                return Lookup::Transient(e);
            }
        };

        let versions = metadata.versions();
        let target = self.effective_target();

        if let Some(t) = target {
            debug!("Target version: {}", t);
        }
        debug!("Available Maven versions: {}", versions.join(", "));

        match select_version(&versions, target) {
            Some(latest) => {
                debug!(
                    "Found latest {} version{}: {}",
                    self.identity.artifact_name,
                    for_target(target),
                    latest
                );
                Lookup::Found(latest)
            }
            None => {
                debug!(
                    "No {} versions found{} in {}",
                    self.identity.artifact_name,
                    for_target(target),
                    metadata_url
                );
                Lookup::NotFound
            }
        }
    }

    // ── Snapshot builds ─────────────────────────────────

    /// Timestamp and build number behind a `-SNAPSHOT` version.
    pub async fn fetch_snapshot_descriptor(&self, version: &str) -> Lookup<SnapshotDescriptor> {
        let url = self.identity.snapshot_version_metadata_url(version);
        let xml = match self.fetcher.fetch_text(&url).await {
            Ok(xml) => xml,
            Err(e) => {
                debug!("Snapshot metadata fetch failed for {}: {}", url, e);
                return Lookup::from_result(Err(e));
            }
        };

        let build = MavenMetadata::parse(&xml).and_then(|m| m.snapshot_build());
        match build {
            Ok((timestamp, build_number)) => Lookup::Found(SnapshotDescriptor {
                version: version.to_string(),
                timestamp,
                build_number,
            }),
            Err(LoaderError::MetadataIncomplete(reason)) => {
                warn!("Snapshot metadata for {} is incomplete: {}", version, reason);
                Lookup::NotFound
            }
            Err(e) => {
                warn!("Failed to parse {}: {}", url, e);
                Lookup::Transient(e)
            }
        }
    }

    /// Newest snapshot version together with its build descriptor.
    pub async fn fetch_latest_snapshot(&self) -> Lookup<SnapshotDescriptor> {
        self.fetch_snapshot_version()
            .await
            .and_then_async(|version| async move { self.fetch_snapshot_descriptor(&version).await })
            .await
    }

    // ── Checksums ───────────────────────────────────────

    /// Expected digest published next to a jar (`<jar>.md5`).
    pub async fn fetch_checksum(&self, checksum_url: &str) -> Lookup<String> {
        let result = match self.fetcher.fetch_text(checksum_url).await {
            Ok(text) => parse_checksum(&text),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            debug!("Checksum fetch failed for {}: {}", checksum_url, e);
        }
        Lookup::from_result(result)
    }

    pub async fn fetch_jar(&self, jar_url: &str) -> Result<Vec<u8>, LoaderError> {
        debug!("Downloading JAR from: {}", jar_url);
        self.fetcher.fetch_bytes(jar_url).await
    }
}

/// Pick the newest eligible version from a feed listed oldest-first.
///
/// With a `target`, a version is eligible when the token after its first `+`
/// (up to the next `-`) equals the target once both have their dots removed,
/// so `1.21.11` and `1.21.1.1` are treated alike. Without one, every version
/// is eligible.
pub fn select_version(versions: &[String], target: Option<&str>) -> Option<String> {
    match target {
        Some(target) => {
            let wanted = target.replace('.', "");
            versions
                .iter()
                .rev()
                .find(|v| embedded_target(v).replace('.', "") == wanted)
                .cloned()
        }
        None => versions.last().cloned(),
    }
}

/// `0.1.1+1.21.1-SNAPSHOT` → `1.21.1`. A version without `+` is its own token.
fn embedded_target(version: &str) -> &str {
    let after_plus = version
        .find('+')
        .map(|idx| &version[idx + 1..])
        .unwrap_or(version);
    after_plus
        .find('-')
        .map(|idx| &after_plus[..idx])
        .unwrap_or(after_plus)
}

pub(crate) fn for_target(target: Option<&str>) -> String {
    target.map(|t| format!(" for version {}", t)).unwrap_or_default()
}
