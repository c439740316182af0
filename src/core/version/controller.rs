use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::core::cache::ChecksumCache;
use crate::core::config::{Config, InconsistentCachePolicy, LoaderOptions, ReleaseChannel};
use crate::core::downloader::Fetch;
use crate::core::error::{LoaderError, LoaderResult, Lookup};
use crate::core::maven::{
    for_target, ArtifactIdentity, RepositoryResolver, ResolvedVersion, CLIENT_ARTIFACT_NAME,
    CLIENT_ARTIFACT_PATH, LOADER_ARTIFACT_NAME, LOADER_ARTIFACT_PATH,
};

const BANNER: &str = "═══════════════════════════════════════════════════════════";

/// Keeps a verified copy of the newest build of one artifact family in the cache.
pub struct ArtifactVersionController {
    resolver: RepositoryResolver,
    cache: ChecksumCache,
    channel: ReleaseChannel,
    on_inconsistent: InconsistentCachePolicy,
}

impl ArtifactVersionController {
    pub fn new(resolver: RepositoryResolver, cache: ChecksumCache, channel: ReleaseChannel) -> Self {
        Self {
            resolver,
            cache,
            channel,
            on_inconsistent: InconsistentCachePolicy::default(),
        }
    }

    pub fn with_inconsistent_policy(mut self, policy: InconsistentCachePolicy) -> Self {
        self.on_inconsistent = policy;
        self
    }

    /// Controller for the client payload, matched against the game version.
    pub async fn client(
        options: &LoaderOptions,
        config: &Config,
        fetcher: Arc<dyn Fetch>,
    ) -> LoaderResult<Self> {
        let identity = ArtifactIdentity::new(
            &options.repository_url,
            CLIENT_ARTIFACT_PATH,
            CLIENT_ARTIFACT_NAME,
        );
        let mut resolver = RepositoryResolver::new(identity, fetcher);
        if let Some(target) = &options.minecraft_version {
            resolver = resolver.with_match_target(target);
        }
        let cache = ChecksumCache::open(&options.root_dir).await?;
        Ok(Self::new(resolver, cache, config.client_channel)
            .with_inconsistent_policy(options.on_inconsistent_cache))
    }

    /// Controller for the loader's own distributable; always takes the newest build.
    pub async fn loader(
        options: &LoaderOptions,
        config: &Config,
        fetcher: Arc<dyn Fetch>,
    ) -> LoaderResult<Self> {
        let identity = ArtifactIdentity::new(
            &options.repository_url,
            LOADER_ARTIFACT_PATH,
            LOADER_ARTIFACT_NAME,
        );
        let resolver = RepositoryResolver::new(identity, fetcher);
        let cache = ChecksumCache::open(&options.root_dir).await?;
        Ok(Self::new(resolver, cache, config.loader_channel)
            .with_inconsistent_policy(options.on_inconsistent_cache))
    }

    pub fn identity(&self) -> &ArtifactIdentity {
        self.resolver.identity()
    }

    // ── Resolution ──────────────────────────────────────

    /// Newest build on the configured channel.
    ///
    /// Stable silently degrades to snapshot when no stable version is
    /// available, whether the feed lacks one or could not be fetched.
    pub async fn resolve(&self) -> Lookup<ResolvedVersion> {
        match self.channel {
            ReleaseChannel::Stable => match self.resolver.fetch_stable_version().await {
                Lookup::Found(version) => Lookup::Found(ResolvedVersion::Stable(version)),
                _ => {
                    warn!(
                        "No stable version found{}, falling back to snapshot",
                        self.target_suffix()
                    );
                    self.resolve_snapshot().await
                }
            },
            ReleaseChannel::Snapshot => self.resolve_snapshot().await,
        }
    }

    async fn resolve_snapshot(&self) -> Lookup<ResolvedVersion> {
        self.resolver
            .fetch_latest_snapshot()
            .await
            .map(ResolvedVersion::Snapshot)
    }

    /// Newest version string on the configured channel, with the same fallback.
    pub async fn resolve_latest_version(&self) -> Lookup<String> {
        match self.channel {
            ReleaseChannel::Stable => match self.resolver.fetch_stable_version().await {
                Lookup::Found(version) => Lookup::Found(version),
                _ => {
                    warn!(
                        "No stable {} version found, falling back to snapshot",
                        self.identity().artifact_name
                    );
                    self.resolver.fetch_snapshot_version().await
                }
            },
            ReleaseChannel::Snapshot => self.resolver.fetch_snapshot_version().await,
        }
    }

    pub async fn resolve_jar_url(&self) -> Option<String> {
        let identity = self.identity();
        self.resolve().await.found().map(|r| r.jar_url(identity))
    }

    pub async fn resolve_checksum_url(&self) -> Option<String> {
        let identity = self.identity();
        self.resolve().await.found().map(|r| r.checksum_url(identity))
    }

    pub async fn resolve_cache_file_name(&self) -> Option<String> {
        let identity = self.identity();
        self.resolve().await.found().map(|r| r.file_name(identity))
    }

    // ── Caching ─────────────────────────────────────────

    /// `true` iff the newest build is in the cache and matches the published MD5.
    pub async fn is_cached(&self) -> bool {
        let Some(resolved) = self.resolve().await.found() else {
            return false;
        };
        let identity = self.identity();
        let Some(expected) = self
            .resolver
            .fetch_checksum(&resolved.checksum_url(identity))
            .await
            .found()
        else {
            return false;
        };
        self.cache.verify(&resolved.file_name(identity), &expected).await
    }

    /// Make sure the newest build is cached and verified. Never errors.
    pub async fn ensure_cached(&self) -> bool {
        self.cache_latest().await.is_some()
    }

    /// Resolves once and uses that single build for file name, jar and checksum.
    /// Returns the cache file name on success.
    async fn cache_latest(&self) -> Option<String> {
        let resolved = match self.resolve().await {
            Lookup::Found(resolved) => resolved,
            Lookup::NotFound => return None,
            Lookup::Transient(e) => {
                debug!("Resolution failed: {}", e);
                return None;
            }
        };

        let identity = self.identity();
        let file_name = resolved.file_name(identity);
        let checksum_url = resolved.checksum_url(identity);

        let published = self.resolver.fetch_checksum(&checksum_url).await.found();
        if let Some(expected) = &published {
            if self.cache.verify(&file_name, expected).await {
                debug!("Latest version is already cached with valid checksum");
                return Some(file_name);
            }
        }

        debug!("Latest version not cached or checksum invalid, downloading...");

        let jar = match self.resolver.fetch_jar(&resolved.jar_url(identity)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to download JAR: {}", e);
                return None;
            }
        };

        let expected = match published {
            Some(expected) => expected,
            None => match self.resolver.fetch_checksum(&checksum_url).await.found() {
                Some(expected) => expected,
                None => {
                    error!("Failed to download checksum");
                    return None;
                }
            },
        };

        let actual = ChecksumCache::checksum(&jar);
        if actual != expected {
            let mismatch = LoaderError::ChecksumMismatch {
                name: file_name,
                expected,
                actual,
            };
            error!("{}", mismatch);
            return None;
        }

        if let Err(e) = self.cache.store(&file_name, &jar).await {
            error!("Failed to cache {}: {}", file_name, e);
            return None;
        }
        debug!("Successfully cached version: {}", file_name);

        if self.cache.verify(&file_name, &expected).await {
            debug!("Cache verification successful");
            Some(file_name)
        } else {
            warn!("Cache verification failed for {}", file_name);
            None
        }
    }

    /// Path of the verified newest build, downloading it first if needed.
    ///
    /// `Ok(None)` covers every expected failure and has already been logged.
    /// A cache that claims success but has no file is fatal: depending on the
    /// configured policy the process exits with code 1, or
    /// `LoaderError::CacheInconsistent` is returned.
    pub async fn get_or_download_latest(&self) -> LoaderResult<Option<PathBuf>> {
        let Some(file_name) = self.cache_latest().await else {
            self.report_unavailable().await;
            return Ok(None);
        };

        self.locate_cached(&file_name).await.map(Some)
    }

    /// Path of an entry the cache just reported as stored.
    ///
    /// A missing file here breaks the cache's own contract and is handled
    /// according to the configured [`InconsistentCachePolicy`].
    async fn locate_cached(&self, file_name: &str) -> LoaderResult<PathBuf> {
        match self.cache.lookup(file_name).await {
            Some(path) => {
                debug!("Latest version ready: {:?}", path);
                Ok(path)
            }
            None => {
                error!("JAR file does not exist after caching: {}", file_name);
                match self.on_inconsistent {
                    InconsistentCachePolicy::Exit => std::process::exit(1),
                    InconsistentCachePolicy::Report => {
                        Err(LoaderError::CacheInconsistent(file_name.to_string()))
                    }
                }
            }
        }
    }

    async fn report_unavailable(&self) {
        let stable = self.resolver.fetch_stable_version().await;
        let snapshot = self.resolver.fetch_snapshot_version().await;

        match exhaustion_diagnostic(
            &self.identity().artifact_name,
            self.resolver.match_target(),
            &self.identity().repository_url,
            &stable,
            &snapshot,
        ) {
            Some(lines) => {
                for line in lines {
                    error!("{}", line);
                }
            }
            None => error!("Failed to ensure latest version is cached"),
        }
    }

    fn target_suffix(&self) -> String {
        for_target(self.resolver.match_target())
    }
}

/// Fatal block for when neither feed yields a version, or `None` if one did.
///
/// Distinguishes "the repository has no such build" (both feeds answered
/// empty) from "the repository could not be asked" (at least one feed failed).
pub fn exhaustion_diagnostic(
    artifact_name: &str,
    target: Option<&str>,
    repository_url: &str,
    stable: &Lookup<String>,
    snapshot: &Lookup<String>,
) -> Option<Vec<String>> {
    if stable.is_found() || snapshot.is_found() {
        return None;
    }

    let mut lines = vec![BANNER.to_string()];
    if stable.is_not_found() && snapshot.is_not_found() {
        lines.push(format!("FATAL ERROR: No {} version found!", artifact_name));
        if let Some(target) = target {
            lines.push(format!("Target version: {}", target));
        }
        lines.push("Neither STABLE nor SNAPSHOT versions are available.".to_string());
        lines.push("Please check:".to_string());
        lines.push(format!(
            "  1. If {} supports the required version",
            artifact_name
        ));
        lines.push(format!(
            "  2. Maven repository contents at: {}",
            repository_url
        ));
    } else {
        lines.push(format!(
            "FATAL ERROR: Could not fetch {} versions!",
            artifact_name
        ));
        if let Some(target) = target {
            lines.push(format!("Target version: {}", target));
        }
        for (feed, lookup) in [("STABLE", stable), ("SNAPSHOT", snapshot)] {
            match lookup {
                Lookup::Transient(e) => lines.push(format!("{} feed unreachable: {}", feed, e)),
                _ => lines.push(format!("{} feed has no matching version", feed)),
            }
        }
        lines.push("This may be temporary. Please check:".to_string());
        lines.push("  1. Your internet connection".to_string());
        lines.push(format!(
            "  2. Maven repository availability at: {}",
            repository_url
        ));
    }
    lines.push(BANNER.to_string());

    info!(
        "{} unavailable (stable: {}, snapshot: {})",
        artifact_name,
        describe(stable),
        describe(snapshot)
    );
    Some(lines)
}

fn describe(lookup: &Lookup<String>) -> &'static str {
    match lookup {
        Lookup::Found(_) => "found",
        Lookup::NotFound => "none",
        Lookup::Transient(_) => "unreachable",
    }
}
