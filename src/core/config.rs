use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::maven::LAMBDA_MAVEN;

const SETTINGS_FILE: &str = "modules.json";
const UPDATER_SECTION: &str = "AutoUpdater";

/// Which feed an artifact family is resolved from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    Stable,
    Snapshot,
}

impl ReleaseChannel {
    /// `stable` in any case is Stable; every other branch name means Snapshot.
    pub fn from_branch(branch: &str) -> Self {
        if branch.trim().eq_ignore_ascii_case("stable") {
            ReleaseChannel::Stable
        } else {
            ReleaseChannel::Snapshot
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseChannel::Stable => write!(f, "stable"),
            ReleaseChannel::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// User settings read from `<root>/config/modules.json`.
///
/// Immutable once loaded; [`Config::reload`] produces a fresh value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Config {
    pub client_channel: ReleaseChannel,
    pub loader_channel: ReleaseChannel,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_channel: ReleaseChannel::Snapshot,
            loader_channel: ReleaseChannel::Stable,
            debug: false,
        }
    }
}

/// The `AutoUpdater` object inside the settings file.
#[derive(Debug, Deserialize, Default)]
struct AutoUpdaterSection {
    #[serde(rename = "Debug", default)]
    debug: Option<bool>,
    #[serde(rename = "Loader Branch", default)]
    loader_branch: Option<String>,
    #[serde(rename = "Client Branch", default)]
    client_branch: Option<String>,
}

impl Config {
    /// Default location of the settings file under the loader root.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join("config").join(SETTINGS_FILE)
    }

    /// Load settings, falling back to defaults when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(e) => {
                debug!("No settings at {:?} ({}), using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Parse the settings document. Anything unparseable yields defaults.
    pub fn from_json_str(raw: &str) -> Self {
        let root: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("Settings file is not valid JSON ({}), using defaults", e);
                return Self::default();
            }
        };

        let Some(section) = root.get(UPDATER_SECTION) else {
            return Self::default();
        };

        let section: AutoUpdaterSection = match serde_json::from_value(section.clone()) {
            Ok(s) => s,
            Err(e) => {
                warn!("Invalid {} section ({}), using defaults", UPDATER_SECTION, e);
                return Self::default();
            }
        };

        let defaults = Self::default();
        Self {
            client_channel: section
                .client_branch
                .as_deref()
                .map(ReleaseChannel::from_branch)
                .unwrap_or(defaults.client_channel),
            loader_channel: section
                .loader_branch
                .as_deref()
                .map(ReleaseChannel::from_branch)
                .unwrap_or(defaults.loader_channel),
            debug: section.debug.unwrap_or(defaults.debug),
        }
    }

    /// Re-read settings into a new snapshot; `self` is left untouched.
    pub fn reload(&self, path: &Path) -> Self {
        let fresh = Self::load(path);
        if &fresh != self {
            debug!("Settings changed: {:?} -> {:?}", self, fresh);
        }
        fresh
    }
}

/// What to do when the cache claims success but the file is not on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InconsistentCachePolicy {
    /// Terminate the process with exit code 1.
    #[default]
    Exit,
    /// Surface `LoaderError::CacheInconsistent` to the caller.
    Report,
}

/// Runtime options that do not live in the settings file.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Working root; holds `cache/` and `config/`.
    pub root_dir: PathBuf,
    pub repository_url: String,
    pub http_timeout: Duration,
    /// Game version the client payload must be built for.
    pub minecraft_version: Option<String>,
    /// Version of the running loader, if known.
    pub current_version: Option<String>,
    pub on_inconsistent_cache: InconsistentCachePolicy,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("lambda"),
            repository_url: LAMBDA_MAVEN.to_string(),
            http_timeout: Duration::from_secs(30),
            minecraft_version: None,
            current_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            on_inconsistent_cache: InconsistentCachePolicy::Exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&tmp.path().join("config").join("modules.json"));
        assert_eq!(config, Config::default());
        assert_eq!(config.client_channel, ReleaseChannel::Snapshot);
        assert_eq!(config.loader_channel, ReleaseChannel::Stable);
        assert!(!config.debug);
    }

    #[test]
    fn reads_auto_updater_section() {
        let raw = r#"{
            "HUD": { "Enabled": true },
            "AutoUpdater": {
                "Debug": true,
                "Loader Branch": "snapshot",
                "Client Branch": "STABLE"
            }
        }"#;
        let config = Config::from_json_str(raw);
        assert_eq!(
            config,
            Config {
                client_channel: ReleaseChannel::Stable,
                loader_channel: ReleaseChannel::Snapshot,
                debug: true,
            }
        );
    }

    #[test]
    fn missing_section_or_bad_json_uses_defaults() {
        assert_eq!(Config::from_json_str(r#"{"Other": {}}"#), Config::default());
        assert_eq!(Config::from_json_str("{ not json"), Config::default());
        assert_eq!(
            Config::from_json_str(r#"{"AutoUpdater": {"Debug": "yes"}}"#),
            Config::default()
        );
    }

    #[test]
    fn missing_keys_fall_back_per_field() {
        let config = Config::from_json_str(r#"{"AutoUpdater": {"Debug": true}}"#);
        assert_eq!(config.client_channel, ReleaseChannel::Snapshot);
        assert_eq!(config.loader_channel, ReleaseChannel::Stable);
        assert!(config.debug);
    }

    #[test]
    fn unknown_branch_means_snapshot() {
        assert_eq!(ReleaseChannel::from_branch("Stable"), ReleaseChannel::Stable);
        assert_eq!(ReleaseChannel::from_branch(" stable "), ReleaseChannel::Stable);
        assert_eq!(ReleaseChannel::from_branch("Release"), ReleaseChannel::Snapshot);
        assert_eq!(ReleaseChannel::from_branch("nightly"), ReleaseChannel::Snapshot);
    }

    #[test]
    fn reload_returns_new_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Config::default_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let before = Config::load(&path);
        std::fs::write(&path, r#"{"AutoUpdater": {"Client Branch": "Stable"}}"#).unwrap();
        let after = before.reload(&path);

        assert_eq!(before.client_channel, ReleaseChannel::Snapshot);
        assert_eq!(after.client_channel, ReleaseChannel::Stable);
    }
}
