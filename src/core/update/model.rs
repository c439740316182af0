use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of one self-update pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// Nothing checked yet, or already up to date.
    Idle,
    Checking,
    /// A newer build was found (and downloaded, if possible).
    UpdateAvailable,
    Applying,
    /// The executable now holds the new build; a restart is needed.
    Applied,
    Failed,
    /// The previous executable was put back from its backup.
    RolledBack,
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateState::Idle => "idle",
            UpdateState::Checking => "checking",
            UpdateState::UpdateAvailable => "update available",
            UpdateState::Applying => "applying",
            UpdateState::Applied => "applied",
            UpdateState::Failed => "failed",
            UpdateState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// Result of an update check. `apply_update` only acts on
/// `available == true` with an `update_file`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateInfo {
    pub available: bool,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub update_file: Option<PathBuf>,
}

impl UpdateInfo {
    /// Latest version could not be determined; both versions are left unset.
    pub fn unknown() -> Self {
        Self {
            available: false,
            current_version: None,
            latest_version: None,
            update_file: None,
        }
    }

    pub fn up_to_date(current_version: Option<String>, latest_version: String) -> Self {
        Self {
            available: false,
            current_version,
            latest_version: Some(latest_version),
            update_file: None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.available && self.update_file.is_some()
    }
}
