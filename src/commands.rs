use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::host::{LaunchPlan, RecordingHost};
use crate::core::startup::{Startup, StartupOutcome};
use crate::core::update::{UpdateInfo, UpdateState};

/// Process exit codes.
pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_RESTART_REQUIRED: u8 = 2;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunResponse {
    Loaded {
        artifact: PathBuf,
        nested_jars: usize,
        plan: LaunchPlan,
    },
    RestartRequired {
        update: UpdateInfo,
    },
    Aborted {
        reason: String,
    },
}

impl RunResponse {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunResponse::Loaded { .. } => EXIT_OK,
            RunResponse::RestartRequired { .. } => EXIT_RESTART_REQUIRED,
            RunResponse::Aborted { .. } => EXIT_FAILURE,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub artifact: String,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub info: UpdateInfo,
    pub applied: bool,
    pub restored: bool,
    pub state: UpdateState,
}

impl UpdateResponse {
    pub fn exit_code(&self) -> u8 {
        if self.applied {
            EXIT_RESTART_REQUIRED
        } else if self.info.available {
            EXIT_FAILURE
        } else {
            EXIT_OK
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub state: UpdateState,
}

/// Full pre-launch sequence against a recording host.
pub async fn run(startup: &Startup) -> RunResponse {
    let mut host = RecordingHost::new();
    match startup.run(&mut host).await {
        StartupOutcome::Loaded {
            artifact,
            nested_jars,
        } => RunResponse::Loaded {
            artifact,
            nested_jars,
            plan: host.into_plan(),
        },
        StartupOutcome::RestartRequired(update) => RunResponse::RestartRequired { update },
        StartupOutcome::Aborted(reason) => RunResponse::Aborted { reason },
    }
}

/// Resolve and cache the client payload without loading it.
pub async fn fetch(startup: &Startup) -> Result<FetchResponse, String> {
    let controller = startup.client_controller().await.map_err(|e| e.to_string())?;
    let artifact = controller.identity().to_string();
    let path = controller
        .get_or_download_latest()
        .await
        .map_err(|e| e.to_string())?;

    match &path {
        Some(path) => info!("{} cached at {:?}", artifact, path),
        None => error!("{} could not be cached", artifact),
    }
    Ok(FetchResponse { artifact, path })
}

pub async fn check_update(startup: &Startup) -> Result<UpdateInfo, String> {
    let mut updater = startup.self_updater().await.map_err(|e| e.to_string())?;
    Ok(updater.check_for_update().await)
}

/// Check, apply, and roll back if applying failed.
pub async fn update(startup: &Startup) -> Result<UpdateResponse, String> {
    let mut updater = startup.self_updater().await.map_err(|e| e.to_string())?;
    let info = updater.check_for_update().await;

    let mut applied = false;
    let mut restored = false;
    if info.available {
        applied = updater.apply_update(&info).await;
        if !applied {
            warn!("Failed to apply loader update, restoring previous build");
            restored = updater.restore_from_backup().await;
        }
    } else {
        info!(
            "Lambda-Loader is up to date ({})",
            info.current_version.as_deref().unwrap_or("unknown")
        );
    }

    Ok(UpdateResponse {
        info,
        applied,
        restored,
        state: updater.state(),
    })
}

pub async fn restore(startup: &Startup) -> Result<RestoreResponse, String> {
    let mut updater = startup.self_updater().await.map_err(|e| e.to_string())?;
    let restored = updater.restore_from_backup().await;
    Ok(RestoreResponse {
        restored,
        state: updater.state(),
    })
}
