use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::core::config::{Config, LoaderOptions};
use crate::core::downloader::Fetch;
use crate::core::error::{LoaderError, LoaderResult};
use crate::core::host::{load_artifact, HostRuntime};
use crate::core::update::{SelfUpdater, UpdateInfo};
use crate::core::version::ArtifactVersionController;

const BANNER: &str = "═══════════════════════════════════════════════════════════";

/// How a startup pass ended.
#[derive(Debug)]
pub enum StartupOutcome {
    /// The client artifact was handed to the host.
    Loaded { artifact: PathBuf, nested_jars: usize },
    /// The loader replaced itself; the game must be restarted.
    RestartRequired(UpdateInfo),
    /// No usable client artifact; the game should stop.
    Aborted(String),
}

/// Pre-launch sequence: self-update, then fetch and load the client.
pub struct Startup {
    options: LoaderOptions,
    config: Config,
    fetcher: Arc<dyn Fetch>,
    executable: Option<PathBuf>,
}

impl Startup {
    pub fn new(options: LoaderOptions, config: Config, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            options,
            config,
            fetcher,
            executable: None,
        }
    }

    /// Self-update this file instead of the running executable.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Updater for the loader itself, honouring the executable override.
    pub async fn self_updater(&self) -> LoaderResult<SelfUpdater> {
        let controller =
            ArtifactVersionController::loader(&self.options, &self.config, self.fetcher.clone())
                .await?;
        let updater = SelfUpdater::new(controller, self.options.current_version.clone());
        Ok(match &self.executable {
            Some(path) => updater.with_executable(path),
            None => updater,
        })
    }

    pub async fn client_controller(&self) -> LoaderResult<ArtifactVersionController> {
        ArtifactVersionController::client(&self.options, &self.config, self.fetcher.clone()).await
    }

    /// Directory nested jars are extracted to.
    pub fn nested_dir(&self) -> PathBuf {
        self.options.root_dir.join("cache").join("nested")
    }

    /// Drop jars extracted by an earlier run so only the current client's
    /// nested jars end up on the classpath.
    async fn clear_nested_dir(&self) -> LoaderResult<()> {
        let dir = self.nested_dir();
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Cleared nested JAR directory {:?}", dir);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LoaderError::io(&dir, e)),
        }
    }

    pub async fn run(&self, host: &mut dyn HostRuntime) -> StartupOutcome {
        if let Some(info) = self.check_for_loader_update().await {
            return StartupOutcome::RestartRequired(info);
        }
        self.load_client(host).await
    }

    /// `Some` only when an update was applied. Errors here never stop the
    /// client from loading.
    async fn check_for_loader_update(&self) -> Option<UpdateInfo> {
        info!("Checking for Lambda-Loader updates...");
        let mut updater = match self.self_updater().await {
            Ok(updater) => updater,
            Err(e) => {
                warn!("Error checking for loader updates: {}", e);
                info!("Continuing with current loader version");
                return None;
            }
        };

        let info = updater.check_for_update().await;
        if !info.available {
            debug!(
                "Lambda-Loader is up to date ({})",
                info.current_version.as_deref().unwrap_or("unknown")
            );
            return None;
        }

        info!("{}", BANNER);
        info!("Lambda-Loader update available!");
        info!(
            "Current version: {}",
            info.current_version.as_deref().unwrap_or("unknown")
        );
        info!(
            "Latest version: {}",
            info.latest_version.as_deref().unwrap_or("unknown")
        );
        info!("{}", BANNER);

        if updater.apply_update(&info).await {
            info!("{}", BANNER);
            info!("Lambda-Loader has been updated successfully!");
            info!("Please restart Minecraft to use the new version.");
            info!("{}", BANNER);
            return Some(info);
        }

        warn!("Failed to apply loader update, continuing with current version");
        updater.restore_from_backup().await;
        None
    }

    async fn load_client(&self, host: &mut dyn HostRuntime) -> StartupOutcome {
        info!("Loading Lambda Client...");
        let controller = match self.client_controller().await {
            Ok(controller) => controller,
            Err(e) => return abort(format!("Failed to open cache: {}", e)),
        };

        let artifact = match controller.get_or_download_latest().await {
            Ok(Some(path)) => path,
            Ok(None) => return abort("Failed to download latest lambda stopping!".to_string()),
            Err(e) => return abort(format!("Failed to download latest lambda: {}", e)),
        };

        if let Err(e) = self.clear_nested_dir().await {
            return abort(format!("Failed to clear nested JARs: {}", e));
        }

        match load_artifact(host, &artifact, &self.nested_dir()).await {
            Ok(nested_jars) => {
                info!("Lambda Client loaded successfully");
                StartupOutcome::Loaded {
                    artifact,
                    nested_jars,
                }
            }
            Err(e) => abort(format!("Failed to load {:?}: {}", artifact, e)),
        }
    }
}

fn abort(reason: String) -> StartupOutcome {
    error!("{}", reason);
    StartupOutcome::Aborted(reason)
}
