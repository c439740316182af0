use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info, warn};

use super::model::{UpdateInfo, UpdateState};
use crate::core::error::{LoaderError, LoaderResult, Lookup};
use crate::core::version::ArtifactVersionController;

const BANNER: &str = "═══════════════════════════════════════════════════════════";

/// Replaces the running loader executable with the newest published build.
///
/// The swap is backup → overwrite → delete backup. A `<name>.backup` file
/// left next to the executable means an update did not finish, and
/// [`SelfUpdater::restore_from_backup`] can put the old build back.
pub struct SelfUpdater {
    controller: ArtifactVersionController,
    current_version: Option<String>,
    executable: Option<PathBuf>,
    state: UpdateState,
}

impl SelfUpdater {
    pub fn new(controller: ArtifactVersionController, current_version: Option<String>) -> Self {
        Self {
            controller,
            current_version,
            executable: None,
            state: UpdateState::Idle,
        }
    }

    /// Replace this file instead of the running process image.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Sibling file holding the previous build during an update.
    pub fn backup_path(executable: &Path) -> PathBuf {
        let mut name = executable
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".backup");
        executable.with_file_name(name)
    }

    fn executable_path(&self) -> Option<PathBuf> {
        match &self.executable {
            Some(path) => Some(path.clone()),
            None => match std::env::current_exe() {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Could not determine current executable: {}", e);
                    None
                }
            },
        }
    }

    async fn current_executable(&self) -> Option<PathBuf> {
        let path = self.executable_path()?;
        let is_file = fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false);
        if is_file {
            debug!("Current loader executable: {:?}", path);
            Some(path)
        } else {
            warn!("Current loader executable {:?} is not a file", path);
            None
        }
    }

    // ── Check ───────────────────────────────────────────

    /// Compare the running version with the newest published one and, if
    /// they differ, download the new build right away.
    pub async fn check_for_update(&mut self) -> UpdateInfo {
        self.state = UpdateState::Checking;

        let latest = match self.controller.resolve_latest_version().await {
            Lookup::Found(latest) => latest,
            Lookup::NotFound => {
                warn!("Could not fetch latest loader version");
                self.state = UpdateState::Idle;
                return UpdateInfo::unknown();
            }
            Lookup::Transient(e) => {
                warn!("Could not fetch latest loader version: {}", e);
                self.state = UpdateState::Idle;
                return UpdateInfo::unknown();
            }
        };

        if self.current_version.as_deref() == Some(latest.as_str()) {
            debug!("Loader is up to date: {}", latest);
            self.state = UpdateState::Idle;
            return UpdateInfo::up_to_date(self.current_version.clone(), latest);
        }

        match &self.current_version {
            Some(current) => info!("Loader update available: {} -> {}", current, latest),
            None => info!("Latest loader version available: {}", latest),
        }

        let update_file = match self.controller.get_or_download_latest().await {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to download loader update: {}", e);
                None
            }
        };

        self.state = UpdateState::UpdateAvailable;
        UpdateInfo {
            available: true,
            current_version: self.current_version.clone(),
            latest_version: Some(latest),
            update_file,
        }
    }

    // ── Apply ───────────────────────────────────────────

    /// Swap the executable for `info.update_file`. Never performs network I/O.
    ///
    /// On failure the backup, if already written, stays on disk for
    /// [`SelfUpdater::restore_from_backup`].
    pub async fn apply_update(&mut self, info: &UpdateInfo) -> bool {
        let update_file = match (&info.update_file, info.available) {
            (Some(file), true) => file,
            _ => {
                warn!("No update available to apply");
                return false;
            }
        };

        let Some(executable) = self.current_executable().await else {
            error!("Cannot apply update: Unable to locate current loader executable");
            self.state = UpdateState::Failed;
            return false;
        };

        self.state = UpdateState::Applying;
        info!("{}", BANNER);
        info!(
            "Applying loader update: {} -> {}",
            info.current_version.as_deref().unwrap_or("unknown"),
            info.latest_version.as_deref().unwrap_or("unknown")
        );
        info!("Current executable: {:?}", executable);
        info!("Update file: {:?}", update_file);

        match replace_with_backup(&executable, update_file).await {
            Ok(()) => {
                info!("Loader update applied successfully!");
                info!("{}", BANNER);
                self.state = UpdateState::Applied;
                true
            }
            Err(e) => {
                error!("Failed to apply loader update: {}", e);
                self.state = UpdateState::Failed;
                false
            }
        }
    }

    // ── Rollback ────────────────────────────────────────

    /// Put the backed-up build back in place and remove the backup.
    pub async fn restore_from_backup(&mut self) -> bool {
        let Some(executable) = self.executable_path() else {
            return false;
        };
        let backup = Self::backup_path(&executable);

        let has_backup = fs::metadata(&backup).await.map(|m| m.is_file()).unwrap_or(false);
        if !has_backup {
            warn!("No backup file found at: {:?}", backup);
            return false;
        }

        info!("Restoring loader from backup: {:?}", backup);
        let restored = match install(&backup, &executable).await {
            Ok(()) => fs::remove_file(&backup)
                .await
                .map_err(|e| LoaderError::io(&backup, e)),
            Err(e) => Err(e),
        };

        match restored {
            Ok(()) => {
                info!("Loader restored from backup successfully!");
                self.state = UpdateState::RolledBack;
                true
            }
            Err(e) => {
                error!("Failed to restore from backup: {}", e);
                self.state = UpdateState::Failed;
                false
            }
        }
    }
}

/// backup → overwrite → delete backup. The backup is only removed once the
/// new build is in place.
async fn replace_with_backup(executable: &Path, update_file: &Path) -> LoaderResult<()> {
    let backup = SelfUpdater::backup_path(executable);
    debug!("Creating backup: {:?}", backup);
    fs::copy(executable, &backup)
        .await
        .map_err(|e| LoaderError::io(&backup, e))?;

    debug!("Replacing loader executable...");
    install(update_file, executable).await?;

    if let Err(e) = fs::remove_file(&backup).await {
        warn!("Update applied but backup {:?} could not be removed: {}", backup, e);
    }
    Ok(())
}

/// Overwrite `dest` with the contents of `source`.
///
/// The bytes are staged in a sibling file and renamed over `dest`, which
/// works for a running executable and never leaves `dest` half-written.
/// `dest`'s permissions are kept.
async fn install(source: &Path, dest: &Path) -> LoaderResult<()> {
    let mut staged_name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    staged_name.push(".update");
    let staged = dest.with_file_name(staged_name);

    let result = stage_and_rename(source, &staged, dest).await;
    if result.is_err() {
        let _ = fs::remove_file(&staged).await;
    }
    result
}

async fn stage_and_rename(source: &Path, staged: &Path, dest: &Path) -> LoaderResult<()> {
    fs::copy(source, staged)
        .await
        .map_err(|e| LoaderError::io(source, e))?;
    if let Ok(metadata) = fs::metadata(dest).await {
        fs::set_permissions(staged, metadata.permissions())
            .await
            .map_err(|e| LoaderError::io(staged, e))?;
    }
    fs::rename(staged, dest)
        .await
        .map_err(|e| LoaderError::io(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use crate::core::cache::ChecksumCache;
    use crate::core::config::{InconsistentCachePolicy, ReleaseChannel};
    use crate::core::downloader::testing::{version_index, StaticFetcher};
    use crate::core::maven::{ArtifactIdentity, RepositoryResolver, ResolvedVersion};

    const REPO: &str = "https://maven.example.org";

    fn loader_identity() -> ArtifactIdentity {
        ArtifactIdentity::new(REPO, "com/lambda/loader", "loader")
    }

    fn loader_repository(version: &str, bytes: &[u8]) -> StaticFetcher {
        let id = loader_identity();
        let resolved = ResolvedVersion::Stable(version.to_string());
        StaticFetcher::new()
            .with(id.stable_metadata_url(), version_index(&["0.9.0", version]))
            .with(resolved.jar_url(&id), bytes.to_vec())
            .with(resolved.checksum_url(&id), ChecksumCache::checksum(bytes))
    }

    async fn updater(fetcher: StaticFetcher, root: &Path, current: Option<&str>) -> SelfUpdater {
        let resolver = RepositoryResolver::new(loader_identity(), Arc::new(fetcher));
        let controller = ArtifactVersionController::new(
            resolver,
            ChecksumCache::open(root).await.unwrap(),
            ReleaseChannel::Stable,
        )
        .with_inconsistent_policy(InconsistentCachePolicy::Report);
        SelfUpdater::new(controller, current.map(str::to_string))
    }

    /// `loader.jar` holding `contents` inside `dir`.
    fn running_executable(dir: &Path, contents: &[u8]) -> PathBuf {
        let path = dir.join("loader.jar");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn backup_is_a_sibling() {
        assert_eq!(
            SelfUpdater::backup_path(Path::new("/mods/lambda-loader.jar")),
            PathBuf::from("/mods/lambda-loader.jar.backup")
        );
    }

    #[tokio::test]
    async fn newer_version_is_downloaded_during_check() {
        let tmp = tempfile::tempdir().unwrap();
        let mut updater = updater(loader_repository("1.1.0", b"new build"), tmp.path(), Some("1.0.0")).await;

        let info = updater.check_for_update().await;

        assert!(info.available);
        assert_eq!(info.current_version.as_deref(), Some("1.0.0"));
        assert_eq!(info.latest_version.as_deref(), Some("1.1.0"));
        let file = info.update_file.unwrap();
        assert_eq!(fs::read(file).unwrap(), b"new build");
        assert_eq!(updater.state(), UpdateState::UpdateAvailable);
    }

    #[tokio::test]
    async fn same_version_is_up_to_date() {
        let tmp = tempfile::tempdir().unwrap();
        let mut updater = updater(loader_repository("1.1.0", b"new build"), tmp.path(), Some("1.1.0")).await;

        let info = updater.check_for_update().await;

        assert_eq!(
            info,
            UpdateInfo::up_to_date(Some("1.1.0".into()), "1.1.0".into())
        );
        assert_eq!(updater.state(), UpdateState::Idle);
    }

    #[tokio::test]
    async fn unknown_current_version_always_updates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut updater = updater(loader_repository("1.1.0", b"new build"), tmp.path(), None).await;

        let info = updater.check_for_update().await;
        assert!(info.is_applicable());
        assert_eq!(info.current_version, None);
    }

    #[tokio::test]
    async fn unreachable_repository_reports_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut updater = updater(StaticFetcher::new(), tmp.path(), Some("1.0.0")).await;

        assert_eq!(updater.check_for_update().await, UpdateInfo::unknown());
    }

    #[tokio::test]
    async fn apply_replaces_executable_and_drops_backup() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        let update = tmp.path().join("loader-1.1.0.jar");
        fs::write(&update, b"B").unwrap();

        let mut updater = updater(StaticFetcher::new(), tmp.path(), Some("1.0.0")).await.with_executable(&exe);
        let info = UpdateInfo {
            available: true,
            current_version: Some("1.0.0".into()),
            latest_version: Some("1.1.0".into()),
            update_file: Some(update),
        };

        assert!(updater.apply_update(&info).await);
        assert_eq!(fs::read(&exe).unwrap(), b"B");
        assert!(!SelfUpdater::backup_path(&exe).exists());
        assert_eq!(updater.state(), UpdateState::Applied);
    }

    #[tokio::test]
    async fn apply_requires_available_update_file() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        let mut updater = updater(StaticFetcher::new(), tmp.path(), None).await.with_executable(&exe);

        let no_file = UpdateInfo {
            available: true,
            current_version: None,
            latest_version: Some("1.1.0".into()),
            update_file: None,
        };
        assert!(!updater.apply_update(&no_file).await);
        assert!(!updater.apply_update(&UpdateInfo::unknown()).await);
        assert_eq!(fs::read(&exe).unwrap(), b"A");
        assert!(!SelfUpdater::backup_path(&exe).exists());
    }

    #[tokio::test]
    async fn apply_fails_without_executable() {
        let tmp = tempfile::tempdir().unwrap();
        let update = tmp.path().join("update.jar");
        fs::write(&update, b"B").unwrap();
        let mut updater = updater(StaticFetcher::new(), tmp.path(), None).await
            .with_executable(tmp.path().join("missing.jar"));

        let info = UpdateInfo {
            available: true,
            current_version: None,
            latest_version: Some("1.1.0".into()),
            update_file: Some(update),
        };
        assert!(!updater.apply_update(&info).await);
        assert_eq!(updater.state(), UpdateState::Failed);
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_backup_for_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        let mut updater = updater(StaticFetcher::new(), tmp.path(), Some("1.0.0")).await.with_executable(&exe);
        let info = UpdateInfo {
            available: true,
            current_version: Some("1.0.0".into()),
            latest_version: Some("1.1.0".into()),
            update_file: Some(tmp.path().join("vanished.jar")),
        };

        assert!(!updater.apply_update(&info).await);
        assert_eq!(updater.state(), UpdateState::Failed);
        let backup = SelfUpdater::backup_path(&exe);
        assert_eq!(fs::read(&backup).unwrap(), b"A");

        assert!(updater.restore_from_backup().await);
        assert_eq!(fs::read(&exe).unwrap(), b"A");
        assert!(!backup.exists());
        assert_eq!(updater.state(), UpdateState::RolledBack);
    }

    #[tokio::test]
    async fn restore_puts_back_previous_build() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        let backup = SelfUpdater::backup_path(&exe);
        fs::copy(&exe, &backup).unwrap();
        fs::write(&exe, b"half written").unwrap();

        let mut updater = updater(StaticFetcher::new(), tmp.path(), None).await.with_executable(&exe);
        assert!(updater.restore_from_backup().await);
        assert_eq!(fs::read(&exe).unwrap(), b"A");
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn restore_without_backup_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        let mut updater = updater(StaticFetcher::new(), tmp.path(), None).await.with_executable(&exe);

        assert!(!updater.restore_from_backup().await);
        assert_eq!(fs::read(&exe).unwrap(), b"A");
        assert_eq!(updater.state(), UpdateState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn apply_keeps_executable_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let exe = running_executable(tmp.path(), b"A");
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        let update = tmp.path().join("update.jar");
        fs::write(&update, b"B").unwrap();
        fs::set_permissions(&update, fs::Permissions::from_mode(0o644)).unwrap();

        let mut updater = updater(StaticFetcher::new(), tmp.path(), None).await.with_executable(&exe);
        let info = UpdateInfo {
            available: true,
            current_version: None,
            latest_version: Some("1.1.0".into()),
            update_file: Some(update),
        };
        assert!(updater.apply_update(&info).await);
        assert_eq!(fs::metadata(&exe).unwrap().permissions().mode() & 0o777, 0o755);
    }
}
