mod bootstrap;
mod mod_jar;

use std::path::Path;

use crate::core::error::LoaderResult;

pub use bootstrap::{load_artifact, LaunchPlan, RecordingHost};
pub use mod_jar::{extract_nested_jars, ModManifest};

#[cfg(test)]
pub(crate) use mod_jar::testing;

/// What the loader needs from the game launcher it runs inside.
pub trait HostRuntime {
    /// Make `jar` loadable by the game.
    fn add_to_classpath(&mut self, jar: &Path) -> LoaderResult<()>;

    /// Announce `jar` as a loaded mod described by `manifest`.
    fn register_artifact(&mut self, jar: &Path, manifest: &ModManifest) -> LoaderResult<()>;

    /// Apply the access-widening file `resource` packaged in `jar`.
    fn apply_access_rules(&mut self, jar: &Path, resource: &str) -> LoaderResult<()>;

    /// Register one mixin configuration by resource name.
    fn add_behavior_config(&mut self, name: &str) -> LoaderResult<()>;
}
