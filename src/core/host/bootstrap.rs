use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::mod_jar::{extract_nested_jars, ModManifest};
use super::HostRuntime;
use crate::core::error::LoaderResult;

/// Hand a cached artifact to the host.
///
/// Order is fixed: classpath → nested jars → registration → access rules →
/// behavior configs. A broken nested-jar set or access-rule file is logged
/// and skipped; anything else aborts. Returns the number of nested jars put
/// on the classpath.
pub async fn load_artifact(
    host: &mut dyn HostRuntime,
    jar: &Path,
    nested_dir: &Path,
) -> LoaderResult<usize> {
    host.add_to_classpath(jar)?;

    let nested = match extract_nested_jars(jar, nested_dir).await {
        Ok(nested) => nested,
        Err(e) => {
            error!("Failed to load nested JARs: {}", e);
            Vec::new()
        }
    };
    for path in &nested {
        host.add_to_classpath(path)?;
        debug!("Added nested JAR to classpath: {:?}", path);
    }
    debug!("Loaded {} nested JARs from {:?}", nested.len(), jar);

    let manifest = ModManifest::read_from_jar(jar).await?;
    host.register_artifact(jar, &manifest)?;

    if let Some(resource) = &manifest.access_widener {
        debug!("Found access widener: {} in {:?}", resource, jar);
        if let Err(e) = host.apply_access_rules(jar, resource) {
            error!("Failed to inject access widener: {}", e);
        }
    }

    for config in manifest.mixin_configs() {
        host.add_behavior_config(&config)?;
    }

    info!("Loaded {} {}", manifest.id, manifest.version);
    Ok(nested.len())
}

/// Everything a host was asked to do, in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPlan {
    pub classpath: Vec<PathBuf>,
    pub registered: Vec<String>,
    pub access_rules: Vec<String>,
    pub behavior_configs: Vec<String>,
}

/// Host that only records requests. Used by the CLI to print what a real
/// launcher would be told.
#[derive(Debug, Default)]
pub struct RecordingHost {
    plan: LaunchPlan,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    pub fn into_plan(self) -> LaunchPlan {
        self.plan
    }
}

impl HostRuntime for RecordingHost {
    fn add_to_classpath(&mut self, jar: &Path) -> LoaderResult<()> {
        self.plan.classpath.push(jar.to_path_buf());
        Ok(())
    }

    fn register_artifact(&mut self, _jar: &Path, manifest: &ModManifest) -> LoaderResult<()> {
        self.plan.registered.push(manifest.id.clone());
        Ok(())
    }

    fn apply_access_rules(&mut self, _jar: &Path, resource: &str) -> LoaderResult<()> {
        self.plan.access_rules.push(resource.to_string());
        Ok(())
    }

    fn add_behavior_config(&mut self, name: &str) -> LoaderResult<()> {
        self.plan.behavior_configs.push(name.to_string());
        Ok(())
    }
}
