use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{LoaderError, LoaderResult};

const MOD_MANIFEST: &str = "fabric.mod.json";
const NESTED_JARS_DIR: &str = "META-INF/jars/";

/// The parts of `fabric.mod.json` the bootstrap needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModManifest {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(rename = "accessWidener", default)]
    pub access_widener: Option<String>,
    /// Raw entries; see [`ModManifest::mixin_configs`].
    #[serde(default)]
    pub mixins: Vec<serde_json::Value>,
}

impl ModManifest {
    pub fn from_json_str(json: &str) -> LoaderResult<Self> {
        serde_json::from_str(json).map_err(|e| LoaderError::ModManifest(e.to_string()))
    }

    /// Read `fabric.mod.json` from the root of a jar.
    pub async fn read_from_jar(jar: &Path) -> LoaderResult<Self> {
        let jar = jar.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_from_jar_blocking(&jar))
            .await
            .map_err(|e| LoaderError::Other(format!("Task join error: {e}")))?
    }

    fn read_from_jar_blocking(jar: &Path) -> LoaderResult<Self> {
        let file = File::open(jar).map_err(|e| LoaderError::io(jar, e))?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut entry = archive.by_name(MOD_MANIFEST).map_err(|e| {
            LoaderError::ModManifest(format!("{} not found in {}: {}", MOD_MANIFEST, jar.display(), e))
        })?;

        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        let manifest = Self::from_json_str(&text)?;
        debug!("Read {} from {:?}: {}", MOD_MANIFEST, jar, manifest.id);
        Ok(manifest)
    }

    /// Mixin config file names. Object entries are skipped; only plain
    /// string entries are honoured.
    pub fn mixin_configs(&self) -> Vec<String> {
        self.mixins
            .iter()
            .filter_map(|value| match value {
                serde_json::Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Copy every `.jar` under `META-INF/jars/` into `dest`, flattened to its
/// file name. Existing files are overwritten. Returns the extracted paths in
/// archive order.
pub async fn extract_nested_jars(jar: &Path, dest: &Path) -> LoaderResult<Vec<PathBuf>> {
    let jar = jar.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_nested_jars_blocking(&jar, &dest))
        .await
        .map_err(|e| LoaderError::Other(format!("Task join error: {e}")))?
}

fn extract_nested_jars_blocking(jar: &Path, dest: &Path) -> LoaderResult<Vec<PathBuf>> {
    let file = File::open(jar).map_err(|e| LoaderError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.is_file() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.starts_with(NESTED_JARS_DIR) || !name.ends_with(".jar") {
            continue;
        }
        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_os_string()))
        else {
            continue;
        };

        if extracted.is_empty() {
            fs::create_dir_all(dest).map_err(|e| LoaderError::io(dest, e))?;
        }
        let target = dest.join(file_name);
        let mut out = File::create(&target).map_err(|e| LoaderError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| LoaderError::io(&target, e))?;
        debug!("Extracted nested JAR: {}", name);
        extracted.push(target);
    }

    Ok(extracted)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use zip::write::SimpleFileOptions;

    /// Write a jar at `path` holding `entries` (name, contents).
    pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(contents).unwrap();
        }
        writer.finish().unwrap();
    }

    pub const CLIENT_MANIFEST: &str = r#"{
        "schemaVersion": 1,
        "id": "lambda",
        "version": "0.1.0+1.21.1",
        "accessWidener": "lambda.accesswidener",
        "mixins": ["lambda.mixins.common.json", {"config": "lambda.mixins.client.json", "environment": "client"}]
    }"#;
}
