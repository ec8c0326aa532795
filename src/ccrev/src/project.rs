//! Output project writer.
//!
//! Lays out a Cocos Creator project skeleton, copies build resources into it,
//! emits regenerated class scripts and gives every asset a `.meta` sidecar.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::class_model::{ClassModel, Regenerator};
use crate::settings::SettingsDescriptor;
use crate::uuid_codec;

/// Directories every project carries
pub const PROJECT_DIRS: [&str; 4] = ["assets", "settings", "library", "temp"];

/// Where regenerated scripts go, relative to the project root
pub const SCRIPTS_DIR: &str = "assets/scripts";

const META_EXTENSION: &str = "meta";
const META_VERSION: &str = "1.0.3";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProjectError>;

#[derive(Serialize)]
struct ProjectFile {
    creator: &'static str,
    engine: &'static str,
    version: &'static str,
    settings: ProjectSettings,
}

#[derive(Serialize)]
struct ProjectSettings {
    import: ImportSettings,
}

#[derive(Serialize)]
struct ImportSettings {
    polyfills: bool,
}

/// Sidecar written next to each asset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMeta {
    pub ver: String,
    pub uuid: String,
    pub async_load_assets: bool,
    pub sub_metas: serde_json::Map<String, serde_json::Value>,
}

impl AssetMeta {
    /// Meta for an asset file.
    ///
    /// An identifier embedded in a bucketed build name (`fc/fcmR3X....json`)
    /// is reused unless another asset in `claimed` already took it; anything
    /// else gets a fresh v4 uuid.
    pub fn for_asset(path: &Path, claimed: &mut HashSet<String>) -> Self {
        let uuid = embedded_uuid(path)
            .filter(|id| claimed.insert(id.clone()))
            .unwrap_or_else(|| {
                let id = uuid::Uuid::new_v4().to_string();
                claimed.insert(id.clone());
                id
            });
        Self {
            ver: META_VERSION.to_string(),
            uuid,
            async_load_assets: false,
            sub_metas: serde_json::Map::new(),
        }
    }
}

/// Identifier in a file name whose parent directory is its two-character bucket
fn embedded_uuid(path: &Path) -> Option<String> {
    let bucket = path.parent()?.file_name()?.to_str()?;
    let stem = path.file_stem()?.to_str()?;
    stem.split('.')
        .filter(|segment| segment.len() > 2 && segment.get(..2) == Some(bucket))
        .find_map(uuid_codec::to_canonical)
}

/// Writes into one output project directory
#[derive(Debug, Clone)]
pub struct ProjectWriter {
    root: PathBuf,
    prettify: bool,
}

impl ProjectWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prettify: true,
        }
    }

    /// Indent JSON output (on by default)
    pub fn with_prettify(mut self, prettify: bool) -> Self {
        self.prettify = prettify;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(if self.prettify {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        })
    }

    /// Create the project directories and `project.json`
    pub fn scaffold(&self) -> Result<()> {
        for dir in PROJECT_DIRS {
            fs::create_dir_all(self.root.join(dir))?;
        }
        let project = ProjectFile {
            creator: "1.0.0",
            engine: "cocos-creator",
            version: "1.0.0",
            settings: ProjectSettings {
                import: ImportSettings { polyfills: false },
            },
        };
        fs::write(self.root.join("project.json"), self.to_json(&project)?)?;
        tracing::debug!("scaffolded project at {}", self.root.display());
        Ok(())
    }

    /// Keep the recovered descriptor alongside the project settings
    pub fn write_settings(&self, settings: &SettingsDescriptor) -> Result<PathBuf> {
        let path = self.root.join("settings").join("build-settings.json");
        fs::create_dir_all(self.root.join("settings"))?;
        fs::write(&path, self.to_json(settings)?)?;
        Ok(path)
    }

    /// Copy every file under `resources` into `assets/`, preserving structure.
    ///
    /// `progress` is called once per copied file.
    pub fn copy_resources(
        &self,
        resources: &Path,
        progress: &(dyn Fn(&Path) + Sync),
    ) -> Result<usize> {
        let files = list_files(resources)?;
        let assets = self.assets_dir();

        files.par_iter().try_for_each(|file| {
            let rel = file.strip_prefix(resources).unwrap_or(file);
            let target = assets.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(file, &target).map_err(|source| ProjectError::Copy {
                from: file.clone(),
                to: target.clone(),
                source,
            })?;
            progress(rel);
            Ok::<_, ProjectError>(())
        })?;

        tracing::info!("copied {} resource file(s)", files.len());
        Ok(files.len())
    }

    /// Regenerate each model into `assets/scripts/<Name>.js`
    pub fn write_scripts(
        &self,
        models: &[ClassModel],
        regenerator: &Regenerator,
    ) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(SCRIPTS_DIR);
        fs::create_dir_all(&dir)?;

        let names = script_names(models);
        let mut written = Vec::with_capacity(models.len());
        for (model, name) in models.iter().zip(names) {
            let path = dir.join(format!("{}.js", name));
            fs::write(&path, regenerator.regenerate(model))?;
            tracing::debug!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Write a `.meta` sidecar for every asset that lacks one
    pub fn write_meta_files(&self) -> Result<usize> {
        let assets = self.assets_dir();
        let pending: Vec<PathBuf> = list_files(&assets)?
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION))
            .filter(|p| !meta_path(p).exists())
            .collect();

        // Assign in walk order so the first file of an asset keeps its id
        let mut claimed = existing_meta_uuids(&assets)?;
        let metas: Vec<(&PathBuf, AssetMeta)> = pending
            .iter()
            .map(|asset| (asset, AssetMeta::for_asset(asset, &mut claimed)))
            .collect();

        metas.par_iter().try_for_each(|(asset, meta)| {
            fs::write(meta_path(asset), self.to_json(meta)?)?;
            Ok::<_, ProjectError>(())
        })?;

        tracing::info!("wrote {} meta file(s)", pending.len());
        Ok(pending.len())
    }

    /// Remove intermediate files
    pub fn clean_temp(&self) -> Result<()> {
        let temp = self.temp_dir();
        if temp.exists() {
            fs::remove_dir_all(&temp)?;
        }
        fs::create_dir_all(&temp)?;
        Ok(())
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Uuids already taken by `.meta` files under `dir`
fn existing_meta_uuids(dir: &Path) -> Result<HashSet<String>> {
    let mut taken = HashSet::new();
    for path in list_files(dir)? {
        if path.extension().and_then(|e| e.to_str()) != Some(META_EXTENSION) {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&fs::read_to_string(&path)?)
        else {
            tracing::warn!("unreadable meta file {}", path.display());
            continue;
        };
        if let Some(uuid) = value.get("uuid").and_then(|u| u.as_str()) {
            taken.insert(uuid.to_string());
        }
    }
    Ok(taken)
}

fn meta_path(asset: &Path) -> PathBuf {
    let mut name = asset.as_os_str().to_os_string();
    name.push(".");
    name.push(META_EXTENSION);
    PathBuf::from(name)
}

/// File stems for each model: sanitized class name, `Class<N>` when
/// anonymous, numeric suffix on collision
pub fn script_names(models: &[ClassModel]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut anonymous = 0;

    models
        .iter()
        .map(|model| {
            let base = match model.name.as_deref().map(sanitize).filter(|s| !s.is_empty()) {
                Some(name) => name,
                None => {
                    anonymous += 1;
                    format!("Class{}", anonymous)
                }
            };

            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.to_ascii_lowercase()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
