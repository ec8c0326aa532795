//! Resolved inputs of one reconstruction run.
//!
//! A [`Context`] is built once, right after layout resolution, and handed by
//! reference to every later stage. Nothing in it changes afterwards.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::layout::{self, LayoutError, ProjectLayout, VersionHint};
use crate::settings::{self, ParsedSettings, SettingsDescriptor};

#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("failed to read settings file {}: {source}", .path.display())]
    ReadSettings {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Context {
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub layout: ProjectLayout,
    pub settings: SettingsDescriptor,
    /// How far settings recovery got, for reporting
    pub settings_quality: &'static str,
}

impl Context {
    /// Resolve the layout under `source_root` and recover its settings
    pub fn load(
        source_root: &Path,
        output_root: &Path,
        hint: Option<VersionHint>,
    ) -> Result<Self, ContextError> {
        let layout = layout::resolve(source_root, hint)?;

        let raw = fs::read(&layout.settings_path).map_err(|source| ContextError::ReadSettings {
            path: layout.settings_path.clone(),
            source,
        })?;
        let parsed = settings::parse(&raw);
        if parsed.is_degraded() {
            tracing::warn!("settings were {}", parsed.label());
        }
        let settings_quality = parsed.label();

        Ok(Self {
            source_root: source_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            layout,
            settings: parsed.into_descriptor(),
            settings_quality,
        })
    }

    /// Assemble a context from parts that were resolved elsewhere
    pub fn from_parts(
        source_root: &Path,
        output_root: &Path,
        layout: ProjectLayout,
        parsed: ParsedSettings,
    ) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            layout,
            settings_quality: parsed.label(),
            settings: parsed.into_descriptor(),
        }
    }

    /// Auxiliary scripts named in the settings, split into found and missing.
    ///
    /// Each entry is looked up relative to the source root, then under `src/`.
    /// Order and duplicates follow the settings list.
    pub fn auxiliary_scripts(&self) -> ScriptLookup {
        let mut lookup = ScriptLookup::default();
        for entry in self.settings.script_list() {
            let candidates = [
                self.source_root.join(&entry),
                self.source_root.join("src").join(&entry),
            ];
            match candidates.into_iter().find(|p| p.is_file()) {
                Some(path) => lookup.found.push(path),
                None => {
                    tracing::warn!("script not found: {}", entry);
                    lookup.missing.push(entry);
                }
            }
        }
        lookup
    }

    /// Bootstrap script followed by every auxiliary script found on disk
    pub fn analysis_inputs(&self) -> (Vec<PathBuf>, Vec<String>) {
        let lookup = self.auxiliary_scripts();
        let mut inputs = Vec::with_capacity(lookup.found.len() + 1);
        inputs.push(self.layout.project_path.clone());
        inputs.extend(lookup.found);
        (inputs, lookup.missing)
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.output_root.join("assets")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.output_root.join("temp")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptLookup {
    pub found: Vec<PathBuf>,
    /// Settings entries with no file behind them
    pub missing: Vec<String>,
}
