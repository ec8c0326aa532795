//! Configuration management for ccrev CLI
//!
//! Settings come from the user config file, overlaid by `./ccrev.toml` in the
//! working directory. Tables merge key by key, so a local file only needs the
//! keys it changes.

use anyhow::{Context, Result};
use ccrev::analysis::{DEFAULT_COUNT_TOKEN, DEFAULT_TIMEOUT};
use ccrev::class_model::DEFAULT_FACTORY;
use ccrev::{Analyzer, Extractor, Regenerator};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project-local override file
pub const LOCAL_CONFIG: &str = "ccrev.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub code_gen: CodeGenConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write a `.meta` sidecar for every asset
    pub create_meta: bool,
    /// Indent JSON files
    pub prettify: bool,
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            create_meta: true,
            prettify: true,
            default_dir: PathBuf::from("out"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Space,
    Tab,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeGenConfig {
    pub indent_size: usize,
    pub indent: IndentStyle,
}

impl Default for CodeGenConfig {
    fn default() -> Self {
        Self {
            indent_size: 4,
            indent: IndentStyle::Space,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Factory member a class declaration must call; empty accepts any
    pub factory_name: String,
    /// Counted in files that cannot be parsed
    pub count_token: String,
    pub timeout_secs: u64,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            factory_name: DEFAULT_FACTORY.to_string(),
            count_token: DEFAULT_COUNT_TOKEN.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            parallel: true,
        }
    }
}

impl Config {
    /// Get the path to the user config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("ccrev");

        Ok(config_dir.join("config.toml"))
    }

    /// User config merged with the local override file
    pub fn load() -> Result<Self> {
        let global = Self::config_path().ok();
        Self::load_from(global.as_deref(), Path::new(LOCAL_CONFIG))
    }

    /// User config alone, as `configure` edits it
    pub fn load_global() -> Result<Self> {
        let global = Self::config_path()?;
        Self::from_layers(&[global.as_path()])
    }

    pub fn load_from(global: Option<&Path>, local: &Path) -> Result<Self> {
        let mut layers = Vec::new();
        layers.extend(global);
        layers.push(local);
        Self::from_layers(&layers)
    }

    /// Defaults overlaid by each existing file in order
    fn from_layers(paths: &[&Path]) -> Result<Self> {
        let mut merged =
            toml::Value::try_from(Config::default()).context("Failed to serialize defaults")?;

        for path in paths.iter().filter(|p| p.is_file()) {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            let layer: toml::Value = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            tracing::debug!("loaded config layer {}", path.display());
            merge(&mut merged, layer);
        }

        merged.try_into().context("Invalid configuration")
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        Ok(())
    }

    pub fn regenerator(&self) -> Regenerator {
        match self.code_gen.indent {
            IndentStyle::Tab => Regenerator::tabs(),
            IndentStyle::Space => Regenerator::spaces(self.code_gen.indent_size),
        }
    }

    pub fn analyzer(&self) -> Analyzer {
        let analysis = &self.analysis;
        let extractor = if analysis.factory_name.is_empty() {
            Extractor::new()
        } else {
            Extractor::with_factory(analysis.factory_name.as_str())
        };

        Analyzer::default()
            .with_extractor(extractor)
            .with_count_token(analysis.count_token.as_str())
            .with_timeout(Duration::from_secs(analysis.timeout_secs))
            .with_parallel(analysis.parallel)
    }
}

/// Overlay `layer` onto `base`: tables merge recursively, anything else replaces
fn merge(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}
