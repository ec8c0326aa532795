//! Configuration command handlers
//!
//! Handles the `configure` subcommand for setting up ccrev CLI defaults.

use crate::config::{Config, LOCAL_CONFIG};
use anyhow::Result;
use std::path::PathBuf;

/// Handle the configure command
///
/// # Arguments
/// * `show` - If true, show the effective configuration
/// * `output_dir` - Optional default output directory to store
/// * `indent_size` - Optional indentation width to store
pub fn handle(show: bool, output_dir: Option<PathBuf>, indent_size: Option<usize>) -> Result<()> {
    if show {
        show_config(&Config::load()?)?;
        return Ok(());
    }

    let mut config = Config::load_global()?;
    if apply(&mut config, output_dir, indent_size) {
        config.save()?;
        if let Ok(path) = Config::config_path() {
            println!("Config saved to: {}", path.display());
        }
    } else {
        show_usage();
    }

    Ok(())
}

/// Apply requested changes, returning whether anything changed
fn apply(config: &mut Config, output_dir: Option<PathBuf>, indent_size: Option<usize>) -> bool {
    let mut changed = false;
    if let Some(dir) = output_dir {
        println!("Default output directory: {}", dir.display());
        config.output.default_dir = dir;
        changed = true;
    }
    if let Some(size) = indent_size {
        println!("Indent size: {}", size);
        config.code_gen.indent_size = size;
        changed = true;
    }
    changed
}

/// Display the effective configuration
fn show_config(config: &Config) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    println!();

    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
    println!("Local overrides: ./{}", LOCAL_CONFIG);

    Ok(())
}

/// Show usage help for the configure command
fn show_usage() {
    println!("Usage: ccrev configure --output-dir DIR");
    println!("   or: ccrev configure --indent-size N");
    println!("   or: ccrev configure --show");
}
