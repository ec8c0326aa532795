//! Project reconstruction
//!
//! Handles the `reverse` subcommand: resolve the build, copy its resources,
//! analyze its scripts and write an editable project.

use crate::cli::ReverseArgs;
use crate::config::Config;
use anyhow::{Context as _, Result};
use ccrev::{Context, ProjectWriter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use walkdir::WalkDir;

/// Counts reported after a run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReverseSummary {
    pub resources: usize,
    pub classes: usize,
    pub degraded_files: usize,
    pub meta_files: usize,
}

/// Handle the reverse command
pub fn handle(args: &ReverseArgs, config: &Config, verbose: bool, silent: bool) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.output.default_dir.clone());
    let hint = super::version_hint(args.version_hint.as_deref())?;

    let ctx = Context::load(&args.path, &output, hint)
        .with_context(|| format!("Failed to resolve build at {}", args.path.display()))?;

    println!("Layout: {}", ctx.layout.version);
    println!("  settings:  {}", ctx.layout.settings_path.display());
    println!("  project:   {}", ctx.layout.project_path.display());
    println!("  resources: {}", ctx.layout.resource_path.display());
    println!("Settings {}", ctx.settings_quality);

    let summary = run(&ctx, config, verbose, silent)?;

    println!();
    println!("Project written to {}", output.display());
    println!("  {} resource file(s)", summary.resources);
    println!("  {} class script(s)", summary.classes);
    if summary.degraded_files > 0 {
        println!(
            "  {} script file(s) could not be parsed and were only counted",
            summary.degraded_files
        );
    }
    if config.output.create_meta {
        println!("  {} meta file(s)", summary.meta_files);
    }
    Ok(())
}

/// Reconstruct the project described by `ctx`
pub fn run(ctx: &Context, config: &Config, verbose: bool, silent: bool) -> Result<ReverseSummary> {
    let writer = ProjectWriter::new(&ctx.output_root).with_prettify(config.output.prettify);
    writer
        .scaffold()
        .with_context(|| format!("Failed to create project at {}", ctx.output_root.display()))?;

    let mut summary = ReverseSummary {
        resources: copy_resources(&writer, &ctx.layout.resource_path, silent)?,
        ..Default::default()
    };

    let mut analyzer = config.analyzer();
    if verbose {
        analyzer = analyzer.with_tree_dump(writer.temp_dir().join("ast"));
    }
    let report = analyzer.analyze_context(ctx);
    summary.degraded_files = report.degraded().count();
    for file in report.degraded() {
        tracing::warn!("{}: classes counted, not extracted", file.path.display());
    }

    let models = report.into_models();
    summary.classes = writer
        .write_scripts(&models, &config.regenerator())
        .context("Failed to write class scripts")?
        .len();

    writer
        .write_settings(&ctx.settings)
        .context("Failed to write settings descriptor")?;

    if config.output.create_meta {
        summary.meta_files = writer.write_meta_files().context("Failed to write meta files")?;
    }

    if !verbose {
        writer.clean_temp().context("Failed to clean temp directory")?;
    }

    Ok(summary)
}

fn copy_resources(writer: &ProjectWriter, resources: &Path, silent: bool) -> Result<usize> {
    let total = WalkDir::new(resources)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count();

    let pb = if silent {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let copied = writer
        .copy_resources(resources, &|rel: &Path| {
            pb.set_message(rel.display().to_string());
            pb.inc(1);
        })
        .with_context(|| format!("Failed to copy resources from {}", resources.display()))?;

    pb.finish_with_message("Done");
    Ok(copied)
}
