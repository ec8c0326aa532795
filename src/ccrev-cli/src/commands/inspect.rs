//! Build inspection
//!
//! Handles the `inspect` subcommand: everything `reverse` does up to class
//! extraction, with the results printed instead of written.

use crate::cli::InspectArgs;
use crate::config::Config;
use anyhow::{Context as _, Result};
use ccrev::{AnalyzedFile, ClassModel, Context, FileAnalysis, ProjectLayout, SettingsDescriptor};
use serde::Serialize;

#[derive(Serialize)]
struct InspectReport<'a> {
    layout: &'a ProjectLayout,
    settings_quality: &'a str,
    settings: &'a SettingsDescriptor,
    scripts: Vec<String>,
    missing_scripts: Vec<String>,
    files: &'a [AnalyzedFile],
}

/// Handle the inspect command
pub fn handle(args: &InspectArgs, config: &Config) -> Result<()> {
    let hint = super::version_hint(args.version_hint.as_deref())?;
    let ctx = Context::load(&args.path, &args.path, hint)
        .with_context(|| format!("Failed to resolve build at {}", args.path.display()))?;

    let analysis = config.analyzer().analyze_context(&ctx);
    let lookup = ctx.auxiliary_scripts();
    let report = InspectReport {
        layout: &ctx.layout,
        settings_quality: ctx.settings_quality,
        settings: &ctx.settings,
        scripts: ctx.settings.script_list(),
        missing_scripts: lookup.missing,
        files: &analysis.files,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

fn render(report: &InspectReport) -> String {
    let mut out = String::new();
    let layout = report.layout;
    out.push_str(&format!("Layout: {}\n", layout.version));
    out.push_str(&format!("  settings:  {}\n", layout.settings_path.display()));
    out.push_str(&format!("  project:   {}\n", layout.project_path.display()));
    out.push_str(&format!("  resources: {}\n", layout.resource_path.display()));

    out.push_str(&format!("\nSettings ({})\n", report.settings_quality));
    for key in report.settings.keys() {
        out.push_str(&format!("  {}\n", key));
    }

    out.push_str(&format!("\nScripts: {}\n", report.scripts.len()));
    for missing in &report.missing_scripts {
        out.push_str(&format!("  missing: {}\n", missing));
    }

    out.push_str("\nClasses\n");
    for file in report.files {
        match &file.result {
            FileAnalysis::Models(models) => {
                out.push_str(&format!("  {} ({})\n", file.path.display(), models.len()));
                for model in models {
                    out.push_str(&format!("    {}\n", describe(model)));
                }
            }
            FileAnalysis::Count(n) => {
                out.push_str(&format!(
                    "  {} (unparsed, {} occurrence(s))\n",
                    file.path.display(),
                    n
                ));
            }
        }
    }
    out
}

fn describe(model: &ClassModel) -> String {
    let mut line = model.display_name().to_string();
    if let Some(base) = &model.extends {
        line.push_str(&format!(" extends {}", base));
    }
    if !model.properties.is_empty() {
        let keys: Vec<&str> = model.properties.keys().collect();
        line.push_str(&format!(" [{}]", keys.join(", ")));
    }
    line
}
