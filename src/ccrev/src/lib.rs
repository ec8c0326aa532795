//! # ccrev
//!
//! Cocos Creator web build reverser - layout detection, settings recovery,
//! class extraction and project reconstruction.
//!
//! This library provides functionality to:
//! - Detect which packaging convention produced a build directory
//! - Recover the settings descriptor from an obfuscated settings script
//! - Extract class declarations from bundled scripts and regenerate them
//! - Convert between the framework's asset identifier encodings
//! - Write a project skeleton with resources, scripts and `.meta` sidecars
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = ccrev::Context::load(Path::new("web-mobile"), Path::new("out"), None)?;
//! println!("Layout: {}", ctx.layout.version);
//!
//! let report = ccrev::Analyzer::default().analyze_context(&ctx);
//! for model in report.models() {
//!     println!("{}", ccrev::regenerate(model));
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod class_model;
pub mod context;
pub mod layout;
pub mod project;
pub mod script;
pub mod settings;
pub mod uuid_codec;

#[doc(inline)]
pub use analysis::{AnalysisReport, AnalyzedFile, Analyzer, FileAnalysis};
#[doc(inline)]
pub use class_model::{extract, regenerate, ClassModel, Extractor, PropertyMap, PropertyValue, Regenerator};
#[doc(inline)]
pub use context::{Context, ContextError};
#[doc(inline)]
pub use layout::{resolve, LayoutError, LayoutVersion, ProjectLayout, VersionHint};
#[doc(inline)]
pub use project::{ProjectError, ProjectWriter};
#[doc(inline)]
pub use script::{LiteParser, ParseError, ScriptParser, SyntaxTree};
#[doc(inline)]
pub use settings::{ParsedSettings, SettingsDescriptor};
