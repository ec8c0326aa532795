//! Command handlers for ccrev CLI
//!
//! Each subcommand has its own module with handler functions.

pub mod configure;
pub mod inspect;
pub mod reverse;
pub mod uuid;

use anyhow::Result;
use ccrev::VersionHint;

/// Parse the optional `--version-hint` value
pub(crate) fn version_hint(raw: Option<&str>) -> Result<Option<VersionHint>> {
    Ok(VersionHint::parse_optional(raw.unwrap_or_default())?)
}
