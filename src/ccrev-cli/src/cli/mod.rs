//! CLI argument definitions for ccrev
//!
//! This module contains all clap-derived structs and enums for CLI parsing.

mod core;
mod uuid;

pub use core::{Cli, Commands, InspectArgs, ReverseArgs};
pub use uuid::UuidCommand;
