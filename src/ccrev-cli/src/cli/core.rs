//! Core CLI definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::uuid::UuidCommand;

#[derive(Parser)]
#[command(name = "ccrev")]
#[command(about = "Cocos Creator web build reverser", long_about = None)]
pub struct Cli {
    /// Debug logging; also keeps intermediate files in <output>/temp
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconstruct an editable project from a web build
    #[command(visible_alias = "r")]
    Reverse(ReverseArgs),

    /// Resolve, parse and analyze a build without writing anything
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),

    /// Asset identifier conversions
    #[command(visible_alias = "u")]
    Uuid {
        #[command(subcommand)]
        command: UuidCommand,
    },

    /// Configure default settings
    #[command(visible_alias = "c")]
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set the default output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Set the indentation width of regenerated scripts
        #[arg(long)]
        indent_size: Option<usize>,
    },
}

#[derive(Args)]
pub struct ReverseArgs {
    /// Build directory (web-mobile or web-desktop output)
    #[arg(short, long, env = "CC_SOURCE_PATH")]
    pub path: PathBuf,

    /// Output project directory (uses configured default if not provided)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Framework version that produced the build (2.3.x, 2.4.x or 2.4.15)
    #[arg(long)]
    pub version_hint: Option<String>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Build directory
    pub path: PathBuf,

    /// Framework version that produced the build (2.3.x, 2.4.x or 2.4.15)
    #[arg(long)]
    pub version_hint: Option<String>,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_reverse_args() {
        let cli = Cli::parse_from([
            "ccrev",
            "reverse",
            "--path",
            "build/web-mobile",
            "--version-hint",
            "2.4.x",
            "-v",
        ]);
        assert!(cli.verbose);
        let Commands::Reverse(args) = cli.command else {
            panic!("expected reverse");
        };
        assert_eq!(args.path, PathBuf::from("build/web-mobile"));
        assert_eq!(args.version_hint.as_deref(), Some("2.4.x"));
        assert!(args.output.is_none());
    }

    #[test]
    fn test_verbose_and_silent_conflict() {
        assert!(Cli::try_parse_from(["ccrev", "-v", "-s", "inspect", "x"]).is_err());
    }
}
