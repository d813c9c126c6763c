//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::OutputStyle;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Cinder stylesheet compiler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Stylesheet source directory (relative to project root)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file name (default: cinder.toml)
    #[arg(short = 'C', long, default_value = "cinder.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Output style values accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StyleArg {
    Readable,
    Compact,
}

impl From<StyleArg> for OutputStyle {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Readable => OutputStyle::Readable,
            StyleArg::Compact => OutputStyle::Compact,
        }
    }
}

/// Shared build arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Recompile every unit, ignoring freshness checks
    #[arg(short, long)]
    pub force: bool,

    /// Output formatting style
    #[arg(long)]
    pub style: Option<StyleArg>,

    /// Drop line comments from compiled output
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub suppress_comments: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile all stylesheets once
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compile, then rebuild automatically on source changes
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }

    /// Shared build arguments of the active subcommand.
    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args } | Commands::Watch { build_args } => build_args,
        }
    }
}
