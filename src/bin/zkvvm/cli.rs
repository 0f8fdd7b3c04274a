//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use zkvvm::util::ConfigOverrides;
use zkvvm::VersionSpec;

/// zkvvm - install and run zkVyper compiler versions
#[derive(Parser)]
#[command(name = "zkvvm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to config.toml in the user config dir)
    #[arg(long, global = true, value_name = "PATH", env = "ZKVVM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory installed binaries are kept in
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Diagnostic log file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// More output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Base URL of the remote manifest
    #[arg(long, global = true, value_name = "URL")]
    pub manifest_url: Option<String>,

    /// Default zkVyper version, exact or a requirement like `>=1.1`
    #[arg(long, global = true, value_name = "VERSION")]
    pub compiler_version: Option<VersionSpec>,

    /// Default Vyper backend version
    #[arg(long, global = true, value_name = "VERSION")]
    pub backend_version: Option<VersionSpec>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The configuration layer set on the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            cache_dir: self.cache_dir.clone(),
            log_file: self.log_file.clone(),
            verbosity: (self.verbose > 0).then_some(self.verbose),
            compiler_version: self.compiler_version.clone(),
            backend_version: self.backend_version.clone(),
            manifest_url: self.manifest_url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List installed versions
    #[command(visible_alias = "list")]
    Ls,

    /// List versions available for download
    #[command(name = "ls-remote")]
    LsRemote,

    /// Install a compiler version
    Install(InstallArgs),

    /// Remove an installed compiler version
    Uninstall(UninstallArgs),

    /// Compile Vyper sources and print the JSON output
    Compile(CompileArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// zkVyper version, exact or a requirement
    pub compiler: VersionSpec,

    /// Vyper backend version, exact or a requirement
    pub backend: VersionSpec,

    /// Download again even if already installed
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct UninstallArgs {
    /// zkVyper version
    pub compiler: String,

    /// Vyper backend version
    pub backend: String,

    /// Do not ask for confirmation
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Args)]
pub struct CompileArgs {
    /// Source files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Extra flags passed to zkvyper, after `--`
    #[arg(last = true)]
    pub flags: Vec<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
