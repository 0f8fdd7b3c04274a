//! zkvvm CLI - a version manager for the zkVyper compiler

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod cli;
mod commands;

use cli::{Cli, Commands};
use zkvvm::util::shell::{ColorChoice, Shell};
use zkvvm::util::{Config, GlobalContext};

/// Overrides the verbosity-based stderr filter.
const LOG_ENV: &str = "ZKVVM_LOG";

fn main() {
    let cli = Cli::parse();
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose > 0, color));

    if let Err(e) = run(cli, &shell) {
        eprintln!("error: {:#}", e);
        if let Some(help) = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<zkvvm::Error>())
            .and_then(zkvvm::Error::help)
        {
            eprintln!("{}", help);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    // Completions need no configuration at all.
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let ctx = GlobalContext::new();
    let mut config = Config::load(&ctx, cli.config.as_deref(), std::env::vars())?;
    config.merge(cli.overrides());

    init_logging(&config, cli.quiet, shell);
    tracing::debug!("cache dir: {}", config.cache_dir.display());

    match cli.command {
        Commands::Ls => commands::ls::execute(&config),
        Commands::LsRemote => commands::ls_remote::execute(config, shell),
        Commands::Install(args) => commands::install::execute(args, config, shell),
        Commands::Uninstall(args) => commands::uninstall::execute(args, config, shell),
        Commands::Compile(args) => commands::compile::execute(args, config, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Stderr logging by verbosity plus a debug log file.
///
/// A log file that cannot be opened is reported and skipped.
fn init_logging(config: &Config, quiet: bool, shell: &Shell) {
    let level = match (quiet, config.verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        _ => "debug",
    };
    let stderr_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("zkvvm={}", level)));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(stderr_filter);

    let file = config
        .log_file
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
        });
    let file_layer = match file {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(EnvFilter::new("zkvvm=debug")),
        ),
        Err(e) => {
            shell.warn(format!(
                "cannot open log file {}: {}",
                config.log_file.display(),
                e
            ));
            None
        }
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
