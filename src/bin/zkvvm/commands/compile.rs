//! `zkvvm compile` command
//!
//! Compiles with the configured default versions, installing them first if
//! needed, and prints the parsed output as JSON on stdout.

use std::sync::Arc;

use anyhow::Result;

use crate::cli::CompileArgs;
use zkvvm::util::shell::{Shell, Status};
use zkvvm::{Config, VersionManager};

pub fn execute(args: CompileArgs, config: Config, shell: &Arc<Shell>) -> Result<()> {
    let manager = VersionManager::new(config)?;
    let mut compiler = manager.compiler().with_progress(shell.download_progress());

    let pair = compiler.resolve_pair(None)?;
    shell.status(
        Status::Compiling,
        format!("{} file(s) with zkVyper {}", args.files.len(), pair),
    );

    let output = compiler.compile(&args.files[..], Some(&pair), &args.flags)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    shell.status(Status::Finished, format!("{} contract(s)", output.contracts.len()));
    Ok(())
}
