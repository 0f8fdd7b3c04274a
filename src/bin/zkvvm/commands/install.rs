//! `zkvvm install` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::InstallArgs;
use zkvvm::util::shell::{Shell, Status};
use zkvvm::{Config, VersionManager};

pub fn execute(args: InstallArgs, config: Config, shell: &Arc<Shell>) -> Result<()> {
    let manager = VersionManager::new(config)?;

    let already = manager.local_versions()?;
    let mut progress = shell.download_progress();
    let entry =
        manager.install(&args.compiler, &args.backend, args.overwrite, Some(&mut progress))?;

    if already.contains(&entry.pair) && !args.overwrite {
        shell.status(Status::Skipped, format!("zkVyper {} is already installed", entry.pair));
    } else {
        shell.status(
            Status::Installed,
            format!("zkVyper {} at {}", entry.pair, entry.path.display()),
        );
    }
    Ok(())
}
