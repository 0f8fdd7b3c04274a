//! `zkvvm ls-remote` command

use std::sync::Arc;

use anyhow::Result;

use zkvvm::util::shell::{Shell, Status};
use zkvvm::{Config, VersionManager};

pub fn execute(config: Config, shell: &Arc<Shell>) -> Result<()> {
    let manager = VersionManager::new(config)?;
    shell.status(Status::Fetching, &manager.config().manifest_url);

    for pair in manager.remote_versions()? {
        println!("{}", pair);
    }
    Ok(())
}
