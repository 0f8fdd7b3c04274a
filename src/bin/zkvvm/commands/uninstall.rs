//! `zkvvm uninstall` command
//!
//! Works on the local cache only; no manifest or platform lookup.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::UninstallArgs;
use zkvvm::util::shell::{Shell, Status};
use zkvvm::sources::BinaryCache;
use zkvvm::{Config, Error, VersionPair};

pub fn execute(args: UninstallArgs, config: Config, shell: &Arc<Shell>) -> Result<()> {
    let pair = VersionPair::parse(&args.compiler, &args.backend).with_context(|| {
        format!(
            "invalid version pair `{}` `{}`: uninstall takes exact versions",
            args.compiler, args.backend
        )
    })?;

    let cache = BinaryCache::new(&config.cache_dir);
    if !cache.exists(&pair) {
        return Err(Error::NotFound { pair }.into());
    }

    if !args.yes && !confirm(&format!("Uninstall zkVyper {}?", pair))? {
        shell.status(Status::Skipped, "nothing removed");
        return Ok(());
    }

    cache.remove(&pair)?;
    tracing::info!("removed {}", cache.path_for(&pair).display());
    shell.status(Status::Removed, format!("zkVyper {}", pair));
    Ok(())
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
