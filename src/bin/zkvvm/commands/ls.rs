//! `zkvvm ls` command
//!
//! Lists installed versions from the cache directory. Never touches the network.

use anyhow::Result;

use zkvvm::sources::BinaryCache;
use zkvvm::Config;

pub fn execute(config: &Config) -> Result<()> {
    let installed = BinaryCache::new(&config.cache_dir).list_installed()?;

    if installed.is_empty() {
        println!("No local versions found.");
        return Ok(());
    }

    for pair in installed.iter().rev() {
        println!("{}", pair);
    }
    Ok(())
}
