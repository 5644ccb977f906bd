use std::path::Path;

use anyhow::Result;
use logrelay_config::Config;

pub fn handle(config: &Config, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
