//! Configuration display command.

use crate::cli::icons;
use earnings_ocr::config::Config;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => eprintln!("{} Loaded from {}", icons::info(), path.display()),
        None => eprintln!("{} No config file found, using defaults", icons::info()),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
