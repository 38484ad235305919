//! CLI subcommands.

pub mod analyze;
pub mod batch;
pub mod config;

use std::path::PathBuf;

use fiscai_core::FiscaiConfig;

/// Load the config given on the command line, else the default file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FiscaiConfig> {
    let path = match config_path {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let default = config::default_config_path();
            default.exists().then_some(default)
        }
    };

    Ok(FiscaiConfig::load(path.as_deref())?)
}
