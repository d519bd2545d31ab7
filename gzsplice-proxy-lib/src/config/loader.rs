use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{ProxyError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| ProxyError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: Config = toml::from_str(&txt)
        .map_err(|e| ProxyError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.inject.markup.is_empty() {
        return Err(ProxyError::Config(
            "inject.markup must not be empty".to_string(),
        ));
    }

    if cfg.timeout.connect_ms == 0 {
        return Err(ProxyError::Config(
            "timeout.connect_ms must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
