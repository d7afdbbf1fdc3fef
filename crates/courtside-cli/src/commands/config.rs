//! Configuration commands.

use std::sync::Arc;

use courtside_core::Region;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(&config.redacted())
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let directory = Arc::new(config.directory());
    let providers = config.providers(&directory).map_err(ClientError::Config)?;

    for region in providers.regions() {
        match config
            .credential(region)
            .map_err(|e| ClientError::Config(format!("invalid {} login: {}", region.provider_name(), e)))?
        {
            Some(_) => println!("{} login resolved.", region.provider_name()),
            None => println!("{}: site configured without a login.", region.provider_name()),
        }
    }
    for region in Region::ALL {
        if providers.get(region).is_none() && config.site(region).is_some() {
            println!("{}: no base_url, site disabled.", region.provider_name());
        }
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and cache paths.
pub fn path(config: &ClientConfig) -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    println!("cache: {}", config.cache_dir().display());
    Ok(())
}
