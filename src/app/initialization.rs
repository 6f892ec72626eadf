//! Application initialization and configuration

use anyhow::{Context, Result};
use log::{debug, LevelFilter};
use std::str::FromStr;

use crate::active::ActiveObjectConfig;
use crate::queue::PushPolicy;
use crate::{cli, config, logging};

/// Name of the demo's worker, also its `[worker.<name>]` config section
pub const WORKER_NAME: &str = "line-stats";

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        config::ConfigManager::load_from_file(config_file.clone())?
    } else {
        config::ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

/// Logger settings: command line flags win over the `[logging]` section
pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    let mut log_config = config.logging_config()
        .context("Invalid [logging] configuration")?;

    if args.debug {
        log_config.console_level = LevelFilter::Trace;
    } else if args.verbose {
        log_config.console_level = LevelFilter::Debug;
    } else if args.quiet {
        log_config.console_level = LevelFilter::Error;
    }

    if let Some(format) = &args.log_format {
        log_config.format = logging::LogFormat::from_str(format)
            .map_err(|e| anyhow::anyhow!(e))?;
    }

    if let Some(file_path) = &args.log_file {
        let file_level = match &args.log_file_level {
            Some(level) => logging::parse_log_level(level)?,
            None => log_config.file_level.unwrap_or(log_config.console_level),
        };
        log_config.file_level = Some(file_level);
        log_config.destination = logging::LogDestination::Both(file_path.clone());
    }

    Ok(log_config)
}

/// Worker settings: `[worker.line-stats]`, then `[base]`, then command line overrides
pub fn worker_config(args: &cli::Args, config: &config::ConfigManager) -> Result<ActiveObjectConfig> {
    let mut worker = config.active_object_config(WORKER_NAME)?;

    if let Some(capacity) = args.capacity {
        worker.queue.capacity = capacity;
    }
    if args.reject_when_full {
        worker.queue.push_policy = PushPolicy::Reject;
    }

    worker.validate()?;
    debug!("Worker configuration: {:?}", worker);
    Ok(worker)
}
