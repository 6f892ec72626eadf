use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use anyhow::{Context, Result};
use toml::Value;
use log::{debug, info, LevelFilter};

use crate::active::ActiveObjectConfig;
use crate::logging::{LogConfig, LogDestination, LogFormat};
use crate::queue::PushPolicy;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "ACTIVE_OBJECT_CONFIG";

/// Section holding defaults for every other section
pub const BASE_SECTION: &str = "base";

/// Section holding logger settings
pub const LOGGING_SECTION: &str = "logging";

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

/// Configuration manager
#[derive(Debug, Default)]
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(Self::from_config(parse_toml_config(content)?))
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    /// File the configuration was read from, if any
    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get(BASE_SECTION).and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Whether a section exists in the loaded configuration
    pub fn has_section(&self, section: &str) -> bool {
        self.config.contains_key(section)
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get any value parseable with `FromStr`
    pub fn get_parsed<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_value(section, key) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid value for {}.{}: {} ({})", section, key, value, e)),
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Settings for the active object called `name`.
    ///
    /// Resolves each key from `[worker.<name>]`, then `[base]`, then the
    /// built-in defaults.
    pub fn active_object_config(&self, name: &str) -> Result<ActiveObjectConfig> {
        let section = format!("worker.{}", name);
        let mut config = ActiveObjectConfig::named(name);

        if let Some(capacity) = self.get_parsed::<usize>(&section, "capacity")? {
            config.queue.capacity = capacity;
        }
        if let Some(policy) = self.get_parsed::<PushPolicy>(&section, "push_policy")? {
            config.queue.push_policy = policy;
        }
        if let Some(timeout) = self.get_parsed::<u64>(&section, "start_timeout_ms")? {
            config.start_timeout_ms = timeout;
        }
        if let Some(timeout) = self.get_parsed::<u64>(&section, "stop_timeout_ms")? {
            config.stop_timeout_ms = timeout;
        }

        config
            .validate()
            .with_context(|| format!("Invalid configuration for active object '{}'", name))?;

        debug!("Resolved configuration for '{}': {:?}", name, config);
        Ok(config)
    }

    /// Logger settings from the `[logging]` section
    pub fn logging_config(&self) -> Result<LogConfig> {
        let mut config = LogConfig::default();

        if let Some(level) = self.get_log_level(LOGGING_SECTION, "console_level")? {
            config.console_level = level;
        }
        if let Some(format) = self.get_parsed::<LogFormat>(LOGGING_SECTION, "format")? {
            config.format = format;
        }
        if let Some(path) = self.get_path(LOGGING_SECTION, "file") {
            let file_level = self
                .get_log_level(LOGGING_SECTION, "file_level")?
                .unwrap_or(config.console_level);
            config.file_level = Some(file_level);
            config.destination = LogDestination::Both(path);
        }

        Ok(config)
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("active-object").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".active-object.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.active-object.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let table: toml::Table = content.parse()
        .context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    flatten_toml_table(&table, BASE_SECTION, "", &mut config);

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Flatten nested tables into dotted section names.
///
/// Scalar keys land in the section named by their enclosing table; scalars at
/// the top level belong to `[base]`.
fn flatten_toml_table(table: &toml::Table, section: &str, prefix: &str, config: &mut Configuration) {
    for (key, value) in table {
        match value {
            Value::Table(subtable) => {
                let child = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                config.entry(child.clone()).or_default();
                flatten_toml_table(subtable, &child, &child, config);
            }
            _ => {
                config
                    .entry(section.to_string())
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        // For complex types, use TOML representation
        other => other.to_string(),
    }
}
