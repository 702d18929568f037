use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use crate::models::DEFAULT_ADMIN_CAPABILITIES;
use std::path::{Path, PathBuf};

/// Settings read from `~/.advfilter/rc`
///
/// ```text
/// data.location=./entries.db
/// admin.capabilities=manage_options,view_all_entries
/// site.utc_offset=+02:00
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_location: PathBuf,
    pub admin_capabilities: Vec<String>,
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_location: Self::app_dir().join("entries.db"),
            admin_capabilities: DEFAULT_ADMIN_CAPABILITIES.iter().map(|s| s.to_string()).collect(),
            utc_offset: Utc.fix(),
        }
    }
}

impl Config {
    /// Application directory (`$HOME/.advfilter`)
    pub fn app_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        home.join(".advfilter")
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::app_dir().join("rc")
    }

    /// Load configuration from the rc file, or defaults if there is none
    pub fn load() -> Result<Config> {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let base_dir = config_path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&content, &base_dir)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Parse rc content; relative data locations resolve against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Config> {
        let mut config = Config::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("Expected key=value, got '{}'", line);
            };
            let value = value.trim();
            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = if path.is_relative() { base_dir.join(path) } else { path };
                }
                "admin.capabilities" => {
                    config.admin_capabilities = value
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect();
                }
                "site.utc_offset" => {
                    config.utc_offset = parse_utc_offset(value)?;
                }
                other => log::warn!("Unknown config key '{}' ignored", other),
            }
        }

        Ok(config)
    }
}

/// Parse `+HH:MM` / `-HH:MM` (or `Z`)
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    if value.eq_ignore_ascii_case("z") || value == "0" {
        return Ok(Utc.fix());
    }
    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => anyhow::bail!("UTC offset must start with '+' or '-': {}", value),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().with_context(|| format!("Invalid UTC offset hours: {}", value))?;
    let minutes: i32 = minutes.parse().with_context(|| format!("Invalid UTC offset minutes: {}", value))?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow::anyhow!("UTC offset out of range: {}", value))
}
