//! Discovery configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::usb::DeviceFilter;

/// Tracking module in application mode
pub const TRACKING_MODULE_FILTER: &str = "0x8087:0x0b37";
/// Tracking module boot loader, seen before firmware has loaded
pub const BOOT_LOADER_FILTER: &str = "0x03e7:0x2150";

/// Upper bound on `discovery.rounds`
pub const MAX_ROUNDS: u32 = 1_000;
/// Upper bound on `discovery.round_interval_ms` (one minute)
pub const MAX_ROUND_INTERVAL_MS: u64 = 60_000;
/// Upper bound on `discovery.poll_interval_us`; teardown waits up to one interval
pub const MAX_POLL_INTERVAL_US: u64 = 1_000_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Timing of the event thread and of the bounded discovery query
///
/// The defaults poll runtime events every 100 µs and wait up to ten
/// one-second rounds for firmware to come up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Sleep between event drains, in microseconds
    #[serde(default = "DiscoverySettings::default_poll_interval_us")]
    pub poll_interval_us: u64,
    /// Number of discovery rounds before giving up
    #[serde(default = "DiscoverySettings::default_rounds")]
    pub rounds: u32,
    /// Sleep after an empty discovery round, in milliseconds
    #[serde(default = "DiscoverySettings::default_round_interval_ms")]
    pub round_interval_ms: u64,
    /// Capacity of each presence subscription
    #[serde(default = "DiscoverySettings::default_channel_capacity")]
    pub presence_channel_capacity: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            poll_interval_us: Self::default_poll_interval_us(),
            rounds: Self::default_rounds(),
            round_interval_ms: Self::default_round_interval_ms(),
            presence_channel_capacity: Self::default_channel_capacity(),
        }
    }
}

impl DiscoverySettings {
    fn default_poll_interval_us() -> u64 {
        100
    }

    fn default_rounds() -> u32 {
        10
    }

    fn default_round_interval_ms() -> u64 {
        1000
    }

    fn default_channel_capacity() -> usize {
        common::channel::PRESENCE_CHANNEL_CAPACITY
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn round_interval(&self) -> Duration {
        Duration::from_millis(self.round_interval_ms)
    }

    /// Longest a discovery query can wait with no device present
    ///
    /// Saturates at `Duration::MAX` for settings built outside `validate`.
    pub fn discovery_timeout(&self) -> Duration {
        self.round_interval()
            .checked_mul(self.rounds)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// VID:PID patterns of devices reported by the USB runtime
    #[serde(default = "UsbSettings::default_filters")]
    pub filters: Vec<String>,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            filters: Self::default_filters(),
        }
    }
}

impl UsbSettings {
    fn default_filters() -> Vec<String> {
        vec![
            TRACKING_MODULE_FILTER.to_string(),
            BOOT_LOADER_FILTER.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl DiscoveryConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/tm-discovery/discovery.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DiscoveryConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("tm-discovery").join("discovery.toml")
        } else {
            PathBuf::from(".config/tm-discovery/discovery.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        let discovery = &self.discovery;
        if !(1..=MAX_ROUNDS).contains(&discovery.rounds) {
            return Err(anyhow!(
                "discovery.rounds must be between 1 and {}, got {}",
                MAX_ROUNDS,
                discovery.rounds
            ));
        }

        if discovery.round_interval_ms > MAX_ROUND_INTERVAL_MS {
            return Err(anyhow!(
                "discovery.round_interval_ms must be at most {}, got {}",
                MAX_ROUND_INTERVAL_MS,
                discovery.round_interval_ms
            ));
        }

        if !(1..=MAX_POLL_INTERVAL_US).contains(&discovery.poll_interval_us) {
            return Err(anyhow!(
                "discovery.poll_interval_us must be between 1 and {}, got {}",
                MAX_POLL_INTERVAL_US,
                discovery.poll_interval_us
            ));
        }

        for filter in &self.usb.filters {
            DeviceFilter::parse(filter).map_err(|e| anyhow!(e))?;
        }

        Ok(())
    }
}

/// Load configuration from a user-supplied path, expanding `~`
pub fn load_config(path: &str) -> Result<DiscoveryConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    DiscoveryConfig::load(Some(path_buf))
}
