//! Configuration for address validation and device registries.
//!
//! Configuration is TOML-backed. The default path is
//! `~/.config/protocol-address/config.toml`:
//!
//! ```toml
//! [address]
//! max_device_id = 127
//! max_name_length = 256
//!
//! [registry]
//! max_devices_per_account = 5
//! ```
//!
//! Every bound is optional; an absent bound means unconstrained.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_name_length must be greater than 0, got {0}")]
    InvalidMaxNameLength(usize),

    #[error("max_devices_per_account must be greater than 0, got {0}")]
    InvalidMaxDevices(usize),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    /// Limits applied when constructing addresses.
    pub address: AddressConfig,

    /// Limits applied by [`crate::DeviceRegistry`].
    pub registry: RegistryConfig,
}

/// Address construction limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AddressConfig {
    /// Largest device identifier accepted. `None` accepts any `u32`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_device_id: Option<u32>,

    /// Longest name accepted, in bytes. `None` accepts any non-empty name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_name_length: Option<usize>,
}

/// Device registry limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum number of devices tracked per account. `None` is unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_devices_per_account: Option<usize>,
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("protocol-address")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - PROTOCOL_ADDRESS_MAX_DEVICE_ID: Override `address.max_device_id`
    /// - PROTOCOL_ADDRESS_MAX_NAME_LENGTH: Override `address.max_name_length`
    /// - PROTOCOL_ADDRESS_MAX_DEVICES: Override `registry.max_devices_per_account`
    pub fn apply_env_overrides(&mut self) {
        if let Some(value) = env_override("PROTOCOL_ADDRESS_MAX_DEVICE_ID") {
            self.address.max_device_id = Some(value);
        }
        if let Some(value) = env_override("PROTOCOL_ADDRESS_MAX_NAME_LENGTH") {
            self.address.max_name_length = Some(value);
        }
        if let Some(value) = env_override("PROTOCOL_ADDRESS_MAX_DEVICES") {
            self.registry.max_devices_per_account = Some(value);
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.max_name_length == Some(0) {
            return Err(ConfigError::InvalidMaxNameLength(0));
        }

        if self.registry.max_devices_per_account == Some(0) {
            return Err(ConfigError::InvalidMaxDevices(0));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", e))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn env_override<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok().filter(|v| !v.is_empty())?;
    match raw.parse() {
        Ok(value) => {
            tracing::info!("Overriding {} from environment: {}", var, raw);
            Some(value)
        }
        Err(_) => {
            tracing::warn!("Ignoring unparseable {} from environment: {}", var, raw);
            None
        }
    }
}
