//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that targets `127.0.0.1:9999`. Command-line
//! overrides are applied on top of the file before validation.

use serde::de::Error;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::controller::profile::{
    AxisSign, ControllerProfile, HatComponent, LogicalControl, PhysicalSource, ProfileRegistry,
};
use crate::error::{Result, TeleopError};

/// Configuration file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub drive: DriveConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Additional controller profiles; override built-ins by name
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
}

/// Robot link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// IP address or hostname, used when `mac_address` is empty
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Robot MAC address, resolved through the neighbor table
    #[serde(default)]
    pub mac_address: String,

    #[serde(default = "default_neighbor_table")]
    pub neighbor_table: String,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Drive configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
}

/// Control loop configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_loop_rate_hz")]
    pub loop_rate_hz: u32,

    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,

    #[serde(default = "default_status_interval_ticks")]
    pub status_interval_ticks: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stdout only
    #[serde(default)]
    pub directory: String,
}

/// Controller profile defined in the configuration file
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProfileConfig {
    /// Device name as reported by the input subsystem
    pub name: String,

    /// Logical control name (e.g. "left_stick_x") to physical source
    #[serde(default)]
    pub controls: BTreeMap<String, SourceConfig>,
}

/// One physical source: exactly one of `button`, `axis` or `hat`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub button: Option<u8>,
    pub axis: Option<u8>,
    pub hat: Option<u8>,

    /// Negate an axis reading
    #[serde(default)]
    pub invert: bool,

    /// Hat component to read
    pub component: Option<HatComponent>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mac_address: Option<String>,
    pub max_speed: Option<f32>,
    pub deadzone: Option<f32>,
    pub loop_rate_hz: Option<u32>,
    pub log_level: Option<String>,
}

// Default value functions
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 9999 }
fn default_neighbor_table() -> String { "/proc/net/arp".to_string() }
fn default_reconnect_delay_ms() -> u64 { 100 }
fn default_connect_timeout_ms() -> u64 { 1000 }

fn default_deadzone() -> f32 { 0.08 }
fn default_max_speed() -> f32 { 0.8 }

fn default_loop_rate_hz() -> u32 { 30 }
fn default_rescan_interval_ms() -> u64 { 1000 }
fn default_status_interval_ticks() -> u64 { 300 }

fn default_log_level() -> String { "info".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            mac_address: String::new(),
            neighbor_table: default_neighbor_table(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            max_speed: default_max_speed(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: default_loop_rate_hz(),
            rescan_interval_ms: default_rescan_interval_ms(),
            status_interval_ticks: default_status_interval_ticks(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> TeleopError {
    TeleopError::Config(toml::de::Error::custom(message))
}

/// Checks for six two-digit hex octets joined by one separator kind.
fn is_valid_mac(mac: &str) -> bool {
    let separator = if mac.contains('-') { '-' } else { ':' };
    let octets: Vec<&str> = mac.split(separator).collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

impl SourceConfig {
    /// Convert to a physical source
    ///
    /// # Errors
    ///
    /// Returns `Config` error unless exactly one source kind is set, or if a
    /// hat has no component
    pub fn to_source(&self) -> Result<PhysicalSource> {
        match (self.button, self.axis, self.hat) {
            (Some(index), None, None) => Ok(PhysicalSource::Button(index)),
            (None, Some(index), None) => {
                let sign = if self.invert { AxisSign::Negative } else { AxisSign::Positive };
                Ok(PhysicalSource::Axis(index, sign))
            }
            (None, None, Some(index)) => {
                let component = self
                    .component
                    .ok_or_else(|| invalid("hat source requires component = \"x\" or \"y\""))?;
                Ok(PhysicalSource::Hat(index, component))
            }
            _ => Err(invalid("source must set exactly one of button, axis or hat")),
        }
    }
}

impl ProfileConfig {
    /// Build the profile this entry describes
    ///
    /// # Errors
    ///
    /// Returns `Config` error for an empty name, an unknown control name or
    /// an invalid source
    pub fn to_profile(&self) -> Result<ControllerProfile> {
        if self.name.trim().is_empty() {
            return Err(invalid("profile name cannot be empty"));
        }

        let mut controls = Vec::with_capacity(self.controls.len());
        for (key, source) in &self.controls {
            let control = LogicalControl::from_str(key)
                .map_err(|e| invalid(format!("profile '{}': {}", self.name, e)))?;
            let source = source
                .to_source()
                .map_err(|e| invalid(format!("profile '{}', {}: {}", self.name, key, e)))?;
            controls.push((control, source));
        }

        Ok(ControllerProfile::new(self.name.clone(), controls))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mecanum_teleop::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, apply command-line overrides, then validate
    ///
    /// With `path = None` the file at [`DEFAULT_CONFIG_PATH`] is used if it
    /// exists, otherwise built-in defaults. An explicit path must exist.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit file cannot be read, parsing fails, or
    /// the overridden configuration is invalid
    pub fn load_with_overrides(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::read(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Replace configured values with those given on the command line
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.host {
            self.link.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.link.port = port;
        }
        if let Some(mac) = &overrides.mac_address {
            self.link.mac_address = mac.clone();
        }
        if let Some(max_speed) = overrides.max_speed {
            self.drive.max_speed = max_speed;
        }
        if let Some(deadzone) = overrides.deadzone {
            self.drive.deadzone = deadzone;
        }
        if let Some(rate) = overrides.loop_rate_hz {
            self.control.loop_rate_hz = rate;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Built-in profiles with configured profiles layered on top
    ///
    /// # Errors
    ///
    /// Returns `Config` error if any configured profile is invalid
    pub fn profile_registry(&self) -> Result<ProfileRegistry> {
        let mut registry = ProfileRegistry::builtin();
        for profile in &self.profiles {
            registry.insert(profile.to_profile()?);
        }
        Ok(registry)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Link
        if self.link.port == 0 {
            return Err(invalid("port must be between 1 and 65535"));
        }
        let mac = self.link.mac_address.trim();
        if mac.is_empty() {
            if self.link.host.trim().is_empty() {
                return Err(invalid("host cannot be empty when mac_address is not set"));
            }
        } else if !is_valid_mac(mac) {
            return Err(invalid(format!(
                "mac_address '{}' must be six hex octets separated by ':' or '-'",
                mac
            )));
        }
        if self.link.reconnect_delay_ms == 0 || self.link.reconnect_delay_ms > 60000 {
            return Err(invalid("reconnect_delay_ms must be between 1 and 60000"));
        }
        if self.link.connect_timeout_ms == 0 || self.link.connect_timeout_ms > 10000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 10000"));
        }

        // Drive
        if !(0.0..1.0).contains(&self.drive.deadzone) {
            return Err(invalid("deadzone must be at least 0.0 and less than 1.0"));
        }
        if !(self.drive.max_speed > 0.0 && self.drive.max_speed <= 1.0) {
            return Err(invalid("max_speed must be greater than 0.0 and at most 1.0"));
        }

        // Control loop
        if self.control.loop_rate_hz == 0 || self.control.loop_rate_hz > 250 {
            return Err(invalid("loop_rate_hz must be between 1 and 250"));
        }
        if self.control.rescan_interval_ms == 0 || self.control.rescan_interval_ms > 60000 {
            return Err(invalid("rescan_interval_ms must be between 1 and 60000"));
        }
        if self.control.status_interval_ticks == 0 {
            return Err(invalid("status_interval_ticks must be greater than 0"));
        }

        // Logging
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(invalid(format!(
                "log level '{}' must be one of: trace, debug, info, warn, error",
                self.logging.level
            )));
        }

        // Profiles
        for profile in &self.profiles {
            profile.to_profile()?;
        }

        Ok(())
    }
}
