// Configuration management module
// Loading and validation of the daemon configuration

use crate::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bridge IP address or hostname
    pub bridge_address: String,
    /// Application key obtained by pairing with the bridge
    pub bridge_app_key: String,
    /// IANA timezone name, e.g. "US/Eastern"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// City locator for the weather provider, e.g. "New York,US"
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub weather_api_key: String,
    /// Zone whose scenes mirror the current weather; omit to disable the routine
    #[serde(default)]
    pub weather_zone: Option<String>,
    /// Zone that receives holiday scenes; omit to disable the routine
    #[serde(default)]
    pub holiday_zone: Option<String>,
    #[serde(default = "default_holiday_interval_hours")]
    pub holiday_interval_hours: u64,
    /// Inside/outside comparison band in degrees Fahrenheit
    #[serde(default = "default_temperature_band")]
    pub temperature_band_f: f64,
    /// Bridge temperature sensor used as the inside reading
    #[serde(default)]
    pub temperature_sensor: Option<String>,
    /// Rooms/zones whose annotated scenes follow the schedule routine
    #[serde(default)]
    pub scheduled_rooms: Vec<String>,
    #[serde(default)]
    pub buttons: Vec<ButtonBinding>,
    #[serde(default)]
    pub motion: Vec<MotionBinding>,
    #[serde(default = "default_weather_update_secs")]
    pub weather_update_secs: u64,
    #[serde(default = "default_schedule_update_secs")]
    pub schedule_update_secs: u64,
    #[serde(default = "default_event_poll_secs")]
    pub event_poll_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonBinding {
    pub room: String,
    /// Name of the switch device on the bridge
    pub device: String,
    /// Which button on the device (1-based control id)
    pub index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionBinding {
    pub room: String,
    /// Name of the motion sensor device on the bridge
    pub sensor: String,
    /// Seconds without motion before the lights turn off
    pub off_delay_secs: u64,
    /// Companion contact sensor; while it reports closed the countdown is held
    #[serde(default)]
    pub door_sensor: Option<String>,
}

fn default_timezone() -> String {
    "US/Eastern".to_string()
}

fn default_holiday_interval_hours() -> u64 {
    1
}

fn default_temperature_band() -> f64 {
    5.0
}

fn default_weather_update_secs() -> u64 {
    300
}

fn default_schedule_update_secs() -> u64 {
    60
}

fn default_event_poll_secs() -> u64 {
    2
}

impl Config {
    /// Load configuration from the XDG config directory.
    /// If the file doesn't exist, write a template and ask the user to fill
    /// in the bridge credentials (they cannot be defaulted).
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_dir().join("config.toml");
        if !config_path.exists() {
            Self::default().save()?;
            return Err(Error::ConfigValidation(format!(
                "No configuration found. A template was written to {}; fill in the bridge address and application key.",
                config_path.display()
            )));
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path).map_err(|e| {
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to read config file: {}", e),
            )
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            Error::ConfigSyntax(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the XDG config directory
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::get_config_dir();
        let config_path = config_dir.join("config.toml");

        fs::create_dir_all(&config_dir).map_err(|e| {
            Error::config_error(
                config_dir.display().to_string(),
                format!("Failed to create config directory: {}", e),
            )
        })?;

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to serialize config: {}", e),
            )
        })?;

        // Write to temporary file first, then rename for atomic operation
        let temp_path = config_dir.join(".config.toml.tmp");

        fs::write(&temp_path, &content).map_err(|e| {
            Error::config_error(
                temp_path.display().to_string(),
                format!("Failed to write temporary config file: {}", e),
            )
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::config_error(
                config_path.display().to_string(),
                format!("Failed to save config file: {}", e),
            )
        })?;

        Ok(())
    }

    /// Validate configuration for correctness
    pub fn validate(&self) -> Result<()> {
        if self.bridge_address.is_empty() {
            return Err(Error::ConfigValidation(
                "bridge_address must be set".to_string(),
            ));
        }
        if self.bridge_app_key.is_empty() {
            return Err(Error::ConfigValidation(
                "bridge_app_key must be set (pair with the bridge first)".to_string(),
            ));
        }

        self.parsed_timezone()?;

        for (name, value) in [
            ("weather_update_secs", self.weather_update_secs),
            ("schedule_update_secs", self.schedule_update_secs),
            ("event_poll_secs", self.event_poll_secs),
            ("holiday_interval_hours", self.holiday_interval_hours),
        ] {
            if value == 0 {
                return Err(Error::ConfigValidation(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.weather_zone.is_some() && self.weather_api_key.is_empty() {
            return Err(Error::ConfigValidation(
                "weather_zone is set but weather_api_key is empty".to_string(),
            ));
        }
        // the key alone enables sunset fetches, which also need the city
        if !self.weather_api_key.is_empty() && self.city.is_empty() {
            return Err(Error::ConfigValidation(
                "weather_api_key is set but city is empty".to_string(),
            ));
        }

        for room in &self.scheduled_rooms {
            if room.is_empty() {
                return Err(Error::ConfigValidation(
                    "scheduled_rooms contains an empty room name".to_string(),
                ));
            }
        }

        for (idx, binding) in self.buttons.iter().enumerate() {
            if binding.room.is_empty() || binding.device.is_empty() {
                return Err(Error::ConfigValidation(format!(
                    "Button binding #{}: room and device must be set",
                    idx + 1
                )));
            }
        }

        for (idx, binding) in self.motion.iter().enumerate() {
            if binding.room.is_empty() || binding.sensor.is_empty() {
                return Err(Error::ConfigValidation(format!(
                    "Motion binding #{}: room and sensor must be set",
                    idx + 1
                )));
            }
            if binding.off_delay_secs == 0 {
                return Err(Error::ConfigValidation(format!(
                    "Motion binding #{}: off_delay_secs must be greater than zero",
                    idx + 1
                )));
            }
        }

        Ok(())
    }

    /// The configured timezone as a chrono-tz timezone
    pub fn parsed_timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            Error::ConfigValidation(format!("Unknown timezone '{}'", self.timezone))
        })
    }

    /// Get the configuration directory using XDG config directory
    pub fn get_config_dir() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").expect("HOME environment variable not set");
                PathBuf::from(home).join(".config")
            });

        config_dir.join("hue-routines")
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bridge_address: String::new(),
            bridge_app_key: String::new(),
            timezone: default_timezone(),
            city: String::new(),
            weather_api_key: String::new(),
            weather_zone: None,
            holiday_zone: None,
            holiday_interval_hours: default_holiday_interval_hours(),
            temperature_band_f: default_temperature_band(),
            temperature_sensor: None,
            scheduled_rooms: Vec::new(),
            buttons: Vec::new(),
            motion: Vec::new(),
            weather_update_secs: default_weather_update_secs(),
            schedule_update_secs: default_schedule_update_secs(),
            event_poll_secs: default_event_poll_secs(),
        }
    }
}
