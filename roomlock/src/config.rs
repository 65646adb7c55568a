use std::env::{var, var_os};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use roomlock_gpio::keypad::{KeypadKey, KeypadLayout};
use crate::utils::parse_pin_list;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the password must contain at least one key")]
    EmptyPassword,
    #[error("'{0}' is not a key on the keypad")]
    InvalidKey(char),
    #[error("invalid pin list in {name}: {reason}")]
    InvalidPins { name: &'static str, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key arrangement as written in the config file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutConfig {
    Standard,
    #[default]
    Mirrored,
}

impl From<LayoutConfig> for KeypadLayout {
    fn from(layout: LayoutConfig) -> Self {
        match layout {
            LayoutConfig::Standard => KeypadLayout::Standard,
            LayoutConfig::Mirrored => KeypadLayout::Mirrored,
        }
    }
}

/// Behavior settings, stored as JSON next to the binary.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The passcode, one character per key.
    pub password: String,
    /// Minimum time between two accepted keys.
    pub debounce_ms: u64,
    /// How long the LED acknowledges a key press.
    pub keypress_feedback_ms: u64,
    /// How long the LED stays on after the right passcode.
    pub granted_feedback_ms: u64,
    /// Settle time before the rows are walked.
    pub settle_ms: u64,
    pub layout: LayoutConfig,
}

impl Config {
    pub fn path() -> PathBuf {
        let config_str = var_os("CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new("config.json"));
        PathBuf::from(config_str)
    }

    /// Loads the config from [Config::path]. Returns `Ok(None)` if the file does not exist.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        debug!("Reading config from {}", path.display());
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(Some(serde_json::from_reader(reader)?))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Parses the password into keys.
    pub fn secret(&self) -> Result<Vec<KeypadKey>, ConfigError> {
        if self.password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        self.password
            .chars()
            .map(|c| KeypadKey::from_char(c).ok_or(ConfigError::InvalidKey(c)))
            .collect()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn keypress_feedback(&self) -> Duration {
        Duration::from_millis(self.keypress_feedback_ms)
    }

    pub fn granted_feedback(&self) -> Duration {
        Duration::from_millis(self.granted_feedback_ms)
    }

    pub fn settle_time(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            password: "123A".to_string(),
            debounce_ms: 200,
            keypress_feedback_ms: 100,
            granted_feedback_ms: 4000,
            settle_ms: 2,
            layout: LayoutConfig::default(),
        }
    }
}

/// Wiring of the keypad and LED, taken from the environment (or `.env`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PinConfig {
    pub rows: [usize; 4],
    pub cols: [usize; 4],
    pub led: usize,
}

impl PinConfig {
    const ROWS_VAR: &'static str = "ROOMLOCK_KEYPAD_PINS_ROWS";
    const COLS_VAR: &'static str = "ROOMLOCK_KEYPAD_PINS_COLS";
    const LED_VAR: &'static str = "ROOMLOCK_LED_PIN";

    pub fn from_env() -> Result<Self, ConfigError> {
        let get = |name: &'static str, default: &str| -> Result<String, ConfigError> {
            match var(name) {
                Ok(value) => Ok(value),
                Err(std::env::VarError::NotPresent) => Ok(default.to_string()),
                Err(e) => Err(ConfigError::InvalidPins { name, reason: e.to_string() }),
            }
        };

        let pins = PinConfig {
            rows: parse_pin_list(&get(Self::ROWS_VAR, "5,6,13,19")?)
                .map_err(|reason| ConfigError::InvalidPins { name: Self::ROWS_VAR, reason })?,
            cols: parse_pin_list(&get(Self::COLS_VAR, "12,16,20,21")?)
                .map_err(|reason| ConfigError::InvalidPins { name: Self::COLS_VAR, reason })?,
            led: get(Self::LED_VAR, "26")?
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidPins { name: Self::LED_VAR, reason: e.to_string() })?,
        };
        pins.validate()?;
        Ok(pins)
    }

    /// Checks that no pin is used twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut all: Vec<usize> = self.rows.iter().chain(&self.cols).copied().collect();
        all.push(self.led);
        all.sort_unstable();
        if let Some(pair) = all.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::InvalidPins {
                name: "pin assignment",
                reason: format!("pin {} is used twice", pair[0]),
            });
        }
        Ok(())
    }
}
