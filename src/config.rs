use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;
use std::{fs::File, io::ErrorKind, time::Duration};

/// Cities the weather screen pages through, in order
pub const CITIES: [&str; 5] = [
    "Kecskemét",
    "Balassagyarmat",
    "Salgótarján",
    "Nógrádsipek",
    "Budapest",
];

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub wifi: Credentials,
    /// Scheme and host of the weather API, without a trailing slash
    pub api_host: String,
    pub api_token: String,
    pub http_timeout_secs: u64,
    /// Network interface managed by the WiFi screens
    pub wifi_interface: String,
    /// I2C bus the OLED is attached to
    pub i2c_port: String,
    /// BCM number of the Settings (screen cycle) button
    pub settings_pin: u64,
    /// BCM number of the Set (OK) button
    pub set_pin: u64,
    pub loop_interval_ms: u64,
}

/// WiFi network to join
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from `./config.json`. Any field missing from the file
    /// takes its built-in default. If the file doesn't exist at all, the
    /// built-in defaults are used as-is.
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = match File::open(Self::PATH) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", Self::PATH);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Error opening config file {}",
                    Self::PATH
                ))
            }
        };
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi: Credentials::default(),
            api_host: "https://api.openweathermap.org".into(),
            api_token: String::new(),
            http_timeout_secs: 15,
            wifi_interface: "wlan0".into(),
            i2c_port: "/dev/i2c-1".into(),
            settings_pin: 5,
            set_pin: 6,
            loop_interval_ms: 10,
        }
    }
}
