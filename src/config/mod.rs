use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yml;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read the config on config/t2m.yaml or t2m.yaml")]
    NotFound,
    #[error("Unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse config file: {0}")]
    Parse(#[from] serde_yml::Error),
}

fn mqtt_port_default() -> u16 { return 1883 }
fn mqtt_client_name_default() -> String { return "tuya2mqtt".to_string() }
fn mqtt_ha_enabled_default() -> bool { return true }
fn mqtt_base_topic_default() -> String { return "tuya2mqtt".to_string() }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default="mqtt_port_default")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default="mqtt_ha_enabled_default")]
    pub ha_enabled: bool,
    #[serde(default="mqtt_client_name_default")]
    pub client_name: String,
    #[serde(default="mqtt_base_topic_default")]
    pub base_topic: String,
}

fn device_manufacturer_default() -> String { return "_TZE200_byzdayie".to_string() }
fn device_model_default() -> String { return "TS0601".to_string() }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default="device_manufacturer_default")]
    pub manufacturer: String,
    #[serde(default="device_model_default")]
    pub model: String,
}

fn devices_default() -> Vec<DeviceConfig> { return Vec::new() }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default="devices_default")]
    pub devices: Vec<DeviceConfig>,
}

pub struct ConfigHolder {
    pub config: Config,
}

impl ConfigHolder {
    /// Looks for `config/t2m.yaml` first and falls back to `t2m.yaml`.
    pub fn load() -> Result<Self, ConfigError> {
        for path in ["config/t2m.yaml", "t2m.yaml"] {
            if Path::new(path).exists() {
                info!("Loading configuration from {path}");
                let config = Self::load_file(path)?;
                return Ok(ConfigHolder { config });
            }
        }
        Err(ConfigError::NotFound)
    }

    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Config, ConfigError> {
        let c: Config = serde_yml::from_str(contents)?;
        debug!("Configuration has {} device(s)", c.devices.len());
        Ok(c)
    }

    pub fn get_complete_config(&self) -> Config {
        return self.config.clone();
    }
}
