//! Bridge for Tuya DIN rail power meters
//!
//! The vendor reports voltage, current, power, energy and relay state as
//! attributes of a single manufacturer specific cluster. This library decodes
//! those reports and exposes them through the standard Zigbee Electrical
//! Measurement, Metering and On/Off clusters, the binary forwards them to MQTT.

pub mod config;
pub mod models;
pub mod mqtt;
pub mod tuya;
pub mod zcl;

// Re-export common types for easier access
pub use config::{ConfigHolder, ConfigError};
pub use models::{DeviceProtocol, DeviceStatus};
pub use mqtt::{MqttManager, MeteringData, CALLBACKS};
pub use tuya::{TuyaManager, TuyaError};
pub use tuya::device::TuyaPowerMeter;

pub fn get_unix_ts() -> u64 {
    return std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
}

pub fn get_id(protocol: String, meter_name: &String) -> String {
    return format!("{}-{}-{:?}", protocol, meter_name, get_unix_ts());
}
