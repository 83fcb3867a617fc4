use crate::config::{Config, DeviceConfig};
use crate::models::DeviceStatus;
use crate::mqtt::ha_interface::HaDiscover;
use crate::mqtt::{MeteringData, PublishData, SubscribeData, Transmission};
use crate::zcl::clusters::*;
use crate::zcl::{AttributeListener, AttributeValue};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub mod attributes;
pub mod bus;
pub mod clusters;
pub mod device;
pub mod events;
pub mod manufacturer_cluster;

use bus::BusError;
use device::{TuyaPowerMeter, SIGNATURE};

#[derive(Error, Debug)]
pub enum TuyaError {
    #[error("Invalid report payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("Event delivery failed: {0}")]
    Bus(#[from] BusError),
    #[error("Transmission channel closed")]
    ChannelClosed,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPayload {
    pub attribute: u16,
    pub value: i64,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Payload {
    One(ReportPayload),
    Many(Vec<ReportPayload>),
}

pub fn parse_payload(payload: &str) -> Result<Vec<ReportPayload>, TuyaError> {
    Ok(match serde_json::from_str(payload)? {
        Payload::One(report) => vec![report],
        Payload::Many(reports) => reports,
    })
}

/// Standardized attributes making up the published state of a meter.
const STATE_ATTRIBUTES: [(u16, u16, &str); 5] = [
    (CLUSTER_ELECTRICAL_MEASUREMENT, electrical_measurement::RMS_VOLTAGE, "voltage"),
    (CLUSTER_ELECTRICAL_MEASUREMENT, electrical_measurement::RMS_CURRENT, "current"),
    (CLUSTER_ELECTRICAL_MEASUREMENT, electrical_measurement::ACTIVE_POWER, "power"),
    (CLUSTER_METERING, metering::CURRENT_SUMM_DELIVERED, "energy"),
    (CLUSTER_ON_OFF, on_off::ON_OFF, "switch"),
];

/// Name of a standardized attribute in published metering data.
pub fn json_key(cluster_id: u16, attr_id: u16) -> Option<&'static str> {
    STATE_ATTRIBUTES.iter()
        .find(|(c, a, _)| *c == cluster_id && *a == attr_id)
        .map(|(_, _, key)| *key)
}

/// Every state attribute the meter has a value for.
pub fn state_snapshot(device: &TuyaPowerMeter) -> serde_json::Map<String, serde_json::Value> {
    STATE_ATTRIBUTES.iter()
        .filter_map(|(c, a, key)| device.read_attribute(*c, *a).map(|v| (key.to_string(), v.to_json())))
        .collect()
}

/// Collects attribute change notifications until they are published.
#[derive(Default)]
pub struct ChangeCollector {
    changes: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl ChangeCollector {
    pub fn take(&self) -> serde_json::Map<String, serde_json::Value> {
        match self.changes.lock() {
            Ok(mut changes) => std::mem::take(&mut *changes),
            Err(_) => serde_json::Map::new(),
        }
    }
}

impl AttributeListener for ChangeCollector {
    fn attribute_updated(&self, cluster_id: u16, attr_id: u16, value: &AttributeValue) {
        let Some(key) = json_key(cluster_id, attr_id) else {
            debug!("No key for cluster 0x{cluster_id:04X} attribute 0x{attr_id:04X}");
            return;
        };
        if let Ok(mut changes) = self.changes.lock() {
            changes.insert(key.to_string(), value.to_json());
        }
    }
}

/// Feeds one MQTT payload into the device. If any standardized value changed,
/// returns the full state of the meter.
pub fn process_payload(device: &TuyaPowerMeter, collector: &ChangeCollector, payload: &str) -> Result<Option<MeteringData>, TuyaError> {
    for report in parse_payload(payload)? {
        device.handle_report(report.attribute, report.value)?;
    }

    let changes = collector.take();
    if changes.is_empty() {
        return Ok(None);
    }
    debug!("{}: changed {:?}", device.name(), changes.keys().collect::<Vec<_>>());

    let mut data = MeteringData::new(device.name(), state_snapshot(device));
    if let Some(reported) = device.manufacturer_cluster().last_report() {
        data.metered_time = reported.timestamp().max(0) as u64;
    }
    Ok(Some(data))
}

pub struct TuyaManager {
    sender: Sender<Transmission>,
    config: Config,
}

impl TuyaManager {
    pub fn new(sender: Sender<Transmission>, config: Config) -> Self {
        Self { sender, config }
    }

    /// Configured devices with their initial status, unknown models are unsupported.
    pub fn device_statuses(&self) -> Vec<(DeviceConfig, DeviceStatus)> {
        self.config.devices.iter()
            .map(|d| {
                let status = if SIGNATURE.matches_model(&d.manufacturer, &d.model) {
                    DeviceStatus::Offline
                } else {
                    DeviceStatus::Unsupported
                };
                (d.clone(), status)
            })
            .collect()
    }

    pub async fn start_thread(&mut self) {
        info!("Starting Tuya thread");
        let mut threads: Vec<JoinHandle<()>> = Vec::new();

        for (device, status) in self.device_statuses() {
            if status == DeviceStatus::Unsupported {
                warn!("Device {} ({}/{}) does not match the DIN power meter signature, skipping",
                      device.name, device.manufacturer, device.model);
                continue;
            }

            let sender = self.sender.clone();
            let base_topic = self.config.mqtt.base_topic.clone();
            let ha_enabled = self.config.mqtt.ha_enabled;
            threads.push(tokio::spawn(async move {
                if let Err(e) = run_device(device, sender, base_topic, ha_enabled).await {
                    error!("Tuya device thread stopped: {e}");
                }
            }));
        }

        if threads.is_empty() {
            warn!("No supported Tuya devices configured");
        }

        for thread in threads {
            let _ = thread.await;
        }
        info!("Tuya thread exits");
    }
}

async fn publish_status(sender: &Sender<Transmission>, base_topic: &str, name: &str, status: DeviceStatus) -> Result<(), TuyaError> {
    let publish = PublishData {
        topic: format!("{base_topic}/devs/{name}/status"),
        payload: status.to_string(),
        qos: 1,
        retain: true,
    };
    sender.send(Transmission::Publish(publish)).await.map_err(|_| TuyaError::ChannelClosed)
}

pub async fn run_device(device: DeviceConfig, sender: Sender<Transmission>, base_topic: String, ha_enabled: bool) -> Result<(), TuyaError> {
    let collector = Arc::new(ChangeCollector::default());
    let meter = TuyaPowerMeter::new(&device.name, Some(collector.clone()))?;

    let (tx, mut receiver) = tokio::sync::mpsc::channel(10);
    let register = Transmission::Subscribe(SubscribeData {
        topic: format!("{}/report", device.name),
        sender: tx,
    });
    sender.send(register).await.map_err(|_| TuyaError::ChannelClosed)?;

    if ha_enabled {
        let disc = HaDiscover::power_meter(&device.name, &device.manufacturer, &device.model, &base_topic);
        sender.send(Transmission::AutoDiscovery(disc)).await.map_err(|_| TuyaError::ChannelClosed)?;
    }
    publish_status(&sender, &base_topic, &device.name, DeviceStatus::Offline).await?;

    info!("Waiting for reports of {}", device.name);
    let mut online = false;
    while let Some(payload) = receiver.recv().await {
        match process_payload(&meter, &collector, &payload) {
            Ok(Some(data)) => {
                sender.send(Transmission::Metering(data)).await.map_err(|_| TuyaError::ChannelClosed)?;
            }
            Ok(None) => debug!("Report for {} changed no standardized value", device.name),
            Err(e) => {
                error!("Unable to handle report for {}: {e}", device.name);
                continue;
            }
        }

        if !online {
            online = true;
            publish_status(&sender, &base_topic, &device.name, DeviceStatus::Online).await?;
        }
    }

    Ok(())
}
