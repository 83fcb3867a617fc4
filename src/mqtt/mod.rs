pub mod ha_interface;

use std::collections::HashMap;
use lazy_static::lazy_static;
use tokio::sync::RwLock;
use crate::config::MqttConfig;
use crate::models::DeviceProtocol;
use crate::mqtt::ha_interface::HaDiscover;
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{Receiver, Sender};
use serde::{Serialize, Deserialize};
use serde_json;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum TranmissionValueType {
    Now,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MeteringData {
    pub id: String,
    pub meter_name: String,
    pub protocol: DeviceProtocol,
    pub transmission_time: u64,
    pub transmission_type: TranmissionValueType,
    pub metered_time: u64,
    pub metered_values: serde_json::Map<String, serde_json::Value>,
}

impl MeteringData {
    pub fn new(meter_name: &str, metered_values: serde_json::Map<String, serde_json::Value>) -> Self {
        let now = crate::get_unix_ts();
        MeteringData {
            id: crate::get_id(DeviceProtocol::Tuya.to_string(), &meter_name.to_string()),
            meter_name: meter_name.to_string(),
            protocol: DeviceProtocol::Tuya,
            transmission_time: now,
            transmission_type: TranmissionValueType::Now,
            metered_time: now,
            metered_values,
        }
    }
}

pub struct PublishData {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

pub struct SubscribeData {
    pub topic: String,
    pub sender: Sender<String>,
}

pub enum Transmission {
    Metering(MeteringData),
    AutoDiscovery(HaDiscover),
    Subscribe(SubscribeData),
    Publish(PublishData),
}

pub struct Callbacks {
    calls: HashMap<String, Vec<Sender<String>>>,
}

impl Callbacks {
    pub fn new() -> Self {
        return Callbacks { calls: HashMap::new() };
    }

    pub fn insert(&mut self, topic: String, callback: Sender<String>) {
        debug!("Adding callback to topic {topic}");
        self.calls.entry(topic).or_default().push(callback);
    }

    pub async fn send(&self, topic: &str, payload: String) {
        let Some(v) = self.calls.get(topic) else {
            debug!("Send for unknown topic {topic}");
            return;
        };

        for call in v {
            debug!("Sending to callback: {payload}");
            if let Err(e) = call.send(payload.clone()).await {
                warn!("Callback for {topic} is gone: {e}");
            }
        }
    }

    pub fn get_topics(&self) -> Vec<String> {
        return self.calls.keys().cloned().collect();
    }
}

lazy_static! {
    pub static ref CALLBACKS: RwLock<Callbacks> = RwLock::new(Callbacks::new());
}

fn to_qos(qos: u8) -> QoS {
    match qos {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

pub struct MqttManager {
    rx: Receiver<Transmission>,
    client: AsyncClient,
    base_topic: String,
}

impl MqttManager {
    pub fn new(config: &MqttConfig) -> (Self, Sender<Transmission>) {
        let (mtx, mrx) = tokio::sync::mpsc::channel(100);

        info!("MQTT connection starting up");
        let mut mqttoptions = MqttOptions::new(config.client_name.clone(), config.host.clone(), config.port);
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        if !config.user.is_empty() {
            mqttoptions.set_credentials(config.user.clone(), config.pass.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);

        // Incoming publishes are routed to the registered callbacks
        let reconnect_c = client.clone();
        tokio::spawn(async move {
            info!("MQTT Eventloop started");
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(p))) => {
                        let payload = String::from_utf8_lossy(&p.payload).to_string();
                        debug!("Received MQTT message on {}: {payload:?}", p.topic);
                        CALLBACKS.read().await.send(&p.topic, payload).await;
                    },
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected, resubscribing everything");
                        let topics = CALLBACKS.read().await.get_topics();
                        for topic in topics {
                            if let Err(e) = reconnect_c.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                                error!("Resubscribing {topic} failed: {e}");
                            }
                        }
                    },
                    Ok(_) => {},
                    Err(e) => {
                        error!("Error in MQTT {:?}, reconnecting ", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        return (MqttManager {
            client,
            rx: mrx,
            base_topic: config.base_topic.clone(),
        }, mtx);
    }

    pub async fn start_thread(&mut self) {
        while let Some(transmission) = self.rx.recv().await {
            match transmission {
                Transmission::Metering(data) => {
                    info!("Metering data received: {}", data.id);
                    let topic = format!("{}/devs/{}", self.base_topic, data.meter_name);
                    match serde_json::to_string(&data.metered_values) {
                        Ok(payload) => {
                            if let Err(e) = self.client.publish(topic, QoS::AtLeastOnce, false, payload).await {
                                error!("Error sending: {}", e);
                            }
                        },
                        Err(e) => error!("Unable to serialize metering data: {e}"),
                    }
                },
                Transmission::AutoDiscovery(disc) => {
                    match serde_json::to_string(&disc) {
                        Ok(payload) => {
                            let _ = self.client.publish(disc.discover_topic.clone(), QoS::AtLeastOnce, true, payload).await;
                        },
                        Err(e) => error!("Unable to serialize discovery: {e}"),
                    }
                },
                Transmission::Subscribe(subscribe_data) => {
                    let topic = format!("{}/{}", self.base_topic, subscribe_data.topic);
                    match self.client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                        Ok(_) => {
                            CALLBACKS.write().await.insert(topic.clone(), subscribe_data.sender);
                            info!("Registered Callback {topic}");
                        },
                        Err(e) => error!("Subscribing {topic} failed: {e}"),
                    }
                },
                Transmission::Publish(publish_data) => {
                    match self.client.publish(
                        publish_data.topic,
                        to_qos(publish_data.qos),
                        publish_data.retain,
                        publish_data.payload
                    ).await {
                        Err(e) => { error!("Error publishing: {}", e); },
                        Ok(_) => { debug!("Published successfully"); }
                    }
                },
            };
        }

        info!("Transmission channel closed, MQTT thread exits");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_callbacks_route_by_topic() {
        let mut callbacks = Callbacks::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let (other_tx, mut other_rx) = tokio::sync::mpsc::channel(4);
        callbacks.insert("tuya2mqtt/a/report".to_string(), tx);
        callbacks.insert("tuya2mqtt/b/report".to_string(), other_tx);

        callbacks.send("tuya2mqtt/a/report", "hello".to_string()).await;
        callbacks.send("tuya2mqtt/unknown", "lost".to_string()).await;

        assert_eq!(rx.recv().await.unwrap(), "hello");
        assert!(other_rx.try_recv().is_err());

        let mut topics = callbacks.get_topics();
        topics.sort();
        assert_eq!(topics, vec!["tuya2mqtt/a/report", "tuya2mqtt/b/report"]);
    }

    #[test]
    fn test_metering_data() {
        let mut values = serde_json::Map::new();
        values.insert("power".to_string(), 123.4.into());
        let data = MeteringData::new("din", values);

        assert_eq!(data.protocol, DeviceProtocol::Tuya);
        assert_eq!(data.meter_name, "din");
        assert!(data.id.starts_with("tuya-din-"));
        assert_eq!(data.metered_values["power"], serde_json::json!(123.4));
    }

    #[test]
    fn test_to_qos() {
        assert_eq!(to_qos(1), QoS::AtLeastOnce);
        assert_eq!(to_qos(2), QoS::ExactlyOnce);
        assert_eq!(to_qos(9), QoS::AtMostOnce);
    }
}
