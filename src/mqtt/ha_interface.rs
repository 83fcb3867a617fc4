use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct HaDevice {
    ids: String,
    name: String,
    manufacturer: String,
    model: String,
}

#[derive(Serialize)]
pub struct HaOrigin {
    pub name: String,
    pub sw_version: String,
}

fn is_none_str(value: &String) -> bool {
    value.is_empty() || value == "NONE"
}

#[derive(Serialize, PartialEq, Deserialize, Clone, Copy, Default, Debug)]
pub enum HAPlatform {
    #[default]
    Sensor,
    BinarySensor,
}

impl HAPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            HAPlatform::Sensor => "sensor",
            HAPlatform::BinarySensor => "binary_sensor",
        }
    }
}

#[derive(Serialize)]
pub struct HaComponent {
    pub p: String,
    pub name: String,
    #[serde(skip_serializing_if = "is_none_str")]
    pub device_class: String,
    #[serde(skip_serializing_if = "is_none_str")]
    pub unit_of_measurement: String,
    pub value_template: String,
    pub unique_id: String,
    pub object_id: String,
    #[serde(skip_serializing_if = "is_none_str")]
    pub state_class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<bool>,
}

impl HaComponent {
    pub fn new(platform: HAPlatform, device: &str, dclass: &str, uof: &str, json_key: &str, state_class: &str) -> Self {
        let (p_on, p_off) = match platform {
            HAPlatform::BinarySensor => (Some(true), Some(false)),
            HAPlatform::Sensor => (None, None),
        };

        HaComponent {
            p: platform.as_str().to_string(),
            name: json_key.to_string(),
            device_class: dclass.to_string(),
            unit_of_measurement: uof.to_string(),
            value_template: format!("{{{{ value_json.{json_key} }}}}"),
            unique_id: format!("t2m_tuya_{device}_{json_key}").to_lowercase(),
            object_id: format!("{device}_{json_key}").to_lowercase(),
            state_class: state_class.to_string(),
            payload_on: p_on,
            payload_off: p_off,
        }
    }
}

#[derive(Serialize)]
pub struct HaDiscover {
    pub dev: HaDevice,
    pub o: HaOrigin,
    pub cmps: serde_json::Map<String, serde_json::Value>,
    pub state_topic: String,
    pub qos: u32,
    #[serde(skip_serializing)]
    pub discover_topic: String,
}

impl HaDiscover {
    pub fn new(name: &str, manu: &str, model: &str, base_topic: &str) -> Self {
        HaDiscover {
            discover_topic: format!("homeassistant/device/t2m_{name}/config"),
            dev: HaDevice {
                ids: format!("t2m_tuya_{name}"),
                name: name.to_string(),
                manufacturer: manu.to_string(),
                model: model.to_string(),
            },
            o: HaOrigin {
                name: "tuya2mqtt".to_string(),
                sw_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            cmps: serde_json::Map::new(),
            state_topic: format!("{base_topic}/devs/{name}"),
            qos: 1,
        }
    }

    /// Discovery for a DIN power meter: voltage, current, power, energy and relay state.
    pub fn power_meter(name: &str, manu: &str, model: &str, base_topic: &str) -> Self {
        let mut disc = HaDiscover::new(name, manu, model, base_topic);
        disc.add(HaComponent::new(HAPlatform::Sensor, name, "voltage", "V", "voltage", "measurement"));
        disc.add(HaComponent::new(HAPlatform::Sensor, name, "current", "A", "current", "measurement"));
        disc.add(HaComponent::new(HAPlatform::Sensor, name, "power", "W", "power", "measurement"));
        disc.add(HaComponent::new(HAPlatform::Sensor, name, "energy", "kWh", "energy", "total_increasing"));
        disc.add(HaComponent::new(HAPlatform::BinarySensor, name, "power", "NONE", "switch", "NONE"));
        disc
    }

    pub fn add(&mut self, component: HaComponent) {
        let key = component.name.clone();
        if let Ok(value) = serde_json::to_value(component) {
            self.cmps.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_meter_discovery() {
        let disc = HaDiscover::power_meter("Garage", "_TZE200_byzdayie", "TS0601", "tuya2mqtt");

        assert_eq!(disc.discover_topic, "homeassistant/device/t2m_Garage/config");
        assert_eq!(disc.state_topic, "tuya2mqtt/devs/Garage");
        assert_eq!(disc.dev.ids, "t2m_tuya_Garage");
        assert_eq!(disc.cmps.len(), 5);

        let energy = &disc.cmps["energy"];
        assert_eq!(energy["unit_of_measurement"], "kWh");
        assert_eq!(energy["state_class"], "total_increasing");
        assert_eq!(energy["value_template"], "{{ value_json.energy }}");
        assert_eq!(energy["unique_id"], "t2m_tuya_garage_energy");
    }

    #[test]
    fn test_binary_sensor_skips_none_fields() {
        let comp = HaComponent::new(HAPlatform::BinarySensor, "din", "power", "NONE", "switch", "NONE");
        let json = serde_json::to_value(&comp).unwrap();

        assert_eq!(json["p"], "binary_sensor");
        assert_eq!(json["payload_on"], true);
        assert!(json.get("unit_of_measurement").is_none());
        assert!(json.get("state_class").is_none());
    }

    #[test]
    fn test_discovery_serialization_hides_topic() {
        let disc = HaDiscover::new("din", "m", "x", "base");
        let json = serde_json::to_value(&disc).unwrap();
        assert!(json.get("discover_topic").is_none());
        assert_eq!(json["o"]["name"], "tuya2mqtt");
    }
}
