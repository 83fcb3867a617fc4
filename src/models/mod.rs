use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceProtocol {
    Tuya,
}

impl DeviceProtocol {
    pub fn to_string(&self) -> String {
        match self {
            DeviceProtocol::Tuya => "tuya".to_string(),
        }
    }
}

/// Availability of a configured meter as seen by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceStatus {
    Online,
    Offline,
    Unsupported,
}

impl DeviceStatus {
    pub fn to_string(&self) -> String {
        match self {
            DeviceStatus::Online => "Online".to_string(),
            DeviceStatus::Offline => "Offline".to_string(),
            DeviceStatus::Unsupported => "Unsupported".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_names() {
        assert_eq!(DeviceProtocol::Tuya.to_string(), "tuya");
        assert_eq!(DeviceStatus::Unsupported.to_string(), "Unsupported");
    }
}
