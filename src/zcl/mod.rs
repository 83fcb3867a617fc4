use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

pub mod clusters;

/// A single attribute value as held in a local cluster cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::UInt(u) => Some(*u as f64),
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttributeValue::Bool(b) => (*b).into(),
            AttributeValue::UInt(u) => (*u).into(),
            AttributeValue::Int(i) => (*i).into(),
            AttributeValue::Float(f) => (*f).into(),
        }
    }
}

/// Receives the "attribute changed" notification of a cluster.
///
/// This is the egress seam towards whatever reports the standardized values
/// further (attribute reporting, MQTT, a test recorder, ...).
pub trait AttributeListener: Send + Sync {
    fn attribute_updated(&self, cluster_id: u16, attr_id: u16, value: &AttributeValue);
}

/// A stored attribute change whose listener has not been told yet.
///
/// Send it once the lock around the cluster cache is released, so the listener
/// can read the cluster it is notified about.
#[must_use]
pub struct PendingNotification {
    listener: Arc<dyn AttributeListener>,
    cluster_id: u16,
    attr_id: u16,
    value: AttributeValue,
}

impl PendingNotification {
    pub fn notify(self) {
        self.listener.attribute_updated(self.cluster_id, self.attr_id, &self.value);
    }
}

/// Attribute cache of a cluster whose values are fed locally instead of being
/// read from the device.
pub struct LocalDataCluster {
    cluster_id: u16,
    attributes: HashMap<u16, AttributeValue>,
    constants: HashMap<u16, AttributeValue>,
    listener: Option<Arc<dyn AttributeListener>>,
}

impl LocalDataCluster {
    pub fn new(cluster_id: u16, listener: Option<Arc<dyn AttributeListener>>) -> Self {
        LocalDataCluster {
            cluster_id,
            attributes: HashMap::new(),
            constants: HashMap::new(),
            listener,
        }
    }

    /// Declares an attribute that is always reported with the same value.
    pub fn with_constant(mut self, attr_id: u16, value: AttributeValue) -> Self {
        self.constants.insert(attr_id, value);
        self
    }

    /// Stores the value and returns the notification for this attribute only.
    /// Constant attributes are left untouched and nobody is notified.
    pub fn update_attribute(&mut self, attr_id: u16, value: AttributeValue) -> Option<PendingNotification> {
        if self.constants.contains_key(&attr_id) {
            debug!("Cluster 0x{:04X} attribute 0x{:04X} is constant, ignoring {:?}", self.cluster_id, attr_id, value);
            return None;
        }

        debug!("Cluster 0x{:04X} attribute 0x{:04X} <- {:?}", self.cluster_id, attr_id, value);
        self.attributes.insert(attr_id, value.clone());
        let listener = self.listener.clone()?;
        Some(PendingNotification { listener, cluster_id: self.cluster_id, attr_id, value })
    }

    /// Constants win over cached values, they cannot be overwritten by updates.
    pub fn read_attribute(&self, attr_id: u16) -> Option<AttributeValue> {
        self.constants.get(&attr_id)
            .or_else(|| self.attributes.get(&attr_id))
            .cloned()
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every attribute notification in order.
    #[derive(Default)]
    pub struct RecordingListener {
        pub updates: Mutex<Vec<(u16, u16, AttributeValue)>>,
    }

    impl AttributeListener for RecordingListener {
        fn attribute_updated(&self, cluster_id: u16, attr_id: u16, value: &AttributeValue) {
            self.updates.lock().unwrap().push((cluster_id, attr_id, value.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingListener;
    use super::*;

    #[test]
    fn test_update_and_read() {
        let listener = Arc::new(RecordingListener::default());
        let mut cluster = LocalDataCluster::new(0x0B04, Some(listener.clone()));

        assert_eq!(cluster.read_attribute(0x0505), None);
        let pending = cluster.update_attribute(0x0505, AttributeValue::Float(230.1)).unwrap();

        // stored before anyone is told
        assert_eq!(cluster.read_attribute(0x0505), Some(AttributeValue::Float(230.1)));
        assert!(listener.updates.lock().unwrap().is_empty());

        pending.notify();
        let updates = listener.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0], (0x0B04, 0x0505, AttributeValue::Float(230.1)));
    }

    #[test]
    fn test_update_without_listener() {
        let mut cluster = LocalDataCluster::new(0xEF00, None);
        assert!(cluster.update_attribute(0x0211, AttributeValue::Int(250)).is_none());
        assert_eq!(cluster.read_attribute(0x0211), Some(AttributeValue::Int(250)));
    }

    #[test]
    fn test_constant_attribute() {
        let listener = Arc::new(RecordingListener::default());
        let mut cluster = LocalDataCluster::new(0x0702, Some(listener.clone()))
            .with_constant(0x0300, AttributeValue::UInt(0));

        assert!(cluster.update_attribute(0x0300, AttributeValue::UInt(5)).is_none());
        assert_eq!(cluster.read_attribute(0x0300), Some(AttributeValue::UInt(0)));
        assert!(listener.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(AttributeValue::Int(-3).as_f64(), Some(-3.0));
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
        assert_eq!(AttributeValue::Bool(true).as_bool(), Some(true));
        assert_eq!(AttributeValue::Float(1.5).to_json(), serde_json::json!(1.5));
    }
}
