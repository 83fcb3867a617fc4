use log::{debug, info};
use std::sync::Arc;

use super::bus::{Bus, BusError, Delivery};
use super::clusters::{TuyaMetering, TuyaOnOff, TuyaPowerMeasurement};
use super::events::{ElectricalBus, EnergyBus, SwitchBus};
use super::manufacturer_cluster::TuyaDinPowerCluster;
use crate::zcl::clusters::*;
use crate::zcl::{AttributeListener, AttributeValue};

/// Simple descriptor of one endpoint as advertised by (or replaced on) a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_type: u16,
    pub input_clusters: Vec<u16>,
    pub output_clusters: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDeclaration {
    pub endpoint: u8,
    pub profile_id: u16,
    pub device_type: u16,
    pub input_clusters: &'static [u16],
    pub output_clusters: &'static [u16],
}

impl EndpointDeclaration {
    /// Cluster lists are compared as sets, the order on the wire is not stable.
    pub fn matches(&self, descriptor: &EndpointDescriptor) -> bool {
        let same = |declared: &[u16], advertised: &[u16]| {
            declared.len() == advertised.len() && declared.iter().all(|c| advertised.contains(c))
        };

        self.endpoint == descriptor.endpoint
            && self.profile_id == descriptor.profile_id
            && self.device_type == descriptor.device_type
            && same(self.input_clusters, &descriptor.input_clusters)
            && same(self.output_clusters, &descriptor.output_clusters)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignature {
    pub models_info: &'static [(&'static str, &'static str)],
    pub endpoints: &'static [EndpointDeclaration],
}

impl DeviceSignature {
    pub fn matches_model(&self, manufacturer: &str, model: &str) -> bool {
        self.models_info.iter().any(|(m, md)| *m == manufacturer && *md == model)
    }

    pub fn matches(&self, manufacturer: &str, model: &str, endpoints: &[EndpointDescriptor]) -> bool {
        self.matches_model(manufacturer, model)
            && self.endpoints.len() == endpoints.len()
            && self.endpoints.iter().all(|decl| endpoints.iter().any(|ep| decl.matches(ep)))
    }
}

pub const SIGNATURE: DeviceSignature = DeviceSignature {
    models_info: &[("_TZE200_byzdayie", "TS0601")],
    endpoints: &[EndpointDeclaration {
        endpoint: 1,
        profile_id: PROFILE_ZHA,
        device_type: DEVICE_TYPE_SMART_PLUG,
        input_clusters: &[CLUSTER_BASIC, CLUSTER_GROUPS, CLUSTER_SCENES, CLUSTER_TUYA_MANUFACTURER],
        output_clusters: &[CLUSTER_TIME, CLUSTER_OTA],
    }],
};

/// Clusters exposed in place of the ones the device advertises.
pub const REPLACEMENT: &[EndpointDeclaration] = &[EndpointDeclaration {
    endpoint: 1,
    profile_id: PROFILE_ZHA,
    device_type: DEVICE_TYPE_SMART_PLUG,
    input_clusters: &[
        CLUSTER_BASIC,
        CLUSTER_GROUPS,
        CLUSTER_SCENES,
        CLUSTER_TUYA_MANUFACTURER,
        CLUSTER_ELECTRICAL_MEASUREMENT,
        CLUSTER_METERING,
        CLUSTER_ON_OFF,
    ],
    output_clusters: &[CLUSTER_TIME, CLUSTER_OTA],
}];

/// One Tuya DIN power meter with its own buses and clusters.
pub struct TuyaPowerMeter {
    name: String,
    switch_bus: Arc<SwitchBus>,
    energy_bus: Arc<EnergyBus>,
    electrical_bus: Arc<ElectricalBus>,
    manufacturer: TuyaDinPowerCluster,
    power_measurement: Arc<TuyaPowerMeasurement>,
    metering: Arc<TuyaMetering>,
    on_off: Arc<TuyaOnOff>,
}

impl TuyaPowerMeter {
    pub fn new(name: &str, listener: Option<Arc<dyn AttributeListener>>) -> Result<Self, BusError> {
        let switch_bus: Arc<SwitchBus> = Arc::new(Bus::new("switch"));
        let energy_bus: Arc<EnergyBus> = Arc::new(Bus::new("energy"));
        let electrical_bus: Arc<ElectricalBus> = Arc::new(Bus::new("electrical"));

        let manufacturer = TuyaDinPowerCluster::new(switch_bus.clone(), energy_bus.clone(), electrical_bus.clone());
        let power_measurement = TuyaPowerMeasurement::new(&electrical_bus, listener.clone())?;
        let metering = TuyaMetering::new(&energy_bus, listener.clone())?;
        let on_off = TuyaOnOff::new(&switch_bus, listener)?;

        info!("Created Tuya power meter {name}");
        Ok(TuyaPowerMeter {
            name: name.to_string(),
            switch_bus,
            energy_bus,
            electrical_bus,
            manufacturer,
            power_measurement,
            metering,
            on_off,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry point for attribute reports of the manufacturer cluster.
    pub fn handle_report(&self, attr_id: u16, value: i64) -> Result<Option<Delivery>, BusError> {
        debug!("{}: report 0x{:04X} = {}", self.name, attr_id, value);
        self.manufacturer.on_report(attr_id, value)
    }

    pub fn manufacturer_cluster(&self) -> &TuyaDinPowerCluster {
        &self.manufacturer
    }

    pub fn power_measurement(&self) -> &TuyaPowerMeasurement {
        &self.power_measurement
    }

    pub fn metering(&self) -> &TuyaMetering {
        &self.metering
    }

    pub fn on_off(&self) -> &TuyaOnOff {
        &self.on_off
    }

    pub fn listener_counts(&self) -> (usize, usize, usize) {
        (
            self.switch_bus.listener_count(),
            self.energy_bus.listener_count(),
            self.electrical_bus.listener_count(),
        )
    }

    /// Generic read path over all clusters of endpoint 1.
    pub fn read_attribute(&self, cluster_id: u16, attr_id: u16) -> Option<AttributeValue> {
        match cluster_id {
            CLUSTER_ELECTRICAL_MEASUREMENT => self.power_measurement.read_attribute(attr_id),
            CLUSTER_METERING => self.metering.read_attribute(attr_id),
            CLUSTER_ON_OFF => self.on_off.read_attribute(attr_id),
            CLUSTER_TUYA_MANUFACTURER => self.manufacturer.raw_value(attr_id).map(AttributeValue::Int),
            _ => None,
        }
    }
}
