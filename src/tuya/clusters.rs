use std::sync::{Arc, Mutex};

use super::bus::{BusError, Listener};
use super::events::{
    ElectricalBus, ElectricalEvent, EnergyBus, EnergyEvent, SwitchBus, SwitchEvent, CURRENT_REPORTED, ENERGY_REPORTED,
    POWER_REPORTED, SWITCH_EVENT, VOLTAGE_REPORTED,
};
use crate::zcl::clusters::{
    electrical_measurement, metering, on_off, CLUSTER_ELECTRICAL_MEASUREMENT, CLUSTER_METERING, CLUSTER_ON_OFF,
};
use crate::zcl::{AttributeListener, AttributeValue, LocalDataCluster};

fn update(cache: &Mutex<LocalDataCluster>, attr_id: u16, value: AttributeValue) -> Result<(), BusError> {
    let pending = cache.lock()
        .map_err(|_| BusError::Poisoned)?
        .update_attribute(attr_id, value);
    if let Some(pending) = pending {
        pending.notify();
    }
    Ok(())
}

fn read(cache: &Mutex<LocalDataCluster>, attr_id: u16) -> Option<AttributeValue> {
    cache.lock().ok()?.read_attribute(attr_id)
}

/// Electrical Measurement cluster fed from the electrical bus.
pub struct TuyaPowerMeasurement {
    cache: Mutex<LocalDataCluster>,
}

impl TuyaPowerMeasurement {
    pub fn new(bus: &ElectricalBus, listener: Option<Arc<dyn AttributeListener>>) -> Result<Arc<Self>, BusError> {
        let cluster = Arc::new(TuyaPowerMeasurement {
            cache: Mutex::new(LocalDataCluster::new(CLUSTER_ELECTRICAL_MEASUREMENT, listener)),
        });
        bus.subscribe(cluster.clone())?;
        Ok(cluster)
    }

    pub fn read_attribute(&self, attr_id: u16) -> Option<AttributeValue> {
        read(&self.cache, attr_id)
    }

    pub fn rms_voltage(&self) -> Option<f64> {
        self.read_attribute(electrical_measurement::RMS_VOLTAGE)?.as_f64()
    }

    pub fn rms_current(&self) -> Option<f64> {
        self.read_attribute(electrical_measurement::RMS_CURRENT)?.as_f64()
    }

    pub fn active_power(&self) -> Option<f64> {
        self.read_attribute(electrical_measurement::ACTIVE_POWER)?.as_f64()
    }
}

impl Listener<ElectricalEvent> for TuyaPowerMeasurement {
    fn events(&self) -> &'static [&'static str] {
        &[VOLTAGE_REPORTED, CURRENT_REPORTED, POWER_REPORTED]
    }

    fn on_event(&self, event: &ElectricalEvent) -> Result<(), BusError> {
        let (attr_id, value) = match *event {
            ElectricalEvent::VoltageReported(v) => (electrical_measurement::RMS_VOLTAGE, v),
            ElectricalEvent::CurrentReported(v) => (electrical_measurement::RMS_CURRENT, v),
            ElectricalEvent::PowerReported(v) => (electrical_measurement::ACTIVE_POWER, v),
        };
        update(&self.cache, attr_id, AttributeValue::Float(value))
    }
}

/// Metering cluster fed from the energy bus. The unit of measure is fixed.
pub struct TuyaMetering {
    cache: Mutex<LocalDataCluster>,
}

impl TuyaMetering {
    pub fn new(bus: &EnergyBus, listener: Option<Arc<dyn AttributeListener>>) -> Result<Arc<Self>, BusError> {
        let cache = LocalDataCluster::new(CLUSTER_METERING, listener)
            .with_constant(metering::UNIT_OF_MEASURE, AttributeValue::UInt(metering::UNIT_KILO_WATT));
        let cluster = Arc::new(TuyaMetering { cache: Mutex::new(cache) });
        bus.subscribe(cluster.clone())?;
        Ok(cluster)
    }

    pub fn read_attribute(&self, attr_id: u16) -> Option<AttributeValue> {
        read(&self.cache, attr_id)
    }

    pub fn current_summ_delivered(&self) -> Option<f64> {
        self.read_attribute(metering::CURRENT_SUMM_DELIVERED)?.as_f64()
    }

    pub fn unit_of_measure(&self) -> Option<AttributeValue> {
        self.read_attribute(metering::UNIT_OF_MEASURE)
    }
}

impl Listener<EnergyEvent> for TuyaMetering {
    fn events(&self) -> &'static [&'static str] {
        &[ENERGY_REPORTED]
    }

    fn on_event(&self, event: &EnergyEvent) -> Result<(), BusError> {
        let EnergyEvent::EnergyReported(value) = *event;
        update(&self.cache, metering::CURRENT_SUMM_DELIVERED, AttributeValue::Float(value))
    }
}

/// On/Off cluster mirroring the relay state reported by the device.
pub struct TuyaOnOff {
    cache: Mutex<LocalDataCluster>,
}

impl TuyaOnOff {
    pub fn new(bus: &SwitchBus, listener: Option<Arc<dyn AttributeListener>>) -> Result<Arc<Self>, BusError> {
        let cluster = Arc::new(TuyaOnOff {
            cache: Mutex::new(LocalDataCluster::new(CLUSTER_ON_OFF, listener)),
        });
        bus.subscribe(cluster.clone())?;
        Ok(cluster)
    }

    pub fn read_attribute(&self, attr_id: u16) -> Option<AttributeValue> {
        read(&self.cache, attr_id)
    }

    pub fn is_on(&self) -> Option<bool> {
        self.read_attribute(on_off::ON_OFF)?.as_bool()
    }
}

impl Listener<SwitchEvent> for TuyaOnOff {
    fn events(&self) -> &'static [&'static str] {
        &[SWITCH_EVENT]
    }

    fn on_event(&self, event: &SwitchEvent) -> Result<(), BusError> {
        let SwitchEvent::SwitchReported { state, .. } = *event;
        update(&self.cache, on_off::ON_OFF, AttributeValue::Bool(state != 0))
    }
}
