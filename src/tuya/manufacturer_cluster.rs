use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::sync::{Arc, Mutex};

use super::attributes::{decode, DecodedEvent, RawReport};
use super::bus::{BusError, Delivery};
use super::events::{ElectricalBus, EnergyBus, SwitchBus};
use crate::zcl::clusters::CLUSTER_TUYA_MANUFACTURER;
use crate::zcl::{AttributeValue, LocalDataCluster};

/// The manufacturer specific cluster (0xEF00) of the DIN power meter.
///
/// Every report is kept raw under its wire id, known ids are additionally
/// decoded and emitted on the bus of their quantity group.
pub struct TuyaDinPowerCluster {
    raw: Mutex<LocalDataCluster>,
    last_report: Mutex<Option<DateTime<Utc>>>,
    switch_bus: Arc<SwitchBus>,
    energy_bus: Arc<EnergyBus>,
    electrical_bus: Arc<ElectricalBus>,
}

impl TuyaDinPowerCluster {
    pub fn new(switch_bus: Arc<SwitchBus>, energy_bus: Arc<EnergyBus>, electrical_bus: Arc<ElectricalBus>) -> Self {
        TuyaDinPowerCluster {
            raw: Mutex::new(LocalDataCluster::new(CLUSTER_TUYA_MANUFACTURER, None)),
            last_report: Mutex::new(None),
            switch_bus,
            energy_bus,
            electrical_bus,
        }
    }

    /// Handles one attribute report. Returns `None` for ids without a decoder.
    pub fn on_report(&self, attr_id: u16, value: i64) -> Result<Option<Delivery>, BusError> {
        let pending = self.raw.lock()
            .map_err(|_| BusError::Poisoned)?
            .update_attribute(attr_id, AttributeValue::Int(value));
        if let Some(pending) = pending {
            pending.notify();
        }
        if let Ok(mut last) = self.last_report.lock() {
            *last = Some(Utc::now());
        }

        let delivery = match decode(RawReport::new(attr_id, value)) {
            Some(DecodedEvent::Electrical(event)) => self.electrical_bus.publish(&event)?,
            Some(DecodedEvent::Energy(event)) => self.energy_bus.publish(&event)?,
            Some(DecodedEvent::Switch(event)) => self.switch_bus.publish(&event)?,
            None => {
                trace!("Ignoring unknown attribute 0x{:04X} = {}", attr_id, value);
                return Ok(None);
            }
        };

        debug!("Attribute 0x{:04X} = {} delivered to {} listener(s)", attr_id, value, delivery.notified);
        Ok(Some(delivery))
    }

    pub fn raw_value(&self, attr_id: u16) -> Option<i64> {
        match self.raw.lock().ok()?.read_attribute(attr_id)? {
            AttributeValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn last_report(&self) -> Option<DateTime<Utc>> {
        self.last_report.lock().ok().and_then(|l| *l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuya::bus::{Bus, BusEvent, Listener};
    use crate::tuya::events::{ElectricalEvent, EnergyEvent, SwitchEvent};
    use std::sync::Mutex;

    struct Capture<E> {
        events: &'static [&'static str],
        seen: Mutex<Vec<E>>,
    }

    impl<E: BusEvent + Clone + Send> Listener<E> for Capture<E> {
        fn events(&self) -> &'static [&'static str] {
            self.events
        }

        fn on_event(&self, event: &E) -> Result<(), BusError> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn capture<E>(events: &'static [&'static str]) -> Arc<Capture<E>> {
        Arc::new(Capture { events, seen: Mutex::new(Vec::new()) })
    }

    struct Fixture {
        cluster: TuyaDinPowerCluster,
        switch: Arc<Capture<SwitchEvent>>,
        energy: Arc<Capture<EnergyEvent>>,
        electrical: Arc<Capture<ElectricalEvent>>,
    }

    fn fixture() -> Fixture {
        let switch_bus: Arc<SwitchBus> = Arc::new(Bus::new("switch"));
        let energy_bus: Arc<EnergyBus> = Arc::new(Bus::new("energy"));
        let electrical_bus: Arc<ElectricalBus> = Arc::new(Bus::new("electrical"));

        let switch = capture(&["switch_event"]);
        let energy = capture(&["energy_reported"]);
        let electrical = capture(&["voltage_reported", "current_reported", "power_reported"]);
        switch_bus.subscribe(switch.clone()).unwrap();
        energy_bus.subscribe(energy.clone()).unwrap();
        electrical_bus.subscribe(electrical.clone()).unwrap();

        Fixture {
            cluster: TuyaDinPowerCluster::new(switch_bus, energy_bus, electrical_bus),
            switch,
            energy,
            electrical,
        }
    }

    #[test]
    fn test_each_report_emits_once_on_its_bus() {
        let f = fixture();

        let delivery = f.cluster.on_report(0x0214, 2301).unwrap();
        assert_eq!(delivery, Some(Delivery { notified: 1, failed: 0 }));
        f.cluster.on_report(0x0212, -250).unwrap();
        f.cluster.on_report(0x0213, 575).unwrap();
        f.cluster.on_report(0x0211, 1234).unwrap();
        f.cluster.on_report(0x0101, 1).unwrap();

        assert_eq!(*f.electrical.seen.lock().unwrap(), vec![
            ElectricalEvent::VoltageReported(230.1),
            ElectricalEvent::CurrentReported(-0.25),
            ElectricalEvent::PowerReported(57.5),
        ]);
        assert_eq!(*f.energy.seen.lock().unwrap(), vec![EnergyEvent::EnergyReported(12.34)]);
        assert_eq!(*f.switch.seen.lock().unwrap(), vec![SwitchEvent::SwitchReported { channel: 0x0101, state: 1 }]);
    }

    #[test]
    fn test_unknown_attribute_is_stored_but_not_emitted() {
        let f = fixture();

        assert_eq!(f.cluster.on_report(0x9999, 42).unwrap(), None);
        assert_eq!(f.cluster.raw_value(0x9999), Some(42));
        assert!(f.electrical.seen.lock().unwrap().is_empty());
        assert!(f.energy.seen.lock().unwrap().is_empty());
        assert!(f.switch.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_raw_value_and_timestamp_are_kept() {
        let f = fixture();
        assert!(f.cluster.last_report().is_none());

        f.cluster.on_report(0x0213, 1234).unwrap();
        assert_eq!(f.cluster.raw_value(0x0213), Some(1234));
        assert!(f.cluster.last_report().is_some());
    }
}
