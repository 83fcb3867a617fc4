use lazy_static::lazy_static;
use log::trace;
use std::collections::HashMap;

use super::events::{ElectricalEvent, EnergyEvent, SwitchEvent};

/// Manufacturer specific attribute ids reported by the DIN power meter.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProprietaryAttributeId {
    TotalEnergy = 0x0211,
    Current = 0x0212,
    Power = 0x0213,
    Voltage = 0x0214,
    SwitchState = 0x0101,
}

impl ProprietaryAttributeId {
    pub fn id(&self) -> u16 {
        *self as u16
    }
}

/// Where a decoded attribute goes: the bus of its quantity group and the
/// event built from the value.
#[derive(Debug, Clone, Copy)]
pub enum Route {
    Electrical { divisor: f64, event: fn(f64) -> ElectricalEvent },
    Energy { divisor: f64, event: fn(f64) -> EnergyEvent },
    /// Raw value, no scaling.
    Switch,
}

#[derive(Debug, Clone, Copy)]
pub struct AttributeDefinition {
    pub id: ProprietaryAttributeId,
    pub name: &'static str,
    pub route: Route,
}

const ATTRIBUTES: [AttributeDefinition; 5] = [
    AttributeDefinition {
        id: ProprietaryAttributeId::TotalEnergy,
        name: "energy",
        route: Route::Energy { divisor: 100.0, event: EnergyEvent::EnergyReported },
    },
    AttributeDefinition {
        id: ProprietaryAttributeId::Current,
        name: "current",
        route: Route::Electrical { divisor: 1000.0, event: ElectricalEvent::CurrentReported },
    },
    AttributeDefinition {
        id: ProprietaryAttributeId::Power,
        name: "power",
        route: Route::Electrical { divisor: 10.0, event: ElectricalEvent::PowerReported },
    },
    AttributeDefinition {
        id: ProprietaryAttributeId::Voltage,
        name: "voltage",
        route: Route::Electrical { divisor: 10.0, event: ElectricalEvent::VoltageReported },
    },
    AttributeDefinition {
        id: ProprietaryAttributeId::SwitchState,
        name: "switch",
        route: Route::Switch,
    },
];

lazy_static! {
    pub static ref ATTRIBUTE_TABLE: HashMap<u16, AttributeDefinition> = ATTRIBUTES.iter()
        .map(|def| (def.id.id(), *def))
        .collect();
}

pub fn lookup(attr_id: u16) -> Option<&'static AttributeDefinition> {
    ATTRIBUTE_TABLE.get(&attr_id)
}

/// A (attribute id, raw value) pair exactly as it came off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReport {
    pub attr_id: u16,
    pub value: i64,
}

impl RawReport {
    pub fn new(attr_id: u16, value: i64) -> Self {
        RawReport { attr_id, value }
    }
}

/// A raw report translated to its physical unit, tagged with the bus it belongs on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedEvent {
    Electrical(ElectricalEvent),
    Energy(EnergyEvent),
    Switch(SwitchEvent),
}

/// Decodes one report. Unknown ids yield `None`, values are not range checked.
pub fn decode(report: RawReport) -> Option<DecodedEvent> {
    let def = lookup(report.attr_id)?;
    let scaled = |divisor: f64| report.value as f64 / divisor;

    let decoded = match def.route {
        Route::Electrical { divisor, event } => DecodedEvent::Electrical(event(scaled(divisor))),
        Route::Energy { divisor, event } => DecodedEvent::Energy(event(scaled(divisor))),
        Route::Switch => DecodedEvent::Switch(SwitchEvent::SwitchReported {
            channel: report.attr_id,
            state: report.value,
        }),
    };
    trace!("{} ({}) -> {:?}", def.name, report.value, decoded);
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuya::bus::BusEvent;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_table_matches_wire_ids() {
        assert_eq!(ATTRIBUTE_TABLE.len(), 5);
        assert_eq!(lookup(0x0211).unwrap().id, ProprietaryAttributeId::TotalEnergy);
        assert_eq!(lookup(0x0212).unwrap().name, "current");
        assert!(matches!(lookup(0x0213).unwrap().route, Route::Electrical { divisor, .. } if divisor == 10.0));
        assert!(matches!(lookup(0x0211).unwrap().route, Route::Energy { divisor, .. } if divisor == 100.0));
        assert!(matches!(lookup(0x0101).unwrap().route, Route::Switch));
        assert!(lookup(0x9999).is_none());
        assert_eq!(ProprietaryAttributeId::Voltage.id(), 0x0214);
    }

    #[test]
    fn test_decode_scaled_quantities() {
        for raw in [0_i64, 1, 7, 250, 1234, 1500, 23001, 65535] {
            match decode(RawReport::new(0x0211, raw)) {
                Some(DecodedEvent::Energy(EnergyEvent::EnergyReported(v))) => assert!(close(v, raw as f64 / 100.0)),
                other => panic!("unexpected {other:?}"),
            }
            match decode(RawReport::new(0x0213, raw)) {
                Some(DecodedEvent::Electrical(ElectricalEvent::PowerReported(v))) => assert!(close(v, raw as f64 / 10.0)),
                other => panic!("unexpected {other:?}"),
            }
            match decode(RawReport::new(0x0214, raw)) {
                Some(DecodedEvent::Electrical(ElectricalEvent::VoltageReported(v))) => assert!(close(v, raw as f64 / 10.0)),
                other => panic!("unexpected {other:?}"),
            }
        }

        for raw in [-32768_i64, -1500, -1, 0, 1500, 32767] {
            match decode(RawReport::new(0x0212, raw)) {
                Some(DecodedEvent::Electrical(ElectricalEvent::CurrentReported(v))) => assert!(close(v, raw as f64 / 1000.0)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_uses_real_division() {
        assert_eq!(decode(RawReport::new(0x0212, 1500)), Some(DecodedEvent::Electrical(ElectricalEvent::CurrentReported(1.5))));
        assert_eq!(decode(RawReport::new(0x0213, 1234)), Some(DecodedEvent::Electrical(ElectricalEvent::PowerReported(123.4))));
        assert_eq!(decode(RawReport::new(0x0211, 250)), Some(DecodedEvent::Energy(EnergyEvent::EnergyReported(2.5))));
    }

    #[test]
    fn test_decode_switch_passes_through() {
        for raw in [0_i64, 1, 2, 255] {
            assert_eq!(
                decode(RawReport::new(0x0101, raw)),
                Some(DecodedEvent::Switch(SwitchEvent::SwitchReported { channel: 0x0101, state: raw }))
            );
        }
    }

    #[test]
    fn test_decode_unknown_id() {
        assert_eq!(decode(RawReport::new(0x9999, 42)), None);
        assert_eq!(decode(RawReport::new(0x0000, 1)), None);
    }

    #[test]
    fn test_event_names_follow_table() {
        let name = |id: u16| match decode(RawReport::new(id, 1)) {
            Some(DecodedEvent::Electrical(e)) => e.name(),
            Some(DecodedEvent::Energy(e)) => e.name(),
            Some(DecodedEvent::Switch(e)) => e.name(),
            None => "none",
        };
        assert_eq!(name(0x0211), "energy_reported");
        assert_eq!(name(0x0212), "current_reported");
        assert_eq!(name(0x0213), "power_reported");
        assert_eq!(name(0x0214), "voltage_reported");
        assert_eq!(name(0x0101), "switch_event");
    }
}
