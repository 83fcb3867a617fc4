use super::bus::{Bus, BusEvent};

pub const ENERGY_REPORTED: &str = "energy_reported";
pub const CURRENT_REPORTED: &str = "current_reported";
pub const POWER_REPORTED: &str = "power_reported";
pub const VOLTAGE_REPORTED: &str = "voltage_reported";
pub const SWITCH_EVENT: &str = "switch_event";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElectricalEvent {
    VoltageReported(f64),
    CurrentReported(f64),
    PowerReported(f64),
}

impl BusEvent for ElectricalEvent {
    fn name(&self) -> &'static str {
        match self {
            ElectricalEvent::VoltageReported(_) => VOLTAGE_REPORTED,
            ElectricalEvent::CurrentReported(_) => CURRENT_REPORTED,
            ElectricalEvent::PowerReported(_) => POWER_REPORTED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyEvent {
    EnergyReported(f64),
}

impl BusEvent for EnergyEvent {
    fn name(&self) -> &'static str {
        ENERGY_REPORTED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchEvent {
    SwitchReported { channel: u16, state: i64 },
}

impl BusEvent for SwitchEvent {
    fn name(&self) -> &'static str {
        SWITCH_EVENT
    }
}

pub type ElectricalBus = Bus<ElectricalEvent>;
pub type EnergyBus = Bus<EnergyEvent>;
pub type SwitchBus = Bus<SwitchEvent>;
