// Zigbee Cluster Library identifiers used by the power meter.

pub const PROFILE_ZHA: u16 = 0x0104;
pub const DEVICE_TYPE_SMART_PLUG: u16 = 0x0051;

pub const CLUSTER_BASIC: u16 = 0x0000;
pub const CLUSTER_GROUPS: u16 = 0x0004;
pub const CLUSTER_SCENES: u16 = 0x0005;
pub const CLUSTER_ON_OFF: u16 = 0x0006;
pub const CLUSTER_TIME: u16 = 0x000A;
pub const CLUSTER_OTA: u16 = 0x0019;
pub const CLUSTER_METERING: u16 = 0x0702;
pub const CLUSTER_ELECTRICAL_MEASUREMENT: u16 = 0x0B04;
pub const CLUSTER_TUYA_MANUFACTURER: u16 = 0xEF00;

pub mod on_off {
    pub const ON_OFF: u16 = 0x0000;
}

pub mod metering {
    pub const CURRENT_SUMM_DELIVERED: u16 = 0x0000;
    pub const UNIT_OF_MEASURE: u16 = 0x0300;

    /// kW / kWh
    pub const UNIT_KILO_WATT: u64 = 0x00;
}

pub mod electrical_measurement {
    pub const RMS_VOLTAGE: u16 = 0x0505;
    pub const RMS_CURRENT: u16 = 0x0508;
    pub const ACTIVE_POWER: u16 = 0x050B;
}
