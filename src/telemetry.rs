//!# Telemetry messages
//! Codecs of the vehicle network: motor controller, driver controls, steering wheel, telemetry and BMS.
//! The Mitsuba rear motor controllers use 29 bit identifiers and bit packed payloads.
//! Physical values are transmitted as little-endian fixed-point integers, the field name carries the unit.
//! The `f32` helpers convert from and to SI units.
//!
//! ```
//!# use mcp2515_io::message::Message;
//!# use mcp2515_io::telemetry::McBusStatus;
//!#
//! let status = McBusStatus::from_si(-12.5, 96.25);
//! let frame = status.encode();
//!
//! let decoded = McBusStatus::decode(&frame).unwrap();
//! assert_eq!(-12_500, decoded.current_ma);
//! assert_eq!(96.25, decoded.voltage());
//! ```
#![allow(unused_braces)]

use crate::frame::MAX_PAYLOAD;
use crate::message::Message;
use byteorder::{ByteOrder, LittleEndian};
use modular_bitfield_msb::prelude::*;
use serde::{Deserialize, Serialize};

pub const MC_HEARTBEAT_ID: u32 = 0x400;
pub const MC_STATUS_ID: u32 = 0x401;
pub const MC_BUS_STATUS_ID: u32 = 0x402;
pub const MC_VELOCITY_ID: u32 = 0x403;
pub const MC_PHASE_CURRENT_ID: u32 = 0x404;
pub const MC_FAN_SPEED_ID: u32 = 0x40A;
pub const MC_ODO_AMP_ID: u32 = 0x40E;

pub const DC_HEARTBEAT_ID: u32 = 0x500;
pub const DC_DRIVE_ID: u32 = 0x501;
pub const DC_POWER_ID: u32 = 0x502;
pub const DC_RESET_ID: u32 = 0x503;
pub const DC_INFO_ID: u32 = 0x505;
pub const DC_STATUS_ID: u32 = 0x506;
pub const DC_TEMP_0_ID: u32 = 0x5F0;
pub const DC_TEMP_1_ID: u32 = 0x5F1;
pub const DC_TEMP_2_ID: u32 = 0x5F2;
pub const DC_TEMP_3_ID: u32 = 0x5F3;

pub const SW_DATA_ID: u32 = 0x701;
pub const TEL_STATUS_ID: u32 = 0x301;

pub const BMS_HEARTBEAT_ID: u32 = 0x600;
pub const BMS_SOC_ID: u32 = 0x6F4;
pub const BMS_BALANCE_SOC_ID: u32 = 0x6F5;
pub const BMS_PRECHARGE_ID: u32 = 0x6F7;
pub const BMS_VOLTAGE_CURRENT_ID: u32 = 0x6FA;
pub const BMS_STATUS_ID: u32 = 0x6FB;
pub const BMS_FAN_STATUS_ID: u32 = 0x6FC;
pub const BMS_STATUS_EXT_ID: u32 = 0x6FD;

pub const MTBA_REQUEST_REAR_LEFT_ID: u32 = 0x08F8_9540;
pub const MTBA_REQUEST_REAR_RIGHT_ID: u32 = 0x08F9_1540;
pub const MTBA_FRAME0_REAR_LEFT_ID: u32 = 0x0885_0225;
pub const MTBA_FRAME0_REAR_RIGHT_ID: u32 = 0x0885_0245;
pub const MTBA_FRAME1_REAR_LEFT_ID: u32 = 0x0895_0225;
pub const MTBA_FRAME1_REAR_RIGHT_ID: u32 = 0x0895_0245;
pub const MTBA_FRAME2_REAR_LEFT_ID: u32 = 0x08A5_0225;
pub const MTBA_FRAME2_REAR_RIGHT_ID: u32 = 0x08A5_0245;

/// Converts to fixed point, rounding half away from zero
fn to_fixed(value: f32, factor: f32) -> i32 {
    let scaled = value * factor;

    if scaled < 0.0 {
        (scaled - 0.5) as i32
    } else {
        (scaled + 0.5) as i32
    }
}

fn to_unsigned_fixed(value: f32, factor: f32) -> u32 {
    (value * factor + 0.5) as u32
}

/// Motor controller identification
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McHeartbeat {
    /// ASCII "T088" on Tritium controllers
    pub tritium_id: u32,
    pub serial_number: u32,
}

impl Message for McHeartbeat {
    const ID: u32 = MC_HEARTBEAT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.tritium_id);
        LittleEndian::write_u32(&mut payload[4..8], self.serial_number);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            tritium_id: LittleEndian::read_u32(&payload[0..4]),
            serial_number: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Motor controller limit and error flags
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McStatus {
    pub active_motor: u16,
    pub error_flags: u16,
    pub limit_flags: u16,
}

impl McStatus {
    pub const ERROR_HARDWARE_OVER_CURRENT: u16 = 0x0001;
    pub const ERROR_SOFTWARE_OVER_CURRENT: u16 = 0x0002;
    pub const ERROR_DC_BUS_OVER_VOLTAGE: u16 = 0x0004;
    pub const ERROR_BAD_HALL_SEQUENCE: u16 = 0x0008;
    pub const ERROR_WATCHDOG_RESET: u16 = 0x0010;
    pub const ERROR_CONFIG_READ: u16 = 0x0020;
    pub const ERROR_RAIL_UNDER_VOLTAGE: u16 = 0x0040;
    pub const ERROR_DESATURATION: u16 = 0x0080;
    pub const ERROR_MOTOR_OVER_SPEED: u16 = 0x0100;

    pub const LIMIT_OUTPUT_VOLTAGE: u16 = 0x0001;
    pub const LIMIT_MOTOR_CURRENT: u16 = 0x0002;
    pub const LIMIT_VELOCITY: u16 = 0x0004;
    pub const LIMIT_BUS_CURRENT: u16 = 0x0008;
    pub const LIMIT_BUS_VOLTAGE_UPPER: u16 = 0x0010;
    pub const LIMIT_BUS_VOLTAGE_LOWER: u16 = 0x0020;
    pub const LIMIT_TEMPERATURE: u16 = 0x0040;

    pub fn has_error(&self, flag: u16) -> bool {
        self.error_flags & flag != 0
    }

    pub fn is_limited_by(&self, flag: u16) -> bool {
        self.limit_flags & flag != 0
    }
}

impl Message for McStatus {
    const ID: u32 = MC_STATUS_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u16(&mut payload[2..4], self.active_motor);
        LittleEndian::write_u16(&mut payload[4..6], self.error_flags);
        LittleEndian::write_u16(&mut payload[6..8], self.limit_flags);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            active_motor: LittleEndian::read_u16(&payload[2..4]),
            error_flags: LittleEndian::read_u16(&payload[4..6]),
            limit_flags: LittleEndian::read_u16(&payload[6..8]),
        }
    }
}

/// DC bus current and voltage measured by the motor controller
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McBusStatus {
    pub current_ma: i32,
    pub voltage_mv: i32,
}

impl McBusStatus {
    pub fn from_si(current: f32, voltage: f32) -> Self {
        Self {
            current_ma: to_fixed(current, 1000.0),
            voltage_mv: to_fixed(voltage, 1000.0),
        }
    }

    /// Bus current in A
    pub fn current(&self) -> f32 {
        self.current_ma as f32 / 1000.0
    }

    /// Bus voltage in V
    pub fn voltage(&self) -> f32 {
        self.voltage_mv as f32 / 1000.0
    }
}

impl Message for McBusStatus {
    const ID: u32 = MC_BUS_STATUS_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.current_ma);
        LittleEndian::write_i32(&mut payload[4..8], self.voltage_mv);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            current_ma: LittleEndian::read_i32(&payload[0..4]),
            voltage_mv: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McVelocity {
    /// Vehicle velocity in mm/s
    pub vehicle_mm_per_s: i32,
    /// Motor angular frequency in 0.1 rpm
    pub motor_decirpm: i32,
}

impl McVelocity {
    pub fn from_si(vehicle: f32, motor_rpm: f32) -> Self {
        Self {
            vehicle_mm_per_s: to_fixed(vehicle, 1000.0),
            motor_decirpm: to_fixed(motor_rpm, 10.0),
        }
    }

    /// Vehicle velocity in m/s
    pub fn vehicle_velocity(&self) -> f32 {
        self.vehicle_mm_per_s as f32 / 1000.0
    }

    /// Motor velocity in rpm
    pub fn motor_rpm(&self) -> f32 {
        self.motor_decirpm as f32 / 10.0
    }
}

impl Message for McVelocity {
    const ID: u32 = MC_VELOCITY_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.vehicle_mm_per_s);
        LittleEndian::write_i32(&mut payload[4..8], self.motor_decirpm);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            vehicle_mm_per_s: LittleEndian::read_i32(&payload[0..4]),
            motor_decirpm: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

/// RMS current in motor phases B and C
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McPhaseCurrent {
    pub phase_a_ma: i32,
    pub phase_b_ma: i32,
}

impl McPhaseCurrent {
    pub fn from_si(phase_a: f32, phase_b: f32) -> Self {
        Self {
            phase_a_ma: to_fixed(phase_a, 1000.0),
            phase_b_ma: to_fixed(phase_b, 1000.0),
        }
    }

    pub fn phase_a(&self) -> f32 {
        self.phase_a_ma as f32 / 1000.0
    }

    pub fn phase_b(&self) -> f32 {
        self.phase_b_ma as f32 / 1000.0
    }
}

impl Message for McPhaseCurrent {
    const ID: u32 = MC_PHASE_CURRENT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.phase_a_ma);
        LittleEndian::write_i32(&mut payload[4..8], self.phase_b_ma);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            phase_a_ma: LittleEndian::read_i32(&payload[0..4]),
            phase_b_ma: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

/// Heat sink fan of the motor controller
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McFanSpeed {
    /// Fan drive in 0.1 % of full scale
    pub drive_permille: u32,
    /// Fan speed in 0.1 rpm
    pub speed_decirpm: u32,
}

impl McFanSpeed {
    pub fn from_si(speed_rpm: f32, drive_ratio: f32) -> Self {
        Self {
            drive_permille: to_unsigned_fixed(drive_ratio, 1000.0),
            speed_decirpm: to_unsigned_fixed(speed_rpm, 10.0),
        }
    }

    pub fn speed_rpm(&self) -> f32 {
        self.speed_decirpm as f32 / 10.0
    }

    pub fn drive_ratio(&self) -> f32 {
        self.drive_permille as f32 / 1000.0
    }
}

impl Message for McFanSpeed {
    const ID: u32 = MC_FAN_SPEED_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.drive_permille);
        LittleEndian::write_u32(&mut payload[4..8], self.speed_decirpm);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            drive_permille: LittleEndian::read_u32(&payload[0..4]),
            speed_decirpm: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Distance travelled and charge drawn from the DC bus since reset
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McOdoAmp {
    pub odometer_m: u32,
    pub bus_mah: i32,
}

impl McOdoAmp {
    /// Charge in Ah
    pub fn bus_amp_hours(&self) -> f32 {
        self.bus_mah as f32 / 1000.0
    }

    /// Distance in km
    pub fn odometer_km(&self) -> f32 {
        self.odometer_m as f32 / 1000.0
    }
}

impl Message for McOdoAmp {
    const ID: u32 = MC_ODO_AMP_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.odometer_m);
        LittleEndian::write_i32(&mut payload[4..8], self.bus_mah);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            odometer_m: LittleEndian::read_u32(&payload[0..4]),
            bus_mah: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcHeartbeat {
    pub device_id: u32,
    pub serial_number: u32,
}

impl Message for DcHeartbeat {
    const ID: u32 = DC_HEARTBEAT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.device_id);
        LittleEndian::write_u32(&mut payload[4..8], self.serial_number);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            device_id: LittleEndian::read_u32(&payload[0..4]),
            serial_number: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Drive command sent to the motor controller
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcDrive {
    /// Motor velocity setpoint in 0.1 rpm
    pub velocity_decirpm: i32,
    /// Motor current setpoint in 0.1 % of the maximum current
    pub current_permille: u32,
}

impl DcDrive {
    /// Creates the command from velocity in rpm and current as ratio (0.0..=1.0)
    pub fn from_si(velocity_rpm: f32, current_ratio: f32) -> Self {
        Self {
            velocity_decirpm: to_fixed(velocity_rpm, 10.0),
            current_permille: to_unsigned_fixed(current_ratio, 1000.0),
        }
    }

    pub fn velocity_rpm(&self) -> f32 {
        self.velocity_decirpm as f32 / 10.0
    }

    pub fn current_ratio(&self) -> f32 {
        self.current_permille as f32 / 1000.0
    }
}

impl Message for DcDrive {
    const ID: u32 = DC_DRIVE_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.velocity_decirpm);
        LittleEndian::write_u32(&mut payload[4..8], self.current_permille);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            velocity_decirpm: LittleEndian::read_i32(&payload[0..4]),
            current_permille: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Bus current limit sent to the motor controller
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcPower {
    /// Bus current limit in 0.1 % of the maximum current
    pub bus_current_permille: u32,
}

impl DcPower {
    pub fn bus_current_ratio(&self) -> f32 {
        self.bus_current_permille as f32 / 1000.0
    }
}

impl Message for DcPower {
    const ID: u32 = DC_POWER_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[4..8], self.bus_current_permille);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            bus_current_permille: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Resets the motor controller, all payload bytes are zero
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DcReset;

impl Message for DcReset {
    const ID: u32 = DC_RESET_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, _payload: &mut [u8; MAX_PAYLOAD]) {}

    fn read_payload(_payload: &[u8]) -> Self {
        Self
    }
}

#[bitfield]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(u8)]
struct DcInfoFlags {
    #[skip]
    __: B1,
    tripped: bool,
    was_reset: bool,
    brake_engaged: bool,
    gear: B4,
}

/// Driver controls state
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcInfo {
    /// Ignition switch bits, already in place (bits 4..=6)
    pub ignition_state: u16,
    pub fuel_door: bool,
    /// Accelerator pedal position in % (0..=100)
    pub accel_percent: u8,
    /// Regenerative braking in % (0..=100)
    pub regen_percent: u8,
    pub can_error_flags: u16,
    pub dc_error_flags: u8,
    /// 0..=15
    pub gear: u8,
    pub brake_engaged: bool,
    pub was_reset: bool,
    pub tripped: bool,
}

impl DcInfo {
    pub const IGNITION_MASK: u16 = 0x0070;
    const FUEL_DOOR: u16 = 0x0100;

    /// Accelerator position as ratio (0.0..=1.0)
    pub fn accel_ratio(&self) -> f32 {
        self.accel_percent as f32 / 100.0
    }

    /// Regenerative braking as ratio (0.0..=1.0)
    pub fn regen_ratio(&self) -> f32 {
        self.regen_percent as f32 / 100.0
    }

    pub fn set_accel_ratio(&mut self, ratio: f32) {
        self.accel_percent = to_unsigned_fixed(ratio, 100.0).min(u8::MAX as u32) as u8;
    }

    pub fn set_regen_ratio(&mut self, ratio: f32) {
        self.regen_percent = to_unsigned_fixed(ratio, 100.0).min(u8::MAX as u32) as u8;
    }
}

impl Message for DcInfo {
    const ID: u32 = DC_INFO_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let mut switches = self.ignition_state & Self::IGNITION_MASK;

        if self.fuel_door {
            switches |= Self::FUEL_DOOR;
        }

        let flags = DcInfoFlags::new()
            .with_tripped(self.tripped)
            .with_was_reset(self.was_reset)
            .with_brake_engaged(self.brake_engaged)
            .with_gear(self.gear & 0x0F);

        LittleEndian::write_u16(&mut payload[0..2], switches);
        payload[2] = self.accel_percent;
        payload[3] = self.regen_percent;
        LittleEndian::write_u16(&mut payload[4..6], self.can_error_flags);
        payload[6] = self.dc_error_flags;
        payload[7] = flags.into();
    }

    fn read_payload(payload: &[u8]) -> Self {
        let switches = LittleEndian::read_u16(&payload[0..2]);
        let flags = DcInfoFlags::from(payload[7]);

        Self {
            ignition_state: switches & Self::IGNITION_MASK,
            fuel_door: switches & Self::FUEL_DOOR != 0,
            accel_percent: payload[2],
            regen_percent: payload[3],
            can_error_flags: LittleEndian::read_u16(&payload[4..6]),
            dc_error_flags: payload[6],
            gear: flags.gear(),
            brake_engaged: flags.brake_engaged(),
            was_reset: flags.was_reset(),
            tripped: flags.tripped(),
        }
    }
}

/// Trip conditions reported by the driver controls
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcStatus {
    pub flags: u32,
}

impl DcStatus {
    pub const NO_TRIP: u32 = 0x00;
    pub const CHARGING_OVER_TEMP: u32 = 0x01;
    pub const DISCHARGING_OVER_TEMP: u32 = 0x02;
    pub const CHARGING_OVER_CURRENT: u32 = 0x04;
    pub const DISCHARGING_OVER_CURRENT: u32 = 0x08;

    pub fn is_tripped(&self) -> bool {
        self.flags != Self::NO_TRIP
    }
}

impl Message for DcStatus {
    const ID: u32 = DC_STATUS_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.flags);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            flags: LittleEndian::read_u32(&payload[0..4]),
        }
    }
}

/// Battery temperature extremes and modules 1 to 6, all in °C
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DcTemp0 {
    pub max_celsius: u8,
    pub min_celsius: u8,
    pub modules: [u8; 6],
}

impl Message for DcTemp0 {
    const ID: u32 = DC_TEMP_0_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        payload[0] = self.max_celsius;
        payload[1] = self.min_celsius;
        payload[2..8].copy_from_slice(&self.modules);
    }

    fn read_payload(payload: &[u8]) -> Self {
        let mut modules = [0u8; 6];
        modules.copy_from_slice(&payload[2..8]);

        Self {
            max_celsius: payload[0],
            min_celsius: payload[1],
            modules,
        }
    }
}

/// Temperatures of eight consecutive battery modules in °C, one byte each
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DcModuleTemps<const IDENTIFIER: u32> {
    pub modules: [u8; 8],
}

/// Modules 7 to 14
pub type DcTemp1 = DcModuleTemps<DC_TEMP_1_ID>;
/// Modules 15 to 22
pub type DcTemp2 = DcModuleTemps<DC_TEMP_2_ID>;
/// Modules 23 to 30
pub type DcTemp3 = DcModuleTemps<DC_TEMP_3_ID>;

impl<const IDENTIFIER: u32> Message for DcModuleTemps<IDENTIFIER> {
    const ID: u32 = IDENTIFIER;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        payload.copy_from_slice(&self.modules);
    }

    fn read_payload(payload: &[u8]) -> Self {
        let mut modules = [0u8; 8];
        modules.copy_from_slice(&payload[0..8]);

        Self { modules }
    }
}

#[bitfield]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(u8)]
struct SwSwitches {
    right_turn: bool,
    left_turn: bool,
    horn: bool,
    #[skip]
    __: B1,
    hazards: bool,
    headlights: bool,
    gear: B2,
}

/// Steering wheel switches
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SwData {
    /// 0 = off, 1 = forward, 2 = reverse
    pub gear: u8,
    pub headlights: bool,
    pub hazards: bool,
    pub horn: bool,
    pub left_turn: bool,
    pub right_turn: bool,
    pub cruise_on: bool,
    pub cruise_off: bool,
}

impl Message for SwData {
    const ID: u32 = SW_DATA_ID;
    const LENGTH: usize = 2;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let switches = SwSwitches::new()
            .with_right_turn(self.right_turn)
            .with_left_turn(self.left_turn)
            .with_horn(self.horn)
            .with_hazards(self.hazards)
            .with_headlights(self.headlights)
            .with_gear(self.gear & 0b11);

        payload[0] = switches.into();
        payload[1] = self.cruise_on as u8 | (self.cruise_off as u8) << 1;
    }

    fn read_payload(payload: &[u8]) -> Self {
        let switches = SwSwitches::from(payload[0]);

        Self {
            gear: switches.gear(),
            headlights: switches.headlights(),
            hazards: switches.hazards(),
            horn: switches.horn(),
            left_turn: switches.left_turn(),
            right_turn: switches.right_turn(),
            cruise_on: payload[1] & 0x01 != 0,
            cruise_off: payload[1] & 0x02 != 0,
        }
    }
}

/// Connection state of the telemetry unit
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelStatus {
    pub sql_connected: bool,
    pub com_connected: bool,
}

impl Message for TelStatus {
    const ID: u32 = TEL_STATUS_ID;
    const LENGTH: usize = 1;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        payload[0] = self.sql_connected as u8 | (self.com_connected as u8) << 1;
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            sql_connected: payload[0] & 0x01 != 0,
            com_connected: payload[0] & 0x02 != 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BmsHeartbeat {
    pub device_id: u32,
    pub serial_number: u32,
}

impl Message for BmsHeartbeat {
    const ID: u32 = BMS_HEARTBEAT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.device_id);
        LittleEndian::write_u32(&mut payload[4..8], self.serial_number);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            device_id: LittleEndian::read_u32(&payload[0..4]),
            serial_number: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Battery pack voltage and current
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BmsVoltageCurrent {
    pub voltage_mv: u32,
    /// Positive while discharging
    pub current_ma: i32,
}

impl BmsVoltageCurrent {
    pub fn voltage(&self) -> f32 {
        self.voltage_mv as f32 / 1000.0
    }

    pub fn current(&self) -> f32 {
        self.current_ma as f32 / 1000.0
    }
}

impl Message for BmsVoltageCurrent {
    const ID: u32 = BMS_VOLTAGE_CURRENT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.voltage_mv);
        LittleEndian::write_i32(&mut payload[4..8], self.current_ma);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            voltage_mv: LittleEndian::read_u32(&payload[0..4]),
            current_ma: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

/// Charge drawn from the pack and state of charge
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BmsSoc {
    pub consumed_mah: i32,
    /// State of charge in 0.1 %
    pub soc_permille: u32,
}

impl BmsSoc {
    pub fn from_si(consumed_amp_hours: f32, soc_percent: f32) -> Self {
        Self {
            consumed_mah: to_fixed(consumed_amp_hours, 1000.0),
            soc_permille: to_unsigned_fixed(soc_percent, 10.0),
        }
    }

    pub fn consumed_amp_hours(&self) -> f32 {
        self.consumed_mah as f32 / 1000.0
    }

    pub fn soc_percent(&self) -> f32 {
        self.soc_permille as f32 / 10.0
    }
}

impl Message for BmsSoc {
    const ID: u32 = BMS_SOC_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.consumed_mah);
        LittleEndian::write_u32(&mut payload[4..8], self.soc_permille);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            consumed_mah: LittleEndian::read_i32(&payload[0..4]),
            soc_permille: LittleEndian::read_u32(&payload[4..8]),
        }
    }
}

/// Charge supplied to balance the cells and the remaining state of charge mismatch
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BmsBalanceSoc {
    pub supplied_mah: i32,
    /// Mismatch between the highest and lowest cell in 0.1 %
    pub mismatch_permille: i32,
}

impl BmsBalanceSoc {
    pub fn from_si(supplied_amp_hours: f32, mismatch_percent: f32) -> Self {
        Self {
            supplied_mah: to_fixed(supplied_amp_hours, 1000.0),
            mismatch_permille: to_fixed(mismatch_percent, 10.0),
        }
    }

    pub fn supplied_amp_hours(&self) -> f32 {
        self.supplied_mah as f32 / 1000.0
    }

    pub fn mismatch_percent(&self) -> f32 {
        self.mismatch_permille as f32 / 10.0
    }
}

impl Message for BmsBalanceSoc {
    const ID: u32 = BMS_BALANCE_SOC_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_i32(&mut payload[0..4], self.supplied_mah);
        LittleEndian::write_i32(&mut payload[4..8], self.mismatch_permille);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            supplied_mah: LittleEndian::read_i32(&payload[0..4]),
            mismatch_permille: LittleEndian::read_i32(&payload[4..8]),
        }
    }
}

/// Contactor drivers and precharge sequence. Bytes 4 and 5 are reserved.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BmsPrechargeStatus {
    pub driver_status: u8,
    pub state: u8,
    pub contactor_supply_mv: u16,
    pub timer_elapsed: bool,
    /// Precharge timer in 10 ms steps
    pub timer: u8,
}

impl BmsPrechargeStatus {
    pub const CONTACTOR_1_ERROR: u8 = 0x01;
    pub const CONTACTOR_2_ERROR: u8 = 0x02;
    pub const CONTACTOR_1_OUTPUT: u8 = 0x04;
    pub const CONTACTOR_2_OUTPUT: u8 = 0x08;
    pub const CONTACTOR_SUPPLY_OK: u8 = 0x10;
    pub const CONTACTOR_3_ERROR: u8 = 0x20;
    pub const CONTACTOR_3_OUTPUT: u8 = 0x40;

    pub const STATE_ERROR: u8 = 0;
    pub const STATE_IDLE: u8 = 1;
    pub const STATE_MEASURE: u8 = 2;
    pub const STATE_PRECHARGE: u8 = 3;
    pub const STATE_RUN: u8 = 4;
    pub const STATE_ENABLE_PACK: u8 = 5;

    pub fn driver_flag(&self, flag: u8) -> bool {
        self.driver_status & flag != 0
    }
}

impl Message for BmsPrechargeStatus {
    const ID: u32 = BMS_PRECHARGE_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        payload[0] = self.driver_status;
        payload[1] = self.state;
        LittleEndian::write_u16(&mut payload[2..4], self.contactor_supply_mv);
        payload[6] = self.timer_elapsed as u8;
        payload[7] = self.timer;
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            driver_status: payload[0],
            state: payload[1],
            contactor_supply_mv: LittleEndian::read_u16(&payload[2..4]),
            timer_elapsed: payload[6] != 0,
            timer: payload[7],
        }
    }
}

/// Balancing thresholds, status flags and firmware of the BMS master unit
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BmsStatus {
    pub voltage_rising_mv: u16,
    pub voltage_falling_mv: u16,
    pub flags: u8,
    pub cmu_count: u8,
    pub firmware_build: u16,
}

impl BmsStatus {
    pub const CELL_OVER_VOLTAGE: u8 = 0x01;
    pub const CELL_UNDER_VOLTAGE: u8 = 0x02;
    pub const CELL_OVER_TEMPERATURE: u8 = 0x04;
    pub const MEASUREMENT_UNTRUSTED: u8 = 0x08;
    pub const CMU_TIMEOUT: u8 = 0x10;
    pub const VEHICLE_TIMEOUT: u8 = 0x20;
    pub const SETUP_MODE: u8 = 0x40;
    pub const CMU_CAN_POWER: u8 = 0x80;

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

impl Message for BmsStatus {
    const ID: u32 = BMS_STATUS_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u16(&mut payload[0..2], self.voltage_rising_mv);
        LittleEndian::write_u16(&mut payload[2..4], self.voltage_falling_mv);
        payload[4] = self.flags;
        payload[5] = self.cmu_count;
        LittleEndian::write_u16(&mut payload[6..8], self.firmware_build);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            voltage_rising_mv: LittleEndian::read_u16(&payload[0..2]),
            voltage_falling_mv: LittleEndian::read_u16(&payload[2..4]),
            flags: payload[4],
            cmu_count: payload[5],
            firmware_build: LittleEndian::read_u16(&payload[6..8]),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BmsFanStatus {
    pub fan0_rpm: u16,
    pub fan1_rpm: u16,
    /// Current drawn by the fans and contactors
    pub fan_consumption_ma: u16,
    /// Current drawn by the cell monitoring units
    pub cmu_consumption_ma: u16,
}

impl Message for BmsFanStatus {
    const ID: u32 = BMS_FAN_STATUS_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u16(&mut payload[0..2], self.fan0_rpm);
        LittleEndian::write_u16(&mut payload[2..4], self.fan1_rpm);
        LittleEndian::write_u16(&mut payload[4..6], self.fan_consumption_ma);
        LittleEndian::write_u16(&mut payload[6..8], self.cmu_consumption_ma);
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            fan0_rpm: LittleEndian::read_u16(&payload[0..2]),
            fan1_rpm: LittleEndian::read_u16(&payload[2..4]),
            fan_consumption_ma: LittleEndian::read_u16(&payload[4..6]),
            cmu_consumption_ma: LittleEndian::read_u16(&payload[6..8]),
        }
    }
}

/// Extended status flags and hardware identification of the BMS master unit
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BmsStatusExt {
    pub flags: u32,
    pub hardware_version: u8,
    pub model: u8,
}

impl BmsStatusExt {
    pub const OVER_VOLTAGE: u32 = 0x0001;
    pub const UNDER_VOLTAGE: u32 = 0x0002;
    pub const UNTRUSTED: u32 = 0x0008;
    pub const CMU_LOST: u32 = 0x0010;
    pub const DRIVER_CONTROLS_LOST: u32 = 0x0020;
    pub const SETUP_MODE: u32 = 0x0040;
    pub const CMU_CAN_POWER: u32 = 0x0080;
    pub const ISOLATION_FAIL: u32 = 0x0100;
    pub const LOW_12V: u32 = 0x0400;
    pub const CONTACTOR_ERROR: u32 = 0x0800;
    pub const EXTRA_CELL: u32 = 0x1000;

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}

impl Message for BmsStatusExt {
    const ID: u32 = BMS_STATUS_EXT_ID;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        LittleEndian::write_u32(&mut payload[0..4], self.flags);
        payload[4] = self.hardware_version;
        payload[5] = self.model;
    }

    fn read_payload(payload: &[u8]) -> Self {
        Self {
            flags: LittleEndian::read_u32(&payload[0..4]),
            hardware_version: payload[4],
            model: payload[5],
        }
    }
}

/// Mitsuba payloads number their bits from the least significant bit of byte 0. Bitfields start at
/// the most significant bit of their first byte, so the payload word is handed over big-endian.
fn packed_bits(payload: &[u8]) -> [u8; 8] {
    LittleEndian::read_u64(&payload[0..8]).to_be_bytes()
}

fn write_packed_bits(payload: &mut [u8; MAX_PAYLOAD], bits: [u8; 8]) {
    LittleEndian::write_u64(&mut payload[..], u64::from_be_bytes(bits));
}

#[bitfield]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(u8)]
struct MtbaRequestBits {
    #[skip]
    __: B5,
    frame2: bool,
    frame1: bool,
    frame0: bool,
}

/// Asks a Mitsuba controller to send the selected frames once
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MtbaRequest<const IDENTIFIER: u32> {
    pub frame0: bool,
    pub frame1: bool,
    pub frame2: bool,
}

pub type MtbaRequestRearLeft = MtbaRequest<MTBA_REQUEST_REAR_LEFT_ID>;
pub type MtbaRequestRearRight = MtbaRequest<MTBA_REQUEST_REAR_RIGHT_ID>;

impl<const IDENTIFIER: u32> Message for MtbaRequest<IDENTIFIER> {
    const ID: u32 = IDENTIFIER;
    const EXTENDED: bool = true;
    const LENGTH: usize = 1;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let bits = MtbaRequestBits::new()
            .with_frame0(self.frame0)
            .with_frame1(self.frame1)
            .with_frame2(self.frame2);

        payload[0] = bits.into();
    }

    fn read_payload(payload: &[u8]) -> Self {
        let bits = MtbaRequestBits::from(payload[0]);

        Self {
            frame0: bits.frame0(),
            frame1: bits.frame1(),
            frame2: bits.frame2(),
        }
    }
}

#[bitfield(bits = 64)]
#[derive(Copy, Clone, Debug, Default)]
struct MtbaFrame0Bits {
    lead_angle: B7,
    pwm_duty: B10,
    motor_rpm: B12,
    fet_temperature: B5,
    motor_current: B10,
    battery_current_negative: bool,
    battery_current: B9,
    battery_voltage: B10,
}

/// Mitsuba frame 0: battery and motor measurements in raw units. Values wider than their field are
/// truncated to the field width when encoded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MtbaFrame0<const IDENTIFIER: u32> {
    /// Battery voltage in 0.5 V, 10 bit
    pub battery_voltage: u16,
    /// Battery current in A, 9 bit
    pub battery_current: u16,
    /// Current flows into the battery
    pub battery_current_negative: bool,
    /// Motor current in A, 10 bit
    pub motor_current: u16,
    /// FET temperature in 5 °C, 5 bit
    pub fet_temperature: u8,
    /// 12 bit
    pub motor_rpm: u16,
    /// PWM duty in 0.5 %, 10 bit
    pub pwm_duty: u16,
    /// Lead angle in 0.5 degree, 7 bit
    pub lead_angle: u8,
}

pub type MtbaFrame0RearLeft = MtbaFrame0<MTBA_FRAME0_REAR_LEFT_ID>;
pub type MtbaFrame0RearRight = MtbaFrame0<MTBA_FRAME0_REAR_RIGHT_ID>;

impl<const IDENTIFIER: u32> MtbaFrame0<IDENTIFIER> {
    /// Battery voltage in V
    pub fn battery_voltage_v(&self) -> f32 {
        self.battery_voltage as f32 * 0.5
    }

    /// Battery current in A, negative while charging
    pub fn battery_current_a(&self) -> f32 {
        if self.battery_current_negative {
            -(self.battery_current as f32)
        } else {
            self.battery_current as f32
        }
    }

    pub fn fet_celsius(&self) -> u16 {
        self.fet_temperature as u16 * 5
    }

    pub fn pwm_duty_ratio(&self) -> f32 {
        self.pwm_duty as f32 / 200.0
    }

    pub fn lead_angle_degrees(&self) -> f32 {
        self.lead_angle as f32 * 0.5
    }
}

impl<const IDENTIFIER: u32> Message for MtbaFrame0<IDENTIFIER> {
    const ID: u32 = IDENTIFIER;
    const EXTENDED: bool = true;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let bits = MtbaFrame0Bits::new()
            .with_battery_voltage(self.battery_voltage & 0x3FF)
            .with_battery_current(self.battery_current & 0x1FF)
            .with_battery_current_negative(self.battery_current_negative)
            .with_motor_current(self.motor_current & 0x3FF)
            .with_fet_temperature(self.fet_temperature & 0x1F)
            .with_motor_rpm(self.motor_rpm & 0xFFF)
            .with_pwm_duty(self.pwm_duty & 0x3FF)
            .with_lead_angle(self.lead_angle & 0x7F);

        write_packed_bits(payload, bits.into_bytes());
    }

    fn read_payload(payload: &[u8]) -> Self {
        let bits = MtbaFrame0Bits::from_bytes(packed_bits(payload));

        Self {
            battery_voltage: bits.battery_voltage(),
            battery_current: bits.battery_current(),
            battery_current_negative: bits.battery_current_negative(),
            motor_current: bits.motor_current(),
            fet_temperature: bits.fet_temperature(),
            motor_rpm: bits.motor_rpm(),
            pwm_duty: bits.pwm_duty(),
            lead_angle: bits.lead_angle(),
        }
    }
}

#[bitfield(bits = 64)]
#[derive(Copy, Clone, Debug, Default)]
struct MtbaFrame1Bits {
    #[skip]
    __: B25,
    regeneration_active: bool,
    drive_action_status: B2,
    output_target: B10,
    digital_switch_position: B4,
    regeneration_position: B10,
    accelerator_position: B10,
    pwm_control: bool,
    power_mode: bool,
}

/// Mitsuba frame 1: operating modes and driver inputs seen by the controller
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MtbaFrame1<const IDENTIFIER: u32> {
    /// Power mode, economy mode when cleared
    pub power_mode: bool,
    /// Motor driven by PWM duty, by current when cleared
    pub pwm_control: bool,
    /// Accelerator position in 0.5 %, 10 bit
    pub accelerator_position: u16,
    /// Regeneration potentiometer position in 0.5 %, 10 bit
    pub regeneration_position: u16,
    /// 4 bit
    pub digital_switch_position: u8,
    /// Output target in 0.5 %, 10 bit
    pub output_target: u16,
    /// 0 = stop, 1 = forward, 2 = reverse
    pub drive_action_status: u8,
    pub regeneration_active: bool,
}

pub type MtbaFrame1RearLeft = MtbaFrame1<MTBA_FRAME1_REAR_LEFT_ID>;
pub type MtbaFrame1RearRight = MtbaFrame1<MTBA_FRAME1_REAR_RIGHT_ID>;

impl<const IDENTIFIER: u32> Message for MtbaFrame1<IDENTIFIER> {
    const ID: u32 = IDENTIFIER;
    const EXTENDED: bool = true;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let bits = MtbaFrame1Bits::new()
            .with_power_mode(self.power_mode)
            .with_pwm_control(self.pwm_control)
            .with_accelerator_position(self.accelerator_position & 0x3FF)
            .with_regeneration_position(self.regeneration_position & 0x3FF)
            .with_digital_switch_position(self.digital_switch_position & 0x0F)
            .with_output_target(self.output_target & 0x3FF)
            .with_drive_action_status(self.drive_action_status & 0b11)
            .with_regeneration_active(self.regeneration_active);

        write_packed_bits(payload, bits.into_bytes());
    }

    fn read_payload(payload: &[u8]) -> Self {
        let bits = MtbaFrame1Bits::from_bytes(packed_bits(payload));

        Self {
            power_mode: bits.power_mode(),
            pwm_control: bits.pwm_control(),
            accelerator_position: bits.accelerator_position(),
            regeneration_position: bits.regeneration_position(),
            digital_switch_position: bits.digital_switch_position(),
            output_target: bits.output_target(),
            drive_action_status: bits.drive_action_status(),
            regeneration_active: bits.regeneration_active(),
        }
    }
}

#[bitfield(bits = 64)]
#[derive(Copy, Clone, Debug, Default)]
struct MtbaFrame2Bits {
    #[skip]
    __: B30,
    over_heat_level: B2,
    #[skip]
    __: B4,
    hall_sensor_open: bool,
    hall_sensor_short: bool,
    motor_lock: bool,
    motor_system_error: bool,
    #[skip]
    __: B2,
    over_current_limit: bool,
    #[skip]
    __: B1,
    over_voltage: bool,
    #[skip]
    __: B1,
    over_current: bool,
    power_system_error: bool,
    #[skip]
    __: B4,
    controller_voltage_sensor: bool,
    #[skip]
    __: B1,
    accelerator_position: bool,
    motor_current_sensor_adjust: bool,
    battery_current_sensor_adjust: bool,
    battery_current_sensor: bool,
    battery_voltage_sensor: bool,
    #[skip]
    __: B1,
    fet_thermistor: bool,
    motor_current_sensor_w: bool,
    motor_current_sensor_u: bool,
    analog_sensor: bool,
}

/// Mitsuba frame 2: error flags. Sensor flags report implausible readings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MtbaFrame2<const IDENTIFIER: u32> {
    pub analog_sensor: bool,
    pub motor_current_sensor_u: bool,
    pub motor_current_sensor_w: bool,
    pub fet_thermistor: bool,
    pub battery_voltage_sensor: bool,
    pub battery_current_sensor: bool,
    pub battery_current_sensor_adjust: bool,
    pub motor_current_sensor_adjust: bool,
    pub accelerator_position: bool,
    pub controller_voltage_sensor: bool,
    pub power_system_error: bool,
    pub over_current: bool,
    pub over_voltage: bool,
    pub over_current_limit: bool,
    pub motor_system_error: bool,
    pub motor_lock: bool,
    pub hall_sensor_short: bool,
    pub hall_sensor_open: bool,
    /// FET overheat level, 0 = normal, 3 = highest
    pub over_heat_level: u8,
}

pub type MtbaFrame2RearLeft = MtbaFrame2<MTBA_FRAME2_REAR_LEFT_ID>;
pub type MtbaFrame2RearRight = MtbaFrame2<MTBA_FRAME2_REAR_RIGHT_ID>;

impl<const IDENTIFIER: u32> MtbaFrame2<IDENTIFIER> {
    /// True if any error flag is set or the FET temperature is above normal
    pub fn has_error(&self) -> bool {
        *self != Self::default()
    }
}

impl<const IDENTIFIER: u32> Message for MtbaFrame2<IDENTIFIER> {
    const ID: u32 = IDENTIFIER;
    const EXTENDED: bool = true;
    const LENGTH: usize = 8;

    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]) {
        let bits = MtbaFrame2Bits::new()
            .with_analog_sensor(self.analog_sensor)
            .with_motor_current_sensor_u(self.motor_current_sensor_u)
            .with_motor_current_sensor_w(self.motor_current_sensor_w)
            .with_fet_thermistor(self.fet_thermistor)
            .with_battery_voltage_sensor(self.battery_voltage_sensor)
            .with_battery_current_sensor(self.battery_current_sensor)
            .with_battery_current_sensor_adjust(self.battery_current_sensor_adjust)
            .with_motor_current_sensor_adjust(self.motor_current_sensor_adjust)
            .with_accelerator_position(self.accelerator_position)
            .with_controller_voltage_sensor(self.controller_voltage_sensor)
            .with_power_system_error(self.power_system_error)
            .with_over_current(self.over_current)
            .with_over_voltage(self.over_voltage)
            .with_over_current_limit(self.over_current_limit)
            .with_motor_system_error(self.motor_system_error)
            .with_motor_lock(self.motor_lock)
            .with_hall_sensor_short(self.hall_sensor_short)
            .with_hall_sensor_open(self.hall_sensor_open)
            .with_over_heat_level(self.over_heat_level & 0b11);

        write_packed_bits(payload, bits.into_bytes());
    }

    fn read_payload(payload: &[u8]) -> Self {
        let bits = MtbaFrame2Bits::from_bytes(packed_bits(payload));

        Self {
            analog_sensor: bits.analog_sensor(),
            motor_current_sensor_u: bits.motor_current_sensor_u(),
            motor_current_sensor_w: bits.motor_current_sensor_w(),
            fet_thermistor: bits.fet_thermistor(),
            battery_voltage_sensor: bits.battery_voltage_sensor(),
            battery_current_sensor: bits.battery_current_sensor(),
            battery_current_sensor_adjust: bits.battery_current_sensor_adjust(),
            motor_current_sensor_adjust: bits.motor_current_sensor_adjust(),
            accelerator_position: bits.accelerator_position(),
            controller_voltage_sensor: bits.controller_voltage_sensor(),
            power_system_error: bits.power_system_error(),
            over_current: bits.over_current(),
            over_voltage: bits.over_voltage(),
            over_current_limit: bits.over_current_limit(),
            motor_system_error: bits.motor_system_error(),
            motor_lock: bits.motor_lock(),
            hall_sensor_short: bits.hall_sensor_short(),
            hall_sensor_open: bits.hall_sensor_open(),
            over_heat_level: bits.over_heat_level(),
        }
    }
}
