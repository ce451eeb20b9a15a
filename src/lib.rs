#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
#![allow(dead_code)]
#![allow(clippy::identity_op)]

//! # Interrupt driven CAN I/O for the MCP2515 CAN controller
//!
//! Crate currently offer the following features:
//! * SPI driver for the MCP2515 (CAN 2.0A/B, standard and extended identifiers)
//! * Bit timing calculation for 8, 16 and 20 MHz oscillators
//! * Acceptance filter configuration with read back verification
//! * Interrupt safe receive buffer shared between interrupt handler and main loop
//! * Typed message codecs for motor controller, driver controls and BMS telemetry
//! * no_std support, synchronization based on [critical_section]
//!
//!## CAN Tx/Rx example
//!
//!```
//!use core::cell::RefCell;
//!use mcp2515_io::config::*;
//!use mcp2515_io::example::{ExampleClock, SimulatedChip, SimulatedSpi};
//!use mcp2515_io::io::{CanIo, State};
//!use mcp2515_io::message::Message;
//!use mcp2515_io::telemetry::{DcDrive, McVelocity};
//!
//!let chip = RefCell::new(SimulatedChip::default());
//!let clock = ExampleClock::default();
//!
//!let can = CanIo::<_, _, 32>::new(SimulatedSpi::new(&chip));
//!
//! // Configure CAN controller
//!can.initialize(
//!    &Configuration {
//!        bit_rate: BitRateConfig {
//!            oscillator: Oscillator::MHz16,
//!            can_speed: CanBaudRate::Kbps500,
//!            sjw: 1,
//!        },
//!        mode: RequestMode::Normal,
//!        ..Default::default()
//!    },
//!    &clock,
//!)
//!.unwrap();
//!assert_eq!(State::Listening, can.state());
//!
//! // Transmit a drive command
//!can.send_message(&DcDrive::from_si(1200.0, 0.5)).unwrap();
//!
//! // Velocity report of the motor controller arrives, INT pin triggers the handler
//!chip.borrow_mut().receive(&McVelocity::from_si(12.5, 640.0).encode());
//!can.on_interrupt();
//!
//!let velocity = can.receive_message::<McVelocity>().unwrap().unwrap();
//!assert_eq!(12_500, velocity.vehicle_mm_per_s);
//!```

pub mod buffer;
pub mod can;
pub mod config;
pub mod filter;
pub mod frame;
pub mod io;
pub mod message;
pub mod status;
pub mod telemetry;

pub mod example;
#[cfg(test)]
pub(crate) mod mocks;
mod registers;
#[cfg(test)]
mod tests;
