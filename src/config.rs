//!# CAN controller configuration
//! [Configuration] holds every setting written during initialization. All parts implement `Default`:
//! 16 MHz oscillator, 500 kbps, normal mode, receive and error interrupts, RXB0 rollover and
//! filters accepting every frame.
//!
//! ```
//!# use mcp2515_io::config::*;
//!#
//! let config = Configuration {
//!     bit_rate: BitRateConfig {
//!         oscillator: Oscillator::MHz8,
//!         can_speed: CanBaudRate::Kbps250,
//!         sjw: 1,
//!     },
//!     mode: RequestMode::ListenOnly,
//!     ..Default::default()
//! };
//!
//! assert!(config.bit_rate.calculate_values().is_ok());
//! ```
use crate::can::CanError;
use crate::filter::{Filter, FilterConfiguration, Mask};
use crate::registers::{CanCtrl, CanIntf, Cnf1, Cnf2, Cnf3, Rxb0Ctrl, Rxb1Ctrl};
use crate::status::OperationMode;
use embedded_can::Id;
use log::debug;

/// Entire configuration of the controller
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Configuration {
    pub bit_rate: BitRateConfig,

    /// Mode entered after initialization
    pub mode: RequestMode,

    pub interrupts: InterruptConfiguration,

    /// Messages arriving while RXB0 is full are stored in RXB1
    pub rollover: bool,

    /// Frames matching this filter are queued ahead of all other received frames
    pub priority: Option<PriorityFilter>,

    pub filters: FilterConfiguration,

    pub clock_output: ClockOutput,

    /// Transmit every message only once, no retransmission on error or lost arbitration
    pub one_shot: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bit_rate: BitRateConfig::default(),
            mode: RequestMode::default(),
            interrupts: InterruptConfiguration::default(),
            rollover: true,
            priority: None,
            filters: FilterConfiguration::default(),
            clock_output: ClockOutput::default(),
            one_shot: false,
        }
    }
}

impl Configuration {
    /// Encodes the RXB0CTRL and RXB1CTRL registers. Filters are always enabled (RXM = 0b00).
    pub(crate) fn rx_control_registers(&self) -> [u8; 2] {
        let rxb0 = Rxb0Ctrl::new().with_bukt(self.rollover);
        let rxb1 = Rxb1Ctrl::new();

        [rxb0.into(), rxb1.into()]
    }

    /// Encodes the lower CANCTRL bits (OSM, CLKEN and CLKPRE)
    pub(crate) fn control_register(&self) -> u8 {
        let register = CanCtrl::new().with_osm(self.one_shot);

        let register = match self.clock_output.prescaler() {
            Some(prescaler) => register.with_clken(true).with_clkpre(prescaler),
            None => register,
        };

        register.into()
    }
}

/// Mode entered after configuration
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum RequestMode {
    #[default]
    Normal,
    ListenOnly,
    /// Internal loopback, transmitted frames are received by the controller itself
    Loopback,
}

impl RequestMode {
    pub(crate) fn to_operation_mode(self) -> OperationMode {
        match self {
            RequestMode::Normal => OperationMode::Normal,
            RequestMode::ListenOnly => OperationMode::ListenOnly,
            RequestMode::Loopback => OperationMode::Loopback,
        }
    }
}

/// Oscillator frequency of the controller
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Oscillator {
    MHz8,
    #[default]
    MHz16,
    MHz20,
}

impl Oscillator {
    pub fn frequency(&self) -> u32 {
        match self {
            Oscillator::MHz8 => 8_000_000,
            Oscillator::MHz16 => 16_000_000,
            Oscillator::MHz20 => 20_000_000,
        }
    }
}

/// CAN bus bit rate
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum CanBaudRate {
    Kbps10,
    Kbps20,
    Kbps50,
    Kbps100,
    Kbps125,
    Kbps250,
    #[default]
    Kbps500,
    Kbps800,
    Kbps1000,
}

impl CanBaudRate {
    pub fn bits_per_second(&self) -> u32 {
        match self {
            CanBaudRate::Kbps10 => 10_000,
            CanBaudRate::Kbps20 => 20_000,
            CanBaudRate::Kbps50 => 50_000,
            CanBaudRate::Kbps100 => 100_000,
            CanBaudRate::Kbps125 => 125_000,
            CanBaudRate::Kbps250 => 250_000,
            CanBaudRate::Kbps500 => 500_000,
            CanBaudRate::Kbps800 => 800_000,
            CanBaudRate::Kbps1000 => 1_000_000,
        }
    }
}

/// Bit timing configuration
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BitRateConfig {
    pub oscillator: Oscillator,
    pub can_speed: CanBaudRate,
    /// Synchronization jump width in time quanta (1..=4)
    pub sjw: u8,
}

impl Default for BitRateConfig {
    fn default() -> Self {
        Self {
            oscillator: Oscillator::default(),
            can_speed: CanBaudRate::default(),
            sjw: 1,
        }
    }
}

impl BitRateConfig {
    const MIN_QUANTA: u32 = 8;
    const MAX_QUANTA: u32 = 25;
    const MAX_PRESCALER: u32 = 64;
    const MAX_SEGMENT: u32 = 8;

    /// Calculates CNF1, CNF2 and CNF3.
    /// Uses the smallest prescaler which yields an integer number of 8..=25 time quanta per bit.
    /// The sample point is placed at about 75 % of the bit time.
    pub fn calculate_values(&self) -> Result<[u8; 3], CanError> {
        let oscillator = self.oscillator.frequency();
        let bit_rate = self.can_speed.bits_per_second();
        let sjw = self.sjw as u32;

        if !(1..=4).contains(&sjw) {
            return Err(CanError::InvalidBitRate);
        }

        for prescaler in 1..=Self::MAX_PRESCALER {
            let divisor = 2 * prescaler * bit_rate;

            if oscillator % divisor != 0 {
                continue;
            }

            let quanta = oscillator / divisor;

            if !(Self::MIN_QUANTA..=Self::MAX_QUANTA).contains(&quanta) {
                continue;
            }

            let phase2 = (quanta - (3 * quanta + 2) / 4).max(2);
            let remaining = quanta - 1 - phase2;
            let propagation = remaining / 2;
            let phase1 = remaining - propagation;

            let segments_valid = (1..=Self::MAX_SEGMENT).contains(&propagation)
                && (1..=Self::MAX_SEGMENT).contains(&phase1)
                && (2..=Self::MAX_SEGMENT).contains(&phase2)
                && sjw <= phase2;

            if !segments_valid {
                continue;
            }

            let cnf1 = Cnf1::new().with_sjw((sjw - 1) as u8).with_brp((prescaler - 1) as u8);
            let cnf2 = Cnf2::new()
                .with_btlmode(true)
                .with_phseg1((phase1 - 1) as u8)
                .with_prseg((propagation - 1) as u8);
            let cnf3 = Cnf3::new().with_phseg2((phase2 - 1) as u8);

            return Ok([cnf1.into(), cnf2.into(), cnf3.into()]);
        }

        debug!("No bit timing for {bit_rate} bps with {oscillator} Hz oscillator");
        Err(CanError::InvalidBitRate)
    }
}

/// Interrupt sources routed to the INT pin (CANINTE)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InterruptConfiguration {
    /// RXB0 and RXB1 full
    pub receive: bool,
    /// TXB0..TXB2 empty
    pub transmit: bool,
    /// Error (EFLG)
    pub error: bool,
    pub wake_up: bool,
    pub message_error: bool,
}

impl Default for InterruptConfiguration {
    fn default() -> Self {
        Self {
            receive: true,
            transmit: false,
            error: true,
            wake_up: false,
            message_error: false,
        }
    }
}

impl InterruptConfiguration {
    /// Maps register values to configuration
    pub fn from_register(register: u8) -> Self {
        Self {
            receive: register & (CanIntf::RX0IF | CanIntf::RX1IF) != 0,
            transmit: register & (CanIntf::TX0IF | CanIntf::TX1IF | CanIntf::TX2IF) != 0,
            error: register & CanIntf::ERRIF != 0,
            wake_up: register & CanIntf::WAKIF != 0,
            message_error: register & CanIntf::MERRF != 0,
        }
    }

    /// Encodes the configuration to the CANINTE register byte
    pub fn as_register(&self) -> u8 {
        let mut register = 0x0;

        if self.receive {
            register |= CanIntf::RX0IF | CanIntf::RX1IF;
        }

        if self.transmit {
            register |= CanIntf::TX0IF | CanIntf::TX1IF | CanIntf::TX2IF;
        }

        if self.error {
            register |= CanIntf::ERRIF;
        }

        if self.wake_up {
            register |= CanIntf::WAKIF;
        }

        if self.message_error {
            register |= CanIntf::MERRF;
        }

        register
    }
}

/// Frames matching filter and mask are inserted at the head of the receive buffer
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PriorityFilter {
    pub filter: Filter,
    pub mask: Mask,
}

impl PriorityFilter {
    pub fn matches(&self, identifier: Id) -> bool {
        self.filter.matches(&self.mask, identifier)
    }
}

/// CLKOUT pin configuration
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ClockOutput {
    #[default]
    Disabled,
    DivideBy1,
    DivideBy2,
    DivideBy4,
    DivideBy8,
}

impl ClockOutput {
    /// CLKPRE bits, none if the pin is disabled
    fn prescaler(&self) -> Option<u8> {
        match self {
            ClockOutput::Disabled => None,
            ClockOutput::DivideBy1 => Some(0b00),
            ClockOutput::DivideBy2 => Some(0b01),
            ClockOutput::DivideBy4 => Some(0b10),
            ClockOutput::DivideBy8 => Some(0b11),
        }
    }
}
