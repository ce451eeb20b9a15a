//!# CAN Filter
//! The MCP2515 has two acceptance masks and six filters with a fixed grouping:
//! mask 0 and filters RXF0..RXF1 belong to receive buffer 0, mask 1 and filters RXF2..RXF5 to receive buffer 1.
//! A frame is accepted if any filter of a buffer matches all identifier bits selected by the buffer's mask.
//! The extended flag of a filter is always compared, independent of the mask.
//!
//! ```
//!# use mcp2515_io::filter::{Filter, FilterConfiguration, Mask};
//!# use embedded_can::{Id, StandardId};
//!
//! // Both receive buffers accept standard identifier 0x100 only
//! let filter = Filter::standard(0x100).unwrap();
//! let config = FilterConfiguration::accept_all()
//!     .with_rxb0(Mask::standard(0x7FF), [filter, filter])
//!     .with_rxb1(Mask::standard(0x7FF), [filter; 4]);
//!
//! assert_eq!(Some(0), config.accepts(Id::Standard(StandardId::new(0x100).unwrap())));
//! assert_eq!(None, config.accepts(Id::Standard(StandardId::new(0x200).unwrap())));
//! ```
use crate::can::{CanError, RxBuffer, MCP2515};
use crate::frame::{id_registers, identifier_registers, EXTENDED_IDENTIFIER_MASK};
use crate::registers::{
    RXF0SIDH, RXF1SIDH, RXF2SIDH, RXF3SIDH, RXF4SIDH, RXF5SIDH, RXM0SIDH, RXM1SIDH,
};
use embedded_can::{ExtendedId, Id, StandardId};
use embedded_hal::spi::SpiDevice;
use embedded_time::Clock;
use log::debug;

/// Number of filters belonging to receive buffer 0
pub const RXB0_FILTERS: usize = 2;

/// Total number of acceptance filters
pub const FILTER_COUNT: usize = 6;

const FILTER_REGISTERS: [u8; FILTER_COUNT] = [RXF0SIDH, RXF1SIDH, RXF2SIDH, RXF3SIDH, RXF4SIDH, RXF5SIDH];

const MASK_REGISTERS: [u8; 2] = [RXM0SIDH, RXM1SIDH];

const ID_BITS: u32 = 0x1FFF_FFFF;

/// Acceptance mask. A set bit means the corresponding identifier bit has to match the filter.
/// Bits are stored in the 29 bit extended layout, standard identifier bits are the upper 11 bits.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Mask {
    bits: u32,
}

impl Mask {
    /// Mask accepting any identifier
    pub const NONE: Mask = Mask { bits: 0 };

    /// Mask for standard identifiers, only the lower 11 bits are used
    pub fn standard(mask: u16) -> Self {
        Self {
            bits: ((mask & 0x7FF) as u32) << 18,
        }
    }

    /// Mask for extended identifiers, only the lower 29 bits are used
    pub fn extended(mask: u32) -> Self {
        Self { bits: mask & ID_BITS }
    }

    /// Raw 29 bit mask value
    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub(crate) fn registers(&self) -> [u8; 4] {
        identifier_registers((self.bits >> 18) as u16, self.bits & EXTENDED_IDENTIFIER_MASK, false)
    }
}

/// Acceptance filter matching either standard or extended identifiers
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Filter {
    identifier: Id,
}

impl Filter {
    pub fn new(identifier: Id) -> Self {
        Self { identifier }
    }

    /// Create filter for standard identifiers
    pub fn standard(id: u16) -> Option<Self> {
        Some(Self::new(Id::Standard(StandardId::new(id)?)))
    }

    /// Create filter for extended identifiers
    pub fn extended(id: u32) -> Option<Self> {
        Some(Self::new(Id::Extended(ExtendedId::new(id)?)))
    }

    pub fn id(&self) -> Id {
        self.identifier
    }

    /// Returns true if the given identifier passes this filter with the given mask
    pub fn matches(&self, mask: &Mask, identifier: Id) -> bool {
        match (self.identifier, identifier) {
            (Id::Standard(filter), Id::Standard(id)) => {
                let mask = (mask.bits >> 18) as u16;
                (filter.as_raw() ^ id.as_raw()) & mask == 0
            }
            (Id::Extended(filter), Id::Extended(id)) => (filter.as_raw() ^ id.as_raw()) & mask.bits == 0,
            _ => false,
        }
    }

    pub(crate) fn registers(&self) -> [u8; 4] {
        id_registers(self.identifier)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(Id::Standard(StandardId::ZERO))
    }
}

/// Masks and filters of both receive buffers
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FilterConfiguration {
    /// Mask 0 (receive buffer 0) and mask 1 (receive buffer 1)
    pub masks: [Mask; 2],

    /// RXF0..RXF5
    pub filters: [Filter; FILTER_COUNT],
}

impl FilterConfiguration {
    /// Zero masks with one standard and one extended filter per buffer, so every frame is accepted
    pub fn accept_all() -> Self {
        let standard = Filter::new(Id::Standard(StandardId::ZERO));
        let extended = Filter::new(Id::Extended(ExtendedId::ZERO));

        Self {
            masks: [Mask::NONE; 2],
            filters: [standard, extended, standard, extended, standard, extended],
        }
    }

    /// Sets mask and filters of receive buffer 0
    pub fn with_rxb0(mut self, mask: Mask, filters: [Filter; RXB0_FILTERS]) -> Self {
        self.masks[0] = mask;
        self.filters[..RXB0_FILTERS].copy_from_slice(&filters);
        self
    }

    /// Sets mask and filters of receive buffer 1
    pub fn with_rxb1(mut self, mask: Mask, filters: [Filter; FILTER_COUNT - RXB0_FILTERS]) -> Self {
        self.masks[1] = mask;
        self.filters[RXB0_FILTERS..].copy_from_slice(&filters);
        self
    }

    /// Returns the receive buffer the filter with the given index belongs to
    pub fn rx_buffer(index: usize) -> Option<RxBuffer> {
        match index {
            0..=1 => Some(RxBuffer::RXB0),
            2..=5 => Some(RxBuffer::RXB1),
            _ => None,
        }
    }

    /// Returns the index of the first filter accepting the identifier.
    /// Filters of receive buffer 0 are checked first.
    pub fn accepts(&self, identifier: Id) -> Option<usize> {
        (0..FILTER_COUNT).find(|&index| {
            let mask = if index < RXB0_FILTERS { &self.masks[0] } else { &self.masks[1] };
            self.filters[index].matches(mask, identifier)
        })
    }

    /// Writes masks and filters and verifies them by reading them back.
    /// The controller has to be in configuration mode, otherwise the registers are read-only.
    pub fn apply<D: SpiDevice, CLK: Clock>(&self, controller: &mut MCP2515<D, CLK>) -> Result<(), CanError> {
        let masks = MASK_REGISTERS.iter().zip(self.masks.iter().map(Mask::registers));
        let filters = FILTER_REGISTERS.iter().zip(self.filters.iter().map(Filter::registers));

        for (address, registers) in masks.chain(filters) {
            controller.write_registers(*address, &registers)?;

            let mut read_back = [0u8; 4];
            controller.read_registers(*address, &mut read_back)?;

            if read_back != registers {
                debug!("Filter registers at {address:#04x} not accepted: {read_back:02x?}");
                return Err(CanError::ConfigurationRejected);
            }
        }

        Ok(())
    }
}

impl Default for FilterConfiguration {
    fn default() -> Self {
        Self::accept_all()
    }
}

