//!# CAN Frame
//! [CanFrame] is the raw CAN 2.0 frame exchanged with the controller. It implements [embedded_can::Frame],
//! so it can be constructed with the usual constructors:
//!
//! ```
//!# use mcp2515_io::frame::CanFrame;
//!# use embedded_can::{Frame, StandardId};
//!#
//! let frame = CanFrame::new(StandardId::new(0x100).unwrap(), &[0x01, 0x02]).unwrap();
//!
//! assert_eq!(2, frame.dlc());
//! assert_eq!(&[0x01, 0x02], frame.data());
//! ```
use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Maximum number of payload bytes of a CAN 2.0 frame
pub const MAX_PAYLOAD: usize = 8;

/// Number of ID/DLC registers preceding the payload in a TX/RX buffer (SIDH, SIDL, EID8, EID0, DLC)
pub const HEADER_LENGTH: usize = 5;

/// Size of the complete buffer register image (header + payload)
pub const BUFFER_LENGTH: usize = HEADER_LENGTH + MAX_PAYLOAD;

pub(crate) const STANDARD_IDENTIFIER_MASK: u16 = 0x7FF;

pub(crate) const EXTENDED_IDENTIFIER_MASK: u32 = 0x3FFFF;

/// Extended identifier enable bit in SIDL
const SIDL_EXIDE: u8 = 1 << 3;

/// Standard frame remote request bit in SIDL (receive buffers only)
const SIDL_SRR: u8 = 1 << 4;

/// Remote transmission request bit in the DLC register
const DLC_RTR: u8 = 1 << 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub(crate) identifier: Id,
    pub(crate) rtr: bool,
    pub(crate) dlc: usize,
    pub(crate) data: [u8; MAX_PAYLOAD],
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD {
            return None;
        }

        let mut frame = CanFrame {
            identifier: id.into(),
            rtr: false,
            dlc: data.len(),
            data: [0; MAX_PAYLOAD],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Some(frame)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_PAYLOAD {
            return None;
        }

        Some(CanFrame {
            identifier: id.into(),
            rtr: true,
            dlc,
            data: [0; MAX_PAYLOAD],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.identifier, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.rtr
    }

    fn id(&self) -> Id {
        self.identifier
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        if self.rtr {
            return &[];
        }

        &self.data[..self.dlc]
    }
}

impl CanFrame {
    /// Returns the raw identifier value, 11 or 29 bit depending on the format
    pub fn raw_id(&self) -> u32 {
        raw_id(self.identifier)
    }

    /// Encodes ID and DLC into the five header registers of a transmit buffer
    pub(crate) fn header_registers(&self) -> [u8; HEADER_LENGTH] {
        let id = id_registers(self.identifier);
        let mut dlc = self.dlc as u8 & 0x0F;

        if self.rtr {
            dlc |= DLC_RTR;
        }

        [id[0], id[1], id[2], id[3], dlc]
    }

    /// Returns the complete register image (header followed by all payload bytes)
    pub(crate) fn buffer_registers(&self) -> [u8; BUFFER_LENGTH] {
        let mut buffer = [0u8; BUFFER_LENGTH];
        buffer[..HEADER_LENGTH].copy_from_slice(&self.header_registers());
        buffer[HEADER_LENGTH..].copy_from_slice(&self.data);

        buffer
    }

    /// Number of registers which need to be written to load this frame into a transmit buffer
    pub(crate) fn load_length(&self) -> usize {
        if self.rtr {
            HEADER_LENGTH
        } else {
            HEADER_LENGTH + self.dlc
        }
    }

    /// Decodes a receive buffer register image. DLC values above 8 are clamped to 8.
    pub(crate) fn from_registers(registers: &[u8; BUFFER_LENGTH]) -> Option<Self> {
        let sidh = registers[0];
        let sidl = registers[1];
        let sid = ((sidh as u16) << 3) | (sidl >> 5) as u16;

        let (identifier, rtr) = if sidl & SIDL_EXIDE != 0 {
            let eid = (((sidl & 0x03) as u32) << 16) | ((registers[2] as u32) << 8) | registers[3] as u32;
            let id = ExtendedId::new(((sid as u32) << 18) | eid)?;

            (Id::Extended(id), registers[4] & DLC_RTR != 0)
        } else {
            (Id::Standard(StandardId::new(sid)?), sidl & SIDL_SRR != 0)
        };

        let dlc = ((registers[4] & 0x0F) as usize).min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];

        if !rtr {
            data[..dlc].copy_from_slice(&registers[HEADER_LENGTH..HEADER_LENGTH + dlc]);
        }

        Some(Self {
            identifier,
            rtr,
            dlc,
            data,
        })
    }
}

/// Returns the raw identifier value
pub(crate) fn raw_id(id: Id) -> u32 {
    match id {
        Id::Standard(sid) => sid.as_raw() as u32,
        Id::Extended(eid) => eid.as_raw(),
    }
}

/// Encodes an identifier into the SIDH, SIDL, EID8 and EID0 register layout
/// shared by TX buffers, filters and masks
pub(crate) fn id_registers(id: Id) -> [u8; 4] {
    match id {
        Id::Standard(sid) => identifier_registers(sid.as_raw(), 0, false),
        Id::Extended(eid) => identifier_registers((eid.as_raw() >> 18) as u16, eid.as_raw(), true),
    }
}

/// Packs the 11 bit standard part and the 18 bit extended part into SIDH, SIDL, EID8 and EID0
pub(crate) fn identifier_registers(sid: u16, eid: u32, exide: bool) -> [u8; 4] {
    let sid = sid & STANDARD_IDENTIFIER_MASK;
    let eid = eid & EXTENDED_IDENTIFIER_MASK;

    let mut sidl = ((sid & 0x07) << 5) as u8 | (eid >> 16) as u8 & 0x03;

    if exide {
        sidl |= SIDL_EXIDE;
    }

    [(sid >> 3) as u8, sidl, (eid >> 8) as u8, eid as u8]
}
