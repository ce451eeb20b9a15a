//!# CAN Message
//! [Message] maps a typed value to a CAN frame with a fixed identifier and back.
//! Implementations only provide the payload packing, identifier and length checks are shared.
//!
//! ```
//!# use mcp2515_io::message::{Message, MessageError};
//!#
//! #[derive(Debug, PartialEq)]
//! struct Temperature {
//!     centi_celsius: i16,
//! }
//!
//! impl Message for Temperature {
//!     const ID: u32 = 0x321;
//!     const LENGTH: usize = 2;
//!
//!     fn write_payload(&self, payload: &mut [u8; 8]) {
//!         payload[..2].copy_from_slice(&self.centi_celsius.to_le_bytes());
//!     }
//!
//!     fn read_payload(payload: &[u8]) -> Self {
//!         Self { centi_celsius: i16::from_le_bytes([payload[0], payload[1]]) }
//!     }
//! }
//!
//! let frame = Temperature { centi_celsius: -1250 }.encode();
//! assert_eq!(Ok(Temperature { centi_celsius: -1250 }), Temperature::decode(&frame));
//! ```
use crate::frame::{CanFrame, MAX_PAYLOAD};
use embedded_can::{ExtendedId, Frame, Id, StandardId};
use log::debug;

/// Reasons a frame can not be decoded as a certain message
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MessageError {
    /// Frame carries a different identifier
    UnexpectedIdentifier(u32),
    /// Remote frames carry no payload
    RemoteFrame,
    /// Frame carries less payload bytes than the message requires
    TooShort { required: usize, actual: usize },
}

/// Typed message with a fixed frame identifier
pub trait Message: Sized {
    /// Frame identifier, 11 bit or 29 bit depending on `EXTENDED`
    const ID: u32;

    const EXTENDED: bool = false;

    /// Number of payload bytes, frames are encoded and decoded with exactly this DLC
    const LENGTH: usize;

    /// Packs the message into the first `LENGTH` payload bytes
    fn write_payload(&self, payload: &mut [u8; MAX_PAYLOAD]);

    /// Unpacks the message. The payload holds at least `LENGTH` bytes.
    fn read_payload(payload: &[u8]) -> Self;

    /// Returns the frame identifier
    fn id() -> Id {
        if Self::EXTENDED {
            Id::Extended(ExtendedId::new(Self::ID).unwrap_or(ExtendedId::MAX))
        } else {
            Id::Standard(StandardId::new(Self::ID as u16).unwrap_or(StandardId::MAX))
        }
    }

    fn encode(&self) -> CanFrame {
        let mut payload = [0u8; MAX_PAYLOAD];
        self.write_payload(&mut payload);

        CanFrame {
            identifier: Self::id(),
            rtr: false,
            dlc: Self::LENGTH.min(MAX_PAYLOAD),
            data: payload,
        }
    }

    /// Checks identifier, frame type and length before reading any payload byte
    fn decode(frame: &CanFrame) -> Result<Self, MessageError> {
        if frame.id() != Self::id() {
            debug!("Frame {:#x} can not be decoded as message {:#x}", frame.raw_id(), Self::ID);
            return Err(MessageError::UnexpectedIdentifier(frame.raw_id()));
        }

        if frame.is_remote_frame() {
            debug!("Remote frame {:#x} carries no payload", Self::ID);
            return Err(MessageError::RemoteFrame);
        }

        if frame.dlc() < Self::LENGTH {
            debug!("Frame {:#x} too short: {} bytes", Self::ID, frame.dlc());
            return Err(MessageError::TooShort {
                required: Self::LENGTH,
                actual: frame.dlc(),
            });
        }

        Ok(Self::read_payload(frame.data()))
    }
}
