//!# CAN Controller device
//! [MCP2515] issues the SPI instruction set of the controller. It owns no buffering, every
//! method is a single SPI transaction (or a polling loop of them while changing the mode).
//!
//!```
//!# use core::cell::RefCell;
//!# use mcp2515_io::can::{MCP2515, TxBuffer};
//!# use mcp2515_io::example::*;
//!# use mcp2515_io::frame::CanFrame;
//!# use embedded_can::{Frame, StandardId};
//!#
//! let chip = RefCell::new(SimulatedChip::default());
//! let clock = ExampleClock::default();
//!
//! let mut controller = MCP2515::new(SimulatedSpi::new(&chip));
//!
//! // Reset into configuration mode
//! controller.reset(&clock).unwrap();
//!
//! let frame = CanFrame::new(StandardId::new(0x100).unwrap(), &[0xAA]).unwrap();
//! controller.load_tx_buffer(TxBuffer::TXB0, &frame).unwrap();
//!
//! assert!(!controller.read_status().unwrap().tx_pending[0]);
//! ```

use crate::frame::{CanFrame, BUFFER_LENGTH};
use crate::registers::{CanCtrl, CanStat, Eflg, CANCTRL, CANSTAT, EFLG, TEC};
use crate::status::{ControllerStatus, ErrorStatus, OperationMode, OperationStatus, RxStatus};
use core::marker::PhantomData;
use embedded_hal::spi::{ErrorKind, Operation as SpiOperation, SpiDevice};
use embedded_time::duration::Milliseconds;
use embedded_time::Clock;
use log::debug;

/// Time the controller gets to reach a requested mode
const MODE_TIMEOUT_MS: u32 = 2;

/// Possible CAN errors during Configuration/Transmission/Reception
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanError {
    /// SPI bus transfer error
    BusError(ErrorKind),
    /// Internal clock error
    ClockError,
    /// Controller did not respond or returned malformed register content
    ControllerUnresponsive,
    /// Controller did not accept the configuration (read back mismatch or mode change timeout)
    ConfigurationRejected,
    /// No valid bit timing exists for the given oscillator and bit rate
    InvalidBitRate,
    /// Operation requires an initialized controller
    NotInitialized,
    /// Local buffer is full
    BufferFull,
    /// Local buffer is empty
    BufferEmpty,
    /// All three transmit buffers hold a pending request
    TransmitBuffersBusy,
    /// Transmit buffer content differs from the frame after loading
    TransmitVerifyFailed,
}

impl From<embedded_time::clock::Error> for CanError {
    fn from(_error: embedded_time::clock::Error) -> Self {
        CanError::ClockError
    }
}

fn bus_error<E: embedded_hal::spi::Error>(error: E) -> CanError {
    CanError::BusError(error.kind())
}

/// Transmit buffer of the controller
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TxBuffer {
    TXB0 = 0,
    TXB1 = 1,
    TXB2 = 2,
}

impl TxBuffer {
    pub const ALL: [TxBuffer; 3] = [TxBuffer::TXB0, TxBuffer::TXB1, TxBuffer::TXB2];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Receive buffer of the controller
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RxBuffer {
    RXB0 = 0,
    RXB1 = 1,
}

impl RxBuffer {
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Main MCP2515 CAN controller device
pub struct MCP2515<D: SpiDevice<u8>, CLK: Clock> {
    /// Device on SPI bus
    device: D,

    /// System clock
    clock: PhantomData<CLK>,
}

impl<D, CLK> MCP2515<D, CLK>
where
    D: SpiDevice,
    CLK: Clock,
{
    pub fn new(spi_dev: D) -> Self {
        Self {
            device: spi_dev,
            clock: Default::default(),
        }
    }

    /// Releases the SPI device
    pub fn release(self) -> D {
        self.device
    }

    /// Resets all registers to their default and waits max. 2 ms for configuration mode
    pub fn reset(&mut self, clock: &CLK) -> Result<(), CanError> {
        self.device.write(&[Instruction::Reset as u8]).map_err(bus_error)?;

        self.wait_for_mode(
            OperationMode::Configuration,
            clock,
            MODE_TIMEOUT_MS,
            CanError::ControllerUnresponsive,
        )
    }

    /// Requests the given mode and waits max. 2 ms for the device to reach it
    pub fn set_mode(&mut self, mode: OperationMode, clock: &CLK) -> Result<(), CanError> {
        self.enable_mode(mode, clock, MODE_TIMEOUT_MS)
    }

    /// Requests the given mode with a custom timeout
    pub(crate) fn enable_mode(&mut self, mode: OperationMode, clock: &CLK, timeout_ms: u32) -> Result<(), CanError> {
        self.request_mode(mode)?;

        self.wait_for_mode(mode, clock, timeout_ms, CanError::ConfigurationRejected)
    }

    /// Writes the mode request without waiting for the device to reach it
    pub fn request_mode(&mut self, mode: OperationMode) -> Result<(), CanError> {
        self.bit_modify(CANCTRL, CanCtrl::MASK_REQOP, (mode as u8) << 5)
    }

    fn wait_for_mode(
        &mut self,
        mode: OperationMode,
        clock: &CLK,
        timeout_ms: u32,
        timeout_error: CanError,
    ) -> Result<(), CanError> {
        let target = clock
            .try_now()?
            .checked_add(Milliseconds::new(timeout_ms))
            .ok_or(CanError::ClockError)?;

        loop {
            let current_mode = self.read_operation_status()?.mode;

            if current_mode == mode {
                return Ok(());
            }

            if clock.try_now()? > target {
                debug!("Device did not enter {mode:?} within timeout. Current mode: {current_mode:?}");
                return Err(timeout_error);
            }
        }
    }

    /// Reads and returns the operation status
    pub fn read_operation_status(&mut self) -> Result<OperationStatus, CanError> {
        let data = self.read_register(CANSTAT)?;

        if data & CanStat::UNIMPLEMENTED != 0 {
            debug!("Malformed CANSTAT value {data:#04x}");
            return Err(CanError::ControllerUnresponsive);
        }

        Ok(OperationStatus::from_register(data))
    }

    /// Reads EFLG, TEC and REC and returns them as fresh error status
    pub fn read_error_status(&mut self) -> Result<ErrorStatus, CanError> {
        let (eflg, tec, rec) = self.read_error_registers()?;

        let mut status = ErrorStatus::default();
        status.update_from_registers(eflg, tec, rec);

        Ok(status)
    }

    /// Returns the raw (EFLG, TEC, REC) values
    pub(crate) fn read_error_registers(&mut self) -> Result<(u8, u8, u8), CanError> {
        let mut counters = [0u8; 2];
        self.read_registers(TEC, &mut counters)?;

        let eflg = self.read_register(EFLG)?;

        Ok((eflg, counters[0], counters[1]))
    }

    /// Clears the receive overflow flags RX0OVR and RX1OVR
    pub fn clear_overflow(&mut self) -> Result<(), CanError> {
        self.bit_modify(EFLG, Eflg::MASK_RXNOVR, 0)
    }

    /// Aborts all pending transmissions
    pub fn abort_transmissions(&mut self) -> Result<(), CanError> {
        self.bit_modify(CANCTRL, CanCtrl::MASK_ABAT, CanCtrl::MASK_ABAT)?;

        // ABAT stays set until cleared, which would block any further transmission
        self.bit_modify(CANCTRL, CanCtrl::MASK_ABAT, 0)
    }

    /// Reads a single register byte
    pub fn read_register(&mut self, register: u8) -> Result<u8, CanError> {
        let mut buffer = [Instruction::Read as u8, register, 0x0];

        self.device.transfer_in_place(&mut buffer).map_err(bus_error)?;

        Ok(buffer[2])
    }

    /// Reads consecutive registers starting at the given address
    pub fn read_registers(&mut self, register: u8, data: &mut [u8]) -> Result<(), CanError> {
        let command = [Instruction::Read as u8, register];

        let mut operations = [SpiOperation::Write(&command), SpiOperation::Read(data)];
        self.device.transaction(&mut operations).map_err(bus_error)
    }

    /// Writes a single register byte
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), CanError> {
        self.device
            .write(&[Instruction::Write as u8, register, value])
            .map_err(bus_error)
    }

    /// Writes consecutive registers starting at the given address
    pub fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), CanError> {
        let command = [Instruction::Write as u8, register];

        let mut operations = [SpiOperation::Write(&command), SpiOperation::Write(data)];
        self.device.transaction(&mut operations).map_err(bus_error)
    }

    /// Sets the register bits selected by the mask to the given value
    pub fn bit_modify(&mut self, register: u8, mask: u8, value: u8) -> Result<(), CanError> {
        self.device
            .write(&[Instruction::BitModify as u8, register, mask, value])
            .map_err(bus_error)
    }

    /// Requests transmission of the given buffer
    pub fn request_to_send(&mut self, buffer: TxBuffer) -> Result<(), CanError> {
        self.device
            .write(&[Instruction::RequestToSend as u8 | (1 << buffer.index())])
            .map_err(bus_error)
    }

    /// Reads the condensed receive/transmit flags
    pub fn read_status(&mut self) -> Result<ControllerStatus, CanError> {
        let mut buffer = [Instruction::ReadStatus as u8, 0x0];

        self.device.transfer_in_place(&mut buffer).map_err(bus_error)?;

        Ok(ControllerStatus::from_register(buffer[1]))
    }

    /// Reads the receive buffer status and the filter match
    pub fn read_rx_status(&mut self) -> Result<RxStatus, CanError> {
        let mut buffer = [Instruction::RxStatus as u8, 0x0];

        self.device.transfer_in_place(&mut buffer).map_err(bus_error)?;

        Ok(RxStatus::from_register(buffer[1]))
    }

    /// Reads a frame from the given receive buffer. The controller clears RXnIF once CS is released.
    pub fn read_rx_buffer(&mut self, buffer: RxBuffer) -> Result<CanFrame, CanError> {
        let command = [Instruction::ReadRxBuffer as u8 | (buffer.index() << 2)];
        let mut registers = [0u8; BUFFER_LENGTH];

        let mut operations = [SpiOperation::Write(&command), SpiOperation::Read(&mut registers)];
        self.device.transaction(&mut operations).map_err(bus_error)?;

        CanFrame::from_registers(&registers).ok_or(CanError::ControllerUnresponsive)
    }

    /// Loads ID, DLC and payload of the frame into the given transmit buffer
    pub fn load_tx_buffer(&mut self, buffer: TxBuffer, frame: &CanFrame) -> Result<(), CanError> {
        let command = [Instruction::LoadTxBuffer as u8 | (buffer.index() << 1)];
        let registers = frame.buffer_registers();

        let mut operations = [
            SpiOperation::Write(&command),
            SpiOperation::Write(&registers[..frame.load_length()]),
        ];
        self.device.transaction(&mut operations).map_err(bus_error)
    }

    /// Reads back the ID, DLC and payload registers of the given transmit buffer
    pub fn read_tx_buffer(&mut self, buffer: TxBuffer) -> Result<[u8; BUFFER_LENGTH], CanError> {
        let mut registers = [0u8; BUFFER_LENGTH];
        self.read_registers(crate::registers::txb_sidh(buffer.index()), &mut registers)?;

        Ok(registers)
    }
}

/// SPI instruction set
#[derive(Copy, Clone)]
enum Instruction {
    Reset = 0xC0,
    Read = 0x03,
    Write = 0x02,
    BitModify = 0x05,
    ReadStatus = 0xA0,
    RxStatus = 0xB0,
    RequestToSend = 0x80,
    ReadRxBuffer = 0x90,
    LoadTxBuffer = 0x40,
}
