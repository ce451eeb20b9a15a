//! # Simulated controller for doc examples
//!
//! [SimulatedChip] models the register file and SPI instruction set of the MCP2515 closely enough
//! to run the driver against it: mode requests, configuration-only registers, acceptance filters,
//! receive buffers with rollover and transmit requests. [SimulatedSpi] connects a driver to a chip.
use crate::frame::{id_registers, CanFrame, BUFFER_LENGTH, HEADER_LENGTH};
use crate::registers::{
    rxb_sidh, txb_ctrl, txb_sidh, CanIntf, CANCTRL, CANINTE, CANINTF, CANSTAT, EFLG, REC, RXB0CTRL, RXB1CTRL,
    RXF0SIDH, RXF1SIDH, RXF2SIDH, RXF3SIDH, RXF4SIDH, RXF5SIDH, RXM0SIDH, RXM1SIDH, TEC,
};
use crate::status::OperationMode;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use embedded_can::Frame;
use embedded_hal::spi::{ErrorType, Operation, SpiDevice};
use embedded_time::clock::Error;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};

const REGISTER_COUNT: usize = 128;

/// CANCTRL after reset: configuration mode requested, CLKOUT enabled with prescaler 8
const CANCTRL_RESET: u8 = 0x87;

const SIDL_EXIDE: u8 = 0x08;
const SIDL_SRR: u8 = 0x10;
const DLC_RTR: u8 = 0x40;
const RXBCTRL_RXRTR: u8 = 0x08;
const RXB0CTRL_BUKT: u8 = 0x04;
const RXBCTRL_RXM: u8 = 0x60;
const TXBCTRL_TXREQ: u8 = 0x08;
const TXBCTRL_ABTF: u8 = 0x40;

const EFLG_RX0OVR: u8 = 0x40;
const EFLG_RX1OVR: u8 = 0x80;

/// Filter registers of RXB0 followed by the ones of RXB1
const FILTERS: [u8; 6] = [RXF0SIDH, RXF1SIDH, RXF2SIDH, RXF3SIDH, RXF4SIDH, RXF5SIDH];

/// Register model of a single MCP2515
#[derive(Debug)]
pub struct SimulatedChip {
    registers: [u8; REGISTER_COUNT],

    /// MISO floats high, all instructions are ignored
    unresponsive: bool,

    /// Writes to configuration registers are silently dropped
    reject_configuration: bool,

    /// Mode requests are ignored
    mode_locked: bool,
}

impl Default for SimulatedChip {
    fn default() -> Self {
        let mut chip = Self {
            registers: [0; REGISTER_COUNT],
            unresponsive: false,
            reject_configuration: false,
            mode_locked: false,
        };

        chip.reset();
        chip
    }
}

impl SimulatedChip {
    pub fn set_unresponsive(&mut self, unresponsive: bool) {
        self.unresponsive = unresponsive;
    }

    pub fn set_reject_configuration(&mut self, reject: bool) {
        self.reject_configuration = reject;
    }

    pub fn set_mode_locked(&mut self, locked: bool) {
        self.mode_locked = locked;
    }

    /// Current operation mode
    pub fn mode(&self) -> OperationMode {
        OperationMode::from_register(self.registers[CANSTAT as usize])
    }

    /// Raw register content, CANSTAT without interrupt code
    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize & (REGISTER_COUNT - 1)]
    }

    /// Sets the error counters and the derived EFLG bits, raises ERRIF
    pub fn set_error_counters(&mut self, tec: u8, rec: u8) {
        let mut eflg = self.registers[EFLG as usize] & (EFLG_RX0OVR | EFLG_RX1OVR);

        if tec == u8::MAX {
            eflg |= 0x20;
        }

        if tec >= 128 {
            eflg |= 0x10;
        }

        if rec >= 128 {
            eflg |= 0x08;
        }

        if tec >= 96 {
            eflg |= 0x05;
        }

        if rec >= 96 {
            eflg |= 0x03;
        }

        self.registers[TEC as usize] = tec;
        self.registers[REC as usize] = rec;
        self.registers[EFLG as usize] = eflg;
        self.registers[CANINTF as usize] |= CanIntf::ERRIF;
    }

    /// True if an enabled interrupt flag is set, so the INT pin would be low
    pub fn interrupt_pending(&self) -> bool {
        self.registers[CANINTF as usize] & self.registers[CANINTE as usize] != 0
    }

    /// True if the given transmit buffer holds a pending request
    pub fn tx_pending(&self, buffer: u8) -> bool {
        self.registers[txb_ctrl(buffer) as usize] & TXBCTRL_TXREQ != 0
    }

    /// Decodes the content of the given transmit buffer
    pub fn transmit_buffer(&self, buffer: u8) -> Option<CanFrame> {
        let start = txb_sidh(buffer) as usize;
        let mut image = [0u8; BUFFER_LENGTH];
        image.copy_from_slice(&self.registers[start..start + BUFFER_LENGTH]);

        // Transmit buffers carry the remote flag of standard frames in the DLC register
        if image[1] & SIDL_EXIDE == 0 && image[4] & DLC_RTR != 0 {
            image[1] |= SIDL_SRR;
        }

        CanFrame::from_registers(&image)
    }

    /// Completes a pending transmission as if the frame was acknowledged on the bus.
    /// Frames sent in loopback mode are received by the chip itself.
    pub fn complete_transmission(&mut self, buffer: u8) -> Option<CanFrame> {
        let mode = self.mode();

        if !self.tx_pending(buffer) || !matches!(mode, OperationMode::Normal | OperationMode::Loopback) {
            return None;
        }

        let frame = self.transmit_buffer(buffer)?;

        self.registers[txb_ctrl(buffer) as usize] &= !TXBCTRL_TXREQ;
        self.registers[CANINTF as usize] |= CanIntf::tx_flag(buffer);

        if mode == OperationMode::Loopback {
            self.receive(&frame);
        }

        Some(frame)
    }

    /// Frame arrives from the bus. Returns true if the frame was stored in one of the receive buffers.
    pub fn receive(&mut self, frame: &CanFrame) -> bool {
        if !matches!(
            self.mode(),
            OperationMode::Normal | OperationMode::ListenOnly | OperationMode::Loopback
        ) {
            return false;
        }

        let id = id_registers(frame.id());

        if let Some(filter) = self.filter_hit(&id, 0) {
            if self.registers[CANINTF as usize] & CanIntf::RX0IF == 0 {
                self.store(0, filter, frame);
                return true;
            }

            if self.registers[RXB0CTRL as usize] & RXB0CTRL_BUKT == 0 {
                self.overflow(EFLG_RX0OVR);
                return false;
            }

            if self.registers[CANINTF as usize] & CanIntf::RX1IF == 0 {
                // Rolled over RXF0/RXF1 hits are reported as 6 and 7
                self.store(1, filter + 6, frame);
                return true;
            }

            self.overflow(EFLG_RX1OVR);
            return false;
        }

        if let Some(filter) = self.filter_hit(&id, 1) {
            if self.registers[CANINTF as usize] & CanIntf::RX1IF == 0 {
                self.store(1, filter, frame);
                return true;
            }

            self.overflow(EFLG_RX1OVR);
        }

        false
    }

    /// Bus activity while sleeping. With the wake-up interrupt enabled, the chip sets WAKIF
    /// and wakes into listen-only mode.
    pub fn bus_activity(&mut self) -> bool {
        if self.mode() != OperationMode::Sleep || self.registers[CANINTE as usize] & CanIntf::WAKIF == 0 {
            return false;
        }

        self.registers[CANINTF as usize] |= CanIntf::WAKIF;
        self.enter_mode(OperationMode::ListenOnly as u8);
        true
    }

    fn filter_hit(&self, id: &[u8; 4], buffer: usize) -> Option<u8> {
        let (control, mask, filters) = match buffer {
            0 => (RXB0CTRL, RXM0SIDH, 0..2),
            _ => (RXB1CTRL, RXM1SIDH, 2..6),
        };

        let receive_any = self.registers[control as usize] & RXBCTRL_RXM == RXBCTRL_RXM;
        let mask = self.block(mask);

        filters
            .map(|index| (index as u8, self.block(FILTERS[index])))
            .find(|(_, filter)| receive_any || Self::matches(&mask, filter, id))
            .map(|(index, _)| index)
    }

    fn matches(mask: &[u8; 4], filter: &[u8; 4], id: &[u8; 4]) -> bool {
        if (filter[1] ^ id[1]) & SIDL_EXIDE != 0 {
            return false;
        }

        let standard = (filter[0] ^ id[0]) & mask[0] == 0 && (filter[1] ^ id[1]) & mask[1] & 0xE0 == 0;

        if id[1] & SIDL_EXIDE == 0 {
            return standard;
        }

        standard
            && (filter[1] ^ id[1]) & mask[1] & 0x03 == 0
            && (filter[2] ^ id[2]) & mask[2] == 0
            && (filter[3] ^ id[3]) & mask[3] == 0
    }

    fn block(&self, address: u8) -> [u8; 4] {
        let start = address as usize;
        let mut block = [0u8; 4];
        block.copy_from_slice(&self.registers[start..start + 4]);
        block
    }

    fn store(&mut self, buffer: u8, filter: u8, frame: &CanFrame) {
        let mut header = frame.header_registers();
        let control = (RXB0CTRL + 0x10 * buffer) as usize;

        // Receive buffers carry the remote flag of standard frames in SIDL
        if frame.is_remote_frame() && !frame.is_extended() {
            header[1] |= SIDL_SRR;
            header[4] &= !DLC_RTR;
        }

        let start = rxb_sidh(buffer) as usize;
        self.registers[start..start + HEADER_LENGTH].copy_from_slice(&header);
        self.registers[start + HEADER_LENGTH..start + BUFFER_LENGTH].copy_from_slice(&frame.data);

        let mut ctrl = self.registers[control] & !(RXBCTRL_RXRTR | 0x07);

        if frame.is_remote_frame() {
            ctrl |= RXBCTRL_RXRTR;
        }

        ctrl |= match buffer {
            0 => filter & 0x01 | self.registers[control] & 0x06,
            _ => filter & 0x07,
        };

        self.registers[control] = ctrl;
        self.registers[CANINTF as usize] |= if buffer == 0 { CanIntf::RX0IF } else { CanIntf::RX1IF };
    }

    fn overflow(&mut self, flag: u8) {
        self.registers[EFLG as usize] |= flag;
        self.registers[CANINTF as usize] |= CanIntf::ERRIF;
    }

    fn reset(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[CANCTRL as usize] = CANCTRL_RESET;
        self.registers[CANSTAT as usize] = (OperationMode::Configuration as u8) << 5;
    }

    fn read(&self, address: u8) -> u8 {
        match address & 0x0F {
            0x0E => self.registers[CANSTAT as usize] | self.interrupt_code() << 1,
            0x0F => self.registers[CANCTRL as usize],
            _ => self.registers[address as usize & (REGISTER_COUNT - 1)],
        }
    }

    fn interrupt_code(&self) -> u8 {
        let flags = self.registers[CANINTF as usize] & self.registers[CANINTE as usize];

        [
            (CanIntf::ERRIF, 1),
            (CanIntf::WAKIF, 2),
            (CanIntf::TX0IF, 3),
            (CanIntf::TX1IF, 4),
            (CanIntf::TX2IF, 5),
            (CanIntf::RX0IF, 6),
            (CanIntf::RX1IF, 7),
        ]
        .iter()
        .find(|(flag, _)| flags & flag != 0)
        .map_or(0, |(_, code)| *code)
    }

    fn write(&mut self, address: u8, value: u8) {
        let address = address & (REGISTER_COUNT as u8 - 1);
        let configuration = self.mode() == OperationMode::Configuration && !self.reject_configuration;

        match address {
            _ if address & 0x0F == 0x0F => self.write_control(value),
            _ if address & 0x0F == 0x0E => {}
            // Filters, masks and bit timing
            0x00..=0x0B | 0x10..=0x1B | 0x20..=0x2A => {
                if configuration {
                    self.registers[address as usize] = value;
                }
            }
            TEC | REC => {}
            // Only the overflow flags can be cleared
            EFLG => {
                let current = self.registers[EFLG as usize];
                self.registers[EFLG as usize] = current & 0x3F | current & value & (EFLG_RX0OVR | EFLG_RX1OVR);
            }
            CANINTF => {
                let woken = value & !self.registers[CANINTF as usize] & CanIntf::WAKIF != 0;
                self.registers[CANINTF as usize] = value;

                if woken && self.mode() == OperationMode::Sleep {
                    self.enter_mode(OperationMode::ListenOnly as u8);
                }
            }
            RXB0CTRL => {
                let rxm_bukt = value & (RXBCTRL_RXM | RXB0CTRL_BUKT);
                let bukt1 = (value & RXB0CTRL_BUKT) >> 1;
                let current = &mut self.registers[RXB0CTRL as usize];
                *current = *current & (RXBCTRL_RXRTR | 0x01) | rxm_bukt | bukt1;
            }
            RXB1CTRL => {
                let current = &mut self.registers[RXB1CTRL as usize];
                *current = *current & !RXBCTRL_RXM | value & RXBCTRL_RXM;
            }
            0x30 | 0x40 | 0x50 => {
                let current = &mut self.registers[address as usize];
                *current = *current & 0x70 | value & (TXBCTRL_TXREQ | 0x03);
            }
            _ => self.registers[address as usize] = value,
        }
    }

    fn write_control(&mut self, value: u8) {
        self.registers[CANCTRL as usize] = value;

        if value & 0x10 != 0 {
            for buffer in 0..3 {
                let control = &mut self.registers[txb_ctrl(buffer) as usize];

                if *control & TXBCTRL_TXREQ != 0 {
                    *control = *control & !TXBCTRL_TXREQ | TXBCTRL_ABTF;
                }
            }
        }

        self.enter_mode(value >> 5);
    }

    fn enter_mode(&mut self, mode: u8) {
        if self.mode_locked || mode > OperationMode::Configuration as u8 {
            return;
        }

        self.registers[CANSTAT as usize] = mode << 5;
    }

    fn read_status(&self) -> u8 {
        let flags = self.registers[CANINTF as usize];
        let mut status = flags & (CanIntf::RX0IF | CanIntf::RX1IF);

        for buffer in 0..3 {
            if self.tx_pending(buffer) {
                status |= 0x04 << (2 * buffer);
            }

            if flags & CanIntf::tx_flag(buffer) != 0 {
                status |= 0x08 << (2 * buffer);
            }
        }

        status
    }

    fn rx_status(&self) -> u8 {
        let flags = self.registers[CANINTF as usize] & (CanIntf::RX0IF | CanIntf::RX1IF);

        let buffer = match flags {
            0 => return 0,
            CanIntf::RX1IF => 1,
            _ => 0,
        };

        let sidl = self.registers[rxb_sidh(buffer) as usize + 1];
        let control = self.registers[(RXB0CTRL + 0x10 * buffer) as usize];

        let extended = sidl & SIDL_EXIDE != 0;
        let remote = control & RXBCTRL_RXRTR != 0;
        let filter = match buffer {
            0 => control & 0x01,
            _ => control & 0x07,
        };

        flags << 6 | (extended as u8) << 4 | (remote as u8) << 3 | filter
    }

    /// Processes one byte of an SPI transfer and returns the byte shifted out
    fn clock_byte(&mut self, transfer: &mut Transfer, mosi: u8) -> u8 {
        if self.unresponsive {
            return 0xFF;
        }

        let position = transfer.position;
        transfer.position += 1;

        if position == 0 {
            transfer.command = self.decode(mosi);
            return 0x00;
        }

        match &mut transfer.command {
            Command::Read { address } | Command::ReadRxBuffer { address, .. } => match address {
                None => {
                    *address = Some(mosi);
                    0x00
                }
                Some(address) => {
                    let value = self.read(*address);
                    *address = address.wrapping_add(1) & 0x7F;
                    value
                }
            },
            Command::Write { address } => match address {
                None => {
                    *address = Some(mosi);
                    0x00
                }
                Some(current) => {
                    let current_address = *current;
                    *current = current_address.wrapping_add(1) & 0x7F;
                    self.write(current_address, mosi);
                    0x00
                }
            },
            Command::BitModify { address, mask } => {
                match (*address, *mask) {
                    (None, _) => *address = Some(mosi),
                    (Some(_), None) => *mask = Some(mosi),
                    (Some(register), Some(mask)) => {
                        let value = self.read(register) & !mask | mosi & mask;
                        self.write(register, value);
                        transfer.command = Command::Ignore;
                    }
                }
                0x00
            }
            Command::ReadStatus => self.read_status(),
            Command::RxStatus => self.rx_status(),
            Command::Ignore => 0x00,
        }
    }

    fn decode(&mut self, instruction: u8) -> Command {
        match instruction {
            0xC0 => {
                self.reset();
                Command::Ignore
            }
            0x03 => Command::Read { address: None },
            0x02 => Command::Write { address: None },
            0x05 => Command::BitModify {
                address: None,
                mask: None,
            },
            0xA0 => Command::ReadStatus,
            0xB0 => Command::RxStatus,
            0x81..=0x87 => {
                for buffer in 0..3 {
                    if instruction & (1 << buffer) != 0 {
                        self.registers[txb_ctrl(buffer) as usize] |= TXBCTRL_TXREQ;
                    }
                }
                Command::Ignore
            }
            0x90..=0x96 if instruction & 0x01 == 0 => {
                let buffer = (instruction >> 2) & 0x01;
                let offset = if instruction & 0x02 != 0 { HEADER_LENGTH as u8 } else { 0 };

                Command::ReadRxBuffer {
                    address: Some(rxb_sidh(buffer) + offset),
                    buffer,
                }
            }
            0x40..=0x45 => {
                let buffer = (instruction >> 1) & 0x03;
                let offset = if instruction & 0x01 != 0 { HEADER_LENGTH as u8 } else { 0 };

                Command::Write {
                    address: Some(txb_sidh(buffer) + offset),
                }
            }
            _ => Command::Ignore,
        }
    }

    /// Chip select released
    fn finish(&mut self, transfer: Transfer) {
        if self.unresponsive {
            return;
        }

        if let Command::ReadRxBuffer { buffer, .. } = transfer.command {
            let flag = if buffer == 0 { CanIntf::RX0IF } else { CanIntf::RX1IF };
            self.registers[CANINTF as usize] &= !flag;
        }
    }
}

/// Instruction decoded from the first byte of a transfer
enum Command {
    Read { address: Option<u8> },
    ReadRxBuffer { address: Option<u8>, buffer: u8 },
    Write { address: Option<u8> },
    BitModify { address: Option<u8>, mask: Option<u8> },
    ReadStatus,
    RxStatus,
    Ignore,
}

struct Transfer {
    command: Command,
    position: usize,
}

impl Default for Transfer {
    fn default() -> Self {
        Self {
            command: Command::Ignore,
            position: 0,
        }
    }
}

/// SPI device with the chip select line connected to a [SimulatedChip]
pub struct SimulatedSpi<'a> {
    chip: &'a RefCell<SimulatedChip>,
}

impl<'a> SimulatedSpi<'a> {
    pub fn new(chip: &'a RefCell<SimulatedChip>) -> Self {
        Self { chip }
    }
}

impl ErrorType for SimulatedSpi<'_> {
    type Error = Infallible;
}

impl SpiDevice<u8> for SimulatedSpi<'_> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        let mut transfer = Transfer::default();

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(data) => {
                    for byte in data.iter() {
                        chip.clock_byte(&mut transfer, *byte);
                    }
                }
                Operation::Read(data) => {
                    for byte in data.iter_mut() {
                        *byte = chip.clock_byte(&mut transfer, 0x00);
                    }
                }
                Operation::Transfer(read, write) => {
                    for index in 0..read.len().max(write.len()) {
                        let miso = chip.clock_byte(&mut transfer, write.get(index).copied().unwrap_or(0x00));

                        if let Some(byte) = read.get_mut(index) {
                            *byte = miso;
                        }
                    }
                }
                Operation::TransferInPlace(data) => {
                    for byte in data.iter_mut() {
                        *byte = chip.clock_byte(&mut transfer, *byte);
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }

        chip.finish(transfer);
        Ok(())
    }
}

/// Clock advancing by 100 µs on every reading
#[derive(Debug, Default)]
pub struct ExampleClock {
    ticks: Cell<u64>,
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        let now = self.ticks.get();
        self.ticks.set(now + 100);

        Ok(Instant::new(now))
    }

    fn new_timer<Dur: Duration + FixedPoint>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur> {
        Timer::new(self, duration)
    }
}
