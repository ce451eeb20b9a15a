#![allow(unused_braces)]
use modular_bitfield_msb::prelude::*;

/// Mirrored at the low nibble 0xE of every register row
pub const CANSTAT: u8 = 0x0E;
/// Mirrored at the low nibble 0xF of every register row
pub const CANCTRL: u8 = 0x0F;
pub const TEC: u8 = 0x1C;
pub const REC: u8 = 0x1D;
pub const CNF3: u8 = 0x28;
pub const CNF2: u8 = 0x29;
pub const CNF1: u8 = 0x2A;
pub const CANINTE: u8 = 0x2B;
pub const CANINTF: u8 = 0x2C;
pub const EFLG: u8 = 0x2D;
pub const TXB0CTRL: u8 = 0x30;
pub const RXB0CTRL: u8 = 0x60;
pub const RXB1CTRL: u8 = 0x70;

pub const RXF0SIDH: u8 = 0x00;
pub const RXF1SIDH: u8 = 0x04;
pub const RXF2SIDH: u8 = 0x08;
pub const RXF3SIDH: u8 = 0x10;
pub const RXF4SIDH: u8 = 0x14;
pub const RXF5SIDH: u8 = 0x18;
pub const RXM0SIDH: u8 = 0x20;
pub const RXM1SIDH: u8 = 0x24;

/// Returns the TXBnCTRL address of the given transmit buffer index
pub const fn txb_ctrl(index: u8) -> u8 {
    TXB0CTRL + 0x10 * index
}

/// Returns the first ID register (SIDH) of the given transmit buffer index
pub const fn txb_sidh(index: u8) -> u8 {
    txb_ctrl(index) + 1
}

/// Returns the first ID register (SIDH) of the given receive buffer index
pub const fn rxb_sidh(index: u8) -> u8 {
    RXB0CTRL + 0x10 * index + 1
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// CAN control register
pub struct CanCtrl {
    /// Request operation mode bits
    pub reqop: B3,
    /// Abort all pending transmissions
    pub abat: bool,
    /// One-shot mode
    pub osm: bool,
    /// CLKOUT pin enable
    pub clken: bool,
    /// CLKOUT pin prescaler
    pub clkpre: B2,
}

impl CanCtrl {
    pub const MASK_REQOP: u8 = 0b1110_0000;
    pub const MASK_ABAT: u8 = 0b0001_0000;
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// CAN status register
pub struct CanStat {
    /// Operation mode bits
    pub opmod: B3,
    #[skip]
    __: B1,
    /// Interrupt flag code bits
    pub icod: B3,
    #[skip]
    __: B1,
}

impl CanStat {
    /// Bits which are unimplemented and always read as zero
    pub const UNIMPLEMENTED: u8 = 0b0001_0001;
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Interrupt flag register. Same layout is used for the interrupt enable register.
pub struct CanIntf {
    /// Message error
    pub merrf: bool,
    /// Wake-up
    pub wakif: bool,
    /// Error (multiple sources in EFLG)
    pub errif: bool,
    /// Transmit buffer 2 empty
    pub tx2if: bool,
    /// Transmit buffer 1 empty
    pub tx1if: bool,
    /// Transmit buffer 0 empty
    pub tx0if: bool,
    /// Receive buffer 1 full
    pub rx1if: bool,
    /// Receive buffer 0 full
    pub rx0if: bool,
}

impl CanIntf {
    pub const RX0IF: u8 = 0x01;
    pub const RX1IF: u8 = 0x02;
    pub const TX0IF: u8 = 0x04;
    pub const TX1IF: u8 = 0x08;
    pub const TX2IF: u8 = 0x10;
    pub const ERRIF: u8 = 0x20;
    pub const WAKIF: u8 = 0x40;
    pub const MERRF: u8 = 0x80;

    /// Returns the TXnIF flag of the given transmit buffer
    pub const fn tx_flag(index: u8) -> u8 {
        Self::TX0IF << index
    }
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// Error flag register
pub struct Eflg {
    /// Receive buffer 1 overflow
    pub rx1ovr: bool,
    /// Receive buffer 0 overflow
    pub rx0ovr: bool,
    /// Bus-off (TEC reached 255)
    pub txbo: bool,
    /// Transmit error-passive (TEC >= 128)
    pub txep: bool,
    /// Receive error-passive (REC >= 128)
    pub rxep: bool,
    /// Transmit error warning (TEC >= 96)
    pub txwar: bool,
    /// Receive error warning (REC >= 96)
    pub rxwar: bool,
    /// Error warning (TXWAR or RXWAR)
    pub ewarn: bool,
}

impl Eflg {
    pub const MASK_RXNOVR: u8 = 0b1100_0000;
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// Transmit buffer control register
pub struct TxbCtrl {
    #[skip]
    __: B1,
    /// Message aborted
    pub abtf: bool,
    /// Message lost arbitration
    pub mloa: bool,
    /// Transmission error detected
    pub txerr: bool,
    /// Message transmit request
    pub txreq: bool,
    #[skip]
    __: B1,
    /// Transmit buffer priority
    pub txp: B2,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// Receive buffer 0 control register
pub struct Rxb0Ctrl {
    #[skip]
    __: B1,
    /// Receive buffer operating mode, 0b00 = filters on, 0b11 = receive any
    pub rxm: B2,
    #[skip]
    __: B1,
    /// Received remote transfer request
    pub rxrtr: bool,
    /// Rollover enable, RXB0 overflows into RXB1
    pub bukt: bool,
    /// Read-only copy of BUKT
    pub bukt1: bool,
    /// Filter hit, 0 = RXF0, 1 = RXF1
    pub filhit0: bool,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug)]
#[repr(u8)]
/// Receive buffer 1 control register
pub struct Rxb1Ctrl {
    #[skip]
    __: B1,
    /// Receive buffer operating mode, 0b00 = filters on, 0b11 = receive any
    pub rxm: B2,
    #[skip]
    __: B1,
    /// Received remote transfer request
    pub rxrtr: bool,
    /// Filter hit (0..=5)
    pub filhit: B3,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Configuration register 1
pub struct Cnf1 {
    /// Synchronization jump width length (minus one)
    pub sjw: B2,
    /// Baud rate prescaler (minus one)
    pub brp: B6,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Configuration register 2
pub struct Cnf2 {
    /// PS2 length determined by CNF3
    pub btlmode: bool,
    /// Bus line sampled three times
    pub sam: bool,
    /// Phase segment 1 length (minus one)
    pub phseg1: B3,
    /// Propagation segment length (minus one)
    pub prseg: B3,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Configuration register 3
pub struct Cnf3 {
    /// Start-of-frame signal on CLKOUT
    pub sof: bool,
    /// Wake-up filter enable
    pub wakfil: bool,
    #[skip]
    __: B3,
    /// Phase segment 2 length (minus one)
    pub phseg2: B3,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Response byte of the READ STATUS instruction
pub struct ReadStatusResponse {
    pub tx2if: bool,
    pub tx2req: bool,
    pub tx1if: bool,
    pub tx1req: bool,
    pub tx0if: bool,
    pub tx0req: bool,
    pub rx1if: bool,
    pub rx0if: bool,
}

#[bitfield]
#[derive(Default, Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
/// Response byte of the RX STATUS instruction
pub struct RxStatusResponse {
    /// 0b00 = none, 0b01 = RXB0, 0b10 = RXB1, 0b11 = both
    pub received: B2,
    #[skip]
    __: B1,
    /// 0b00 = standard data, 0b01 = standard remote, 0b10 = extended data, 0b11 = extended remote
    pub message_type: B2,
    /// Filter match, 6 and 7 are RXF0/RXF1 rollover into RXB1
    pub filter_match: B3,
}
