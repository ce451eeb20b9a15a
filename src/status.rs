use crate::registers::{CanStat, Eflg, ReadStatusResponse, RxStatusResponse};

///  Operation status read from CANSTAT register
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OperationStatus {
    /// Current operation mode
    pub mode: OperationMode,

    /// Highest priority pending interrupt source
    pub interrupt_code: InterruptCode,
}

impl OperationStatus {
    pub(crate) fn from_register(register: u8) -> Self {
        let canstat = CanStat::from(register);

        Self {
            mode: OperationMode::from_register(register),
            interrupt_code: InterruptCode::from_bits(canstat.icod()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OperationMode {
    /// Module is in normal mode and takes part in bus traffic
    Normal = 0b000,
    /// Module is in sleep mode
    Sleep = 0b001,
    /// Module is in internal loopback mode
    Loopback = 0b010,
    /// Module is in listen-only mode
    ListenOnly = 0b011,
    /// Module is in configuration mode
    Configuration = 0b100,
}

impl OperationMode {
    /// Maps the OPMOD/REQOP bits (7:5) to the mode. Reserved values are reported as configuration mode,
    /// which is the mode the device falls back to after reset
    pub(crate) fn from_register(register: u8) -> Self {
        match register >> 5 {
            0b000 => Self::Normal,
            0b001 => Self::Sleep,
            0b010 => Self::Loopback,
            0b011 => Self::ListenOnly,
            _ => Self::Configuration,
        }
    }
}

/// Interrupt flag code (CANSTAT.ICOD)
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InterruptCode {
    None,
    Error,
    WakeUp,
    TxBuffer0,
    TxBuffer1,
    TxBuffer2,
    RxBuffer0,
    RxBuffer1,
}

impl InterruptCode {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0b000 => Self::None,
            0b001 => Self::Error,
            0b010 => Self::WakeUp,
            0b011 => Self::TxBuffer0,
            0b100 => Self::TxBuffer1,
            0b101 => Self::TxBuffer2,
            0b110 => Self::RxBuffer0,
            _ => Self::RxBuffer1,
        }
    }
}

/// Condensed controller status returned by the READ STATUS instruction
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct ControllerStatus {
    /// RXB0 holds a message (RX0IF)
    pub rx0_full: bool,
    /// RXB1 holds a message (RX1IF)
    pub rx1_full: bool,
    /// Transmit request pending per TX buffer (TXREQ)
    pub tx_pending: [bool; 3],
    /// Transmit buffer became empty per TX buffer (TXnIF)
    pub tx_done: [bool; 3],
}

impl ControllerStatus {
    pub(crate) fn from_register(register: u8) -> Self {
        let response = ReadStatusResponse::from(register);

        Self {
            rx0_full: response.rx0if(),
            rx1_full: response.rx1if(),
            tx_pending: [response.tx0req(), response.tx1req(), response.tx2req()],
            tx_done: [response.tx0if(), response.tx1if(), response.tx2if()],
        }
    }

    /// Returns the index of the lowest transmit buffer without pending request
    pub fn free_tx_buffer(&self) -> Option<u8> {
        self.tx_pending.iter().position(|pending| !pending).map(|index| index as u8)
    }

    /// True if neither a receive nor a transmit flag is set
    pub fn is_idle(&self) -> bool {
        !self.rx0_full && !self.rx1_full && !self.tx_done.iter().any(|done| *done)
    }

    /// True if every bit of the response is set, which is also what a floating MISO line reads as
    pub fn is_saturated(&self) -> bool {
        self.rx0_full && self.rx1_full && self.tx_pending.iter().chain(self.tx_done.iter()).all(|bit| *bit)
    }
}

/// Type of the message received, reported by RX STATUS
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ReceivedMessageType {
    StandardData,
    StandardRemote,
    ExtendedData,
    ExtendedRemote,
}

/// Receive status returned by the RX STATUS instruction
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RxStatus {
    /// RXB0 holds a message
    pub rx0_full: bool,
    /// RXB1 holds a message
    pub rx1_full: bool,
    /// Type of the (highest priority) received message
    pub message_type: ReceivedMessageType,
    /// Index of the filter which accepted the message.
    /// Values 6 and 7 are RXF0/RXF1 hits rolled over into RXB1.
    pub filter_match: u8,
}

impl RxStatus {
    pub(crate) fn from_register(register: u8) -> Self {
        let response = RxStatusResponse::from(register);

        Self {
            rx0_full: response.received() & 0b01 != 0,
            rx1_full: response.received() & 0b10 != 0,
            message_type: match response.message_type() {
                0b00 => ReceivedMessageType::StandardData,
                0b01 => ReceivedMessageType::StandardRemote,
                0b10 => ReceivedMessageType::ExtendedData,
                _ => ReceivedMessageType::ExtendedRemote,
            },
            filter_match: response.filter_match(),
        }
    }
}

/// Error counters and sticky error flags of the CAN session
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct ErrorStatus {
    /// Transmit error counter
    pub tec: u8,
    /// Receive error counter
    pub rec: u8,
    /// Controller entered bus-off state
    pub bus_off: bool,
    /// Controller is error passive (TEC or REC >= 128)
    pub error_passive: bool,
    /// Error warning limit reached (TEC or REC >= 96)
    pub warning: bool,
    /// Error counters exceeded 135 or bus-off
    pub high_error_count: bool,
    /// RXB0 received a valid message while still full
    pub rx0_overflow: bool,
    /// RXB1 received a valid message while still full
    pub rx1_overflow: bool,
    /// Interrupt handler found no pending flag. Persistent occurrence points to broken SPI wiring.
    pub empty_interrupt: bool,
    /// Message transmission error (MERRF)
    pub message_error: bool,
    /// Local receive buffer was full during the last drain
    pub rx_buffer_full: bool,
    /// Frames dropped because the local receive buffer was full
    pub dropped_frames: u32,
}

impl ErrorStatus {
    /// Error counter above which `high_error_count` is raised
    pub const HIGH_ERROR_COUNT: u8 = 135;

    /// Merges freshly read EFLG/TEC/REC values into the status
    pub(crate) fn update_from_registers(&mut self, eflg: u8, tec: u8, rec: u8) {
        let flags = Eflg::from(eflg);

        self.tec = tec;
        self.rec = rec;
        self.warning = flags.ewarn();
        self.bus_off = flags.txbo();
        self.error_passive = flags.txep() || flags.rxep();
        self.high_error_count =
            tec > Self::HIGH_ERROR_COUNT || rec > Self::HIGH_ERROR_COUNT || self.bus_off;
        // Overflow bits are cleared on the device after reading, so they stay latched here
        self.rx0_overflow |= flags.rx0ovr();
        self.rx1_overflow |= flags.rx1ovr();
    }
}
