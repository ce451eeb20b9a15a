//!# CAN I/O
//! [CanIo] connects the controller with an interrupt safe receive buffer. The interrupt handler drains the
//! receive buffers of the controller into the local buffer, while the application sends frames and reads
//! received frames from the main loop. All methods take `&self`, so a single instance can be shared
//! between both contexts.
//!
//!```
//!# use core::cell::RefCell;
//!# use mcp2515_io::config::Configuration;
//!# use mcp2515_io::example::*;
//!# use mcp2515_io::frame::CanFrame;
//!# use mcp2515_io::io::CanIo;
//!# use embedded_can::{Frame, StandardId};
//!#
//! let chip = RefCell::new(SimulatedChip::default());
//! let clock = ExampleClock::default();
//!
//! let can = CanIo::<_, _, 16>::new(SimulatedSpi::new(&chip));
//! can.initialize(&Configuration::default(), &clock).unwrap();
//!
//! // Frame arrives on the bus, the controller signals the interrupt
//! let frame = CanFrame::new(StandardId::new(0x100).unwrap(), &[0x01, 0x02]).unwrap();
//! chip.borrow_mut().receive(&frame);
//! can.on_interrupt();
//!
//! assert_eq!(frame, can.read().unwrap());
//! ```
use crate::buffer::{Deque, Queue};
use crate::can::{CanError, RxBuffer, TxBuffer, MCP2515};
use crate::config::{Configuration, InterruptConfiguration, PriorityFilter};
use crate::frame::CanFrame;
use crate::message::Message;
use crate::registers::{CanCtrl, CanIntf, Eflg, CANCTRL, CANINTE, CANINTF, CNF3, RXB0CTRL, RXB1CTRL};
use crate::status::{ErrorStatus, OperationMode, OperationStatus};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_can::Frame;
use embedded_hal::spi::SpiDevice;
use embedded_time::Clock;
use log::{debug, warn};

/// Time the controller gets to leave sleep mode, includes oscillator start-up
const WAKE_TIMEOUT_MS: u32 = 10;

/// Interrupt flags which are cleared by the interrupt handler. RXnIF is cleared by reading the buffer.
const SERVICED_FLAGS: u8 = CanIntf::TX0IF | CanIntf::TX1IF | CanIntf::TX2IF | CanIntf::ERRIF | CanIntf::WAKIF | CanIntf::MERRF;

/// Lifecycle of the CAN session
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum State {
    Uninitialized,
    /// Controller is being configured, pending interrupts are still serviced
    Configuring,
    /// Controller takes part in bus traffic
    Listening,
    /// Controller is in sleep mode until [CanIo::wake] is called or bus activity wakes it up
    Sleeping,
    /// Controller failed. Only [CanIo::reset_controller] or [CanIo::initialize] leave this state.
    Faulted(CanError),
}

struct Session {
    state: State,
    config: Option<Configuration>,
    errors: ErrorStatus,
    interrupts: u32,
}

/// Interrupt driven CAN endpoint with a receive buffer of N frames
pub struct CanIo<D: SpiDevice, CLK: Clock, const N: usize> {
    controller: Mutex<RefCell<MCP2515<D, CLK>>>,

    /// Frames received but not read yet
    rx: Deque<CanFrame, N>,

    /// Frames matching the priority filter, served before all frames in `rx`
    priority_rx: Queue<CanFrame, N>,

    session: Mutex<RefCell<Session>>,
}

impl<D, CLK, const N: usize> CanIo<D, CLK, N>
where
    D: SpiDevice,
    CLK: Clock,
{
    pub fn new(spi_dev: D) -> Self {
        Self {
            controller: Mutex::new(RefCell::new(MCP2515::new(spi_dev))),
            rx: Deque::new(),
            priority_rx: Queue::new(),
            session: Mutex::new(RefCell::new(Session {
                state: State::Uninitialized,
                config: None,
                errors: ErrorStatus::default(),
                interrupts: 0,
            })),
        }
    }

    /// Resets and configures the controller, then enters the configured mode.
    /// On failure the session is faulted with the returned error.
    pub fn initialize(&self, config: &Configuration, clock: &CLK) -> Result<(), CanError> {
        self.with_session(|session| {
            session.state = State::Configuring;
            session.config = Some(*config);
        });

        let result = self.configure(config, clock);

        self.with_session(|session| match result {
            Ok(()) => {
                session.state = State::Listening;
                session.errors = ErrorStatus::default();
            }
            Err(error) => session.state = State::Faulted(error),
        });

        if let Err(error) = result {
            warn!("Controller initialization failed: {error:?}");
        }

        result
    }

    /// Re-runs the initialization with the last configuration
    pub fn reset_controller(&self, clock: &CLK) -> Result<(), CanError> {
        let config = self.with_session(|session| session.config).ok_or(CanError::NotInitialized)?;

        self.initialize(&config, clock)
    }

    fn configure(&self, config: &Configuration, clock: &CLK) -> Result<(), CanError> {
        let [cnf1, cnf2, cnf3] = config.bit_rate.calculate_values()?;
        let rx_control = config.rx_control_registers();

        self.with_controller(|controller| controller.reset(clock))?;
        self.with_controller(|controller| controller.write_register(CANINTE, config.interrupts.as_register()))?;

        // CNF3, CNF2 and CNF1 are consecutive
        let timing = [cnf3, cnf2, cnf1];
        let mut read_back = [0u8; 3];

        self.with_controller(|controller| controller.write_registers(CNF3, &timing))?;
        self.with_controller(|controller| controller.read_registers(CNF3, &mut read_back))?;

        if read_back != timing {
            debug!("Bit timing not accepted. Written: {timing:02x?}, read: {read_back:02x?}");
            return Err(CanError::ConfigurationRejected);
        }

        self.with_controller(|controller| controller.write_register(RXB0CTRL, rx_control[0]))?;
        self.with_controller(|controller| controller.write_register(RXB1CTRL, rx_control[1]))?;
        self.with_controller(|controller| config.filters.apply(controller))?;

        let control_mask = !(CanCtrl::MASK_REQOP | CanCtrl::MASK_ABAT);
        self.with_controller(|controller| controller.bit_modify(CANCTRL, control_mask, config.control_register()))?;
        self.with_controller(|controller| controller.write_register(CANINTF, 0x0))?;

        self.with_controller(|controller| controller.set_mode(config.mode.to_operation_mode(), clock))
    }

    /// Loads the frame into the lowest free transmit buffer and requests transmission.
    /// Never blocks, returns [CanError::TransmitBuffersBusy] if all three buffers are pending.
    pub fn send(&self, frame: &CanFrame) -> Result<TxBuffer, CanError> {
        self.transmit(frame, None, false)
    }

    /// Sends the frame using the given transmit buffer.
    /// Returns [CanError::TransmitBuffersBusy] if this buffer holds a pending request.
    pub fn send_to(&self, buffer: TxBuffer, frame: &CanFrame) -> Result<(), CanError> {
        self.transmit(frame, Some(buffer), false).map(|_| ())
    }

    /// Like [CanIo::send], but reads the transmit buffer back before requesting transmission.
    ///
    /// Each SPI transaction runs in its own critical section, so the interrupt handler may drain
    /// receive buffers between loading and the transmit request. It never touches transmit buffers.
    pub fn send_verified(&self, frame: &CanFrame) -> Result<TxBuffer, CanError> {
        self.transmit(frame, None, true)
    }

    /// Encodes and sends the message
    pub fn send_message<M: Message>(&self, message: &M) -> Result<TxBuffer, CanError> {
        self.send(&message.encode())
    }

    fn transmit(&self, frame: &CanFrame, buffer: Option<TxBuffer>, verify: bool) -> Result<TxBuffer, CanError> {
        self.ensure_listening()?;

        let status = self.with_controller(|controller| controller.read_status())?;

        let buffer = match buffer {
            None => status.free_tx_buffer().and_then(TxBuffer::from_index),
            Some(buffer) if status.tx_pending[buffer.index() as usize] => None,
            Some(buffer) => Some(buffer),
        }
        .ok_or(CanError::TransmitBuffersBusy)?;

        self.with_controller(|controller| controller.load_tx_buffer(buffer, frame))?;

        if verify {
            let expected = frame.buffer_registers();
            let registers = self.with_controller(|controller| controller.read_tx_buffer(buffer))?;
            let length = frame.load_length();

            if registers[..length] != expected[..length] {
                debug!("Transmit buffer {buffer:?} content mismatch: {registers:02x?}");
                return Err(CanError::TransmitVerifyFailed);
            }
        }

        self.with_controller(|controller| controller.request_to_send(buffer))?;

        Ok(buffer)
    }

    /// Interrupt handler, to be called while the INT pin is low.
    /// Drains both receive buffers, refreshes the error status and clears the serviced flags.
    /// A failing SPI transaction faults the session.
    ///
    /// Every state releases the INT line: a wake-up while sleeping returns to the configured mode,
    /// a faulted session disables all interrupt sources until the controller is reset.
    pub fn on_interrupt(&self) {
        let (state, config) = self.with_session(|session| (session.state, session.config));
        let priority = config.and_then(|config| config.priority);

        let result = match state {
            State::Uninitialized => Ok(()),
            State::Listening | State::Configuring => {
                self.with_session(|session| session.interrupts = session.interrupts.wrapping_add(1));
                self.service_interrupt(priority)
            }
            State::Sleeping => self.service_wake_up(config),
            State::Faulted(_) => {
                if let Err(error) = self.with_controller(|controller| controller.write_register(CANINTE, 0x0)) {
                    debug!("Unable to disable interrupts of faulted controller: {error:?}");
                }

                Ok(())
            }
        };

        if let Err(error) = result {
            warn!("Interrupt handling failed: {error:?}");
            self.with_session(|session| session.state = State::Faulted(CanError::ControllerUnresponsive));
        }
    }

    /// Handles WAKIF while sleeping. The controller wakes into listen-only mode on bus activity.
    fn service_wake_up(&self, config: Option<Configuration>) -> Result<(), CanError> {
        let flags = self.with_controller(|controller| controller.read_register(CANINTF))?;

        if flags & CanIntf::WAKIF == 0 {
            let serviced = flags & SERVICED_FLAGS;

            if serviced != 0 {
                self.with_controller(|controller| controller.bit_modify(CANINTF, serviced, 0))?;
            }

            return Ok(());
        }

        let mode = config.map_or(OperationMode::Normal, |config| config.mode.to_operation_mode());

        self.with_controller(|controller| controller.bit_modify(CANINTF, CanIntf::WAKIF, 0))?;
        self.with_controller(|controller| controller.request_mode(mode))?;

        debug!("Woken up by bus activity, requested {mode:?}");
        self.with_session(|session| {
            session.state = State::Listening;
            session.interrupts = session.interrupts.wrapping_add(1);
        });

        Ok(())
    }

    fn service_interrupt(&self, priority: Option<PriorityFilter>) -> Result<(), CanError> {
        let status = self.with_controller(|controller| controller.read_status())?;

        if status.is_saturated() {
            // Verify the controller is still there, CANSTAT has unimplemented bits
            self.with_controller(|controller| controller.read_operation_status())?;
        }

        if status.rx0_full {
            let frame = self.with_controller(|controller| controller.read_rx_buffer(RxBuffer::RXB0))?;
            self.store(frame, priority);
        }

        if status.rx1_full {
            let frame = self.with_controller(|controller| controller.read_rx_buffer(RxBuffer::RXB1))?;
            self.store(frame, priority);
        }

        let flags = self.with_controller(|controller| controller.read_register(CANINTF))?;

        if flags & CanIntf::ERRIF != 0 {
            self.fetch_errors()?;
        }

        if flags & CanIntf::MERRF != 0 {
            self.with_session(|session| session.errors.message_error = true);
        }

        let serviced = flags & SERVICED_FLAGS;

        if serviced != 0 {
            self.with_controller(|controller| controller.bit_modify(CANINTF, serviced, 0))?;
        }

        if status.is_idle() && flags == 0 {
            debug!("Interrupt without pending flag");
            self.with_session(|session| session.errors.empty_interrupt = true);
        }

        Ok(())
    }

    /// Queues a received frame. Frames of the priority lane are read ahead of all others.
    fn store(&self, frame: CanFrame, priority: Option<PriorityFilter>) {
        let result = match priority {
            Some(filter) if filter.matches(frame.id()) => self.priority_rx.enqueue(frame),
            _ => self.rx.enqueue(frame),
        };

        if result.is_err() {
            warn!("Receive buffer full, dropping frame {:#x}", frame.raw_id());

            self.with_session(|session| {
                session.errors.rx_buffer_full = true;
                session.errors.dropped_frames = session.errors.dropped_frames.saturating_add(1);
            });
        }
    }

    /// Returns the oldest received frame. Priority frames are returned first, in order of arrival.
    pub fn read(&self) -> Result<CanFrame, CanError> {
        self.ensure_not_faulted()?;

        self.priority_rx
            .dequeue()
            .or_else(|| self.rx.dequeue_head())
            .ok_or(CanError::BufferEmpty)
    }

    /// Returns the most recently received frame outside the priority lane.
    /// Once no such frame is left, the oldest priority frame is returned.
    pub fn read_newest(&self) -> Result<CanFrame, CanError> {
        self.ensure_not_faulted()?;

        self.rx
            .dequeue_tail()
            .or_else(|| self.priority_rx.dequeue())
            .ok_or(CanError::BufferEmpty)
    }

    /// Number of received frames ready to read
    pub fn available(&self) -> usize {
        self.priority_rx.size() + self.rx.size()
    }

    /// Decodes the frame [CanIo::read] would return if it carries the identifier of `M`.
    /// Frames with other identifiers stay queued, malformed frames of `M` are dropped.
    pub fn receive_message<M: Message>(&self) -> Result<Option<M>, CanError> {
        self.ensure_not_faulted()?;

        let is_message = |frame: &CanFrame| frame.raw_id() == M::ID && frame.is_extended() == M::EXTENDED;

        let frame = if self.priority_rx.is_empty() {
            self.rx.dequeue_head_if(is_message)
        } else {
            self.priority_rx.dequeue_if(is_message)
        };

        Ok(frame.and_then(|frame| M::decode(&frame).ok()))
    }

    /// Reads EFLG, TEC and REC, merges them into the error status and clears the receive overflow flags
    pub fn fetch_errors(&self) -> Result<ErrorStatus, CanError> {
        let (eflg, tec, rec) = self.with_controller(|controller| {
            let registers = controller.read_error_registers()?;

            if registers.0 & Eflg::MASK_RXNOVR != 0 {
                controller.clear_overflow()?;
            }

            Ok(registers)
        })?;

        let status = self.with_session(|session| {
            session.errors.update_from_registers(eflg, tec, rec);
            session.errors
        });

        if status.bus_off {
            warn!("Controller is bus-off. TEC: {tec}, REC: {rec}");
        }

        Ok(status)
    }

    /// Reads operation mode and interrupt code
    pub fn fetch_status(&self) -> Result<OperationStatus, CanError> {
        self.with_controller(|controller| controller.read_operation_status())
    }

    /// Current session state
    pub fn state(&self) -> State {
        self.with_session(|session| session.state)
    }

    /// Error status collected so far
    pub fn error_status(&self) -> ErrorStatus {
        self.with_session(|session| session.errors)
    }

    /// Resets counters and sticky error flags
    pub fn clear_errors(&self) {
        self.with_session(|session| session.errors = ErrorStatus::default());
    }

    /// Number of handled interrupts
    pub fn interrupt_count(&self) -> u32 {
        self.with_session(|session| session.interrupts)
    }

    /// Puts the controller into sleep mode
    pub fn sleep(&self, clock: &CLK) -> Result<(), CanError> {
        self.ensure_listening()?;

        self.with_controller(|controller| controller.set_mode(OperationMode::Sleep, clock))?;
        self.with_session(|session| session.state = State::Sleeping);

        Ok(())
    }

    /// Wakes the controller by setting WAKIF and returns to the configured mode.
    /// Does nothing if the interrupt handler already woke the controller.
    pub fn wake(&self, clock: &CLK) -> Result<(), CanError> {
        let mode = match self.with_session(|session| (session.state, session.config)) {
            (State::Sleeping, Some(config)) => config.mode.to_operation_mode(),
            (State::Listening, _) => return Ok(()),
            (State::Faulted(error), _) => return Err(error),
            _ => return Err(CanError::NotInitialized),
        };

        self.with_controller(|controller| controller.bit_modify(CANINTF, CanIntf::WAKIF, CanIntf::WAKIF))?;
        self.with_controller(|controller| controller.enable_mode(mode, clock, WAKE_TIMEOUT_MS))?;
        self.with_controller(|controller| controller.bit_modify(CANINTF, CanIntf::WAKIF, 0))?;

        self.with_session(|session| session.state = State::Listening);

        Ok(())
    }

    /// Changes the interrupt enable register. Enters configuration mode and returns to the configured mode.
    pub fn configure_interrupts(&self, interrupts: InterruptConfiguration, clock: &CLK) -> Result<(), CanError> {
        self.ensure_listening()?;

        let mode = self.with_session(|session| {
            session.state = State::Configuring;
            session.config.as_mut().map(|config| {
                config.interrupts = interrupts;
                config.mode.to_operation_mode()
            })
        });

        let result = self.reconfigure_interrupts(interrupts, mode.unwrap_or(OperationMode::Normal), clock);

        self.with_session(|session| {
            session.state = match result {
                Ok(()) => State::Listening,
                Err(error) => State::Faulted(error),
            }
        });

        result
    }

    fn reconfigure_interrupts(
        &self,
        interrupts: InterruptConfiguration,
        mode: OperationMode,
        clock: &CLK,
    ) -> Result<(), CanError> {
        self.with_controller(|controller| controller.set_mode(OperationMode::Configuration, clock))?;
        self.with_controller(|controller| controller.write_register(CANINTE, interrupts.as_register()))?;
        self.with_controller(|controller| controller.set_mode(mode, clock))
    }

    /// Aborts all pending transmissions
    pub fn abort_transmissions(&self) -> Result<(), CanError> {
        self.ensure_listening()?;

        self.with_controller(|controller| controller.abort_transmissions())
    }

    fn ensure_listening(&self) -> Result<(), CanError> {
        match self.state() {
            State::Listening => Ok(()),
            State::Faulted(error) => Err(error),
            _ => Err(CanError::NotInitialized),
        }
    }

    fn ensure_not_faulted(&self) -> Result<(), CanError> {
        match self.state() {
            State::Faulted(error) => Err(error),
            _ => Ok(()),
        }
    }

    /// Runs a controller access in its own critical section
    fn with_controller<R>(&self, f: impl FnOnce(&mut MCP2515<D, CLK>) -> Result<R, CanError>) -> Result<R, CanError> {
        critical_section::with(|cs| f(&mut *self.controller.borrow_ref_mut(cs)))
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.session.borrow_ref_mut(cs)))
    }
}
