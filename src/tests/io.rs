use crate::can::{CanError, TxBuffer};
use crate::config::{
    BitRateConfig, CanBaudRate, Configuration, InterruptConfiguration, Oscillator, PriorityFilter, RequestMode,
};
use crate::example::{ExampleClock, SimulatedChip, SimulatedSpi};
use crate::filter::{Filter, FilterConfiguration, Mask};
use crate::frame::CanFrame;
use crate::io::{CanIo, State};
use crate::message::Message;
use crate::registers::{CanIntf, CANCTRL, CANINTE, CANINTF, CNF1, CNF2, CNF3, EFLG, RXB0CTRL};
use crate::status::OperationMode;
use crate::telemetry::{DcDrive, McVelocity};
use core::cell::RefCell;
use embedded_can::{ExtendedId, Frame, StandardId};

type TestIo<'a, const N: usize> = CanIo<SimulatedSpi<'a>, ExampleClock, N>;

fn standard(id: u16, data: &[u8]) -> CanFrame {
    CanFrame::new(StandardId::new(id).unwrap(), data).unwrap()
}

fn initialized<'a, const N: usize>(chip: &'a RefCell<SimulatedChip>, config: &Configuration) -> TestIo<'a, N> {
    let can = CanIo::new(SimulatedSpi::new(chip));
    can.initialize(config, &ExampleClock::default()).unwrap();
    can
}

#[test]
fn test_initialize() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    assert_eq!(State::Uninitialized, can.state());
    assert_eq!(Ok(()), can.initialize(&Configuration::default(), &ExampleClock::default()));
    assert_eq!(State::Listening, can.state());

    let chip = chip.borrow();
    assert_eq!(OperationMode::Normal, chip.mode());
    assert_eq!(0x00, chip.register(CNF1));
    assert_eq!(0xAC, chip.register(CNF2));
    assert_eq!(0x03, chip.register(CNF3));
    assert_eq!(0x23, chip.register(CANINTE));
    assert_eq!(0x04, chip.register(RXB0CTRL) & 0x04);
    assert_eq!(0x00, chip.register(CANINTF));
}

#[test]
fn test_initialize_listen_only_with_clock_output() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        mode: RequestMode::ListenOnly,
        clock_output: crate::config::ClockOutput::DivideBy2,
        ..Default::default()
    };

    let _can: TestIo<8> = initialized(&chip, &config);

    let chip = chip.borrow();
    assert_eq!(OperationMode::ListenOnly, chip.mode());
    assert_eq!(0b0110_0101, chip.register(CANCTRL));
}

#[test]
fn test_initialize_unresponsive_controller() {
    let chip = RefCell::new(SimulatedChip::default());
    chip.borrow_mut().set_unresponsive(true);

    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    assert_eq!(
        Err(CanError::ControllerUnresponsive),
        can.initialize(&Configuration::default(), &ExampleClock::default())
    );
    assert_eq!(State::Faulted(CanError::ControllerUnresponsive), can.state());
    assert_eq!(Err(CanError::ControllerUnresponsive), can.read());
    assert_eq!(
        Err(CanError::ControllerUnresponsive),
        can.send(&standard(0x100, &[]))
    );
}

#[test]
fn test_initialize_rejected_configuration() {
    let chip = RefCell::new(SimulatedChip::default());
    chip.borrow_mut().set_reject_configuration(true);

    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    assert_eq!(
        Err(CanError::ConfigurationRejected),
        can.initialize(&Configuration::default(), &ExampleClock::default())
    );
    assert_eq!(State::Faulted(CanError::ConfigurationRejected), can.state());
}

#[test]
fn test_initialize_mode_timeout() {
    let chip = RefCell::new(SimulatedChip::default());
    chip.borrow_mut().set_mode_locked(true);

    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    assert_eq!(
        Err(CanError::ConfigurationRejected),
        can.initialize(&Configuration::default(), &ExampleClock::default())
    );
    assert_eq!(OperationMode::Configuration, chip.borrow().mode());
}

#[test]
fn test_initialize_invalid_bit_rate() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    let config = Configuration {
        bit_rate: BitRateConfig {
            oscillator: Oscillator::MHz8,
            can_speed: CanBaudRate::Kbps1000,
            sjw: 1,
        },
        ..Default::default()
    };

    assert_eq!(Err(CanError::InvalidBitRate), can.initialize(&config, &ExampleClock::default()));
    assert_eq!(State::Faulted(CanError::InvalidBitRate), can.state());
}

#[test]
fn test_operations_require_initialization() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = CanIo::new(SimulatedSpi::new(&chip));

    assert_eq!(Err(CanError::NotInitialized), can.send(&standard(0x100, &[])));
    assert_eq!(Err(CanError::NotInitialized), can.reset_controller(&ExampleClock::default()));
    assert_eq!(Err(CanError::NotInitialized), can.wake(&ExampleClock::default()));
    assert_eq!(Err(CanError::BufferEmpty), can.read());

    // Interrupts are ignored before initialization
    can.on_interrupt();
    assert_eq!(0, can.interrupt_count());
}

#[test]
fn test_send_uses_free_buffers() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let frames = [
        standard(0x100, &[0x01]),
        standard(0x101, &[0x02, 0x03]),
        CanFrame::new(ExtendedId::new(0x1ABC_DEF0).unwrap(), &[0x04; 8]).unwrap(),
    ];

    assert_eq!(Ok(TxBuffer::TXB0), can.send(&frames[0]));
    assert_eq!(Ok(TxBuffer::TXB1), can.send(&frames[1]));
    assert_eq!(Ok(TxBuffer::TXB2), can.send(&frames[2]));

    // All buffers pending, content is left untouched
    assert_eq!(Err(CanError::TransmitBuffersBusy), can.send(&standard(0x200, &[0xFF])));
    assert_eq!(Err(CanError::TransmitBuffersBusy), can.send(&standard(0x201, &[0xFE])));

    for (index, frame) in frames.iter().enumerate() {
        assert!(chip.borrow().tx_pending(index as u8));
        assert_eq!(Some(*frame), chip.borrow().transmit_buffer(index as u8));
    }

    assert_eq!(Some(frames[1]), chip.borrow_mut().complete_transmission(1));
    assert_eq!(Ok(TxBuffer::TXB1), can.send(&standard(0x200, &[0xFF])));
}

#[test]
fn test_send_to_buffer() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let first = standard(0x300, &[0x01]);

    assert_eq!(Ok(()), can.send_to(TxBuffer::TXB2, &first));
    assert!(chip.borrow().tx_pending(2));
    assert!(!chip.borrow().tx_pending(0));

    assert_eq!(
        Err(CanError::TransmitBuffersBusy),
        can.send_to(TxBuffer::TXB2, &standard(0x301, &[0x02]))
    );
    assert_eq!(Some(first), chip.borrow().transmit_buffer(2));

    // Automatic selection skips the pending buffer
    assert_eq!(Ok(TxBuffer::TXB0), can.send(&standard(0x302, &[])));

    chip.borrow_mut().complete_transmission(2);
    assert_eq!(Ok(()), can.send_to(TxBuffer::TXB2, &standard(0x301, &[0x02])));
}

#[test]
fn test_send_verified() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let frame = CanFrame::new_remote(StandardId::new(0x7FF).unwrap(), 4).unwrap();

    assert_eq!(Ok(TxBuffer::TXB0), can.send_verified(&frame));
    assert_eq!(Some(frame), chip.borrow().transmit_buffer(0));
}

#[test]
fn test_send_message() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let drive = DcDrive::from_si(300.0, 0.2);

    assert_eq!(Ok(TxBuffer::TXB0), can.send_message(&drive));
    assert_eq!(Some(drive.encode()), chip.borrow_mut().complete_transmission(0));
}

#[test]
fn test_receive_with_filters() {
    let chip = RefCell::new(SimulatedChip::default());

    let filter = Filter::standard(0x100).unwrap();
    let config = Configuration {
        filters: FilterConfiguration::accept_all()
            .with_rxb0(Mask::standard(0x7FF), [filter; 2])
            .with_rxb1(Mask::standard(0x7FF), [filter; 4]),
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);

    assert!(chip.borrow_mut().receive(&standard(0x100, &[0x01])));
    assert!(!chip.borrow_mut().receive(&standard(0x200, &[0x02])));
    assert!(chip.borrow().interrupt_pending());

    can.on_interrupt();

    assert!(!chip.borrow().interrupt_pending());
    assert_eq!(1, can.available());
    assert_eq!(Ok(standard(0x100, &[0x01])), can.read());
    assert_eq!(Err(CanError::BufferEmpty), can.read());
}

#[test]
fn test_receive_rollover_keeps_order() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    // Second frame rolls over into RXB1
    assert!(chip.borrow_mut().receive(&standard(0x001, &[0x01])));
    assert!(chip.borrow_mut().receive(&standard(0x002, &[0x02])));
    assert!(!chip.borrow_mut().receive(&standard(0x003, &[0x03])));

    can.on_interrupt();

    assert_eq!(Ok(standard(0x001, &[0x01])), can.read());
    assert_eq!(Ok(standard(0x002, &[0x02])), can.read());

    let errors = can.error_status();
    assert!(errors.rx1_overflow);
    assert!(!errors.rx0_overflow);

    // Overflow flag is cleared on the controller, but stays latched locally
    assert_eq!(0x00, chip.borrow().register(EFLG) & 0xC0);
    assert_eq!(0x00, chip.borrow().register(CANINTF));
}

#[test]
fn test_receive_buffer_full_drops_frames() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<2> = initialized(&chip, &Configuration::default());

    for id in 1..=3 {
        assert!(chip.borrow_mut().receive(&standard(id, &[id as u8])));
        can.on_interrupt();
    }

    let errors = can.error_status();
    assert!(errors.rx_buffer_full);
    assert_eq!(1, errors.dropped_frames);

    assert_eq!(2, can.available());
    assert_eq!(Ok(standard(1, &[1])), can.read());
    assert_eq!(Ok(standard(2, &[2])), can.read());
}

#[test]
fn test_priority_frames_first() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        priority: Some(PriorityFilter {
            filter: Filter::standard(0x050).unwrap(),
            mask: Mask::standard(0x7FF),
        }),
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);

    for frame in [standard(0x100, &[]), standard(0x050, &[0xEE]), standard(0x101, &[])] {
        chip.borrow_mut().receive(&frame);
        can.on_interrupt();
    }

    assert_eq!(Ok(standard(0x050, &[0xEE])), can.read());
    assert_eq!(Ok(standard(0x100, &[])), can.read());
    assert_eq!(Ok(standard(0x101, &[])), can.read());
}

#[test]
fn test_priority_frames_keep_arrival_order() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        priority: Some(PriorityFilter {
            filter: Filter::standard(0x010).unwrap(),
            mask: Mask::standard(0x7F0),
        }),
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);

    for id in [0x200, 0x011, 0x012] {
        chip.borrow_mut().receive(&standard(id, &[]));
        can.on_interrupt();
    }

    assert_eq!(3, can.available());

    let order: Vec<u32> = (0..3).map(|_| can.read().unwrap().raw_id()).collect();
    assert_eq!(vec![0x011, 0x012, 0x200], order);
}

#[test]
fn test_receive_message_from_priority_lane() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        priority: Some(PriorityFilter {
            filter: Filter::standard(0x403).unwrap(),
            mask: Mask::standard(0x7FF),
        }),
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);
    let velocity = McVelocity::from_si(-3.5, 120.0);

    for frame in [DcDrive::from_si(100.0, 0.1).encode(), velocity.encode()] {
        chip.borrow_mut().receive(&frame);
        can.on_interrupt();
    }

    // Priority frame is the next frame to read
    assert_eq!(Ok(None), can.receive_message::<DcDrive>());
    assert_eq!(Ok(Some(velocity)), can.receive_message::<McVelocity>());
    assert_eq!(Ok(Some(DcDrive::from_si(100.0, 0.1))), can.receive_message::<DcDrive>());
}

#[test]
fn test_read_newest() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    for id in [0x10, 0x20] {
        chip.borrow_mut().receive(&standard(id, &[]));
        can.on_interrupt();
    }

    assert_eq!(Ok(standard(0x20, &[])), can.read_newest());
    assert_eq!(Ok(standard(0x10, &[])), can.read_newest());
    assert_eq!(Err(CanError::BufferEmpty), can.read_newest());
}

#[test]
fn test_receive_remote_frame() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let frame = CanFrame::new_remote(StandardId::new(0x7FF).unwrap(), 3).unwrap();
    chip.borrow_mut().receive(&frame);
    can.on_interrupt();

    let received = can.read().unwrap();
    assert!(received.is_remote_frame());
    assert_eq!(3, received.dlc());
    assert_eq!(frame, received);
}

#[test]
fn test_receive_message() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let velocity = McVelocity::from_si(25.0, 900.0);
    chip.borrow_mut().receive(&velocity.encode());
    can.on_interrupt();

    // Head carries another identifier and stays queued
    assert_eq!(Ok(None), can.receive_message::<DcDrive>());
    assert_eq!(1, can.available());

    assert_eq!(Ok(Some(velocity)), can.receive_message::<McVelocity>());
    assert_eq!(0, can.available());
}

#[test]
fn test_receive_message_drops_malformed_frame() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    chip.borrow_mut().receive(&standard(0x403, &[0x01, 0x02]));
    can.on_interrupt();

    assert_eq!(Ok(None), can.receive_message::<McVelocity>());
    assert_eq!(0, can.available());
}

#[test]
fn test_error_interrupt() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    chip.borrow_mut().set_error_counters(255, 12);
    assert!(chip.borrow().interrupt_pending());

    can.on_interrupt();

    let errors = can.error_status();
    assert_eq!(255, errors.tec);
    assert_eq!(12, errors.rec);
    assert!(errors.bus_off);
    assert!(errors.high_error_count);
    assert_eq!(0x00, chip.borrow().register(CANINTF) & CanIntf::ERRIF);

    can.clear_errors();
    assert!(!can.error_status().bus_off);
}

#[test]
fn test_fetch_errors() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    chip.borrow_mut().set_error_counters(100, 130);

    let errors = can.fetch_errors().unwrap();
    assert!(errors.warning);
    assert!(errors.error_passive);
    assert!(!errors.bus_off);
    assert_eq!(errors, can.error_status());
}

#[test]
fn test_empty_interrupt() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    can.on_interrupt();

    assert_eq!(1, can.interrupt_count());
    assert!(can.error_status().empty_interrupt);
    assert_eq!(State::Listening, can.state());
}

#[test]
fn test_interrupt_faults_unresponsive_controller() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());
    let clock = ExampleClock::default();

    chip.borrow_mut().receive(&standard(0x100, &[0x01]));
    can.on_interrupt();

    chip.borrow_mut().set_unresponsive(true);
    can.on_interrupt();

    assert_eq!(State::Faulted(CanError::ControllerUnresponsive), can.state());
    assert_eq!(Err(CanError::ControllerUnresponsive), can.read());
    assert_eq!(Err(CanError::ControllerUnresponsive), can.reset_controller(&clock));

    // Controller recovers, queued frames are kept
    chip.borrow_mut().set_unresponsive(false);
    assert_eq!(Ok(()), can.reset_controller(&clock));
    assert_eq!(State::Listening, can.state());
    assert_eq!(Ok(standard(0x100, &[0x01])), can.read());
}

#[test]
fn test_sleep_and_wake() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());
    let clock = ExampleClock::default();

    assert_eq!(Ok(()), can.sleep(&clock));
    assert_eq!(State::Sleeping, can.state());
    assert_eq!(OperationMode::Sleep, chip.borrow().mode());

    assert_eq!(Err(CanError::NotInitialized), can.send(&standard(0x100, &[])));
    can.on_interrupt();
    assert_eq!(0, can.interrupt_count());

    assert_eq!(Ok(()), can.wake(&clock));
    assert_eq!(State::Listening, can.state());
    assert_eq!(OperationMode::Normal, chip.borrow().mode());
    assert_eq!(0x00, chip.borrow().register(CANINTF) & CanIntf::WAKIF);
}

#[test]
fn test_wake_up_by_bus_activity() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        interrupts: InterruptConfiguration {
            wake_up: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);
    let clock = ExampleClock::default();

    assert_eq!(Ok(()), can.sleep(&clock));
    assert!(chip.borrow_mut().bus_activity());
    assert!(chip.borrow().interrupt_pending());
    assert_eq!(OperationMode::ListenOnly, chip.borrow().mode());

    can.on_interrupt();

    assert!(!chip.borrow().interrupt_pending());
    assert_eq!(State::Listening, can.state());
    assert_eq!(OperationMode::Normal, chip.borrow().mode());
    assert_eq!(1, can.interrupt_count());

    // Already awake
    assert_eq!(Ok(()), can.wake(&clock));

    chip.borrow_mut().receive(&standard(0x100, &[0x01]));
    can.on_interrupt();
    assert_eq!(Ok(standard(0x100, &[0x01])), can.read());
}

#[test]
fn test_faulted_controller_releases_interrupt() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    chip.borrow_mut().receive(&standard(0x100, &[0x01]));
    chip.borrow_mut().set_unresponsive(true);
    can.on_interrupt();
    assert_eq!(State::Faulted(CanError::ControllerUnresponsive), can.state());

    // Controller answers again, but the frame is still pending
    chip.borrow_mut().set_unresponsive(false);
    assert!(chip.borrow().interrupt_pending());

    can.on_interrupt();

    assert!(!chip.borrow().interrupt_pending());
    assert_eq!(0x00, chip.borrow().register(CANINTE));
    assert_eq!(State::Faulted(CanError::ControllerUnresponsive), can.state());

    assert_eq!(Ok(()), can.reset_controller(&ExampleClock::default()));
    assert_eq!(0x23, chip.borrow().register(CANINTE));
}

#[test]
fn test_configure_interrupts() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    let interrupts = InterruptConfiguration {
        transmit: true,
        ..Default::default()
    };

    assert_eq!(Ok(()), can.configure_interrupts(interrupts, &ExampleClock::default()));
    assert_eq!(State::Listening, can.state());
    assert_eq!(0x3F, chip.borrow().register(CANINTE));
    assert_eq!(OperationMode::Normal, chip.borrow().mode());
}

#[test]
fn test_abort_transmissions() {
    let chip = RefCell::new(SimulatedChip::default());
    let can: TestIo<8> = initialized(&chip, &Configuration::default());

    can.send(&standard(0x100, &[])).unwrap();
    can.send(&standard(0x101, &[])).unwrap();

    assert_eq!(Ok(()), can.abort_transmissions());
    assert!(!chip.borrow().tx_pending(0));
    assert!(!chip.borrow().tx_pending(1));
    assert_eq!(0x00, chip.borrow().register(CANCTRL) & 0x10);

    assert_eq!(Ok(TxBuffer::TXB0), can.send(&standard(0x102, &[])));
}

#[test]
fn test_loopback() {
    let chip = RefCell::new(SimulatedChip::default());
    let config = Configuration {
        mode: RequestMode::Loopback,
        ..Default::default()
    };

    let can: TestIo<8> = initialized(&chip, &config);
    let frame = CanFrame::new(ExtendedId::new(0x1ABC_DEF0).unwrap(), &[0x01, 0x02, 0x03]).unwrap();

    can.send(&frame).unwrap();
    chip.borrow_mut().complete_transmission(0);
    can.on_interrupt();

    assert_eq!(Ok(frame), can.read());
    assert_eq!(0x00, chip.borrow().register(CANINTF));
    assert_eq!(OperationMode::Loopback, can.fetch_status().unwrap().mode);
}
