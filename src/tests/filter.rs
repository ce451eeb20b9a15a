use crate::can::{CanError, RxBuffer, MCP2515};
use crate::example::{ExampleClock, SimulatedChip, SimulatedSpi};
use crate::filter::{Filter, FilterConfiguration, Mask};
use crate::registers::{RXF0SIDH, RXF1SIDH, RXM0SIDH, RXM1SIDH};
use crate::status::OperationMode;
use core::cell::RefCell;
use embedded_can::{ExtendedId, Id, StandardId};

fn standard(id: u16) -> Id {
    Id::Standard(StandardId::new(id).unwrap())
}

fn extended(id: u32) -> Id {
    Id::Extended(ExtendedId::new(id).unwrap())
}

#[test]
fn test_mask_standard() {
    let mask = Mask::standard(0x7FF);

    assert_eq!(0x1FFC_0000, mask.bits());
    assert_eq!([0xFF, 0xE0, 0x00, 0x00], mask.registers());
}

#[test]
fn test_mask_extended() {
    let mask = Mask::extended(0xFFFF_FFFF);

    assert_eq!(0x1FFF_FFFF, mask.bits());
    assert_eq!([0xFF, 0xE3, 0xFF, 0xFF], mask.registers());
}

#[test]
fn test_filter_identifier_range() {
    assert!(Filter::standard(0x7FF).is_some());
    assert!(Filter::standard(0x800).is_none());
    assert!(Filter::extended(0x1FFF_FFFF).is_some());
    assert!(Filter::extended(0x2000_0000).is_none());
}

#[test]
fn test_filter_registers() {
    assert_eq!([0x24, 0x60, 0x00, 0x00], Filter::standard(0x123).unwrap().registers());
    assert_eq!([0x91, 0xA8, 0x56, 0x78], Filter::extended(0x1234_5678).unwrap().registers());
}

#[test]
fn test_filter_matches_standard() {
    let filter = Filter::standard(0x100).unwrap();
    let mask = Mask::standard(0x7F0);

    assert!(filter.matches(&mask, standard(0x100)));
    assert!(filter.matches(&mask, standard(0x10F)));
    assert!(!filter.matches(&mask, standard(0x110)));

    // Format is always compared
    assert!(!filter.matches(&Mask::NONE, extended(0x100)));
}

#[test]
fn test_filter_matches_extended() {
    let filter = Filter::extended(0x1234_5600).unwrap();
    let mask = Mask::extended(0x1FFF_FF00);

    assert!(filter.matches(&mask, extended(0x1234_56FF)));
    assert!(!filter.matches(&mask, extended(0x1234_5700)));
    assert!(!filter.matches(&mask, standard(0x123)));
}

#[test]
fn test_accept_all() {
    let config = FilterConfiguration::accept_all();

    assert_eq!(Some(0), config.accepts(standard(0x7FF)));
    assert_eq!(Some(1), config.accepts(extended(0x1FFF_FFFF)));
}

#[test]
fn test_accepts_first_matching_filter() {
    let config = FilterConfiguration::accept_all()
        .with_rxb0(Mask::standard(0x7FF), [Filter::standard(0x100).unwrap(); 2])
        .with_rxb1(Mask::standard(0x7FF), [Filter::standard(0x200).unwrap(); 4]);

    assert_eq!(Some(0), config.accepts(standard(0x100)));
    assert_eq!(Some(2), config.accepts(standard(0x200)));
    assert_eq!(None, config.accepts(standard(0x300)));
    assert_eq!(None, config.accepts(extended(0x100)));
}

#[test]
fn test_rx_buffer_of_filter() {
    assert_eq!(Some(RxBuffer::RXB0), FilterConfiguration::rx_buffer(1));
    assert_eq!(Some(RxBuffer::RXB1), FilterConfiguration::rx_buffer(2));
    assert_eq!(Some(RxBuffer::RXB1), FilterConfiguration::rx_buffer(5));
    assert_eq!(None, FilterConfiguration::rx_buffer(6));
}

#[test]
fn test_apply_writes_registers() {
    let chip = RefCell::new(SimulatedChip::default());
    let mut controller = MCP2515::<_, ExampleClock>::new(SimulatedSpi::new(&chip));

    let config = FilterConfiguration::accept_all()
        .with_rxb0(
            Mask::standard(0x7FF),
            [Filter::standard(0x123).unwrap(), Filter::extended(0x1234_5678).unwrap()],
        )
        .with_rxb1(Mask::extended(0x1FFF_FFFF), [Filter::standard(0x200).unwrap(); 4]);

    assert_eq!(Ok(()), config.apply(&mut controller));

    let chip = chip.borrow();
    assert_eq!(0xFF, chip.register(RXM0SIDH));
    assert_eq!(0xE0, chip.register(RXM0SIDH + 1));
    assert_eq!(0xE3, chip.register(RXM1SIDH + 1));
    assert_eq!(0x24, chip.register(RXF0SIDH));
    assert_eq!(0xA8, chip.register(RXF1SIDH + 1));
    assert_eq!(0x78, chip.register(RXF1SIDH + 3));
}

#[test]
fn test_apply_outside_configuration_mode() {
    let chip = RefCell::new(SimulatedChip::default());
    let clock = ExampleClock::default();
    let mut controller = MCP2515::new(SimulatedSpi::new(&chip));

    controller.set_mode(OperationMode::Normal, &clock).unwrap();

    let config = FilterConfiguration::accept_all().with_rxb0(Mask::standard(0x7FF), [Filter::standard(0x100).unwrap(); 2]);

    assert_eq!(Err(CanError::ConfigurationRejected), config.apply(&mut controller));
}
