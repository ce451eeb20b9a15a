use crate::frame::{CanFrame, BUFFER_LENGTH};
use embedded_can::{ExtendedId, Frame, Id, StandardId};

#[test]
fn test_new_payload_length() {
    let id = StandardId::new(0x100).unwrap();

    assert!(CanFrame::new(id, &[0u8; 8]).is_some());
    assert!(CanFrame::new(id, &[0u8; 9]).is_none());
    assert!(CanFrame::new_remote(id, 8).is_some());
    assert!(CanFrame::new_remote(id, 9).is_none());
}

#[test]
fn test_remote_frame_has_no_data() {
    let frame = CanFrame::new_remote(StandardId::new(0x100).unwrap(), 4).unwrap();

    assert!(frame.is_remote_frame());
    assert!(!frame.is_data_frame());
    assert_eq!(4, frame.dlc());
    assert!(frame.data().is_empty());
}

#[test]
fn test_raw_id() {
    let standard = CanFrame::new(StandardId::new(0x7FF).unwrap(), &[]).unwrap();
    let extended = CanFrame::new(ExtendedId::new(0x1FFF_FFFF).unwrap(), &[]).unwrap();

    assert_eq!(0x7FF, standard.raw_id());
    assert_eq!(0x1FFF_FFFF, extended.raw_id());
    assert!(extended.is_extended());
}

#[test]
fn test_header_registers_standard() {
    let frame = CanFrame::new(StandardId::new(0x123).unwrap(), &[0x01, 0x02]).unwrap();

    assert_eq!([0x24, 0x60, 0x00, 0x00, 0x02], frame.header_registers());
    assert_eq!(7, frame.load_length());
}

#[test]
fn test_header_registers_extended_remote() {
    let frame = CanFrame::new_remote(ExtendedId::new(0x1234_5678).unwrap(), 3).unwrap();

    assert_eq!([0x91, 0xA8, 0x56, 0x78, 0x43], frame.header_registers());
    assert_eq!(5, frame.load_length());
}

#[test]
fn test_buffer_registers() {
    let frame = CanFrame::new(StandardId::new(0x001).unwrap(), &[0xAA, 0xBB, 0xCC]).unwrap();

    let mut expected = [0u8; BUFFER_LENGTH];
    expected[..8].copy_from_slice(&[0x00, 0x20, 0x00, 0x00, 0x03, 0xAA, 0xBB, 0xCC]);

    assert_eq!(expected, frame.buffer_registers());
}

#[test]
fn test_from_registers_standard() {
    let mut registers = [0u8; BUFFER_LENGTH];
    registers[..7].copy_from_slice(&[0x24, 0x60, 0x00, 0x00, 0x02, 0xDE, 0xAD]);

    let frame = CanFrame::from_registers(&registers).unwrap();

    assert_eq!(Id::Standard(StandardId::new(0x123).unwrap()), frame.id());
    assert!(!frame.is_remote_frame());
    assert_eq!(&[0xDE, 0xAD], frame.data());
}

#[test]
fn test_from_registers_standard_remote() {
    let mut registers = [0u8; BUFFER_LENGTH];
    // SRR set, DLC carries no RTR bit in receive buffers
    registers[..5].copy_from_slice(&[0x24, 0x70, 0x00, 0x00, 0x02]);
    registers[5] = 0xFF;

    let frame = CanFrame::from_registers(&registers).unwrap();

    assert!(frame.is_remote_frame());
    assert_eq!(2, frame.dlc());
    assert_eq!(CanFrame::new_remote(StandardId::new(0x123).unwrap(), 2).unwrap(), frame);
}

#[test]
fn test_from_registers_extended() {
    let mut registers = [0u8; BUFFER_LENGTH];
    registers[..6].copy_from_slice(&[0x91, 0xA8, 0x56, 0x78, 0x01, 0x42]);

    let frame = CanFrame::from_registers(&registers).unwrap();

    assert_eq!(Id::Extended(ExtendedId::new(0x1234_5678).unwrap()), frame.id());
    assert_eq!(&[0x42], frame.data());

    registers[4] = 0x41;
    assert!(CanFrame::from_registers(&registers).unwrap().is_remote_frame());
}

#[test]
fn test_from_registers_clamps_dlc() {
    let mut registers = [0x11u8; BUFFER_LENGTH];
    registers[..5].copy_from_slice(&[0x24, 0x60, 0x00, 0x00, 0x0F]);

    let frame = CanFrame::from_registers(&registers).unwrap();

    assert_eq!(8, frame.dlc());
    assert_eq!(&[0x11; 8], frame.data());
}
