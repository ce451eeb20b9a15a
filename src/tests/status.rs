use crate::status::{
    ControllerStatus, ErrorStatus, InterruptCode, OperationMode, OperationStatus, ReceivedMessageType, RxStatus,
};

#[test]
fn test_operation_status_from_register() {
    assert_eq!(OperationMode::Normal, OperationStatus::from_register(0b0000_0000).mode);
    assert_eq!(OperationMode::Sleep, OperationStatus::from_register(0b0010_0000).mode);
    assert_eq!(OperationMode::Loopback, OperationStatus::from_register(0b0100_0000).mode);
    assert_eq!(OperationMode::ListenOnly, OperationStatus::from_register(0b0110_0000).mode);
    assert_eq!(OperationMode::Configuration, OperationStatus::from_register(0b1000_0000).mode);

    // Reserved values
    assert_eq!(OperationMode::Configuration, OperationStatus::from_register(0b1010_0000).mode);
    assert_eq!(OperationMode::Configuration, OperationStatus::from_register(0b1110_0000).mode);
}

#[test]
fn test_operation_status_interrupt_code() {
    assert_eq!(InterruptCode::None, OperationStatus::from_register(0b1000_0000).interrupt_code);
    assert_eq!(InterruptCode::Error, OperationStatus::from_register(0b0000_0010).interrupt_code);
    assert_eq!(InterruptCode::TxBuffer1, OperationStatus::from_register(0b0000_1000).interrupt_code);
    assert_eq!(InterruptCode::RxBuffer0, OperationStatus::from_register(0b0000_1100).interrupt_code);
    assert_eq!(InterruptCode::RxBuffer1, OperationStatus::from_register(0b0000_1110).interrupt_code);
}

#[test]
fn test_controller_status_from_register() {
    let status = ControllerStatus::from_register(0b0000_0001);
    assert!(status.rx0_full);
    assert!(!status.rx1_full);
    assert!(!status.is_idle());

    let status = ControllerStatus::from_register(0b0101_0100);
    assert_eq!([true, true, true], status.tx_pending);
    assert_eq!([false, false, false], status.tx_done);
    assert!(status.is_idle());

    let status = ControllerStatus::from_register(0b1000_0000);
    assert_eq!([false, false, true], status.tx_done);
}

#[test]
fn test_controller_status_free_tx_buffer() {
    assert_eq!(Some(0), ControllerStatus::from_register(0x0).free_tx_buffer());
    assert_eq!(Some(1), ControllerStatus::from_register(0b0000_0100).free_tx_buffer());
    assert_eq!(Some(2), ControllerStatus::from_register(0b0001_0100).free_tx_buffer());
    assert_eq!(Some(0), ControllerStatus::from_register(0b0101_0000).free_tx_buffer());
    assert_eq!(None, ControllerStatus::from_register(0b0101_0100).free_tx_buffer());
}

#[test]
fn test_controller_status_saturated() {
    assert!(ControllerStatus::from_register(0xFF).is_saturated());
    assert!(!ControllerStatus::from_register(0xFE).is_saturated());
    assert!(!ControllerStatus::from_register(0x0).is_saturated());
}

#[test]
fn test_rx_status_from_register() {
    let status = RxStatus::from_register(0b0100_0001);
    assert!(status.rx0_full);
    assert!(!status.rx1_full);
    assert_eq!(ReceivedMessageType::StandardData, status.message_type);
    assert_eq!(1, status.filter_match);

    let status = RxStatus::from_register(0b1001_1110);
    assert!(!status.rx0_full);
    assert!(status.rx1_full);
    assert_eq!(ReceivedMessageType::ExtendedRemote, status.message_type);
    assert_eq!(6, status.filter_match);

    let status = RxStatus::from_register(0b1100_1000);
    assert_eq!(ReceivedMessageType::StandardRemote, status.message_type);
}

#[test]
fn test_error_status_from_registers() {
    let mut status = ErrorStatus::default();
    status.update_from_registers(0b0001_0101, 130, 12);

    assert_eq!(130, status.tec);
    assert_eq!(12, status.rec);
    assert!(status.warning);
    assert!(status.error_passive);
    assert!(!status.bus_off);
    assert!(!status.high_error_count);
}

#[test]
fn test_error_status_high_error_count() {
    let mut status = ErrorStatus::default();

    status.update_from_registers(0x0, 0, ErrorStatus::HIGH_ERROR_COUNT);
    assert!(!status.high_error_count);

    status.update_from_registers(0x0, 0, ErrorStatus::HIGH_ERROR_COUNT + 1);
    assert!(status.high_error_count);

    // Bus-off counts as high error count, even with cleared counters
    status.update_from_registers(0b0010_0000, 0, 0);
    assert!(status.bus_off);
    assert!(status.high_error_count);
}

#[test]
fn test_error_status_overflow_is_latched() {
    let mut status = ErrorStatus::default();

    status.update_from_registers(0b0100_0000, 0, 0);
    status.update_from_registers(0b0000_0000, 0, 0);

    assert!(status.rx0_overflow);
    assert!(!status.rx1_overflow);
    assert!(!status.warning);
}
