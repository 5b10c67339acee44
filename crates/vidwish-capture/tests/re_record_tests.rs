//! Integration tests for re-recording after a finished session.

mod common;

use vidwish_capture::{CaptureError, CaptureState};

#[test]
fn re_record_tests_reset_discards_previous_chunks() {
    let (mut controller, _log) = common::controller(common::FakeDevices::granting());
    controller.start("Alice", 0).expect("first start should succeed");
    controller.on_data_available(vec![1, 1, 1]);
    controller.stop(5_000).expect("first stop should succeed");
    assert_eq!(controller.blob().expect("blob after stop").bytes(), &[1, 1, 1]);

    assert!(matches!(
        controller.start("Alice", 6_000),
        Err(CaptureError::InvalidTransition { .. })
    ));

    controller.reset().expect("reset should succeed");
    assert_eq!(controller.state(), &CaptureState::Idle);
    assert_eq!(controller.buffered_chunks(), 0);
    assert!(controller.blob().is_none());

    controller.start("Alice", 10_000).expect("second start should succeed");
    controller.on_data_available(vec![2, 2]);
    controller.stop(15_000).expect("second stop should succeed");
    assert_eq!(controller.blob().expect("blob after stop").bytes(), &[2, 2]);
}

#[test]
fn re_record_tests_reset_is_rejected_while_recording() {
    let (mut controller, _log) = common::controller(common::FakeDevices::granting());
    controller.start("Alice", 0).expect("start should succeed");
    assert!(matches!(
        controller.reset(),
        Err(CaptureError::InvalidTransition { action: "reset", .. })
    ));
    assert!(controller.is_recording());
}
