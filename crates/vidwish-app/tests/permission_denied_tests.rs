//! Integration tests for refused camera access.

mod common;

use std::sync::Arc;

use vidwish_app::AppError;
use vidwish_capture::{CaptureError, CaptureState, SyntheticMediaDevices};
use vidwish_ui::Notice;

#[test]
fn permission_denied_tests_alert_and_idle_state() {
    let devices = Arc::new(SyntheticMediaDevices::denying());
    let store = Arc::new(common::CountingStore::default());
    let mut session = common::session_with(
        devices.clone(),
        store,
        Arc::new(common::FixedProbe::new(Some(33.0))),
    );
    session.set_name("Alice");

    assert!(matches!(
        session.start_capture(0),
        Err(AppError::Capture(CaptureError::PermissionDenied(_)))
    ));
    assert_eq!(devices.request_count(), 1);
    assert_eq!(session.capture().state(), &CaptureState::Idle);
    assert!(session.capture().last_error().is_some());

    let notice = session.next_alert().expect("an alert should be queued");
    assert!(matches!(notice, Notice::PermissionDenied(_)));
    assert!(notice.message().contains("camera and microphone"));
    assert!(session.controls(0).start_enabled);
}
