//! Shared fakes for capture integration tests.

use std::sync::{Arc, Mutex};

use vidwish_capture::{
    CaptureConfig, CaptureController, CaptureError, MediaConstraints, MediaDevices, MediaRecorder,
};

/// Observable recorder call log shared between the fake and the test body.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct RecorderLog {
    pub opened: u32,
    pub started: u32,
    pub stopped: u32,
    pub released: u32,
    pub last_constraints: Option<MediaConstraints>,
}

/// Fake camera that hands out recorders writing into one [`RecorderLog`].
pub struct FakeDevices {
    pub log: Arc<Mutex<RecorderLog>>,
    pub deny: bool,
    /// Bytes the recorder returns from `stop`.
    pub flush_on_stop: Option<Vec<u8>>,
    /// MIME type the recorder reports.
    pub mime_type: &'static str,
    /// Recorder `start` fails.
    pub fail_start: bool,
    /// Recorder `stop` fails.
    pub fail_stop: bool,
}

impl FakeDevices {
    #[allow(dead_code)]
    pub fn granting() -> Self {
        Self {
            log: Arc::new(Mutex::new(RecorderLog::default())),
            deny: false,
            flush_on_stop: None,
            mime_type: "video/webm",
            fail_start: false,
            fail_stop: false,
        }
    }

    #[allow(dead_code)]
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::granting()
        }
    }
}

impl MediaDevices for FakeDevices {
    fn open(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        let mut log = self.log.lock().expect("log lock should work");
        log.opened += 1;
        log.last_constraints = Some(*constraints);
        if self.deny {
            return Err(CaptureError::PermissionDenied("NotAllowedError".to_string()));
        }
        Ok(Box::new(FakeRecorder {
            log: Arc::clone(&self.log),
            flush_on_stop: self.flush_on_stop.clone(),
            mime_type: self.mime_type,
            fail_start: self.fail_start,
            fail_stop: self.fail_stop,
        }))
    }
}

struct FakeRecorder {
    log: Arc<Mutex<RecorderLog>>,
    flush_on_stop: Option<Vec<u8>>,
    mime_type: &'static str,
    fail_start: bool,
    fail_stop: bool,
}

impl MediaRecorder for FakeRecorder {
    fn mime_type(&self) -> &str {
        self.mime_type
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.log.lock().expect("log lock should work").started += 1;
        if self.fail_start {
            return Err(CaptureError::Recorder("NotSupportedError".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        self.log.lock().expect("log lock should work").stopped += 1;
        if self.fail_stop {
            return Err(CaptureError::Recorder("InvalidStateError".to_string()));
        }
        Ok(self.flush_on_stop.take())
    }

    fn release(&mut self) {
        self.log.lock().expect("log lock should work").released += 1;
    }
}

/// Builds a controller over `devices` with the default 33-second limit.
#[allow(dead_code)]
pub fn controller(devices: FakeDevices) -> (CaptureController, Arc<Mutex<RecorderLog>>) {
    let log = Arc::clone(&devices.log);
    let controller = CaptureController::new(Arc::new(devices), CaptureConfig::default());
    (controller, log)
}
