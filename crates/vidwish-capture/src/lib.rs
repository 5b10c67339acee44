#![warn(missing_docs)]
//! # vidwish-capture
//!
//! ## Purpose
//! Owns the webcam lifecycle, the recording deadline and the chunk buffer.
//!
//! ## Responsibilities
//! - Define backend-agnostic camera and recorder capabilities
//!   ([`MediaDevices`], [`MediaRecorder`]) so the controller runs without a
//!   browser.
//! - Drive the `Idle -> Requesting -> Recording -> Stopped` state machine.
//! - Arm one cancellable 33-second deadline per recording and derive the
//!   countdown from it.
//! - Expose a deterministic synthetic backend for CI and the CLI.
//!
//! ## Data flow
//! Host grants camera -> [`CaptureController::start`] -> recorder data events
//! feed [`CaptureController::on_data_available`] -> manual
//! [`CaptureController::stop`] or deadline [`CaptureController::on_tick`]
//! assembles a [`vidwish_core::MediaBlob`] once.
//!
//! ## Ownership and lifetimes
//! The controller owns the active recorder and the chunk buffer. Blobs are
//! shared immutable buffers, so handing one to the uploader does not copy.
//!
//! ## Error model
//! Blank names, permission denial, recorder failures and illegal transitions
//! are reported as [`CaptureError`]. The human-readable text of the last
//! failure is kept in [`CaptureController::last_error`] until the next
//! successful start.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use vidwish_capture::{CaptureConfig, CaptureController, CaptureState, StopOutcome, SyntheticMediaDevices};
//!
//! let devices = Arc::new(SyntheticMediaDevices::new());
//! let mut controller = CaptureController::new(devices, CaptureConfig::default());
//! controller.start("Alice", 0).unwrap();
//! controller.on_data_available(vec![1, 2, 3]);
//! assert!(matches!(controller.stop(10_000).unwrap(), StopOutcome::Stopped { .. }));
//! assert_eq!(controller.stop(10_001).unwrap(), StopOutcome::AlreadyStopped);
//! assert!(matches!(controller.state(), CaptureState::Stopped { .. }));
//! ```

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vidwish_core::{Chunk, CoreError, MediaBlob, RECORDING_LIMIT_SECS, WEBM_MIME_TYPE};
use vidwish_validate::{ValidationError, validate_display_name};

/// Which camera the browser should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front-facing camera.
    User,
    /// Rear-facing camera.
    Environment,
}

/// Video track constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    /// Ideal frame width in pixels.
    pub width: u32,
    /// Ideal frame height in pixels.
    pub height: u32,
    /// Preferred camera.
    pub facing_mode: FacingMode,
}

/// Constraints passed with every camera and microphone request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Whether to capture a microphone track.
    pub audio: bool,
    /// Video track constraints.
    pub video: VideoConstraints,
    /// Whether the audio track runs echo cancellation.
    pub echo_cancellation: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: VideoConstraints {
                width: 1280,
                height: 720,
                facing_mode: FacingMode::User,
            },
            echo_cancellation: true,
        }
    }
}

/// Capture configuration used by [`CaptureController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Constraints for the camera request.
    pub constraints: MediaConstraints,
    /// Recording length limit in seconds.
    pub limit_secs: u32,
}

impl CaptureConfig {
    /// Creates validated capture configuration.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidLimit`] when `limit_secs == 0`.
    pub fn new(constraints: MediaConstraints, limit_secs: u32) -> Result<Self, CaptureError> {
        if limit_secs == 0 {
            return Err(CaptureError::InvalidLimit);
        }
        Ok(Self {
            constraints,
            limit_secs,
        })
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::default(),
            limit_secs: RECORDING_LIMIT_SECS,
        }
    }
}

/// Camera/microphone capability (the browser's `getUserMedia`).
pub trait MediaDevices: Send + Sync {
    /// Requests camera and microphone access and returns a recorder bound to
    /// the granted stream.
    ///
    /// # Errors
    /// Returns [`CaptureError::PermissionDenied`] when the visitor refuses
    /// access or no device satisfies the constraints.
    fn open(&self, constraints: &MediaConstraints) -> Result<Box<dyn MediaRecorder>, CaptureError>;
}

/// Recorder bound to one granted media stream.
pub trait MediaRecorder: Send {
    /// Container MIME type of emitted chunks.
    fn mime_type(&self) -> &str;

    /// Starts encoding.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stops encoding and returns any data flushed after the last data event.
    fn stop(&mut self) -> Result<Option<Vec<u8>>, CaptureError>;

    /// Releases the camera and microphone tracks.
    fn release(&mut self);
}

/// One cancellable deadline per recording.
///
/// The countdown display and the automatic stop both read this deadline, so
/// only one scheduled action exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingTimer {
    limit_ms: u64,
    deadline_ms: Option<u64>,
}

impl RecordingTimer {
    /// Creates a disarmed timer for `limit_secs`.
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_ms: u64::from(limit_secs) * 1_000,
            deadline_ms: None,
        }
    }

    /// Arms the deadline `limit` after `now_ms`, replacing any previous one.
    pub fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(self.limit_ms));
    }

    /// Cancels the pending deadline.
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    /// Returns `true` while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Returns `true` when the armed deadline has been reached.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    /// Remaining whole seconds, rounded up; the full limit when disarmed.
    pub fn remaining_secs(&self, now_ms: u64) -> u32 {
        let Some(deadline) = self.deadline_ms else {
            return (self.limit_ms / 1_000) as u32;
        };
        let remaining_ms = deadline.saturating_sub(now_ms);
        remaining_ms.div_ceil(1_000) as u32
    }

    /// Configured limit in milliseconds.
    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }
}

/// Ordered, append-only chunk buffer for one recording session.
#[derive(Debug, Clone, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Chunk>,
    total_bytes: usize,
}

impl ChunkBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one chunk.
    pub fn push(&mut self, chunk: Chunk) {
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
    }

    /// Drops every buffered chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Number of buffered chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` when no chunk is buffered.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total buffered bytes.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Assembles the full buffer into one playable blob.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyMimeType`] when `mime_type` is blank.
    pub fn assemble(&self, mime_type: &str) -> Result<MediaBlob, CoreError> {
        MediaBlob::from_chunks(mime_type, &self.chunks)
    }
}

/// Capture state machine states.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    /// No camera held.
    Idle,
    /// Camera permission request in flight; only held inside `start`.
    Requesting,
    /// Recorder running.
    Recording {
        /// Recording start time in epoch milliseconds.
        started_at_ms: u64,
    },
    /// Recording finished; holds the frozen capture result.
    Stopped {
        /// Assembled media.
        blob: MediaBlob,
        /// Recorded length in seconds.
        duration_secs: f64,
    },
}

impl CaptureState {
    fn label(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Requesting => "requesting",
            CaptureState::Recording { .. } => "recording",
            CaptureState::Stopped { .. } => "stopped",
        }
    }
}

/// Why a recording ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Visitor pressed stop.
    Manual,
    /// The recording deadline fired.
    TimeLimit,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// This call ended the recording.
    Stopped {
        /// What ended it.
        reason: StopReason,
    },
    /// A previous call already ended the recording.
    AlreadyStopped,
    /// Nothing was recording.
    NotRecording,
}

/// Camera, timer and buffer owner for one booth.
pub struct CaptureController {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    recorder: Option<Box<dyn MediaRecorder>>,
    mime_type: String,
    buffer: ChunkBuffer,
    timer: RecordingTimer,
    state: CaptureState,
    last_error: Option<String>,
}

impl CaptureController {
    /// Creates an idle controller.
    pub fn new(devices: Arc<dyn MediaDevices>, config: CaptureConfig) -> Self {
        Self {
            devices,
            constraints: config.constraints,
            recorder: None,
            mime_type: WEBM_MIME_TYPE.to_string(),
            buffer: ChunkBuffer::new(),
            timer: RecordingTimer::new(config.limit_secs),
            state: CaptureState::Idle,
            last_error: None,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Human-readable text of the last failed start, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clears the stored failure message.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Returns `true` while the recorder runs.
    pub fn is_recording(&self) -> bool {
        matches!(self.state, CaptureState::Recording { .. })
    }

    /// Remaining countdown seconds.
    pub fn countdown(&self, now_ms: u64) -> u32 {
        self.timer.remaining_secs(now_ms)
    }

    /// Number of chunks buffered in this session.
    pub fn buffered_chunks(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes buffered in this session.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.total_bytes()
    }

    /// The frozen capture result, when stopped.
    pub fn blob(&self) -> Option<&MediaBlob> {
        match &self.state {
            CaptureState::Stopped { blob, .. } => Some(blob),
            _ => None,
        }
    }

    /// Recorded length in seconds, when stopped.
    pub fn recorded_duration_secs(&self) -> Option<f64> {
        match &self.state {
            CaptureState::Stopped { duration_secs, .. } => Some(*duration_secs),
            _ => None,
        }
    }

    /// Acquires the camera and starts a timed recording.
    ///
    /// `Requesting` is held only while [`MediaDevices::open`] runs. With the
    /// blocking capability traits no caller sees it after `start` returns;
    /// it marks the in-flight prompt for backends that log or inspect state.
    /// A recorder reporting a blank MIME type is treated as WebM.
    ///
    /// # Errors
    /// - [`CaptureError::Validation`] for a blank name; state stays `Idle`.
    /// - [`CaptureError::PermissionDenied`] when access is refused; state
    ///   returns to `Idle`.
    /// - [`CaptureError::Recorder`] when the recorder fails to start.
    /// - [`CaptureError::InvalidTransition`] outside `Idle`.
    pub fn start(&mut self, display_name: &str, now_ms: u64) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::InvalidTransition {
                from: self.state.label(),
                action: "start",
            });
        }

        if let Err(error) = validate_display_name(display_name) {
            self.last_error = Some(error.to_string());
            return Err(CaptureError::Validation(error));
        }

        self.state = CaptureState::Requesting;
        let mut recorder = match self.devices.open(&self.constraints) {
            Ok(recorder) => recorder,
            Err(error) => {
                warn!("capture permission_request failed: {error}");
                self.state = CaptureState::Idle;
                self.last_error = Some(error.to_string());
                return Err(error);
            }
        };

        if let Err(error) = recorder.start() {
            warn!("capture recorder_start failed: {error}");
            recorder.release();
            self.state = CaptureState::Idle;
            self.last_error = Some(error.to_string());
            return Err(error);
        }

        let mime_type = recorder.mime_type().trim();
        self.mime_type = if mime_type.is_empty() {
            WEBM_MIME_TYPE.to_string()
        } else {
            mime_type.to_string()
        };
        self.recorder = Some(recorder);
        self.buffer.clear();
        self.timer.arm(now_ms);
        self.state = CaptureState::Recording {
            started_at_ms: now_ms,
        };
        self.last_error = None;
        info!(
            "capture recording_started limit_ms={} mime={}",
            self.timer.limit_ms(),
            self.mime_type
        );
        Ok(())
    }

    /// Recorder data-available callback.
    ///
    /// Returns `true` when the data was buffered. Empty payloads and data
    /// arriving outside `Recording` are dropped.
    pub fn on_data_available(&mut self, bytes: Vec<u8>) -> bool {
        if !self.is_recording() {
            debug!(
                "capture data_dropped state={} bytes={}",
                self.state.label(),
                bytes.len()
            );
            return false;
        }

        match Chunk::new(bytes) {
            Ok(chunk) => {
                self.buffer.push(chunk);
                true
            }
            Err(_) => false,
        }
    }

    /// Fires the automatic stop once the deadline is due.
    ///
    /// # Errors
    /// Propagates blob assembly failures from the stop path.
    pub fn on_tick(&mut self, now_ms: u64) -> Result<Option<StopOutcome>, CaptureError> {
        if self.is_recording() && self.timer.is_due(now_ms) {
            return self.finish(now_ms, StopReason::TimeLimit).map(Some);
        }
        Ok(None)
    }

    /// Stops the recording. Safe to call repeatedly.
    ///
    /// # Errors
    /// Propagates blob assembly failures; the controller is then back in
    /// `Idle` with [`Self::last_error`] set.
    pub fn stop(&mut self, now_ms: u64) -> Result<StopOutcome, CaptureError> {
        match self.state {
            CaptureState::Recording { .. } => self.finish(now_ms, StopReason::Manual),
            CaptureState::Stopped { .. } => Ok(StopOutcome::AlreadyStopped),
            CaptureState::Idle | CaptureState::Requesting => Ok(StopOutcome::NotRecording),
        }
    }

    /// Discards the capture result and returns to `Idle`.
    ///
    /// # Errors
    /// Returns [`CaptureError::InvalidTransition`] while a recording runs.
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        match self.state {
            CaptureState::Stopped { .. } => {
                self.buffer.clear();
                self.state = CaptureState::Idle;
                debug!("capture reset");
                Ok(())
            }
            CaptureState::Idle => Ok(()),
            CaptureState::Requesting | CaptureState::Recording { .. } => {
                Err(CaptureError::InvalidTransition {
                    from: self.state.label(),
                    action: "reset",
                })
            }
        }
    }

    fn finish(&mut self, now_ms: u64, reason: StopReason) -> Result<StopOutcome, CaptureError> {
        let CaptureState::Recording { started_at_ms } = self.state else {
            return Ok(StopOutcome::AlreadyStopped);
        };
        self.timer.cancel();

        if let Some(mut recorder) = self.recorder.take() {
            match recorder.stop() {
                Ok(Some(flushed)) => {
                    if let Ok(chunk) = Chunk::new(flushed) {
                        self.buffer.push(chunk);
                    }
                }
                Ok(None) => {}
                Err(error) => warn!("capture recorder_stop failed: {error}"),
            }
            recorder.release();
        }

        let elapsed_ms = now_ms
            .saturating_sub(started_at_ms)
            .min(self.timer.limit_ms());
        let blob = match self.buffer.assemble(&self.mime_type) {
            Ok(blob) => blob,
            Err(error) => {
                warn!("capture blob_assembly failed: {error}");
                self.buffer.clear();
                self.state = CaptureState::Idle;
                self.last_error = Some(error.to_string());
                return Err(error.into());
            }
        };
        info!(
            "capture recording_stopped reason={reason:?} chunks={} bytes={} elapsed_ms={elapsed_ms}",
            self.buffer.len(),
            blob.len()
        );

        self.state = CaptureState::Stopped {
            blob,
            duration_secs: elapsed_ms as f64 / 1_000.0,
        };
        Ok(StopOutcome::Stopped { reason })
    }
}

/// Deterministic camera backend for test and CI usage.
#[derive(Debug)]
pub struct SyntheticMediaDevices {
    grant: bool,
    requests: Mutex<u64>,
}

impl SyntheticMediaDevices {
    /// Creates a backend that grants every request.
    pub fn new() -> Self {
        Self {
            grant: true,
            requests: Mutex::new(0),
        }
    }

    /// Creates a backend that refuses every request.
    pub fn denying() -> Self {
        Self {
            grant: false,
            requests: Mutex::new(0),
        }
    }

    /// Number of permission requests seen so far.
    pub fn request_count(&self) -> u64 {
        self.requests.lock().map(|count| *count).unwrap_or(0)
    }
}

impl Default for SyntheticMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDevices for SyntheticMediaDevices {
    fn open(&self, _constraints: &MediaConstraints) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| CaptureError::Recorder("synthetic request lock poisoned".to_string()))?;
        *requests += 1;

        if !self.grant {
            return Err(CaptureError::PermissionDenied(
                "synthetic backend refuses access".to_string(),
            ));
        }
        Ok(Box::new(SyntheticRecorder))
    }
}

struct SyntheticRecorder;

impl MediaRecorder for SyntheticRecorder {
    fn mime_type(&self) -> &str {
        WEBM_MIME_TYPE
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        Ok(None)
    }

    fn release(&mut self) {}
}

/// Builds the deterministic payload a synthetic recorder emits for tick
/// `sequence`.
pub fn synthetic_chunk(sequence: u64, len: usize) -> Vec<u8> {
    vec![(sequence % 255) as u8 + 1; len]
}

/// Capture layer error type.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Recording limit must be positive.
    #[error("invalid recording limit: must be greater than zero")]
    InvalidLimit,
    /// Input gate failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Camera or microphone access refused.
    #[error("camera or microphone access was denied: {0}")]
    PermissionDenied(String),
    /// Recorder runtime failure.
    #[error("recorder failure: {0}")]
    Recorder(String),
    /// Action not legal in the current state.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// State label at the time of the call.
        from: &'static str,
        /// Rejected action.
        action: &'static str,
    },
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for the deadline and buffer primitives.

    use super::*;

    #[test]
    fn countdown_runs_from_limit_to_zero() {
        let mut timer = RecordingTimer::new(33);
        assert_eq!(timer.remaining_secs(5_000), 33);

        timer.arm(1_000);
        assert_eq!(timer.remaining_secs(1_000), 33);
        assert_eq!(timer.remaining_secs(1_500), 33);
        assert_eq!(timer.remaining_secs(2_000), 32);
        assert_eq!(timer.remaining_secs(33_999), 1);
        assert!(!timer.is_due(33_999));
        assert!(timer.is_due(34_000));
        assert_eq!(timer.remaining_secs(40_000), 0);

        timer.cancel();
        assert!(!timer.is_due(40_000));
    }

    #[test]
    fn buffer_tracks_bytes_and_clears() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Chunk::new(vec![1, 2]).unwrap());
        buffer.push(Chunk::new(vec![3]).unwrap());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_bytes(), 3);
        assert_eq!(buffer.assemble(WEBM_MIME_TYPE).unwrap().bytes(), &[1, 2, 3]);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_bytes(), 0);
    }

    #[test]
    fn synthetic_backend_counts_requests() {
        let devices = SyntheticMediaDevices::denying();
        assert!(devices.open(&MediaConstraints::default()).is_err());
        assert_eq!(devices.request_count(), 1);
    }
}
