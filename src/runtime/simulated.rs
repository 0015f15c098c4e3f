//! Stand-in providers
//!
//! Two families live here:
//! - recording fakes (`RecordingNarration`, `RecordingCamera`) that only log
//!   calls and never emit signals; tests feed signals by hand
//! - tokio-backed simulations (`SimulatedNarrator`, `SimulatedCamera`) that
//!   emit signals onto a session's event channel after a delay, giving the
//!   CLI and driver tests something that behaves like a real device
//!
//! Both fakes are cheap to clone and share their log, so a test can keep a
//! handle after handing the provider to a `Session`.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::{NarrationError, NarrationResult, PermissionError, PermissionResult};
use super::narration::{NarrationProvider, NarrationSignal, Utterance, Voice};
use super::permission::{
    CameraConstraints, DenialReason, PermissionOutcome, PermissionProvider, VideoHandle,
};
use super::session::ActivityEvent;
use super::turn::RequestId;

#[derive(Debug, Default)]
struct NarrationLog {
    voices: Vec<Voice>,
    unsupported: bool,
    failing: bool,
    spoken: Vec<Utterance>,
    cancels: usize,
}

/// Speech provider that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingNarration {
    log: Arc<Mutex<NarrationLog>>,
}

impl RecordingNarration {
    /// Recorder offering `voices`
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let recorder = Self::default();
        recorder.log.lock().voices = voices;
        recorder
    }

    /// Recorder that reports speech as unavailable
    pub fn unsupported() -> Self {
        let recorder = Self::default();
        recorder.log.lock().unsupported = true;
        recorder
    }

    /// Make every later `speak` fail
    pub fn fail_next_speaks(&self) {
        self.log.lock().failing = true;
    }

    /// Every utterance handed over so far
    pub fn spoken(&self) -> Vec<Utterance> {
        self.log.lock().spoken.clone()
    }

    /// Most recent utterance
    pub fn last(&self) -> Option<Utterance> {
        self.log.lock().spoken.last().cloned()
    }

    /// Number of `cancel` calls
    pub fn cancel_count(&self) -> usize {
        self.log.lock().cancels
    }
}

impl NarrationProvider for RecordingNarration {
    fn is_supported(&self) -> bool {
        !self.log.lock().unsupported
    }

    fn voices(&self) -> Vec<Voice> {
        self.log.lock().voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()> {
        let mut log = self.log.lock();
        if log.failing {
            return Err(NarrationError::Engine("synthesis-unavailable".into()));
        }
        log.spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.lock().cancels += 1;
    }
}

#[derive(Debug, Default)]
struct CameraLog {
    requests: Vec<(RequestId, CameraConstraints)>,
    released: Vec<VideoHandle>,
    failing: bool,
}

/// Camera provider that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingCamera {
    log: Arc<Mutex<CameraLog>>,
}

impl RecordingCamera {
    /// Recorder whose requests cannot be issued
    pub fn broken() -> Self {
        let recorder = Self::default();
        recorder.log.lock().failing = true;
        recorder
    }

    /// Let later requests through again
    pub fn repair(&self) {
        self.log.lock().failing = false;
    }

    /// Requests issued so far
    pub fn requests(&self) -> Vec<(RequestId, CameraConstraints)> {
        self.log.lock().requests.clone()
    }

    /// Id of the latest request
    pub fn last_request(&self) -> Option<RequestId> {
        self.log.lock().requests.last().map(|(id, _)| *id)
    }

    /// Handles released so far
    pub fn released(&self) -> Vec<VideoHandle> {
        self.log.lock().released.clone()
    }
}

impl PermissionProvider for RecordingCamera {
    fn request_access(
        &mut self,
        request: RequestId,
        constraints: &CameraConstraints,
    ) -> PermissionResult<()> {
        let mut log = self.log.lock();
        if log.failing {
            return Err(PermissionError::Provider("no media devices".into()));
        }
        log.requests.push((request, constraints.clone()));
        Ok(())
    }

    fn release(&mut self, handle: &VideoHandle) {
        self.log.lock().released.push(handle.clone());
    }
}

fn runtime_handle() -> Option<Handle> {
    Handle::try_current().ok()
}

/// Speech simulation that "talks" for a fixed time per character
pub struct SimulatedNarrator {
    sink: mpsc::Sender<ActivityEvent>,
    per_char: Duration,
    swallow_end: bool,
    voices: Vec<Voice>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedNarrator {
    /// Simulation emitting onto `sink`
    pub fn new(sink: mpsc::Sender<ActivityEvent>, per_char: Duration) -> Self {
        Self {
            sink,
            per_char,
            swallow_end: false,
            voices: vec![Voice::new("Samantha", "en-US"), Voice::new("Daniel", "en-GB")],
            task: None,
        }
    }

    /// Never emit `Ended`, like engines that drop the end event
    pub fn swallowing_end(mut self) -> Self {
        self.swallow_end = true;
        self
    }
}

impl NarrationProvider for SimulatedNarrator {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()> {
        let handle = runtime_handle()
            .ok_or_else(|| NarrationError::Engine("no async runtime".into()))?;
        let sink = self.sink.clone();
        let id = utterance.id;
        let duration = self.per_char * utterance.text.chars().count() as u32;
        let swallow_end = self.swallow_end;

        self.task = Some(handle.spawn(async move {
            if sink
                .send(ActivityEvent::Narration(NarrationSignal::Started(id)))
                .await
                .is_err()
            {
                return;
            }
            tokio::time::sleep(duration).await;
            if swallow_end {
                debug!(%id, "Simulated engine swallowing end event");
                return;
            }
            let _ = sink
                .send(ActivityEvent::Narration(NarrationSignal::Ended(id)))
                .await;
        }));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Camera simulation resolving each request after a delay
pub struct SimulatedCamera {
    sink: mpsc::Sender<ActivityEvent>,
    delay: Duration,
    denial: Option<DenialReason>,
}

impl SimulatedCamera {
    /// Camera that grants access
    pub fn granting(sink: mpsc::Sender<ActivityEvent>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            denial: None,
        }
    }

    /// Camera that refuses with `reason`
    pub fn denying(sink: mpsc::Sender<ActivityEvent>, delay: Duration, reason: DenialReason) -> Self {
        Self {
            sink,
            delay,
            denial: Some(reason),
        }
    }
}

impl PermissionProvider for SimulatedCamera {
    fn request_access(
        &mut self,
        request: RequestId,
        _constraints: &CameraConstraints,
    ) -> PermissionResult<()> {
        let handle = runtime_handle()
            .ok_or_else(|| PermissionError::Provider("no async runtime".into()))?;
        let sink = self.sink.clone();
        let delay = self.delay;
        let outcome = match &self.denial {
            Some(reason) => PermissionOutcome::Denied(reason.clone()),
            None => PermissionOutcome::Granted(VideoHandle::new()),
        };

        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if sink
                .send(ActivityEvent::Permission { request, outcome })
                .await
                .is_err()
            {
                warn!(%request, "Session gone before camera resolved");
            }
        });
        Ok(())
    }

    fn release(&mut self, handle: &VideoHandle) {
        debug!(%handle, "Simulated camera stream stopped");
    }
}
