//! Camera permission gate
//!
//! `CameraGate` owns the permission provider and the granted video handle.
//! At most one request is outstanding at a time; resolutions for any other
//! request id are stale and dropped. A granted handle lives for the rest of
//! the session and is released only by `release`, at teardown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{PermissionError, PermissionResult};
use super::turn::{RequestId, Sequence};

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera
    User,
    /// Rear camera
    Environment,
}

/// Constraints passed with an access request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConstraints {
    /// Ideal width in pixels
    pub width: u32,
    /// Ideal height in pixels
    pub height: u32,
    /// Camera direction
    pub facing: Facing,
    /// Whether to capture audio too
    pub audio: bool,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            width: 320,
            height: 320,
            facing: Facing::User,
            audio: false,
        }
    }
}

/// Live video stream handle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoHandle(pub Uuid);

impl VideoHandle {
    /// Create a new random handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VideoHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "video-{}", self.0)
    }
}

/// Why access was not granted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The learner (or browser policy) said no
    NotAllowed,
    /// No camera attached
    NotFound,
    /// Camera busy in another application
    InUse,
    /// Platform has no camera API
    Unsupported,
    /// Anything else
    Other(String),
}

impl DenialReason {
    /// Map a platform error name (e.g. "NotAllowedError")
    pub fn from_error_name(name: &str) -> Self {
        match name {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => DenialReason::NotAllowed,
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                DenialReason::NotFound
            }
            "NotReadableError" | "TrackStartError" | "AbortError" => DenialReason::InUse,
            "TypeError" | "NotSupportedError" => DenialReason::Unsupported,
            other => DenialReason::Other(other.to_string()),
        }
    }

    /// Message shown to the learner
    pub fn user_message(&self) -> &'static str {
        match self {
            DenialReason::NotAllowed => {
                "Camera access denied. You can still continue the lesson without camera access."
            }
            DenialReason::NotFound => {
                "No camera found. You can continue your space adventure without a camera."
            }
            DenialReason::Unsupported => {
                "Your browser doesn't support camera access. You can still continue the lesson."
            }
            DenialReason::InUse | DenialReason::Other(_) => {
                "Unable to access your camera. Is it being used by another app?"
            }
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotAllowed => f.write_str("not allowed"),
            DenialReason::NotFound => f.write_str("not found"),
            DenialReason::InUse => f.write_str("in use"),
            DenialReason::Unsupported => f.write_str("unsupported"),
            DenialReason::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Resolution of an access request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionOutcome {
    /// Access granted with a live stream
    Granted(VideoHandle),
    /// Access refused
    Denied(DenialReason),
}

impl PermissionOutcome {
    /// Whether access was granted
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionOutcome::Granted(_))
    }
}

/// Camera platform surface
pub trait PermissionProvider: Send {
    /// Start an access request; the outcome arrives later as an event
    fn request_access(
        &mut self,
        request: RequestId,
        constraints: &CameraConstraints,
    ) -> PermissionResult<()>;

    /// Stop the stream behind `handle`
    fn release(&mut self, handle: &VideoHandle);
}

/// Where the camera stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraState {
    /// Nothing requested yet
    Idle,
    /// Waiting on the prompt
    Pending(RequestId),
    /// Stream available
    Granted(VideoHandle),
    /// Refused; a retry is possible
    Denied(DenialReason),
    /// Torn down
    Released,
}

/// Owner of the camera for one session
pub struct CameraGate {
    provider: Box<dyn PermissionProvider>,
    constraints: CameraConstraints,
    ids: Sequence,
    state: CameraState,
}

impl CameraGate {
    /// Create an idle gate
    pub fn new(provider: Box<dyn PermissionProvider>, constraints: CameraConstraints) -> Self {
        Self {
            provider,
            constraints,
            ids: Sequence::default(),
            state: CameraState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Granted stream, if any
    pub fn handle(&self) -> Option<&VideoHandle> {
        match &self.state {
            CameraState::Granted(handle) => Some(handle),
            _ => None,
        }
    }

    /// Whether a request is outstanding
    pub fn is_pending(&self) -> bool {
        matches!(self.state, CameraState::Pending(_))
    }

    /// Issue the first access request
    pub fn request(&mut self) -> PermissionResult<RequestId> {
        match &self.state {
            CameraState::Idle => self.issue(),
            CameraState::Pending(id) => Err(PermissionError::Pending(id.0)),
            CameraState::Granted(_) => Err(PermissionError::AlreadyGranted),
            CameraState::Denied(_) => Err(PermissionError::NothingToRetry),
            CameraState::Released => Err(PermissionError::Provider("camera released".into())),
        }
    }

    /// Ask again after a denial; only on explicit learner action
    pub fn retry(&mut self) -> PermissionResult<RequestId> {
        match &self.state {
            CameraState::Denied(_) => self.issue(),
            CameraState::Pending(id) => Err(PermissionError::Pending(id.0)),
            CameraState::Granted(_) => Err(PermissionError::AlreadyGranted),
            CameraState::Idle => Err(PermissionError::NothingToRetry),
            CameraState::Released => Err(PermissionError::Provider("camera released".into())),
        }
    }

    fn issue(&mut self) -> PermissionResult<RequestId> {
        let id = RequestId(self.ids.next());
        match self.provider.request_access(id, &self.constraints) {
            Ok(()) => {
                info!(request = %id, "Requesting camera access");
                self.state = CameraState::Pending(id);
                Ok(id)
            }
            Err(err) => {
                warn!(request = %id, error = %err, "Camera request could not be issued");
                self.state = CameraState::Denied(DenialReason::Other(err.to_string()));
                Err(err)
            }
        }
    }

    /// Apply a resolution; returns it if it answered the outstanding request
    pub fn resolve(
        &mut self,
        request: RequestId,
        outcome: PermissionOutcome,
    ) -> Option<PermissionOutcome> {
        if self.state != CameraState::Pending(request) {
            debug!(%request, "Dropping stale camera resolution");
            if let PermissionOutcome::Granted(handle) = &outcome {
                // Nobody will own this stream; stop it now.
                self.provider.release(handle);
            }
            return None;
        }
        self.state = match &outcome {
            PermissionOutcome::Granted(handle) => {
                info!(%request, %handle, "Camera access granted");
                CameraState::Granted(handle.clone())
            }
            PermissionOutcome::Denied(reason) => {
                info!(%request, %reason, "Camera access denied");
                CameraState::Denied(reason.clone())
            }
        };
        Some(outcome)
    }

    /// Teardown: stop the stream if one was granted
    pub fn release(&mut self) {
        if let CameraState::Granted(handle) = &self.state {
            self.provider.release(handle);
            info!(%handle, "Camera released");
        }
        self.state = CameraState::Released;
    }
}
