//! Activity runtime and public API
//!
//! This module holds the configuration shared by every session and wires the
//! submodules together. A `Session` is the unit a presentation layer talks
//! to; the `driver` module runs one on tokio.

use serde::{Deserialize, Serialize};
use std::path::Path;

// Submodules
pub mod assembly;
pub mod content;
pub mod context;
pub mod controller;
pub mod driver;
pub mod error;
pub mod narration;
pub mod permission;
pub mod quiz;
pub mod reward;
pub mod session;
pub mod simulated;
pub mod stage;
pub mod storage;
pub mod turn;

use controller::LockTiming;
use error::ConfigError;
use narration::{SpeechOptions, WatchdogBudget};
use permission::CameraConstraints;
use stage::FlowKind;

/// Configuration for an activity session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Which flow to run
    pub flow: FlowKind,

    /// Transition lock windows
    pub lock: LockTiming,

    /// Narration watchdog sizing
    pub watchdog: WatchdogBudget,

    /// Guide voice playback options
    pub speech: SpeechOptions,

    /// Voice name to prefer when the engine offers it
    pub preferred_voice: Option<String>,

    /// Camera request constraints
    pub camera: CameraConstraints,

    /// Correct answers needed for a passing certificate
    pub passing_score: usize,

    /// Driver clock tick in milliseconds
    pub tick_ms: u64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            flow: FlowKind::Guided,
            lock: LockTiming::default(),
            watchdog: WatchdogBudget::default(),
            speech: SpeechOptions::guide(),
            preferred_voice: None,
            camera: CameraConstraints::default(),
            passing_score: 3,
            tick_ms: 50,
        }
    }
}

impl ActivityConfig {
    /// Load a config file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        storage::load_config(path)
    }

    /// Write this config to `path`
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;
        storage::write_config(path, self)
    }

    /// Reject values no session can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, detail: String| ConfigError::Invalid { field, detail };

        if self.lock.settle_ms == 0 {
            return Err(invalid("lock.settle_ms", "must be greater than zero".into()));
        }
        if self.lock.unlock_ms == 0 {
            return Err(invalid("lock.unlock_ms", "must be greater than zero".into()));
        }
        if self.watchdog.base_ms == 0 {
            return Err(invalid("watchdog.base_ms", "must be greater than zero".into()));
        }
        if !(0.0..=1.0).contains(&self.speech.volume) {
            return Err(invalid(
                "speech.volume",
                format!("{} is outside 0 to 1", self.speech.volume),
            ));
        }
        if self.speech.rate.is_nan() || self.speech.rate <= 0.0 {
            return Err(invalid("speech.rate", format!("{} is not positive", self.speech.rate)));
        }
        if self.speech.pitch.is_nan() || self.speech.pitch <= 0.0 {
            return Err(invalid("speech.pitch", format!("{} is not positive", self.speech.pitch)));
        }
        if self.tick_ms == 0 {
            return Err(invalid("tick_ms", "must be greater than zero".into()));
        }
        let questions = content::for_flow(self.flow).questions.len();
        if self.passing_score > questions {
            return Err(invalid(
                "passing_score",
                format!("{} exceeds the {} available questions", self.passing_score, questions),
            ));
        }
        Ok(())
    }
}

// Re-export commonly used types
pub use driver::{SessionHandle, spawn_session};
pub use session::{ActivityEvent, ActivityView, Session};
pub use stage::Stage;
pub use turn::{Millis, TurnRecord};
