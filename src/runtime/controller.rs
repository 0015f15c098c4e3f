//! Activity stage controller
//!
//! Owns the active `(stage, context)` pair, the flow's transition table, and
//! the transition lock. Asynchronous notifications (narration finished,
//! camera resolved) only ever open gates; leaving a stage always takes an
//! explicit request.
//!
//! The lock has two phases measured from the moment a transition starts:
//! - settling (`settle_ms`): provider notifications are dropped, so a stale
//!   "speech ended" from the previous stage cannot open a gate on the new one
//! - locked (`settle_ms + unlock_ms`): further transition requests are rejected

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::content::{self, FlowContent};
use super::context::{Carryover, Gates, StageContext};
use super::error::{TransitionError, TransitionResult};
use super::quiz::QuizOutcome;
use super::reward::Certificate;
use super::stage::{FlowKind, Stage};
use super::turn::Millis;

/// Lock windows in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockTiming {
    /// Soft window during which notifications are dropped
    pub settle_ms: u64,
    /// Further window during which transitions are rejected
    pub unlock_ms: u64,
}

impl Default for LockTiming {
    fn default() -> Self {
        Self {
            settle_ms: 100,
            unlock_ms: 500,
        }
    }
}

/// Guard against duplicate or overlapping transitions
#[derive(Debug, Clone)]
pub struct TransitionLock {
    timing: LockTiming,
    engaged_at: Option<Millis>,
}

impl TransitionLock {
    /// A released lock
    pub fn new(timing: LockTiming) -> Self {
        Self {
            timing,
            engaged_at: None,
        }
    }

    /// Start a transition at `at`
    pub fn engage(&mut self, at: Millis) {
        self.engaged_at = Some(at);
    }

    /// Transition still in flight: notifications must be dropped
    pub fn is_settling(&self, at: Millis) -> bool {
        self.engaged_at
            .is_some_and(|start| at.since(start) < self.timing.settle_ms)
    }

    /// Transition requests must be rejected
    pub fn is_locked(&self, at: Millis) -> bool {
        self.engaged_at.is_some_and(|start| {
            at.since(start) < self.timing.settle_ms + self.timing.unlock_ms
        })
    }

    /// Time at which the lock fully releases, if engaged
    pub fn releases_at(&self) -> Option<Millis> {
        self.engaged_at
            .map(|start| start + (self.timing.settle_ms + self.timing.unlock_ms))
    }

    /// Clear the lock if both windows have passed; returns true on release
    pub fn release_if_elapsed(&mut self, at: Millis) -> bool {
        if self.engaged_at.is_some() && !self.is_locked(at) {
            self.engaged_at = None;
            debug!(%at, "Transition lock released");
            return true;
        }
        false
    }
}

/// Discrete input to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageEvent {
    /// Move to a stage
    Transition(Stage),
    /// Current narration finished
    NarrationComplete,
    /// Camera request resolved
    PermissionResolved {
        /// Whether access was granted
        granted: bool,
    },
    /// Next lesson section, or leave the lesson after the last one
    NextSection,
    /// Previous lesson section
    PreviousSection,
    /// Back to the welcome stage
    Restart,
}

/// What the controller did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageChange {
    /// Entered this stage
    Entered(Stage),
    /// A gate opened
    GateOpened,
    /// Lesson moved to this section
    Section(usize),
    /// Nothing changed (duplicate or stale)
    Unchanged,
}

/// Snapshot handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderState {
    /// Flow being run
    pub flow: FlowKind,
    /// Active stage
    pub stage: Stage,
    /// Text the guide narrates
    pub narration: String,
    /// Webcam caption
    pub greeting: String,
    /// Gates of the active stage
    pub gates: Gates,
    /// Lesson section index
    pub section_index: usize,
    /// Number of lesson sections
    pub section_count: usize,
    /// Carried quiz result, name, and certificate
    pub carryover: Carryover,
}

/// The stage state machine
#[derive(Debug, Clone)]
pub struct StageController {
    flow: FlowKind,
    content: &'static FlowContent,
    context: StageContext,
    carry: Carryover,
    lock: TransitionLock,
}

impl StageController {
    /// Controller positioned at the welcome stage of `flow`
    pub fn new(flow: FlowKind, timing: LockTiming) -> Self {
        let content = content::for_flow(flow);
        let carry = Carryover::default();
        Self {
            flow,
            content,
            context: StageContext::enter(Stage::Welcome, flow, content, &carry),
            carry,
            lock: TransitionLock::new(timing),
        }
    }

    /// Flow being run
    pub fn flow(&self) -> FlowKind {
        self.flow
    }

    /// Content of the flow
    pub fn content(&self) -> &'static FlowContent {
        self.content
    }

    /// Active stage
    pub fn stage(&self) -> Stage {
        self.context.stage
    }

    /// Active context
    pub fn context(&self) -> &StageContext {
        &self.context
    }

    /// Carried state
    pub fn carryover(&self) -> &Carryover {
        &self.carry
    }

    /// Transition lock
    pub fn lock(&self) -> &TransitionLock {
        &self.lock
    }

    /// Whether a transition is in flight at `at`
    pub fn is_transitioning(&self, at: Millis) -> bool {
        self.lock.is_settling(at)
    }

    /// Release the lock if its windows have passed
    pub fn tick(&mut self, at: Millis) -> bool {
        self.lock.release_if_elapsed(at)
    }

    /// Move to `target` if the table, the gates, and the lock allow it
    pub fn request_transition(&mut self, target: Stage, at: Millis) -> TransitionResult<Stage> {
        let from = self.context.stage;
        debug!(%from, to = %target, %at, "Attempting transition");
        self.lock.release_if_elapsed(at);

        if self.lock.is_locked(at) {
            info!(%from, to = %target, "Transition locked - ignoring request");
            return Err(TransitionError::Locked { requested: target });
        }
        if !self.flow.permits(from, target) {
            warn!(%from, to = %target, flow = %self.flow, "Transition not permitted");
            return Err(TransitionError::NotPermitted { from, to: target });
        }
        if target != Stage::Welcome && !self.context.gates.ready_to_advance {
            info!(%from, to = %target, "Transition gated - stage not ready to advance");
            return Err(TransitionError::Gated {
                stage: from,
                gate: "ready_to_advance",
            });
        }

        self.lock.engage(at);
        if target == Stage::Welcome {
            self.carry = Carryover::default();
        }
        self.context = StageContext::enter(target, self.flow, self.content, &self.carry);
        info!(%from, to = %target, %at, "Stage transition");
        Ok(target)
    }

    /// Explicit restart from any stage
    pub fn restart(&mut self, at: Millis) -> TransitionResult<Stage> {
        self.request_transition(Stage::Welcome, at)
    }

    /// Record that the current narration finished
    ///
    /// Returns false if dropped (transition in flight) or a duplicate.
    pub fn notify_narration_complete(&mut self, at: Millis) -> bool {
        if self.lock.is_settling(at) {
            debug!(stage = %self.context.stage, "Ignoring speaking complete during transition");
            return false;
        }
        let gates = &mut self.context.gates;
        if gates.speaking_complete {
            return false;
        }
        gates.speaking_complete = true;
        if self.context.stage == Stage::Welcome && !gates.voice_over_complete {
            gates.voice_over_complete = true;
            gates.ready_for_permission = true;
            info!("Intro voice over complete, ready to request camera access");
        }
        true
    }

    /// Record the camera outcome; the first call per stage wins
    ///
    /// Granted or denied, the stage becomes ready to advance. Never transitions.
    pub fn notify_permission_resolved(&mut self, granted: bool, at: Millis) -> bool {
        if self.lock.is_settling(at) {
            debug!(stage = %self.context.stage, granted, "Ignoring permission result during transition");
            return false;
        }
        let gates = &mut self.context.gates;
        if gates.permission_processed {
            return false;
        }
        gates.permission_processed = true;
        gates.ready_to_advance = true;
        info!(stage = %self.context.stage, granted, "Camera permission processed");
        true
    }

    /// Advance within the lesson, leaving it after the last section
    pub fn next_section(&mut self, at: Millis) -> TransitionResult<StageChange> {
        self.expect_stage(Stage::Lesson)?;
        let next = self.context.section_index + 1;
        if next < self.content.sections.len() {
            self.show_section(next);
            return Ok(StageChange::Section(next));
        }
        let target = self.flow.next(Stage::Lesson).ok_or(TransitionError::NotPermitted {
            from: Stage::Lesson,
            to: Stage::Lesson,
        })?;
        self.request_transition(target, at).map(StageChange::Entered)
    }

    /// Step back one lesson section
    pub fn previous_section(&mut self) -> TransitionResult<StageChange> {
        self.expect_stage(Stage::Lesson)?;
        match self.context.section_index.checked_sub(1) {
            Some(prev) => {
                self.show_section(prev);
                Ok(StageChange::Section(prev))
            }
            None => Ok(StageChange::Unchanged),
        }
    }

    fn show_section(&mut self, index: usize) {
        self.context.section_index = index;
        self.context.narration = self.content.sections[index].content.to_string();
        self.context.gates.speaking_complete = false;
        debug!(section = index, "Lesson section");
    }

    fn expect_stage(&self, expected: Stage) -> TransitionResult<()> {
        if self.context.stage == expected {
            Ok(())
        } else {
            Err(TransitionError::NotInStage {
                expected,
                actual: self.context.stage,
            })
        }
    }

    /// Replace the narration of the active stage (next question, celebration)
    pub fn set_narration(&mut self, text: impl Into<String>) {
        self.context.narration = text.into();
        self.context.gates.speaking_complete = false;
    }

    /// Carry a finished quiz forward
    pub fn record_quiz(&mut self, outcome: QuizOutcome, certificate: Option<Certificate>) {
        self.carry.quiz = Some(outcome);
        self.carry.certificate = certificate;
    }

    /// Carry the satellite name forward
    pub fn record_satellite_name(&mut self, name: impl Into<String>) {
        self.carry.satellite_name = Some(name.into());
    }

    /// Apply one event
    pub fn handle(&mut self, event: StageEvent, at: Millis) -> TransitionResult<StageChange> {
        let gate = |opened: bool| {
            if opened {
                StageChange::GateOpened
            } else {
                StageChange::Unchanged
            }
        };
        match event {
            StageEvent::Transition(target) => {
                self.request_transition(target, at).map(StageChange::Entered)
            }
            StageEvent::Restart => self.restart(at).map(StageChange::Entered),
            StageEvent::NarrationComplete => Ok(gate(self.notify_narration_complete(at))),
            StageEvent::PermissionResolved { granted } => {
                Ok(gate(self.notify_permission_resolved(granted, at)))
            }
            StageEvent::NextSection => self.next_section(at),
            StageEvent::PreviousSection => self.previous_section(),
        }
    }

    /// Pure read of what to render
    pub fn render_state(&self) -> RenderState {
        RenderState {
            flow: self.flow,
            stage: self.context.stage,
            narration: self.context.narration.clone(),
            greeting: self.context.greeting(self.content, &self.carry).to_string(),
            gates: self.context.gates,
            section_index: self.context.section_index,
            section_count: self.content.sections.len(),
            carryover: self.carry.clone(),
        }
    }
}
