//! Activity session: one learner's run through a flow
//!
//! A `Session` owns every component (stage controller, quiz engine, assembly
//! tracker, narrator, camera gate) and processes `ActivityEvent`s one at a
//! time. Learner intents and provider signals share the same FIFO, so a
//! callback can never interleave with a half-applied intent.
//!
//! Time is logical. The session only learns about elapsed time through
//! `advance_clock`, which also drives the narration watchdog and the
//! transition lock. Every processed event leaves a `TurnRecord` behind.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use super::ActivityConfig;
use super::assembly::{AssemblyTracker, PartId, Placement};
use super::controller::{RenderState, StageChange, StageController};
use super::error::{NarrationError, PermissionError, Result, RuntimeError};
use super::narration::{NarrationNotice, NarrationProvider, NarrationSignal, Narrator};
use super::permission::{
    CameraGate, CameraState, PermissionOutcome, PermissionProvider,
};
use super::quiz::{AnswerFeedback, QuizEngine, QuizOption, QuizOutcome, QuizProgress};
use super::reward::{self, Badge, Certificate};
use super::stage::{FlowKind, Stage};
use super::turn::{Millis, RequestId, Sequence, SessionId, TurnOutcome, TurnRecord};

const HISTORY_LIMIT: usize = 512;

/// Everything a session reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityEvent {
    /// Affirmative button of the welcome, ready and quiz-intro stages; next
    /// section inside the lesson
    Continue,
    /// Next lesson section
    NextSection,
    /// Previous lesson section
    PreviousSection,
    /// Select a quiz option by index
    SelectAnswer(usize),
    /// Submit the selected option
    SubmitAnswer,
    /// Move past the answered question
    NextQuestion,
    /// Drop a part onto the satellite
    PlacePart(PartId),
    /// Name the finished satellite
    NameSatellite(String),
    /// Finalize the satellite and head to the quiz
    LaunchSatellite,
    /// Retake the quiz from the feedback stage
    Retry,
    /// Back to the welcome stage, clearing progress
    StartOver,
    /// Speak the current narration again
    ReplayNarration,
    /// Ask for the camera again after a denial
    RetryCamera,
    /// Speech engine signal
    Narration(NarrationSignal),
    /// Camera request resolved
    Permission {
        /// Request being answered
        request: RequestId,
        /// Result
        outcome: PermissionOutcome,
    },
}

impl ActivityEvent {
    /// Short name used in logs and turn records
    pub fn name(&self) -> &'static str {
        match self {
            ActivityEvent::Continue => "continue",
            ActivityEvent::NextSection => "next-section",
            ActivityEvent::PreviousSection => "previous-section",
            ActivityEvent::SelectAnswer(_) => "select-answer",
            ActivityEvent::SubmitAnswer => "submit-answer",
            ActivityEvent::NextQuestion => "next-question",
            ActivityEvent::PlacePart(_) => "place-part",
            ActivityEvent::NameSatellite(_) => "name-satellite",
            ActivityEvent::LaunchSatellite => "launch-satellite",
            ActivityEvent::Retry => "retry",
            ActivityEvent::StartOver => "start-over",
            ActivityEvent::ReplayNarration => "replay-narration",
            ActivityEvent::RetryCamera => "retry-camera",
            ActivityEvent::Narration(_) => "narration-signal",
            ActivityEvent::Permission { .. } => "permission-resolved",
        }
    }
}

/// Quiz part of the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizView {
    /// Current question index
    pub index: usize,
    /// Number of questions
    pub total: usize,
    /// Correct answers so far
    pub score: usize,
    /// Current prompt
    pub prompt: Option<&'static str>,
    /// Options of the current question
    pub options: &'static [QuizOption],
    /// Selected option index
    pub selected: Option<usize>,
    /// Current question submitted
    pub answered: bool,
    /// Feedback for the submitted answer
    pub feedback: Option<AnswerFeedback>,
}

/// Assembly part of the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyView {
    /// Parts in placement order
    pub placed: Vec<PartId>,
    /// Parts still in the tray
    pub remaining: Vec<PartId>,
    /// Accepted name
    pub name: Option<String>,
    /// Satellite sealed
    pub finalized: bool,
}

/// Camera part of the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraView {
    /// Gate state
    pub state: CameraState,
    /// Message to show after a denial
    pub message: Option<&'static str>,
}

/// Full render snapshot of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityView {
    /// Session
    pub session: SessionId,
    /// Logical time of the snapshot
    pub at: Millis,
    /// Stage controller state
    pub stage: RenderState,
    /// Audio currently playing
    pub speaking: bool,
    /// Quiz
    pub quiz: QuizView,
    /// Assembly
    pub assembly: AssemblyView,
    /// Camera
    pub camera: CameraView,
    /// Badges earned by the carried quiz result
    pub badges: Vec<Badge>,
}

/// One learner's activity session
pub struct Session {
    id: SessionId,
    passing_score: usize,
    controller: StageController,
    narrator: Narrator,
    camera: CameraGate,
    quiz: QuizEngine,
    assembly: AssemblyTracker,
    feedback: Option<AnswerFeedback>,
    queue: VecDeque<ActivityEvent>,
    history: VecDeque<TurnRecord>,
    turns: Sequence,
    now: Millis,
    started_at: DateTime<Utc>,
    pending_completion: bool,
    started: bool,
    shut_down: bool,
}

impl Session {
    /// Create a session over the given providers
    pub fn new(
        config: &ActivityConfig,
        narration: Box<dyn NarrationProvider>,
        camera: Box<dyn PermissionProvider>,
    ) -> Self {
        let controller = StageController::new(config.flow, config.lock);
        let questions = controller.content().questions;
        Self {
            id: SessionId::new(),
            passing_score: config.passing_score,
            controller,
            narrator: Narrator::new(
                narration,
                config.speech.clone(),
                config.preferred_voice.clone(),
                config.watchdog,
            ),
            camera: CameraGate::new(camera, config.camera.clone()),
            quiz: QuizEngine::new(questions),
            assembly: AssemblyTracker::new(),
            feedback: None,
            queue: VecDeque::new(),
            history: VecDeque::new(),
            turns: Sequence::default(),
            now: Millis::zero(),
            started_at: Utc::now(),
            pending_completion: false,
            started: false,
            shut_down: false,
        }
    }

    /// Pin the wall-clock time logical zero corresponds to
    pub fn with_start_time(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Session identifier
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Flow being run
    pub fn flow(&self) -> FlowKind {
        self.controller.flow()
    }

    /// Current logical time
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Active stage
    pub fn stage(&self) -> Stage {
        self.controller.stage()
    }

    /// Stage controller
    pub fn controller(&self) -> &StageController {
        &self.controller
    }

    /// Quiz engine
    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    /// Assembly tracker
    pub fn assembly(&self) -> &AssemblyTracker {
        &self.assembly
    }

    /// Camera gate
    pub fn camera(&self) -> &CameraGate {
        &self.camera
    }

    /// Narrator
    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Most recent turns, oldest first
    pub fn history(&self) -> impl Iterator<Item = &TurnRecord> {
        self.history.iter()
    }

    /// Whether `shutdown` has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Begin the welcome narration; later calls do nothing
    pub fn start(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(RuntimeError::ShutDown);
        }
        if !self.started {
            self.started = true;
            info!(session = %self.id, flow = %self.flow(), "Session started");
            self.narrate();
            self.settle_pending_completion();
        }
        Ok(())
    }

    /// Queue an event for a later `step`
    pub fn enqueue(&mut self, event: ActivityEvent) {
        self.queue.push_back(event);
    }

    /// Events waiting to be processed
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Process the oldest queued event
    pub fn step(&mut self) -> Option<TurnRecord> {
        let event = self.queue.pop_front()?;
        let _ = self.handle(event);
        self.history.back().cloned()
    }

    /// Drain the queue; returns the number of turns run
    pub fn run_until_idle(&mut self) -> usize {
        let mut turns = 0;
        while self.step().is_some() {
            turns += 1;
        }
        turns
    }

    /// Process `event` now, bypassing the queue
    ///
    /// `Ok(true)` means state changed, `Ok(false)` that the event was a
    /// duplicate or stale. Rejections leave state untouched.
    pub fn handle(&mut self, event: ActivityEvent) -> Result<bool> {
        let name = event.name();
        let stage_before = self.stage();
        let result = self.dispatch(event);
        self.settle_pending_completion();

        let outcome = match &result {
            Ok(true) => TurnOutcome::Applied,
            Ok(false) => TurnOutcome::Dropped,
            Err(err) => {
                info!(event = name, stage = %stage_before, error = %err, "Event rejected");
                TurnOutcome::Rejected(err.to_string())
            }
        };
        let turn = self.turns.next();
        self.record(TurnRecord {
            turn,
            at: self.now,
            event: name.to_string(),
            stage_before,
            stage_after: self.stage(),
            outcome,
        });
        result
    }

    fn record(&mut self, record: TurnRecord) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Move logical time forward, firing the watchdog and releasing the lock
    pub fn advance_clock(&mut self, now: Millis) {
        if self.shut_down {
            return;
        }
        if now > self.now {
            self.now = now;
        }
        self.controller.tick(self.now);
        if let Some(NarrationNotice::Ended { .. }) = self.narrator.poll_watchdog(self.now) {
            self.utterance_finished();
        }
        self.settle_pending_completion();
    }

    /// Tear down: stop narration and release the camera
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.narrator.stop();
        self.camera.release();
        self.queue.clear();
        self.shut_down = true;
        info!(session = %self.id, "Session shut down");
    }

    fn dispatch(&mut self, event: ActivityEvent) -> Result<bool> {
        if self.shut_down {
            return Err(RuntimeError::ShutDown);
        }
        match event {
            ActivityEvent::Continue => self.continue_forward(),
            ActivityEvent::NextSection => self.next_section(),
            ActivityEvent::PreviousSection => match self.controller.previous_section()? {
                StageChange::Section(_) => {
                    self.narrate();
                    Ok(true)
                }
                _ => Ok(false),
            },
            ActivityEvent::SelectAnswer(index) => {
                self.expect(Stage::Quiz, "select-answer")?;
                self.quiz.select_answer(index)?;
                Ok(true)
            }
            ActivityEvent::SubmitAnswer => {
                self.expect(Stage::Quiz, "submit-answer")?;
                self.feedback = Some(self.quiz.submit_answer()?);
                Ok(true)
            }
            ActivityEvent::NextQuestion => self.next_question(),
            ActivityEvent::PlacePart(part) => {
                self.expect(Stage::Assembly, "place-part")?;
                match self.assembly.place(part)? {
                    Placement::AlreadyPlaced => Ok(false),
                    Placement::Placed { .. } => Ok(true),
                    Placement::Completed => {
                        let text = self.controller.content().assembly_complete;
                        self.controller.set_narration(text);
                        self.narrate();
                        Ok(true)
                    }
                }
            }
            ActivityEvent::NameSatellite(name) => {
                self.expect(Stage::Assembly, "name-satellite")?;
                self.assembly.set_name(&name)?;
                Ok(true)
            }
            ActivityEvent::LaunchSatellite => self.launch(),
            ActivityEvent::Retry => {
                self.expect(Stage::Feedback, "retry")?;
                self.transition(Stage::Quiz)
            }
            ActivityEvent::StartOver => self.transition(Stage::Welcome),
            ActivityEvent::ReplayNarration => {
                self.narrate();
                Ok(true)
            }
            ActivityEvent::RetryCamera => {
                self.camera.retry()?;
                Ok(true)
            }
            ActivityEvent::Narration(signal) => Ok(self.on_narration_signal(signal)),
            ActivityEvent::Permission { request, outcome } => {
                Ok(self.on_permission(request, outcome))
            }
        }
    }

    fn expect(&self, stage: Stage, event: &'static str) -> Result<()> {
        if self.stage() == stage {
            Ok(())
        } else {
            Err(RuntimeError::WrongStage {
                stage: self.stage(),
                event,
            })
        }
    }

    fn continue_forward(&mut self) -> Result<bool> {
        let stage = self.stage();
        match stage {
            Stage::Welcome | Stage::Ready | Stage::QuizIntro => {
                let target = self
                    .flow()
                    .next(stage)
                    .ok_or(RuntimeError::WrongStage {
                        stage,
                        event: "continue",
                    })?;
                self.transition(target)
            }
            Stage::Lesson => self.next_section(),
            _ => Err(RuntimeError::WrongStage {
                stage,
                event: "continue",
            }),
        }
    }

    fn next_section(&mut self) -> Result<bool> {
        match self.controller.next_section(self.now)? {
            StageChange::Section(_) => self.narrate(),
            StageChange::Entered(stage) => self.on_enter(stage),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn next_question(&mut self) -> Result<bool> {
        self.expect(Stage::Quiz, "next-question")?;
        // A finished quiz whose transition was locked out only needs the move.
        if let Some(outcome) = self.quiz.outcome().cloned() {
            return self.finish_quiz(outcome);
        }
        match self.quiz.advance()? {
            QuizProgress::Next(_) => {
                self.feedback = None;
                if let Some(question) = self.quiz.current() {
                    self.controller.set_narration(question.prompt);
                }
                self.narrate();
                Ok(true)
            }
            QuizProgress::Complete(outcome) => self.finish_quiz(outcome),
        }
    }

    fn finish_quiz(&mut self, outcome: QuizOutcome) -> Result<bool> {
        let certificate = (self.flow() == FlowKind::Builder).then(|| {
            Certificate::issue(
                &outcome,
                self.assembly.identity().map(|id| id.name.as_str()),
                self.passing_score,
                self.wall_clock(),
            )
        });
        self.controller.record_quiz(outcome, certificate);
        self.transition(Stage::Feedback)
    }

    fn launch(&mut self) -> Result<bool> {
        self.expect(Stage::Assembly, "launch-satellite")?;
        let identity = match self.assembly.identity() {
            Some(identity) => identity.clone(),
            None => self.assembly.finalize()?,
        };
        self.controller.record_satellite_name(identity.name);
        let target = self
            .flow()
            .next(Stage::Assembly)
            .ok_or(RuntimeError::WrongStage {
                stage: Stage::Assembly,
                event: "launch-satellite",
            })?;
        self.transition(target)
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = TimeDelta::milliseconds(i64::try_from(self.now.0).unwrap_or(i64::MAX));
        self.started_at
            .checked_add_signed(elapsed)
            .unwrap_or(self.started_at)
    }

    fn transition(&mut self, target: Stage) -> Result<bool> {
        self.controller.request_transition(target, self.now)?;
        self.on_enter(target);
        Ok(true)
    }

    fn on_enter(&mut self, stage: Stage) {
        match stage {
            Stage::Welcome => {
                self.quiz.reset();
                self.assembly.reset();
                self.feedback = None;
            }
            Stage::Assembly => self.assembly.reset(),
            Stage::Quiz => {
                self.quiz.reset();
                self.feedback = None;
            }
            _ => {}
        }
        self.narrate();
    }

    /// Speak the active narration, replacing whatever is in flight
    fn narrate(&mut self) {
        self.pending_completion = false;
        let text = self.controller.context().narration.clone();
        match self.narrator.speak(&text, self.now) {
            Ok(id) => debug!(%id, stage = %self.stage(), "Narrating"),
            Err(NarrationError::Unsupported) | Err(NarrationError::EmptyText) => {
                // Nothing will be heard; count it as spoken once the stage settles.
                self.pending_completion = true;
            }
            Err(err) => warn!(stage = %self.stage(), error = %err, "Narration failed"),
        }
    }

    fn settle_pending_completion(&mut self) {
        if self.pending_completion && !self.controller.is_transitioning(self.now) {
            self.pending_completion = false;
            self.narration_finished();
        }
    }

    fn on_narration_signal(&mut self, signal: NarrationSignal) -> bool {
        match self.narrator.on_signal(signal) {
            None => false,
            Some(NarrationNotice::Ended { .. }) => {
                self.utterance_finished();
                true
            }
            Some(_) => true,
        }
    }

    /// The current utterance ended; hold the completion while the stage settles
    fn utterance_finished(&mut self) {
        if self.controller.is_transitioning(self.now) {
            debug!(stage = %self.stage(), "Deferring speech end until the stage settles");
            self.pending_completion = true;
        } else {
            self.narration_finished();
        }
    }

    fn narration_finished(&mut self) -> bool {
        let opened = self.controller.notify_narration_complete(self.now);
        let gates = self.controller.context().gates;
        if opened
            && self.stage() == Stage::Welcome
            && gates.ready_for_permission
            && !gates.permission_processed
        {
            self.request_camera();
        }
        opened
    }

    fn request_camera(&mut self) {
        match self.camera.request() {
            Ok(request) => debug!(%request, "Camera request issued"),
            Err(PermissionError::Pending(_)) => {}
            Err(PermissionError::AlreadyGranted) => {
                self.controller.notify_permission_resolved(true, self.now);
            }
            Err(err) => {
                // Denied earlier or the provider failed: continue without a camera.
                info!(error = %err, "Continuing without camera");
                self.controller.notify_permission_resolved(false, self.now);
            }
        }
    }

    fn on_permission(&mut self, request: RequestId, outcome: PermissionOutcome) -> bool {
        match self.camera.resolve(request, outcome) {
            Some(outcome) => {
                self.controller
                    .notify_permission_resolved(outcome.is_granted(), self.now);
                true
            }
            None => false,
        }
    }

    /// Render snapshot
    pub fn render(&self) -> ActivityView {
        let current = self.quiz.current();
        let carry = self.controller.carryover();
        ActivityView {
            session: self.id.clone(),
            at: self.now,
            stage: self.controller.render_state(),
            speaking: self.narrator.is_speaking(),
            quiz: QuizView {
                index: self.quiz.question_index(),
                total: self.quiz.total(),
                score: self.quiz.score(),
                prompt: current.map(|q| q.prompt),
                options: current.map(|q| q.options).unwrap_or(&[]),
                selected: self.quiz.selected(),
                answered: self.quiz.is_answered(),
                feedback: self.feedback.clone(),
            },
            assembly: AssemblyView {
                placed: self.assembly.placed().to_vec(),
                remaining: self.assembly.remaining(),
                name: self.assembly.name().map(str::to_string),
                finalized: self.assembly.identity().is_some(),
            },
            camera: CameraView {
                state: self.camera.state().clone(),
                message: match self.camera.state() {
                    CameraState::Denied(reason) => Some(reason.user_message()),
                    _ => None,
                },
            },
            badges: carry
                .quiz
                .as_ref()
                .map(reward::badges_for)
                .unwrap_or_default(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
