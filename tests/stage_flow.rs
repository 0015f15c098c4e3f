//! End-to-end stage flow tests
//!
//! Drives whole sessions with recording providers and a hand-advanced clock,
//! covering both flows, camera denial, duplicate speech events, and the
//! transition lock.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use spacey::runtime::assembly::PartId;
use spacey::runtime::content;
use spacey::runtime::controller::{LockTiming, StageController};
use spacey::runtime::error::{AssemblyError, RuntimeError, TransitionError};
use spacey::runtime::narration::NarrationSignal;
use spacey::runtime::permission::{CameraState, DenialReason, PermissionOutcome, VideoHandle};
use spacey::runtime::reward::FeedbackTier;
use spacey::runtime::simulated::{RecordingCamera, RecordingNarration};
use spacey::runtime::stage::{FlowKind, Stage};
use spacey::runtime::{ActivityConfig, ActivityEvent, Millis, Session};

struct Harness {
    session: Session,
    speech: RecordingNarration,
    camera: RecordingCamera,
    clock: u64,
}

impl Harness {
    fn new(flow: FlowKind) -> Self {
        Self::with_camera(flow, RecordingCamera::default())
    }

    fn with_camera(flow: FlowKind, camera: RecordingCamera) -> Self {
        let speech = RecordingNarration::default();
        let config = ActivityConfig {
            flow,
            ..ActivityConfig::default()
        };
        let mut session = Session::new(&config, Box::new(speech.clone()), Box::new(camera.clone()))
            .with_start_time(Utc.with_ymd_and_hms(2026, 10, 14, 9, 0, 0).unwrap());
        session.start().unwrap();
        Self {
            session,
            speech,
            camera,
            clock: 0,
        }
    }

    fn later(&mut self, ms: u64) {
        self.clock += ms;
        self.session.advance_clock(Millis(self.clock));
    }

    fn send(&mut self, event: ActivityEvent) -> Result<bool, RuntimeError> {
        self.session.handle(event)
    }

    fn finish_speech(&mut self) -> bool {
        let id = self.session.narrator().current().unwrap();
        self.send(ActivityEvent::Narration(NarrationSignal::Ended(id)))
            .unwrap()
    }

    fn resolve_camera(&mut self, outcome: PermissionOutcome) {
        let request = self.camera.last_request().unwrap();
        self.send(ActivityEvent::Permission { request, outcome })
            .unwrap();
    }

    /// Let the lock release, then send
    fn step(&mut self, event: ActivityEvent) -> bool {
        self.later(700);
        self.send(event).unwrap()
    }

    fn answer_all(&mut self, correct: &[bool]) {
        let questions = content::for_flow(self.session.flow()).questions;
        for (question, &right) in questions.iter().zip(correct) {
            let right_index = question.correct_index().unwrap();
            let pick = if right {
                right_index
            } else {
                (right_index + 1) % question.options.len()
            };
            self.send(ActivityEvent::SelectAnswer(pick)).unwrap();
            self.send(ActivityEvent::SubmitAnswer).unwrap();
            self.later(50);
            self.send(ActivityEvent::NextQuestion).unwrap();
        }
    }

    fn stage(&self) -> Stage {
        self.session.stage()
    }
}

#[test]
fn guided_flow_with_denied_camera() {
    let mut h = Harness::new(FlowKind::Guided);
    assert_eq!(h.stage(), Stage::Welcome);
    assert_eq!(
        h.speech.last().unwrap().text,
        content::for_flow(FlowKind::Guided).introduction
    );

    assert!(h.finish_speech());
    assert_eq!(h.camera.requests().len(), 1);
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::NotAllowed));

    let view = h.session.render();
    assert!(view.stage.gates.ready_to_advance);
    assert_eq!(
        view.camera.message,
        Some(DenialReason::NotAllowed.user_message())
    );

    assert!(h.step(ActivityEvent::Continue));
    assert_eq!(h.stage(), Stage::Lesson);
    for _ in 0..3 {
        assert!(h.step(ActivityEvent::NextSection));
        assert_eq!(h.stage(), Stage::Lesson);
    }
    assert_eq!(h.session.render().stage.section_index, 3);
    assert!(h.step(ActivityEvent::NextSection));
    assert_eq!(h.stage(), Stage::QuizIntro);

    assert!(h.step(ActivityEvent::Continue));
    assert_eq!(h.stage(), Stage::Quiz);
    h.later(700);
    h.answer_all(&[true; 5]);
    assert_eq!(h.stage(), Stage::Feedback);

    let view = h.session.render();
    let quiz = view.stage.carryover.quiz.as_ref().unwrap();
    assert_eq!((quiz.score, quiz.total), (5, 5));
    assert_eq!(view.stage.narration, FeedbackTier::Excellent.message());
    assert_eq!(view.badges.len(), 2);
    assert!(view.stage.carryover.certificate.is_none());
}

#[test]
fn duplicate_speech_end_is_dropped() {
    let mut h = Harness::new(FlowKind::Guided);
    let id = h.session.narrator().current().unwrap();
    assert!(h
        .send(ActivityEvent::Narration(NarrationSignal::Ended(id)))
        .unwrap());
    assert!(!h
        .send(ActivityEvent::Narration(NarrationSignal::Ended(id)))
        .unwrap());
    assert_eq!(h.camera.requests().len(), 1);
}

#[test]
fn rapid_continue_is_locked_out() {
    let mut h = Harness::new(FlowKind::Guided);
    h.finish_speech();
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::NotFound));

    h.later(10);
    assert!(h.send(ActivityEvent::Continue).unwrap());
    h.later(10);
    assert!(matches!(
        h.send(ActivityEvent::NextSection),
        Ok(true)
    ));
    // Leaving the lesson is a transition and still inside the lock window.
    for _ in 0..2 {
        h.send(ActivityEvent::NextSection).unwrap();
    }
    assert!(matches!(
        h.send(ActivityEvent::NextSection),
        Err(RuntimeError::Transition(TransitionError::Locked {
            requested: Stage::QuizIntro
        }))
    ));
    assert_eq!(h.stage(), Stage::Lesson);
}

#[test]
fn quiz_finished_inside_lock_moves_on_next_press() {
    let mut h = Harness::new(FlowKind::Guided);
    h.finish_speech();
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::InUse));
    h.step(ActivityEvent::Continue);
    for _ in 0..4 {
        h.step(ActivityEvent::NextSection);
    }
    h.step(ActivityEvent::Continue);
    assert_eq!(h.stage(), Stage::Quiz);

    // Answer everything immediately; the move to feedback hits the lock.
    let questions = content::for_flow(FlowKind::Guided).questions;
    for question in questions {
        h.send(ActivityEvent::SelectAnswer(question.correct_index().unwrap()))
            .unwrap();
        h.send(ActivityEvent::SubmitAnswer).unwrap();
        let _ = h.send(ActivityEvent::NextQuestion);
    }
    assert_eq!(h.stage(), Stage::Quiz);
    assert!(h.session.quiz().is_complete());

    assert!(h.step(ActivityEvent::NextQuestion));
    assert_eq!(h.stage(), Stage::Feedback);
    assert_eq!(h.session.controller().carryover().quiz.as_ref().unwrap().score, 5);
}

#[test]
fn start_over_resets_progress_but_keeps_camera_decision() {
    let mut h = Harness::new(FlowKind::Guided);
    h.finish_speech();
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::NotAllowed));
    h.step(ActivityEvent::Continue);
    h.step(ActivityEvent::NextSection);

    assert!(h.step(ActivityEvent::StartOver));
    assert_eq!(h.stage(), Stage::Welcome);
    assert!(!h.session.render().stage.gates.ready_to_advance);

    // Welcome narration ends again; the earlier denial stands without a new prompt.
    h.later(200);
    assert!(h.finish_speech());
    assert_eq!(h.camera.requests().len(), 1);
    assert!(h.session.render().stage.gates.ready_to_advance);

    // An explicit retry asks again.
    assert!(h.send(ActivityEvent::RetryCamera).unwrap());
    assert_eq!(h.camera.requests().len(), 2);
}

#[test]
fn speech_ending_during_settle_still_reopens_welcome() {
    let mut h = Harness::new(FlowKind::Guided);
    h.finish_speech();
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::NotAllowed));
    h.step(ActivityEvent::Continue);
    assert!(h.step(ActivityEvent::StartOver));

    h.later(50);
    assert!(h.finish_speech());
    let gates = h.session.render().stage.gates;
    assert!(!gates.speaking_complete && !gates.ready_to_advance);

    h.later(100);
    let gates = h.session.render().stage.gates;
    assert!(gates.speaking_complete && gates.voice_over_complete);
    assert!(gates.ready_to_advance);
    assert_eq!(h.camera.requests().len(), 1);
}

#[test]
fn broken_camera_does_not_block_the_lesson() {
    let camera = RecordingCamera::broken();
    let mut h = Harness::with_camera(FlowKind::Guided, camera);
    assert!(h.finish_speech());
    assert!(h.camera.requests().is_empty());
    assert!(matches!(h.session.camera().state(), CameraState::Denied(DenialReason::Other(_))));

    let view = h.session.render();
    assert!(view.stage.gates.ready_to_advance);
    assert_eq!(view.camera.message, Some(DenialReason::InUse.user_message()));

    assert!(h.step(ActivityEvent::Continue));
    assert_eq!(h.stage(), Stage::Lesson);

    h.camera.repair();
    assert!(h.send(ActivityEvent::RetryCamera).unwrap());
    assert_eq!(h.camera.requests().len(), 1);
    assert!(h.session.camera().is_pending());
}

#[test]
fn guided_flow_has_no_retry() {
    let mut h = Harness::new(FlowKind::Guided);
    h.finish_speech();
    h.resolve_camera(PermissionOutcome::Denied(DenialReason::NotAllowed));
    h.step(ActivityEvent::Continue);
    for _ in 0..4 {
        h.step(ActivityEvent::NextSection);
    }
    h.step(ActivityEvent::Continue);
    h.later(700);
    h.answer_all(&[false; 5]);
    assert_eq!(h.stage(), Stage::Feedback);
    assert_eq!(
        h.session.render().stage.narration,
        FeedbackTier::NeedsImprovement.message()
    );

    h.later(700);
    assert!(matches!(
        h.send(ActivityEvent::Retry),
        Err(RuntimeError::Transition(TransitionError::NotPermitted {
            from: Stage::Feedback,
            to: Stage::Quiz
        }))
    ));
}

#[test]
fn builder_flow_end_to_end() {
    let mut h = Harness::new(FlowKind::Builder);
    h.finish_speech();
    let handle = VideoHandle::new();
    h.resolve_camera(PermissionOutcome::Granted(handle.clone()));
    assert_eq!(h.session.camera().handle(), Some(&handle));

    assert!(h.step(ActivityEvent::Continue));
    assert_eq!(h.stage(), Stage::Ready);
    assert!(h.step(ActivityEvent::Continue));
    assert_eq!(h.stage(), Stage::Lesson);
    let slides = content::for_flow(FlowKind::Builder).sections.len();
    for _ in 0..slides {
        h.step(ActivityEvent::NextSection);
    }
    assert_eq!(h.stage(), Stage::Assembly);

    assert!(matches!(
        h.send(ActivityEvent::NameSatellite("Voyager".into())),
        Err(RuntimeError::Assembly(AssemblyError::Incomplete { missing: 5 }))
    ));
    for part in [PartId::Power, PartId::Body, PartId::Antenna, PartId::Solar] {
        assert!(h.send(ActivityEvent::PlacePart(part)).unwrap());
    }
    assert!(!h.send(ActivityEvent::PlacePart(PartId::Body)).unwrap());
    assert!(h.send(ActivityEvent::PlacePart(PartId::Camera)).unwrap());
    assert_eq!(
        h.session.render().stage.narration,
        content::for_flow(FlowKind::Builder).assembly_complete
    );

    assert!(matches!(
        h.send(ActivityEvent::LaunchSatellite),
        Err(RuntimeError::Assembly(AssemblyError::EmptyName))
    ));
    assert!(matches!(
        h.send(ActivityEvent::NameSatellite("   ".into())),
        Err(RuntimeError::Assembly(AssemblyError::EmptyName))
    ));
    h.send(ActivityEvent::NameSatellite("  Voyager  ".into()))
        .unwrap();
    assert!(h.step(ActivityEvent::LaunchSatellite));
    assert_eq!(h.stage(), Stage::Quiz);
    assert_eq!(
        h.session.controller().carryover().satellite_name.as_deref(),
        Some("Voyager")
    );

    h.later(700);
    h.answer_all(&[true, true, false, false, false]);
    assert_eq!(h.stage(), Stage::Feedback);
    let certificate = h.session.controller().carryover().certificate.clone().unwrap();
    assert!(!certificate.passed);
    assert_eq!(certificate.satellite_name, "Voyager");
    assert!(h.session.render().stage.narration.contains("Try the quiz again"));

    assert!(h.step(ActivityEvent::Retry));
    assert_eq!(h.stage(), Stage::Quiz);
    assert_eq!(h.session.quiz().score(), 0);
    h.later(700);
    h.answer_all(&[true; 5]);
    let certificate = h.session.controller().carryover().certificate.clone().unwrap();
    assert!(certificate.passed);
    assert_eq!(certificate.formatted_date(), "October 14, 2026");

    h.session.shutdown();
    assert_eq!(h.camera.released(), vec![handle]);
}

#[test]
fn narration_failure_leaves_gate_closed_until_replay() {
    let mut h = Harness::new(FlowKind::Guided);
    let id = h.session.narrator().current().unwrap();
    h.send(ActivityEvent::Narration(NarrationSignal::Errored(
        id,
        "synthesis-failed".into(),
    )))
    .unwrap();
    assert!(!h.session.render().stage.gates.speaking_complete);
    assert!(h.camera.requests().is_empty());

    assert!(h.send(ActivityEvent::ReplayNarration).unwrap());
    assert!(h.finish_speech());
    assert_eq!(h.camera.requests().len(), 1);
    assert_eq!(h.session.camera().state(), &CameraState::Pending(h.camera.last_request().unwrap()));
}

#[derive(Debug, Clone)]
enum Op {
    Wait(u64),
    Speech,
    Camera(bool),
    Advance,
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..800).prop_map(Op::Wait),
        Just(Op::Speech),
        any::<bool>().prop_map(Op::Camera),
        Just(Op::Advance),
        Just(Op::Restart),
    ]
}

proptest! {
    #[test]
    fn transitions_never_overlap(flow in prop_oneof![Just(FlowKind::Guided), Just(FlowKind::Builder)],
                                 ops in prop::collection::vec(op(), 1..80)) {
        let timing = LockTiming::default();
        let window = timing.settle_ms + timing.unlock_ms;
        let mut ctl = StageController::new(flow, timing);
        let mut now = 0u64;
        let mut last_transition: Option<u64> = None;

        for op in ops {
            match op {
                Op::Wait(ms) => now += ms,
                Op::Speech => {
                    let settling = ctl.is_transitioning(Millis(now));
                    let opened = ctl.notify_narration_complete(Millis(now));
                    prop_assert!(!(settling && opened));
                }
                Op::Camera(granted) => {
                    let settling = ctl.is_transitioning(Millis(now));
                    let opened = ctl.notify_permission_resolved(granted, Millis(now));
                    prop_assert!(!(settling && opened));
                }
                Op::Advance | Op::Restart => {
                    let target = match op {
                        Op::Restart => Some(Stage::Welcome),
                        _ => flow.next(ctl.stage()),
                    };
                    if let Some(target) = target {
                        if ctl.request_transition(target, Millis(now)).is_ok() {
                            if let Some(prev) = last_transition {
                                prop_assert!(now - prev >= window);
                            }
                            last_transition = Some(now);
                        }
                    }
                }
            }
            prop_assert!(flow.contains(ctl.stage()));
        }
    }
}
