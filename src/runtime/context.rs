//! Per-stage context: narration text, gates, and cross-stage carryover
//!
//! A `StageContext` is built fresh on every stage entry. The only state that
//! survives a transition is the `Carryover` (quiz outcome, satellite name,
//! certificate), and only because the controller hands it over explicitly.

use serde::{Deserialize, Serialize};

use super::content::{self, FlowContent};
use super::quiz::QuizOutcome;
use super::reward::{Certificate, FeedbackTier};
use super::stage::{FlowKind, Stage};

/// Boolean conditions a stage waits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    /// Current narration finished (engine or watchdog)
    pub speaking_complete: bool,
    /// Welcome narration finished at least once
    pub voice_over_complete: bool,
    /// Camera request may be issued
    pub ready_for_permission: bool,
    /// Camera request resolved, granted or not
    pub permission_processed: bool,
    /// The affirmative "advance" action is available
    pub ready_to_advance: bool,
}

/// State carried across stages on purpose
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carryover {
    /// Latest finished quiz
    pub quiz: Option<QuizOutcome>,
    /// Finalized satellite name
    pub satellite_name: Option<String>,
    /// Certificate for the latest quiz (builder flow)
    pub certificate: Option<Certificate>,
}

/// Context of the active stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageContext {
    /// Stage this context belongs to
    pub stage: Stage,
    /// Text the guide narrates
    pub narration: String,
    /// Lesson section (Lesson stage only; 0 elsewhere)
    pub section_index: usize,
    /// Gates
    pub gates: Gates,
}

impl StageContext {
    /// Fresh context for entering `stage`
    pub fn enter(stage: Stage, flow: FlowKind, content: &FlowContent, carry: &Carryover) -> Self {
        let narration = match stage {
            Stage::Welcome => content.introduction.to_string(),
            Stage::Ready => content.ready.to_string(),
            Stage::Lesson => content
                .sections
                .first()
                .map(|s| s.content.to_string())
                .unwrap_or_default(),
            Stage::Assembly => content.assembly_instructions.to_string(),
            Stage::QuizIntro => content.quiz_intro.to_string(),
            Stage::Quiz => content
                .questions
                .first()
                .map(|q| q.prompt.to_string())
                .unwrap_or_default(),
            Stage::Feedback => feedback_narration(flow, carry),
        };

        Self {
            stage,
            narration,
            section_index: 0,
            gates: Gates {
                // Only the welcome stage waits on camera setup before it can be left.
                ready_to_advance: stage != Stage::Welcome,
                ..Gates::default()
            },
        }
    }

    /// Webcam caption for this context
    pub fn greeting(&self, content: &FlowContent, carry: &Carryover) -> &'static str {
        match self.stage {
            Stage::Welcome | Stage::Ready => content::GREETING_WELCOME,
            Stage::Lesson => content::lesson_greeting(self.section_index, content.sections.len()),
            Stage::Assembly => content::GREETING_LESSON_LAST,
            Stage::QuizIntro | Stage::Quiz => content::GREETING_QUIZ,
            Stage::Feedback => carry
                .quiz
                .as_ref()
                .map(|q| FeedbackTier::from_outcome(q).greeting())
                .unwrap_or(content::GREETING_QUIZ),
        }
    }
}

fn feedback_narration(flow: FlowKind, carry: &Carryover) -> String {
    if flow == FlowKind::Builder {
        if let Some(certificate) = &carry.certificate {
            return certificate.message();
        }
    }
    carry
        .quiz
        .as_ref()
        .map(|q| FeedbackTier::from_outcome(q).message().to_string())
        .unwrap_or_default()
}
