//! Stages and per-flow transition tables
//!
//! Two flows share the same stage vocabulary. Each flow fixes the order of the
//! stages it uses and the successors each stage may move to. Restart (back to
//! `Welcome`) is permitted from every stage of either flow.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One discrete phase of the activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Greeting and camera setup
    Welcome,
    /// Camera is set up, waiting for "Start Journey"
    Ready,
    /// Lesson sections
    Lesson,
    /// Drag-and-drop satellite assembly
    Assembly,
    /// Quiz announcement
    QuizIntro,
    /// Questions
    Quiz,
    /// Results, badges, certificate
    Feedback,
}

impl Stage {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Welcome => "welcome",
            Stage::Ready => "ready",
            Stage::Lesson => "lesson",
            Stage::Assembly => "assembly",
            Stage::QuizIntro => "quiz-intro",
            Stage::Quiz => "quiz",
            Stage::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two activity variants is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Avatar-guided lesson: intro, lesson sections, quiz, feedback
    #[default]
    Guided,
    /// Builder: welcome, ready, lesson slides, assembly, quiz, reward
    Builder,
}

impl FlowKind {
    /// Stages used by this flow, in order
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            FlowKind::Guided => &[
                Stage::Welcome,
                Stage::Lesson,
                Stage::QuizIntro,
                Stage::Quiz,
                Stage::Feedback,
            ],
            FlowKind::Builder => &[
                Stage::Welcome,
                Stage::Ready,
                Stage::Lesson,
                Stage::Assembly,
                Stage::Quiz,
                Stage::Feedback,
            ],
        }
    }

    /// Whether `stage` belongs to this flow
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages().contains(&stage)
    }

    /// The forward successor of `stage`, if any
    pub fn next(&self, stage: Stage) -> Option<Stage> {
        let stages = self.stages();
        let pos = stages.iter().position(|s| *s == stage)?;
        stages.get(pos + 1).copied()
    }

    /// Non-forward successors: "Start Over" in the guided flow, "Retry" in the builder
    fn loop_back(&self, stage: Stage) -> Option<Stage> {
        match (self, stage) {
            (FlowKind::Guided, Stage::Feedback) => Some(Stage::Welcome),
            (FlowKind::Builder, Stage::Feedback) => Some(Stage::Quiz),
            _ => None,
        }
    }

    /// Whether the transition table permits `from -> to`
    pub fn permits(&self, from: Stage, to: Stage) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        to == Stage::Welcome || self.next(from) == Some(to) || self.loop_back(from) == Some(to)
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKind::Guided => f.write_str("guided"),
            FlowKind::Builder => f.write_str("builder"),
        }
    }
}

impl FromStr for FlowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guided" | "lesson" => Ok(FlowKind::Guided),
            "builder" | "build" => Ok(FlowKind::Builder),
            other => Err(format!("unknown flow '{other}' (expected guided or builder)")),
        }
    }
}
