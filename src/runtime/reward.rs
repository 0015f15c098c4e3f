//! Feedback tiers, badges, and the builder certificate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::QuizOutcome;

/// Name used on the certificate when the learner never named the satellite
pub const DEFAULT_SATELLITE_NAME: &str = "Explorer-1";

/// Feedback band derived from the quiz percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTier {
    /// 100%
    Excellent,
    /// 80% and up
    Good,
    /// 60% and up
    Average,
    /// Below 60%
    NeedsImprovement,
}

impl FeedbackTier {
    /// Tier for a finished quiz
    pub fn from_outcome(outcome: &QuizOutcome) -> Self {
        match outcome.percentage() {
            100.. => FeedbackTier::Excellent,
            80..=99 => FeedbackTier::Good,
            60..=79 => FeedbackTier::Average,
            _ => FeedbackTier::NeedsImprovement,
        }
    }

    /// Spoken feedback
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Wow! You're a real space genius! You've mastered satellite technology and are ready for advanced space missions!",
            FeedbackTier::Good => "Great job! You've learned a lot about satellites. With a little more practice, you'll be a satellite expert in no time!",
            FeedbackTier::Average => "Good effort! You've learned some important things about satellites. Keep exploring and learning more about space technology!",
            FeedbackTier::NeedsImprovement => "Thanks for trying! Satellites can be complex, but don't worry - you can review the lesson and try the quiz again to improve your knowledge.",
        }
    }

    /// Webcam caption
    pub fn greeting(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Wow! I can see a space genius on my screen! Fantastic job!",
            FeedbackTier::Good => "Great work, space explorer! Your mission was a success!",
            FeedbackTier::Average => "You're making progress on your space journey! Keep exploring!",
            FeedbackTier::NeedsImprovement => "Every astronaut starts somewhere! Let's keep learning together!",
        }
    }
}

/// An earned badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Stable identifier
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    /// What it was awarded for
    pub description: &'static str,
}

/// Awarded to everyone who finishes the quiz
pub const COMPLETION_BADGE: Badge = Badge {
    id: "satellite-builder",
    name: "Satellite Builder",
    description: "Awarded for completing the Build Your Own Satellite lesson",
};

/// Awarded for a perfect score
pub const EXCELLENCE_BADGE: Badge = Badge {
    id: "space-ace",
    name: "Space Ace",
    description: "Awarded for answering all quiz questions correctly",
};

/// Badges earned by a finished quiz
pub fn badges_for(outcome: &QuizOutcome) -> Vec<Badge> {
    let mut badges = vec![COMPLETION_BADGE];
    if outcome.is_perfect() {
        badges.push(EXCELLENCE_BADGE);
    }
    badges
}

/// Builder-flow reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Satellite name
    pub satellite_name: String,
    /// Correct answers
    pub score: usize,
    /// Number of questions
    pub total: usize,
    /// Score reached the passing threshold
    pub passed: bool,
    /// Date of award
    pub awarded_on: NaiveDate,
}

impl Certificate {
    /// Issue a certificate for `outcome`
    pub fn issue(
        outcome: &QuizOutcome,
        satellite_name: Option<&str>,
        passing_score: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let satellite_name = satellite_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SATELLITE_NAME)
            .to_string();

        Self {
            satellite_name,
            score: outcome.score,
            total: outcome.total,
            passed: outcome.score >= passing_score,
            awarded_on: now.date_naive(),
        }
    }

    /// Headline
    pub fn title(&self) -> &'static str {
        if self.passed {
            "Mission Accomplished!"
        } else {
            "Mission Status Update"
        }
    }

    /// Spoken reward message
    pub fn message(&self) -> String {
        if self.passed {
            format!(
                "Congratulations! You've earned the Space Explorer Badge for your excellent knowledge about satellites. Your satellite \"{}\" is ready for its mission!",
                self.satellite_name
            )
        } else {
            format!(
                "You've completed the satellite builder challenge, but there's still more to learn! Try the quiz again to earn your Space Explorer Badge. Your satellite \"{}\" is almost ready for launch!",
                self.satellite_name
            )
        }
    }

    /// Award date as shown on the certificate, e.g. "October 14, 2026"
    pub fn formatted_date(&self) -> String {
        self.awarded_on.format("%B %-d, %Y").to_string()
    }
}
