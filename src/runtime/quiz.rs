//! Quiz engine
//!
//! Drives one question at a time over a fixed question bank. A question is
//! answered in two steps: select (revisable) then submit (final). Score moves
//! only on submit, and at most once per question.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{QuizError, QuizResult};

/// One selectable option of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizOption {
    /// Option identifier ('a', 'b', ...)
    pub id: char,
    /// Display text
    pub text: &'static str,
}

/// A question from a compile-time bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    /// Question number within its bank
    pub id: u32,
    /// Prompt read to the learner
    pub prompt: &'static str,
    /// Ordered options
    pub options: &'static [QuizOption],
    /// Identifier of the correct option
    pub correct: char,
    /// Explanation shown after submission
    pub explanation: &'static str,
}

impl Question {
    /// Position of the correct option, if the bank is well formed
    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| o.id == self.correct)
    }

    /// Whether option `index` is the correct one
    pub fn is_correct(&self, index: usize) -> bool {
        self.options.get(index).is_some_and(|o| o.id == self.correct)
    }
}

/// Result of submitting an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    /// Question that was answered
    pub question_index: usize,
    /// Whether the submitted option was correct
    pub correct: bool,
    /// Identifier of the correct option
    pub correct_option: char,
    /// Explanation text for the question
    pub explanation: String,
}

/// One recorded answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Question id
    pub question: u32,
    /// Submitted option id
    pub chosen: char,
    /// Whether it was correct
    pub correct: bool,
}

/// Final result of a quiz run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOutcome {
    /// Correct answers
    pub score: usize,
    /// Number of questions
    pub total: usize,
    /// Answers in question order
    pub responses: Vec<Response>,
}

impl QuizOutcome {
    /// Score as a percentage of the total
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.score * 100) / self.total) as u32
    }

    /// Every question answered correctly
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }
}

/// What `advance` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizProgress {
    /// Moved to the question at this index
    Next(usize),
    /// Last question done
    Complete(QuizOutcome),
}

/// Quiz state over a question bank
#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: &'static [Question],
    question_index: usize,
    score: usize,
    selected: Option<usize>,
    answered: bool,
    responses: Vec<Response>,
    outcome: Option<QuizOutcome>,
}

impl QuizEngine {
    /// Create an engine over `questions`
    pub fn new(questions: &'static [Question]) -> Self {
        Self {
            questions,
            question_index: 0,
            score: 0,
            selected: None,
            answered: false,
            responses: Vec::with_capacity(questions.len()),
            outcome: None,
        }
    }

    /// Number of questions
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Index of the current question
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Current question, `None` if the bank is empty
    pub fn current(&self) -> Option<&'static Question> {
        self.questions.get(self.question_index)
    }

    /// Correct answers so far
    pub fn score(&self) -> usize {
        self.score
    }

    /// Selected option for the current question
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Whether the current question has been submitted
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Final outcome once the last question has been advanced past
    pub fn outcome(&self) -> Option<&QuizOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the quiz has finished
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    fn ensure_open(&self) -> QuizResult<&'static Question> {
        if self.outcome.is_some() {
            return Err(QuizError::Complete);
        }
        self.current().ok_or(QuizError::Empty)
    }

    /// Select option `index` for the current question
    ///
    /// Overwrites any previous selection; has no effect on the score.
    pub fn select_answer(&mut self, index: usize) -> QuizResult<()> {
        let question = self.ensure_open()?;
        if self.answered {
            return Err(QuizError::AlreadyAnswered(self.question_index));
        }
        if index >= question.options.len() {
            return Err(QuizError::OptionOutOfRange {
                index,
                available: question.options.len(),
            });
        }
        debug!(question = self.question_index, option = index, "Answer selected");
        self.selected = Some(index);
        Ok(())
    }

    /// Submit the selected option
    pub fn submit_answer(&mut self) -> QuizResult<AnswerFeedback> {
        let question = self.ensure_open()?;
        if self.answered {
            return Err(QuizError::AlreadyAnswered(self.question_index));
        }
        let chosen = self.selected.ok_or(QuizError::NoSelection)?;

        self.answered = true;
        let correct = question.is_correct(chosen);
        if correct {
            self.score += 1;
        }
        self.responses.push(Response {
            question: question.id,
            chosen: question.options[chosen].id,
            correct,
        });

        info!(
            question = self.question_index,
            correct,
            score = self.score,
            "Answer submitted"
        );

        Ok(AnswerFeedback {
            question_index: self.question_index,
            correct,
            correct_option: question.correct,
            explanation: question.explanation.to_string(),
        })
    }

    /// Move past the current (answered) question
    pub fn advance(&mut self) -> QuizResult<QuizProgress> {
        self.ensure_open()?;
        if !self.answered {
            return Err(QuizError::NotAnswered(self.question_index));
        }

        if self.question_index + 1 < self.questions.len() {
            self.question_index += 1;
            self.selected = None;
            self.answered = false;
            return Ok(QuizProgress::Next(self.question_index));
        }

        let outcome = QuizOutcome {
            score: self.score,
            total: self.questions.len(),
            responses: self.responses.clone(),
        };
        info!(score = outcome.score, total = outcome.total, "Quiz complete");
        self.outcome = Some(outcome.clone());
        Ok(QuizProgress::Complete(outcome))
    }

    /// Return to the first question with a zero score
    pub fn reset(&mut self) {
        self.question_index = 0;
        self.score = 0;
        self.selected = None;
        self.answered = false;
        self.responses.clear();
        self.outcome = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: &[QuizOption] = &[
        QuizOption { id: 'a', text: "Yes" },
        QuizOption { id: 'b', text: "No" },
    ];

    const BANK: &[Question] = &[
        Question {
            id: 1,
            prompt: "First?",
            options: OPTIONS,
            correct: 'a',
            explanation: "Because.",
        },
        Question {
            id: 2,
            prompt: "Second?",
            options: OPTIONS,
            correct: 'b',
            explanation: "Also because.",
        },
    ];

    #[test]
    fn test_submit_requires_selection() {
        let mut quiz = QuizEngine::new(BANK);
        assert_eq!(quiz.submit_answer(), Err(QuizError::NoSelection));
        assert!(!quiz.is_answered());
    }

    #[test]
    fn test_reselect_before_submit_overwrites() {
        let mut quiz = QuizEngine::new(BANK);
        quiz.select_answer(1).unwrap();
        quiz.select_answer(0).unwrap();
        let feedback = quiz.submit_answer().unwrap();
        assert!(feedback.correct);
        assert_eq!(quiz.score(), 1);
    }

    #[test]
    fn test_select_after_submit_rejected() {
        let mut quiz = QuizEngine::new(BANK);
        quiz.select_answer(1).unwrap();
        quiz.submit_answer().unwrap();
        assert_eq!(quiz.select_answer(0), Err(QuizError::AlreadyAnswered(0)));
        assert_eq!(quiz.selected(), Some(1));
        assert_eq!(quiz.submit_answer(), Err(QuizError::AlreadyAnswered(0)));
        assert_eq!(quiz.score(), 0);
    }

    #[test]
    fn test_option_out_of_range() {
        let mut quiz = QuizEngine::new(BANK);
        assert_eq!(
            quiz.select_answer(4),
            Err(QuizError::OptionOutOfRange { index: 4, available: 2 })
        );
    }

    #[test]
    fn test_advance_requires_answer_and_resets() {
        let mut quiz = QuizEngine::new(BANK);
        assert_eq!(quiz.advance(), Err(QuizError::NotAnswered(0)));

        quiz.select_answer(0).unwrap();
        quiz.submit_answer().unwrap();
        assert_eq!(quiz.advance(), Ok(QuizProgress::Next(1)));
        assert_eq!(quiz.selected(), None);
        assert!(!quiz.is_answered());
    }

    #[test]
    fn test_completion_locks_input_until_reset() {
        let mut quiz = QuizEngine::new(BANK);
        for choice in [0, 0] {
            quiz.select_answer(choice).unwrap();
            quiz.submit_answer().unwrap();
            quiz.advance().unwrap();
        }
        let outcome = quiz.outcome().cloned().unwrap();
        assert_eq!((outcome.score, outcome.total), (1, 2));
        assert_eq!(outcome.percentage(), 50);
        assert_eq!(quiz.select_answer(0), Err(QuizError::Complete));
        assert_eq!(quiz.submit_answer(), Err(QuizError::Complete));
        assert_eq!(quiz.advance(), Err(QuizError::Complete));

        quiz.reset();
        assert_eq!(quiz.question_index(), 0);
        assert_eq!(quiz.score(), 0);
        assert!(quiz.select_answer(1).is_ok());
    }

    #[test]
    fn test_empty_bank() {
        let mut quiz = QuizEngine::new(&[]);
        assert_eq!(quiz.select_answer(0), Err(QuizError::Empty));
    }
}
