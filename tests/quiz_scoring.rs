//! Quiz scoring tests
//!
//! Runs both question banks through the engine with arbitrary answers and
//! checks the score, feedback tier, and badges that come out.

use proptest::prelude::*;
use spacey::runtime::content;
use spacey::runtime::error::QuizError;
use spacey::runtime::quiz::{QuizEngine, QuizProgress};
use spacey::runtime::reward::{self, FeedbackTier};
use spacey::runtime::stage::FlowKind;

fn run_quiz(engine: &mut QuizEngine, picks: &[usize]) -> usize {
    let mut expected = 0;
    for &pick in picks {
        let question = engine.current().unwrap();
        let index = pick % question.options.len();
        if question.is_correct(index) {
            expected += 1;
        }
        engine.select_answer(index).unwrap();
        let feedback = engine.submit_answer().unwrap();
        assert_eq!(feedback.correct, question.is_correct(index));
        engine.advance().unwrap();
    }
    expected
}

#[test]
fn perfect_guided_quiz() {
    let questions = content::for_flow(FlowKind::Guided).questions;
    let mut engine = QuizEngine::new(questions);
    let picks: Vec<usize> = questions
        .iter()
        .map(|q| q.correct_index().unwrap())
        .collect();
    assert_eq!(run_quiz(&mut engine, &picks), 5);

    let outcome = engine.outcome().unwrap();
    assert_eq!((outcome.score, outcome.total), (5, 5));
    assert_eq!(outcome.percentage(), 100);
    assert_eq!(FeedbackTier::from_outcome(outcome), FeedbackTier::Excellent);
    assert_eq!(reward::badges_for(outcome).len(), 2);
}

#[test]
fn builder_answer_key() {
    let questions = content::for_flow(FlowKind::Builder).questions;
    let key: String = questions.iter().map(|q| q.correct).collect();
    assert_eq!(key, "cadbc");
}

#[test]
fn changing_selection_before_submit() {
    let questions = content::for_flow(FlowKind::Guided).questions;
    let mut engine = QuizEngine::new(questions);
    let right = questions[0].correct_index().unwrap();
    let wrong = (right + 1) % questions[0].options.len();

    engine.select_answer(wrong).unwrap();
    engine.select_answer(right).unwrap();
    assert!(engine.submit_answer().unwrap().correct);
    assert_eq!(engine.select_answer(wrong), Err(QuizError::AlreadyAnswered(0)));
    assert_eq!(engine.submit_answer(), Err(QuizError::AlreadyAnswered(0)));
    assert_eq!(engine.score(), 1);
}

#[test]
fn complete_quiz_rejects_input_until_reset() {
    let questions = content::for_flow(FlowKind::Guided).questions;
    let mut engine = QuizEngine::new(questions);
    run_quiz(&mut engine, &[0, 0, 0, 0, 0]);
    assert!(engine.is_complete());
    assert_eq!(engine.select_answer(0), Err(QuizError::Complete));
    assert_eq!(engine.advance(), Err(QuizError::Complete));

    engine.reset();
    assert_eq!(engine.question_index(), 0);
    assert_eq!(engine.score(), 0);
    assert!(matches!(engine.select_answer(0), Ok(())));
}

proptest! {
    #[test]
    fn score_matches_correct_picks(flow in prop_oneof![Just(FlowKind::Guided), Just(FlowKind::Builder)],
                                   picks in prop::collection::vec(0usize..8, 5)) {
        let questions = content::for_flow(flow).questions;
        let mut engine = QuizEngine::new(questions);
        let expected = run_quiz(&mut engine, &picks);

        let outcome = engine.outcome().unwrap();
        prop_assert_eq!(outcome.score, expected);
        prop_assert!(outcome.score <= outcome.total);
        prop_assert_eq!(outcome.responses.len(), questions.len());
        prop_assert!(outcome.percentage() <= 100);
        prop_assert_eq!(reward::badges_for(outcome).len(), if expected == 5 { 2 } else { 1 });
    }

    #[test]
    fn advance_requires_submission(picks in prop::collection::vec(0usize..4, 1..5)) {
        let questions = content::for_flow(FlowKind::Guided).questions;
        let mut engine = QuizEngine::new(questions);
        for (i, pick) in picks.into_iter().enumerate() {
            prop_assert_eq!(engine.advance(), Err(QuizError::NotAnswered(i)));
            engine.select_answer(pick).unwrap();
            prop_assert_eq!(engine.advance(), Err(QuizError::NotAnswered(i)));
            engine.submit_answer().unwrap();
            prop_assert_eq!(engine.advance(), Ok(QuizProgress::Next(i + 1)));
        }
    }
}
