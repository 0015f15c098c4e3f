//! Error types for the activity runtime
//!
//! Each concern gets its own thiserror enum. None of these are fatal to a
//! session: the session logs a rejection and carries on with unchanged state.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::assembly::PartId;
use super::stage::Stage;

/// Top-level runtime error
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Stage transition rejected
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Quiz input rejected
    #[error("Quiz error: {0}")]
    Quiz(#[from] QuizError),

    /// Assembly input rejected
    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    /// Narration channel failure
    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError),

    /// Camera permission failure
    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The event does not apply to the active stage
    #[error("{event} is not accepted during the {stage} stage")]
    WrongStage {
        /// Stage that was active
        stage: Stage,
        /// Short event name
        event: &'static str,
    },

    /// The session has been shut down
    #[error("Session has been shut down")]
    ShutDown,
}

/// Stage transition errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Another transition is still settling
    #[error("Transition to {requested} ignored: transition lock held")]
    Locked {
        /// Stage that was requested
        requested: Stage,
    },

    /// Target is not a successor of the current stage
    #[error("Transition from {from} to {to} is not permitted")]
    NotPermitted {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },

    /// A gate of the current stage is still closed
    #[error("Cannot leave {stage} yet: waiting for {gate}")]
    Gated {
        /// Current stage
        stage: Stage,
        /// Name of the closed gate
        gate: &'static str,
    },

    /// Operation only applies to another stage
    #[error("Expected the {expected} stage, currently in {actual}")]
    NotInStage {
        /// Stage the operation needs
        expected: Stage,
        /// Current stage
        actual: Stage,
    },
}

/// Convenience result alias for transitions
pub type TransitionResult<T> = std::result::Result<T, TransitionError>;

/// Quiz input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Answer already submitted for this question
    #[error("Question {0} has already been answered")]
    AlreadyAnswered(usize),

    /// Submit without a selection
    #[error("No answer selected")]
    NoSelection,

    /// Advance before submitting
    #[error("Question {0} has not been answered yet")]
    NotAnswered(usize),

    /// Option index outside the question's options
    #[error("Option {index} out of range (question has {available} options)")]
    OptionOutOfRange {
        /// Requested option
        index: usize,
        /// Number of options
        available: usize,
    },

    /// Quiz finished; reset required
    #[error("Quiz is complete")]
    Complete,

    /// Question bank is empty
    #[error("Quiz has no questions")]
    Empty,
}

/// Convenience result alias for quiz operations
pub type QuizResult<T> = std::result::Result<T, QuizError>;

/// Assembly input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// Identifier does not name a catalog part
    #[error("Unknown satellite part '{0}'")]
    UnknownPart(String),

    /// Naming or finalizing before every part is placed
    #[error("Satellite is incomplete: {missing} part(s) still to place")]
    Incomplete {
        /// Parts not yet placed
        missing: usize,
    },

    /// Name was empty after trimming
    #[error("Satellite name must not be empty")]
    EmptyName,

    /// Satellite already launched
    #[error("Satellite '{0}' has already been finalized")]
    AlreadyFinalized(String),

    /// Part placed after finalization
    #[error("Cannot place {0} after finalization")]
    Sealed(PartId),
}

/// Convenience result alias for assembly operations
pub type AssemblyResult<T> = std::result::Result<T, AssemblyError>;

/// Narration channel errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    /// No speech engine available
    #[error("Speech synthesis is not supported")]
    Unsupported,

    /// Nothing to say
    #[error("Narration text is empty")]
    EmptyText,

    /// Engine rejected or failed the utterance
    #[error("Speech engine error: {0}")]
    Engine(String),
}

/// Convenience result alias for narration operations
pub type NarrationResult<T> = std::result::Result<T, NarrationError>;

/// Camera permission errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// A request is already outstanding
    #[error("Camera request {0} is still pending")]
    Pending(u64),

    /// Camera already granted for this session
    #[error("Camera access already granted")]
    AlreadyGranted,

    /// Retry without a prior denial
    #[error("Camera access has not been denied; nothing to retry")]
    NothingToRetry,

    /// Provider could not issue the request
    #[error("Camera provider failed: {0}")]
    Provider(String),
}

/// Convenience result alias for permission operations
pub type PermissionResult<T> = std::result::Result<T, PermissionError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Value out of range
    #[error("Invalid value for {field}: {detail}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using RuntimeError
pub type Result<T> = std::result::Result<T, RuntimeError>;
