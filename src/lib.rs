//! Spacey – runtime for the Spacey Satellite Builder lesson
//!
//! This crate implements the activity logic behind the lesson:
//! - A stage controller that sequences the learner through a fixed flow,
//!   gating each advance and serializing transitions with a lock
//! - A quiz engine, satellite assembly tracker, and reward rules
//! - Narration and camera permission channels behind provider traits, with
//!   stale-callback filtering and a watchdog for unreliable speech engines
//! - A session that turns learner intents and provider signals into turns,
//!   plus a tokio driver and CLI for running one

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Activity runtime modules
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{ActivityConfig, ActivityEvent, Session};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
