//! Implementations of the selection and decision oracles.
//!
//! [`console`] talks to an operator over stdin/stdout; [`scripted`] replays
//! a fixed list of answers.

pub mod console;
pub mod scripted;
