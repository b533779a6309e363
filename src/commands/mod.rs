//! Command handlers behind the CLI.
//!
//! Each handler borrows the shared [`CoreState`](crate::core_state::CoreState),
//! returns a serializable view and reports failures as display strings.

pub mod engine;
pub mod lexicon;
pub mod process;
pub mod results;
