//! Collaborator traits shared across crates.

pub mod feedback;

pub use feedback::{FeedbackSink, NoFeedback};
