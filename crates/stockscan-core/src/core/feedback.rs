//! Confirmation cue interface
//!
//! Audio or haptic playback is platform territory; the scanner only needs
//! to ask for a cue and move on.

/// Plays the "scan accepted" cue.
///
/// Implementations must return quickly; playback is fire-and-forget.
pub trait FeedbackSink: Send + Sync {
    /// Play the confirmation cue once.
    fn play_confirmation(&self);
}

/// Feedback sink that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn play_confirmation(&self) {}
}
