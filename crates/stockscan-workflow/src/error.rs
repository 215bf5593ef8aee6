//! Workflow errors

use crate::registry::ScreenId;
use thiserror::Error;

/// Errors from coordinators and the screen registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The coordinator task has ended
    #[error("The {screen} coordinator has stopped")]
    Stopped {
        /// Name of the coordinator.
        screen: String,
    },

    /// Nothing is registered for the screen
    #[error("No coordinator registered for the {0} screen")]
    UnknownScreen(ScreenId),

    /// No screen is active
    #[error("No screen is active")]
    NoActiveScreen,
}
