//! Status codes for stepping operations.

/// Outcome of a stepping operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The step advanced the state.
    Success,
    /// No progress was made: the proposed step would cross the target
    /// endpoint, or the step could not be resolved at any admissible size.
    NoProgress,
}
