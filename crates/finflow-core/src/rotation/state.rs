//! Rotation progress

use std::fmt;

/// Where a rotation is. Any state may move to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationState {
    Idle,
    Authenticating,
    RefreshRequested,
    AwaitingRefresh,
    Extracted,
    Published,
    Failed { reason: String },
}

impl RotationState {
    /// Whether `next` may follow `self`
    pub fn can_transition_to(&self, next: &RotationState) -> bool {
        use RotationState::*;
        match (self, next) {
            (_, Failed { .. }) => true,
            // A new rotation may start from any settled state
            (Idle | Published | Failed { .. } | Extracted, Authenticating) => true,
            (Authenticating, RefreshRequested) => true,
            (RefreshRequested, AwaitingRefresh) => true,
            (AwaitingRefresh, Extracted) => true,
            (Extracted, Published) => true,
            _ => false,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RotationState::Failed { .. })
    }
}

impl Default for RotationState {
    fn default() -> Self {
        RotationState::Idle
    }
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationState::Idle => write!(f, "idle"),
            RotationState::Authenticating => write!(f, "authenticating"),
            RotationState::RefreshRequested => write!(f, "refresh requested"),
            RotationState::AwaitingRefresh => write!(f, "awaiting refresh"),
            RotationState::Extracted => write!(f, "token extracted"),
            RotationState::Published => write!(f, "published"),
            RotationState::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
