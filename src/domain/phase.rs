//! Choreography phase state machine states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of the triangle sequence. Transitions are time-driven except
/// RealignOut, which runs until the heading stabilizer converges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for a choreography trigger
    Idle,
    /// Role-specific translation into formation
    Approach,
    /// Settled, waiting for the shared dance deadline
    Hold,
    /// Dance program running
    Perform,
    /// Restore heading and formation, then return to Idle
    RealignOut,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Approach => "APPROACH",
            Phase::Hold => "HOLD",
            Phase::Perform => "PERFORM",
            Phase::RealignOut => "REALIGN_OUT",
        }
    }

    /// Check if this phase can transition to another phase
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;

        matches!(
            (self, target),
            (Idle, Approach)
                | (Approach, Hold)
                | (Hold, Perform)
                | (Perform, RealignOut)
                | (RealignOut, Idle)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
