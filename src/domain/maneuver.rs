//! Symbolic maneuver names and their calibrated command profiles.

use std::fmt;

use crate::domain::actuation::ActuationCommand;

/// Closed set of maneuvers an agent accepts over the wire. Names outside the
/// table parse to `Unknown` and are ignored with a log line, never rejected
/// with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Maneuver {
    Tilt,
    DanceOne,
    DanceTwo,
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    /// Triggers the full triangle choreography sequence instead of a single
    /// actuation.
    Triangle,
    Unknown(String),
}

impl Maneuver {
    /// Total parse: never fails.
    pub fn parse(name: &str) -> Self {
        match name {
            "tilt" => Maneuver::Tilt,
            "dance-1" => Maneuver::DanceOne,
            "dance-2" => Maneuver::DanceTwo,
            "forward" => Maneuver::Forward,
            "backward" => Maneuver::Backward,
            "left" => Maneuver::Left,
            "right" => Maneuver::Right,
            "stop" => Maneuver::Stop,
            "triangle" => Maneuver::Triangle,
            other => Maneuver::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Maneuver::Tilt => "tilt",
            Maneuver::DanceOne => "dance-1",
            Maneuver::DanceTwo => "dance-2",
            Maneuver::Forward => "forward",
            Maneuver::Backward => "backward",
            Maneuver::Left => "left",
            Maneuver::Right => "right",
            Maneuver::Stop => "stop",
            Maneuver::Triangle => "triangle",
            Maneuver::Unknown(name) => name,
        }
    }

    /// True for the maneuver that runs the phase sequence rather than a
    /// single command.
    pub fn is_choreography(&self) -> bool {
        matches!(self, Maneuver::Triangle)
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a maneuver to its command profile. Pure and total: the same maneuver
/// always yields the same command. The constants are platform calibration
/// data, preserved as-is.
///
/// `Triangle` maps to the neutral walk stance the sequence starts from; the
/// caller routes it to the orchestrator instead of actuating it directly.
/// `Unknown` maps to the designated no-op (halt) and must not be actuated.
pub fn dispatch(maneuver: &Maneuver) -> ActuationCommand {
    match maneuver {
        Maneuver::Tilt => ActuationCommand {
            mode: 1,
            euler: [0.0, 0.0, -0.3],
            ..ActuationCommand::halt()
        },
        Maneuver::DanceOne => ActuationCommand {
            mode: 12,
            gait_type: 1,
            ..ActuationCommand::halt()
        },
        Maneuver::DanceTwo => ActuationCommand {
            mode: 13,
            gait_type: 1,
            ..ActuationCommand::halt()
        },
        Maneuver::Forward => ActuationCommand::walk([0.3, 0.0]),
        Maneuver::Backward => ActuationCommand::walk([-0.3, 0.0]),
        Maneuver::Left => ActuationCommand::walk([0.0, 0.3]),
        Maneuver::Right => ActuationCommand::walk([0.0, -0.3]),
        Maneuver::Stop => ActuationCommand::halt(),
        Maneuver::Triangle => ActuationCommand::walk([0.0, 0.0]),
        Maneuver::Unknown(_) => ActuationCommand::halt(),
    }
}
