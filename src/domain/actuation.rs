//! Actuation boundary: the command profile sent to the locomotion hardware
//! and the trait the rest of the system drives it through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// High-level locomotion command profile.
///
/// Exactly one instance is live per agent process, owned by the control loop
/// and overwritten in place before each send. The field values are calibration
/// data for the reference platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationCommand {
    /// Locomotion mode (0 = idle, 1 = stand, 2 = walk, 12/13 = dance programs)
    pub mode: u8,
    pub gait_type: u8,
    pub speed_level: u8,
    pub foot_raise_height: f32,
    pub body_height: f32,
    /// Body orientation (roll, pitch, yaw), radians
    pub euler: [f32; 3],
    /// Planar velocity (forward, lateral), m/s
    pub velocity: [f32; 2],
    /// In-place rotation rate, rad/s
    pub yaw_speed: f32,
    pub reserve: u32,
}

impl Default for ActuationCommand {
    fn default() -> Self {
        Self::halt()
    }
}

impl ActuationCommand {
    /// The all-zero command: stops every actuator. Doubles as the designated
    /// no-op for unknown maneuvers.
    pub fn halt() -> Self {
        Self {
            mode: 0,
            gait_type: 0,
            speed_level: 0,
            foot_raise_height: 0.0,
            body_height: 0.0,
            euler: [0.0, 0.0, 0.0],
            velocity: [0.0, 0.0],
            yaw_speed: 0.0,
            reserve: 0,
        }
    }

    /// Walk at the given planar velocity.
    pub fn walk(velocity: [f32; 2]) -> Self {
        Self {
            mode: 2,
            gait_type: 1,
            foot_raise_height: 0.1,
            velocity,
            ..Self::halt()
        }
    }

    /// Rotate in place at the given rate. Translation stays zero while the
    /// stabilizer runs.
    pub fn spin(yaw_speed: f32) -> Self {
        Self {
            mode: 2,
            yaw_speed,
            ..Self::halt()
        }
    }
}

/// Pose sample reported by the platform IMU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Heading about the vertical axis, radians
    pub yaw: f64,
}

/// Hardware seam. The concrete SDK glue (motor control, IMU sampling) lives
/// outside this crate; tests substitute scripted implementations.
#[async_trait]
pub trait Actuator: Send {
    async fn send(&mut self, cmd: &ActuationCommand) -> Result<()>;
    async fn read_pose(&mut self) -> Result<Pose>;
}

/// Actuator that logs commands instead of driving hardware. Used when an
/// agent runs without the platform SDK attached.
#[derive(Debug, Default)]
pub struct ConsoleActuator;

#[async_trait]
impl Actuator for ConsoleActuator {
    async fn send(&mut self, cmd: &ActuationCommand) -> Result<()> {
        debug!(
            mode = cmd.mode,
            velocity = ?cmd.velocity,
            yaw_speed = cmd.yaw_speed,
            "Sending command to the robot"
        );
        Ok(())
    }

    async fn read_pose(&mut self) -> Result<Pose> {
        Ok(Pose { yaw: 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_halt() {
        let cmd = ActuationCommand::default();
        assert_eq!(cmd, ActuationCommand::halt());
        assert_eq!(cmd.mode, 0);
        assert_eq!(cmd.velocity, [0.0, 0.0]);
    }

    #[test]
    fn test_walk_profile() {
        let cmd = ActuationCommand::walk([0.3, 0.0]);
        assert_eq!(cmd.mode, 2);
        assert_eq!(cmd.gait_type, 1);
        assert_eq!(cmd.foot_raise_height, 0.1);
        assert_eq!(cmd.velocity, [0.3, 0.0]);
        assert_eq!(cmd.yaw_speed, 0.0);
    }

    #[test]
    fn test_spin_keeps_translation_zero() {
        let cmd = ActuationCommand::spin(1.5);
        assert_eq!(cmd.mode, 2);
        assert_eq!(cmd.velocity, [0.0, 0.0]);
        assert_eq!(cmd.yaw_speed, 1.5);
    }
}
