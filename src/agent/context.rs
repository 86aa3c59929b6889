//! Per-agent actuation state.

use crate::domain::{ActuationCommand, Actuator};
use crate::error::Result;

/// Owns the single live [`ActuationCommand`] for one agent process together
/// with the actuator it is sent through. The orchestrator and the stabilizer
/// both mutate the command through this context; they never run concurrently
/// for the same agent.
pub struct AgentContext<A: Actuator> {
    id: String,
    command: ActuationCommand,
    actuator: A,
}

impl<A: Actuator> AgentContext<A> {
    pub fn new(id: impl Into<String>, actuator: A) -> Self {
        Self {
            id: id.into(),
            command: ActuationCommand::halt(),
            actuator,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The currently latched command.
    pub fn command(&self) -> &ActuationCommand {
        &self.command
    }

    /// Overwrite the latched command without sending it.
    pub fn set_command(&mut self, command: ActuationCommand) {
        self.command = command;
    }

    /// Send the latched command to the actuator.
    pub async fn send(&mut self) -> Result<()> {
        self.actuator.send(&self.command).await
    }

    /// Latch a command and send it immediately.
    pub async fn apply(&mut self, command: ActuationCommand) -> Result<()> {
        self.command = command;
        self.send().await
    }

    /// Current heading, radians.
    pub async fn read_yaw(&mut self) -> Result<f64> {
        Ok(self.actuator.read_pose().await?.yaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pose;
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingActuator {
        sent: Vec<ActuationCommand>,
    }

    #[async_trait]
    impl Actuator for RecordingActuator {
        async fn send(&mut self, cmd: &ActuationCommand) -> Result<()> {
            self.sent.push(cmd.clone());
            Ok(())
        }

        async fn read_pose(&mut self) -> Result<Pose> {
            Ok(Pose { yaw: 0.25 })
        }
    }

    #[tokio::test]
    async fn test_apply_latches_and_sends() {
        let mut ctx = AgentContext::new("605", RecordingActuator::default());
        assert_eq!(*ctx.command(), ActuationCommand::halt());

        ctx.apply(ActuationCommand::walk([0.3, 0.0])).await.unwrap();
        assert_eq!(*ctx.command(), ActuationCommand::walk([0.3, 0.0]));

        // Re-send keeps the latched command
        ctx.send().await.unwrap();
        assert_eq!(ctx.actuator.sent.len(), 2);
        assert_eq!(ctx.actuator.sent[0], ctx.actuator.sent[1]);
    }

    #[tokio::test]
    async fn test_read_yaw() {
        let mut ctx = AgentContext::new("605", RecordingActuator::default());
        assert_eq!(ctx.read_yaw().await.unwrap(), 0.25);
    }
}
