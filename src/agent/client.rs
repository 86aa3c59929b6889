//! Agent-side relay client.
//!
//! One cooperative control flow: a single inbound-message loop in which
//! maneuver execution blocks the loop. A command arriving mid-choreography
//! queues in the transport and is acted on only after the current sequence
//! completes. Channel loss terminates the loop; there is no mid-phase abort.

use rand::Rng;
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::frame::coding::CloseCode, tungstenite::Message,
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::agent::AgentContext;
use crate::choreography::{Orchestrator, Roster};
use crate::config::{AgentConfig, AppConfig, ChoreographyConfig, ControlConfig};
use crate::domain::{dispatch, ActuationCommand, Actuator, Envelope, Maneuver};
use crate::error::{Result, StrutError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection attempts before giving up on the relay
const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// One robot's relay client: connects with its identity and the shared
/// passcode, then processes inbound commands until the channel closes.
pub struct AgentClient<A: Actuator> {
    config: AgentConfig,
    control: ControlConfig,
    choreography: ChoreographyConfig,
    roster: Roster,
    passcode: String,
    ctx: AgentContext<A>,
}

impl<A: Actuator> AgentClient<A> {
    pub fn new(
        config: &AppConfig,
        id: impl Into<String>,
        passcode: impl Into<String>,
        actuator: A,
    ) -> Self {
        Self {
            config: config.agent.clone(),
            control: config.control.clone(),
            choreography: config.choreography.clone(),
            roster: Roster::from_config(&config.roster),
            passcode: passcode.into(),
            ctx: AgentContext::new(id, actuator),
        }
    }

    /// Connect (with bounded backoff) and run the control loop until the
    /// channel closes. Best-effort halt on the way out; guaranteeing a safe
    /// stop is the external watchdog's job.
    pub async fn run(&mut self) -> Result<()> {
        let stream = self.connect_with_backoff().await?;
        let result = self.listen(stream).await;
        let _ = self.ctx.apply(ActuationCommand::halt()).await;
        result
    }

    fn endpoint(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.relay_url)
            .map_err(|e| StrutError::Internal(format!("Invalid relay URL: {}", e)))?;
        url.set_path(&format!("/ws/{}", self.ctx.id()));
        url.query_pairs_mut()
            .clear()
            .append_pair("passcode", &self.passcode);
        Ok(url)
    }

    async fn connect_with_backoff(&self) -> Result<WsStream> {
        let url = self.endpoint()?;
        let max_delay = Duration::from_secs(self.config.max_reconnect_delay_secs);
        let mut attempt: u32 = 0;

        loop {
            info!(id = self.ctx.id(), "Connecting to relay at {}", url);
            match connect_async(url.as_str()).await {
                Ok((stream, _)) => {
                    info!(id = self.ctx.id(), "Connected to relay");
                    return Ok(stream);
                }
                Err(e) => {
                    attempt += 1;
                    error!("Relay connection failed (attempt {}): {}", attempt, e);
                    if attempt >= MAX_CONNECT_ATTEMPTS {
                        return Err(e.into());
                    }
                }
            }

            // Backoff with jitter
            let base = Duration::from_secs(1) * attempt.min(10);
            let delay = base.min(max_delay);
            let jitter_range = (delay.as_millis() as u64 / 4).max(1);
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..jitter_range));
            let final_delay = delay + jitter;

            info!("Retrying in {:?} (attempt {})", final_delay, attempt + 1);
            sleep(final_delay).await;
        }
    }

    async fn listen(&mut self, stream: WsStream) -> Result<()> {
        use futures_util::{SinkExt, StreamExt};

        let (mut write, mut read) = stream.split();

        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    // Maneuver execution blocks this loop; later commands queue
                    // in the transport until the sequence completes
                    if let Err(e) = self.handle_frame(&text).await {
                        error!(id = self.ctx.id(), "Command handling failed: {}", e);
                    }
                }
                Ok(Message::Ping(data)) => {
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        error!("Failed to send pong: {}", e);
                    }
                }
                Ok(Message::Close(frame)) => {
                    if let Some(frame) = &frame {
                        if frame.code == CloseCode::Policy {
                            return Err(StrutError::Auth(
                                "relay rejected the passcode".to_string(),
                            ));
                        }
                    }
                    info!(id = self.ctx.id(), "Received close frame from relay");
                    break;
                }
                Ok(_) => {}
                Err(e) => return Err(e.into()),
            }
        }

        info!(id = self.ctx.id(), "Relay channel closed");
        Ok(())
    }

    /// Decode and act on one inbound frame. Malformed payloads are dropped
    /// with a log line; the connection stays open.
    async fn handle_frame(&mut self, text: &str) -> Result<()> {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(id = self.ctx.id(), "Dropping malformed frame: {}", e);
                return Ok(());
            }
        };

        match envelope {
            Envelope::Command { command } => self.process_command(&command).await,
            Envelope::Status { client_id, status } => {
                info!(peer = %client_id, status = %status, "Peer status change");
                Ok(())
            }
            Envelope::Echo { message } => {
                debug!(id = self.ctx.id(), message = %message, "Echo from relay");
                Ok(())
            }
        }
    }

    async fn process_command(&mut self, name: &str) -> Result<()> {
        let maneuver = Maneuver::parse(name);
        info!(id = self.ctx.id(), maneuver = %maneuver, "Processing command");

        match maneuver {
            Maneuver::Triangle => match self.roster.resolve(self.ctx.id()) {
                Some(role) => {
                    let mut orchestrator =
                        Orchestrator::new(self.choreography.clone(), self.control.clone(), role);
                    orchestrator.run(&mut self.ctx).await
                }
                None => {
                    warn!(
                        id = self.ctx.id(),
                        "Identity has no role in the roster; ignoring choreography trigger"
                    );
                    Ok(())
                }
            },
            Maneuver::Unknown(name) => {
                warn!(command = %name, "Unknown command received");
                Ok(())
            }
            maneuver => self.ctx.apply(dispatch(&maneuver)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RosterConfig, RosterMember};
    use crate::domain::Pose;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingActuator {
        sent: Arc<Mutex<Vec<ActuationCommand>>>,
    }

    impl RecordingActuator {
        fn sent(&self) -> Vec<ActuationCommand> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Actuator for RecordingActuator {
        async fn send(&mut self, cmd: &ActuationCommand) -> Result<()> {
            self.sent.lock().unwrap().push(cmd.clone());
            Ok(())
        }

        async fn read_pose(&mut self) -> Result<Pose> {
            Ok(Pose { yaw: 0.0 })
        }
    }

    fn client_for(id: &str) -> (AgentClient<RecordingActuator>, RecordingActuator) {
        let mut config = AppConfig::default();
        config.roster = RosterConfig {
            members: vec![RosterMember {
                id: "605".to_string(),
                approach: [0.0, 0.0],
            }],
        };
        let actuator = RecordingActuator::default();
        let client = AgentClient::new(&config, id, "let-us-dance", actuator.clone());
        (client, actuator)
    }

    #[tokio::test]
    async fn test_command_frame_actuates() {
        let (mut client, actuator) = client_for("605");
        client
            .handle_frame(r#"{"type":"command","command":"forward"}"#)
            .await
            .unwrap();
        assert_eq!(actuator.sent(), vec![ActuationCommand::walk([0.3, 0.0])]);
    }

    #[tokio::test]
    async fn test_unknown_command_changes_nothing() {
        let (mut client, actuator) = client_for("605");
        client
            .handle_frame(r#"{"type":"command","command":"moonwalk"}"#)
            .await
            .unwrap();
        assert!(actuator.sent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped() {
        let (mut client, actuator) = client_for("605");
        client.handle_frame("not json at all").await.unwrap();
        client.handle_frame(r#"{"type":"mystery"}"#).await.unwrap();
        assert!(actuator.sent().is_empty());
    }

    #[tokio::test]
    async fn test_status_frame_is_informational() {
        let (mut client, actuator) = client_for("605");
        client
            .handle_frame(r#"{"type":"status","client_id":"699","status":"connected"}"#)
            .await
            .unwrap();
        assert!(actuator.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_triangle_without_role_is_skipped() {
        let (mut client, actuator) = client_for("514");
        client
            .handle_frame(r#"{"type":"command","command":"triangle"}"#)
            .await
            .unwrap();
        assert!(actuator.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_triangle_runs_full_sequence() {
        let (mut client, actuator) = client_for("605");
        client
            .handle_frame(r#"{"type":"command","command":"triangle"}"#)
            .await
            .unwrap();
        let sent = actuator.sent();
        // Dance cue made it to the platform
        assert!(sent.iter().any(|cmd| cmd.mode == 12));
    }

    #[test]
    fn test_endpoint_embeds_identity_and_passcode() {
        let (client, _) = client_for("605");
        let url = client.endpoint().unwrap();
        assert_eq!(url.path(), "/ws/605");
        assert_eq!(url.query(), Some("passcode=let-us-dance"));
    }
}
