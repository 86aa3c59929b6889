//! Wire schema for relay traffic: JSON objects in UTF-8 text frames, tagged
//! by a `type` field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A message exchanged over the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Membership change, broadcast by the relay on every connect/disconnect.
    /// This is the system's only presence signal.
    Status {
        client_id: String,
        status: PeerStatus,
    },
    /// Per-peer acknowledgement of an inbound frame.
    Echo { message: String },
    /// Symbolic maneuver name fanned out to every agent.
    Command { command: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerStatus::Connected => write!(f, "connected"),
            PeerStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl Envelope {
    pub fn status(client_id: impl Into<String>, status: PeerStatus) -> Self {
        Envelope::Status {
            client_id: client_id.into(),
            status,
        }
    }

    pub fn echo(message: impl Into<String>) -> Self {
        Envelope::Echo {
            message: message.into(),
        }
    }

    pub fn command(command: impl Into<String>) -> Self {
        Envelope::Command {
            command: command.into(),
        }
    }
}
