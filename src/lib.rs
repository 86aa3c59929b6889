pub mod agent;
pub mod choreography;
pub mod cli;
pub mod config;
pub mod control;
pub mod domain;
pub mod error;
pub mod relay;

pub use agent::{AgentClient, AgentContext};
pub use choreography::{Orchestrator, RoleProfile, Roster};
pub use config::AppConfig;
pub use control::PidController;
pub use domain::{ActuationCommand, Actuator, Envelope, Maneuver, PeerStatus, Phase, Pose};
pub use error::{Result, StrutError};
pub use relay::{Registry, RelayServer};
