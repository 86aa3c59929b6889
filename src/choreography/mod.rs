pub mod orchestrator;
pub mod roster;

pub use orchestrator::Orchestrator;
pub use roster::{RoleProfile, Roster};
