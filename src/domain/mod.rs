pub mod actuation;
pub mod maneuver;
pub mod message;
pub mod phase;

pub use actuation::{ActuationCommand, Actuator, ConsoleActuator, Pose};
pub use maneuver::{dispatch, Maneuver};
pub use message::{Envelope, PeerStatus};
pub use phase::Phase;
