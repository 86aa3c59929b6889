pub mod client;
pub mod context;

pub use client::AgentClient;
pub use context::AgentContext;
