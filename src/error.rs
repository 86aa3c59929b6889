use thiserror::Error;

/// Main error type for the choreography system
#[derive(Error, Debug)]
pub enum StrutError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // Actuation errors
    #[error("Actuation error: {0}")]
    Actuation(String),

    // State machine errors
    #[error("Invalid phase transition: from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },

    // Control loop errors
    #[error("Heading did not converge within {elapsed_ms}ms")]
    ConvergenceTimeout { elapsed_ms: u64 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for StrutError
pub type Result<T> = std::result::Result<T, StrutError>;
