use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub choreography: ChoreographyConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Address the relay server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Lowercase hex SHA-256 digest of the shared passcode. Read once at
    /// startup; there is no rotation mechanism.
    #[serde(default)]
    pub passcode_sha256: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Relay WebSocket base URL (e.g. "ws://127.0.0.1:8000")
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Interval between re-sends of the latched command during a timed phase
    #[serde(default = "default_tick_ms")]
    pub send_tick_ms: u64,
    /// Maximum reconnection delay
    #[serde(default = "default_max_reconnect_delay")]
    pub max_reconnect_delay_secs: u64,
}

/// Heading stabilizer calibration. The gains are tuned for the reference
/// platform; do not re-derive them.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    /// Convergence threshold on heading error, radians
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Output clamp bounds, rad/s
    #[serde(default = "default_output_min")]
    pub output_min: f64,
    #[serde(default = "default_output_max")]
    pub output_max: f64,
    /// Nominal control tick; dt is measured, not assumed
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Wall-clock budget for one stabilization episode before it is reported
    /// as a convergence timeout
    #[serde(default = "default_convergence_budget")]
    pub convergence_budget_ms: u64,
}

/// Timed-phase calibration for the triangle sequence
#[derive(Debug, Clone, Deserialize)]
pub struct ChoreographyConfig {
    /// Duration of the approach translation, seconds (role-independent)
    #[serde(default = "default_approach_secs")]
    pub approach_secs: f64,
    /// Settle delay after the approach, seconds (momentum decay)
    #[serde(default = "default_settle_secs")]
    pub settle_secs: f64,
    /// Absolute offset from sequence start to the dance cue, milliseconds
    #[serde(default = "default_perform_offset")]
    pub perform_offset_ms: u64,
    /// Additional offset from the dance cue to the realign cue, milliseconds
    #[serde(default = "default_realign_offset")]
    pub realign_offset_ms: u64,
    /// Interval between re-sends of the latched command, milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Roster mapping agent identity to its role in the formation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub members: Vec<RosterMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterMember {
    pub id: String,
    /// Approach velocity vector (forward, lateral), m/s
    pub approach: [f32; 2],
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_relay_url() -> String {
    "ws://127.0.0.1:8000".to_string()
}

fn default_tick_ms() -> u64 {
    50
}

fn default_max_reconnect_delay() -> u64 {
    60
}

fn default_kp() -> f64 {
    2.0
}

fn default_ki() -> f64 {
    0.02
}

fn default_kd() -> f64 {
    0.05
}

fn default_threshold() -> f64 {
    0.01
}

fn default_output_min() -> f64 {
    -2.0
}

fn default_output_max() -> f64 {
    2.0
}

fn default_convergence_budget() -> u64 {
    30_000
}

fn default_approach_secs() -> f64 {
    3.7
}

fn default_settle_secs() -> f64 {
    3.0
}

fn default_perform_offset() -> u64 {
    8_000
}

fn default_realign_offset() -> u64 {
    18_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            passcode_sha256: String::new(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            send_tick_ms: default_tick_ms(),
            max_reconnect_delay_secs: default_max_reconnect_delay(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: default_ki(),
            kd: default_kd(),
            threshold: default_threshold(),
            output_min: default_output_min(),
            output_max: default_output_max(),
            tick_ms: default_tick_ms(),
            convergence_budget_ms: default_convergence_budget(),
        }
    }
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            approach_secs: default_approach_secs(),
            settle_secs: default_settle_secs(),
            perform_offset_ms: default_perform_offset(),
            realign_offset_ms: default_realign_offset(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            agent: AgentConfig::default(),
            control: ControlConfig::default(),
            choreography: ChoreographyConfig::default(),
            roster: RosterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("relay.bind", default_bind())?
            .set_default("agent.relay_url", default_relay_url())?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("STRUT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (STRUT_RELAY__PASSCODE_SHA256, etc.)
            .add_source(
                Environment::with_prefix("STRUT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_calibration() {
        let config = AppConfig::default();
        assert_eq!(config.control.kp, 2.0);
        assert_eq!(config.control.ki, 0.02);
        assert_eq!(config.control.kd, 0.05);
        assert_eq!(config.control.threshold, 0.01);
        assert_eq!(config.choreography.approach_secs, 3.7);
        assert_eq!(config.choreography.perform_offset_ms, 8_000);
        assert_eq!(config.choreography.realign_offset_ms, 18_000);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("/nonexistent").expect("defaults should apply");
        assert_eq!(config.agent.send_tick_ms, 50);
        assert!(config.relay.passcode_sha256.is_empty());
    }
}
