use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "deals-server", about = "Game deals backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server
    Serve(ServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: String,
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Topic new-deal notifications are published to.
    #[serde(default = "default_deals_topic")]
    pub deals_topic: String,
    /// Upper bound on a single push-provider call, milliseconds.
    #[serde(default = "default_service_timeout_ms")]
    pub service_timeout_ms: u64,
    /// Login session lifetime, milliseconds.
    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,
    pub push: PushConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    /// Admin users seeded into the store at startup.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_base_url")]
    pub base_url: String,
    pub api_key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EscalationConfig {
    /// JSON-lines file inconsistencies are appended to, in addition to
    /// the error log.
    #[serde(default)]
    pub dead_letter_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserConfig {
    pub username: String,
    /// Hex sha-256 of the password.
    pub password_hash: String,
}

fn default_api_port() -> u16 {
    8000
}
fn default_deals_topic() -> String {
    "deals".to_string()
}
fn default_service_timeout_ms() -> u64 {
    10_000
}
fn default_session_ttl_ms() -> u64 {
    8 * 60 * 60 * 1000
}
fn default_push_base_url() -> String {
    "https://iid.googleapis.com".to_string()
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self, crate::error::ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        toml::from_str(&content)
            .map_err(|e| crate::error::ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }
}
