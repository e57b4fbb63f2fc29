//! Client configuration.

use std::time::Duration;

use crate::connection::ConnectionConfig;

/// Quiet windows for the ephemeral and debounced signals.
#[derive(Debug, Clone)]
pub struct SyncTiming {
    /// Document save fires this long after the last edit.
    pub save_debounce: Duration,
    /// Typing ends this long after the last keystroke.
    pub typing_idle: Duration,
    /// Cursor position is broadcast after this long without movement.
    pub cursor_quiet: Duration,
    /// Remote typing indicators expire after this long without a refresh.
    pub remote_typing_ttl: Duration,
    /// Remote participants with no activity for this long are dropped.
    pub peer_idle_timeout: Duration,
    /// How often rooms sweep for idle participants.
    pub idle_sweep: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(2000),
            typing_idle: Duration::from_millis(2000),
            cursor_quiet: Duration::from_millis(200),
            remote_typing_ttl: Duration::from_secs(5),
            peer_idle_timeout: Duration::from_secs(300),
            idle_sweep: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the event channel.
    pub server_url: String,
    /// Base URL of the REST API.
    pub api_base_url: String,
    /// Bearer token, supplied by whatever handles authentication.
    pub token: Option<String>,
    pub connection: ConnectionConfig,
    pub timing: SyncTiming,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:5000/ws".to_string(),
            api_base_url: "http://localhost:5000".to_string(),
            token: None,
            connection: ConnectionConfig::default(),
            timing: SyncTiming::default(),
        }
    }
}
