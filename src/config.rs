//! Link configuration
//!
//! Defaults point at the controller's access point. A JSON file (`RC_CONFIG`)
//! and individual env vars can override them.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

use crate::error::ConfigError;

/// Controller address on its own access point
pub const DEFAULT_HOST: &str = "192.168.4.1";
/// Controller WebSocket port
pub const DEFAULT_PORT: u16 = 81;
/// Fixed reconnect period
pub const DEFAULT_RECONNECT_MS: u64 = 5000;

/// Close code reported when a connection drops without a close handshake
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when a close frame carries no status
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Host and port of the controller
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// IPv6 literals are bracketed, hostnames and IPv4 are used as-is.
    pub fn url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}", self.host, self.port)
        } else {
            format!("ws://{}:{}", self.host, self.port)
        }
    }
}

/// Which close events start the reconnect loop
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Reconnect on abnormal closure, or on any close seen while not Connected.
    #[default]
    AbnormalOrUnconnected,
    /// Reconnect on abnormal closure only.
    AbnormalOnly,
}

impl ClosePolicy {
    /// `was_connected` is the state observed before the close was applied.
    pub fn should_reconnect(self, code: u16, was_connected: bool) -> bool {
        match self {
            ClosePolicy::AbnormalOrUnconnected => code == ABNORMAL_CLOSURE || !was_connected,
            ClosePolicy::AbnormalOnly => code == ABNORMAL_CLOSURE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: Endpoint,
    #[serde(deserialize_with = "reconnect_ms")]
    pub reconnect_interval_ms: u64,
    pub close_policy: ClosePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            reconnect_interval_ms: DEFAULT_RECONNECT_MS,
            close_policy: ClosePolicy::default(),
        }
    }
}

impl Settings {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Defaults, then the `RC_CONFIG` file, then `RC_HOST` / `RC_PORT` / `RC_RECONNECT_MS`.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var("RC_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Apply env-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("RC_HOST") {
            self.endpoint.host = host;
        }
        if let Some(port) = lookup("RC_PORT") {
            self.endpoint.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "RC_PORT", value: port })?;
        }
        if let Some(ms) = lookup("RC_RECONNECT_MS") {
            self.reconnect_interval_ms = match ms.parse().ok().and_then(valid_reconnect_ms) {
                Some(v) => v,
                None => return Err(ConfigError::InvalidEnv { var: "RC_RECONNECT_MS", value: ms }),
            };
        }
        Ok(())
    }
}

/// A reconnect period of zero would never tick.
fn valid_reconnect_ms(ms: u64) -> Option<u64> {
    (ms > 0).then_some(ms)
}

fn reconnect_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    valid_reconnect_ms(ms)
        .ok_or_else(|| serde::de::Error::custom("reconnect_interval_ms must be greater than 0"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_match_controller() {
        let s = Settings::default();
        assert_eq!(s.endpoint.url(), "ws://192.168.4.1:81");
        assert_eq!(s.reconnect_interval(), Duration::from_millis(5000));
        assert_eq!(s.close_policy, ClosePolicy::AbnormalOrUnconnected);
    }

    #[test]
    fn test_ipv6_host_is_bracketed() {
        assert_eq!(Endpoint::new("fe80::1", 81).url(), "ws://[fe80::1]:81");
        assert_eq!(Endpoint::new("[::1]", 9000).url(), "ws://[::1]:9000");
        assert_eq!(Endpoint::new("rover.local", 81).url(), "ws://rover.local:81");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json(r#"{"endpoint": {"port": 8081}}"#).unwrap();
        assert_eq!(s.endpoint.host, DEFAULT_HOST);
        assert_eq!(s.endpoint.port, 8081);
        assert_eq!(s.reconnect_interval_ms, DEFAULT_RECONNECT_MS);
    }

    #[test]
    fn test_json_close_policy() {
        let s = Settings::from_json(r#"{"close_policy": "abnormal_only"}"#).unwrap();
        assert_eq!(s.close_policy, ClosePolicy::AbnormalOnly);
        assert!(Settings::from_json(r#"{"close_policy": "never"}"#).is_err());
    }

    #[test]
    fn test_json_rejects_zero_interval() {
        let err = Settings::from_json(r#"{"reconnect_interval_ms": 0}"#).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
        let s = Settings::from_json(r#"{"reconnect_interval_ms": 1}"#).unwrap();
        assert_eq!(s.reconnect_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_env_overrides() {
        let mut s = Settings::default();
        s.apply_overrides(lookup_from(&[
            ("RC_HOST", "10.0.0.7"),
            ("RC_PORT", "9000"),
            ("RC_RECONNECT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(s.endpoint.url(), "ws://10.0.0.7:9000");
        assert_eq!(s.reconnect_interval_ms, 250);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let mut s = Settings::default();
        let err = s.apply_overrides(lookup_from(&[("RC_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "RC_PORT", .. }));

        let err = s.apply_overrides(lookup_from(&[("RC_RECONNECT_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "RC_RECONNECT_MS", .. }));
    }

    #[test]
    fn test_close_policy_trigger() {
        let faithful = ClosePolicy::AbnormalOrUnconnected;
        assert!(faithful.should_reconnect(1006, true));
        assert!(faithful.should_reconnect(1000, false));
        assert!(!faithful.should_reconnect(1000, true));

        let narrow = ClosePolicy::AbnormalOnly;
        assert!(narrow.should_reconnect(1006, true));
        assert!(!narrow.should_reconnect(1000, false));
    }
}
