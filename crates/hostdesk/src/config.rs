//! Console configuration.

use std::time::Duration;

use hostdesk_guard::GuardConfig;
use hostdesk_session::GateConfig;
use tracing::warn;

/// Guard timeout in milliseconds.
pub const ENV_GUARD_TIMEOUT_MS: &str = "HOSTDESK_GUARD_TIMEOUT_MS";
/// Redirect target for denied visitors.
pub const ENV_SIGN_IN_PATH: &str = "HOSTDESK_SIGN_IN_PATH";
/// `true`/`false`: whether the demo credential pair is honoured.
pub const ENV_DEMO_BYPASS: &str = "HOSTDESK_DEMO_BYPASS";

/// Everything a [`Console`](crate::Console) needs to know up front.
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    pub gate: GateConfig,
    pub guard: GuardConfig,
}

impl ConsoleConfig {
    /// Defaults overridden by `HOSTDESK_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_GUARD_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.guard.timeout = Duration::from_millis(ms),
                Err(e) => warn!(key = ENV_GUARD_TIMEOUT_MS, value = %raw, error = %e, "ignoring invalid setting"),
            }
        }

        if let Some(path) = lookup(ENV_SIGN_IN_PATH) {
            let path = path.trim();
            if path.is_empty() {
                warn!(key = ENV_SIGN_IN_PATH, "ignoring empty setting");
            } else {
                config.guard.sign_in_path = path.to_string();
            }
        }

        if let Some(raw) = lookup(ENV_DEMO_BYPASS) {
            match parse_flag(&raw) {
                Some(enabled) => config.gate.demo_bypass_enabled = enabled,
                None => warn!(key = ENV_DEMO_BYPASS, value = %raw, "ignoring invalid setting"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
