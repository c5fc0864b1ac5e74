//! Gate configuration.

/// Configuration for a [`SessionGate`](crate::SessionGate).
///
/// The demo bypass is on by default so the console can be shown without a
/// live backend. Deployments that must never accept it set
/// `demo_bypass_enabled: false`.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Whether the bypass credential pair is honoured at all.
    pub demo_bypass_enabled: bool,
    /// Bypass email. Compared exactly (no case folding).
    pub demo_email: String,
    /// Bypass password. Compared exactly.
    pub demo_password: String,
}

impl GateConfig {
    pub const DEFAULT_DEMO_EMAIL: &'static str = "demo@hostdesk.app";
    pub const DEFAULT_DEMO_PASSWORD: &'static str = "demo1234";

    /// Returns `true` if `(email, password)` is exactly the bypass pair
    /// and the bypass is enabled.
    pub fn is_bypass(&self, email: &str, password: &str) -> bool {
        self.demo_bypass_enabled && email == self.demo_email && password == self.demo_password
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            demo_bypass_enabled: true,
            demo_email: Self::DEFAULT_DEMO_EMAIL.to_string(),
            demo_password: Self::DEFAULT_DEMO_PASSWORD.to_string(),
        }
    }
}
