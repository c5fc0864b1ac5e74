//! Route guard for hostdesk's protected screens.
//!
//! A [`RouteGuard`] sits in front of a protected subtree. It watches the
//! session gate and decides whether to render the subtree or redirect to
//! sign-in, without ever spinning forever.
//!
//! # State machine
//!
//! ```text
//!            ┌────────── identity present at mount ──────────┐
//!            │                                               ▼
//! mount ─→ Checking ──(gate resolved | timeout)──→ Authorized / Denied
//!            ▲                                        │          │
//!            └──────── identity lost ─────────────────┘          │
//!                                  Authorized ←─ late resolution ┘
//! ```
//!
//! # Bounded wait
//!
//! The timeout only bounds how long the guard shows `Checking`. It does not
//! cancel the gate's session check: the guard keeps watching, so a session
//! that resolves after the timeout still flips `Denied` to `Authorized`
//! without a remount.

use std::fmt;
use std::time::Duration;

use hostdesk_session::GateState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Guard settings.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Longest time to stay in `Checking` while the gate is resolving.
    /// Default: 1 second.
    pub timeout: Duration,
    /// Where `Denied` redirects to.
    pub sign_in_path: String,
    /// Admit administrators only. When set, a signed-in identity without
    /// administrator status is treated like no identity.
    pub require_admin: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            sign_in_path: "/admin/login".to_string(),
            require_admin: false,
        }
    }
}

impl GuardConfig {
    fn admits(&self, gate: &GateState) -> bool {
        if self.require_admin {
            gate.is_administrator()
        } else {
            gate.is_authenticated()
        }
    }
}

// ---------------------------------------------------------------------------
// Guard state
// ---------------------------------------------------------------------------

/// Redirect target for a denied visitor. `return_to` is the location they
/// originally asked for, so sign-in can send them back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    pub return_to: String,
}

/// The guard's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// Waiting for the gate (bounded by [`GuardConfig::timeout`]).
    Checking,
    /// Render the protected subtree.
    Authorized,
    /// Redirect to sign-in.
    Denied(Redirect),
}

impl GuardState {
    pub fn is_checking(&self) -> bool {
        matches!(self, Self::Checking)
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

impl fmt::Display for GuardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "Checking"),
            Self::Authorized => write!(f, "Authorized"),
            Self::Denied(r) => write!(f, "Denied(-> {})", r.to),
        }
    }
}

/// What a guarded screen should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<T> {
    /// A waiting indicator.
    Loading,
    /// Navigate away.
    Redirect(Redirect),
    /// The protected content.
    Protected(T),
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Background task that turns gate snapshots into guard decisions.
struct Driver {
    gate: watch::Receiver<GateState>,
    state: watch::Sender<GuardState>,
    config: GuardConfig,
    requested: String,
}

impl Driver {
    async fn run(mut self) {
        loop {
            let checking = self.state.borrow().is_checking();
            if checking {
                self.check().await;
            }

            if self.gate.changed().await.is_err() {
                debug!(requested = %self.requested, "session gate gone, guard frozen");
                return;
            }

            let admitted = self.admitted();
            let current = self.state.borrow().clone();
            match current {
                GuardState::Authorized if !admitted => {
                    debug!(requested = %self.requested, "identity lost, re-checking");
                    self.set(GuardState::Checking);
                }
                GuardState::Denied(_) if admitted => {
                    debug!(requested = %self.requested, "late resolution admitted visitor");
                    self.set(GuardState::Authorized);
                }
                _ => {}
            }
        }
    }

    /// Waits for the gate to settle (bounded), then decides.
    async fn check(&mut self) {
        let timeout = self.config.timeout;
        let timed_out = match tokio::time::timeout(timeout, self.gate.wait_for(|g| !g.is_resolving)).await {
            Err(_) => true,
            Ok(_) => false,
        };
        if timed_out {
            debug!(
                requested = %self.requested,
                timeout_ms = saturating_millis(timeout),
                "gate still resolving, deciding on timeout"
            );
        }

        let decision = if self.admitted() {
            GuardState::Authorized
        } else {
            GuardState::Denied(self.redirect())
        };
        self.set(decision);
    }

    fn admitted(&self) -> bool {
        self.config.admits(&self.gate.borrow())
    }

    fn redirect(&self) -> Redirect {
        Redirect {
            to: self.config.sign_in_path.clone(),
            return_to: self.requested.clone(),
        }
    }

    fn set(&self, next: GuardState) {
        debug!(requested = %self.requested, state = %next, "guard transition");
        self.state.send_replace(next);
    }
}

/// Milliseconds in `d`, clamped to `u64::MAX`.
fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// RouteGuard
// ---------------------------------------------------------------------------

/// A mounted guard for one requested location.
///
/// Dropping the guard unmounts it (its driver task is aborted).
pub struct RouteGuard {
    state: watch::Receiver<GuardState>,
    requested: String,
    driver: JoinHandle<()>,
}

impl RouteGuard {
    /// Mounts a guard in front of `requested`.
    ///
    /// If the gate already has an admitted identity the guard starts out
    /// `Authorized`; otherwise it starts `Checking`. Must be called from
    /// within a Tokio runtime.
    pub fn mount(
        gate: watch::Receiver<GateState>,
        requested: impl Into<String>,
        config: GuardConfig,
    ) -> Self {
        let requested = requested.into();
        let initial = if config.admits(&gate.borrow()) {
            GuardState::Authorized
        } else {
            GuardState::Checking
        };
        debug!(requested = %requested, state = %initial, "guard mounted");

        let (tx, rx) = watch::channel(initial);
        let driver = Driver {
            gate,
            state: tx,
            config,
            requested: requested.clone(),
        };

        Self {
            state: rx,
            requested,
            driver: tokio::spawn(driver.run()),
        }
    }

    /// Current decision.
    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every decision.
    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.clone()
    }

    /// The location this guard protects.
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Waits until the decision matches `pred`.
    ///
    /// Returns the current decision if the driver stops first.
    pub async fn wait_for(&self, mut pred: impl FnMut(&GuardState) -> bool) -> GuardState {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| pred(s)).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Waits until the guard has left `Checking`.
    pub async fn settled(&self) -> GuardState {
        self.wait_for(|s| !s.is_checking()).await
    }

    /// Maps the current decision to what the screen should show, building
    /// the protected content only when authorized.
    pub fn render<T>(&self, protected: impl FnOnce() -> T) -> View<T> {
        match self.state() {
            GuardState::Checking => View::Loading,
            GuardState::Denied(redirect) => View::Redirect(redirect),
            GuardState::Authorized => View::Protected(protected()),
        }
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use hostdesk_session::Identity;

    use super::*;

    fn demo() -> Option<Identity> {
        Some(Identity::demo("demo@hostdesk.app"))
    }

    #[test]
    fn test_default_config() {
        let cfg = GuardConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(1));
        assert_eq!(cfg.sign_in_path, "/admin/login");
        assert!(!cfg.require_admin);
    }

    #[test]
    fn test_guard_state_display() {
        assert_eq!(GuardState::Checking.to_string(), "Checking");
        let denied = GuardState::Denied(Redirect {
            to: "/admin/login".into(),
            return_to: "/admin".into(),
        });
        assert_eq!(denied.to_string(), "Denied(-> /admin/login)");
    }

    #[test]
    fn test_saturating_millis_clamps_huge_timeouts() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_with_identity_is_authorized_immediately() {
        let (_tx, rx) = watch::channel(GateState::settled(demo()));
        let guard = RouteGuard::mount(rx, "/admin", GuardConfig::default());

        assert!(guard.state().is_authorized());
        assert_eq!(guard.render(|| "dashboard"), View::Protected("dashboard"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_denies_then_late_resolution_authorizes() {
        let (tx, rx) = watch::channel(GateState::resolving());
        let guard = RouteGuard::mount(rx, "/admin/orders", GuardConfig::default());
        assert!(guard.state().is_checking());
        assert_eq!(guard.render(|| ()), View::Loading);

        let start = tokio::time::Instant::now();
        let state = guard.settled().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1010), "{elapsed:?}");
        assert_eq!(
            state,
            GuardState::Denied(Redirect {
                to: "/admin/login".into(),
                return_to: "/admin/orders".into(),
            })
        );

        tx.send_replace(GateState::settled(demo()));
        let state = guard.wait_for(GuardState::is_authorized).await;
        assert!(state.is_authorized());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_before_timeout_decides_early() {
        let (tx, rx) = watch::channel(GateState::resolving());
        let guard = RouteGuard::mount(rx, "/admin", GuardConfig::default());

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send_replace(GateState::settled(None));

        let start = tokio::time::Instant::now();
        let state = guard.settled().await;
        assert!(state.is_denied());
        assert!(start.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_identity_loss_leaves_authorized() {
        let (tx, rx) = watch::channel(GateState::settled(demo()));
        let guard = RouteGuard::mount(rx, "/admin/invoices", GuardConfig::default());

        tx.send_replace(GateState::settled(None));

        let state = guard.wait_for(GuardState::is_denied).await;
        assert_eq!(
            state,
            GuardState::Denied(Redirect {
                to: "/admin/login".into(),
                return_to: "/admin/invoices".into(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_dropped_freezes_decision() {
        let (tx, rx) = watch::channel(GateState::settled(demo()));
        let guard = RouteGuard::mount(rx, "/admin", GuardConfig::default());

        drop(tx);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(guard.state().is_authorized());
    }
}
