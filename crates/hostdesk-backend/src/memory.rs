//! In-process [`Backend`] implementation.
//!
//! `MemoryBackend` keeps accounts, the admin registry, table rows and the
//! single active session in memory. Each operation can be given an
//! artificial latency (driven by `tokio::time`, so paused-clock tests stay
//! deterministic) and the whole backend can be switched "offline" to
//! produce [`BackendError::Transport`] failures.
//!
//! Every call is counted in [`CallCounts`], which is how tests prove that
//! a code path did or did not contact the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::{
    AdminRecord, Backend, BackendError, QueryFilter, Session, SessionChange,
    SessionEvent, SessionSubscription, User,
};

/// Capacity of the session-change broadcast channel.
const EVENT_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// Latency
// ---------------------------------------------------------------------------

/// Artificial per-operation delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latency {
    pub get_session: Duration,
    pub sign_in: Duration,
    pub lookup_admin: Duration,
    pub query: Duration,
}

// ---------------------------------------------------------------------------
// Call counters
// ---------------------------------------------------------------------------

/// Snapshot of how many times each operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub get_session: usize,
    pub sign_in: usize,
    pub sign_up: usize,
    pub sign_out: usize,
    pub reset_password: usize,
    pub lookup_admin: usize,
    pub query: usize,
}

impl CallCounts {
    /// Total number of backend calls of any kind.
    pub fn total(&self) -> usize {
        self.get_session
            + self.sign_in
            + self.sign_up
            + self.sign_out
            + self.reset_password
            + self.lookup_admin
            + self.query
    }
}

#[derive(Debug, Default)]
struct Counters {
    get_session: AtomicUsize,
    sign_in: AtomicUsize,
    sign_up: AtomicUsize,
    sign_out: AtomicUsize,
    reset_password: AtomicUsize,
    lookup_admin: AtomicUsize,
    query: AtomicUsize,
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Accounts keyed by email.
    accounts: HashMap<String, Account>,
    /// Admin registry keyed by email.
    admins: HashMap<String, AdminRecord>,
    tables: HashMap<String, Vec<Value>>,
    session: Option<Session>,
    offline: bool,
    /// Emails for which a password reset was requested, in order.
    password_resets: Vec<String>,
}

/// A complete backend living in process memory.
///
/// Built with chained `with_*` calls, then shared behind an `Arc`:
///
/// ```rust
/// use hostdesk_backend::MemoryBackend;
///
/// let backend = MemoryBackend::new()
///     .with_account("ops@example.com", "hunter22")
///     .with_admin("ops@example.com");
/// ```
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<SessionChange>,
    latency: Latency,
    counters: Counters,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// An empty backend: no accounts, no admins, no session, no latency.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
            latency: Latency::default(),
            counters: Counters::default(),
        }
    }

    /// Registers an account.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.state.lock();
            state.accounts.insert(
                email.to_string(),
                Account {
                    user: new_user(email, Value::Null),
                    password: password.to_string(),
                },
            );
        }
        self
    }

    /// Adds `email` to the admin registry.
    pub fn with_admin(self, email: &str) -> Self {
        self.state.lock().admins.insert(
            email.to_string(),
            AdminRecord {
                email: email.to_string(),
                role: Some("admin".to_string()),
            },
        );
        self
    }

    /// Seeds `table` with `rows`.
    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.state.lock().tables.insert(table.to_string(), rows);
        self
    }

    /// Starts with an active session for an existing account.
    ///
    /// Unknown emails are ignored.
    pub fn with_session(self, email: &str) -> Self {
        {
            let mut state = self.state.lock();
            let user = state.accounts.get(email).map(|a| a.user.clone());
            state.session = user.map(new_session);
        }
        self
    }

    /// Sets artificial latencies.
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Switches the backend offline (every call fails with a transport
    /// error) or back online.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Ends the active session from the "server side" and notifies
    /// listeners, as an expired refresh token would.
    pub fn expire_session(&self) {
        self.state.lock().session = None;
        self.emit(SessionEvent::SignedOut, None);
    }

    /// Pushes an arbitrary change to every subscriber.
    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(SessionChange { event, session });
    }

    /// Number of live session-change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Snapshot of per-operation call counts.
    pub fn calls(&self) -> CallCounts {
        let c = &self.counters;
        CallCounts {
            get_session: c.get_session.load(Ordering::Relaxed),
            sign_in: c.sign_in.load(Ordering::Relaxed),
            sign_up: c.sign_up.load(Ordering::Relaxed),
            sign_out: c.sign_out.load(Ordering::Relaxed),
            reset_password: c.reset_password.load(Ordering::Relaxed),
            lookup_admin: c.lookup_admin.load(Ordering::Relaxed),
            query: c.query.load(Ordering::Relaxed),
        }
    }

    /// Emails for which a password reset was requested.
    pub fn password_resets(&self) -> Vec<String> {
        self.state.lock().password_resets.clone()
    }

    /// The active session, read without counting as a backend call.
    pub fn current_session(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.state.lock().offline {
            Err(BackendError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

async fn delay(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

fn new_user(email: &str, metadata: Value) -> User {
    let id: u64 = rand::rng().random();
    User {
        id: format!("usr_{id:016x}"),
        email: email.to_string(),
        created_at: Utc::now(),
        metadata,
    }
}

fn new_session(user: User) -> Session {
    let bytes: [u8; 16] = rand::rng().random();
    Session {
        user,
        access_token: bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

impl Backend for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        bump(&self.counters.get_session);
        delay(self.latency.get_session).await;
        self.check_online()?;
        Ok(self.state.lock().session.clone())
    }

    fn on_session_change(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        bump(&self.counters.sign_in);
        delay(self.latency.sign_in).await;
        self.check_online()?;

        let session = {
            let mut state = self.state.lock();
            let user = match state.accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => {
                    return Err(BackendError::InvalidCredentials(
                        "Invalid login credentials".into(),
                    ));
                }
            };
            let session = new_session(user);
            state.session = Some(session.clone());
            session
        };

        tracing::debug!(email, "memory backend: session started");
        self.emit(SessionEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<User, BackendError> {
        bump(&self.counters.sign_up);
        self.check_online()?;

        let mut state = self.state.lock();
        if state.accounts.contains_key(email) {
            return Err(BackendError::Rejected("User already registered".into()));
        }
        let user = new_user(email, metadata);
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        bump(&self.counters.sign_out);
        self.check_online()?;
        self.state.lock().session = None;
        self.emit(SessionEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &str) -> Result<(), BackendError> {
        bump(&self.counters.reset_password);
        self.check_online()?;
        self.state.lock().password_resets.push(email.to_string());
        Ok(())
    }

    async fn lookup_admin(&self, email: &str) -> Result<Option<AdminRecord>, BackendError> {
        bump(&self.counters.lookup_admin);
        delay(self.latency.lookup_admin).await;
        self.check_online()?;
        Ok(self.state.lock().admins.get(email).cloned())
    }

    async fn query(
        &self,
        table: &str,
        filter: &QueryFilter,
    ) -> Result<Vec<Value>, BackendError> {
        bump(&self.counters.query);
        delay(self.latency.query).await;
        self.check_online()?;
        let state = self.state.lock();
        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| BackendError::Rejected(format!("relation \"{table}\" does not exist")))?;
        Ok(filter.apply(rows))
    }
}
