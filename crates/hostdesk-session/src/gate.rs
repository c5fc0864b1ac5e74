//! The session gate: single source of truth for the current identity.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──→ marker found? ──yes──→ [Settled(demo)]
//!                 │
//!                 no
//!                 ▼
//!           [Resolving] ──(get_session + admin lookup)──→ [Settled(remote?)]
//!
//! listener task: every backend session change ──→ classify ──→ replace state
//! ```
//!
//! # Concurrency note
//!
//! Initialization, the listener task and the sign-in/sign-out operations
//! can all be classifying at once. Each classification takes a revision
//! number *before* it suspends, and its result is only committed if no
//! newer classification has started since. Commits happen inside the
//! `watch` channel's write lock, so consumers always see a whole snapshot
//! from exactly one classification run.
//!
//! Sign-in, sign-out, refresh and the listener additionally run one at a
//! time under an async lock. A backend sign-in echoes a `SignedIn` event
//! before it returns; the listener only gets to that event after the
//! sign-in has committed, and skips it because the session was already
//! classified (or revoked) by the sign-in itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hostdesk_backend::{Backend, Session, SessionChange, SessionEvent, SessionSubscription, User};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{CredentialStore, GateConfig, GateError, GateState, Identity, marker};

/// Shared state behind the gate and its background tasks.
struct GateInner<B, S> {
    backend: Arc<B>,
    store: Arc<S>,
    config: GateConfig,
    state: watch::Sender<GateState>,
    /// Number of the most recently started classification.
    revision: AtomicU64,
    /// Held by every operation that classifies and commits.
    serial: Mutex<()>,
    /// Access token of the last session classified by `sign_in`. Kept after
    /// sign-out: a late echo of that session is stale either way.
    signed_in_token: parking_lot::Mutex<Option<String>>,
}

impl<B: Backend, S: CredentialStore> GateInner<B, S> {
    /// Starts a classification run and returns its revision.
    fn begin(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes `identity` if `rev` is still the latest run.
    fn commit(&self, rev: u64, identity: Option<Identity>) -> bool {
        self.state.send_if_modified(|state| {
            let latest = self.revision.load(Ordering::SeqCst);
            if rev != latest {
                trace!(rev, latest, "superseded classification dropped");
                return false;
            }
            let next = GateState::settled(identity);
            if *state == next {
                return false;
            }
            debug!(
                authenticated = next.is_authenticated(),
                administrator = next.is_administrator(),
                "gate state updated"
            );
            *state = next;
            true
        })
    }

    fn remember_sign_in(&self, token: String) {
        *self.signed_in_token.lock() = Some(token);
    }

    /// Whether `change` is the backend echoing a sign-in this gate has
    /// already classified.
    fn is_sign_in_echo(&self, change: &SessionChange) -> bool {
        if change.event != SessionEvent::SignedIn {
            return false;
        }
        let Some(session) = &change.session else {
            return false;
        };
        self.signed_in_token.lock().as_deref() == Some(session.access_token.as_str())
    }

    fn is_demo_active(&self) -> bool {
        self.state.borrow().is_demo()
    }

    /// Asks the admin registry about `email`. Any lookup failure counts as
    /// "not an administrator".
    async fn is_administrator(&self, email: &str) -> bool {
        match self.backend.lookup_admin(email).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(email, error = %e, "admin lookup failed, treating as non-administrator");
                false
            }
        }
    }

    /// The shared classification routine: session in, identity out.
    async fn classify(&self, session: Option<Session>) -> Option<Identity> {
        let user: User = session?.user;
        let is_admin = self.is_administrator(&user.email).await;
        Some(Identity::remote(&user, is_admin))
    }

    /// Fetches the backend session and classifies it. Transport failures
    /// resolve to "no identity".
    async fn restore(&self, rev: u64) {
        let session = match self.backend.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "session restore failed, continuing signed out");
                None
            }
        };
        let identity = self.classify(session).await;
        info!(authenticated = identity.is_some(), "session restored");
        self.commit(rev, identity);
    }

    /// Listener loop: runs until the subscription closes or the task is
    /// aborted (which drops, and so unsubscribes, the subscription).
    async fn listen(&self, mut subscription: SessionSubscription) {
        while let Some(change) = subscription.recv().await {
            let _serial = self.serial.lock().await;
            if self.is_demo_active() {
                debug!(event = ?change.event, "demo identity active, ignoring backend event");
                continue;
            }
            if self.is_sign_in_echo(&change) {
                trace!("sign-in already classified, ignoring echo");
                continue;
            }
            let rev = self.begin();
            let identity = self.classify(change.session).await;
            debug!(event = ?change.event, authenticated = identity.is_some(), "session change classified");
            self.commit(rev, identity);
        }
        debug!("session listener finished");
    }
}

/// Owns the authentication state machine.
///
/// Create one per application with [`SessionGate::start`], hand
/// [`subscribe`](Self::subscribe) receivers to whatever needs to react to
/// identity changes (route guards, headers), and call the imperative
/// operations from sign-in/sign-out forms.
///
/// Dropping the gate stops its background tasks and unsubscribes from
/// backend notifications.
pub struct SessionGate<B: Backend, S: CredentialStore> {
    inner: Arc<GateInner<B, S>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<B: Backend, S: CredentialStore> SessionGate<B, S> {
    /// Builds the gate and kicks off initialization.
    ///
    /// If the store holds a demo marker the gate settles immediately and
    /// the backend session is never requested. Otherwise a task fetches the
    /// session while the gate reports `is_resolving`. Either way a listener
    /// task is registered for backend session changes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(backend: Arc<B>, store: Arc<S>, config: GateConfig) -> Self {
        let demo = match marker::load(store.as_ref()) {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable demo marker");
                None
            }
        };

        let initial = match demo {
            Some(identity) => {
                info!(email = %identity.email, "demo marker found, skipping session restore");
                GateState::settled(Some(identity))
            }
            None => GateState::resolving(),
        };
        let needs_restore = initial.is_resolving;
        let (state, _) = watch::channel(initial);

        let inner = Arc::new(GateInner {
            backend,
            store,
            config,
            state,
            revision: AtomicU64::new(0),
            serial: Mutex::new(()),
            signed_in_token: parking_lot::Mutex::new(None),
        });

        let mut tasks = Vec::with_capacity(2);

        if needs_restore {
            // Taken here, not inside the task, so an operation issued right
            // after `start` always outranks the restore.
            let rev = inner.begin();
            let restore = Arc::clone(&inner);
            tasks.push(tokio::spawn(async move { restore.restore(rev).await }));
        }

        let subscription = inner.backend.on_session_change();
        let listener = Arc::clone(&inner);
        tasks.push(tokio::spawn(async move { listener.listen(subscription).await }));

        Self { inner, tasks }
    }

    /// Current snapshot.
    pub fn state(&self) -> GateState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.inner.state.subscribe()
    }

    /// Waits until the first resolution has completed and returns the
    /// snapshot at that point.
    pub async fn resolved(&self) -> GateState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.is_resolving).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// The gate's configuration.
    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    /// Signs in.
    ///
    /// The bypass pair produces a demo administrator without touching the
    /// backend. Any other pair goes to the backend; a successful backend
    /// sign-in for an account outside the admin registry is immediately
    /// signed out again and reported as [`GateError::AdminRequired`].
    ///
    /// On success the gate state already holds the returned identity.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, GateError> {
        let inner = &self.inner;
        let _serial = inner.serial.lock().await;

        if inner.config.is_bypass(email, password) {
            let identity = Identity::demo(email);
            marker::save(inner.store.as_ref(), &identity)?;
            let rev = inner.begin();
            inner.commit(rev, Some(identity.clone()));
            info!(email, "demo bypass sign-in");
            return Ok(identity);
        }

        let session = match inner.backend.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(e) => {
                info!(email, error = %e, "sign-in rejected by backend");
                return Err(e.into());
            }
        };
        inner.remember_sign_in(session.access_token.clone());

        let rev = inner.begin();
        if !inner.is_administrator(&session.user.email).await {
            warn!(email, "sign-in without administrator record, revoking session");
            if let Err(e) = inner.backend.sign_out().await {
                warn!(email, error = %e, "failed to revoke non-administrator session");
            }
            inner.commit(rev, None);
            return Err(GateError::AdminRequired);
        }

        let identity = Identity::remote(&session.user, true);
        inner.commit(rev, Some(identity.clone()));
        info!(email, "administrator signed in");
        Ok(identity)
    }

    /// Creates a backend account. No administrator classification happens:
    /// new accounts are never administrators by default.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<User, GateError> {
        let user = self.inner.backend.sign_up(email, password, metadata).await?;
        info!(email, "account created");
        Ok(user)
    }

    /// Signs out.
    ///
    /// The demo marker is always cleared. A demo identity is dropped
    /// locally; anything else is signed out at the backend first. Calling
    /// this while already signed out succeeds.
    pub async fn sign_out(&self) -> Result<(), GateError> {
        let inner = &self.inner;
        let _serial = inner.serial.lock().await;

        if let Err(e) = marker::clear(inner.store.as_ref()) {
            warn!(error = %e, "failed to clear demo marker");
        }

        if !inner.is_demo_active() {
            inner.backend.sign_out().await?;
        }

        let rev = inner.begin();
        inner.commit(rev, None);
        info!("signed out");
        Ok(())
    }

    /// Requests a password-reset message for `email`.
    pub async fn reset_password(&self, email: &str) -> Result<(), GateError> {
        self.inner.backend.reset_password_for_email(email).await?;
        info!(email, "password reset requested");
        Ok(())
    }

    /// Re-reads the backend session and re-classifies it.
    ///
    /// Does nothing while a demo identity is active.
    pub async fn refresh(&self) -> GateState {
        let _serial = self.inner.serial.lock().await;
        if !self.inner.is_demo_active() {
            let rev = self.inner.begin();
            self.inner.restore(rev).await;
        }
        self.state()
    }

    /// Stops the background tasks and waits for them to finish, which
    /// releases the backend subscription.
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        debug!("session gate shut down");
    }
}

impl<B: Backend, S: CredentialStore> Drop for SessionGate<B, S> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
