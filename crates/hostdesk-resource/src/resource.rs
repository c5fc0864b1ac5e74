//! The generic async resource.
//!
//! ```text
//! activate(deps₁) ──→ cycle 1 ─────────────── (late result, dropped)
//! activate(deps₂) ──────→ cycle 2 ──→ commit data/error, loading = false
//! refetch()       ─────────────────────→ cycle 3 ──→ commit ...
//! ```
//!
//! Each cycle is a spawned Tokio task tagged with a generation number.
//! The generation counter is bumped when a cycle starts; a finishing
//! cycle commits only if its generation is still the latest.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::{DepsKey, ResourceError};

/// Snapshot of a resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T, E> {
    /// Last successfully fetched value. Survives later failed fetches so a
    /// screen can keep showing stale rows under an error banner.
    pub data: Option<T>,
    /// `true` exactly while the latest cycle is in flight.
    pub loading: bool,
    /// Error of the latest completed cycle, cleared when a cycle starts.
    pub error: Option<E>,
}

impl<T, E> Default for ResourceState<T, E> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

type Fetcher<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// State shared with in-flight fetch tasks.
struct Shared<T, E> {
    state: watch::Sender<ResourceState<T, E>>,
    generation: AtomicU64,
}

impl<T, E> Shared<T, E> {
    fn complete(&self, generation: u64, result: Result<T, E>) {
        self.state.send_if_modified(|state| {
            let latest = self.generation.load(Ordering::SeqCst);
            if generation != latest {
                trace!(generation, latest, "stale fetch result discarded");
                return false;
            }
            match result {
                Ok(data) => {
                    state.data = Some(data);
                    state.error = None;
                }
                Err(error) => state.error = Some(error),
            }
            state.loading = false;
            true
        });
    }
}

/// Owner-side bookkeeping, only touched by the resource handle.
struct Control<T, E> {
    deps: Option<DepsKey>,
    fetcher: Option<Fetcher<T, E>>,
    in_flight: Option<JoinHandle<()>>,
}

/// Fetch-on-dependency-change container.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), hostdesk_resource::ResourceError> {
/// use hostdesk_resource::AsyncResource;
///
/// let orders: AsyncResource<Vec<String>, String> = AsyncResource::new();
/// let status = "open";
/// orders.activate(&status, move || async move {
///     Ok(vec![format!("order #1 ({status})")])
/// })?;
/// let state = orders.settled().await;
/// assert!(state.data.is_some());
/// # Ok(()) }
/// ```
///
/// Must be used from within a Tokio runtime. Dropping the resource aborts
/// the latest in-flight fetch.
pub struct AsyncResource<T, E> {
    shared: Arc<Shared<T, E>>,
    control: Mutex<Control<T, E>>,
}

impl<T, E> Default for AsyncResource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> AsyncResource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// An inactive resource: no data, not loading.
    pub fn new() -> Self {
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
            }),
            control: Mutex::new(Control {
                deps: None,
                fetcher: None,
                in_flight: None,
            }),
        }
    }

    /// Declares the current dependencies and fetch function.
    ///
    /// Starts a new fetch cycle on the first call and whenever `deps`
    /// differs in content from the previous call; returns whether a cycle
    /// was started. `fetch` always replaces the stored fetch function used
    /// by [`refetch`](Self::refetch).
    pub fn activate<D, F, Fut>(&self, deps: &D, fetch: F) -> Result<bool, ResourceError>
    where
        D: Serialize + ?Sized,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let key = DepsKey::of(deps)?;
        let mut control = self.control.lock();
        control.fetcher = Some(Arc::new(move || fetch().boxed()));

        if control.deps.as_ref() == Some(&key) {
            return Ok(false);
        }
        control.deps = Some(key);
        self.start_cycle(&mut control);
        Ok(true)
    }

    /// Starts a new cycle with the last fetch function, without a
    /// dependency change. Returns `false` if the resource was never
    /// activated.
    pub fn refetch(&self) -> bool {
        let mut control = self.control.lock();
        if control.fetcher.is_none() {
            return false;
        }
        self.start_cycle(&mut control);
        true
    }

    fn start_cycle(&self, control: &mut Control<T, E>) {
        let Some(fetcher) = control.fetcher.clone() else {
            return;
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        trace!(generation, "fetch cycle started");

        let shared = Arc::clone(&self.shared);
        // A superseded task keeps running; its result is discarded on
        // completion.
        control.in_flight = Some(tokio::spawn(async move {
            let result = fetcher().await;
            shared.complete(generation, result);
        }));
    }

    /// Current snapshot.
    pub fn state(&self) -> ResourceState<T, E> {
        self.shared.state.borrow().clone()
    }

    /// A receiver that observes every committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T, E>> {
        self.shared.state.subscribe()
    }

    /// Waits until no cycle is in flight and returns that snapshot.
    pub async fn settled(&self) -> ResourceState<T, E> {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl<T, E> Drop for AsyncResource<T, E> {
    fn drop(&mut self) {
        if let Some(task) = self.control.get_mut().in_flight.take() {
            task.abort();
        }
    }
}
