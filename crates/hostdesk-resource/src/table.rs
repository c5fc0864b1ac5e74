//! Table queries bound to an [`AsyncResource`].

use std::sync::Arc;

use hostdesk_backend::{Backend, BackendError, QueryFilter};
use serde_json::Value;
use tokio::sync::watch;

use crate::{AsyncResource, ResourceError, ResourceState};

/// Resource type produced by a table query.
pub type TableResource = AsyncResource<Vec<Value>, BackendError>;

/// Rows of one backend table, refetched whenever the filter changes.
///
/// Setting a filter with the same content as the current one does not
/// hit the backend again.
pub struct TableQuery<B: Backend> {
    backend: Arc<B>,
    table: String,
    resource: TableResource,
}

impl<B: Backend> TableQuery<B> {
    /// Creates the query and starts the first fetch.
    pub fn new(
        backend: Arc<B>,
        table: impl Into<String>,
        filter: QueryFilter,
    ) -> Result<Self, ResourceError> {
        let query = Self {
            backend,
            table: table.into(),
            resource: AsyncResource::new(),
        };
        query.set_filter(filter)?;
        Ok(query)
    }

    /// Replaces the filter. Returns whether a new fetch was started.
    pub fn set_filter(&self, filter: QueryFilter) -> Result<bool, ResourceError> {
        let deps = (&self.table, &filter);
        let key_filter = filter.clone();
        let backend = Arc::clone(&self.backend);
        let table = self.table.clone();

        self.resource.activate(&deps, move || {
            let backend = Arc::clone(&backend);
            let table = table.clone();
            let filter = key_filter.clone();
            async move { backend.query(&table, &filter).await }
        })
    }

    /// Fetches again with the current filter.
    pub fn refetch(&self) -> bool {
        self.resource.refetch()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn state(&self) -> ResourceState<Vec<Value>, BackendError> {
        self.resource.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<Vec<Value>, BackendError>> {
        self.resource.subscribe()
    }

    pub async fn settled(&self) -> ResourceState<Vec<Value>, BackendError> {
        self.resource.settled().await
    }

    /// The underlying resource.
    pub fn resource(&self) -> &TableResource {
        &self.resource
    }
}
