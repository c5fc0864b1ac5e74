//! Async data resources for hostdesk.
//!
//! Every admin screen that shows backend data (customers, orders,
//! invoices) needs the same thing: fetch when the screen opens, fetch
//! again when its filters change, expose `data`/`loading`/`error`, and
//! allow a manual refresh. [`AsyncResource`] is that primitive;
//! [`TableQuery`] binds it to [`Backend::query`](hostdesk_backend::Backend::query).
//!
//! # Ordering guarantee
//!
//! Only the result of the most recently started fetch is ever committed.
//! If filters change while a slow fetch is in flight, its late result is
//! dropped, never written over the newer one.

mod deps;
mod error;
mod resource;
mod table;

pub use deps::DepsKey;
pub use error::ResourceError;
pub use resource::{AsyncResource, ResourceState};
pub use table::{TableQuery, TableResource};
