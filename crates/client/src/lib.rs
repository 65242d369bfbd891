//! Backend access for the procurement dashboards: the HTTP contract, an in-process
//! engine behind the same trait, polling feeds and user actions.

pub mod actions;
pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod refresh;

pub use actions::{ActionAlert, ActionRunner};
pub use api::{HealthStatus, ProcessReceipt, ProcurementApi};
pub use error::ApiError;
pub use http::HttpProcurementApi;
pub use memory::InMemoryProcurementApi;
pub use refresh::{Feed, FeedClosed, FeedKey, RefreshHub, Snapshot};
