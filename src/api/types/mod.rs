//! Request and response bodies for the HTTP API

pub mod cache;
pub mod error;
pub mod json;
pub mod work_item;

pub use cache::{CacheStatsResponse, PutCacheEntryRequest, RemovedResponse};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use work_item::{ListWorkItemsQuery, RejectRequest, WorkItemsResponse};
