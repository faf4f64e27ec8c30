//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod logging;
pub mod observability;
pub mod services;
pub mod similarity;
pub mod store;
pub mod work_item;
