//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod bounded_table_service;
mod http_table_service;
mod in_memory_table_service;

pub use bounded_table_service::BoundedTableService;
pub use http_table_service::{HttpTableService, HttpTableServiceConfig};
pub use in_memory_table_service::InMemoryTableService;
