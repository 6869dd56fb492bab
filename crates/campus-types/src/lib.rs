pub mod api;
pub mod models;
pub mod postgrest;
pub mod query;

pub use models::{ItemType, Record};
pub use query::{ListQuery, Page, Pagination, Predicate, QueryError, Table};
