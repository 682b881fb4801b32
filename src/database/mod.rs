pub mod manager;
pub mod models;
pub mod query_builder;
pub mod record;
pub mod repository;

pub use manager::{Database, DatabaseError};
pub use record::{IntoRecord, Record};
pub use repository::Repository;
