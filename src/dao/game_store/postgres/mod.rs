//! PostgreSQL storage backend.

mod store;

pub use store::{PostgresGameStore, connect};
