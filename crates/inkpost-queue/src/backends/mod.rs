//! Outbox storage backends

pub mod memory;
pub mod postgres;

pub use memory::MemoryOutbox;
pub use postgres::PostgresOutbox;
