//! Repositorios de acceso a datos
//!
//! El núcleo solo conoce el contrato TransportStore; la selección de
//! tecnología (y de tenant) es de la capa que nos envuelve.

pub mod memory_store;
pub mod postgres_store;
pub mod store;

pub use memory_store::MemoryStore;
pub use postgres_store::{create_pool, PostgresStore};
pub use store::TransportStore;
