//! Adapters for the domain ports.

pub mod in_memory;
pub mod mock_gateway;
#[cfg(feature = "storage-postgres")]
pub mod postgres;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
