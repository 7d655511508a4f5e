use crate::domain::ports::{IdempotencyStoreBox, PaymentGatewayBox};
use crate::error::{PaymentError, Result};
use crate::infrastructure::in_memory::InMemoryIdempotencyStore;
use crate::infrastructure::mock_gateway::{DEFAULT_LATENCY, MockGateway, SeededRandom};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Where idempotency records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    RocksDb(PathBuf),
    Postgres(String),
}

impl StoreBackend {
    /// Picks the backend requested on the command line.
    ///
    /// A backend whose cargo feature is not compiled in falls back to
    /// in-memory storage with a warning. A database URL wins over a path.
    pub fn select(db_path: Option<PathBuf>, database_url: Option<String>) -> Self {
        if let Some(url) = database_url {
            if cfg!(feature = "storage-postgres") {
                return StoreBackend::Postgres(url);
            }
            warn!(
                "WARNING: Persistent storage requested via --database-url, but 'storage-postgres' feature is not enabled. Falling back to In-Memory storage."
            );
        }

        if let Some(path) = db_path {
            if cfg!(feature = "storage-rocksdb") {
                return StoreBackend::RocksDb(path);
            }
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }

        StoreBackend::InMemory
    }

    pub async fn open(&self) -> Result<IdempotencyStoreBox> {
        match self {
            StoreBackend::InMemory => Ok(Box::new(InMemoryIdempotencyStore::new())),
            #[cfg(feature = "storage-rocksdb")]
            StoreBackend::RocksDb(path) => Ok(Box::new(
                crate::infrastructure::rocksdb::RocksDBStore::open(path)?,
            )),
            #[cfg(feature = "storage-postgres")]
            StoreBackend::Postgres(url) => Ok(Box::new(
                crate::infrastructure::postgres::PostgresIdempotencyStore::connect(url).await?,
            )),
            #[allow(unreachable_patterns)]
            other => Err(PaymentError::StorageError(format!(
                "{:?} support is not compiled in",
                other
            ))),
        }
    }
}

/// Knobs for the simulated provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub latency: Duration,
    /// Fixed seed for reproducible runs; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            latency: DEFAULT_LATENCY,
            seed: None,
        }
    }
}

impl GatewaySettings {
    pub fn build(&self) -> PaymentGatewayBox {
        let random = match self.seed {
            Some(seed) => SeededRandom::from_seed(seed),
            None => SeededRandom::from_entropy(),
        };
        Box::new(MockGateway::new(random, self.latency))
    }
}

/// Everything needed to wire an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store: StoreBackend,
    pub gateway: GatewaySettings,
    pub concurrent: bool,
}
