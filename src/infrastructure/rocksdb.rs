use crate::domain::charge::{ChargeRequest, ChargeStatus};
use crate::domain::ports::IdempotencyStore;
use crate::domain::record::{IdempotencyKey, IdempotencyRecord};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, ErrorKind, OptimisticTransactionDB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding one JSON-encoded record per idempotency key.
pub const CF_PAYMENT_REQUESTS: &str = "payment_requests";

/// A persistent idempotency store backed by RocksDB.
///
/// Opened as an `OptimisticTransactionDB` so that claim and finalize are
/// read-check-write transactions: a conflicting writer makes `commit` fail
/// with `Busy`, which is how a lost claim race is detected.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<OptimisticTransactionDB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the `payment_requests` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_requests = ColumnFamilyDescriptor::new(CF_PAYMENT_REQUESTS, Options::default());
        let db: OptimisticTransactionDB =
            OptimisticTransactionDB::open_cf_descriptors(&opts, path, vec![cf_requests])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn requests_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_PAYMENT_REQUESTS).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(
                "Payment requests column family not found",
            )))
        })
    }

    fn decode(bytes: &[u8]) -> Result<IdempotencyRecord> {
        serde_json::from_slice(bytes).map_err(|e| {
            PaymentError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Deserialization error: {}", e),
            )))
        })
    }

    fn encode(record: &IdempotencyRecord) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| {
            PaymentError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )))
        })
    }
}

fn is_write_conflict(error: &rocksdb::Error) -> bool {
    matches!(error.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
}

#[async_trait]
impl IdempotencyStore for RocksDBStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<Vec<u8>>> {
        let cf = self.requests_cf()?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Self::decode(&bytes)?.response_body),
            None => Ok(None),
        }
    }

    async fn claim(&self, key: &IdempotencyKey, request: &ChargeRequest) -> Result<bool> {
        let cf = self.requests_cf()?;
        let txn = self.db.transaction();

        if txn.get_for_update_cf(cf, key, true)?.is_some() {
            return Ok(false);
        }

        let record = IdempotencyRecord::started(key.clone(), request);
        txn.put_cf(cf, key, Self::encode(&record)?)?;

        match txn.commit() {
            Ok(()) => Ok(true),
            // Another writer inserted the key between our read and commit.
            Err(e) if is_write_conflict(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn finalize(
        &self,
        key: &IdempotencyKey,
        status: ChargeStatus,
        response_body: Vec<u8>,
    ) -> Result<()> {
        let cf = self.requests_cf()?;
        let txn = self.db.transaction();

        let bytes = txn.get_for_update_cf(cf, key, true)?.ok_or_else(|| {
            PaymentError::StorageError(format!("No claimed record for key {}", key))
        })?;
        let mut record = Self::decode(&bytes)?;
        record.finalize(status, response_body)?;
        txn.put_cf(cf, key, Self::encode(&record)?)?;

        txn.commit().map_err(|e| {
            if is_write_conflict(&e) {
                PaymentError::StorageError(format!("Concurrent finalize for key {}", key))
            } else {
                e.into()
            }
        })
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        let cf = self.requests_cf()?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}
