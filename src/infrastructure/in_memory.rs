use crate::domain::charge::{ChargeRequest, ChargeStatus};
use crate::domain::ports::IdempotencyStore;
use crate::domain::record::{IdempotencyKey, IdempotencyRecord};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory idempotency store.
///
/// Uses `Arc<RwLock<HashMap<IdempotencyKey, IdempotencyRecord>>>` so clones
/// share the same table. A claim checks and inserts under one write guard,
/// which plays the role of the unique constraint for a single process.
#[derive(Default, Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<IdempotencyKey, IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<Vec<u8>>> {
        let records = self.records.read().await;
        Ok(records
            .get(key)
            .and_then(|record| record.replayable_body())
            .map(<[u8]>::to_vec))
    }

    async fn claim(&self, key: &IdempotencyKey, request: &ChargeRequest) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.entry(key.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(IdempotencyRecord::started(key.clone(), request));
                Ok(true)
            }
        }
    }

    async fn finalize(
        &self,
        key: &IdempotencyKey,
        status: ChargeStatus,
        response_body: Vec<u8>,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.get_mut(key).ok_or_else(|| {
            PaymentError::StorageError(format!("No claimed record for key {}", key))
        })?;
        record.finalize(status, response_body)
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key(value: &str) -> IdempotencyKey {
        IdempotencyKey::new(value).unwrap()
    }

    fn request() -> ChargeRequest {
        ChargeRequest::new("u1", dec!(100), "USD").unwrap()
    }

    #[tokio::test]
    async fn test_claim_then_duplicate_is_denied() {
        let store = InMemoryIdempotencyStore::new();

        assert!(store.claim(&key("abc"), &request()).await.unwrap());
        assert!(!store.claim(&key("abc"), &request()).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_hides_started_records() {
        let store = InMemoryIdempotencyStore::new();
        assert!(store.lookup(&key("abc")).await.unwrap().is_none());

        store.claim(&key("abc"), &request()).await.unwrap();
        assert!(store.lookup(&key("abc")).await.unwrap().is_none());

        let record = store.get(&key("abc")).await.unwrap().unwrap();
        assert_eq!(record.status, ChargeStatus::Started);
    }

    #[tokio::test]
    async fn test_finalize_makes_response_replayable() {
        let store = InMemoryIdempotencyStore::new();
        store.claim(&key("abc"), &request()).await.unwrap();
        store
            .finalize(&key("abc"), ChargeStatus::Succeeded, b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(
            store.lookup(&key("abc")).await.unwrap(),
            Some(b"{}".to_vec())
        );
        let record = store.get(&key("abc")).await.unwrap().unwrap();
        assert_eq!(record.status, ChargeStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_finalize_without_claim_fails() {
        let store = InMemoryIdempotencyStore::new();
        let result = store
            .finalize(&key("ghost"), ChargeStatus::Failed, b"{}".to_vec())
            .await;
        assert!(matches!(result, Err(PaymentError::StorageError(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_second_finalize_keeps_first_response() {
        let store = InMemoryIdempotencyStore::new();
        store.claim(&key("abc"), &request()).await.unwrap();
        store
            .finalize(&key("abc"), ChargeStatus::Failed, b"first".to_vec())
            .await
            .unwrap();

        let again = store
            .finalize(&key("abc"), ChargeStatus::Succeeded, b"second".to_vec())
            .await;
        assert!(again.is_err());
        assert_eq!(
            store.lookup(&key("abc")).await.unwrap(),
            Some(b"first".to_vec())
        );
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let store = InMemoryIdempotencyStore::new();
        let other = store.clone();
        store.claim(&key("abc"), &request()).await.unwrap();
        assert!(!other.claim(&key("abc"), &request()).await.unwrap());
    }
}
