#![allow(dead_code)]

use async_trait::async_trait;
use payment_vault::domain::charge::{Amount, ChargeRequest, ChargeStatus, TransactionId};
use payment_vault::domain::ports::{GatewayError, IdempotencyStore, PaymentGateway};
use payment_vault::domain::record::{IdempotencyKey, IdempotencyRecord};
use payment_vault::error::{PaymentError, Result};
use payment_vault::infrastructure::in_memory::InMemoryIdempotencyStore;
use rust_decimal_macros::dec;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub fn key(value: &str) -> IdempotencyKey {
    IdempotencyKey::new(value).unwrap()
}

pub fn sample_request(user_id: &str) -> ChargeRequest {
    ChargeRequest::new(user_id, dec!(100), "USD").unwrap()
}

/// Gateway that always answers with the same result and counts its calls.
#[derive(Clone)]
pub struct CountingGateway {
    result: std::result::Result<TransactionId, GatewayError>,
    pub calls: Arc<AtomicUsize>,
}

impl CountingGateway {
    pub fn succeeding(id: &str) -> Self {
        Self {
            result: Ok(TransactionId::new(id)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: GatewayError) -> Self {
        Self {
            result: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn charge(
        &self,
        _amount: Amount,
        _currency: &str,
    ) -> std::result::Result<TransactionId, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Gateway that parks every call until the test releases it.
#[derive(Clone, Default)]
pub struct GatedGateway {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PaymentGateway for GatedGateway {
    async fn charge(
        &self,
        _amount: Amount,
        _currency: &str,
    ) -> std::result::Result<TransactionId, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(TransactionId::new("txn_gated"))
    }
}

/// In-memory store with switchable faults and an access counter.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryIdempotencyStore,
    pub fail_lookup: Arc<AtomicBool>,
    pub fail_claim: Arc<AtomicBool>,
    pub fail_finalize: Arc<AtomicBool>,
    pub accesses: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self, fault: &AtomicBool, op: &str) -> Result<()> {
        self.accesses.fetch_add(1, Ordering::SeqCst);
        if fault.load(Ordering::SeqCst) {
            return Err(PaymentError::StorageError(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for FaultyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<Vec<u8>>> {
        self.touch(&self.fail_lookup, "lookup")?;
        self.inner.lookup(key).await
    }

    async fn claim(&self, key: &IdempotencyKey, request: &ChargeRequest) -> Result<bool> {
        self.touch(&self.fail_claim, "claim")?;
        self.inner.claim(key, request).await
    }

    async fn finalize(
        &self,
        key: &IdempotencyKey,
        status: ChargeStatus,
        response_body: Vec<u8>,
    ) -> Result<()> {
        self.touch(&self.fail_finalize, "finalize")?;
        self.inner.finalize(key, status, response_body).await
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        self.inner.get(key).await
    }
}

/// Writes a charge batch with the standard header.
pub fn write_requests(path: &Path, rows: &[[&str; 4]]) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["idempotency_key", "user_id", "amount", "currency"])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
