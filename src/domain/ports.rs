use super::charge::{Amount, ChargeRequest, ChargeStatus, TransactionId};
use super::record::{IdempotencyKey, IdempotencyRecord};
use crate::error::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Persistence port for idempotency records.
///
/// `claim` is the only concurrency gate in the system: adapters must make it
/// atomic in the persistence layer itself so that several service instances
/// sharing one store still agree on a single winner per key.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Returns the saved response for `key`, or `None` when there is no record
    /// or the record is still `STARTED`.
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<Vec<u8>>>;

    /// Inserts a `STARTED` record for `key` unless one already exists.
    ///
    /// `Ok(false)` means another request owns the key. Storage faults are
    /// reported as `Err`, never as a denied claim.
    async fn claim(&self, key: &IdempotencyKey, request: &ChargeRequest) -> Result<bool>;

    /// Records the terminal status and response of a claimed key.
    async fn finalize(
        &self,
        key: &IdempotencyKey,
        status: ChargeStatus,
        response_body: Vec<u8>,
    ) -> Result<()>;

    /// Reads the full record, for inspection.
    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>>;
}

pub type IdempotencyStoreBox = Box<dyn IdempotencyStore>;

/// A business failure reported by the payment provider.
///
/// These are completed outcomes, not protocol faults: the orchestrator
/// persists them as `FAILED` and replays them like any other response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network_timeout_simulated")]
    NetworkTimeout,
    #[error("card_declined")]
    CardDeclined,
    #[error("{0}")]
    Rejected(String),
}

/// Port for the external charge capability.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount: Amount,
        currency: &str,
    ) -> std::result::Result<TransactionId, GatewayError>;
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
