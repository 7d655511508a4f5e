use crate::domain::charge::{ChargeOutcome, ChargeRequest};
use crate::domain::ports::{IdempotencyStoreBox, PaymentGatewayBox};
use crate::domain::record::IdempotencyKey;
use crate::error::{PaymentError, Result};
use tracing::{error, info, instrument, warn};

/// How a request reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A saved response was returned; the gateway was not called.
    Replayed,
    /// The charge ran and its outcome was persisted.
    Recorded,
    /// The charge ran but persisting the outcome failed. The record is left
    /// `STARTED`, so every resubmission of the key will be rejected until it
    /// is repaired out of band.
    Unrecorded,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Replayed => "replayed",
            Disposition::Recorded => "recorded",
            Disposition::Unrecorded => "unrecorded",
        }
    }
}

/// What the transport sends back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReceipt {
    pub disposition: Disposition,
    /// Decoded outcome. `None` only for a replayed body that no longer
    /// decodes; the stored bytes are still returned in `body`.
    pub outcome: Option<ChargeOutcome>,
    /// Exact response bytes; for a replay these are the stored bytes.
    pub body: Vec<u8>,
}

/// Drives the idempotency-claim protocol for "charge a user".
///
/// Each request goes lookup → claim → charge → finalize against the injected
/// store and gateway. The store's atomic claim is the only coordination
/// between concurrent requests; claim, charge and finalize are three separate
/// interactions with no transaction spanning them.
pub struct ChargeOrchestrator {
    store: IdempotencyStoreBox,
    gateway: PaymentGatewayBox,
}

impl ChargeOrchestrator {
    /// Creates a new `ChargeOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `store` - The idempotency record store.
    /// * `gateway` - The payment provider to charge through.
    pub fn new(store: IdempotencyStoreBox, gateway: PaymentGatewayBox) -> Self {
        Self { store, gateway }
    }

    /// Processes one validated charge request.
    ///
    /// Returns the saved response when `key` was already finalized, a
    /// `Conflict` when another request holds the claim, and otherwise the
    /// fresh outcome. A declined charge is still `Ok`.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn handle(
        &self,
        key: &IdempotencyKey,
        request: ChargeRequest,
    ) -> Result<ChargeReceipt> {
        if let Some(body) = self.store.lookup(key).await? {
            info!("Idempotency hit: returning saved response");
            let outcome = ChargeOutcome::from_body(&body)
                .inspect_err(|e| {
                    warn!(error = %e, "Saved response does not decode; replaying raw bytes")
                })
                .ok();
            return Ok(ChargeReceipt {
                disposition: Disposition::Replayed,
                outcome,
                body,
            });
        }

        if !self.store.claim(key, &request).await? {
            warn!("Claim denied: key is in flight or awaiting finalize");
            return Err(PaymentError::Conflict(key.to_string()));
        }

        let outcome = match self.gateway.charge(request.amount, &request.currency).await {
            Ok(transaction_id) => ChargeOutcome::succeeded(transaction_id),
            Err(e) => ChargeOutcome::failed(e.to_string()),
        };
        let body = outcome.to_body()?;

        let disposition = match self.store.finalize(key, outcome.status, body.clone()).await {
            Ok(()) => {
                info!(status = %outcome.status, "Charge finalized");
                Disposition::Recorded
            }
            Err(e) => {
                error!(
                    status = %outcome.status,
                    error = %e,
                    "CRITICAL: Failed to save response; record left STARTED"
                );
                Disposition::Unrecorded
            }
        };

        Ok(ChargeReceipt {
            disposition,
            outcome: Some(outcome),
            body,
        })
    }
}
