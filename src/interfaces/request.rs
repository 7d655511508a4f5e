use crate::application::orchestrator::{ChargeOrchestrator, ChargeReceipt};
use crate::domain::charge::ChargeRequest;
use crate::domain::record::IdempotencyKey;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Name of the header carrying the idempotency key on the wire.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
struct ChargeRequestBody {
    user_id: String,
    amount: Decimal,
    currency: String,
}

/// Validates the key and decodes a JSON charge body.
///
/// Both checks happen before the request reaches the orchestrator, so a bad
/// request never touches the idempotency store.
pub fn decode(
    idempotency_key: Option<&str>,
    body: &[u8],
) -> Result<(IdempotencyKey, ChargeRequest)> {
    let key = match idempotency_key {
        Some(key) => IdempotencyKey::new(key)?,
        None => {
            return Err(PaymentError::ValidationError(format!(
                "Missing {} header",
                IDEMPOTENCY_KEY_HEADER
            )));
        }
    };

    let body: ChargeRequestBody = serde_json::from_slice(body)
        .map_err(|e| PaymentError::ValidationError(format!("Invalid JSON: {}", e)))?;
    let request = ChargeRequest::new(body.user_id, body.amount, body.currency)?;

    Ok((key, request))
}

/// Transport entry point: decodes the request, then runs it through the
/// orchestrator. Validation failures return before any store access.
pub async fn submit(
    orchestrator: &ChargeOrchestrator,
    idempotency_key: Option<&str>,
    body: &[u8],
) -> Result<ChargeReceipt> {
    let (key, request) = decode(idempotency_key, body)?;
    orchestrator.handle(&key, request).await
}
