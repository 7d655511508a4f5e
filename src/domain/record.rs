use super::charge::{Amount, ChargeRequest, ChargeStatus};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-supplied token identifying one logical, retry-safe request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Missing Idempotency-Key".to_string(),
            ));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for IdempotencyKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// One persisted row per idempotency key.
///
/// Created in the `Started` state by a successful claim and mutated exactly
/// once by finalize. `response_body` holds the bytes that every later lookup
/// must replay unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: IdempotencyKey,
    pub user_id: String,
    pub amount: Amount,
    pub currency: String,
    pub status: ChargeStatus,
    pub response_body: Option<Vec<u8>>,
    pub updated_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// Builds the row inserted by a claim.
    pub fn started(key: IdempotencyKey, request: &ChargeRequest) -> Self {
        Self {
            key,
            user_id: request.user_id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            status: ChargeStatus::Started,
            response_body: None,
            updated_at: Utc::now(),
        }
    }

    /// Moves a `Started` record to its terminal state.
    ///
    /// Refuses non-terminal targets and records that were already finalized,
    /// which keeps the status monotonic and the response write-once.
    pub fn finalize(&mut self, status: ChargeStatus, response_body: Vec<u8>) -> Result<()> {
        if !status.is_terminal() {
            return Err(PaymentError::StorageError(format!(
                "Cannot finalize key {} with non-terminal status {}",
                self.key, status
            )));
        }
        if self.status.is_terminal() || self.response_body.is_some() {
            return Err(PaymentError::StorageError(format!(
                "Key {} is already finalized as {}",
                self.key, self.status
            )));
        }
        self.status = status;
        self.response_body = Some(response_body);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// The saved response, if this record has been finalized.
    pub fn replayable_body(&self) -> Option<&[u8]> {
        self.response_body.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> ChargeRequest {
        ChargeRequest::new("u1", dec!(100), "USD").unwrap()
    }

    #[test]
    fn test_key_rejects_blank_values() {
        assert!(IdempotencyKey::new("abc").is_ok());
        assert!(matches!(
            IdempotencyKey::new(""),
            Err(PaymentError::ValidationError(_))
        ));
        assert!(matches!(
            IdempotencyKey::new("   "),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_started_record_captures_payload() {
        let record = IdempotencyRecord::started(IdempotencyKey::new("abc").unwrap(), &request());
        assert_eq!(record.status, ChargeStatus::Started);
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.amount.value(), dec!(100));
        assert_eq!(record.currency, "USD");
        assert!(record.replayable_body().is_none());
    }

    #[test]
    fn test_finalize_is_write_once() {
        let mut record =
            IdempotencyRecord::started(IdempotencyKey::new("abc").unwrap(), &request());

        record
            .finalize(ChargeStatus::Succeeded, b"first".to_vec())
            .unwrap();
        assert_eq!(record.status, ChargeStatus::Succeeded);
        assert_eq!(record.replayable_body(), Some(&b"first"[..]));

        let second = record.finalize(ChargeStatus::Failed, b"second".to_vec());
        assert!(matches!(second, Err(PaymentError::StorageError(_))));
        assert_eq!(record.status, ChargeStatus::Succeeded);
        assert_eq!(record.replayable_body(), Some(&b"first"[..]));
    }

    #[test]
    fn test_finalize_rejects_started_target() {
        let mut record =
            IdempotencyRecord::started(IdempotencyKey::new("abc").unwrap(), &request());
        assert!(record.finalize(ChargeStatus::Started, Vec::new()).is_err());
        assert_eq!(record.status, ChargeStatus::Started);
    }
}
