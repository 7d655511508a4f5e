use crate::domain::charge::ChargeRequest;
use crate::domain::record::IdempotencyKey;
use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a charge batch: the key plus the payload fields.
///
/// An empty key column deserializes to `None` and is reported as a missing
/// key by [`ChargeSubmission::into_parts`].
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ChargeSubmission {
    pub idempotency_key: Option<String>,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
}

impl ChargeSubmission {
    /// Validates the row into a key and a charge request.
    pub fn into_parts(self) -> Result<(IdempotencyKey, ChargeRequest)> {
        let key = self.idempotency_key.ok_or_else(|| {
            PaymentError::ValidationError("Missing Idempotency-Key".to_string())
        })?;
        let key = IdempotencyKey::new(key)?;
        let request = ChargeRequest::new(self.user_id, self.amount, self.currency)?;
        Ok((key, request))
    }
}

/// Reads charge submissions from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<ChargeSubmission>`. It handles whitespace trimming and flexible
/// record lengths automatically.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes submissions.
    pub fn submissions(self) -> impl Iterator<Item = Result<ChargeSubmission>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
