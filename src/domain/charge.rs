use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents a positive monetary amount for a charge.
///
/// This is a wrapper around `rust_decimal::Decimal` that refuses zero and
/// negative values, so a claimed payload can never carry a meaningless amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The payload a caller asks to be charged.
///
/// Captured into the idempotency record at claim time and never changed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub user_id: String,
    pub amount: Amount,
    pub currency: String,
}

impl ChargeRequest {
    pub fn new(
        user_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Result<Self> {
        let user_id = user_id.into().trim().to_string();
        let currency = currency.into().trim().to_string();

        if user_id.is_empty() {
            return Err(PaymentError::ValidationError(
                "user_id must not be empty".to_string(),
            ));
        }
        if currency.is_empty() {
            return Err(PaymentError::ValidationError(
                "currency must not be empty".to_string(),
            ));
        }

        Ok(Self {
            user_id,
            amount: Amount::new(amount)?,
            currency,
        })
    }
}

/// Lifecycle of an idempotency record.
///
/// `Started` is the only initial value; `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Started,
    Succeeded,
    Failed,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Started => "STARTED",
            ChargeStatus::Succeeded => "SUCCEEDED",
            ChargeStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChargeStatus::Started)
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargeStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "STARTED" => Ok(ChargeStatus::Started),
            "SUCCEEDED" => Ok(ChargeStatus::Succeeded),
            "FAILED" => Ok(ChargeStatus::Failed),
            other => Err(PaymentError::StorageError(format!(
                "Unknown charge status: {}",
                other
            ))),
        }
    }
}

/// Identifier handed back by the payment provider for a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The result delivered to the caller and replayed on resubmission.
///
/// Exactly one of `transaction_id` and `error` is populated, matching `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    pub success: bool,
    pub status: ChargeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChargeOutcome {
    pub fn succeeded(transaction_id: TransactionId) -> Self {
        Self {
            success: true,
            status: ChargeStatus::Succeeded,
            transaction_id: Some(transaction_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: ChargeStatus::Failed,
            transaction_id: None,
            error: Some(error.into()),
        }
    }

    /// Serializes the outcome into the exact bytes that get persisted and replayed.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_body(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            PaymentError::StorageError(format!("Stored response is not a charge outcome: {}", e))
        })
    }
}
