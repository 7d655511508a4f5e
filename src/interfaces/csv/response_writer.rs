use crate::application::orchestrator::ChargeReceipt;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ResponseRow<'a> {
    idempotency_key: &'a str,
    result: &'a str,
    response: String,
}

/// Label for a request that failed before producing an outcome.
pub fn error_label(error: &PaymentError) -> &'static str {
    match error {
        PaymentError::ValidationError(_) | PaymentError::CsvError(_) => "invalid",
        PaymentError::Conflict(_) => "conflict",
        _ => "error",
    }
}

/// Writes one CSV row per processed charge submission.
///
/// Columns are `idempotency_key,result,response`; `response` carries the JSON
/// body exactly as delivered, or the error message.
pub struct ResponseWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_result(&mut self, key: &str, result: &Result<ChargeReceipt>) -> Result<()> {
        let row = match result {
            Ok(receipt) => ResponseRow {
                idempotency_key: key,
                result: receipt.disposition.as_str(),
                response: String::from_utf8_lossy(&receipt.body).into_owned(),
            },
            Err(e) => ResponseRow {
                idempotency_key: key,
                result: error_label(e),
                response: e.to_string(),
            },
        };
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
