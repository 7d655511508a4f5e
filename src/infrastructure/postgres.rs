use crate::domain::charge::{Amount, ChargeRequest, ChargeStatus};
use crate::domain::ports::IdempotencyStore;
use crate::domain::record::{IdempotencyKey, IdempotencyRecord};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// DDL for the idempotency table. The primary key on `idempotency_key` is the
/// unique constraint every claim races against.
pub const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS payment_requests (
    idempotency_key TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    amount          NUMERIC NOT NULL,
    currency        TEXT NOT NULL,
    status          TEXT NOT NULL CHECK (status IN ('STARTED', 'SUCCEEDED', 'FAILED')),
    response_body   BYTEA,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Idempotency store backed by a shared PostgreSQL table.
///
/// Safe across service instances: claim is a single
/// `INSERT .. ON CONFLICT DO NOTHING`, finalize a single guarded `UPDATE`.
#[derive(Clone)]
pub struct PostgresIdempotencyStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct PaymentRequestRow {
    idempotency_key: String,
    user_id: String,
    amount: Decimal,
    currency: String,
    status: String,
    response_body: Option<Vec<u8>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRequestRow> for IdempotencyRecord {
    type Error = PaymentError;

    fn try_from(r: PaymentRequestRow) -> Result<Self> {
        Ok(IdempotencyRecord {
            key: IdempotencyKey::new(r.idempotency_key)?,
            user_id: r.user_id,
            amount: Amount::new(r.amount)
                .map_err(|e| PaymentError::StorageError(format!("Stored amount: {}", e)))?,
            currency: r.currency,
            status: r.status.parse()?,
            response_body: r.response_body,
            updated_at: r.updated_at,
        })
    }
}

impl PostgresIdempotencyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and makes sure the table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for PostgresIdempotencyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<Vec<u8>>> {
        let row: Option<(Option<Vec<u8>>,)> = sqlx::query_as(
            "SELECT response_body FROM payment_requests WHERE idempotency_key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(body,)| body))
    }

    async fn claim(&self, key: &IdempotencyKey, request: &ChargeRequest) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO payment_requests (idempotency_key, user_id, amount, currency, status) \
             VALUES ($1, $2, $3, $4, 'STARTED') \
             ON CONFLICT (idempotency_key) DO NOTHING",
        )
        .bind(key.as_str())
        .bind(&request.user_id)
        .bind(request.amount.value())
        .bind(&request.currency)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn finalize(
        &self,
        key: &IdempotencyKey,
        status: ChargeStatus,
        response_body: Vec<u8>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(PaymentError::StorageError(format!(
                "Cannot finalize key {} with non-terminal status {}",
                key, status
            )));
        }

        let result = sqlx::query(
            "UPDATE payment_requests \
             SET status = $1, response_body = $2, updated_at = NOW() \
             WHERE idempotency_key = $3 AND status = 'STARTED' AND response_body IS NULL",
        )
        .bind(status.as_str())
        .bind(response_body)
        .bind(key.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(PaymentError::StorageError(format!(
                "No STARTED record to finalize for key {}",
                key
            )))
        }
    }

    async fn get(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>> {
        let row: Option<PaymentRequestRow> = sqlx::query_as(
            "SELECT idempotency_key, user_id, amount, currency, status, response_body, updated_at \
             FROM payment_requests WHERE idempotency_key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(IdempotencyRecord::try_from).transpose()
    }
}
