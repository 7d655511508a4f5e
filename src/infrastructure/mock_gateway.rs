use crate::domain::charge::{Amount, TransactionId};
use crate::domain::ports::{GatewayError, PaymentGateway};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Simulated provider round-trip.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);
/// Each failure mode fires when its draw out of `FAILURE_ODDS` hits its slot.
pub const FAILURE_ODDS: u32 = 10;
pub const TRANSACTION_PREFIX: &str = "txn_";
pub const TRANSACTION_SUFFIX_LEN: usize = 12;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of uniform draws for the mock gateway.
pub trait RandomSource: Send {
    /// Returns a value in `0..bound`.
    fn next_below(&mut self, bound: u32) -> u32;
}

/// `RandomSource` backed by a seedable `StdRng`.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.0.gen_range(0..bound)
    }
}

/// Stand-in for a third-party card processor.
///
/// Every call sleeps for `latency`, then makes two independent 1-in-10 draws:
/// the first fails the call with a simulated network timeout, the second with
/// a card decline. Combined, about 19% of calls fail. Successful calls return
/// `txn_` followed by 12 alphanumeric characters.
pub struct MockGateway {
    latency: Duration,
    random: Mutex<Box<dyn RandomSource>>,
}

impl MockGateway {
    pub fn new(random: impl RandomSource + 'static, latency: Duration) -> Self {
        Self {
            latency,
            random: Mutex::new(Box::new(random)),
        }
    }

    pub fn seeded(seed: u64, latency: Duration) -> Self {
        Self::new(SeededRandom::from_seed(seed), latency)
    }

    fn roll(random: &mut dyn RandomSource) -> Result<TransactionId, GatewayError> {
        if random.next_below(FAILURE_ODDS) == 0 {
            return Err(GatewayError::NetworkTimeout);
        }
        if random.next_below(FAILURE_ODDS) == 1 {
            return Err(GatewayError::CardDeclined);
        }

        let mut id = String::with_capacity(TRANSACTION_PREFIX.len() + TRANSACTION_SUFFIX_LEN);
        id.push_str(TRANSACTION_PREFIX);
        for _ in 0..TRANSACTION_SUFFIX_LEN {
            let index = random.next_below(ALPHABET.len() as u32) as usize;
            id.push(ALPHABET[index] as char);
        }
        Ok(TransactionId::new(id))
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn charge(&self, amount: Amount, currency: &str) -> Result<TransactionId, GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut random = self.random.lock().await;
        let result = Self::roll(&mut **random);
        debug!(%amount, currency, ?result, "mock provider charge");
        result
    }
}
