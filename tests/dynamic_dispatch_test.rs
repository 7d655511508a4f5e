mod common;

use common::{key, sample_request};
use payment_vault::application::orchestrator::ChargeOrchestrator;
use payment_vault::domain::charge::ChargeStatus;
use payment_vault::domain::ports::{IdempotencyStoreBox, PaymentGatewayBox};
use payment_vault::infrastructure::in_memory::InMemoryIdempotencyStore;
use payment_vault::infrastructure::mock_gateway::MockGateway;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let store: IdempotencyStoreBox = Box::new(InMemoryIdempotencyStore::new());
    let gateway: PaymentGatewayBox = Box::new(MockGateway::seeded(11, Duration::ZERO));

    // Verify Send + Sync by spawning tasks
    let store_handle = tokio::spawn(async move {
        assert!(store.claim(&key("abc"), &sample_request("u1")).await.unwrap());
        store.get(&key("abc")).await.unwrap().unwrap()
    });

    let gateway_handle = tokio::spawn(async move {
        gateway
            .charge(sample_request("u1").amount, "USD")
            .await
            .is_ok()
    });

    let record = store_handle.await.unwrap();
    assert_eq!(record.status, ChargeStatus::Started);
    gateway_handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_orchestrator_shared_across_tasks() {
    let store = InMemoryIdempotencyStore::new();
    let orchestrator = Arc::new(ChargeOrchestrator::new(
        Box::new(store.clone()),
        Box::new(MockGateway::seeded(5, Duration::from_millis(5))),
    ));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .handle(&key(&format!("key-{i}")), sample_request("u1"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        assert!(receipt.outcome.unwrap().status.is_terminal());
    }
    assert_eq!(store.len().await, 20);
}
