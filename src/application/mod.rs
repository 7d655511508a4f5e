//! Application layer containing the charge protocol orchestration.
//!
//! This module defines the `ChargeOrchestrator`, the entry point the transport
//! hands each keyed charge request to. It owns no locks; concurrent requests
//! are reconciled through the idempotency store's atomic claim.

pub mod orchestrator;
