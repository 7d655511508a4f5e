//! Domain types and the ports the orchestrator depends on.

pub mod charge;
pub mod ports;
pub mod record;
