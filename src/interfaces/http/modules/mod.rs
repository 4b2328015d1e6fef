//! HTTP API modules, one per resource

pub mod handovers;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod pickup_tokens;
pub mod reservations;
pub mod vehicles;
