//! Cirrus Core
//!
//! Resource lifecycle engine for cloud providers: apply loops with error
//! classification, identifier encoding, state reconciliation and rate limiting

pub mod api;
pub mod config;
pub mod differ;
pub mod identifier;
pub mod lifecycle;
pub mod provider;
pub mod ratelimit;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod sync;
