//! AuditDesk API server library.
//!
//! Exposes the building blocks (config, state, error handling, storage,
//! document rendering, routes) so integration tests and the binary
//! entrypoint share them.

pub mod auth;
pub mod config;
pub mod context;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod storage;
