//! Inventory store HTTP server.
//!
//! Thin HTTP boundary over the [`stockroom`] library: configuration,
//! logging, the session cookie transport, and the axum router that applies
//! the authorization gate in front of the items and admin routes.

pub mod api;
pub mod config;
pub mod logging;
