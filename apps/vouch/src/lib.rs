//! # Vouch
//!
//! HTTP server, CLI and configuration around `vouch-core`.
//!
//! Exposed as a library so integration tests can drive the router
//! directly (`vouch::api::create_router`).

pub mod api;
pub mod cli;
pub mod config;
