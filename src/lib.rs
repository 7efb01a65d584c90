#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # bucket-audit
//!
//! Reconciles what access logs say was stored in each bucket with what the
//! storage backend reports.
//!
//! This library re-exports the workspace crates and hosts the CLI layer.

pub use audit_core;
pub use audit_reconciler;

pub mod cli;
pub mod commands;
