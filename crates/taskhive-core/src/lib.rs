//! TaskHive Core — shared domain types for the tenant-isolation and
//! authorization subsystem.
//!
//! This crate provides:
//! - Domain models ([`models`])
//! - The error taxonomy ([`error::TaskhiveError`])
//! - The ambient tenant context carrier ([`context`])
//! - Repository boundary traits and the audit sink ([`repository`])
//!
//! It performs no I/O of its own; persistence lives in `taskhive-db`.

pub mod context;
pub mod error;
pub mod models;
pub mod repository;

pub use context::{current_tenant, with_tenant};
pub use error::{TaskhiveError, TaskhiveResult};
