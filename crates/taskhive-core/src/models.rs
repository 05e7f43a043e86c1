//! Domain models for TaskHive.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod organization;
pub mod permission;
pub mod role;
pub mod setting;
pub mod team;
pub mod user;
