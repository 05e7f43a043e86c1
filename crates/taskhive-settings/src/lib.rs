//! Read-through settings cache with typed bundles and bootstrap
//! defaults.
//!
//! The cache fronts a [`SettingRepository`] with a TTL'd in-memory
//! snapshot. Lookups resolve against the ambient tenant first and
//! fall back to the global value, so an organization can shadow a
//! global key without affecting other tenants.
//!
//! [`SettingRepository`]: taskhive_core::repository::SettingRepository

pub mod bundles;
pub mod cache;
pub mod defaults;

pub use bundles::{EmailSettings, MaintenanceSettings, PasswordPolicy, SecuritySettings};
pub use cache::{SettingsCache, DEFAULT_GRACE, DEFAULT_TTL};
pub use defaults::{bootstrap_settings, default_settings};
