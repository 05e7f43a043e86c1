//! Typed bundles over the settings cache.
//!
//! Each bundle fetches its fixed key set concurrently and decodes
//! into a plain struct, substituting the documented default for any
//! missing or ill-typed value.

use serde::{Deserialize, Serialize};
use serde_json::json;
use taskhive_core::repository::SettingRepository;

use crate::cache::SettingsCache;

/// Password complexity requirements enforced by the auth flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasswordPolicy {
    pub min_length: u32,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    /// Maximum password age in days.
    pub max_age: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special_chars: true,
            max_age: 90,
        }
    }
}

/// Security policy consumed by the authentication flow.
#[derive(Debug, Clone, PartialEq)]
pub struct SecuritySettings {
    /// Seconds of inactivity before a session expires.
    pub session_timeout: u64,
    pub max_login_attempts: u32,
    /// Seconds an account stays locked after too many failures.
    pub lockout_duration: u64,
    pub force_2fa: bool,
    pub password_policy: PasswordPolicy,
}

/// SMTP delivery configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
}

/// Operational switches.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceSettings {
    pub maintenance_mode: bool,
    /// Cron expression.
    pub backup_schedule: String,
    pub log_retention_days: u32,
    pub max_upload_size: u64,
}

impl<S: SettingRepository> SettingsCache<S> {
    pub async fn security_settings(&self) -> SecuritySettings {
        let (session_timeout, max_login_attempts, lockout_duration, force_2fa, password_policy) = tokio::join!(
            self.get("session_timeout", json!(3600)),
            self.get("max_login_attempts", json!(5)),
            self.get("lockout_duration", json!(900)),
            self.get("force_2fa", json!(false)),
            self.get("password_policy", json!(null)),
        );

        SecuritySettings {
            session_timeout: session_timeout.as_u64().unwrap_or(3600),
            max_login_attempts: max_login_attempts.as_u64().unwrap_or(5) as u32,
            lockout_duration: lockout_duration.as_u64().unwrap_or(900),
            force_2fa: force_2fa.as_bool().unwrap_or(false),
            password_policy: serde_json::from_value(password_policy).unwrap_or_default(),
        }
    }

    pub async fn email_settings(&self) -> EmailSettings {
        let (host, port, user, password, from) = tokio::join!(
            self.get("smtp_host", json!("")),
            self.get("smtp_port", json!(587)),
            self.get("smtp_user", json!("")),
            self.get("smtp_password", json!("")),
            self.get("email_from", json!("noreply@taskhive.com")),
        );

        EmailSettings {
            host: host.as_str().unwrap_or_default().to_string(),
            port: port.as_u64().unwrap_or(587) as u16,
            user: user.as_str().unwrap_or_default().to_string(),
            password: password.as_str().unwrap_or_default().to_string(),
            from: from
                .as_str()
                .unwrap_or("noreply@taskhive.com")
                .to_string(),
        }
    }

    pub async fn maintenance_settings(&self) -> MaintenanceSettings {
        let (maintenance_mode, backup_schedule, log_retention_days, max_upload_size) = tokio::join!(
            self.get("maintenance_mode", json!(false)),
            self.get("backup_schedule", json!("0 0 * * *")),
            self.get("log_retention_days", json!(30)),
            self.get("max_upload_size", json!(10_485_760)),
        );

        MaintenanceSettings {
            maintenance_mode: maintenance_mode.as_bool().unwrap_or(false),
            backup_schedule: backup_schedule
                .as_str()
                .unwrap_or("0 0 * * *")
                .to_string(),
            log_retention_days: log_retention_days.as_u64().unwrap_or(30) as u32,
            max_upload_size: max_upload_size.as_u64().unwrap_or(10_485_760),
        }
    }
}
