//! Bootstrap defaults for the global settings namespace.
//!
//! Values can be seeded from the environment at first boot; after
//! that the stored value is authoritative, so bootstrap never
//! overwrites an existing key.

use serde_json::json;
use taskhive_core::error::TaskhiveResult;
use taskhive_core::models::setting::{SettingCategory, SettingScope, UpsertSetting};
use taskhive_core::repository::SettingRepository;
use tracing::info;

use crate::bundles::PasswordPolicy;

fn env_string(var: &str, fallback: &str) -> serde_json::Value {
    json!(std::env::var(var).unwrap_or_else(|_| fallback.to_string()))
}

fn env_u64(var: &str, fallback: u64) -> serde_json::Value {
    json!(
        std::env::var(var)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(fallback)
    )
}

fn env_bool(var: &str, fallback: bool) -> serde_json::Value {
    json!(
        std::env::var(var)
            .map(|v| v == "true")
            .unwrap_or(fallback)
    )
}

/// The default global settings, in upsert form.
pub fn default_settings() -> Vec<UpsertSetting> {
    let entry = |key: &str,
                 value: serde_json::Value,
                 description: &str,
                 category: SettingCategory,
                 is_secret: bool| UpsertSetting {
        key: key.into(),
        value,
        description: description.into(),
        category,
        is_secret,
        scope: SettingScope::Global,
        organization_id: None,
    };

    vec![
        entry(
            "client_url",
            env_string("CLIENT_URL", "http://localhost:5173"),
            "Client application URL",
            SettingCategory::General,
            false,
        ),
        entry(
            "smtp_host",
            env_string("SMTP_HOST", ""),
            "SMTP server host",
            SettingCategory::Email,
            false,
        ),
        entry(
            "smtp_port",
            env_u64("SMTP_PORT", 587),
            "SMTP server port",
            SettingCategory::Email,
            false,
        ),
        entry(
            "smtp_user",
            env_string("SMTP_USER", ""),
            "SMTP username",
            SettingCategory::Email,
            false,
        ),
        entry(
            "smtp_password",
            env_string("SMTP_PASSWORD", ""),
            "SMTP password",
            SettingCategory::Email,
            true,
        ),
        entry(
            "email_from",
            env_string("EMAIL_FROM", "noreply@taskhive.com"),
            "Default from email address",
            SettingCategory::Email,
            false,
        ),
        entry(
            "session_timeout",
            env_u64("SESSION_TIMEOUT", 3600),
            "Session timeout in seconds",
            SettingCategory::Security,
            false,
        ),
        entry(
            "max_login_attempts",
            env_u64("MAX_LOGIN_ATTEMPTS", 5),
            "Maximum number of login attempts before lockout",
            SettingCategory::Security,
            false,
        ),
        entry(
            "lockout_duration",
            env_u64("LOCKOUT_DURATION", 900),
            "Account lockout duration in seconds",
            SettingCategory::Security,
            false,
        ),
        entry(
            "force_2fa",
            env_bool("FORCE_2FA", false),
            "Require 2FA for all users",
            SettingCategory::Security,
            false,
        ),
        entry(
            "password_policy",
            serde_json::to_value(PasswordPolicy::default()).unwrap_or_default(),
            "Password policy configuration",
            SettingCategory::Security,
            false,
        ),
        entry(
            "rate_limit_window",
            env_u64("RATE_LIMIT_WINDOW_MS", 900_000),
            "Rate limiting window in milliseconds",
            SettingCategory::Security,
            false,
        ),
        entry(
            "rate_limit_max_requests",
            env_u64("RATE_LIMIT_MAX_REQUESTS", 100),
            "Maximum requests allowed in rate limit window",
            SettingCategory::Security,
            false,
        ),
        entry(
            "maintenance_mode",
            json!(false),
            "Enable maintenance mode",
            SettingCategory::Maintenance,
            false,
        ),
        entry(
            "backup_schedule",
            json!("0 0 * * *"),
            "Backup schedule in cron format",
            SettingCategory::Maintenance,
            false,
        ),
        entry(
            "log_retention_days",
            json!(30),
            "Number of days to retain logs",
            SettingCategory::Maintenance,
            false,
        ),
        entry(
            "max_upload_size",
            json!(10_485_760),
            "Maximum file upload size in bytes",
            SettingCategory::Maintenance,
            false,
        ),
    ]
}

/// Seeds missing global settings. Keys that already exist are left
/// alone so administrative edits survive restarts. Idempotent.
pub async fn bootstrap_settings<S: SettingRepository>(repo: &S) -> TaskhiveResult<()> {
    let mut seeded = 0usize;
    for setting in default_settings() {
        if repo.get(&setting.key).await?.is_none() {
            repo.set(setting).await?;
            seeded += 1;
        }
    }
    info!(seeded, "settings bootstrap complete");
    Ok(())
}
