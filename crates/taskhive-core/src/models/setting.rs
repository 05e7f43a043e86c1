//! Setting domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingScope {
    Global,
    Organization,
}

impl SettingScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingScope::Global => "global",
            SettingScope::Organization => "organization",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(SettingScope::Global),
            "organization" => Some(SettingScope::Organization),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingCategory {
    Email,
    Security,
    General,
    Maintenance,
}

impl SettingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::Email => "email",
            SettingCategory::Security => "security",
            SettingCategory::General => "general",
            SettingCategory::Maintenance => "maintenance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(SettingCategory::Email),
            "security" => Some(SettingCategory::Security),
            "general" => Some(SettingCategory::General),
            "maintenance" => Some(SettingCategory::Maintenance),
            _ => None,
        }
    }
}

/// A configuration key-value. The value is an opaque typed payload;
/// consumers interpret it through the settings cache's typed bundles.
///
/// Secret-flagged settings resolve through the cache (server-side
/// policy decisions need them) but are excluded from every listing
/// operation used by administrative read endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub id: Uuid,
    /// Unique per scope.
    pub key: String,
    pub value: serde_json::Value,
    pub description: String,
    pub category: SettingCategory,
    pub is_secret: bool,
    pub scope: SettingScope,
    /// Owning tenant; `None` iff `scope` is global.
    pub organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload for a setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertSetting {
    pub key: String,
    pub value: serde_json::Value,
    pub description: String,
    pub category: SettingCategory,
    pub is_secret: bool,
    pub scope: SettingScope,
    pub organization_id: Option<Uuid>,
}
