//! TTL-based read-through cache over the settings store.
//!
//! State machine: cold, warm, stale. On first access, or once the
//! snapshot's age exceeds the TTL, the whole key space is reloaded in
//! one bulk read and swapped in atomically; lookups until the next
//! expiry are served from memory. A miss against a fresh snapshot
//! falls through to a point lookup (covers keys written after the
//! last bulk load) and is inserted without resetting the snapshot
//! clock.
//!
//! Values are cached per owner, so an organization's override shadows
//! the global value for the ambient tenant and nobody else.
//!
//! A failed reload degrades instead of failing the caller: the old
//! snapshot keeps serving within a grace period, after which lookups
//! fall back to the supplied default.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use taskhive_core::context::current_tenant;
use taskhive_core::models::setting::Setting;
use taskhive_core::repository::SettingRepository;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Snapshot age at which a bulk reload is triggered.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// How long a stale snapshot keeps serving when reloads fail.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(900);

/// Cache key: owning tenant (None for global) plus setting key.
type EntryKey = (Option<Uuid>, String);

struct Snapshot {
    entries: HashMap<EntryKey, serde_json::Value>,
    loaded_at: Option<Instant>,
}

impl Snapshot {
    fn age(&self) -> Option<Duration> {
        self.loaded_at.map(|t| t.elapsed())
    }
}

/// Read-through settings cache.
///
/// Explicitly owned and injected into consumers; cheap to share
/// behind an `Arc`.
pub struct SettingsCache<S: SettingRepository> {
    repo: S,
    ttl: Duration,
    grace: Duration,
    snapshot: RwLock<Snapshot>,
}

impl<S: SettingRepository> SettingsCache<S> {
    pub fn new(repo: S) -> Self {
        Self::with_ttl(repo, DEFAULT_TTL, DEFAULT_GRACE)
    }

    pub fn with_ttl(repo: S, ttl: Duration, grace: Duration) -> Self {
        Self {
            repo,
            ttl,
            grace,
            snapshot: RwLock::new(Snapshot {
                entries: HashMap::new(),
                loaded_at: None,
            }),
        }
    }

    /// Looks up a setting for the ambient tenant, falling back to the
    /// global value, then to `default`. Never fails: storage trouble
    /// degrades to the stale snapshot or the default.
    pub async fn get(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        self.ensure_fresh().await;

        let ambient = current_tenant();
        {
            let snapshot = self.snapshot.read().await;
            if let Some(org) = ambient {
                if let Some(value) = snapshot.entries.get(&(Some(org), key.to_string())) {
                    return value.clone();
                }
            }
            if let Some(value) = snapshot.entries.get(&(None, key.to_string())) {
                return value.clone();
            }
        }

        // Fresh-snapshot miss: point lookup for keys created after
        // the last bulk load. Inserted without touching loaded_at.
        match self.repo.get(key).await {
            Ok(Some(setting)) => {
                let value = setting.value.clone();
                let mut snapshot = self.snapshot.write().await;
                snapshot
                    .entries
                    .insert((setting.organization_id, setting.key), setting.value);
                value
            }
            Ok(None) => default,
            Err(e) => {
                warn!(key, error = %e, "settings point lookup failed, serving default");
                default
            }
        }
    }

    /// Drops the snapshot clock so the next lookup reloads. Called
    /// after administrative settings writes.
    pub async fn invalidate(&self) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.loaded_at = None;
    }

    async fn ensure_fresh(&self) {
        let stale = {
            let snapshot = self.snapshot.read().await;
            snapshot.age().is_none_or(|age| age > self.ttl)
        };
        if !stale {
            return;
        }

        let mut snapshot = self.snapshot.write().await;
        // Re-check under the write lock: another task holding it
        // first may have already refreshed the snapshot, in which
        // case this reload is redundant.
        let (needs_reload, within_grace) = match snapshot.age() {
            None => (true, false),
            Some(age) => (age > self.ttl, age <= self.ttl + self.grace),
        };
        if !needs_reload {
            return;
        }

        match self.repo.load_all().await {
            Ok(settings) => {
                snapshot.entries = settings
                    .into_iter()
                    .map(|s: Setting| ((s.organization_id, s.key), s.value))
                    .collect::<HashMap<_, _>>();
                snapshot.loaded_at = Some(Instant::now());
                debug!(entries = snapshot.entries.len(), "settings cache reloaded");
            }
            Err(e) => {
                if within_grace {
                    warn!(error = %e, "settings reload failed, serving stale snapshot");
                } else {
                    warn!(error = %e, "settings reload failed with no usable snapshot");
                    snapshot.entries.clear();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use taskhive_core::error::{TaskhiveError, TaskhiveResult};
    use taskhive_core::models::setting::{SettingCategory, SettingScope, UpsertSetting};
    use taskhive_core::repository::SettingRepository;

    /// In-memory settings store with a failure toggle for the bulk
    /// load path.
    #[derive(Default)]
    struct StubRepo {
        rows: Mutex<Vec<Setting>>,
        fail_loads: AtomicBool,
        load_calls: AtomicUsize,
    }

    impl StubRepo {
        fn insert(&self, key: &str, value: serde_json::Value, organization_id: Option<Uuid>) {
            let now = chrono::Utc::now();
            self.rows.lock().unwrap().push(Setting {
                id: Uuid::new_v4(),
                key: key.into(),
                value,
                description: String::new(),
                category: SettingCategory::General,
                is_secret: false,
                scope: if organization_id.is_some() {
                    SettingScope::Organization
                } else {
                    SettingScope::Global
                },
                organization_id,
                created_at: now,
                updated_at: now,
            });
        }
    }

    impl SettingRepository for &StubRepo {
        async fn set(&self, _input: UpsertSetting) -> TaskhiveResult<Setting> {
            unimplemented!("not used by the cache")
        }

        async fn get(&self, key: &str) -> TaskhiveResult<Option<Setting>> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(TaskhiveError::Database("lookup failed".into()));
            }
            let ambient = current_tenant();
            let rows = self.rows.lock().unwrap();
            let org = rows
                .iter()
                .find(|s| s.key == key && s.organization_id.is_some() && s.organization_id == ambient);
            let global = rows.iter().find(|s| s.key == key && s.organization_id.is_none());
            Ok(org.or(global).cloned())
        }

        async fn load_all(&self) -> TaskhiveResult<Vec<Setting>> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(TaskhiveError::Database("load failed".into()));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn list_by_category(&self, _category: SettingCategory) -> TaskhiveResult<Vec<Setting>> {
            unimplemented!("not used by the cache")
        }
    }

    #[tokio::test]
    async fn missing_key_yields_default() {
        let repo = StubRepo::default();
        let cache = SettingsCache::new(&repo);

        let value = cache.get("nonexistent", serde_json::json!(42)).await;
        assert_eq!(value, serde_json::json!(42));
    }

    #[tokio::test]
    async fn warm_lookup_served_from_memory() {
        let repo = StubRepo::default();
        repo.insert("session_timeout", serde_json::json!(3600), None);
        let cache = SettingsCache::new(&repo);

        assert_eq!(
            cache.get("session_timeout", serde_json::json!(0)).await,
            serde_json::json!(3600)
        );

        // Even if the store now fails, the warm snapshot answers.
        repo.fail_loads.store(true, Ordering::SeqCst);
        assert_eq!(
            cache.get("session_timeout", serde_json::json!(0)).await,
            serde_json::json!(3600)
        );
    }

    #[tokio::test]
    async fn miss_falls_through_to_point_lookup() {
        let repo = StubRepo::default();
        let cache = SettingsCache::new(&repo);

        // Warm the (empty) cache first.
        assert_eq!(
            cache.get("late_key", serde_json::json!("none")).await,
            serde_json::json!("none")
        );

        // A key written after the bulk load is still found.
        repo.insert("late_key", serde_json::json!("found"), None);
        assert_eq!(
            cache.get("late_key", serde_json::json!("none")).await,
            serde_json::json!("found")
        );
    }

    #[tokio::test]
    async fn concurrent_cold_lookups_reload_once() {
        let repo = StubRepo::default();
        repo.insert("session_timeout", serde_json::json!(3600), None);
        let cache = SettingsCache::new(&repo);

        let (a, b, c) = tokio::join!(
            cache.get("session_timeout", serde_json::json!(0)),
            cache.get("session_timeout", serde_json::json!(0)),
            cache.get("session_timeout", serde_json::json!(0)),
        );
        assert_eq!(a, serde_json::json!(3600));
        assert_eq!(b, serde_json::json!(3600));
        assert_eq!(c, serde_json::json!(3600));

        // The losers of the write-lock race see the fresh snapshot
        // and skip their own reload.
        assert_eq!(repo.load_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let repo = StubRepo::default();
        repo.insert("flag", serde_json::json!(false), None);
        let cache = SettingsCache::new(&repo);

        assert_eq!(
            cache.get("flag", serde_json::json!(false)).await,
            serde_json::json!(false)
        );

        repo.rows.lock().unwrap().clear();
        repo.insert("flag", serde_json::json!(true), None);

        // Still the old snapshot until invalidated.
        assert_eq!(
            cache.get("flag", serde_json::json!(false)).await,
            serde_json::json!(false)
        );
        cache.invalidate().await;
        assert_eq!(
            cache.get("flag", serde_json::json!(false)).await,
            serde_json::json!(true)
        );
    }

    #[tokio::test]
    async fn failed_reload_within_grace_serves_stale() {
        let repo = StubRepo::default();
        repo.insert("retention", serde_json::json!(30), None);
        let cache = SettingsCache::with_ttl(&repo, Duration::ZERO, Duration::from_secs(600));

        assert_eq!(
            cache.get("retention", serde_json::json!(0)).await,
            serde_json::json!(30)
        );

        // TTL zero: the next lookup reloads; the reload fails but the
        // stale snapshot is within grace.
        repo.fail_loads.store(true, Ordering::SeqCst);
        assert_eq!(
            cache.get("retention", serde_json::json!(0)).await,
            serde_json::json!(30)
        );
    }

    #[tokio::test]
    async fn failed_reload_past_grace_serves_default() {
        let repo = StubRepo::default();
        repo.insert("retention", serde_json::json!(30), None);
        let cache = SettingsCache::with_ttl(&repo, Duration::ZERO, Duration::ZERO);

        assert_eq!(
            cache.get("retention", serde_json::json!(0)).await,
            serde_json::json!(30)
        );

        repo.fail_loads.store(true, Ordering::SeqCst);
        assert_eq!(
            cache.get("retention", serde_json::json!(7)).await,
            serde_json::json!(7)
        );
    }

    #[tokio::test]
    async fn organization_value_shadows_global() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();
        let repo = StubRepo::default();
        repo.insert("max_upload_size", serde_json::json!(10485760), None);
        repo.insert("max_upload_size", serde_json::json!(1048576), Some(org));
        let cache = SettingsCache::new(&repo);

        let in_org = taskhive_core::context::with_tenant(org, async {
            cache.get("max_upload_size", serde_json::json!(0)).await
        })
        .await;
        assert_eq!(in_org, serde_json::json!(1048576));

        let in_other = taskhive_core::context::with_tenant(other, async {
            cache.get("max_upload_size", serde_json::json!(0)).await
        })
        .await;
        assert_eq!(in_other, serde_json::json!(10485760));

        // No ambient tenant: global only.
        assert_eq!(
            cache.get("max_upload_size", serde_json::json!(0)).await,
            serde_json::json!(10485760)
        );
    }
}
