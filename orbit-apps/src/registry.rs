//! The application registry: cached, ranked lookup with disambiguation
//! memory.
//!
//! Lookup order, stopping at the first non-empty result:
//!
//! 1. empty query → nothing
//! 2. remembered choice for this exact query, if still installed
//! 3. case-insensitive substring match (system components excluded)
//! 4. fuzzy similarity ≥ threshold, best first

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{Clock, Snapshot, SnapshotCache, SystemClock};
use crate::config::RegistryConfig;
use crate::error::Result;
use crate::provider::DirectoryProvider;
use crate::scoring::{clean_name, fuzzy_matches, is_system_app, substring_matches};
use crate::types::{AppCandidate, normalize_key};

/// Cached, ranked view over a [`DirectoryProvider`].
///
/// Safe to share across threads; wrap in an `Arc`.
pub struct ApplicationRegistry {
    provider: Arc<dyn DirectoryProvider>,
    clock: Arc<dyn Clock>,
    config: RegistryConfig,
    cache: SnapshotCache,
    /// Normalized query → normalized key of the app the user chose.
    memory: RwLock<HashMap<String, String>>,
}

impl ApplicationRegistry {
    /// Create a registry using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppsError::Config`] if `config` is invalid.
    pub fn new(provider: Arc<dyn DirectoryProvider>, config: RegistryConfig) -> Result<Self> {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Create a registry with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppsError::Config`] if `config` is invalid.
    pub fn with_clock(
        provider: Arc<dyn DirectoryProvider>,
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let cache = SnapshotCache::new(Duration::from_secs(config.cache_ttl_seconds));
        Ok(Self {
            provider,
            clock,
            config,
            cache,
            memory: RwLock::new(HashMap::new()),
        })
    }

    /// Ranked candidates for `query`.
    pub fn find_candidates(&self, query: &str) -> Vec<AppCandidate> {
        let query = normalize_key(query);
        if query.is_empty() {
            return Vec::new();
        }

        let snapshot = self.installed_apps();

        if let Some(app) = self.remembered(&query, &snapshot) {
            debug!(%query, app = %app.name, "using remembered choice");
            return vec![app];
        }

        let keywords = &self.config.system_keywords;
        let contains = substring_matches(snapshot.apps.values(), &query, keywords);
        if !contains.is_empty() {
            debug!(%query, count = contains.len(), "substring candidates");
            return contains;
        }

        let fuzzy: Vec<AppCandidate> = fuzzy_matches(
            snapshot.apps.values(),
            &query,
            self.config.fuzzy_threshold,
            keywords,
        )
        .into_iter()
        .map(|(_, app)| app)
        .collect();
        debug!(%query, count = fuzzy.len(), "fuzzy candidates");
        fuzzy
    }

    /// Look up an installed application by exact (case-insensitive) name.
    pub fn candidate_by_name(&self, name: &str) -> Option<AppCandidate> {
        let key = normalize_key(name);
        self.installed_apps().apps.get(&key).cloned()
    }

    /// Remember that `query` resolved to the application named `name`.
    pub fn remember_choice(&self, query: &str, name: &str) {
        let query = normalize_key(query);
        if query.is_empty() {
            return;
        }
        let key = normalize_key(name);
        debug!(%query, choice = %key, "remembering application choice");
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(query, key);
    }

    /// Force a rescan regardless of TTL and forget remembered choices.
    ///
    /// Concurrent readers keep seeing the previous snapshot until the new
    /// one is swapped in. Returns the number of applications found; a failed
    /// scan marks the cache stale and reports zero.
    pub fn refresh(&self) -> usize {
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        match self.provider.rescan() {
            Ok(apps) => {
                let count = apps.len();
                self.cache.store(apps, self.clock.now());
                info!(count, "application registry refreshed");
                count
            }
            Err(e) => {
                warn!("application rescan failed: {e}");
                self.cache.invalidate();
                0
            }
        }
    }

    /// Cleaned, de-duplicated, sorted names of all non-system applications.
    pub fn list_names(&self) -> Vec<String> {
        let snapshot = self.installed_apps();
        let mut names: Vec<String> = snapshot
            .apps
            .values()
            .filter(|app| !is_system_app(&app.name, &self.config.system_keywords))
            .map(|app| clean_name(&app.name))
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// The current snapshot, rescanning first if it is missing or stale.
    ///
    /// Scan failures are swallowed: the previous snapshot (or an empty one)
    /// is returned and the cache stays stale so the next call retries.
    pub fn installed_apps(&self) -> Arc<Snapshot> {
        let now = self.clock.now();
        if let Some(snap) = self.cache.fresh(now) {
            return snap;
        }

        match self.provider.list_installed_apps() {
            Ok(apps) => {
                debug!(count = apps.len(), "application scan complete");
                self.cache.store(apps, now)
            }
            Err(e) => {
                warn!("application scan failed: {e}");
                self.cache
                    .current()
                    .unwrap_or_else(|| Arc::new(Snapshot::empty(now)))
            }
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn remembered(&self, query: &str, snapshot: &Snapshot) -> Option<AppCandidate> {
        let memory = self.memory.read().unwrap_or_else(|e| e.into_inner());
        let key = memory.get(query)?;
        snapshot.apps.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::AppsError;
    use crate::provider::{AppMap, StaticDirectory};
    use crate::types::AppKind;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Provider that counts scans and can be switched into failure mode.
    struct CountingProvider {
        inner: StaticDirectory,
        scans: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingProvider {
        fn new(names: &[&str]) -> Self {
            let apps = names
                .iter()
                .map(|n| AppCandidate::new(*n, format!("{n}.exe"), AppKind::Win32))
                .collect();
            Self {
                inner: StaticDirectory::new(apps),
                scans: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            }
        }
    }

    impl DirectoryProvider for CountingProvider {
        fn list_installed_apps(&self) -> Result<AppMap> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppsError::Scan("simulated failure".into()));
            }
            self.inner.list_installed_apps()
        }
    }

    fn registry(names: &[&str]) -> (ApplicationRegistry, Arc<CountingProvider>, Arc<ManualClock>) {
        let provider = Arc::new(CountingProvider::new(names));
        let clock = Arc::new(ManualClock::new());
        let reg = ApplicationRegistry::with_clock(
            provider.clone(),
            RegistryConfig::default(),
            clock.clone(),
        )
        .expect("valid config");
        (reg, provider, clock)
    }

    #[test]
    fn empty_query_returns_nothing_without_scanning() {
        let (reg, provider, _) = registry(&["Chrome"]);
        assert!(reg.find_candidates("   ").is_empty());
        assert_eq!(provider.scans.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn substring_match_short_circuits_fuzzy() {
        let (reg, _, _) = registry(&["Chrome", "Chromium", "Notepad"]);
        let names: Vec<_> = reg
            .find_candidates("chrome")
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Chrome"]);

        let names: Vec<_> = reg
            .find_candidates("chrom")
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Chrome", "Chromium"]);
    }

    #[test]
    fn remembered_choice_short_circuits() {
        let (reg, _, _) = registry(&["Chrome", "Chromium"]);
        reg.remember_choice("chrom", "Chromium");
        let found = reg.find_candidates("Chrom");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Chromium");
    }

    #[test]
    fn remembered_choice_ignored_when_uninstalled() {
        let (reg, _, _) = registry(&["Chrome"]);
        reg.remember_choice("chrom", "Chromium");
        let found = reg.find_candidates("chrom");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Chrome");
    }

    #[test]
    fn cache_reused_within_ttl() {
        let (reg, provider, clock) = registry(&["Chrome"]);
        reg.find_candidates("chrome");
        clock.advance(Duration::from_secs(299));
        reg.find_candidates("chrome");
        assert_eq!(provider.scans.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_rescanned_after_ttl() {
        let (reg, provider, clock) = registry(&["Chrome"]);
        reg.find_candidates("chrome");
        clock.advance(Duration::from_secs(300));
        reg.find_candidates("chrome");
        assert_eq!(provider.scans.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn refresh_rescans_and_clears_memory() {
        let (reg, provider, _) = registry(&["Chrome", "Chromium"]);
        reg.find_candidates("chrom");
        reg.remember_choice("chrom", "Chromium");

        assert_eq!(reg.refresh(), 2);
        assert_eq!(provider.scans.load(Ordering::SeqCst), 2);
        assert_eq!(reg.find_candidates("chrom").len(), 2);
        // The refresh scan is fresh: no third scan.
        assert_eq!(provider.scans.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn scan_failure_returns_previous_snapshot() {
        let (reg, provider, clock) = registry(&["Chrome"]);
        assert_eq!(reg.find_candidates("chrome").len(), 1);

        provider.failing.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(301));
        assert_eq!(reg.find_candidates("chrome").len(), 1);
    }

    #[test]
    fn scan_failure_without_snapshot_is_empty() {
        let (reg, provider, _) = registry(&["Chrome"]);
        provider.failing.store(true, Ordering::SeqCst);
        assert!(reg.find_candidates("chrome").is_empty());
        assert_eq!(reg.refresh(), 0);
    }

    #[test]
    fn list_names_cleans_and_hides_system() {
        let (reg, _, _) = registry(&["visual_studio.code", "Java Runtime", "Chrome"]);
        assert_eq!(reg.list_names(), vec!["Chrome", "Visual Studio Code"]);
    }

    #[test]
    fn candidate_by_name_is_case_insensitive() {
        let (reg, _, _) = registry(&["Chromium"]);
        assert!(reg.candidate_by_name("CHROMIUM").is_some());
        assert!(reg.candidate_by_name("Firefox").is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let provider = Arc::new(StaticDirectory::default());
        let config = RegistryConfig {
            cache_ttl_seconds: 0,
            ..Default::default()
        };
        assert!(ApplicationRegistry::new(provider, config).is_err());
    }
}
