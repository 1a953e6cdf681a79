//! Directory providers: raw enumeration of installed applications.
//!
//! A [`DirectoryProvider`] talks to the operating system (registry, start
//! menu, XDG data dirs) and returns every application it can see. It does no
//! caching and no ranking; [`crate::ApplicationRegistry`] layers both on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppsError, Result};
use crate::types::{AppCandidate, AppKind};

/// Installed applications keyed by [`AppCandidate::normalized_key`].
pub type AppMap = HashMap<String, AppCandidate>;

/// Source of installed-application listings.
///
/// Implementations must be `Send + Sync`; the registry may call them from
/// whichever thread notices the cache went stale.
pub trait DirectoryProvider: Send + Sync {
    /// Enumerate installed applications.
    ///
    /// # Errors
    ///
    /// Returns [`AppsError::Scan`] when the underlying source cannot be read.
    fn list_installed_apps(&self) -> Result<AppMap>;

    /// Force a fresh enumeration, bypassing any provider-side caching.
    ///
    /// Defaults to [`DirectoryProvider::list_installed_apps`].
    fn rescan(&self) -> Result<AppMap> {
        self.list_installed_apps()
    }
}

/// Fixed in-memory application list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    apps: Vec<AppCandidate>,
}

impl StaticDirectory {
    pub fn new(apps: Vec<AppCandidate>) -> Self {
        Self { apps }
    }
}

impl DirectoryProvider for StaticDirectory {
    fn list_installed_apps(&self) -> Result<AppMap> {
        Ok(self
            .apps
            .iter()
            .map(|app| (app.normalized_key.clone(), app.clone()))
            .collect())
    }
}

/// Enumerates XDG `.desktop` entries.
#[derive(Debug, Clone)]
pub struct DesktopEntryProvider {
    dirs: Vec<PathBuf>,
}

impl Default for DesktopEntryProvider {
    fn default() -> Self {
        let mut dirs = vec![
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("applications"),
            );
        }
        Self { dirs }
    }
}

impl DesktopEntryProvider {
    /// Scan only the given directories.
    pub fn with_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl DirectoryProvider for DesktopEntryProvider {
    fn list_installed_apps(&self) -> Result<AppMap> {
        let mut apps = AppMap::new();
        let mut readable = 0usize;

        for dir in &self.dirs {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            readable += 1;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                    continue;
                }
                if let Some(app) = read_desktop_entry(&path) {
                    // Later dirs (user-local) override system entries.
                    apps.insert(app.normalized_key.clone(), app);
                }
            }
        }

        if readable == 0 {
            return Err(AppsError::Scan(
                "no readable application directories".into(),
            ));
        }
        debug!(count = apps.len(), "desktop entries scanned");
        Ok(apps)
    }
}

fn read_desktop_entry(path: &Path) -> Option<AppCandidate> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_desktop_entry(&content)
}

/// Parse the `[Desktop Entry]` group of a `.desktop` file.
///
/// Returns `None` for hidden entries and entries without `Name` or `Exec`.
pub fn parse_desktop_entry(content: &str) -> Option<AppCandidate> {
    let mut in_main_group = false;
    let mut name: Option<&str> = None;
    let mut exec: Option<&str> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_main_group = line == "[Desktop Entry]";
            continue;
        }
        if !in_main_group {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "Name" if name.is_none() => name = Some(value.trim()),
            "Exec" if exec.is_none() => exec = Some(value.trim()),
            "NoDisplay" | "Hidden" if value.trim().eq_ignore_ascii_case("true") => return None,
            _ => {}
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    let exec = strip_field_codes(exec?);
    if exec.is_empty() {
        return None;
    }
    Some(AppCandidate::new(name, exec, AppKind::Desktop))
}

/// Remove `%f`, `%U` and similar field codes from an `Exec=` line.
fn strip_field_codes(exec: &str) -> String {
    exec.split_whitespace()
        .filter(|token| !(token.len() == 2 && token.starts_with('%')))
        .collect::<Vec<_>>()
        .join(" ")
}
