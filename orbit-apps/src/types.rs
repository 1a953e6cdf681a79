//! Core types for installed-application candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an application is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    /// Classic desktop executable; the launch command is a path.
    Win32,
    /// Packaged app launched through the shell apps folder.
    Uwp,
    /// XDG desktop entry; the launch command is the `Exec=` line.
    Desktop,
}

impl AppKind {
    /// Returns the lowercase label used in logs and config.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Uwp => "uwp",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One installed application the user may refer to by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCandidate {
    /// Display name as reported by the directory provider.
    pub name: String,
    /// Command line (or shell target) used to start the application.
    pub launch_command: String,
    /// Launch mechanism.
    pub kind: AppKind,
    /// Lowercased, trimmed name. Used as the cache key.
    pub normalized_key: String,
}

impl AppCandidate {
    /// Build a candidate, deriving `normalized_key` from `name`.
    pub fn new(name: impl Into<String>, launch_command: impl Into<String>, kind: AppKind) -> Self {
        let name = name.into();
        let normalized_key = normalize_key(&name);
        Self {
            name,
            launch_command: launch_command.into(),
            kind,
            normalized_key,
        }
    }
}

/// Lowercase and trim a name or query so lookups are case-insensitive.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
