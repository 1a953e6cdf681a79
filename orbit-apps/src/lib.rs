//! # orbit-apps
//!
//! Installed-application lookup for Orbit.
//!
//! The operating system enumeration lives behind [`DirectoryProvider`]; this
//! crate adds everything the assistant needs on top of it:
//!
//! - A TTL snapshot cache (default 300s) that readers never block on
//! - Case-insensitive substring ranking with system components hidden
//! - Fuzzy fallback ranking by similarity ratio (default cut-off 0.6)
//! - Disambiguation memory: once the user picks an app for a query, the same
//!   query resolves straight to it until the next [`ApplicationRegistry::refresh`]
//!
//! Scan failures are logged and swallowed; lookups degrade to the previous
//! snapshot or to an empty result.

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod scoring;
pub mod types;

pub use cache::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{AppsError, Result};
pub use provider::{AppMap, DesktopEntryProvider, DirectoryProvider, StaticDirectory};
pub use registry::ApplicationRegistry;
pub use types::{AppCandidate, AppKind};
