//! Purpose: Shared state-directory and site-name path resolution helpers.
//! Exports: `default_state_dir`, `cache_file_path`, CLI marker/settings paths.
//! Role: Keep CLI and API path semantics aligned from one source.
//! Invariants: Default state directory remains `~/.vitrine`.
//! Invariants: The cache file name carries the schema version; bumping it
//! invalidates old caches by key-miss instead of by migration.
//! Invariants: Site names must not contain path separators.

use std::path::{Path, PathBuf};

/// Bumped when the document schema changes incompatibly.
pub const CACHE_FILE: &str = "document_v4.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const ADMIN_SESSION_FILE: &str = "admin_session";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SiteNameError {
    ContainsPathSeparator,
}

pub fn default_state_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".vitrine")
}

pub fn cache_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CACHE_FILE)
}

pub fn settings_file_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SETTINGS_FILE)
}

pub fn admin_session_path(state_dir: &Path) -> PathBuf {
    state_dir.join(ADMIN_SESSION_FILE)
}

pub fn validate_site_name(name: &str) -> Result<(), SiteNameError> {
    if name.contains('/') || name.contains('\\') {
        return Err(SiteNameError::ContainsPathSeparator);
    }
    Ok(())
}
