//! Purpose: Client settings for the remote tier and the admin gate.
//! Exports: `Settings`, `RemoteTarget`.
//! Role: Decides whether a remote store is configured at all.
//! Invariants: Missing settings leave the system fully functional on the
//! cache/defaults tiers; placeholder values count as not configured.
//! Invariants: CLI flags override file values without rewriting the file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::cache::map_io_error_kind;
use crate::core::error::{Error, ErrorKind};
use crate::site_paths::settings_file_path;

/// The value shipped in documentation templates; treated as unset.
pub const PLACEHOLDER_REMOTE_URL: &str = "https://REMOTE_URL";

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remote_url: Option<String>,
    pub site: Option<String>,
    pub token: Option<String>,
    pub admin_secret: Option<String>,
}

/// A fully resolved remote endpoint: only produced when configuration is
/// actually usable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteTarget {
    pub base_url: String,
    pub site: String,
    pub token: Option<String>,
}

pub const DEFAULT_SITE: &str = "portfolio";

impl Settings {
    pub fn load(state_dir: &Path) -> Result<Self, Error> {
        let path = settings_file_path(state_dir);
        let payload = match std::fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Settings::default());
            }
            Err(err) => {
                return Err(Error::new(map_io_error_kind(&err))
                    .with_message("failed to read settings")
                    .with_path(&path)
                    .with_source(err));
            }
        };
        serde_json::from_str(&payload).map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message("settings file is not valid json")
                .with_path(&path)
                .with_source(err)
        })
    }

    pub fn store(&self, state_dir: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(state_dir).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to create state directory")
                .with_path(state_dir)
                .with_source(err)
        })?;
        let path = settings_file_path(state_dir);
        let payload = serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode settings")
                .with_source(err)
        })?;
        std::fs::write(&path, payload).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to write settings")
                .with_path(&path)
                .with_source(err)
        })
    }

    /// Apply command-line overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        remote_url: Option<String>,
        site: Option<String>,
        token: Option<String>,
    ) -> Self {
        if remote_url.is_some() {
            self.remote_url = remote_url;
        }
        if site.is_some() {
            self.site = site;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }

    /// `None` means "remote not configured": the empty string and the
    /// documentation placeholder both count as unset.
    pub fn remote_target(&self) -> Option<RemoteTarget> {
        let base_url = self.remote_url.as_deref()?.trim();
        if base_url.is_empty() || base_url == PLACEHOLDER_REMOTE_URL {
            return None;
        }
        Some(RemoteTarget {
            base_url: base_url.to_string(),
            site: self
                .site
                .clone()
                .unwrap_or_else(|| DEFAULT_SITE.to_string()),
            token: self.token.clone(),
        })
    }
}
