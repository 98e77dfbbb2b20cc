//! Purpose: Tiered persistence for the content document and its assets.
//! Exports: `Gateway`, `Loaded`, `LoadSource`, `SaveOutcome`, `RemoteSaveState`.
//! Role: The only path between the in-memory document and storage.
//! Invariants: Load tries remote, cache, defaults in that order and never fails.
//! Invariants: Save writes the cache before the remote write begins.
//! Invariants: Asset names are `{unix_millis}_{sanitized original name}`.

use std::path::Path;

use crate::api::cache::LocalCache;
use crate::api::remote::{AssetInfo, RemoteClient, RemoteSite, SaveReceipt};
use crate::api::settings::RemoteTarget;
use crate::core::document::{built_in_defaults, ContentDocument};
use crate::core::error::{Error, ErrorKind};
use crate::core::fields::AssetBackend;
use crate::core::migrate::migrate;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadSource {
    Remote,
    Cache,
    Defaults,
}

impl LoadSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadSource::Remote => "remote",
            LoadSource::Cache => "cache",
            LoadSource::Defaults => "defaults",
        }
    }
}

/// The precedence rule, spelled out as data so it stays auditable.
const SOURCE_ORDER: [LoadSource; 3] = [LoadSource::Remote, LoadSource::Cache, LoadSource::Defaults];

#[derive(Clone, Debug)]
pub struct Loaded {
    pub document: ContentDocument,
    pub source: LoadSource,
}

#[derive(Clone, Debug)]
pub enum RemoteSaveState {
    Saved(SaveReceipt),
    NotConfigured,
}

#[derive(Clone, Debug)]
pub struct SaveOutcome {
    pub cached: bool,
    pub remote: RemoteSaveState,
}

pub struct Gateway {
    cache: LocalCache,
    remote: Option<RemoteSite>,
}

impl Gateway {
    pub fn new(state_dir: impl AsRef<Path>, target: Option<RemoteTarget>) -> ApiResult<Self> {
        let remote = match target {
            Some(target) => {
                let mut client = RemoteClient::new(target.base_url)?;
                if let Some(token) = target.token {
                    client = client.with_token(token);
                }
                Some(client.site(&target.site)?)
            }
            None => None,
        };
        Ok(Self {
            cache: LocalCache::new(state_dir),
            remote,
        })
    }

    pub fn remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Load the document from the first source that produces one. Remote
    /// success refreshes the cache; every failure mode degrades to the next
    /// source, so this operation cannot fail.
    pub fn load(&self) -> Loaded {
        for source in SOURCE_ORDER {
            if let Some(document) = self.try_source(source) {
                return Loaded { document, source };
            }
        }
        // Defaults always produce a document.
        Loaded {
            document: built_in_defaults(),
            source: LoadSource::Defaults,
        }
    }

    fn try_source(&self, source: LoadSource) -> Option<ContentDocument> {
        match source {
            LoadSource::Remote => {
                let remote = self.remote.as_ref()?;
                match remote.fetch_document() {
                    Ok(value) => {
                        let document = migrate(&value);
                        // Best-effort refresh; a cache miss here must not
                        // turn a successful remote load into a failure.
                        if let Err(err) = self.cache.write(&document) {
                            tracing::debug!("cache refresh failed: {err}");
                        }
                        Some(document)
                    }
                    Err(err) => {
                        tracing::debug!("remote load unavailable: {err}");
                        None
                    }
                }
            }
            LoadSource::Cache => match self.cache.read() {
                Ok(found) => found,
                Err(err) => {
                    tracing::debug!("cache unreadable: {err}");
                    None
                }
            },
            LoadSource::Defaults => Some(built_in_defaults()),
        }
    }

    /// Persist the document: cache first and unconditionally, then remote.
    /// A remote failure propagates, annotated with whether the local copy
    /// made it, so the surface can say "saved locally, not to cloud."
    pub fn save(&self, document: &ContentDocument) -> ApiResult<SaveOutcome> {
        let cached = match self.cache.write(document) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("cache write failed: {err}");
                false
            }
        };

        let Some(remote) = self.remote.as_ref() else {
            return Ok(SaveOutcome {
                cached,
                remote: RemoteSaveState::NotConfigured,
            });
        };

        let value = serde_json::to_value(document).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode document")
                .with_source(err)
        })?;
        match remote.put_document(&value) {
            Ok(receipt) => Ok(SaveOutcome {
                cached,
                remote: RemoteSaveState::Saved(receipt),
            }),
            Err(err) if cached => Err(err.with_hint(
                "The document was still written to the local cache; retry the cloud save later.",
            )),
            Err(err) => Err(err),
        }
    }

    /// Upload a binary asset under a timestamped, sanitized name and return
    /// its resolvable URL metadata.
    pub fn upload_asset(&self, bytes: &[u8], original_name: &str) -> ApiResult<AssetInfo> {
        let remote = self.remote.as_ref().ok_or_else(not_configured)?;
        let name = asset_name(unix_millis(), original_name);
        remote.upload_asset(&name, bytes)
    }

    /// Stored assets, most recently uploaded first. Enumeration failures
    /// propagate, matching the save/upload policy.
    pub fn list_assets(&self) -> ApiResult<Vec<AssetInfo>> {
        let remote = self.remote.as_ref().ok_or_else(not_configured)?;
        let mut assets = remote.list_assets()?;
        assets.reverse();
        Ok(assets)
    }

    /// Drop the local cache entry and hand back the defaults. The remote
    /// store is deliberately left alone.
    pub fn reset(&self) -> ApiResult<ContentDocument> {
        self.cache.clear()?;
        Ok(built_in_defaults())
    }
}

impl AssetBackend for Gateway {
    fn upload_asset(&self, bytes: &[u8], name: &str) -> Result<String, Error> {
        Gateway::upload_asset(self, bytes, name).map(|asset| asset.url)
    }

    fn list_assets(&self) -> Result<Vec<String>, Error> {
        Gateway::list_assets(self).map(|assets| assets.into_iter().map(|a| a.url).collect())
    }
}

fn not_configured() -> Error {
    Error::new(ErrorKind::NotConfigured)
        .with_message("no remote store is configured")
        .with_hint("Set remote_url in settings.json or pass --remote.")
}

fn unix_millis() -> i128 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/// `{millis}_{original}` with every character that is not alphanumeric and
/// not `.` replaced by `_`, matching the historical upload naming.
fn asset_name(millis: i128, original_name: &str) -> String {
    let sanitized: String = original_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
        .collect();
    format!("{millis}_{sanitized}")
}
