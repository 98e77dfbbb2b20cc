//! Purpose: Local single-slot cache for the serialized content document.
//! Exports: `LocalCache`.
//! Role: Fallback tier and write-through mirror under the state directory.
//! Invariants: One versioned file; a schema bump misses by file name, never
//! by partial migration of a stale cache.
//! Invariants: Writes create the state directory on demand.

use std::path::{Path, PathBuf};

use crate::core::document::ContentDocument;
use crate::core::error::{Error, ErrorKind};
use crate::core::migrate::parse_and_migrate;
use crate::site_paths::cache_file_path;

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_file_path(state_dir.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and migrate the cached document. `Ok(None)` when the slot was
    /// never written (or was invalidated by a schema bump renaming it).
    pub fn read(&self) -> ApiResult<Option<ContentDocument>> {
        let payload = match std::fs::read_to_string(&self.path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::new(map_io_error_kind(&err))
                    .with_message("failed to read cached document")
                    .with_path(&self.path)
                    .with_source(err));
            }
        };
        parse_and_migrate(&payload)
            .map(Some)
            .map_err(|err| err.with_path(&self.path))
    }

    pub fn write(&self, doc: &ContentDocument) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(map_io_error_kind(&err))
                    .with_message("failed to create state directory")
                    .with_path(parent)
                    .with_source(err)
            })?;
        }
        let payload = serde_json::to_string(doc).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode document")
                .with_source(err)
        })?;
        std::fs::write(&self.path, payload).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to write cached document")
                .with_path(&self.path)
                .with_source(err)
        })
    }

    /// Delete the slot. Missing is fine; reset is idempotent.
    pub fn clear(&self) -> ApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::new(map_io_error_kind(&err))
                .with_message("failed to delete cached document")
                .with_path(&self.path)
                .with_source(err)),
        }
    }
}

pub(crate) fn map_io_error_kind(err: &std::io::Error) -> ErrorKind {
    match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::LocalCache;
    use crate::core::document::built_in_defaults;
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_slot_reads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LocalCache::new(dir.path());
        assert!(cache.read().expect("read").is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LocalCache::new(dir.path());
        let doc = built_in_defaults();
        cache.write(&doc).expect("write");
        let back = cache.read().expect("read").expect("cached");
        assert_eq!(back, doc);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LocalCache::new(dir.path());
        cache.clear().expect("clear empty");
        cache.write(&built_in_defaults()).expect("write");
        cache.clear().expect("clear");
        cache.clear().expect("clear again");
        assert!(cache.read().expect("read").is_none());
    }

    #[test]
    fn garbage_payload_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LocalCache::new(dir.path());
        std::fs::write(cache.path(), "{broken").expect("write raw");
        let err = cache.read().expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn partial_cached_document_is_migrated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = LocalCache::new(dir.path());
        std::fs::write(cache.path(), r#"{"name":"Cached"}"#).expect("write raw");
        let doc = cache.read().expect("read").expect("cached");
        assert_eq!(doc.name, "Cached");
        assert_eq!(doc.highlights, built_in_defaults().highlights);
    }
}
