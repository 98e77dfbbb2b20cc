//! Purpose: Backup export and import of the full content document.
//! Exports: `export_document`, `read_import`, `validate_import`.
//! Role: File-interchange boundary for the CLI import/export commands.
//! Invariants: Exports are pretty-printed JSON of the entire document.
//! Invariants: Imports must carry `portfolio` and `config` top-level fields;
//! anything else is rejected without touching the current document.

use std::path::Path;

use serde_json::Value;

use vitrine::api::{migrate, ContentDocument, Error, ErrorKind};

pub(crate) fn export_document(doc: &ContentDocument, path: &Path) -> Result<u64, Error> {
    let payload = serde_json::to_string_pretty(doc).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode document")
            .with_source(err)
    })?;
    std::fs::write(path, &payload).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write backup file")
            .with_path(path)
            .with_source(err)
    })?;
    Ok(payload.len() as u64)
}

/// The minimal structural check an import must pass before it may replace
/// the current document.
pub(crate) fn validate_import(value: &Value) -> Result<(), Error> {
    let Value::Object(map) = value else {
        return Err(invalid_format("the backup must be a JSON object"));
    };
    if !map.contains_key("portfolio") {
        return Err(invalid_format("missing top-level `portfolio` field"));
    }
    if !map.contains_key("config") {
        return Err(invalid_format("missing top-level `config` field"));
    }
    Ok(())
}

pub(crate) fn read_import(path: &Path) -> Result<ContentDocument, Error> {
    let payload = std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read backup file")
            .with_path(path)
            .with_source(err)
    })?;
    let value: Value = serde_json::from_str(&payload).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message("backup file is not valid json")
            .with_path(path)
            .with_source(err)
    })?;
    validate_import(&value).map_err(|err| err.with_path(path))?;
    Ok(migrate(&value))
}

fn invalid_format(detail: &str) -> Error {
    Error::new(ErrorKind::Parse)
        .with_message(format!("invalid backup format: {detail}"))
        .with_hint("Export a backup with `vitrine export` to see the expected shape.")
}
