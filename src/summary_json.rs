//! Purpose: Shared document/asset JSON serializers for CLI output paths.
//! Exports: `document_summary_json` and `asset_json`.
//! Role: Keep stdout envelope shapes consistent across commands.
//! Invariants: Stable key names for summary payloads.

use serde_json::{json, Map, Value};
use vitrine::api::{AssetInfo, ContentDocument, LoadSource};

pub(crate) fn document_summary_json(doc: &ContentDocument, source: LoadSource) -> Value {
    let mut map = Map::new();
    map.insert("source".to_string(), json!(source.as_str()));
    map.insert("name".to_string(), json!(doc.name));
    map.insert("role".to_string(), json!(doc.role));
    map.insert("highlights".to_string(), json!(doc.highlights.len()));
    map.insert("projects".to_string(), json!(doc.portfolio.len()));
    map.insert("nav_items".to_string(), json!(doc.config.nav_items.len()));
    map.insert("text_styles".to_string(), json!(doc.text_styles.len()));
    map.insert(
        "project_ids".to_string(),
        json!(doc
            .portfolio
            .iter()
            .map(|item| item.id.clone())
            .collect::<Vec<_>>()),
    );
    Value::Object(map)
}

pub(crate) fn asset_json(asset: &AssetInfo) -> Value {
    json!({
        "name": asset.name,
        "url": asset.url,
        "size": asset.size,
        "sha256": asset.sha256,
    })
}
