//! Purpose: Upgrade arbitrary loaded JSON into a fully-populated current document.
//! Exports: `migrate`, `parse_and_migrate`.
//! Role: Normalization boundary between storage tiers and the in-memory model.
//! Invariants: Migration never fails; unrecognized parts degrade to defaults.
//! Invariants: Migrating an already-current document is a no-op.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::document::{built_in_defaults, ContentDocument};
use crate::core::error::{Error, ErrorKind};
use crate::core::style::TextStyle;

/// Produce a current-shape document from any JSON value. Missing or
/// malformed parts fall back to the built-in defaults, field by field.
pub fn migrate(value: &Value) -> ContentDocument {
    let Value::Object(map) = value else {
        return built_in_defaults();
    };
    let defaults = built_in_defaults();

    ContentDocument {
        logo_text: field(map, &["logo_text", "logoText"], defaults.logo_text),
        logo_image_url: field(
            map,
            &["logo_image_url", "logoImageUrl"],
            defaults.logo_image_url,
        ),
        name: field(map, &["name"], defaults.name),
        role: field(map, &["role"], defaults.role),
        dob: field(map, &["dob"], defaults.dob),
        current_work: field(map, &["current_work", "currentWork"], defaults.current_work),
        bio_title: field(map, &["bio_title", "bioTitle"], defaults.bio_title),
        bio_content: field(map, &["bio_content", "bioContent"], defaults.bio_content),
        avatar_url: field(map, &["avatar_url", "avatarUrl"], defaults.avatar_url),
        // HighlightEntry's deserializer already lifts legacy bare strings
        // into `{text, url: ""}` entries.
        highlights: field(map, &["highlights"], defaults.highlights),
        portfolio: field(map, &["portfolio"], defaults.portfolio),
        social: field(map, &["social"], defaults.social),
        config: migrate_config(map.get("config"), defaults.config),
        text_styles: field(
            map,
            &["text_styles", "textStyles"],
            BTreeMap::<String, TextStyle>::new(),
        ),
    }
}

/// Decode a serialized document and migrate it. Unlike `migrate`, a payload
/// that is not JSON at all is an error the caller is expected to turn into
/// a fall-back to defaults.
pub fn parse_and_migrate(payload: &str) -> Result<ContentDocument, Error> {
    let value: Value = serde_json::from_str(payload).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message("stored document is not valid json")
            .with_source(err)
    })?;
    Ok(migrate(&value))
}

// The config block is merged key by key so a partial config keeps its edits
// while absent keys (including the whole nav_items list) come from defaults.
fn migrate_config(
    value: Option<&Value>,
    defaults: crate::core::document::SiteConfig,
) -> crate::core::document::SiteConfig {
    let Some(Value::Object(map)) = value else {
        return defaults;
    };
    crate::core::document::SiteConfig {
        hero_background_text: field(
            map,
            &["hero_background_text", "heroBackgroundText"],
            defaults.hero_background_text,
        ),
        toc_title: field(map, &["toc_title", "tocTitle"], defaults.toc_title),
        toc_subtitle: field(map, &["toc_subtitle", "tocSubtitle"], defaults.toc_subtitle),
        work_title_main: field(
            map,
            &["work_title_main", "workTitleMain"],
            defaults.work_title_main,
        ),
        work_title_sub: field(
            map,
            &["work_title_sub", "workTitleSub"],
            defaults.work_title_sub,
        ),
        work_description: field(
            map,
            &["work_description", "workDescription"],
            defaults.work_description,
        ),
        quote_content: field(
            map,
            &["quote_content", "quoteContent"],
            defaults.quote_content,
        ),
        quote_author: field(map, &["quote_author", "quoteAuthor"], defaults.quote_author),
        hero_layout_swapped: field(
            map,
            &["hero_layout_swapped", "heroLayoutSwapped"],
            defaults.hero_layout_swapped,
        ),
        version_text: field(map, &["version_text", "versionText"], defaults.version_text),
        nav_items: field(map, &["nav_items", "navItems"], defaults.nav_items),
        label_portrait: field(
            map,
            &["label_portrait", "labelPortrait"],
            defaults.label_portrait,
        ),
        label_intro: field(map, &["label_intro", "labelIntro"], defaults.label_intro),
        label_highlights: field(
            map,
            &["label_highlights", "labelHighlights"],
            defaults.label_highlights,
        ),
        label_quote: field(map, &["label_quote", "labelQuote"], defaults.label_quote),
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, names: &[&str], fallback: T) -> T {
    for name in names {
        if let Some(value) = map.get(*name) {
            if let Ok(decoded) = serde_json::from_value(value.clone()) {
                return decoded;
            }
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::{migrate, parse_and_migrate};
    use crate::core::document::built_in_defaults;
    use serde_json::json;

    #[test]
    fn empty_object_fills_every_field() {
        let doc = migrate(&json!({}));
        assert_eq!(doc, built_in_defaults());
    }

    #[test]
    fn non_object_degrades_to_defaults() {
        assert_eq!(migrate(&json!(null)), built_in_defaults());
        assert_eq!(migrate(&json!([1, 2, 3])), built_in_defaults());
    }

    #[test]
    fn migration_is_idempotent() {
        let once = migrate(&json!({"name": "Riley", "highlights": ["a"]}));
        let value = serde_json::to_value(&once).expect("encode");
        let twice = migrate(&value);
        assert_eq!(once, twice);
    }

    #[test]
    fn legacy_string_highlights_are_lifted() {
        let doc = migrate(&json!({
            "highlights": ["abc", {"text": "x", "url": "y"}]
        }));
        assert_eq!(doc.highlights.len(), 2);
        assert_eq!(doc.highlights[0].text, "abc");
        assert_eq!(doc.highlights[0].url, "");
        assert_eq!(doc.highlights[1].text, "x");
        assert_eq!(doc.highlights[1].url, "y");
    }

    #[test]
    fn config_merges_key_by_key() {
        let doc = migrate(&json!({
            "config": {"work_title_main": "PROJECTS"}
        }));
        let defaults = built_in_defaults();
        assert_eq!(doc.config.work_title_main, "PROJECTS");
        assert_eq!(doc.config.toc_title, defaults.config.toc_title);
        assert_eq!(doc.config.nav_items, defaults.config.nav_items);
    }

    #[test]
    fn missing_nav_items_take_the_default_list_wholesale() {
        let doc = migrate(&json!({
            "config": {"quote_author": "Someone"}
        }));
        assert_eq!(doc.config.nav_items, built_in_defaults().config.nav_items);
    }

    #[test]
    fn malformed_parts_fall_back_per_field() {
        let doc = migrate(&json!({
            "name": "Kept",
            "highlights": 42,
            "config": {"hero_layout_swapped": "not-a-bool"}
        }));
        let defaults = built_in_defaults();
        assert_eq!(doc.name, "Kept");
        assert_eq!(doc.highlights, defaults.highlights);
        assert_eq!(
            doc.config.hero_layout_swapped,
            defaults.config.hero_layout_swapped
        );
    }

    #[test]
    fn unparseable_payload_is_a_parse_error() {
        let err = parse_and_migrate("{not json").expect_err("err");
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Parse);
    }

    #[test]
    fn text_styles_default_to_empty_map() {
        let doc = migrate(&json!({"textStyles": {"hero": {"color": "#fff"}}}));
        assert_eq!(
            doc.text_styles.get("hero").and_then(|s| s.color.as_deref()),
            Some("#fff")
        );
        let doc = migrate(&json!({}));
        assert!(doc.text_styles.is_empty());
    }
}
