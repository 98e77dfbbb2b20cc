// Contract tests for schema migration over raw JSON fixtures.
use serde_json::json;

use vitrine::api::{built_in_defaults, migrate, parse_and_migrate};

#[test]
fn empty_object_yields_a_fully_populated_document() {
    let doc = migrate(&json!({}));
    assert_eq!(doc, built_in_defaults());
    assert!(!doc.name.is_empty());
    assert!(!doc.config.nav_items.is_empty());
    assert_eq!(doc.portfolio.len(), 2);
    assert_eq!(doc.highlights.len(), 6);
}

#[test]
fn migration_is_idempotent_over_assorted_fixtures() {
    let fixtures = [
        json!({}),
        json!({"name": "Riley", "highlights": ["one", "two"]}),
        json!({"portfolio": [{"id": "x", "title": "Solo"}]}),
        json!({"config": {"toc_title": "Index"}, "textStyles": {"hero": {"color": "#abc"}}}),
    ];
    for fixture in fixtures {
        let once = migrate(&fixture);
        let twice = migrate(&serde_json::to_value(&once).expect("encode"));
        assert_eq!(once, twice);
    }
}

#[test]
fn legacy_string_highlights_become_entries() {
    let doc = migrate(&json!({"highlights": ["abc", {"text": "x", "url": "y"}]}));
    assert_eq!(doc.highlights[0].text, "abc");
    assert_eq!(doc.highlights[0].url, "");
    assert_eq!(doc.highlights[1].text, "x");
    assert_eq!(doc.highlights[1].url, "y");
}

#[test]
fn legacy_camel_case_documents_migrate_cleanly() {
    // The shape an old browser-app backup used.
    let doc = migrate(&json!({
        "logoText": "TQ.",
        "bioContent": "old bio",
        "avatarUrl": "https://img/avatar.jpg",
        "portfolio": [{
            "id": "7",
            "title": "Old Project",
            "imageUrl": "https://img/main.jpg",
            "logoUrl": "https://img/logo.png",
            "videoUrl": "https://video",
            "gallery": ["https://img/1.jpg"]
        }],
        "config": {
            "heroLayoutSwapped": true,
            "navItems": [{"label": "Start", "targetId": "start"}]
        }
    }));
    assert_eq!(doc.logo_text, "TQ.");
    assert_eq!(doc.bio_content, "old bio");
    assert_eq!(doc.avatar_url, "https://img/avatar.jpg");
    assert_eq!(doc.portfolio.len(), 1);
    assert_eq!(doc.portfolio[0].image_url, "https://img/main.jpg");
    assert!(doc.config.hero_layout_swapped);
    assert_eq!(doc.config.nav_items.len(), 1);
    assert_eq!(doc.config.nav_items[0].target_id, "start");
}

#[test]
fn partial_config_keeps_edits_and_fills_the_rest() {
    let defaults = built_in_defaults();
    let doc = migrate(&json!({"config": {"work_title_main": "PROJECTS"}}));
    assert_eq!(doc.config.work_title_main, "PROJECTS");
    assert_eq!(doc.config.quote_author, defaults.config.quote_author);
    assert_eq!(doc.config.nav_items, defaults.config.nav_items);
}

#[test]
fn partial_portfolio_items_fill_missing_fields() {
    let doc = migrate(&json!({"portfolio": [{"id": "9"}]}));
    assert_eq!(doc.portfolio.len(), 1);
    assert_eq!(doc.portfolio[0].id, "9");
    assert!(!doc.portfolio[0].title.is_empty());
    assert!(!doc.portfolio[0].gallery.is_empty());
}

#[test]
fn unparseable_payload_surfaces_then_caller_falls_back() {
    assert!(parse_and_migrate("plainly not json").is_err());
    let doc = parse_and_migrate("{\"name\": \"Ok\"}").expect("doc");
    assert_eq!(doc.name, "Ok");
}

#[test]
fn text_styles_survive_migration_untouched() {
    let doc = migrate(&json!({
        "text_styles": {
            "hero": {"color": "#fff", "size": "3rem"},
            "quote": {"italic": true}
        }
    }));
    let hero = doc.text_styles.get("hero").expect("hero");
    assert_eq!(hero.color.as_deref(), Some("#fff"));
    assert_eq!(hero.size.as_deref(), Some("3rem"));
    assert_eq!(
        doc.text_styles.get("quote").and_then(|s| s.italic),
        Some(true)
    );
}
