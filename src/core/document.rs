//! Purpose: Define the canonical portfolio content document and its defaults.
//! Exports: `ContentDocument`, nested content types, `built_in_defaults`.
//! Role: Single source of truth for the document shape used by every tier.
//! Invariants: A constructed document is always fully populated; no field is optional-at-rest.
//! Invariants: Serde aliases accept the legacy camelCase wire form; output is snake_case.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::style::TextStyle;

/// One highlight card. `url` is empty when the highlight is not a link.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HighlightEntry {
    pub text: String,
    pub url: String,
}

impl HighlightEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: String::new(),
        }
    }
}

// Older documents stored highlights as bare strings. Accept both forms.
impl<'de> Deserialize<'de> for HighlightEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Legacy(String),
            Entry {
                #[serde(default)]
                text: String,
                #[serde(default)]
                url: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Legacy(text) => HighlightEntry {
                text,
                url: String::new(),
            },
            Raw::Entry { text, url } => HighlightEntry { text, url },
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub role: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    #[serde(alias = "logoUrl")]
    pub logo_url: String,
    #[serde(alias = "videoUrl")]
    pub video_url: String,
    pub gallery: Vec<String>,
}

impl Default for PortfolioItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: "New Project".to_string(),
            description: "Project description...".to_string(),
            role: "My Role".to_string(),
            image_url: PLACEHOLDER_IMAGE.to_string(),
            logo_url: PLACEHOLDER_LOGO.to_string(),
            video_url: "#".to_string(),
            gallery: vec![PLACEHOLDER_IMAGE.to_string(); GALLERY_CAPACITY],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub phone: String,
    pub email: String,
    pub facebook: String,
    pub tiktok: String,
}

impl Default for SocialLinks {
    fn default() -> Self {
        Self {
            phone: "+1 555 0100".to_string(),
            email: "hello@example.com".to_string(),
            facebook: "https://facebook.com".to_string(),
            tiktok: "https://tiktok.com".to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavItem {
    pub label: String,
    #[serde(alias = "targetId")]
    pub target_id: String,
}

impl Default for NavItem {
    fn default() -> Self {
        Self {
            label: "Section".to_string(),
            target_id: "section".to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    #[serde(alias = "heroBackgroundText")]
    pub hero_background_text: String,
    #[serde(alias = "tocTitle")]
    pub toc_title: String,
    #[serde(alias = "tocSubtitle")]
    pub toc_subtitle: String,
    #[serde(alias = "workTitleMain")]
    pub work_title_main: String,
    #[serde(alias = "workTitleSub")]
    pub work_title_sub: String,
    #[serde(alias = "workDescription")]
    pub work_description: String,
    #[serde(alias = "quoteContent")]
    pub quote_content: String,
    #[serde(alias = "quoteAuthor")]
    pub quote_author: String,
    #[serde(alias = "heroLayoutSwapped")]
    pub hero_layout_swapped: bool,
    #[serde(alias = "versionText")]
    pub version_text: String,
    #[serde(alias = "navItems")]
    pub nav_items: Vec<NavItem>,
    #[serde(alias = "labelPortrait")]
    pub label_portrait: String,
    #[serde(alias = "labelIntro")]
    pub label_intro: String,
    #[serde(alias = "labelHighlights")]
    pub label_highlights: String,
    #[serde(alias = "labelQuote")]
    pub label_quote: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            hero_background_text: "PORTFOLIO".to_string(),
            toc_title: "Contents".to_string(),
            toc_subtitle: "TABLE OF".to_string(),
            work_title_main: "WORK".to_string(),
            work_title_sub: "Folio".to_string(),
            work_description:
                "A collection of events, productions, and creative directions curated over the years."
                    .to_string(),
            quote_content: "\"Making moments that matter.\"".to_string(),
            quote_author: "Avery Quinn".to_string(),
            hero_layout_swapped: false,
            version_text: "PORTFOLIO V.1.0".to_string(),
            nav_items: vec![
                NavItem {
                    label: "Home".to_string(),
                    target_id: "home".to_string(),
                },
                NavItem {
                    label: "Highlight".to_string(),
                    target_id: "highlights".to_string(),
                },
                NavItem {
                    label: "My Work".to_string(),
                    target_id: "work".to_string(),
                },
                NavItem {
                    label: "Contact".to_string(),
                    target_id: "contact".to_string(),
                },
            ],
            label_portrait: "PORTRAIT_AVATAR".to_string(),
            label_intro: "INTRODUCTION".to_string(),
            label_highlights: "GRID_LAYOUT".to_string(),
            label_quote: "ART_DIRECTION".to_string(),
        }
    }
}

/// The root aggregate. One instance per session; every edit produces a new
/// value with only the touched path changed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDocument {
    #[serde(alias = "logoText")]
    pub logo_text: String,
    #[serde(alias = "logoImageUrl")]
    pub logo_image_url: String,
    pub name: String,
    pub role: String,
    pub dob: String,
    #[serde(alias = "currentWork")]
    pub current_work: String,
    #[serde(alias = "bioTitle")]
    pub bio_title: String,
    #[serde(alias = "bioContent")]
    pub bio_content: String,
    #[serde(alias = "avatarUrl")]
    pub avatar_url: String,
    pub highlights: Vec<HighlightEntry>,
    pub portfolio: Vec<PortfolioItem>,
    pub social: SocialLinks,
    pub config: SiteConfig,
    #[serde(alias = "textStyles")]
    pub text_styles: BTreeMap<String, TextStyle>,
}

impl Default for ContentDocument {
    fn default() -> Self {
        built_in_defaults()
    }
}

pub const GALLERY_CAPACITY: usize = 12;
pub const PLACEHOLDER_IMAGE: &str = "https://picsum.photos/400/400";
pub const PLACEHOLDER_LOGO: &str =
    "https://placehold.co/400x100/000000/FFFFFF/png?text=PROJECT+LOGO";
/// Shown by display-mode image fields when the underlying resource fails to load.
pub const FALLBACK_IMAGE: &str = "https://placehold.co/400x400/1a1a1a/white?text=Image+Error";

fn gallery_seeded(prefix: &str) -> Vec<String> {
    (1..=GALLERY_CAPACITY)
        .map(|n| format!("https://picsum.photos/seed/{prefix}{n}/400/400"))
        .collect()
}

/// The document a fresh install presents before anything was ever saved.
pub fn built_in_defaults() -> ContentDocument {
    ContentDocument {
        logo_text: "AQ.".to_string(),
        logo_image_url: String::new(),
        name: "Avery Quinn".to_string(),
        role: "Event Producer".to_string(),
        dob: "04/02/1996".to_string(),
        current_work: "Event".to_string(),
        bio_title: "Hi, I'm Avery!".to_string(),
        bio_content: "I work in live event production and stage direction, where every day \
                      is a new creative run. I like building the moments that land: not the \
                      loudest ones, the ones people remember."
            .to_string(),
        avatar_url: "https://picsum.photos/seed/portrait/800/800".to_string(),
        highlights: vec![
            HighlightEntry::new("Top 24 finalist, National Student Host Competition 2024."),
            HighlightEntry::new("Resident announcer for two community radio stations."),
            HighlightEntry::new("Full merit scholarship, city university media program."),
            HighlightEntry::new("Third prize, \"Voices on Air 2023\" broadcasting contest."),
            HighlightEntry::new("Leader of the MC team at the campus media club."),
            HighlightEntry::new("Host of hundreds of campus shows and conferences."),
        ],
        portfolio: vec![
            PortfolioItem {
                id: "1".to_string(),
                title: "Traditional Music Camp".to_string(),
                description: "A four-city series of concerts and workshops built around \
                              traditional instruments and new arrangements."
                    .to_string(),
                role: "Project Manager / Art Director".to_string(),
                image_url: "https://picsum.photos/seed/camp/800/800".to_string(),
                logo_url: "https://placehold.co/400x100/000000/FFFFFF/png?text=MUSIC+CAMP"
                    .to_string(),
                video_url: "https://youtube.com".to_string(),
                gallery: gallery_seeded("camp"),
            },
            PortfolioItem {
                id: "2".to_string(),
                title: "Talkshow \"Gen Z & AI\"".to_string(),
                description: "Host and moderator for a 500-seat student talkshow on how a \
                              generation actually uses the tools."
                    .to_string(),
                role: "MC / Host".to_string(),
                image_url: "https://picsum.photos/seed/talkshow/800/600".to_string(),
                logo_url: "https://placehold.co/400x100/000000/FFFFFF/png?text=GENZ+AI"
                    .to_string(),
                video_url: "https://youtube.com".to_string(),
                gallery: gallery_seeded("ai"),
            },
        ],
        social: SocialLinks::default(),
        config: SiteConfig::default(),
        text_styles: BTreeMap::new(),
    }
}
