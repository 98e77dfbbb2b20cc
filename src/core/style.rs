//! Purpose: Per-element text style overrides and their merge semantics.
//! Exports: `TextStyle`, `StylePatch`, `FontFamily`, `FontWeight`, `TextAlign`.
//! Role: Sparse styling layer; an absent override means "inherit the default".
//! Invariants: Applying a patch only changes the fields the patch sets.
//! Invariants: Style keys are opaque to this module; the presentation layer owns them.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    Sans,
    Serif,
    Mono,
    Display,
    Handwriting,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontWeight {
    Thin,
    Light,
    Normal,
    Medium,
    Bold,
    Black,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

/// One style override record. Every field is optional; unset fields inherit
/// whatever the presentation layer's default style is.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(alias = "fontSize", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(alias = "fontFamily", skip_serializing_if = "Option::is_none")]
    pub font: Option<FontFamily>,
    #[serde(alias = "fontWeight", skip_serializing_if = "Option::is_none")]
    pub weight: Option<FontWeight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uppercase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(alias = "letterSpacing", skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
}

/// A partial style update. Fields left `None` are not touched by `apply`.
pub type StylePatch = TextStyle;

impl TextStyle {
    /// Shallow-merge `patch` into `self`: set fields win, unset fields keep
    /// the existing value.
    pub fn apply(&self, patch: &StylePatch) -> TextStyle {
        TextStyle {
            color: patch.color.clone().or_else(|| self.color.clone()),
            size: patch.size.clone().or_else(|| self.size.clone()),
            font: patch.font.or(self.font),
            weight: patch.weight.or(self.weight),
            italic: patch.italic.or(self.italic),
            uppercase: patch.uppercase.or(self.uppercase),
            align: patch.align.or(self.align),
            letter_spacing: patch
                .letter_spacing
                .clone()
                .or_else(|| self.letter_spacing.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TextStyle::default()
    }
}
