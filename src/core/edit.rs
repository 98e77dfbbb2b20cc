//! Purpose: Pure, path-scoped edit operations over the content document.
//! Exports: field enums, list operations, `Direction`, `next_item_id`.
//! Role: The only mutation surface; every operation returns a new document.
//! Invariants: An operation touches exactly the addressed path.
//! Invariants: Boundary moves are silent no-ops; bad indexes are usage errors.
//! Invariants: Portfolio ids stay pairwise unique for the document lifetime.

use std::str::FromStr;

use crate::core::document::{
    ContentDocument, HighlightEntry, NavItem, PortfolioItem, GALLERY_CAPACITY, PLACEHOLDER_IMAGE,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::style::{StylePatch, TextStyle};

pub type EditResult = Result<ContentDocument, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown direction `{other}`"))
                .with_hint("Use `up` or `down`.")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProfileField {
    LogoText,
    LogoImageUrl,
    Name,
    Role,
    Dob,
    CurrentWork,
    BioTitle,
    BioContent,
    AvatarUrl,
}

impl FromStr for ProfileField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "logo-text" => Ok(Self::LogoText),
            "logo-image-url" => Ok(Self::LogoImageUrl),
            "name" => Ok(Self::Name),
            "role" => Ok(Self::Role),
            "dob" => Ok(Self::Dob),
            "current-work" => Ok(Self::CurrentWork),
            "bio-title" => Ok(Self::BioTitle),
            "bio-content" => Ok(Self::BioContent),
            "avatar-url" => Ok(Self::AvatarUrl),
            other => Err(unknown_field(other, PROFILE_FIELDS)),
        }
    }
}

const PROFILE_FIELDS: &str =
    "logo-text, logo-image-url, name, role, dob, current-work, bio-title, bio-content, avatar-url";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigField {
    HeroBackgroundText,
    TocTitle,
    TocSubtitle,
    WorkTitleMain,
    WorkTitleSub,
    WorkDescription,
    QuoteContent,
    QuoteAuthor,
    HeroLayoutSwapped,
    VersionText,
    LabelPortrait,
    LabelIntro,
    LabelHighlights,
    LabelQuote,
}

impl FromStr for ConfigField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "hero-background-text" => Ok(Self::HeroBackgroundText),
            "toc-title" => Ok(Self::TocTitle),
            "toc-subtitle" => Ok(Self::TocSubtitle),
            "work-title-main" => Ok(Self::WorkTitleMain),
            "work-title-sub" => Ok(Self::WorkTitleSub),
            "work-description" => Ok(Self::WorkDescription),
            "quote-content" => Ok(Self::QuoteContent),
            "quote-author" => Ok(Self::QuoteAuthor),
            "hero-layout-swapped" => Ok(Self::HeroLayoutSwapped),
            "version-text" => Ok(Self::VersionText),
            "label-portrait" => Ok(Self::LabelPortrait),
            "label-intro" => Ok(Self::LabelIntro),
            "label-highlights" => Ok(Self::LabelHighlights),
            "label-quote" => Ok(Self::LabelQuote),
            other => Err(unknown_field(other, CONFIG_FIELDS)),
        }
    }
}

const CONFIG_FIELDS: &str = "hero-background-text, toc-title, toc-subtitle, work-title-main, \
                             work-title-sub, work-description, quote-content, quote-author, \
                             hero-layout-swapped, version-text, label-portrait, label-intro, \
                             label-highlights, label-quote";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SocialField {
    Phone,
    Email,
    Facebook,
    Tiktok,
}

impl FromStr for SocialField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "phone" => Ok(Self::Phone),
            "email" => Ok(Self::Email),
            "facebook" => Ok(Self::Facebook),
            "tiktok" => Ok(Self::Tiktok),
            other => Err(unknown_field(other, "phone, email, facebook, tiktok")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PortfolioField {
    Title,
    Description,
    Role,
    ImageUrl,
    LogoUrl,
    VideoUrl,
}

impl FromStr for PortfolioField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            "role" => Ok(Self::Role),
            "image-url" => Ok(Self::ImageUrl),
            "logo-url" => Ok(Self::LogoUrl),
            "video-url" => Ok(Self::VideoUrl),
            other => Err(unknown_field(
                other,
                "title, description, role, image-url, logo-url, video-url",
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavField {
    Label,
    TargetId,
}

impl FromStr for NavField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "label" => Ok(Self::Label),
            "target-id" => Ok(Self::TargetId),
            other => Err(unknown_field(other, "label, target-id")),
        }
    }
}

fn unknown_field(name: &str, known: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("unknown field `{name}`"))
        .with_hint(format!("Known fields: {known}."))
}

pub fn set_profile_field(doc: &ContentDocument, field: ProfileField, value: &str) -> EditResult {
    let mut next = doc.clone();
    let slot = match field {
        ProfileField::LogoText => &mut next.logo_text,
        ProfileField::LogoImageUrl => &mut next.logo_image_url,
        ProfileField::Name => &mut next.name,
        ProfileField::Role => &mut next.role,
        ProfileField::Dob => &mut next.dob,
        ProfileField::CurrentWork => &mut next.current_work,
        ProfileField::BioTitle => &mut next.bio_title,
        ProfileField::BioContent => &mut next.bio_content,
        ProfileField::AvatarUrl => &mut next.avatar_url,
    };
    *slot = value.to_string();
    Ok(next)
}

pub fn set_config_field(doc: &ContentDocument, field: ConfigField, value: &str) -> EditResult {
    let mut next = doc.clone();
    match field {
        ConfigField::HeroLayoutSwapped => {
            next.config.hero_layout_swapped = parse_bool(value)?;
            return Ok(next);
        }
        ConfigField::HeroBackgroundText => next.config.hero_background_text = value.to_string(),
        ConfigField::TocTitle => next.config.toc_title = value.to_string(),
        ConfigField::TocSubtitle => next.config.toc_subtitle = value.to_string(),
        ConfigField::WorkTitleMain => next.config.work_title_main = value.to_string(),
        ConfigField::WorkTitleSub => next.config.work_title_sub = value.to_string(),
        ConfigField::WorkDescription => next.config.work_description = value.to_string(),
        ConfigField::QuoteContent => next.config.quote_content = value.to_string(),
        ConfigField::QuoteAuthor => next.config.quote_author = value.to_string(),
        ConfigField::VersionText => next.config.version_text = value.to_string(),
        ConfigField::LabelPortrait => next.config.label_portrait = value.to_string(),
        ConfigField::LabelIntro => next.config.label_intro = value.to_string(),
        ConfigField::LabelHighlights => next.config.label_highlights = value.to_string(),
        ConfigField::LabelQuote => next.config.label_quote = value.to_string(),
    }
    Ok(next)
}

pub fn set_social_field(doc: &ContentDocument, field: SocialField, value: &str) -> EditResult {
    let mut next = doc.clone();
    match field {
        SocialField::Phone => next.social.phone = value.to_string(),
        SocialField::Email => next.social.email = value.to_string(),
        SocialField::Facebook => next.social.facebook = value.to_string(),
        SocialField::Tiktok => next.social.tiktok = value.to_string(),
    }
    Ok(next)
}

fn parse_bool(value: &str) -> Result<bool, Error> {
    match value {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        other => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("`{other}` is not a boolean value"))
            .with_hint("Use true/false.")),
    }
}

// --- highlights ---

pub fn add_highlight(doc: &ContentDocument) -> EditResult {
    let mut next = doc.clone();
    next.highlights
        .push(HighlightEntry::new("New highlight description goes here..."));
    Ok(next)
}

pub fn remove_highlight(doc: &ContentDocument, index: usize) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.highlights.len(), "highlight")?;
    next.highlights.remove(index);
    Ok(next)
}

pub fn move_highlight(doc: &ContentDocument, index: usize, direction: Direction) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.highlights.len(), "highlight")?;
    swap_adjacent(&mut next.highlights, index, direction);
    Ok(next)
}

pub fn set_highlight_text(doc: &ContentDocument, index: usize, value: &str) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.highlights.len(), "highlight")?;
    next.highlights[index].text = value.to_string();
    Ok(next)
}

pub fn set_highlight_url(doc: &ContentDocument, index: usize, value: &str) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.highlights.len(), "highlight")?;
    next.highlights[index].url = value.to_string();
    Ok(next)
}

// --- portfolio ---

/// A fresh id for a new portfolio item: unix milliseconds, suffixed while it
/// collides with an existing id so rapid sequential adds stay distinct.
pub fn next_item_id(doc: &ContentDocument) -> String {
    let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let base = millis.to_string();
    if !doc.portfolio.iter().any(|item| item.id == base) {
        return base;
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !doc.portfolio.iter().any(|item| item.id == candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn add_portfolio_item(doc: &ContentDocument) -> EditResult {
    let mut next = doc.clone();
    let item = PortfolioItem {
        id: next_item_id(doc),
        ..PortfolioItem::default()
    };
    next.portfolio.push(item);
    Ok(next)
}

pub fn remove_portfolio_item(doc: &ContentDocument, index: usize) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.portfolio.len(), "portfolio item")?;
    next.portfolio.remove(index);
    Ok(next)
}

pub fn move_portfolio_item(doc: &ContentDocument, index: usize, direction: Direction) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.portfolio.len(), "portfolio item")?;
    swap_adjacent(&mut next.portfolio, index, direction);
    Ok(next)
}

pub fn set_portfolio_field(
    doc: &ContentDocument,
    index: usize,
    field: PortfolioField,
    value: &str,
) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.portfolio.len(), "portfolio item")?;
    let item = &mut next.portfolio[index];
    match field {
        PortfolioField::Title => item.title = value.to_string(),
        PortfolioField::Description => item.description = value.to_string(),
        PortfolioField::Role => item.role = value.to_string(),
        PortfolioField::ImageUrl => item.image_url = value.to_string(),
        PortfolioField::LogoUrl => item.logo_url = value.to_string(),
        PortfolioField::VideoUrl => item.video_url = value.to_string(),
    }
    Ok(next)
}

// --- gallery (within one portfolio item) ---

pub fn set_gallery_image(
    doc: &ContentDocument,
    item_index: usize,
    image_index: usize,
    url: &str,
) -> EditResult {
    let mut next = doc.clone();
    check_index(item_index, next.portfolio.len(), "portfolio item")?;
    let gallery = &mut next.portfolio[item_index].gallery;
    check_index(image_index, gallery.len(), "gallery image")?;
    gallery[image_index] = url.to_string();
    Ok(next)
}

pub fn add_gallery_image(doc: &ContentDocument, item_index: usize) -> EditResult {
    let mut next = doc.clone();
    check_index(item_index, next.portfolio.len(), "portfolio item")?;
    let gallery = &mut next.portfolio[item_index].gallery;
    if gallery.len() >= GALLERY_CAPACITY {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("gallery already holds {GALLERY_CAPACITY} images"))
            .with_hint("Remove an image before adding another."));
    }
    gallery.push(PLACEHOLDER_IMAGE.to_string());
    Ok(next)
}

pub fn remove_gallery_image(
    doc: &ContentDocument,
    item_index: usize,
    image_index: usize,
) -> EditResult {
    let mut next = doc.clone();
    check_index(item_index, next.portfolio.len(), "portfolio item")?;
    let gallery = &mut next.portfolio[item_index].gallery;
    check_index(image_index, gallery.len(), "gallery image")?;
    gallery.remove(image_index);
    Ok(next)
}

// --- navigation ---

pub fn add_nav_item(doc: &ContentDocument) -> EditResult {
    let mut next = doc.clone();
    next.config.nav_items.push(NavItem::default());
    Ok(next)
}

pub fn remove_nav_item(doc: &ContentDocument, index: usize) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.config.nav_items.len(), "nav item")?;
    next.config.nav_items.remove(index);
    Ok(next)
}

pub fn move_nav_item(doc: &ContentDocument, index: usize, direction: Direction) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.config.nav_items.len(), "nav item")?;
    swap_adjacent(&mut next.config.nav_items, index, direction);
    Ok(next)
}

pub fn set_nav_field(
    doc: &ContentDocument,
    index: usize,
    field: NavField,
    value: &str,
) -> EditResult {
    let mut next = doc.clone();
    check_index(index, next.config.nav_items.len(), "nav item")?;
    match field {
        NavField::Label => next.config.nav_items[index].label = value.to_string(),
        NavField::TargetId => next.config.nav_items[index].target_id = value.to_string(),
    }
    Ok(next)
}

// --- text styles ---

pub fn set_text_style(doc: &ContentDocument, key: &str, patch: &StylePatch) -> EditResult {
    let mut next = doc.clone();
    let merged = next
        .text_styles
        .get(key)
        .unwrap_or(&TextStyle::default())
        .apply(patch);
    if merged.is_empty() {
        next.text_styles.remove(key);
    } else {
        next.text_styles.insert(key.to_string(), merged);
    }
    Ok(next)
}

pub fn clear_text_style(doc: &ContentDocument, key: &str) -> EditResult {
    let mut next = doc.clone();
    next.text_styles.remove(key);
    Ok(next)
}

// --- shared helpers ---

fn check_index(index: usize, len: usize, what: &str) -> Result<(), Error> {
    if index >= len {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("no {what} at index {index}"))
            .with_hint(format!("The list holds {len} entries.")));
    }
    Ok(())
}

fn swap_adjacent<T>(items: &mut [T], index: usize, direction: Direction) {
    match direction {
        Direction::Up if index > 0 => items.swap(index, index - 1),
        Direction::Down if index + 1 < items.len() => items.swap(index, index + 1),
        // At the boundary the move is deliberately a no-op, not an error.
        _ => {}
    }
}
