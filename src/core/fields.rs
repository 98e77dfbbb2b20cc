//! Purpose: Editable field primitives shared by every editing surface.
//! Exports: `FieldMode`, `FieldView`, `ImageView`, image/gallery helpers, `StyledTextField`.
//! Role: One admin-mode flag decides Display vs Editor for every field at once.
//! Invariants: A field value only changes after a confirmed backend success.
//! Invariants: The style popover is reachable from editing mode only.

use crate::core::document::{ContentDocument, FALLBACK_IMAGE};
use crate::core::edit::{set_text_style, EditResult};
use crate::core::error::{Error, ErrorKind};
use crate::core::style::StylePatch;

/// Page-level mode; all fields flip together.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldMode {
    Display,
    Editing,
}

impl FieldMode {
    pub fn from_admin(admin: bool) -> Self {
        if admin {
            FieldMode::Editing
        } else {
            FieldMode::Display
        }
    }
}

/// How a text value presents under the current mode. The editor variant is
/// the only one an update may flow through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldView<'a> {
    Display(&'a str),
    Editor(&'a str),
}

pub fn text_view(mode: FieldMode, value: &str) -> FieldView<'_> {
    match mode {
        FieldMode::Display => FieldView::Display(value),
        FieldMode::Editing => FieldView::Editor(value),
    }
}

/// Image presentation. Display mode carries the fallback shown when the
/// underlying resource fails to load.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImageView<'a> {
    Display {
        src: &'a str,
        fallback: &'static str,
    },
    Editor {
        src: &'a str,
    },
}

pub fn image_view(mode: FieldMode, src: &str) -> ImageView<'_> {
    match mode {
        FieldMode::Display => ImageView::Display {
            src,
            fallback: FALLBACK_IMAGE,
        },
        FieldMode::Editing => ImageView::Editor { src },
    }
}

/// The blob-store operations image fields need. Implemented by the
/// persistence gateway; kept as a trait so field logic stays testable
/// without a network.
pub trait AssetBackend {
    fn upload_asset(&self, bytes: &[u8], name: &str) -> Result<String, Error>;
    fn list_assets(&self) -> Result<Vec<String>, Error>;
}

/// Upload a new image and return its confirmed URL. The caller only writes
/// the URL into the document after this returns `Ok`, so a failed upload
/// never corrupts in-memory state.
pub fn upload_image(
    backend: &dyn AssetBackend,
    mode: FieldMode,
    bytes: &[u8],
    name: &str,
) -> Result<String, Error> {
    require_editing(mode)?;
    backend.upload_asset(bytes, name)
}

/// Pick a previously uploaded image from the asset library by position in
/// the newest-first listing.
pub fn pick_image(
    backend: &dyn AssetBackend,
    mode: FieldMode,
    index: usize,
) -> Result<String, Error> {
    require_editing(mode)?;
    let assets = backend.list_assets()?;
    assets.get(index).cloned().ok_or_else(|| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("no stored asset at index {index}"))
            .with_hint(format!("The library holds {} assets.", assets.len()))
    })
}

fn require_editing(mode: FieldMode) -> Result<(), Error> {
    if mode == FieldMode::Editing {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Permission)
        .with_message("field is display-only outside admin mode")
        .with_hint("Unlock admin mode first."))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PopoverState {
    Closed,
    Open,
}

/// A text field with an attached style override, addressed by a stable key
/// the presentation layer chooses. The popover holds its own open/closed
/// state; selecting a property keeps it open, only `close` closes it.
#[derive(Clone, Debug)]
pub struct StyledTextField {
    key: String,
    popover: PopoverState,
}

impl StyledTextField {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            popover: PopoverState::Closed,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn popover(&self) -> PopoverState {
        self.popover
    }

    pub fn open_popover(&mut self, mode: FieldMode) -> Result<(), Error> {
        require_editing(mode)?;
        self.popover = PopoverState::Open;
        Ok(())
    }

    pub fn close_popover(&mut self) {
        self.popover = PopoverState::Closed;
    }

    /// Merge a style patch into this field's override. Only legal while the
    /// popover is open; the merge itself is the shallow-merge contract of
    /// `TextStyle::apply`.
    pub fn apply_style(&self, doc: &ContentDocument, patch: &StylePatch) -> EditResult {
        if self.popover != PopoverState::Open {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("style popover is not open")
                .with_hint("Open the style popover before changing styles."));
        }
        set_text_style(doc, &self.key, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::document::built_in_defaults;
    use std::cell::RefCell;

    struct FakeBackend {
        assets: Vec<String>,
        fail_upload: bool,
        uploads: RefCell<Vec<String>>,
    }

    impl FakeBackend {
        fn new(assets: &[&str]) -> Self {
            Self {
                assets: assets.iter().map(|s| s.to_string()).collect(),
                fail_upload: false,
                uploads: RefCell::new(Vec::new()),
            }
        }
    }

    impl AssetBackend for FakeBackend {
        fn upload_asset(&self, _bytes: &[u8], name: &str) -> Result<String, Error> {
            if self.fail_upload {
                return Err(Error::new(ErrorKind::Permission).with_message("denied"));
            }
            let url = format!("https://assets.test/{name}");
            self.uploads.borrow_mut().push(url.clone());
            Ok(url)
        }

        fn list_assets(&self) -> Result<Vec<String>, Error> {
            Ok(self.assets.clone())
        }
    }

    #[test]
    fn mode_selects_the_view_variant_once() {
        assert_eq!(
            text_view(FieldMode::from_admin(false), "hi"),
            FieldView::Display("hi")
        );
        assert_eq!(
            text_view(FieldMode::from_admin(true), "hi"),
            FieldView::Editor("hi")
        );
    }

    #[test]
    fn display_image_carries_a_fallback() {
        match image_view(FieldMode::Display, "https://x/y.png") {
            ImageView::Display { src, fallback } => {
                assert_eq!(src, "https://x/y.png");
                assert!(!fallback.is_empty());
            }
            ImageView::Editor { .. } => panic!("expected display view"),
        }
    }

    #[test]
    fn upload_requires_editing_mode() {
        let backend = FakeBackend::new(&[]);
        let err = upload_image(&backend, FieldMode::Display, b"png", "a.png").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(backend.uploads.borrow().is_empty());
    }

    #[test]
    fn failed_upload_returns_no_url() {
        let mut backend = FakeBackend::new(&[]);
        backend.fail_upload = true;
        let err = upload_image(&backend, FieldMode::Editing, b"png", "a.png").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn pick_resolves_by_listing_position() {
        let backend = FakeBackend::new(&["https://a/1", "https://a/2"]);
        let url = pick_image(&backend, FieldMode::Editing, 1).expect("pick");
        assert_eq!(url, "https://a/2");
        let err = pick_image(&backend, FieldMode::Editing, 5).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn popover_opens_only_in_editing_mode() {
        let mut field = StyledTextField::new("hero");
        let err = field.open_popover(FieldMode::Display).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(field.popover(), PopoverState::Closed);

        field.open_popover(FieldMode::Editing).expect("open");
        assert_eq!(field.popover(), PopoverState::Open);
    }

    #[test]
    fn popover_stays_open_across_style_changes() {
        let doc = built_in_defaults();
        let mut field = StyledTextField::new("hero");
        field.open_popover(FieldMode::Editing).expect("open");

        let patch = StylePatch {
            color: Some("#fff".to_string()),
            ..StylePatch::default()
        };
        let doc = field.apply_style(&doc, &patch).expect("style");
        assert_eq!(field.popover(), PopoverState::Open);
        assert!(doc.text_styles.contains_key("hero"));

        field.close_popover();
        let err = field.apply_style(&doc, &patch).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
