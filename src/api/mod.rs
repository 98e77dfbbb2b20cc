//! Purpose: Define the stable public Rust API boundary for vitrine.
//! Exports: Document model, persistence gateway, and editing primitives.
//! Role: Public surface for the CLI, the server, and integration tests.
//! Invariants: This module is the only public path to the persistence tiers.
//! Invariants: Internal core modules are re-exported selectively, not wholesale.

pub mod cache;
pub mod gateway;
pub mod remote;
pub mod settings;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};

pub use crate::core::document::{
    built_in_defaults, ContentDocument, HighlightEntry, NavItem, PortfolioItem, SiteConfig,
    SocialLinks, FALLBACK_IMAGE, GALLERY_CAPACITY, PLACEHOLDER_IMAGE,
};
pub use crate::core::edit::{
    self, ConfigField, Direction, NavField, PortfolioField, ProfileField, SocialField,
};
pub use crate::core::fields::{
    image_view, pick_image, text_view, upload_image, AssetBackend, FieldMode, FieldView,
    ImageView, PopoverState, StyledTextField,
};
pub use crate::core::migrate::{migrate, parse_and_migrate};
pub use crate::core::session::{AdminGate, EditSession, SaveGuard};
pub use crate::core::style::{FontFamily, FontWeight, StylePatch, TextAlign, TextStyle};

pub use cache::LocalCache;
pub use gateway::{Gateway, LoadSource, Loaded, RemoteSaveState, SaveOutcome};
pub use remote::{AssetInfo, RemoteClient, RemoteSite, SaveReceipt};
pub use settings::{RemoteTarget, Settings, DEFAULT_SITE, PLACEHOLDER_REMOTE_URL};
