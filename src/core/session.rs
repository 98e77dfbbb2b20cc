//! Purpose: Admin gate and per-session edit state around one document.
//! Exports: `AdminGate`, `EditSession`, `SaveGuard`.
//! Role: Owns the single in-memory document and the page-level admin flag.
//! Invariants: The gate is a convenience, not a security boundary.
//! Invariants: At most one save may be in flight per session.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::document::ContentDocument;
use crate::core::error::{Error, ErrorKind};
use crate::core::fields::FieldMode;

/// Client-side shared-secret comparison. The secret and the document are
/// both visible to any client; this only keeps honest visitors out of the
/// editing chrome.
#[derive(Clone, Debug)]
pub struct AdminGate {
    secret: Option<String>,
}

impl AdminGate {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// An unset secret leaves the gate open, which is the local-development
    /// posture. A set secret must match exactly.
    pub fn unlock(&self, input: &str) -> Result<(), Error> {
        match &self.secret {
            None => Ok(()),
            Some(secret) if secret == input => Ok(()),
            Some(_) => Err(Error::new(ErrorKind::Permission)
                .with_message("wrong password")
                .with_hint("The admin secret lives in settings.json.")),
        }
    }

    pub fn requires_password(&self) -> bool {
        self.secret.is_some()
    }
}

/// One editing session: the current document plus the admin flag that all
/// field primitives derive their mode from.
pub struct EditSession {
    document: ContentDocument,
    admin: bool,
    saving: Rc<Cell<bool>>,
}

impl EditSession {
    pub fn new(document: ContentDocument, admin: bool) -> Self {
        Self {
            document,
            admin,
            saving: Rc::new(Cell::new(false)),
        }
    }

    pub fn document(&self) -> &ContentDocument {
        &self.document
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn field_mode(&self) -> FieldMode {
        FieldMode::from_admin(self.admin)
    }

    /// Replace the session document with the result of an edit operation.
    /// Rejected outside admin mode so display surfaces cannot mutate.
    pub fn commit(&mut self, next: ContentDocument) -> Result<(), Error> {
        if !self.admin {
            return Err(Error::new(ErrorKind::Permission)
                .with_message("editing requires admin mode")
                .with_hint("Run `vitrine admin unlock` first."));
        }
        self.document = next;
        Ok(())
    }

    /// Take the in-flight save slot. Dropping the guard frees it. A second
    /// call while a save is running is refused; surfaces use this to show
    /// their busy/disabled state instead of racing remote writes.
    pub fn begin_save(&self) -> Result<SaveGuard, Error> {
        if self.saving.get() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("a save is already in flight")
                .with_hint("Wait for the running save to finish."));
        }
        self.saving.set(true);
        Ok(SaveGuard {
            flag: Rc::clone(&self.saving),
        })
    }

    pub fn save_in_flight(&self) -> bool {
        self.saving.get()
    }
}

#[derive(Debug)]
pub struct SaveGuard {
    flag: Rc<Cell<bool>>,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::{AdminGate, EditSession};
    use crate::core::document::built_in_defaults;
    use crate::core::edit::{set_profile_field, ProfileField};
    use crate::core::error::ErrorKind;
    use crate::core::fields::FieldMode;

    #[test]
    fn gate_without_secret_is_open() {
        let gate = AdminGate::new(None);
        assert!(!gate.requires_password());
        gate.unlock("anything").expect("open gate");
    }

    #[test]
    fn gate_with_secret_compares_exactly() {
        let gate = AdminGate::new(Some("letmein".to_string()));
        gate.unlock("letmein").expect("match");
        let err = gate.unlock("letmeout").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn commit_requires_admin() {
        let doc = built_in_defaults();
        let next = set_profile_field(&doc, ProfileField::Name, "Riley").expect("edit");

        let mut viewer = EditSession::new(doc.clone(), false);
        assert_eq!(viewer.field_mode(), FieldMode::Display);
        let err = viewer.commit(next.clone()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(viewer.document(), &doc);

        let mut editor = EditSession::new(doc, true);
        editor.commit(next).expect("commit");
        assert_eq!(editor.document().name, "Riley");
    }

    #[test]
    fn only_one_save_guard_at_a_time() {
        let session = EditSession::new(built_in_defaults(), true);
        let guard = session.begin_save().expect("first guard");
        assert!(session.save_in_flight());
        let err = session.begin_save().expect_err("second guard");
        assert_eq!(err.kind(), ErrorKind::Usage);
        drop(guard);
        assert!(!session.save_in_flight());
        session.begin_save().expect("slot freed");
    }
}
