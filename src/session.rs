//! Process-wide audio unlock flag
//!
//! Browsers only allow sound after a user gesture, and that permission
//! lasts for the page session. The flag is shared by cloning the handle:
//! the round controller and the host shell both hold one.

use std::cell::Cell;
use std::rc::Rc;

/// Shared "audio has been unlocked this session" flag
#[derive(Debug, Clone, Default)]
pub struct AudioSession {
    unlocked: Rc<Cell<bool>>,
}

impl AudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose audio was unlocked earlier (e.g. by a splash screen)
    pub fn unlocked() -> Self {
        let session = Self::new();
        session.set_unlocked(true);
        session
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.get()
    }

    /// The only writer
    pub fn set_unlocked(&self, unlocked: bool) {
        if self.unlocked.replace(unlocked) != unlocked {
            log::info!("Audio session unlocked: {unlocked}");
        }
    }
}
