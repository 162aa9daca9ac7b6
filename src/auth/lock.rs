//! Lock screen: pattern lock over the signed-in session.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::LockConfig;
use crate::core::pattern::Pattern;
use crate::error::{LockError, LockResult};
use crate::recognizer::PatternLock;
use crate::session::{KeyValueStore, Session};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    pub has_pattern: bool,
    pub can_manage: bool,
}

/// Starts locked whenever a pattern is stored. Only the proprietor may set,
/// change or engage the lock; anyone holding the pattern can unlock.
#[derive(Debug, Clone)]
pub struct LockScreen {
    session: Session,
    proprietor_email: String,
    locked: bool,
}

impl LockScreen {
    pub fn new(session: Session, proprietor_email: impl Into<String>) -> Self {
        let locked = session.lock_pattern.is_some();
        Self { session, proprietor_email: proprietor_email.into(), locked }
    }

    pub fn session(&self) -> &Session { &self.session }
    pub fn is_locked(&self) -> bool { self.locked }

    pub fn status(&self) -> LockStatus {
        LockStatus {
            locked: self.locked,
            has_pattern: self.session.lock_pattern.is_some(),
            can_manage: self.can_manage_pattern(),
        }
    }

    /// Signed in (a login date is present) as the proprietor. Callers expire
    /// stale sessions before building the screen.
    pub fn can_manage_pattern(&self) -> bool {
        !self.proprietor_email.is_empty()
            && self.session.login_date.is_some()
            && self
                .session
                .user_email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(&self.proprietor_email))
    }

    fn require_proprietor(&self) -> LockResult<()> {
        if self.can_manage_pattern() {
            Ok(())
        } else {
            Err(LockError::NotProprietor)
        }
    }

    /// Widget for drawing a new pattern.
    pub fn pattern_setter(&self, config: LockConfig) -> LockResult<PatternLock> {
        self.require_proprietor()?;
        PatternLock::set(config)
    }

    /// Store a freshly drawn pattern and persist the session.
    pub fn save_pattern(&mut self, pattern: Pattern, store: &dyn KeyValueStore) -> LockResult<()> {
        self.require_proprietor()?;
        info!(len = pattern.len(), "lock pattern saved");
        self.session.set_lock_pattern(pattern);
        self.session.save(store)
    }

    /// Engage the lock. Returns false when there is no pattern to unlock with.
    pub fn lock(&mut self) -> LockResult<bool> {
        self.require_proprietor()?;
        if self.session.lock_pattern.is_none() {
            return Ok(false);
        }
        self.locked = true;
        info!("screen locked");
        Ok(true)
    }

    /// Widget that verifies against the stored pattern.
    pub fn unlocker(&self, config: LockConfig) -> LockResult<PatternLock> {
        let stored = self.session.lock_pattern.clone().ok_or(LockError::NoLockPattern)?;
        PatternLock::verify(config, stored)
    }

    /// Unlock with a pattern the unlocker accepted.
    pub fn unlock(&mut self, pattern: &Pattern) -> bool {
        match &self.session.lock_pattern {
            Some(stored) if stored.matches(pattern.ids()) => {
                self.locked = false;
                info!("screen unlocked");
                true
            }
            _ => {
                warn!("unlock refused");
                false
            }
        }
    }
}
