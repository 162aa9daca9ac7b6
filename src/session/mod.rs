//! Session: who is signed in, since when, and the stored lock pattern.
//!
//! An explicit context object loaded from and saved to a [`KeyValueStore`].
//! Hosts load it once at startup and hand it to the lock screen and the
//! login flow; nothing else reads the store behind their back.
//!
//! | Key | Value |
//! |-----|-------|
//! | `loginDate` | `YYYY-MM-DD` (UTC) of the last OTP login |
//! | `userEmail` | email the OTP was sent to |
//! | `lockPattern` | JSON array of node ids |
//!
//! A session is only valid on the day it was created. Logout and daily
//! expiry clear the login fields but keep the lock pattern.

mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::constants::keys;
use crate::core::pattern::Pattern;
use crate::error::LockResult;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub login_date: Option<NaiveDate>,
    pub user_email: Option<String>,
    pub lock_pattern: Option<Pattern>,
}

impl Session {
    /// Read all session keys. Unparseable values are logged and treated as
    /// absent.
    pub fn load(store: &dyn KeyValueStore) -> LockResult<Self> {
        let login_date = store.get(keys::LOGIN_DATE)?.and_then(|raw| {
            NaiveDate::parse_from_str(&raw, DATE_FORMAT)
                .map_err(|e| warn!(value = %raw, error = %e, "ignoring bad login date"))
                .ok()
        });
        let user_email = store.get(keys::USER_EMAIL)?.filter(|e| !e.is_empty());
        let lock_pattern = store.get(keys::LOCK_PATTERN)?.and_then(|raw| {
            serde_json::from_str::<Pattern>(&raw)
                .map_err(|e| warn!(error = %e, "ignoring bad lock pattern"))
                .ok()
        });
        debug!(logged_in = login_date.is_some(), has_pattern = lock_pattern.is_some(), "session loaded");
        Ok(Self { login_date, user_email, lock_pattern })
    }

    /// Load, expire a login not made on `today`, and persist the expiry.
    pub fn load_for_day(store: &dyn KeyValueStore, today: NaiveDate) -> LockResult<Self> {
        let mut session = Self::load(store)?;
        if session.expire_if_stale(today) {
            session.save(store)?;
        }
        Ok(session)
    }

    /// Write every field in one store change; `None` removes the key.
    pub fn save(&self, store: &dyn KeyValueStore) -> LockResult<()> {
        let date = self.login_date.map(|d| d.format(DATE_FORMAT).to_string());
        let pattern = self.lock_pattern.as_ref().map(serde_json::to_string).transpose()?;
        store.apply(&[
            (keys::LOGIN_DATE, date.as_deref()),
            (keys::USER_EMAIL, self.user_email.as_deref()),
            (keys::LOCK_PATTERN, pattern.as_deref()),
        ])
    }

    pub fn record_login(&mut self, email: impl Into<String>, today: NaiveDate) {
        let email = email.into();
        info!(email = %email, date = %today, "login recorded");
        self.user_email = Some(email);
        self.login_date = Some(today);
    }

    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.login_date == Some(today)
    }

    /// Drop the login if it was not made `today`, including an email left
    /// behind without a date. Returns true when a field was cleared.
    pub fn expire_if_stale(&mut self, today: NaiveDate) -> bool {
        if self.is_active_on(today) || (self.login_date.is_none() && self.user_email.is_none()) {
            return false;
        }
        info!(last_login = ?self.login_date, "session expired");
        self.logout();
        true
    }

    pub fn logout(&mut self) {
        self.login_date = None;
        self.user_email = None;
    }

    pub fn set_lock_pattern(&mut self, pattern: Pattern) {
        self.lock_pattern = Some(pattern);
    }
}

/// Today's date in UTC, the calendar the login date is kept in.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
