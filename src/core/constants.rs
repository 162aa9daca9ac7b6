//! Constants for the lock widget, its timings and the session store.
//!
//! Geometry values are logical pixels. Callers rendering on dense screens
//! scale them before building a [`crate::core::grid::Grid`].

/// Grid geometry
pub mod grid {
    /// Nodes per row and per column.
    pub const SIZE: usize = 3;
    /// Drawn diameter of one node. The hit radius is half of this.
    pub const DOT_SIZE: f64 = 24.0;
    /// Gap between the edges of two neighbouring nodes.
    pub const GAP: f64 = 48.0;
    /// Largest grid whose node ids still fit in a `u8`.
    pub const MAX_SIZE: usize = 15;
}

/// Pattern rules
pub mod pattern {
    /// Shortest drag that is accepted on release.
    pub const MIN_NODES: usize = 4;
}

/// Auto-reset delays after a drag settles
pub mod timing {
    /// Error highlight shown after a failed verification.
    pub const ERROR_DELAY_MS: u64 = 800;
    /// Confirmation shown after a pattern is set.
    pub const SUCCESS_DELAY_MS: u64 = 500;
}

/// Keys in the local key-value store
pub mod keys {
    pub const LOGIN_DATE: &str = "loginDate";
    pub const USER_EMAIL: &str = "userEmail";
    pub const LOCK_PATTERN: &str = "lockPattern";

    pub const ALL: &[&str] = &[LOGIN_DATE, USER_EMAIL, LOCK_PATTERN];
}

/// Login rules
pub mod login {
    /// Number of digits in a one-time code.
    pub const OTP_DIGITS: usize = 6;
    pub const OTP_MIN: u32 = 100_000;
    pub const OTP_MAX: u32 = 999_999;
}

/// Environment variables read by [`crate::config::AppConfig::from_env`]
pub mod env {
    pub const ROOT: &str = "PATTERNLOCK_ROOT";
    pub const PROPRIETOR: &str = "PATTERNLOCK_PROPRIETOR";
    pub const APP: &str = "PATTERNLOCK_APP";
    pub const LOG_JSON: &str = "PATTERNLOCK_LOG_JSON";
}
