//! Patternlock: lock and login core for the shop's back-office terminal.
//!
//! # Architecture
//!
//! ```text
//! host UI (pointer / touch events)
//!   │
//!   ▼
//! PatternLock (recognizer)          LockService (tokio task, optional)
//!   ├── Grid (N×N nodes, hit-test)    └── drives PatternLock from a channel
//!   └── completion callback ──────┐
//!                                 ▼
//! LockScreen ── Session ── KeyValueStore (FileStore / MemoryStore)
//!                  ▲
//! LoginFlow ───────┘  (OTP via Mailer)
//! ```
//!
//! # Features
//!
//! - `native` (default) - tokio service, OTP login, file paths from `dirs`,
//!   `tracing-subscriber` setup, and the `patternlock` CLI
//!
//! # Usage
//!
//! ```ignore
//! use patternlock::{FileStore, LockConfig, LockScreen, Release, Session};
//!
//! let store = FileStore::in_dir("/var/lib/shop");
//! let mut screen = LockScreen::new(Session::load(&store)?, "owner@example.com");
//!
//! if screen.is_locked() {
//!     let mut widget = screen.unlocker(LockConfig::default())?;
//!     // feed pointer events ...
//!     if let Release::Accepted(pattern) = widget.pointer_up(now) {
//!         screen.unlock(&pattern);
//!     }
//! }
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod auth;
pub mod config;
pub mod core;
pub mod error;
pub mod recognizer;
pub mod session;

// =============================================================================
// Native-only modules
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;
#[cfg(feature = "native")]
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================
pub use auth::{LockScreen, LockStatus};
pub use config::LockConfig;
pub use crate::core::grid::{Grid, Node, NodeId, Point, Segment};
pub use crate::core::pattern::Pattern;
pub use error::{LockError, LockResult};
pub use recognizer::{Mode, PatternLock, Phase, PointerEvent, Release, Settle};
pub use session::{FileStore, KeyValueStore, MemoryStore, Session};

#[cfg(feature = "native")]
pub use auth::{LogMailer, LoginFlow, LoginStep, Mailer, OtpCode, Role, Signatory};
#[cfg(feature = "native")]
pub use config::AppConfig;
#[cfg(feature = "native")]
pub use recognizer::LockService;
#[cfg(feature = "native")]
pub use runtime::{shutdown_on_ctrl_c, Shutdown};
