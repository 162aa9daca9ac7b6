//! Configuration - passed in by the host application

use std::time::Duration;

use crate::core::constants::{grid, pattern, timing};
use crate::core::grid::Grid;
use crate::error::LockResult;

/// Lock widget configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LockConfig {
    /// Nodes per row/column
    pub grid_size: usize,
    /// Drawn node diameter in logical pixels
    pub dot_size: f64,
    /// Gap between neighbouring nodes in logical pixels
    pub grid_gap: f64,
    /// Shortest accepted drag
    pub min_nodes: usize,
    /// How long a failed verification stays highlighted
    pub error_delay: Duration,
    /// How long a freshly set pattern stays on screen
    pub success_delay: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            grid_size: grid::SIZE,
            dot_size: grid::DOT_SIZE,
            grid_gap: grid::GAP,
            min_nodes: pattern::MIN_NODES,
            error_delay: Duration::from_millis(timing::ERROR_DELAY_MS),
            success_delay: Duration::from_millis(timing::SUCCESS_DELAY_MS),
        }
    }
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same geometry, near-zero delays (for tests and scripted replays)
    pub fn fast_test() -> Self {
        Self {
            error_delay: Duration::from_millis(10),
            success_delay: Duration::from_millis(5),
            ..Self::default()
        }
    }

    pub fn with_grid(mut self, size: usize, dot_size: f64, gap: f64) -> Self {
        self.grid_size = size;
        self.dot_size = dot_size;
        self.grid_gap = gap;
        self
    }

    pub fn with_min_nodes(mut self, min: usize) -> Self {
        self.min_nodes = min;
        self
    }

    pub fn with_delays(mut self, error: Duration, success: Duration) -> Self {
        self.error_delay = error;
        self.success_delay = success;
        self
    }

    pub fn build_grid(&self) -> LockResult<Grid> {
        Grid::new(self.grid_size, self.dot_size, self.grid_gap)
    }
}

/// Application-level settings: where local state lives and who the
/// proprietor is.
#[cfg(feature = "native")]
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub app: String,
    pub root: Option<std::path::PathBuf>,
    pub proprietor_email: String,
    pub lock: LockConfig,
}

#[cfg(feature = "native")]
impl AppConfig {
    pub const DEFAULT_APP: &'static str = "patternlock";

    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }

    /// Read `PATTERNLOCK_APP`, `PATTERNLOCK_ROOT` and `PATTERNLOCK_PROPRIETOR`.
    pub fn from_env() -> Self {
        use crate::core::constants::env;

        let app = std::env::var(env::APP).unwrap_or_else(|_| Self::DEFAULT_APP.into());
        let root = std::env::var(env::ROOT).ok().map(std::path::PathBuf::from);
        let proprietor_email = std::env::var(env::PROPRIETOR).unwrap_or_default();
        Self { app, root, proprietor_email, lock: LockConfig::default() }
    }

    pub fn with_root(mut self, root: impl Into<std::path::PathBuf>) -> Self { self.root = Some(root.into()); self }
    pub fn with_proprietor(mut self, email: impl Into<String>) -> Self { self.proprietor_email = email.into(); self }

    /// `<root>/<app>/data`, where `root` falls back to the platform's local
    /// data directory.
    pub fn data_dir(&self) -> std::path::PathBuf {
        let root = self.root.clone().unwrap_or_else(|| {
            dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."))
        });
        root.join(&self.app).join("data")
    }
}
