//! Recognizer: pointer-driven state machine over a [`Grid`]
//!
//! # States
//!
//! ```text
//!            pointer down (in bounds)
//!   Idle ───────────────────────────────▶ Dragging ◀──┐ pointer move
//!    ▲                                      │   └──────┘ (append unvisited hits)
//!    │                                      │ up / cancel / leave
//!    │  too short: immediate                ▼
//!    ├──────────────────────────────── release ─┬─ verify ok: callback, immediate
//!    │                                          ├─ verify mismatch ─▶ Settled(Error)
//!    │                                          └─ set: callback ───▶ Settled(Success)
//!    │                                                                    │
//!    └─────────────── poll(now) past deadline, or next pointer down ◀─────┘
//! ```
//!
//! The recognizer owns no timers. A settled widget records the instant its
//! reset is due; the host calls [`PatternLock::poll`] from its frame loop (or
//! uses [`LockService`], which sleeps until [`PatternLock::next_deadline`]).
//! A pointer down during the delay cancels the pending reset before the new
//! drag starts, so a stale reset can never clear a drag in progress.
//!
//! # Example
//!
//! ```
//! use patternlock::{LockConfig, PatternLock, Point, Release};
//! use std::time::Instant;
//!
//! let mut lock = PatternLock::set(LockConfig::default()).unwrap();
//! let centre = |id| lock.grid().center(id).unwrap();
//! let path: Vec<Point> = [0, 1, 2, 4].into_iter().map(centre).collect();
//!
//! lock.pointer_down(path[0]);
//! for p in &path[1..] {
//!     lock.pointer_move(*p);
//! }
//! match lock.pointer_up(Instant::now()) {
//!     Release::Accepted(pattern) => assert_eq!(pattern.ids(), &[0, 1, 2, 4]),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

#[cfg(feature = "native")]
mod service;

#[cfg(feature = "native")]
pub use service::LockService;

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::LockConfig;
use crate::core::constants::pattern::MIN_NODES;
use crate::core::grid::{Grid, NodeId, Point, Segment};
use crate::core::pattern::Pattern;
use crate::error::{LockError, LockResult};

/// What a release is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Any long-enough drag is accepted; the caller stores it.
    Set,
    /// The drag must equal the stored pattern, in order.
    Verify(Pattern),
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Set => "set",
            Mode::Verify(_) => "verify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Settled(Settle),
}

/// Result of releasing the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// No drag was in progress.
    NotDragging,
    /// Fewer nodes than the configured minimum. `warn` is set in set mode,
    /// where the user should be told the pattern is too short.
    TooShort { len: usize, warn: bool },
    /// The completion callback fired with this pattern.
    Accepted(Pattern),
    /// Verify mode only: the drag differs from the stored pattern.
    Mismatch,
}

/// Input from the host's pointer or touch handlers, in widget-local
/// coordinates. Serialized as `{"type":"down","x":12,"y":12}`, `{"type":"up"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up,
    Cancel,
    Leave,
}

type CompleteFn = dyn FnMut(&Pattern) + Send;

/// Pattern lock widget state, one per rendered grid.
pub struct PatternLock {
    grid: Grid,
    config: LockConfig,
    mode: Mode,
    phase: Phase,
    trace: Vec<NodeId>,
    segments: Vec<Segment>,
    pointer: Option<Point>,
    reset_at: Option<Instant>,
    on_complete: Option<Box<CompleteFn>>,
}

impl std::fmt::Debug for PatternLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternLock")
            .field("mode", &self.mode.as_str())
            .field("phase", &self.phase)
            .field("trace", &self.trace)
            .field("reset_at", &self.reset_at)
            .finish()
    }
}

impl PatternLock {
    pub fn new(config: LockConfig, mode: Mode) -> LockResult<Self> {
        // stored patterns are reloaded with the fixed floor, so a lower
        // minimum would emit patterns that cannot survive a restart
        if config.min_nodes < MIN_NODES {
            return Err(LockError::InvalidPattern(format!(
                "minimum length {} is below {MIN_NODES}",
                config.min_nodes
            )));
        }
        let grid = config.build_grid()?;
        if let Mode::Verify(stored) = &mode {
            stored.check_grid(&grid)?;
            if stored.len() < config.min_nodes {
                return Err(LockError::InvalidPattern(format!(
                    "stored pattern has {} nodes, minimum is {}",
                    stored.len(),
                    config.min_nodes
                )));
            }
        }
        Ok(Self {
            grid,
            config,
            mode,
            phase: Phase::Idle,
            trace: Vec::new(),
            segments: Vec::new(),
            pointer: None,
            reset_at: None,
            on_complete: None,
        })
    }

    pub fn set(config: LockConfig) -> LockResult<Self> {
        Self::new(config, Mode::Set)
    }

    pub fn verify(config: LockConfig, stored: Pattern) -> LockResult<Self> {
        Self::new(config, Mode::Verify(stored))
    }

    /// Callback invoked at most once per drag with the accepted pattern.
    pub fn on_complete(mut self, f: impl FnMut(&Pattern) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    // =========================================================================
    // Pointer events
    // =========================================================================

    /// Start a drag. Returns false when the point is outside the widget.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if !self.grid.contains(point) {
            return false;
        }
        if self.reset_at.is_some() {
            debug!(phase = ?self.phase, "pending reset cancelled by new drag");
        }
        self.clear();
        self.phase = Phase::Dragging;
        self.pointer = Some(point);
        if let Some(node) = self.grid.hit(point) {
            self.trace.push(node.id);
        }
        debug!(start = ?self.trace.first(), "drag started");
        true
    }

    /// Track the pointer; returns the node appended by this move, if any.
    pub fn pointer_move(&mut self, point: Point) -> Option<NodeId> {
        if self.phase != Phase::Dragging {
            return None;
        }
        self.pointer = Some(point);
        let node = *self.grid.hit(point)?;
        if self.trace.contains(&node.id) {
            return None;
        }
        if let Some(prev) = self.trace.last().and_then(|id| self.grid.center(*id)) {
            self.segments.push(Segment { from: prev, to: node.center });
        }
        self.trace.push(node.id);
        debug!(node = node.id, len = self.trace.len(), "node visited");
        Some(node.id)
    }

    pub fn pointer_up(&mut self, now: Instant) -> Release {
        self.release(now)
    }

    pub fn pointer_cancel(&mut self, now: Instant) -> Release {
        self.release(now)
    }

    /// Pointer left the widget bounds; ends the drag like a release.
    pub fn pointer_leave(&mut self, now: Instant) -> Release {
        self.release(now)
    }

    /// Dispatch one event. Returns the release outcome for up/cancel/leave.
    pub fn handle(&mut self, event: PointerEvent, now: Instant) -> Option<Release> {
        match event {
            PointerEvent::Down(p) => {
                self.pointer_down(p);
                None
            }
            PointerEvent::Move(p) => {
                self.pointer_move(p);
                None
            }
            PointerEvent::Up => Some(self.pointer_up(now)),
            PointerEvent::Cancel => Some(self.pointer_cancel(now)),
            PointerEvent::Leave => Some(self.pointer_leave(now)),
        }
    }

    fn release(&mut self, now: Instant) -> Release {
        if self.phase != Phase::Dragging {
            return Release::NotDragging;
        }
        self.pointer = None;

        let len = self.trace.len();
        if len < self.config.min_nodes {
            let warn = matches!(self.mode, Mode::Set);
            if warn {
                warn!(len, min = self.config.min_nodes, "pattern too short");
            } else {
                debug!(len, "short drag discarded");
            }
            self.clear();
            return Release::TooShort { len, warn };
        }

        let verdict = match &self.mode {
            Mode::Verify(stored) => Some(stored.matches(&self.trace)),
            Mode::Set => None,
        };
        match verdict {
            Some(true) => {
                let pattern = Pattern::from_trace(std::mem::take(&mut self.trace));
                self.complete(&pattern);
                self.clear();
                Release::Accepted(pattern)
            }
            Some(false) => {
                warn!(len, "pattern mismatch");
                self.settle(Settle::Error, now + self.config.error_delay);
                Release::Mismatch
            }
            None => {
                let pattern = Pattern::from_trace(self.trace.clone());
                self.complete(&pattern);
                self.settle(Settle::Success, now + self.config.success_delay);
                Release::Accepted(pattern)
            }
        }
    }

    fn complete(&mut self, pattern: &Pattern) {
        debug!(mode = self.mode.as_str(), len = pattern.len(), "pattern complete");
        if let Some(cb) = self.on_complete.as_mut() {
            cb(pattern);
        }
    }

    fn settle(&mut self, settle: Settle, at: Instant) {
        self.phase = Phase::Settled(settle);
        self.reset_at = Some(at);
    }

    // =========================================================================
    // Scheduled reset
    // =========================================================================

    /// Apply the pending reset if it is due. Returns true when it fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.reset_at {
            Some(at) if now >= at => {
                debug!(phase = ?self.phase, "auto reset");
                self.clear();
                true
            }
            _ => false,
        }
    }

    /// When the pending reset is due, if one is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.reset_at
    }

    /// Back to Idle, dropping every piece of drag and display state.
    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.phase = Phase::Idle;
        self.trace.clear();
        self.segments.clear();
        self.pointer = None;
        self.reset_at = None;
    }

    // =========================================================================
    // Rendering state
    // =========================================================================

    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn config(&self) -> &LockConfig { &self.config }
    pub fn mode(&self) -> &Mode { &self.mode }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn trace(&self) -> &[NodeId] { &self.trace }
    pub fn segments(&self) -> &[Segment] { &self.segments }
    pub fn pointer(&self) -> Option<Point> { self.pointer }
    pub fn is_dragging(&self) -> bool { self.phase == Phase::Dragging }
    pub fn is_error(&self) -> bool { self.phase == Phase::Settled(Settle::Error) }
    pub fn is_visited(&self, id: NodeId) -> bool { self.trace.contains(&id) }

    /// Line from the last committed node to the live pointer while dragging.
    pub fn rubber_band(&self) -> Option<Segment> {
        if !self.is_dragging() {
            return None;
        }
        let from = self.trace.last().and_then(|id| self.grid.center(*id))?;
        Some(Segment { from, to: self.pointer? })
    }
}
