//! Grid: fixed N×N arrangement of circular targets and pointer hit-testing.
//!
//! Node `i` sits at row `i / N`, column `i % N`. Its centre is
//!
//! ```text
//! x = col * (dot + gap) + dot / 2
//! y = row * (dot + gap) + dot / 2
//! ```
//!
//! Hit-testing is a linear scan over all N² nodes per pointer event. At the
//! sizes the widget targets (3×3) this is nine distance checks.

use serde::{Deserialize, Serialize};

use crate::core::constants::grid as defaults;
use crate::error::{LockError, LockResult};

/// Node identifier, row-major index into the grid.
pub type NodeId = u8;

/// Widget-local coordinate in logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub center: Point,
}

/// Line between two committed node centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Immutable set of nodes, built once per widget.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    dot_size: f64,
    gap: f64,
    nodes: Vec<Node>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::build(defaults::SIZE, defaults::DOT_SIZE, defaults::GAP)
    }
}

impl Grid {
    /// Build a `size`×`size` grid.
    pub fn new(size: usize, dot_size: f64, gap: f64) -> LockResult<Self> {
        if size == 0 || size > defaults::MAX_SIZE {
            return Err(LockError::InvalidGrid(format!(
                "size must be between 1 and {}, got {size}",
                defaults::MAX_SIZE
            )));
        }
        if !(dot_size.is_finite() && dot_size > 0.0) {
            return Err(LockError::InvalidGrid(format!("dot size must be positive, got {dot_size}")));
        }
        if !(gap.is_finite() && gap >= 0.0) {
            return Err(LockError::InvalidGrid(format!("gap must be non-negative, got {gap}")));
        }
        Ok(Self::build(size, dot_size, gap))
    }

    fn build(size: usize, dot_size: f64, gap: f64) -> Self {
        let pitch = dot_size + gap;
        let nodes = (0..size * size)
            .map(|i| {
                let row = (i / size) as f64;
                let col = (i % size) as f64;
                Node {
                    id: i as NodeId,
                    center: Point::new(col * pitch + dot_size / 2.0, row * pitch + dot_size / 2.0),
                }
            })
            .collect();
        Self { size, dot_size, gap, nodes }
    }

    pub fn size(&self) -> usize { self.size }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn nodes(&self) -> &[Node] { &self.nodes }

    /// Drawn radius, also the hit radius.
    pub fn radius(&self) -> f64 {
        self.dot_size / 2.0
    }

    /// Width and height of the widget.
    pub fn extent(&self) -> f64 {
        self.size as f64 * (self.dot_size + self.gap) - self.gap
    }

    pub fn contains(&self, point: Point) -> bool {
        let extent = self.extent();
        (0.0..=extent).contains(&point.x) && (0.0..=extent).contains(&point.y)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn center(&self, id: NodeId) -> Option<Point> {
        self.node(id).map(|n| n.center)
    }

    /// Nearest node whose centre is within the hit radius of `point`.
    /// A point exactly on the rim counts as a hit.
    pub fn hit(&self, point: Point) -> Option<&Node> {
        let radius = self.radius();
        self.nodes
            .iter()
            .map(|node| (node, node.center.distance_to(point)))
            .filter(|(_, d)| *d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }

    pub fn check_id(&self, id: NodeId) -> LockResult<()> {
        if (id as usize) < self.len() {
            Ok(())
        } else {
            Err(LockError::NodeOutOfRange { id, len: self.len() })
        }
    }
}
