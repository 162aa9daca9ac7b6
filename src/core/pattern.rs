//! Pattern: ordered sequence of distinct node ids produced by one drag

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::pattern::MIN_NODES;
use crate::core::grid::{Grid, NodeId};
use crate::error::{LockError, LockResult};

/// A finished drag path. Ids never repeat and there are at least
/// [`MIN_NODES`] of them when built through [`Pattern::new`] or serde.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<NodeId>", into = "Vec<NodeId>")]
pub struct Pattern(Vec<NodeId>);

impl Pattern {
    pub fn new(ids: Vec<NodeId>) -> LockResult<Self> {
        Self::with_min(ids, MIN_NODES)
    }

    /// Like [`Pattern::new`] with a stricter minimum. `min` never goes
    /// below [`MIN_NODES`].
    pub fn with_min(ids: Vec<NodeId>, min: usize) -> LockResult<Self> {
        let min = min.max(MIN_NODES);
        if ids.len() < min {
            return Err(LockError::InvalidPattern(format!(
                "need at least {min} nodes, got {}",
                ids.len()
            )));
        }
        if let Some(dup) = first_duplicate(&ids) {
            return Err(LockError::InvalidPattern(format!("node {dup} repeats")));
        }
        Ok(Self(ids))
    }

    /// Ids already known to be distinct and long enough.
    pub(crate) fn from_trace(ids: Vec<NodeId>) -> Self {
        debug_assert!(first_duplicate(&ids).is_none());
        Self(ids)
    }

    /// Parse `"0,1,2,4"`, `"0-1-2-4"` or `"0 1 2 4"`.
    pub fn parse(s: &str) -> LockResult<Self> {
        Self::new(parse_ids(s)?)
    }

    /// Every id must name a node of `grid`.
    pub fn check_grid(&self, grid: &Grid) -> LockResult<()> {
        self.0.iter().try_for_each(|id| grid.check_id(*id))
    }

    pub fn ids(&self) -> &[NodeId] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn contains(&self, id: NodeId) -> bool { self.0.contains(&id) }

    /// Element-wise, in-order comparison.
    pub fn matches(&self, ids: &[NodeId]) -> bool {
        self.0.as_slice() == ids
    }
}

impl TryFrom<Vec<NodeId>> for Pattern {
    type Error = LockError;

    fn try_from(ids: Vec<NodeId>) -> LockResult<Self> {
        Self::new(ids)
    }
}

impl From<Pattern> for Vec<NodeId> {
    fn from(pattern: Pattern) -> Self {
        pattern.0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|id| id.to_string()).collect();
        f.write_str(&parts.join("-"))
    }
}

/// Split a list of node ids on commas, dashes or whitespace. No length or
/// repeat checks.
pub fn parse_ids(s: &str) -> LockResult<Vec<NodeId>> {
    s.split(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<NodeId>()
                .map_err(|e| LockError::InvalidPattern(format!("'{part}': {e}")))
        })
        .collect()
}

fn first_duplicate(ids: &[NodeId]) -> Option<NodeId> {
    let mut seen = [false; 256];
    for &id in ids {
        if seen[id as usize] {
            return Some(id);
        }
        seen[id as usize] = true;
    }
    None
}
