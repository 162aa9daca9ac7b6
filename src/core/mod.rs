//! Geometry, patterns and shared constants. No I/O, compiles everywhere.

pub mod constants;
pub mod grid;
pub mod pattern;
