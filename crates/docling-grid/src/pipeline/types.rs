/// Intermediate values passed between pipeline stages.
///
/// None of these outlive one page: the lattice and the ruling lines are
/// dropped once the cells have been built, and only [`Cell`]s flow on.
use serde::{Deserialize, Serialize};

use crate::diagnostics::AmbiguousBoundary;
use crate::grid::{Cell, GridLine, Lattice};
use crate::types::BBox;

/// Canonical ruling lines of one page, each set sorted by coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulingLines {
    pub horizontal: Vec<GridLine>,
    pub vertical: Vec<GridLine>,
    /// Slanted segments that were skipped
    pub skipped_segments: usize,
}

impl RulingLines {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.horizontal.is_empty() && self.vertical.is_empty()
    }
}

/// Connected group of ruling lines that may form one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    /// Position among the page's regions, top to bottom then left to right
    pub index: usize,
    pub horizontal: Vec<GridLine>,
    pub vertical: Vec<GridLine>,
    /// Box around every line of the region
    pub bbox: BBox,
}

/// Lattice and cell partition of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltGrid {
    pub lattice: Lattice,
    /// Row-major by origin unit
    pub cells: Vec<Cell>,
    /// Dividers that were kept because the evidence did not settle them
    pub ambiguities: Vec<AmbiguousBoundary>,
}

/// Grid builder result for one region.
#[derive(Debug, Clone, PartialEq)]
pub enum GridOutcome {
    Built(BuiltGrid),
    /// Region does not form a usable lattice
    Rejected { reason: String },
}

/// Cells with their text, plus which page fragments ended up inside them.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedCells {
    pub cells: Vec<Cell>,
    /// Indices into the page's fragment list, ascending
    pub assigned_fragments: Vec<usize>,
}
