// Stage 4: Cell-Text Assignment

use std::collections::HashSet;

use log::{debug, trace};
use ordered_float::OrderedFloat;

use crate::config::GridConfig;
use crate::grid::Cell;
use crate::pipeline::types::AssignedCells;
use crate::types::CharFragment;

/// Configuration for Stage 4 (Cell-Text Assignment)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage04Config {
    /// Centers this close to a cell edge still count as inside it
    pub boundary_tolerance: f64,
    /// Fragments whose vertical centers differ by at most this share a line
    pub line_tolerance: f64,
    /// Same-line fragments closer than this are joined without a space
    pub char_join_tolerance: Option<f64>,
}

impl Default for Stage04Config {
    #[inline]
    fn default() -> Self {
        Self::from(&GridConfig::default())
    }
}

impl From<&GridConfig> for Stage04Config {
    #[inline]
    fn from(config: &GridConfig) -> Self {
        Self {
            boundary_tolerance: config.line_merge_tolerance,
            line_tolerance: config.line_tolerance,
            char_join_tolerance: config.char_join_tolerance,
        }
    }
}

/// Stage 4: Cell Assigner
///
/// Fills each cell with the text of the fragments whose bounding-box center it
/// contains.
///
/// Algorithm:
/// - Skip whitespace-only fragments
/// - Candidates are the cells strictly containing the center; if none, the
///   cells containing it within `boundary_tolerance`
/// - Several candidates (center on a shared edge): the cell whose top-left
///   corner is closest wins, then the first in row-major order
/// - Per cell: deduplicate fragments by text and bbox, group into lines by
///   vertical center, order lines top to bottom and fragments left to right,
///   join with single spaces and collapse whitespace
///
/// Text is rebuilt from scratch on every call, so running the stage again on
/// its own output gives the same cells.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage04CellAssigner {
    config: Stage04Config,
}

impl Stage04CellAssigner {
    /// Create a new cell assigner with default configuration
    #[inline]
    #[must_use = "returns a new Stage04CellAssigner instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new cell assigner with custom configuration
    #[inline]
    #[must_use = "returns a new Stage04CellAssigner with custom config"]
    pub const fn with_config(config: Stage04Config) -> Self {
        Self { config }
    }

    /// Find the cell for a fragment center, if any
    fn find_cell(&self, cells: &[Cell], x: f64, y: f64) -> Option<usize> {
        let strict: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.bbox.contains_point(x, y, 0.0))
            .map(|(idx, _)| idx)
            .collect();
        let candidates = if strict.is_empty() {
            cells
                .iter()
                .enumerate()
                .filter(|(_, cell)| {
                    cell.bbox
                        .contains_point(x, y, self.config.boundary_tolerance)
                })
                .map(|(idx, _)| idx)
                .collect()
        } else {
            strict
        };

        // min_by keeps the first of equal elements, which is row-major order
        candidates.into_iter().min_by(|&a, &b| {
            let da = cells[a].bbox.distance_to_top_left(x, y);
            let db = cells[b].bbox.distance_to_top_left(x, y);
            da.total_cmp(&db)
        })
    }

    /// Assign page fragments to `cells` and rebuild each cell's text.
    #[must_use = "returns cells with assigned text"]
    pub fn process(&self, mut cells: Vec<Cell>, fragments: &[CharFragment]) -> AssignedCells {
        let mut per_cell: Vec<Vec<&CharFragment>> = vec![Vec::new(); cells.len()];
        let mut assigned_fragments = Vec::new();

        for (idx, fragment) in fragments.iter().enumerate() {
            if fragment.text.trim().is_empty() {
                continue;
            }
            let (x, y) = fragment.center();
            if let Some(cell_idx) = self.find_cell(&cells, x, y) {
                per_cell[cell_idx].push(fragment);
                assigned_fragments.push(idx);
            }
        }

        for (cell, assigned) in cells.iter_mut().zip(per_cell) {
            cell.text = self.cell_text(Self::deduplicate_fragments(assigned));
            if !cell.text.is_empty() {
                trace!(
                    "Stage04: cell ({}, {}) <- {:?}",
                    cell.row,
                    cell.col,
                    cell.text.chars().take(30).collect::<String>()
                );
            }
        }

        debug!(
            "Stage04: {} of {} fragment(s) assigned to {} cell(s)",
            assigned_fragments.len(),
            fragments.len(),
            cells.len()
        );

        AssignedCells {
            cells,
            assigned_fragments,
        }
    }

    /// Order fragments into reading order and join them.
    fn cell_text(&self, mut fragments: Vec<&CharFragment>) -> String {
        if fragments.is_empty() {
            return String::new();
        }
        fragments.sort_by(|a, b| a.center().1.total_cmp(&b.center().1));

        let mut lines: Vec<Vec<&CharFragment>> = Vec::new();
        let mut line_anchor = f64::NEG_INFINITY;
        for fragment in fragments {
            let y = fragment.center().1;
            match lines.last_mut() {
                Some(line) if y - line_anchor <= self.config.line_tolerance => line.push(fragment),
                _ => {
                    line_anchor = y;
                    lines.push(vec![fragment]);
                }
            }
        }

        let mut text = String::new();
        for mut line in lines {
            line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            let mut previous: Option<&CharFragment> = None;
            for fragment in line {
                let glued = match (previous, self.config.char_join_tolerance) {
                    (Some(prev), Some(tolerance)) => fragment.x0 - prev.x1 < tolerance,
                    _ => false,
                };
                if !text.is_empty() && !glued {
                    text.push(' ');
                }
                text.push_str(fragment.text.trim());
                previous = Some(fragment);
            }
        }

        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Drop repeated fragments (same text, same box); some producers draw
    /// text twice to fake bold.
    fn deduplicate_fragments(fragments: Vec<&CharFragment>) -> Vec<&CharFragment> {
        type FragmentKey<'a> = (
            &'a str,
            OrderedFloat<f64>,
            OrderedFloat<f64>,
            OrderedFloat<f64>,
            OrderedFloat<f64>,
        );

        let mut seen: HashSet<FragmentKey<'_>> = HashSet::with_capacity(fragments.len());
        fragments
            .into_iter()
            .filter(|&f| {
                seen.insert((
                    f.text.as_str(),
                    OrderedFloat(f.x0),
                    OrderedFloat(f.y0),
                    OrderedFloat(f.x1),
                    OrderedFloat(f.y1),
                ))
            })
            .collect()
    }

    /// Get stage name for logging
    #[inline]
    #[must_use = "returns the stage name for logging"]
    pub const fn stage_name(&self) -> &'static str {
        "Stage04_CellAssigner"
    }
}
