// Stage 3: Grid Building

use log::{debug, trace};

use crate::config::GridConfig;
use crate::diagnostics::{AmbiguityReason, AmbiguousBoundary};
use crate::grid::{Cell, GridLine, Lattice};
use crate::pipeline::types::{BuiltGrid, GridOutcome, TableRegion};
use crate::types::Orientation;

/// Configuration for Stage 3 (Grid Building)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage03Config {
    /// Gap along a line that still counts as continuous ink
    pub join_tolerance: f64,
    /// Coverage at or below this means the divider is absent
    pub absent_evidence_ratio: f64,
    /// Coverage at or above this means the divider is present
    pub full_evidence_ratio: f64,
    pub min_rows: usize,
    pub min_cols: usize,
}

impl Default for Stage03Config {
    #[inline]
    fn default() -> Self {
        Self::from(&GridConfig::default())
    }
}

impl From<&GridConfig> for Stage03Config {
    #[inline]
    fn from(config: &GridConfig) -> Self {
        Self {
            join_tolerance: config.join_tolerance,
            absent_evidence_ratio: config.absent_evidence_ratio,
            full_evidence_ratio: config.full_evidence_ratio,
            min_rows: config.min_rows,
            min_cols: config.min_cols,
        }
    }
}

/// Evidence for one divider between two adjacent lattice units
#[derive(Debug, Clone, Copy, PartialEq)]
enum Divider {
    Present,
    Absent(f64),
    Partial(f64),
}

impl Divider {
    #[inline]
    const fn is_absent(self) -> bool {
        matches!(self, Self::Absent(_))
    }
}

/// Stage 3: Grid Builder
///
/// Turns the lines of one region into a [`Lattice`] and a set of [`Cell`]s
/// that covers every lattice unit exactly once.
///
/// Algorithm:
/// 1. Row boundaries are the horizontal coordinates, column boundaries the
///    vertical ones
/// 2. For every divider between two adjacent units, measure how much of the
///    shared edge the dividing line inks
/// 3. Walk units row-major; from each unclaimed unit grow a rectangle right
///    across absent vertical dividers, then down while the next strip is
///    unclaimed, separated by absent horizontal dividers and free of interior
///    vertical dividers
/// 4. Dividers that are only partly inked, or absent but unreachable by a
///    rectangular merge, keep their units apart and are reported
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage03GridBuilder {
    config: Stage03Config,
}

impl Stage03GridBuilder {
    /// Create a new grid builder with default configuration
    #[inline]
    #[must_use = "returns a new Stage03GridBuilder instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new grid builder with custom configuration
    #[inline]
    #[must_use = "returns a new Stage03GridBuilder with custom config"]
    pub const fn with_config(config: Stage03Config) -> Self {
        Self { config }
    }

    fn classify(&self, line: &GridLine, from: f64, to: f64) -> Divider {
        let coverage = line.coverage(from, to, self.config.join_tolerance);
        if coverage >= self.config.full_evidence_ratio {
            Divider::Present
        } else if coverage <= self.config.absent_evidence_ratio {
            Divider::Absent(coverage)
        } else {
            Divider::Partial(coverage)
        }
    }

    /// Build the lattice and cell partition of one region.
    #[must_use = "returns the grid of the region"]
    pub fn process(&self, region: &TableRegion) -> GridOutcome {
        let mut horizontal: Vec<&GridLine> = region.horizontal.iter().collect();
        let mut vertical: Vec<&GridLine> = region.vertical.iter().collect();
        horizontal.sort_by(|a, b| a.coordinate.total_cmp(&b.coordinate));
        vertical.sort_by(|a, b| a.coordinate.total_cmp(&b.coordinate));

        let lattice = Lattice::new(
            horizontal.iter().map(|l| l.coordinate).collect(),
            vertical.iter().map(|l| l.coordinate).collect(),
        );
        let (n_rows, n_cols) = (lattice.unit_rows(), lattice.unit_cols());

        if n_rows < self.config.min_rows || n_cols < self.config.min_cols || n_rows * n_cols == 0
        {
            return GridOutcome::Rejected {
                reason: format!(
                    "lattice of {n_rows}x{n_cols} units is below the {}x{} minimum",
                    self.config.min_rows, self.config.min_cols
                ),
            };
        }

        // v_div[r][c]: between (r, c) and (r, c + 1); h_div[r][c]: between (r, c) and (r + 1, c)
        let v_div: Vec<Vec<Divider>> = (0..n_rows)
            .map(|r| {
                (0..n_cols - 1)
                    .map(|c| self.classify(vertical[c + 1], lattice.rows[r], lattice.rows[r + 1]))
                    .collect()
            })
            .collect();
        let h_div: Vec<Vec<Divider>> = (0..n_rows - 1)
            .map(|r| {
                (0..n_cols)
                    .map(|c| {
                        self.classify(horizontal[r + 1], lattice.cols[c], lattice.cols[c + 1])
                    })
                    .collect()
            })
            .collect();

        let mut owner: Vec<Vec<Option<usize>>> = vec![vec![None; n_cols]; n_rows];
        let mut cells: Vec<Cell> = Vec::new();

        for row in 0..n_rows {
            for col in 0..n_cols {
                if owner[row][col].is_some() {
                    continue;
                }

                let mut last_col = col;
                while last_col + 1 < n_cols
                    && v_div[row][last_col].is_absent()
                    && owner[row][last_col + 1].is_none()
                {
                    last_col += 1;
                }

                let mut last_row = row;
                while last_row + 1 < n_rows {
                    let next = last_row + 1;
                    let strip_free = (col..=last_col).all(|c| {
                        h_div[last_row][c].is_absent() && owner[next][c].is_none()
                    });
                    let strip_open = (col..last_col).all(|c| v_div[next][c].is_absent());
                    if !(strip_free && strip_open) {
                        break;
                    }
                    last_row = next;
                }

                let (row_span, col_span) = (last_row - row + 1, last_col - col + 1);
                let id = cells.len();
                for owned in owner.iter_mut().take(last_row + 1).skip(row) {
                    for slot in owned.iter_mut().take(last_col + 1).skip(col) {
                        *slot = Some(id);
                    }
                }
                if row_span > 1 || col_span > 1 {
                    trace!("Stage03: spanning cell at ({row}, {col}) spans {row_span}x{col_span}");
                }
                cells.push(Cell::new(
                    row,
                    col,
                    row_span,
                    col_span,
                    lattice.span_bbox(row, col, row_span, col_span),
                ));
            }
        }

        let mut ambiguities = Vec::new();
        let mut check = |divider: Divider, orientation, row, col, a: Option<usize>, b| {
            let (coverage, reason) = match divider {
                Divider::Present => return,
                Divider::Partial(coverage) => (coverage, AmbiguityReason::PartialEvidence),
                Divider::Absent(_) if a == b => return,
                Divider::Absent(coverage) => (coverage, AmbiguityReason::NonRectangularMerge),
            };
            ambiguities.push(AmbiguousBoundary {
                divider: orientation,
                row,
                col,
                coverage,
                reason,
            });
        };
        for row in 0..n_rows {
            for col in 0..n_cols {
                if col + 1 < n_cols {
                    check(
                        v_div[row][col],
                        Orientation::Vertical,
                        row,
                        col,
                        owner[row][col],
                        owner[row][col + 1],
                    );
                }
                if row + 1 < n_rows {
                    check(
                        h_div[row][col],
                        Orientation::Horizontal,
                        row,
                        col,
                        owner[row][col],
                        owner[row + 1][col],
                    );
                }
            }
        }

        debug_assert!(
            lattice.is_partitioned_by(&cells),
            "cells must cover every lattice unit exactly once"
        );

        debug!(
            "Stage03: region {}: {n_rows}x{n_cols} lattice, {} cell(s), {} ambiguous divider(s)",
            region.index,
            cells.len(),
            ambiguities.len()
        );

        GridOutcome::Built(BuiltGrid {
            lattice,
            cells,
            ambiguities,
        })
    }

    /// Get stage name for logging
    #[inline]
    #[must_use = "returns the stage name for logging"]
    pub const fn stage_name(&self) -> &'static str {
        "Stage03_GridBuilder"
    }
}
