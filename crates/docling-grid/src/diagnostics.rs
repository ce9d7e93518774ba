//! Recoverable conditions reported next to extraction results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Orientation;

/// Why a divider between two lattice units was kept even though it was not
/// fully drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// The divider is only partly inked
    PartialEvidence,
    /// The divider is missing, but merging across it would not give a rectangle
    NonRectangularMerge,
}

/// One divider the grid builder resolved conservatively (kept the units apart).
///
/// For a vertical divider, `(row, col)` is the unit on its left; for a
/// horizontal divider, the unit above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousBoundary {
    pub divider: Orientation,
    pub row: usize,
    pub col: usize,
    /// Inked fraction of the divider
    pub coverage: f64,
    pub reason: AmbiguityReason,
}

/// Recoverable outcome worth telling the caller about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Not enough ruling lines (or lattice units) for a table; region skipped
    NoTableFound {
        page: usize,
        /// Region index on the page, when the page had any lines at all
        region: Option<usize>,
        horizontal_lines: usize,
        vertical_lines: usize,
        reason: String,
    },
    /// Divider resolved by the "do not merge" policy
    AmbiguousGrid {
        page: usize,
        table_index: usize,
        boundary: AmbiguousBoundary,
    },
    /// Fragments that fell outside every cell, dropped
    UnassignedText { page: usize, count: usize },
    /// Column without a clear majority type, typed as string
    TypeInferenceFallback {
        page: usize,
        table_index: usize,
        column: usize,
        header: String,
    },
}

impl Diagnostic {
    /// Page the diagnostic belongs to
    #[must_use]
    pub const fn page(&self) -> usize {
        match self {
            Self::NoTableFound { page, .. }
            | Self::AmbiguousGrid { page, .. }
            | Self::UnassignedText { page, .. }
            | Self::TypeInferenceFallback { page, .. } => *page,
        }
    }

    /// Whether this should surface as a warning rather than informational
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousGrid { .. } | Self::TypeInferenceFallback { .. }
        )
    }

    /// Emit through the `log` facade at the matching level
    pub fn log(&self) {
        if self.is_warning() {
            log::warn!("{self}");
        } else {
            log::debug!("{self}");
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTableFound {
                page,
                region,
                horizontal_lines,
                vertical_lines,
                reason,
            } => {
                write!(f, "page {page}")?;
                if let Some(region) = region {
                    write!(f, " region {region}")?;
                }
                write!(
                    f,
                    ": no table found ({horizontal_lines} horizontal, {vertical_lines} vertical lines): {reason}"
                )
            }
            Self::AmbiguousGrid {
                page,
                table_index,
                boundary,
            } => write!(
                f,
                "page {page} table {table_index}: kept {} divider at unit ({}, {}) apart, coverage {:.2} ({:?})",
                boundary.divider, boundary.row, boundary.col, boundary.coverage, boundary.reason
            ),
            Self::UnassignedText { page, count } => {
                write!(f, "page {page}: {count} text fragment(s) outside every table cell")
            }
            Self::TypeInferenceFallback {
                page,
                table_index,
                column,
                header,
            } => write!(
                f,
                "page {page} table {table_index}: column {column} ('{header}') has no clear type, using string"
            ),
        }
    }
}
