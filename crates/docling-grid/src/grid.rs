//! Canonical grid geometry: consolidated ruling lines, the lattice they form,
//! and the cells partitioning it.

use serde::{Deserialize, Serialize};

use crate::types::{BBox, LineSegment, Orientation};

/// One consolidated ruling line.
///
/// The coordinate is the arithmetic mean of the perpendicular coordinates of
/// the merged segments. The segments themselves are kept so the grid builder
/// can tell where along the line ink actually exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub orientation: Orientation,
    pub coordinate: f64,
    pub segments: Vec<LineSegment>,
}

impl GridLine {
    /// Merge `segments` (all of `orientation`) into one line at their mean
    /// perpendicular coordinate.
    #[must_use]
    pub fn from_segments(orientation: Orientation, segments: Vec<LineSegment>) -> Self {
        let coordinate = if segments.is_empty() {
            0.0
        } else {
            segments.iter().map(LineSegment::perpendicular).sum::<f64>() / segments.len() as f64
        };
        Self {
            orientation,
            coordinate,
            segments,
        }
    }

    /// Synthetic full-length line, for callers that already know the grid.
    #[must_use]
    pub fn spanning(orientation: Orientation, coordinate: f64, start: f64, end: f64) -> Self {
        let segment = match orientation {
            Orientation::Horizontal => LineSegment::horizontal(coordinate, start, end),
            Orientation::Vertical => LineSegment::vertical(coordinate, start, end),
        };
        Self {
            orientation,
            coordinate,
            segments: vec![segment],
        }
    }

    /// `(start, end)` covering every merged segment.
    #[must_use]
    pub fn extent(&self) -> (f64, f64) {
        self.segments
            .iter()
            .map(LineSegment::extent)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (s, e)| {
                (lo.min(s), hi.max(e))
            })
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        let (start, end) = self.extent();
        (end - start).max(0.0)
    }

    /// Inked intervals along the line, sorted; segments separated by gaps of at
    /// most `join_tolerance` are joined into one interval.
    #[must_use]
    pub fn inked_intervals(&self, join_tolerance: f64) -> Vec<(f64, f64)> {
        let mut intervals: Vec<(f64, f64)> = self.segments.iter().map(LineSegment::extent).collect();
        intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
        for (start, end) in intervals {
            match merged.last_mut() {
                Some(last) if start <= last.1 + join_tolerance => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    /// Fraction of `[from, to]` covered by ink, in `0.0..=1.0`.
    #[must_use]
    pub fn coverage(&self, from: f64, to: f64, join_tolerance: f64) -> f64 {
        let (from, to) = (from.min(to), from.max(to));
        let span = to - from;
        let covered: f64 = self
            .inked_intervals(join_tolerance)
            .iter()
            .map(|&(start, end)| (end.min(to) - start.max(from)).max(0.0))
            .sum();
        if span <= f64::EPSILON {
            return if covered > 0.0 || self.touches(from, join_tolerance) {
                1.0
            } else {
                0.0
            };
        }
        (covered / span).clamp(0.0, 1.0)
    }

    fn touches(&self, position: f64, join_tolerance: f64) -> bool {
        self.inked_intervals(join_tolerance)
            .iter()
            .any(|&(start, end)| {
                position >= start - join_tolerance && position <= end + join_tolerance
            })
    }

    /// Whether this line and `other` (of the other orientation) meet.
    #[must_use]
    pub fn crosses(&self, other: &Self, tolerance: f64) -> bool {
        if self.orientation == other.orientation {
            return false;
        }
        let (self_start, self_end) = self.extent();
        let (other_start, other_end) = other.extent();
        other.coordinate >= self_start - tolerance
            && other.coordinate <= self_end + tolerance
            && self.coordinate >= other_start - tolerance
            && self.coordinate <= other_end + tolerance
    }
}

/// Ordered row and column boundaries of one table region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// y coordinates of row boundaries, ascending
    pub rows: Vec<f64>,
    /// x coordinates of column boundaries, ascending
    pub cols: Vec<f64>,
}

impl Lattice {
    #[must_use]
    pub fn new(mut rows: Vec<f64>, mut cols: Vec<f64>) -> Self {
        rows.sort_by(f64::total_cmp);
        cols.sort_by(f64::total_cmp);
        Self { rows, cols }
    }

    /// Number of lattice unit rows
    #[inline]
    #[must_use]
    pub fn unit_rows(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Number of lattice unit columns
    #[inline]
    #[must_use]
    pub fn unit_cols(&self) -> usize {
        self.cols.len().saturating_sub(1)
    }

    /// Box of the unit at `(row, col)`
    #[must_use]
    pub fn unit_bbox(&self, row: usize, col: usize) -> BBox {
        BBox::new(
            self.cols[col],
            self.rows[row],
            self.cols[col + 1],
            self.rows[row + 1],
        )
    }

    /// Box of `row_span x col_span` units starting at `(row, col)`
    #[must_use]
    pub fn span_bbox(&self, row: usize, col: usize, row_span: usize, col_span: usize) -> BBox {
        BBox::new(
            self.cols[col],
            self.rows[row],
            self.cols[col + col_span],
            self.rows[row + row_span],
        )
    }

    /// Outer box of the whole lattice
    #[must_use]
    pub fn bbox(&self) -> BBox {
        match (
            self.cols.first(),
            self.rows.first(),
            self.cols.last(),
            self.rows.last(),
        ) {
            (Some(&l), Some(&t), Some(&r), Some(&b)) => BBox::new(l, t, r, b),
            _ => BBox::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// How many cells claim each unit. A valid partition has every entry equal to 1.
    #[must_use]
    pub fn claim_counts(&self, cells: &[Cell]) -> Vec<Vec<usize>> {
        let mut counts = vec![vec![0usize; self.unit_cols()]; self.unit_rows()];
        for cell in cells {
            for row in counts.iter_mut().skip(cell.row).take(cell.row_span) {
                for count in row.iter_mut().skip(cell.col).take(cell.col_span) {
                    *count += 1;
                }
            }
        }
        counts
    }

    /// Every unit covered by exactly one cell, and no cell outside the lattice.
    #[must_use]
    pub fn is_partitioned_by(&self, cells: &[Cell]) -> bool {
        let in_bounds = cells.iter().all(|c| {
            c.row_span >= 1
                && c.col_span >= 1
                && c.row + c.row_span <= self.unit_rows()
                && c.col + c.col_span <= self.unit_cols()
        });
        in_bounds
            && self
                .claim_counts(cells)
                .iter()
                .flatten()
                .all(|&count| count == 1)
    }
}

/// Rectangle of one or more lattice units holding one piece of table content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Top unit row
    pub row: usize,
    /// Left unit column
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub bbox: BBox,
    /// Whitespace-normalized text, filled by the cell assigner
    #[serde(default)]
    pub text: String,
}

impl Cell {
    #[must_use]
    pub fn new(row: usize, col: usize, row_span: usize, col_span: usize, bbox: BBox) -> Self {
        Self {
            row,
            col,
            row_span,
            col_span,
            bbox,
            text: String::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_spanning(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    /// Whether the unit `(row, col)` is part of this cell
    #[inline]
    #[must_use]
    pub const fn covers(&self, row: usize, col: usize) -> bool {
        row >= self.row
            && row < self.row + self.row_span
            && col >= self.col
            && col < self.col + self.col_span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_line_mean_coordinate() {
        let line = GridLine::from_segments(
            Orientation::Horizontal,
            vec![
                LineSegment::horizontal(10.0, 0.0, 5.0),
                LineSegment::horizontal(11.0, 6.0, 20.0),
            ],
        );
        assert_eq!(line.coordinate, 10.5);
        assert_eq!(line.extent(), (0.0, 20.0));
        assert_eq!(line.length(), 20.0);
    }

    #[test]
    fn test_inked_intervals_bridge_small_gaps() {
        let line = GridLine::from_segments(
            Orientation::Horizontal,
            vec![
                LineSegment::horizontal(0.0, 0.0, 10.0),
                LineSegment::horizontal(0.0, 12.0, 20.0),
                LineSegment::horizontal(0.0, 40.0, 50.0),
            ],
        );
        assert_eq!(line.inked_intervals(2.0), vec![(0.0, 20.0), (40.0, 50.0)]);
        assert_eq!(line.inked_intervals(1.0).len(), 3);
    }

    #[test]
    fn test_coverage_fractions() {
        let line = GridLine::from_segments(
            Orientation::Vertical,
            vec![LineSegment::vertical(5.0, 0.0, 10.0)],
        );
        assert_eq!(line.coverage(0.0, 10.0, 0.0), 1.0);
        assert_eq!(line.coverage(0.0, 20.0, 0.0), 0.5);
        assert_eq!(line.coverage(20.0, 30.0, 0.0), 0.0);
        // reversed bounds are accepted
        assert_eq!(line.coverage(10.0, 0.0, 0.0), 1.0);
    }

    #[test]
    fn test_crosses() {
        let h = GridLine::spanning(Orientation::Horizontal, 10.0, 0.0, 30.0);
        let v_inside = GridLine::spanning(Orientation::Vertical, 15.0, 0.0, 20.0);
        let v_outside = GridLine::spanning(Orientation::Vertical, 50.0, 0.0, 20.0);
        let v_near = GridLine::spanning(Orientation::Vertical, 31.0, 0.0, 20.0);

        assert!(h.crosses(&v_inside, 0.0));
        assert!(v_inside.crosses(&h, 0.0));
        assert!(!h.crosses(&v_outside, 3.0));
        assert!(!h.crosses(&v_near, 0.5));
        assert!(h.crosses(&v_near, 2.0));
        assert!(!h.crosses(&h, 10.0));
    }

    #[test]
    fn test_lattice_dimensions() {
        let lattice = Lattice::new(vec![20.0, 0.0, 10.0], vec![30.0, 0.0]);
        assert_eq!(lattice.rows, vec![0.0, 10.0, 20.0]);
        assert_eq!(lattice.unit_rows(), 2);
        assert_eq!(lattice.unit_cols(), 1);
        assert_eq!(lattice.unit_bbox(1, 0), BBox::new(0.0, 10.0, 30.0, 20.0));
        assert_eq!(lattice.bbox(), BBox::new(0.0, 0.0, 30.0, 20.0));
    }

    #[test]
    fn test_partition_check() {
        let lattice = Lattice::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        let full = vec![
            Cell::new(0, 0, 1, 2, lattice.span_bbox(0, 0, 1, 2)),
            Cell::new(1, 0, 1, 1, lattice.unit_bbox(1, 0)),
            Cell::new(1, 1, 1, 1, lattice.unit_bbox(1, 1)),
        ];
        assert!(lattice.is_partitioned_by(&full));

        let gap = &full[..2];
        assert!(!lattice.is_partitioned_by(gap));

        let mut overlap = full.clone();
        overlap.push(Cell::new(0, 1, 1, 1, lattice.unit_bbox(0, 1)));
        assert!(!lattice.is_partitioned_by(&overlap));
    }

    #[test]
    fn test_cell_covers() {
        let cell = Cell::new(1, 2, 2, 3, BBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(cell.is_spanning());
        assert!(cell.covers(1, 2));
        assert!(cell.covers(2, 4));
        assert!(!cell.covers(3, 2));
        assert!(!cell.covers(1, 5));
    }
}
