// Stage 1: Line Consolidation
// Counts and coordinates mix freely in the running mean
#![allow(clippy::cast_precision_loss)]

use log::{debug, trace};

use crate::config::GridConfig;
use crate::error::Result;
use crate::grid::GridLine;
use crate::pipeline::types::RulingLines;
use crate::types::{LineSegment, Orientation, PageInput};

/// Anything that can produce the canonical ruling lines of a page.
///
/// The grid builder and everything after it only see [`GridLine`]s, so a
/// different detector (for example one that finds rulings in a raster image)
/// can be plugged into [`TableExtractor`](crate::TableExtractor) through this
/// trait.
pub trait RulingSource: Send + Sync {
    /// Horizontal and vertical lines of `page`, each set sorted by coordinate.
    ///
    /// `page` is already in top-left coordinates with rect edges folded into
    /// its segments.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the page cannot be processed.
    fn ruling_lines(&self, page: &PageInput) -> Result<RulingLines>;

    /// Name used in log messages
    fn name(&self) -> &'static str;
}

/// Configuration for Stage 1 (Line Consolidation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage01Config {
    /// ε: segments closer than this (perpendicular) join one line
    pub line_merge_tolerance: f64,
    /// Lines shorter than this after merging are dropped
    pub edge_min_length: f64,
}

impl Default for Stage01Config {
    #[inline]
    fn default() -> Self {
        Self::from(&GridConfig::default())
    }
}

impl From<&GridConfig> for Stage01Config {
    #[inline]
    fn from(config: &GridConfig) -> Self {
        Self {
            line_merge_tolerance: config.line_merge_tolerance,
            edge_min_length: config.edge_min_length,
        }
    }
}

/// Stage 1: Line Consolidator
///
/// Merges near-collinear, overlapping, duplicate or broken segments into one
/// [`GridLine`] per ruling.
///
/// Algorithm, per orientation:
/// 1. Skip slanted segments (endpoints more than ε apart across the stroke)
/// 2. Sort by perpendicular coordinate
/// 3. Sweep: a segment closer than ε to the running mean of the current
///    cluster joins it, otherwise it opens a new cluster
/// 4. Each cluster becomes a line at the mean coordinate; segments are kept
///    whether or not they overlap along the line (dashed strokes)
/// 5. Drop lines shorter than `edge_min_length`
///
/// A new cluster opens only at a coordinate at least ε past the previous
/// cluster's mean, and its own mean can only be larger, so no two lines of
/// one orientation end up within ε of each other.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage01LineConsolidator {
    config: Stage01Config,
}

impl Stage01LineConsolidator {
    /// Create a new line consolidator with default configuration
    #[inline]
    #[must_use = "returns a new Stage01LineConsolidator instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new line consolidator with custom configuration
    #[inline]
    #[must_use = "returns a new Stage01LineConsolidator with custom config"]
    pub const fn with_config(config: Stage01Config) -> Self {
        Self { config }
    }

    /// Consolidate the segments of one orientation.
    ///
    /// Returns the lines sorted by coordinate and the number of slanted
    /// segments skipped.
    #[must_use = "returns the consolidated lines"]
    pub fn consolidate(
        &self,
        orientation: Orientation,
        segments: &[LineSegment],
    ) -> (Vec<GridLine>, usize) {
        let epsilon = self.config.line_merge_tolerance;

        let mut skipped = 0usize;
        let mut candidates: Vec<LineSegment> = Vec::with_capacity(segments.len());
        for segment in segments.iter().filter(|s| s.orientation == orientation) {
            if segment.skew() > epsilon {
                skipped += 1;
                trace!(
                    "Stage01: skipping slanted {orientation} segment ({:.1},{:.1})→({:.1},{:.1})",
                    segment.x0,
                    segment.y0,
                    segment.x1,
                    segment.y1
                );
                continue;
            }
            candidates.push(*segment);
        }

        candidates.sort_by(|a, b| {
            a.perpendicular()
                .total_cmp(&b.perpendicular())
                .then_with(|| a.extent().0.total_cmp(&b.extent().0))
        });

        let mut lines: Vec<GridLine> = Vec::new();
        let mut cluster: Vec<LineSegment> = Vec::new();
        let mut sum = 0.0;

        for segment in candidates {
            let coordinate = segment.perpendicular();
            if !cluster.is_empty() && coordinate - sum / cluster.len() as f64 >= epsilon {
                lines.push(GridLine::from_segments(
                    orientation,
                    std::mem::take(&mut cluster),
                ));
                sum = 0.0;
            }
            sum += coordinate;
            cluster.push(segment);
        }
        if !cluster.is_empty() {
            lines.push(GridLine::from_segments(orientation, cluster));
        }

        let before = lines.len();
        lines.retain(|line| line.length() >= self.config.edge_min_length);
        if lines.len() < before {
            trace!(
                "Stage01: dropped {} {orientation} line(s) shorter than {}",
                before - lines.len(),
                self.config.edge_min_length
            );
        }

        (lines, skipped)
    }

    /// Consolidate every segment of the page.
    #[must_use = "returns the ruling lines of the page"]
    pub fn process(&self, page: &PageInput) -> RulingLines {
        let (horizontal, skipped_h) = self.consolidate(Orientation::Horizontal, &page.segments);
        let (vertical, skipped_v) = self.consolidate(Orientation::Vertical, &page.segments);

        debug!(
            "Stage01: page {}: {} segments -> {} horizontal, {} vertical lines ({} slanted skipped)",
            page.page_number,
            page.segments.len(),
            horizontal.len(),
            vertical.len(),
            skipped_h + skipped_v
        );

        RulingLines {
            horizontal,
            vertical,
            skipped_segments: skipped_h + skipped_v,
        }
    }

    /// Get stage name for logging
    #[inline]
    #[must_use = "returns the stage name for logging"]
    pub const fn stage_name(&self) -> &'static str {
        "Stage01_LineConsolidator"
    }
}

impl RulingSource for Stage01LineConsolidator {
    fn ruling_lines(&self, page: &PageInput) -> Result<RulingLines> {
        Ok(self.process(page))
    }

    fn name(&self) -> &'static str {
        self.stage_name()
    }
}
