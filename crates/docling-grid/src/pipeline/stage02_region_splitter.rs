// Stage 2: Region Splitting

use log::{debug, trace};

use crate::config::GridConfig;
use crate::diagnostics::Diagnostic;
use crate::grid::GridLine;
use crate::pipeline::types::{RulingLines, TableRegion};
use crate::types::{BBox, Orientation};

/// Configuration for Stage 2 (Region Splitting)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stage02Config {
    /// Slack when deciding whether a horizontal and a vertical line meet
    pub intersection_tolerance: f64,
}

impl Default for Stage02Config {
    #[inline]
    fn default() -> Self {
        Self::from(&GridConfig::default())
    }
}

impl From<&GridConfig> for Stage02Config {
    #[inline]
    fn from(config: &GridConfig) -> Self {
        Self {
            intersection_tolerance: config.intersection_tolerance,
        }
    }
}

/// Union-Find over dense line indices
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    /// Find root of element with path compression
    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    /// Union two elements by rank
    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Regions of one page plus the line groups that could not form a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage02Output {
    pub regions: Vec<TableRegion>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Stage 2: Region Splitter
///
/// Groups the page's ruling lines into connected components: a horizontal and
/// a vertical line are connected when they intersect within
/// `intersection_tolerance`. Each component is a candidate table.
///
/// Components are numbered top to bottom, then left to right. A component
/// with fewer than two lines of either orientation cannot enclose a cell and
/// is reported as [`Diagnostic::NoTableFound`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stage02RegionSplitter {
    config: Stage02Config,
}

impl Stage02RegionSplitter {
    /// Create a new region splitter with default configuration
    #[inline]
    #[must_use = "returns a new Stage02RegionSplitter instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new region splitter with custom configuration
    #[inline]
    #[must_use = "returns a new Stage02RegionSplitter with custom config"]
    pub const fn with_config(config: Stage02Config) -> Self {
        Self { config }
    }

    /// Split the page's lines into table regions.
    #[must_use = "returns the table regions of the page"]
    pub fn process(&self, page_number: usize, lines: RulingLines) -> Stage02Output {
        let RulingLines {
            horizontal,
            vertical,
            ..
        } = lines;

        // nothing can cross: report once for the page instead of once per line
        if horizontal.is_empty() || vertical.is_empty() {
            let diagnostic = no_table(page_number, None, horizontal.len(), vertical.len());
            return Stage02Output {
                regions: Vec::new(),
                diagnostics: vec![diagnostic],
            };
        }

        // a consolidated line can carry strokes of several stacked tables, so
        // connectivity is decided per inked piece rather than per line
        let tolerance = self.config.intersection_tolerance;
        let pieces: Vec<(usize, GridLine)> = horizontal
            .iter()
            .chain(&vertical)
            .enumerate()
            .flat_map(|(line_idx, line)| {
                split_pieces(line, tolerance)
                    .into_iter()
                    .map(move |piece| (line_idx, piece))
            })
            .collect();
        trace!(
            "Stage02: page {page_number}: {} line(s) split into {} piece(s)",
            horizontal.len() + vertical.len(),
            pieces.len()
        );

        let mut uf = UnionFind::new(pieces.len());
        for (a, (_, first)) in pieces.iter().enumerate() {
            for (b, (_, second)) in pieces.iter().enumerate().skip(a + 1) {
                if first.crosses(second, tolerance) {
                    uf.union(a, b);
                }
            }
        }

        // root -> (horizontal, vertical); pieces of one line in one component
        // are joined back into a single line
        let mut components: Vec<(usize, Vec<(usize, GridLine)>, Vec<(usize, GridLine)>)> =
            Vec::new();
        for (idx, (line_idx, piece)) in pieces.into_iter().enumerate() {
            let root = uf.find(idx);
            let slot = match components.iter().position(|(r, _, _)| *r == root) {
                Some(pos) => pos,
                None => {
                    components.push((root, Vec::new(), Vec::new()));
                    components.len() - 1
                }
            };
            let lines = match piece.orientation {
                Orientation::Horizontal => &mut components[slot].1,
                Orientation::Vertical => &mut components[slot].2,
            };
            match lines.last_mut() {
                Some((last_idx, line)) if *last_idx == line_idx => {
                    line.segments.extend(piece.segments);
                }
                _ => lines.push((line_idx, piece)),
            }
        }

        let mut groups: Vec<(BBox, Vec<GridLine>, Vec<GridLine>)> = components
            .into_iter()
            .map(|(_, h, v)| {
                let h: Vec<GridLine> = h.into_iter().map(|(_, line)| line).collect();
                let v: Vec<GridLine> = v.into_iter().map(|(_, line)| line).collect();
                (lines_bbox(h.iter().chain(v.iter())), h, v)
            })
            .collect();
        groups.sort_by(|a, b| a.0.t.total_cmp(&b.0.t).then_with(|| a.0.l.total_cmp(&b.0.l)));

        let mut regions = Vec::new();
        let mut diagnostics = Vec::new();
        for (index, (bbox, horizontal, vertical)) in groups.into_iter().enumerate() {
            if horizontal.len() < 2 || vertical.len() < 2 {
                trace!(
                    "Stage02: page {page_number} region {index}: {} horizontal, {} vertical lines, skipped",
                    horizontal.len(),
                    vertical.len()
                );
                diagnostics.push(no_table(
                    page_number,
                    Some(index),
                    horizontal.len(),
                    vertical.len(),
                ));
                continue;
            }
            regions.push(TableRegion {
                index,
                horizontal,
                vertical,
                bbox,
            });
        }

        debug!(
            "Stage02: page {page_number}: {} candidate region(s), {} rejected",
            regions.len(),
            diagnostics.len()
        );

        Stage02Output {
            regions,
            diagnostics,
        }
    }

    /// Get stage name for logging
    #[inline]
    #[must_use = "returns the stage name for logging"]
    pub const fn stage_name(&self) -> &'static str {
        "Stage02_RegionSplitter"
    }
}

/// Split a line into runs of segments whose gaps are at most `tolerance`.
/// Every piece keeps the line's coordinate.
fn split_pieces(line: &GridLine, tolerance: f64) -> Vec<GridLine> {
    let mut segments = line.segments.clone();
    segments.sort_by(|a, b| a.extent().0.total_cmp(&b.extent().0));

    let mut pieces: Vec<GridLine> = Vec::new();
    let mut reach = f64::NEG_INFINITY;
    for segment in segments {
        let (start, end) = segment.extent();
        match pieces.last_mut() {
            Some(piece) if start <= reach + tolerance => piece.segments.push(segment),
            _ => pieces.push(GridLine {
                orientation: line.orientation,
                coordinate: line.coordinate,
                segments: vec![segment],
            }),
        }
        reach = reach.max(end);
    }
    pieces
}

fn lines_bbox<'a>(lines: impl Iterator<Item = &'a GridLine>) -> BBox {
    lines
        .map(|line| {
            let (start, end) = line.extent();
            match line.orientation {
                Orientation::Horizontal => BBox::new(start, line.coordinate, end, line.coordinate),
                Orientation::Vertical => BBox::new(line.coordinate, start, line.coordinate, end),
            }
        })
        .reduce(|acc, bbox| acc.union(&bbox))
        .unwrap_or(BBox::new(0.0, 0.0, 0.0, 0.0))
}

fn no_table(
    page: usize,
    region: Option<usize>,
    horizontal_lines: usize,
    vertical_lines: usize,
) -> Diagnostic {
    let reason = if horizontal_lines < 2 {
        "fewer than 2 horizontal lines"
    } else {
        "fewer than 2 vertical lines"
    };
    Diagnostic::NoTableFound {
        page,
        region,
        horizontal_lines,
        vertical_lines,
        reason: reason.to_string(),
    }
}
