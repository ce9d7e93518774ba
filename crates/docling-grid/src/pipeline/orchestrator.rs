/// Table extraction orchestrator
///
/// Runs the stages for every page: ruling lines once per page, then grid
/// building, text assignment and structuring for each table region.
/// Regions and pages are independent and run on the rayon pool; results keep
/// input order.
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::diagnostics::{AmbiguousBoundary, Diagnostic};
use crate::error::Result;
use crate::pipeline::{
    types::{GridOutcome, TableRegion},
    RulingSource, Stage01LineConsolidator, Stage02RegionSplitter, Stage03GridBuilder,
    Stage04CellAssigner, Stage05TableStructurer,
};
use crate::table::{ExtractedTable, Table, TableStatus};
use crate::types::PageInput;

/// Tables and diagnostics of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub page_number: usize,
    /// Top to bottom, then left to right
    pub tables: Vec<ExtractedTable>,
    pub diagnostics: Vec<Diagnostic>,
    /// Non-blank fragments that fell outside every table
    pub unassigned_fragments: usize,
}

/// What one region turned into
enum RegionOutcome {
    Table {
        table: Table,
        bbox: crate::types::BBox,
        ambiguities: Vec<AmbiguousBoundary>,
        assigned_fragments: Vec<usize>,
    },
    Rejected(Diagnostic),
}

/// Extracts typed tables from ruled page primitives.
///
/// # Examples
///
/// ```
/// use docling_grid::{CharFragment, GridConfig, LineSegment, PageInput, TableExtractor};
///
/// let mut page = PageInput::new(1);
/// for y in [0.0, 10.0, 20.0] {
///     page.segments.push(LineSegment::horizontal(y, 0.0, 60.0));
/// }
/// for x in [0.0, 30.0, 60.0] {
///     page.segments.push(LineSegment::vertical(x, 0.0, 20.0));
/// }
/// page.fragments.push(CharFragment::new("Name", 2.0, 2.0, 20.0, 8.0));
/// page.fragments.push(CharFragment::new("Score", 32.0, 2.0, 50.0, 8.0));
/// page.fragments.push(CharFragment::new("Ada", 2.0, 12.0, 20.0, 18.0));
/// page.fragments.push(CharFragment::new("97", 32.0, 12.0, 40.0, 18.0));
///
/// let extractor = TableExtractor::new(GridConfig::default()).unwrap();
/// let result = extractor.extract_page(&page).unwrap();
/// let table = &result.tables[0].table;
/// assert_eq!(table.headers, vec!["Name", "Score"]);
/// assert_eq!(table.rows.len(), 1);
/// ```
#[derive(Clone)]
pub struct TableExtractor {
    config: GridConfig,
    ruling_source: Arc<dyn RulingSource>,
    stage02: Stage02RegionSplitter,
    stage03: Stage03GridBuilder,
    stage04: Stage04CellAssigner,
    stage05: Stage05TableStructurer,
}

impl fmt::Debug for TableExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableExtractor")
            .field("config", &self.config)
            .field("ruling_source", &self.ruling_source.name())
            .finish_non_exhaustive()
    }
}

impl TableExtractor {
    /// Create an extractor after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidConfig`](crate::GridError::InvalidConfig) if a
    /// value is out of range.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ruling_source: Arc::new(Stage01LineConsolidator::with_config((&config).into())),
            stage02: Stage02RegionSplitter::with_config((&config).into()),
            stage03: Stage03GridBuilder::with_config((&config).into()),
            stage04: Stage04CellAssigner::with_config((&config).into()),
            stage05: Stage05TableStructurer::with_config((&config).into()),
            config,
        })
    }

    /// Replace the line consolidator with another source of ruling lines.
    #[must_use = "returns the extractor with the new ruling source"]
    pub fn with_ruling_source(mut self, source: Arc<dyn RulingSource>) -> Self {
        self.ruling_source = source;
        self
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Extract every table on one page.
    ///
    /// Recoverable conditions are returned as diagnostics in the result and
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidGeometry`](crate::GridError::InvalidGeometry)
    /// when the page's primitives cannot be used.
    pub fn extract_page(&self, input: &PageInput) -> Result<PageResult> {
        let page = input.to_top_left()?;
        let page_number = page.page_number;

        debug!(
            "Page {page_number}: {} segment(s), {} fragment(s) via {}",
            page.segments.len(),
            page.fragments.len(),
            self.ruling_source.name()
        );
        let lines = self.ruling_source.ruling_lines(&page)?;
        let split = self.stage02.process(page_number, lines);

        let outcomes: Vec<RegionOutcome> = split
            .regions
            .par_iter()
            .map(|region| self.process_region(&page, region))
            .collect();

        let mut diagnostics = split.diagnostics;
        let mut tables = Vec::new();
        let mut assigned: HashSet<usize> = HashSet::new();

        for outcome in outcomes {
            match outcome {
                RegionOutcome::Rejected(diagnostic) => diagnostics.push(diagnostic),
                RegionOutcome::Table {
                    table,
                    bbox,
                    ambiguities,
                    assigned_fragments,
                } => {
                    let table_index = tables.len() + 1;
                    assigned.extend(assigned_fragments);

                    diagnostics.extend(ambiguities.iter().map(|&boundary| {
                        Diagnostic::AmbiguousGrid {
                            page: page_number,
                            table_index,
                            boundary,
                        }
                    }));
                    diagnostics.extend(
                        table
                            .profiles
                            .iter()
                            .enumerate()
                            .filter(|(_, profile)| profile.fallback)
                            .map(|(column, _)| Diagnostic::TypeInferenceFallback {
                                page: page_number,
                                table_index,
                                column,
                                header: table.headers[column].clone(),
                            }),
                    );

                    let status = if ambiguities.is_empty() {
                        TableStatus::Complete
                    } else {
                        TableStatus::Partial
                    };
                    tables.push(ExtractedTable {
                        page_number,
                        table_index,
                        bbox,
                        status,
                        table,
                    });
                }
            }
        }

        let unassigned_fragments = page
            .fragments
            .iter()
            .enumerate()
            .filter(|(idx, fragment)| !fragment.text.trim().is_empty() && !assigned.contains(idx))
            .count();
        if unassigned_fragments > 0 {
            diagnostics.push(Diagnostic::UnassignedText {
                page: page_number,
                count: unassigned_fragments,
            });
        }

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        info!("Page {page_number}: {} table(s) extracted", tables.len());

        Ok(PageResult {
            page_number,
            tables,
            diagnostics,
            unassigned_fragments,
        })
    }

    /// Extract every page in parallel; one result per page, in input order.
    #[must_use = "returns one result per page"]
    pub fn extract_pages(&self, pages: &[PageInput]) -> Vec<Result<PageResult>> {
        pages.par_iter().map(|page| self.extract_page(page)).collect()
    }

    fn process_region(&self, page: &PageInput, region: &TableRegion) -> RegionOutcome {
        let grid = match self.stage03.process(region) {
            GridOutcome::Built(grid) => grid,
            GridOutcome::Rejected { reason } => {
                return RegionOutcome::Rejected(Diagnostic::NoTableFound {
                    page: page.page_number,
                    region: Some(region.index),
                    horizontal_lines: region.horizontal.len(),
                    vertical_lines: region.vertical.len(),
                    reason,
                });
            }
        };
        let (n_rows, n_cols) = (grid.lattice.unit_rows(), grid.lattice.unit_cols());
        let bbox = grid.lattice.bbox();

        let assigned = self.stage04.process(grid.cells, &page.fragments);
        let table = self.stage05.process(assigned.cells, n_rows, n_cols);

        RegionOutcome::Table {
            table,
            bbox,
            ambiguities: grid.ambiguities,
            assigned_fragments: assigned.assigned_fragments,
        }
    }
}
