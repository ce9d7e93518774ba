//! # Extraction pipeline
//!
//! Each stage has its own input and output types and a `StageNNConfig` view of
//! [`GridConfig`](crate::GridConfig), so it can be built and tested on its own.
//! [`TableExtractor`] chains them for whole pages.
//!
//! ## Stages
//!
//! ### Stage 1: Line Consolidation ([`Stage01LineConsolidator`])
//! - **Input:** raw line segments of a page (rect edges included)
//! - **Process:** merges segments closer than ε into canonical lines
//! - **Output:** [`RulingLines`]
//! - Reached through the [`RulingSource`] trait
//!
//! ### Stage 2: Region Splitting ([`Stage02RegionSplitter`])
//! - **Input:** ruling lines of the page
//! - **Process:** connected components of crossing lines
//! - **Output:** one [`TableRegion`] per candidate table
//!
//! ### Stage 3: Grid Building ([`Stage03GridBuilder`])
//! - **Input:** one region
//! - **Process:** lattice from the line coordinates, spanning cells where
//!   dividers are missing
//! - **Output:** [`BuiltGrid`] whose cells partition the lattice
//!
//! ### Stage 4: Cell Assignment ([`Stage04CellAssigner`])
//! - **Input:** cells, page text fragments
//! - **Process:** center containment, reading-order join
//! - **Output:** [`AssignedCells`]
//!
//! ### Stage 5: Table Structuring ([`Stage05TableStructurer`])
//! - **Input:** cells with text
//! - **Process:** header detection, column type inference, normalization
//! - **Output:** [`Table`](crate::Table)
//!
//! Regions of one page, and pages of one run, share nothing mutable and are
//! processed in parallel.

pub mod orchestrator;
pub mod stage01_line_consolidator;
pub mod stage02_region_splitter;
pub mod stage03_grid_builder;
pub mod stage04_cell_assigner;
pub mod stage05_table_structurer;
pub mod types;

pub use orchestrator::{PageResult, TableExtractor};
pub use stage01_line_consolidator::{RulingSource, Stage01Config, Stage01LineConsolidator};
pub use stage02_region_splitter::{Stage02Config, Stage02Output, Stage02RegionSplitter};
pub use stage03_grid_builder::{Stage03Config, Stage03GridBuilder};
pub use stage04_cell_assigner::{Stage04CellAssigner, Stage04Config};
pub use stage05_table_structurer::{positional_headers, Stage05Config, Stage05TableStructurer};
pub use types::{AssignedCells, BuiltGrid, GridOutcome, RulingLines, TableRegion};
