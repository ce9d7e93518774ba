//! # Docling Grid - Ruled Table Reconstruction
//!
//! Turns the geometric primitives of a page (line segments, rectangles and
//! positioned text fragments) into typed tables. It handles tables whose
//! structure is drawn with ruling lines, including cells that span rows or
//! columns because a divider is missing.
//!
//! ## Quick Start
//!
//! ```
//! use docling_grid::{
//!     CharFragment, GridConfig, LineSegment, MarkdownSerializer, PageInput, TableExtractor,
//! };
//!
//! let mut page = PageInput::new(1);
//! for y in [0.0, 10.0, 20.0] {
//!     page.segments.push(LineSegment::horizontal(y, 0.0, 60.0));
//! }
//! for x in [0.0, 30.0, 60.0] {
//!     page.segments.push(LineSegment::vertical(x, 0.0, 20.0));
//! }
//! page.fragments.push(CharFragment::new("Item", 2.0, 2.0, 20.0, 8.0));
//! page.fragments.push(CharFragment::new("Qty", 32.0, 2.0, 50.0, 8.0));
//! page.fragments.push(CharFragment::new("Apples", 2.0, 12.0, 20.0, 18.0));
//! page.fragments.push(CharFragment::new("1,200", 32.0, 12.0, 50.0, 18.0));
//!
//! let extractor = TableExtractor::new(GridConfig::default())?;
//! let result = extractor.extract_page(&page)?;
//! let markdown = MarkdownSerializer::new().serialize_tables(&result.tables);
//! assert!(markdown.contains("|  1200 |"));
//! # Ok::<(), docling_grid::GridError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. **Line consolidation:** segments within ε of each other become one
//!    ruling line.
//! 2. **Region splitting:** crossing lines group into candidate tables.
//! 3. **Grid building:** line coordinates give a lattice; missing dividers
//!    merge lattice units into spanning cells.
//! 4. **Cell assignment:** each text fragment goes to the cell containing its
//!    center.
//! 5. **Table structuring:** header detection, column types, normalized
//!    values.
//!
//! See [`pipeline`] for the stage types. Anything recoverable is reported as a
//! [`Diagnostic`] next to the result; only unusable input is a [`GridError`].

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod infer;
pub mod pipeline;
pub mod serializer;
pub mod table;
pub mod types;

pub use config::{GridConfig, HeaderDetection, DEFAULT_DATE_FORMATS};
pub use diagnostics::{AmbiguityReason, AmbiguousBoundary, Diagnostic};
pub use error::{GridError, Result};
pub use grid::{Cell, GridLine, Lattice};
pub use pipeline::{PageResult, RulingLines, RulingSource, TableExtractor};
pub use serializer::{
    parse_json_tables, parse_markdown_tables, CsvOptions, CsvSerializer, JsonOptions,
    JsonSerializer, JsonTable, MarkdownOptions, MarkdownSerializer, MarkdownTable,
};
pub use table::{
    ColumnType, ColumnTypeProfile, ExtractedTable, NormalizationRule, Table, TableStatus,
    TypedValue,
};
pub use types::{BBox, CharFragment, LineSegment, Orientation, Origin, PageInput, Rect};
