// Stage 5: Table Structuring

use std::collections::HashSet;

use log::{debug, trace};

use crate::config::{GridConfig, HeaderDetection};
use crate::grid::Cell;
use crate::infer::{classify, infer_column, normalize};
use crate::table::{ColumnType, ColumnTypeProfile, Table, TypedValue};

/// Configuration for Stage 5 (Table Structuring)
#[derive(Debug, Clone, PartialEq)]
pub struct Stage05Config {
    pub header_detection: HeaderDetection,
    /// chrono patterns tried in order
    pub date_formats: Vec<String>,
    /// Winning column type must hold at least this share of non-empty cells
    pub min_type_share: f64,
}

impl Default for Stage05Config {
    #[inline]
    fn default() -> Self {
        Self::from(&GridConfig::default())
    }
}

impl From<&GridConfig> for Stage05Config {
    #[inline]
    fn from(config: &GridConfig) -> Self {
        Self {
            header_detection: config.header_detection,
            date_formats: config.date_formats.clone(),
            min_type_share: config.min_type_share,
        }
    }
}

/// Stage 5: Table Structurer
///
/// Lays the cells of one region out as rows, picks the header, infers one
/// [`ColumnType`] per column and normalizes every body value under it.
///
/// A spanning cell's text is repeated in every lattice position it covers so
/// the rows stay rectangular, but only its top-left position votes during
/// type inference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage05TableStructurer {
    config: Stage05Config,
}

impl Stage05TableStructurer {
    /// Create a new table structurer with default configuration
    #[inline]
    #[must_use = "returns a new Stage05TableStructurer instance"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table structurer with custom configuration
    #[inline]
    #[must_use = "returns a new Stage05TableStructurer with custom config"]
    pub const fn with_config(config: Stage05Config) -> Self {
        Self { config }
    }

    /// Structure the cells of a `n_rows x n_cols` lattice into a typed table.
    #[must_use = "returns the typed table"]
    pub fn process(&self, cells: Vec<Cell>, n_rows: usize, n_cols: usize) -> Table {
        // owner index per lattice unit
        let mut owner = vec![vec![usize::MAX; n_cols]; n_rows];
        for (idx, cell) in cells.iter().enumerate() {
            for row in owner.iter_mut().skip(cell.row).take(cell.row_span) {
                for slot in row.iter_mut().skip(cell.col).take(cell.col_span) {
                    *slot = idx;
                }
            }
        }
        let text_at = |row: usize, col: usize| {
            cells.get(owner[row][col]).map_or("", |c| c.text.as_str())
        };
        let is_origin = |row: usize, col: usize| {
            cells
                .get(owner[row][col])
                .is_some_and(|c| c.row == row && c.col == col)
        };

        // body profiles when the first row is taken as the header
        let profiles_from = |body_start: usize| -> Vec<ColumnTypeProfile> {
            (0..n_cols)
                .map(|col| {
                    let voters = (body_start..n_rows)
                        .filter(|&row| is_origin(row, col))
                        .map(|row| text_at(row, col));
                    infer_column(voters, &self.config.date_formats, self.config.min_type_share)
                })
                .collect()
        };

        let mut profiles = None;
        let header_detected = n_rows > 0
            && match self.config.header_detection {
                HeaderDetection::Always => true,
                HeaderDetection::Never => false,
                HeaderDetection::Auto if n_rows < 2 => false,
                HeaderDetection::Auto => {
                    let body = profiles_from(1);
                    let label_types: Vec<Option<ColumnType>> = (0..n_cols)
                        .map(|col| classify(text_at(0, col), &self.config.date_formats))
                        .collect();
                    let detected = self.looks_like_header(&cells, &label_types, &body);
                    if detected {
                        profiles = Some(body);
                    }
                    detected
                }
            };
        let body_start = usize::from(header_detected);
        let profiles = profiles.unwrap_or_else(|| profiles_from(body_start));

        let headers = if header_detected {
            unique_headers((0..n_cols).map(|col| text_at(0, col)))
        } else {
            positional_headers(n_cols)
        };

        let columns: Vec<Vec<TypedValue>> = profiles
            .iter()
            .enumerate()
            .map(|(col, profile)| {
                trace!(
                    "Stage05: column {col} ('{}') -> {} ({}/{} cells)",
                    headers[col],
                    profile.column_type,
                    profile.support,
                    profile.non_empty
                );
                (body_start..n_rows)
                    .map(|row| {
                        normalize(text_at(row, col), profile.column_type, &self.config.date_formats)
                    })
                    .collect()
            })
            .collect();

        let rows: Vec<Vec<TypedValue>> = (0..n_rows - body_start)
            .map(|row| columns.iter().map(|column| column[row].clone()).collect())
            .collect();

        debug!(
            "Stage05: {} body row(s) x {n_cols} column(s), header {}",
            rows.len(),
            if header_detected { "detected" } else { "not detected" }
        );

        Table {
            headers,
            header_detected,
            profiles,
            rows,
            cells,
        }
    }

    /// First row reads as column labels when every label cell is non-numeric
    /// (text or date), at least one is non-empty, and the labels' types differ
    /// from the body's inferred types in at least one column.
    ///
    /// A spanning label cell is judged once, by its origin.
    fn looks_like_header(
        &self,
        cells: &[Cell],
        label_types: &[Option<ColumnType>],
        body: &[ColumnTypeProfile],
    ) -> bool {
        let mut any_label = false;
        for cell in cells.iter().filter(|cell| cell.row == 0) {
            match classify(&cell.text, &self.config.date_formats) {
                None => {}
                Some(ColumnType::String | ColumnType::Date) => any_label = true,
                Some(_) => return false,
            }
        }
        any_label
            && label_types
                .iter()
                .zip(body)
                .any(|(label, profile)| label.is_some_and(|kind| kind != profile.column_type))
    }

    /// Get stage name for logging
    #[inline]
    #[must_use = "returns the stage name for logging"]
    pub const fn stage_name(&self) -> &'static str {
        "Stage05_TableStructurer"
    }
}

/// `"0"`, `"1"`, ... for tables without a header row
#[must_use]
pub fn positional_headers(n_cols: usize) -> Vec<String> {
    (0..n_cols).map(|col| col.to_string()).collect()
}

/// Header labels with empty ones replaced by their position and repeats
/// suffixed `_2`, `_3`, ...
fn unique_headers<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    labels
        .enumerate()
        .map(|(col, label)| {
            let base = if label.is_empty() {
                col.to_string()
            } else {
                label.to_string()
            };
            let mut name = base.clone();
            let mut suffix = 2;
            while seen.contains(&name) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            seen.insert(name.clone());
            name
        })
        .collect()
}
