//! Error types for grid table extraction.
//!
//! Only conditions that make a page's primitives unusable are errors. Everything
//! the engine can recover from (missing ruling lines, ambiguous merges, stray
//! text, weak column types) is reported as a [`Diagnostic`](crate::Diagnostic)
//! next to the result instead.

use thiserror::Error;

/// Fatal error for one page or for the run configuration.
///
/// # Examples
///
/// ```
/// use docling_grid::{GridConfig, GridError, PageInput, TableExtractor};
///
/// let extractor = TableExtractor::new(GridConfig::default()).unwrap();
/// let mut page = PageInput::new(3);
/// page.height = f64::NAN;
/// page.origin = docling_grid::Origin::BottomLeft;
///
/// match extractor.extract_page(&page) {
///     Err(GridError::InvalidGeometry { page, .. }) => assert_eq!(page, 3),
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum GridError {
    /// Input primitives violate coordinate invariants (non-finite values,
    /// unusable page height).
    ///
    /// The caller decides whether to abort or continue with remaining pages.
    #[error("Invalid geometry on page {page}: {reason}")]
    InvalidGeometry {
        /// 1-based page number the primitives came from
        page: usize,
        /// What was wrong with the primitives
        reason: String,
    },

    /// Configuration values out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O error while loading configuration or writing output.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// CSV rendering error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Rendered output was not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

impl GridError {
    /// Build an [`GridError::InvalidGeometry`] for `page`.
    #[inline]
    #[must_use = "returns the error value"]
    pub fn geometry(page: usize, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            page,
            reason: reason.into(),
        }
    }

    /// Returns true if the error concerns one page's primitives only.
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_page_error(&self) -> bool {
        matches!(self, Self::InvalidGeometry { .. })
    }

    /// Page number for page-scoped errors.
    #[inline]
    #[must_use = "returns the page number, if any"]
    pub const fn page(&self) -> Option<usize> {
        match self {
            Self::InvalidGeometry { page, .. } => Some(*page),
            _ => None,
        }
    }
}

/// Type alias for [`Result<T, GridError>`].
pub type Result<T> = std::result::Result<T, GridError>;
