//! Extraction configuration.
//!
//! One [`GridConfig`] value is shared read-only by every stage and every worker
//! thread. It can be built in code or loaded from TOML:
//!
//! ```toml
//! line_merge_tolerance = 2.5
//! min_rows = 2
//! header_detection = "always"
//! date_formats = ["%Y-%m-%d", "%d.%m.%Y"]
//! ```

use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// How the first table row is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderDetection {
    /// Header if the first row is distinct text labels
    #[default]
    Auto,
    /// First row is always the header
    Always,
    /// Never a header; positional column names are used
    Never,
}

impl std::str::FromStr for HeaderDetection {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(GridError::InvalidConfig(format!(
                "header_detection must be auto, always or never (got '{other}')"
            ))),
        }
    }
}

/// Default chrono patterns tried, in order, when classifying dates.
///
/// Day-first patterns precede month-first ones, so `03/04/2024` is 3 April.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

/// Tolerances, thresholds and inference rules for table extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// ε: segments whose perpendicular coordinates differ by less than this
    /// become one ruling line
    pub line_merge_tolerance: f64,
    /// Gap along a line that still counts as continuous ink
    pub join_tolerance: f64,
    /// Slack when deciding whether a horizontal and a vertical line meet
    pub intersection_tolerance: f64,
    /// Consolidated lines shorter than this are discarded
    pub edge_min_length: f64,
    /// Divider coverage at or below this ratio means "no line here"
    pub absent_evidence_ratio: f64,
    /// Divider coverage at or above this ratio means "line present"
    pub full_evidence_ratio: f64,
    /// Minimum lattice unit rows for a region to count as a table
    pub min_rows: usize,
    /// Minimum lattice unit columns for a region to count as a table
    pub min_cols: usize,
    /// Fragments whose vertical centers differ by at most this share a text line
    pub line_tolerance: f64,
    /// When set, same-line fragments closer than this are joined without a space
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_join_tolerance: Option<f64>,
    /// chrono patterns tried in order for date classification
    pub date_formats: Vec<String>,
    /// Winning column type must hold at least this share of non-empty cells
    pub min_type_share: f64,
    pub header_detection: HeaderDetection,
}

impl Default for GridConfig {
    #[inline]
    fn default() -> Self {
        Self {
            line_merge_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            edge_min_length: 3.0,
            absent_evidence_ratio: 0.1,
            full_evidence_ratio: 0.9,
            min_rows: 1,
            min_cols: 1,
            line_tolerance: 3.0,
            char_join_tolerance: None,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(ToString::to_string).collect(),
            min_type_share: 0.5,
            header_detection: HeaderDetection::Auto,
        }
    }
}

impl GridConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::TomlError`] for syntax errors and
    /// [`GridError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, otherwise as
    /// [`GridConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Render as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidConfig`] if a value cannot be represented.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GridError::InvalidConfig(e.to_string()))
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidConfig`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        let tolerances = [
            ("line_merge_tolerance", self.line_merge_tolerance),
            ("join_tolerance", self.join_tolerance),
            ("intersection_tolerance", self.intersection_tolerance),
            ("edge_min_length", self.edge_min_length),
            ("line_tolerance", self.line_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        if self.line_merge_tolerance == 0.0 {
            return Err(invalid("line_merge_tolerance must be greater than 0"));
        }
        if let Some(value) = self.char_join_tolerance {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "char_join_tolerance must be a finite, non-negative number (got {value})"
                )));
            }
        }

        for (name, value) in [
            ("absent_evidence_ratio", self.absent_evidence_ratio),
            ("full_evidence_ratio", self.full_evidence_ratio),
            ("min_type_share", self.min_type_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must be within 0..=1 (got {value})")));
            }
        }
        if self.absent_evidence_ratio >= self.full_evidence_ratio {
            return Err(invalid(format!(
                "absent_evidence_ratio ({}) must be below full_evidence_ratio ({})",
                self.absent_evidence_ratio, self.full_evidence_ratio
            )));
        }

        if self.min_rows == 0 || self.min_cols == 0 {
            return Err(invalid("min_rows and min_cols must be at least 1"));
        }

        for format in &self.date_formats {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(invalid(format!("invalid date format '{format}'")));
            }
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> GridError {
    GridError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.line_merge_tolerance, 3.0);
        assert_eq!(config.header_detection, HeaderDetection::Auto);
        assert_eq!(config.date_formats.len(), DEFAULT_DATE_FORMATS.len());
    }

    #[test]
    fn test_from_toml_partial_overrides() {
        let config = GridConfig::from_toml_str(
            r#"
            line_merge_tolerance = 1.5
            min_rows = 2
            header_detection = "never"
            date_formats = ["%d.%m.%Y"]
            "#,
        )
        .unwrap();

        assert_eq!(config.line_merge_tolerance, 1.5);
        assert_eq!(config.min_rows, 2);
        assert_eq!(config.min_cols, 1);
        assert_eq!(config.header_detection, HeaderDetection::Never);
        assert_eq!(config.date_formats, vec!["%d.%m.%Y".to_string()]);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GridConfig {
            char_join_tolerance: Some(0.5),
            ..GridConfig::default()
        };
        let rendered = config.to_toml_string().unwrap();
        let parsed = GridConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            "line_merge_tolerance = 0.0",
            "join_tolerance = -1.0",
            "absent_evidence_ratio = 0.95",
            "full_evidence_ratio = 1.5",
            "min_cols = 0",
            "min_type_share = 2.0",
            "date_formats = [\"%Q\"]",
        ];
        for case in cases {
            let err = GridConfig::from_toml_str(case).unwrap_err();
            assert!(
                matches!(err, GridError::InvalidConfig(_)),
                "expected InvalidConfig for {case}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_syntax_error_is_toml_error() {
        let err = GridConfig::from_toml_str("min_rows = ").unwrap_err();
        assert!(matches!(err, GridError::TomlError(_)));
    }

    #[test]
    fn test_header_detection_from_str() {
        assert_eq!("AUTO".parse::<HeaderDetection>().unwrap(), HeaderDetection::Auto);
        assert_eq!(
            "always".parse::<HeaderDetection>().unwrap(),
            HeaderDetection::Always
        );
        assert!("sometimes".parse::<HeaderDetection>().is_err());
    }
}
