//! The typed tabular model handed to serializers.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::types::BBox;

/// Inferred data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Decimal,
    Percentage,
    Currency,
    Date,
    String,
}

impl ColumnType {
    pub const ALL: [Self; 6] = [
        Self::Integer,
        Self::Decimal,
        Self::Percentage,
        Self::Currency,
        Self::Date,
        Self::String,
    ];

    /// Rank used to break ties between equally supported types; higher wins.
    #[inline]
    #[must_use]
    pub const fn specificity(self) -> u8 {
        match self {
            Self::Currency => 6,
            Self::Percentage => 5,
            Self::Date => 4,
            Self::Decimal => 3,
            Self::Integer => 2,
            Self::String => 1,
        }
    }

    /// Integer, decimal, percentage or currency
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Decimal | Self::Percentage | Self::Currency
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Percentage => "percentage",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::String => "string",
        }
    }

    /// How cells of this type are cleaned
    #[must_use]
    pub const fn rule(self) -> NormalizationRule {
        match self {
            Self::Integer => NormalizationRule::ParseInteger,
            Self::Decimal => NormalizationRule::ParseDecimal,
            Self::Percentage => NormalizationRule::PercentToFraction,
            Self::Currency => NormalizationRule::SplitCurrencySymbol,
            Self::Date => NormalizationRule::ParseDate,
            Self::String => NormalizationRule::TrimText,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown column type '{s}'"))
    }
}

/// Normalization applied to every cell of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRule {
    /// Strip sign/thousands separators, parse `i64`
    ParseInteger,
    /// Strip thousands separators, parse `f64`
    ParseDecimal,
    /// Strip `%`, store value / 100
    PercentToFraction,
    /// Separate the currency symbol from the amount
    SplitCurrencySymbol,
    /// Parse with the configured date patterns
    ParseDate,
    /// Keep trimmed text
    TrimText,
}

/// Inferred type of one column and the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTypeProfile {
    pub column_type: ColumnType,
    pub rule: NormalizationRule,
    /// Non-empty cells examined
    pub non_empty: usize,
    /// Cells whose own classification supports `column_type`
    pub support: usize,
    /// No type reached the required share; typed as string
    pub fallback: bool,
}

impl ColumnTypeProfile {
    #[must_use]
    pub const fn new(column_type: ColumnType, non_empty: usize, support: usize) -> Self {
        Self {
            column_type,
            rule: column_type.rule(),
            non_empty,
            support,
            fallback: false,
        }
    }

    /// String profile used when no type is clear
    #[must_use]
    pub const fn fallback(non_empty: usize, support: usize) -> Self {
        Self {
            column_type: ColumnType::String,
            rule: NormalizationRule::TrimText,
            non_empty,
            support,
            fallback: true,
        }
    }
}

/// Normalized value of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Empty,
    Integer(i64),
    Decimal(f64),
    /// Fraction: `"10%"` is stored as `0.10`
    Percentage(f64),
    Currency {
        amount: f64,
        /// Symbol or ISO code as written; `None` for bare amounts
        symbol: Option<String>,
    },
    Date(NaiveDate),
    Text(String),
    /// Raw text that did not parse under the column's type
    Unparsed(String),
}

impl TypedValue {
    /// Kept raw because it failed the column's type
    #[inline]
    #[must_use]
    pub const fn is_unparsed(&self) -> bool {
        matches!(self, Self::Unparsed(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric value, percentages as fractions
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Decimal(v) | Self::Percentage(v) => Some(*v),
            Self::Currency { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Canonical text shared by the Markdown and CSV renderers.
    ///
    /// Re-classifying this text under the column's type yields the same value.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Integer(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
            Self::Percentage(fraction) => format!("{}%", format_number(fraction * 100.0)),
            Self::Currency { amount, symbol } => match symbol {
                Some(code) if code.chars().all(|c| c.is_ascii_alphabetic()) => {
                    format!("{amount} {code}")
                }
                Some(sym) => format!("{sym}{amount}"),
                None => amount.to_string(),
            },
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
            Self::Text(text) | Self::Unparsed(text) => text.clone(),
        }
    }

    /// Approximate equality: numbers within `tolerance`, everything else exact
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (Self::Decimal(a), Self::Decimal(b)) | (Self::Percentage(a), Self::Percentage(b)) => {
                (a - b).abs() <= tolerance
            }
            (
                Self::Currency {
                    amount: a,
                    symbol: sa,
                },
                Self::Currency {
                    amount: b,
                    symbol: sb,
                },
            ) => sa == sb && (a - b).abs() <= tolerance,
            _ => self == other,
        }
    }
}

/// Shortest decimal form, with float noise from `x * 100` style math rounded off.
#[must_use]
pub fn format_number(value: f64) -> String {
    let scaled = value * 1e9;
    let rounded = if scaled.is_finite() && value.abs() < 1e12 {
        scaled.round() / 1e9
    } else {
        value
    };
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

/// Typed table for one region.
///
/// `rows` is rectangular: a spanning cell's value is repeated in every lattice
/// position it covers. Only the cell's origin position counts for inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names; positional (`"0"`, `"1"`, ...) when no header row was used
    pub headers: Vec<String>,
    pub header_detected: bool,
    pub profiles: Vec<ColumnTypeProfile>,
    /// Body rows
    pub rows: Vec<Vec<TypedValue>>,
    /// Source cells with their text, header row included
    pub cells: Vec<Cell>,
}

impl Table {
    #[inline]
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn num_cols(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub fn column_types(&self) -> Vec<ColumnType> {
        self.profiles.iter().map(|p| p.column_type).collect()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&TypedValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Column values top to bottom
    pub fn column(&self, col: usize) -> impl Iterator<Item = &TypedValue> {
        self.rows.iter().filter_map(move |r| r.get(col))
    }

    /// Number of cells kept raw because they failed their column's type
    #[must_use]
    pub fn unparsed_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|v| v.is_unparsed())
            .count()
    }
}

/// Whether the grid was reconstructed without conservative decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Complete,
    /// Some dividers were ambiguous and kept apart
    Partial,
}

/// One table found on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub page_number: usize,
    /// 1-based index among the tables of the page, top to bottom
    pub table_index: usize,
    pub bbox: BBox,
    pub status: TableStatus,
    pub table: Table,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_values() {
        assert_eq!(TypedValue::Empty.render(), "");
        assert_eq!(TypedValue::Integer(-1200).render(), "-1200");
        assert_eq!(TypedValue::Decimal(3.25).render(), "3.25");
        assert_eq!(TypedValue::Decimal(1200.0).render(), "1200");
        assert_eq!(TypedValue::Percentage(0.07).render(), "7%");
        assert_eq!(TypedValue::Percentage(0.125).render(), "12.5%");
        assert_eq!(
            TypedValue::Currency {
                amount: 1200.5,
                symbol: Some("$".to_string())
            }
            .render(),
            "$1200.5"
        );
        assert_eq!(
            TypedValue::Currency {
                amount: 10.0,
                symbol: Some("EUR".to_string())
            }
            .render(),
            "10 EUR"
        );
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(TypedValue::Date(date).render(), "2024-03-09");
        assert_eq!(TypedValue::Unparsed("n/a".to_string()).render(), "n/a");
    }

    #[test]
    fn test_format_number_strips_float_noise() {
        assert_eq!(format_number(0.07 * 100.0), "7");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_approx_eq() {
        assert!(TypedValue::Percentage(0.1).approx_eq(&TypedValue::Percentage(0.1 + 1e-12), 1e-9));
        assert!(!TypedValue::Decimal(1.0).approx_eq(&TypedValue::Decimal(1.1), 1e-9));
        assert!(TypedValue::Integer(3).approx_eq(&TypedValue::Integer(3), 0.0));
        assert!(!TypedValue::Integer(3).approx_eq(&TypedValue::Decimal(3.0), 1.0));
    }

    #[test]
    fn test_column_type_parse_and_rank() {
        assert_eq!("percentage".parse::<ColumnType>().unwrap(), ColumnType::Percentage);
        assert!("money".parse::<ColumnType>().is_err());
        assert!(ColumnType::Currency.specificity() > ColumnType::String.specificity());
        assert!(ColumnType::Date.specificity() > ColumnType::Decimal.specificity());
        assert!(!ColumnType::Date.is_numeric());
        assert_eq!(ColumnType::Percentage.rule(), NormalizationRule::PercentToFraction);
    }

    #[test]
    fn test_table_accessors() {
        let table = Table {
            headers: vec!["a".to_string(), "b".to_string()],
            header_detected: true,
            profiles: vec![
                ColumnTypeProfile::new(ColumnType::Integer, 2, 2),
                ColumnTypeProfile::fallback(2, 1),
            ],
            rows: vec![
                vec![TypedValue::Integer(1), TypedValue::Text("x".to_string())],
                vec![TypedValue::Integer(2), TypedValue::Unparsed("?".to_string())],
            ],
            cells: Vec::new(),
        };
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 2);
        assert_eq!(table.get(1, 0), Some(&TypedValue::Integer(2)));
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.column(0).count(), 2);
        assert_eq!(table.unparsed_count(), 1);
        assert_eq!(
            table.column_types(),
            vec![ColumnType::Integer, ColumnType::String]
        );
    }
}
