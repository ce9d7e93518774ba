//! Column type inference and value normalization.
//!
//! Classification is an explicit function from cell text to a [`ColumnType`];
//! each type carries one normalization rule. Rules, first match wins:
//!
//! 1. number followed by `%` → percentage
//! 2. number with a currency symbol or ISO code before or after it → currency
//! 3. number without fraction/exponent → integer, otherwise decimal
//! 4. parseable by one of the configured date patterns → date
//! 5. anything else → string
//!
//! Numbers accept a leading sign, `,` thousands separators in groups of three and
//! accounting negatives such as `(1,200)`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::{ColumnType, ColumnTypeProfile, TypedValue};

static NUMBER_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:,\d{3})+|\d+)?(?:\.\d+)?(?:[eE][+-]?\d+)?$")
        .expect("valid number regex")
});

/// Currency signs recognized before or after an amount.
const CURRENCY_SYMBOLS: &[&str] = &[
    "US$", "$", "€", "£", "¥", "₹", "₩", "₽", "₺", "₫", "¢", "R$", "Fr.",
];

/// ISO 4217 codes recognized before or after an amount.
const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CHF", "CAD", "AUD", "CNY", "INR", "SEK", "NOK", "DKK",
];

/// Parsed plain number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub value: f64,
    /// Set when the text had no fraction/exponent and fits in `i64`
    pub integer: Option<i64>,
}

/// Parse a plain number (no `%`, no currency).
#[must_use]
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        let inner = inner.trim();
        if inner.starts_with(['-', '+', '\u{2212}']) {
            return None;
        }
        return parse_number(inner).map(|n| Number {
            value: -n.value,
            integer: n.integer.and_then(i64::checked_neg),
        });
    }

    let (negative, body) = if let Some(rest) = text.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('\u{2212}') {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix('+') {
        (false, rest)
    } else {
        (false, text)
    };

    if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !NUMBER_BODY.is_match(body) || !body.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    // the mantissa needs a digit: rejects "e5" and ".e5"
    let mantissa = body.split(['e', 'E']).next().unwrap_or_default();
    if !mantissa.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits: String = body.chars().filter(|&c| c != ',').collect();
    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let value = if negative { -value } else { value };

    let integer = if digits.contains(['.', 'e', 'E']) {
        None
    } else {
        let signed = if negative {
            format!("-{digits}")
        } else {
            digits
        };
        signed.parse::<i64>().ok()
    };

    Some(Number { value, integer })
}

/// Parse `12%`, `12 %` or `-3.5%`. Returns the fraction.
#[must_use]
pub fn parse_percentage(text: &str) -> Option<f64> {
    let body = text.trim().strip_suffix('%')?;
    parse_number(body).map(|n| n.value / 100.0)
}

/// Split a currency amount into `(amount, symbol)`.
#[must_use]
pub fn parse_currency(text: &str) -> Option<(f64, String)> {
    let text = text.trim();

    // sign may sit in front of the symbol: "-$5"
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest.trim_start()),
        None => ("", text),
    };

    for sym in CURRENCY_SYMBOLS.iter().chain(CURRENCY_CODES) {
        if let Some(rest) = unsigned.strip_prefix(sym) {
            if let Some(n) = parse_number(&format!("{sign}{}", rest.trim_start())) {
                return Some((n.value, (*sym).to_string()));
            }
        }
        if let Some(rest) = text.strip_suffix(sym) {
            if let Some(n) = parse_number(rest.trim_end()) {
                return Some((n.value, (*sym).to_string()));
            }
        }
    }
    None
}

/// Parse with the first matching pattern; ISO `YYYY-MM-DD` is always accepted.
#[must_use]
pub fn parse_date(text: &str, date_formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    date_formats
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("%Y-%m-%d"))
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Classify one cell's text; `None` for empty or whitespace-only text.
#[must_use]
pub fn classify(text: &str, date_formats: &[String]) -> Option<ColumnType> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let kind = if parse_percentage(text).is_some() {
        ColumnType::Percentage
    } else if parse_currency(text).is_some() {
        ColumnType::Currency
    } else if let Some(number) = parse_number(text) {
        if number.integer.is_some() {
            ColumnType::Integer
        } else {
            ColumnType::Decimal
        }
    } else if parse_date(text, date_formats).is_some() {
        ColumnType::Date
    } else {
        ColumnType::String
    };
    Some(kind)
}

/// Normalize one cell under its column's type.
///
/// The type's marker is optional inside a typed column, so `15` in a percentage
/// column reads as 15%. Text that still fails is kept as
/// [`TypedValue::Unparsed`].
#[must_use]
pub fn normalize(text: &str, column_type: ColumnType, date_formats: &[String]) -> TypedValue {
    let text = text.trim();
    if text.is_empty() {
        return TypedValue::Empty;
    }
    let unparsed = || TypedValue::Unparsed(text.to_string());

    match column_type {
        ColumnType::Integer => parse_number(text)
            .and_then(|n| n.integer)
            .map_or_else(unparsed, TypedValue::Integer),
        ColumnType::Decimal => parse_number(text)
            .map(|n| n.value)
            .map_or_else(unparsed, TypedValue::Decimal),
        ColumnType::Percentage => parse_percentage(text)
            .or_else(|| parse_number(text).map(|n| n.value / 100.0))
            .map_or_else(unparsed, TypedValue::Percentage),
        ColumnType::Currency => {
            if let Some((amount, symbol)) = parse_currency(text) {
                TypedValue::Currency {
                    amount,
                    symbol: Some(symbol),
                }
            } else if let Some(n) = parse_number(text) {
                TypedValue::Currency {
                    amount: n.value,
                    symbol: None,
                }
            } else {
                unparsed()
            }
        }
        ColumnType::Date => parse_date(text, date_formats).map_or_else(unparsed, TypedValue::Date),
        ColumnType::String => TypedValue::Text(text.to_string()),
    }
}

/// Infer a column's profile from its cell texts.
///
/// Plurality vote over non-empty cells; ties go to the more specific type.
/// Integers count toward decimal when the column holds any decimals. A winner
/// below `min_type_share` of the non-empty cells makes the column a string
/// column with `fallback` set.
#[must_use]
pub fn infer_column<'a, I>(texts: I, date_formats: &[String], min_type_share: f64) -> ColumnTypeProfile
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = [0usize; ColumnType::ALL.len()];
    let mut non_empty = 0usize;
    for text in texts {
        if let Some(kind) = classify(text, date_formats) {
            counts[index_of(kind)] += 1;
            non_empty += 1;
        }
    }
    if non_empty == 0 {
        return ColumnTypeProfile::new(ColumnType::String, 0, 0);
    }

    let count = |kind: ColumnType| counts[index_of(kind)];
    let support = |kind: ColumnType| match kind {
        ColumnType::Integer if count(ColumnType::Decimal) > 0 => 0,
        ColumnType::Decimal if count(ColumnType::Decimal) > 0 => {
            count(ColumnType::Decimal) + count(ColumnType::Integer)
        }
        other => count(other),
    };

    let (winner, winner_support) = ColumnType::ALL
        .into_iter()
        .map(|kind| (kind, support(kind)))
        .max_by_key(|&(kind, votes)| (votes, kind.specificity()))
        .unwrap_or((ColumnType::String, 0));

    if (winner_support as f64) < min_type_share * non_empty as f64 {
        return ColumnTypeProfile::fallback(non_empty, winner_support);
    }
    ColumnTypeProfile::new(winner, non_empty, winner_support)
}

fn index_of(kind: ColumnType) -> usize {
    ColumnType::ALL
        .iter()
        .position(|&k| k == kind)
        .unwrap_or(ColumnType::ALL.len() - 1)
}
