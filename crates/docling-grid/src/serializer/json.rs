//! JSON serialization for extracted tables
//!
//! Each table becomes one object:
//!
//! ```json
//! {
//!   "page_number": 1,
//!   "table_index": 1,
//!   "bbox": {"l": 0.0, "t": 0.0, "r": 60.0, "b": 20.0},
//!   "status": "complete",
//!   "header_detected": true,
//!   "headers": ["Item", "Share"],
//!   "types": {"Item": "string", "Share": "percentage"},
//!   "rows": [{"Item": "Apples", "Share": {"value": 0.1, "unit": "percent"}}]
//! }
//! ```
//!
//! Plain numbers are JSON numbers, dates ISO strings and empty cells `null`.
//! Values that failed their column's type are `{"value": raw, "unparsed": true}`.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{GridError, Result};
use crate::table::{ColumnType, ExtractedTable, TypedValue};
use crate::types::BBox;

/// Options for JSON serialization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonOptions {
    /// Pretty-print with indentation (default: true)
    pub pretty: bool,
    /// Indentation string when pretty=true (default: 2 spaces)
    pub indent: String,
}

impl Default for JsonOptions {
    #[inline]
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

/// JSON serializer for extracted tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsonSerializer {
    options: JsonOptions,
}

impl JsonSerializer {
    /// Create a new JSON serializer with default options (pretty-printed)
    #[inline]
    #[must_use = "creates serializer with default options"]
    pub fn new() -> Self {
        Self {
            options: JsonOptions::default(),
        }
    }

    /// Create a new JSON serializer with custom options
    #[inline]
    #[must_use = "creates serializer with custom options"]
    pub const fn with_options(options: JsonOptions) -> Self {
        Self { options }
    }

    /// Serialize tables as a JSON array.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn serialize_tables(&self, tables: &[ExtractedTable]) -> Result<String> {
        let value = Value::Array(tables.iter().map(table_to_value).collect());
        self.write(&value)
    }

    /// Serialize any serde value with these options.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn write<T: Serialize>(&self, value: &T) -> Result<String> {
        if !self.options.pretty {
            return Ok(serde_json::to_string(value)?);
        }
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.options.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// JSON object for one table
#[must_use]
pub fn table_to_value(extracted: &ExtractedTable) -> Value {
    let table = &extracted.table;

    let types: Map<String, Value> = table
        .headers
        .iter()
        .zip(&table.profiles)
        .map(|(header, profile)| (header.clone(), json!(profile.column_type.as_str())))
        .collect();

    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .headers
                .iter()
                .zip(row)
                .map(|(header, value)| (header.clone(), value_to_json(value)))
                .collect();
            Value::Object(object)
        })
        .collect();

    json!({
        "page_number": extracted.page_number,
        "table_index": extracted.table_index,
        "bbox": extracted.bbox,
        "status": extracted.status,
        "header_detected": table.header_detected,
        "headers": table.headers,
        "types": types,
        "rows": rows,
    })
}

/// JSON form of one cell value
#[must_use]
pub fn value_to_json(value: &TypedValue) -> Value {
    match value {
        TypedValue::Empty => Value::Null,
        TypedValue::Integer(v) => json!(v),
        TypedValue::Decimal(v) => json!(v),
        TypedValue::Percentage(fraction) => json!({"value": fraction, "unit": "percent"}),
        TypedValue::Currency { amount, symbol } => {
            json!({"value": amount, "unit": "currency", "symbol": symbol})
        }
        TypedValue::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
        TypedValue::Text(text) => json!(text),
        TypedValue::Unparsed(raw) => json!({"value": raw, "unparsed": true}),
    }
}

/// Table read back from JSON output.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTable {
    pub page_number: usize,
    pub table_index: usize,
    pub bbox: BBox,
    pub headers: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<TypedValue>>,
}

/// Read the array written by [`JsonSerializer::serialize_tables`].
///
/// # Errors
///
/// Returns [`GridError::JsonError`] for malformed JSON and
/// [`GridError::InvalidConfig`] when the document does not have the table
/// layout.
pub fn parse_json_tables(json: &str) -> Result<Vec<JsonTable>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(malformed("expected an array of tables"));
    };
    items.iter().map(parse_table).collect()
}

fn parse_table(item: &Value) -> Result<JsonTable> {
    let headers: Vec<String> = serde_json::from_value(item["headers"].clone())?;
    let bbox: BBox = serde_json::from_value(item["bbox"].clone())?;
    let types = headers
        .iter()
        .map(|header| {
            item["types"][header]
                .as_str()
                .and_then(|tag| tag.parse::<ColumnType>().ok())
                .ok_or_else(|| malformed(format!("missing type for column '{header}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = item["rows"]
        .as_array()
        .ok_or_else(|| malformed("rows must be an array"))?
        .iter()
        .map(|row| {
            headers
                .iter()
                .zip(&types)
                .map(|(header, &column_type)| json_to_value(&row[header], column_type))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(JsonTable {
        page_number: item["page_number"].as_u64().unwrap_or_default() as usize,
        table_index: item["table_index"].as_u64().unwrap_or_default() as usize,
        bbox,
        headers,
        types,
        rows,
    })
}

/// Inverse of [`value_to_json`] given the column's type.
///
/// # Errors
///
/// Returns [`GridError::InvalidConfig`] for values that cannot come from a
/// column of `column_type`.
pub fn json_to_value(value: &Value, column_type: ColumnType) -> Result<TypedValue> {
    if let Some(object) = value.as_object() {
        let inner = object.get("value").unwrap_or(&Value::Null);
        if object.get("unparsed").and_then(Value::as_bool) == Some(true) {
            return Ok(TypedValue::Unparsed(
                inner.as_str().unwrap_or_default().to_string(),
            ));
        }
        let number = inner
            .as_f64()
            .ok_or_else(|| malformed(format!("non-numeric value {inner}")))?;
        return match object.get("unit").and_then(Value::as_str) {
            Some("percent") => Ok(TypedValue::Percentage(number)),
            Some("currency") => Ok(TypedValue::Currency {
                amount: number,
                symbol: object
                    .get("symbol")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
            }),
            other => Err(malformed(format!("unknown unit {other:?}"))),
        };
    }

    match (value, column_type) {
        (Value::Null, _) => Ok(TypedValue::Empty),
        (Value::Number(n), ColumnType::Integer) => n
            .as_i64()
            .map(TypedValue::Integer)
            .ok_or_else(|| malformed(format!("{n} is not an integer"))),
        (Value::Number(n), _) => n
            .as_f64()
            .map(TypedValue::Decimal)
            .ok_or_else(|| malformed(format!("{n} is not a number"))),
        (Value::String(s), ColumnType::Date) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(TypedValue::Date)
            .map_err(|e| malformed(format!("bad date '{s}': {e}"))),
        (Value::String(s), _) => Ok(TypedValue::Text(s.clone())),
        (other, _) => Err(malformed(format!("unexpected value {other}"))),
    }
}

fn malformed(reason: impl Into<String>) -> GridError {
    GridError::InvalidConfig(format!("malformed table JSON: {}", reason.into()))
}
