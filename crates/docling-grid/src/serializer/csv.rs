//! CSV serialization for extracted tables
//!
//! One header record followed by the body rows, values in the same canonical
//! text the Markdown renderer uses. Several tables are separated by an empty
//! line.

use crate::error::{GridError, Result};
use crate::table::{ExtractedTable, Table};

/// Options for CSV serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsvOptions {
    /// Field delimiter (default: `,`)
    pub delimiter: u8,
    /// Write the header record (default: true)
    pub include_headers: bool,
}

impl Default for CsvOptions {
    #[inline]
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_headers: true,
        }
    }
}

/// CSV serializer for extracted tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CsvSerializer {
    options: CsvOptions,
}

impl CsvSerializer {
    #[inline]
    #[must_use = "creates serializer with default options"]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use = "creates serializer with custom options"]
    pub const fn with_options(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Serialize several tables, separated by an empty line.
    ///
    /// # Errors
    /// Returns error if a record cannot be written
    pub fn serialize_tables(&self, tables: &[ExtractedTable]) -> Result<String> {
        let parts = tables
            .iter()
            .map(|extracted| self.serialize_table(&extracted.table))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("\n"))
    }

    /// Serialize one table; every record ends with a newline.
    ///
    /// # Errors
    /// Returns error if a record cannot be written
    pub fn serialize_table(&self, table: &Table) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.options.delimiter)
            .flexible(false)
            .from_writer(Vec::new());

        if self.options.include_headers {
            writer.write_record(&table.headers)?;
        }
        for row in &table.rows {
            writer.write_record(row.iter().map(|value| value.render()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| GridError::IoError(e.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}
