//! Table serialization module
//!
//! Renders [`ExtractedTable`](crate::ExtractedTable)s as Markdown pipe tables,
//! JSON or CSV. Markdown and JSON output can be read back for checking.

pub mod csv;
pub mod json;
pub mod markdown;

pub use self::csv::{CsvOptions, CsvSerializer};
pub use self::json::{parse_json_tables, JsonOptions, JsonSerializer, JsonTable};
pub use self::markdown::{parse_markdown_tables, MarkdownOptions, MarkdownSerializer, MarkdownTable};
