//! All supported string-table file formats for strtab.
//!
//! The set is closed: [`FormatType`] names each one and the job service
//! dispatches on it.

pub mod binary;
pub mod cipher;
pub mod csv;
pub mod spreadsheet;

use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

// Reexporting the formats for easier access
pub use binary::Format as BinaryFormat;
pub use csv::Format as CsvFormat;
pub use spreadsheet::Format as SpreadsheetFormat;

use crate::Error;

/// Column names shared by the CSV and spreadsheet formats, in order.
pub const HEADER: [&str; 4] = ["stringId", "keyHex", "keyName", "text"];

/// Represents all supported string-table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatType {
    /// Comma-separated text, one row per record.
    Csv,
    /// The game's binary string table.
    Binary,
    /// An `.xlsx` workbook; the first worksheet holds the records.
    Spreadsheet,
}

/// Implements [`std::fmt::Display`] for [`FormatType`].
///
/// # Example
/// ```rust
/// use strtab::formats::FormatType;
/// assert_eq!(FormatType::Csv.to_string(), "csv");
/// assert_eq!(FormatType::Binary.to_string(), "binary");
/// assert_eq!(FormatType::Spreadsheet.to_string(), "spreadsheet");
/// ```
impl Display for FormatType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Csv => write!(f, "csv"),
            FormatType::Binary => write!(f, "binary"),
            FormatType::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Accepts format names and common extensions, case-insensitively.
///
/// Returns [`crate::error::Error::UnknownFormat`] for unknown strings.
impl FromStr for FormatType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "csv" => Ok(FormatType::Csv),
            "binary" | "bin" | "stbl" => Ok(FormatType::Binary),
            "spreadsheet" | "xlsx" => Ok(FormatType::Spreadsheet),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

impl FormatType {
    /// Returns the typical file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatType::Csv => "csv",
            FormatType::Binary => "stbl",
            FormatType::Spreadsheet => "xlsx",
        }
    }

    /// Infers a format from a file path's extension.
    ///
    /// ```rust
    /// use strtab::formats::FormatType;
    /// assert_eq!(FormatType::from_path("strings.csv"), Some(FormatType::Csv));
    /// assert_eq!(FormatType::from_path("strings.STBL"), Some(FormatType::Binary));
    /// assert_eq!(FormatType::from_path("strings.txt"), None);
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<FormatType> {
        path.as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_type_from_str() {
        assert_eq!(FormatType::from_str("csv").unwrap(), FormatType::Csv);
        assert_eq!(FormatType::from_str("CSV").unwrap(), FormatType::Csv);
        assert_eq!(FormatType::from_str("stbl").unwrap(), FormatType::Binary);
        assert_eq!(FormatType::from_str("bin").unwrap(), FormatType::Binary);
        assert_eq!(
            FormatType::from_str("  xlsx  ").unwrap(),
            FormatType::Spreadsheet
        );
    }

    #[test]
    fn test_format_type_from_str_invalid() {
        assert!(FormatType::from_str("strings").is_err());
        assert!(FormatType::from_str("").is_err());
    }

    #[test]
    fn test_extension_round_trips_through_from_path() {
        for format in [FormatType::Csv, FormatType::Binary, FormatType::Spreadsheet] {
            let path = format!("table.{}", format.extension());
            assert_eq!(FormatType::from_path(path), Some(format));
        }
    }

    #[test]
    fn test_display_parses_back() {
        for format in [FormatType::Csv, FormatType::Binary, FormatType::Spreadsheet] {
            assert_eq!(format.to_string().parse::<FormatType>().unwrap(), format);
        }
    }
}
