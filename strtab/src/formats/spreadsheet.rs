//! Support for the spreadsheet (`.xlsx`) string-table format.
//!
//! The first worksheet holds the same four columns as the CSV format, with
//! the header in row 1. `stringId` and `keyHex` cells are written as text
//! with the `@` number format so spreadsheet applications do not strip
//! leading zeros or reinterpret them as numbers.
//!
//! Shared strings may carry OOXML `_xHHHH_` escapes: the writer emits them
//! for control characters and for literal `_xHHHH_` text (as `_x005F_`
//! followed by the rest). They are decoded on read.
use std::{
    borrow::Cow,
    io::{BufRead, Cursor, Write},
};

use calamine::{Data, Reader, Xlsx};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_xlsxwriter::{Format as CellFormat, Workbook};

use crate::{
    error::Error,
    formats::HEADER,
    traits::Parser,
    types::{ResourceJob, StringRecord},
};

const SHEET_NAME: &str = "Strings";

/// One data row of the worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub string_id: String,
    pub key_hex: String,
    pub key_name: String,
    pub text: String,
}

/// A parsed spreadsheet string table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub rows: Vec<SheetRow>,
}

lazy_static! {
    static ref OOXML_ESCAPE: Regex = Regex::new(r"_x([0-9A-Fa-f]{4})_").unwrap();
}

/// Decodes `_xHHHH_` escapes in one left-to-right pass, so `_x005F_x0041_`
/// reads back as the literal `_x0041_`.
fn unescape_ooxml(s: &str) -> Cow<'_, str> {
    OOXML_ESCAPE.replace_all(s, |caps: &Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => unescape_ooxml(s).into_owned(),
        // A cell retyped as a number by hand; integral values keep no ".0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(buffer))
            .map_err(|e| Error::format_error(format!("unreadable workbook: {e}")))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::format_error("workbook has no worksheet"))?
            .map_err(|e| Error::format_error(format!("unreadable worksheet: {e}")))?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| Error::format_error("worksheet is missing the header row"))?;
        let header_cells: Vec<String> = header.iter().map(cell_text).collect();
        let header_matches = header_cells.len() >= HEADER.len()
            && header_cells.iter().zip(HEADER).all(|(cell, name)| cell == name)
            && header.iter().skip(HEADER.len()).all(is_blank);
        if !header_matches {
            return Err(Error::format_error(format!(
                "expected worksheet header `{}`, found `{}`",
                HEADER.join(","),
                header_cells.join(",")
            )));
        }

        let mut parsed = Vec::new();
        for (index, row) in rows.enumerate() {
            if row.iter().all(is_blank) {
                continue;
            }
            if row.iter().skip(HEADER.len()).any(|cell| !is_blank(cell)) {
                return Err(Error::format_error(format!(
                    "worksheet row {} has data beyond column {}",
                    index + 2,
                    HEADER.len()
                )));
            }
            let cell = |i: usize| row.get(i).map(cell_text).unwrap_or_default();
            parsed.push(SheetRow {
                string_id: cell(0),
                key_hex: cell(1),
                key_name: cell(2),
                text: cell(3),
            });
        }
        Ok(Format { rows: parsed })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut workbook = Workbook::new();
        let text_cell = CellFormat::new().set_num_format("@");
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, name) in (0u16..).zip(HEADER) {
            worksheet.write_string(0, col, name)?;
        }
        for (index, row) in self.rows.iter().enumerate() {
            let row_num = u32::try_from(index + 1)
                .map_err(|_| Error::format_error("too many rows for a worksheet"))?;
            worksheet.write_string_with_format(row_num, 0, row.string_id.as_str(), &text_cell)?;
            worksheet.write_string_with_format(row_num, 1, row.key_hex.as_str(), &text_cell)?;
            worksheet.write_string(row_num, 2, row.key_name.as_str())?;
            worksheet.write_string(row_num, 3, row.text.as_str())?;
        }

        let bytes = workbook.save_to_buffer()?;
        writer.write_all(&bytes)?;
        Ok(())
    }
}

impl From<Format> for Vec<StringRecord> {
    fn from(value: Format) -> Self {
        value
            .rows
            .into_iter()
            .map(|r| StringRecord::from_parts(r.string_id, r.key_hex, r.key_name, r.text))
            .collect()
    }
}

impl From<&ResourceJob> for Format {
    fn from(job: &ResourceJob) -> Self {
        Format {
            rows: job
                .items
                .iter()
                .map(|r| SheetRow {
                    string_id: r.string_id.clone(),
                    key_hex: r.key_hex.clone(),
                    key_name: r.key_name.clone(),
                    text: r.text.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatType;

    fn sample_job() -> ResourceJob {
        ResourceJob::new("t.xlsx", FormatType::Spreadsheet).with_items(vec![
            StringRecord::new("000123", "greeting", "Hello"),
            StringRecord::new("500002", "farewell", "Bye, \"friend\"\nsee you"),
        ])
    }

    #[test]
    fn test_write_then_read_keeps_text_ids() {
        let bytes = Format::from(&sample_job()).to_bytes().unwrap();
        let records: Vec<StringRecord> = Format::from_bytes(&bytes).unwrap().into();
        assert_eq!(records, sample_job().items);
        assert_eq!(records[0].string_id, "000123");
    }

    fn resave(text: &str) -> String {
        let job = ResourceJob::new("t.xlsx", FormatType::Spreadsheet)
            .with_items(vec![StringRecord::new("000001", "k", text)]);
        let bytes = Format::from(&job).to_bytes().unwrap();
        let records: Vec<StringRecord> = Format::from_bytes(&bytes).unwrap().into();
        records[0].text.clone()
    }

    #[test]
    fn test_escaped_text_survives_repeated_saves() {
        for text in ["a\rb", "_x0041_", "ctl\u{1}x", "_x005F_", "a_b_x12_"] {
            let mut current = text.to_string();
            for _ in 0..3 {
                current = resave(&current);
                assert_eq!(current, text);
            }
        }
    }

    #[test]
    fn test_unescape_ooxml() {
        assert_eq!(unescape_ooxml("a_x000D_b"), "a\rb");
        assert_eq!(unescape_ooxml("_x005F_x0041_"), "_x0041_");
        assert_eq!(unescape_ooxml("_xD800_"), "_xD800_");
        assert_eq!(unescape_ooxml("plain_text"), "plain_text");
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = Format::from_bytes(b"definitely not a zip archive").unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn test_wrong_header_is_format_error() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "id").unwrap();
        sheet.write_string(0, 1, "text").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let err = Format::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn test_numeric_cells_are_read_as_text() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, name) in (0u16..).zip(HEADER) {
            sheet.write_string(0, col, name).unwrap();
        }
        sheet.write_number(1, 0, 500001.0).unwrap();
        sheet.write_string(1, 1, "0x811C9DC5").unwrap();
        sheet.write_string(1, 2, "").unwrap();
        sheet.write_string(1, 3, "text").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let format = Format::from_bytes(&bytes).unwrap();
        assert_eq!(format.rows[0].string_id, "500001");
        assert_eq!(format.rows[0].key_name, "");
    }
}
