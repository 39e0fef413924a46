//! Support for the CSV string-table format.
//!
//! One row per record with the columns `stringId,keyHex,keyName,text`.
//! The header row is mandatory; fields are quoted only when they contain a
//! comma, a quote or a line break.
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    formats::HEADER,
    traits::Parser,
    types::{ResourceJob, StringRecord},
};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    #[serde(rename = "stringId")]
    pub string_id: String,
    #[serde(rename = "keyHex")]
    pub key_hex: String,
    #[serde(rename = "keyName")]
    pub key_name: String,
    pub text: String,
}

/// A parsed CSV string table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub records: Vec<CsvRecord>,
}

/// Row-level problems are format errors; only genuine I/O stays I/O.
fn map_csv_error(err: ::csv::Error) -> Error {
    if err.is_io_error() {
        match err.into_kind() {
            ::csv::ErrorKind::Io(io) => Error::Io(io),
            other => Error::format_error(format!("{other:?}")),
        }
    } else {
        Error::format_error(format!("malformed CSV row: {err}"))
    }
}

impl Parser for Format {
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut rdr = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(map_csv_error)?.clone();
        if headers.iter().ne(HEADER.iter().copied()) {
            return Err(Error::format_error(format!(
                "expected CSV header `{}`, found `{}`",
                HEADER.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut records = Vec::new();
        for result in rdr.deserialize() {
            records.push(result.map_err(map_csv_error)?);
        }
        Ok(Format { records })
    }

    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = ::csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(HEADER)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl From<Format> for Vec<StringRecord> {
    fn from(value: Format) -> Self {
        value
            .records
            .into_iter()
            .map(|r| StringRecord::from_parts(r.string_id, r.key_hex, r.key_name, r.text))
            .collect()
    }
}

impl From<&ResourceJob> for Format {
    fn from(job: &ResourceJob) -> Self {
        Format {
            records: job
                .items
                .iter()
                .map(|r| CsvRecord {
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
    use crate::hash::key_hex;

    fn sample_csv() -> String {
        format!(
            "stringId,keyHex,keyName,text\n500001,{},greeting,Hello\n500002,{},farewell,\"Bye, \"\"friend\"\"\"\n",
            key_hex("greeting"),
            key_hex("farewell")
        )
    }

    #[test]
    fn test_parse_simple_csv() {
        let format = Format::from_str(&sample_csv()).unwrap();
        assert_eq!(format.records.len(), 2);
        assert_eq!(format.records[0].string_id, "500001");
        assert_eq!(format.records[0].key_name, "greeting");
        assert_eq!(format.records[1].text, "Bye, \"friend\"");
    }

    #[test]
    fn test_missing_header_is_format_error() {
        let content = format!("500001,{},greeting,Hello\n", key_hex("greeting"));
        let err = Format::from_str(&content).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn test_reordered_header_is_format_error() {
        let err = Format::from_str("keyHex,stringId,keyName,text\n").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_short_row_is_format_error() {
        let content = "stringId,keyHex,keyName,text\n500001,0x00000000\n";
        let err = Format::from_str(content).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "{err}");
    }

    #[test]
    fn test_write_quotes_only_when_needed() {
        let job = ResourceJob::new("t.csv", FormatType::Csv).with_items(vec![
            StringRecord::new("500001", "plain", "Hello"),
            StringRecord::new("500002", "multi", "line one\nline two"),
            StringRecord::new("500003", "comma", "a,b"),
        ]);
        let bytes = Format::from(&job).to_bytes().unwrap();
        let out = String::from_utf8(bytes).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("stringId,keyHex,keyName,text"));
        assert!(out.contains(",plain,Hello\n"));
        assert!(out.contains(",multi,\"line one\nline two\"\n"));
        assert!(out.contains(",comma,\"a,b\"\n"));
    }

    #[test]
    fn test_empty_table_still_writes_header() {
        let job = ResourceJob::new("t.csv", FormatType::Csv);
        let bytes = Format::from(&job).to_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "stringId,keyHex,keyName,text\n");
        let parsed = Format::from_str("stringId,keyHex,keyName,text\n").unwrap();
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn test_leading_zeros_survive() {
        let content = format!("stringId,keyHex,keyName,text\n000123,{},k,v\n", key_hex("k"));
        let records: Vec<StringRecord> = Format::from_str(&content).unwrap().into();
        assert_eq!(records[0].string_id, "000123");
    }
}
