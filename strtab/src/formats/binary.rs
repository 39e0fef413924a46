//! Support for the game's binary string-table format.
//!
//! Layout (version 1, little-endian):
//!
//! ```text
//! offset  size   field
//! 0       4      magic "STBL"
//! 4       2      version
//! 6       2      language code
//! 8       4      id space
//! 12      4      record count N
//! 16      4      pool length P
//! 20      16*N   record table: string id hash, key hash, pool offset, byte length
//! 20+16N  P      string pool
//! ```
//!
//! A pool slot holds `u16 len + string id`, `u16 len + key name` and then the
//! text for the rest of the slot. Every slot is enciphered with the table of
//! the header's language (see [`super::cipher`]).
use std::io::{BufRead, Write};

use tracing::debug;

use crate::{
    error::Error,
    formats::cipher::Cipher,
    hash::{fnv1a_32, format_key_hex, key_hex},
    language::Language,
    traits::Parser,
    types::{ResourceJob, StringRecord},
};

pub const MAGIC: [u8; 4] = *b"STBL";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 20;
pub const RECORD_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub language: Language,
    pub id_space: u32,
    pub record_count: u32,
    pub pool_len: u32,
}

/// One row of the record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub string_id_hash: u32,
    pub key_hash: u32,
    pub pool_offset: u32,
    pub byte_length: u32,
}

/// A validated view of an encoded file.
#[derive(Debug, Clone, Copy)]
pub struct Sections<'a> {
    pub header: Header,
    pub table: &'a [u8],
    pub pool: &'a [u8],
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
    pub string_id: String,
    pub key_name: String,
    pub key_hash: u32,
    pub text: String,
}

/// A decoded binary string table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    pub language: Language,
    pub id_space: u32,
    pub records: Vec<BinaryRecord>,
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let raw = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn truncated(what: &str) -> Error {
    Error::format_error(format!("truncated {what}"))
}

/// Splits an encoded file into header, record table and pool, checking that
/// every declared length fits the file.
pub fn split_sections(bytes: &[u8]) -> Result<Sections<'_>, Error> {
    if bytes.len() < HEADER_LEN {
        return Err(truncated("header"));
    }
    if bytes[..4] != MAGIC {
        return Err(Error::format_error("missing STBL marker"));
    }
    let version = le_u16(bytes, 4).ok_or_else(|| truncated("header"))?;
    if version != VERSION {
        return Err(Error::format_error(format!(
            "unsupported string table version {version}"
        )));
    }
    let code = le_u16(bytes, 6).ok_or_else(|| truncated("header"))?;
    let language = Language::from_code(code)
        .ok_or_else(|| Error::format_error(format!("unknown language code {code}")))?;
    let id_space = le_u32(bytes, 8).ok_or_else(|| truncated("header"))?;
    let record_count = le_u32(bytes, 12).ok_or_else(|| truncated("header"))?;
    let pool_len = le_u32(bytes, 16).ok_or_else(|| truncated("header"))?;

    let table_end = usize::try_from(record_count)
        .ok()
        .and_then(|n| n.checked_mul(RECORD_LEN))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            Error::format_error(format!(
                "record table of {record_count} entries overruns a {}-byte file",
                bytes.len()
            ))
        })?;

    let pool = &bytes[table_end..];
    if pool.len() != pool_len as usize {
        return Err(Error::format_error(format!(
            "string pool declares {pool_len} bytes but {} are present",
            pool.len()
        )));
    }

    Ok(Sections {
        header: Header {
            version,
            language,
            id_space,
            record_count,
            pool_len,
        },
        table: &bytes[HEADER_LEN..table_end],
        pool,
    })
}

impl Sections<'_> {
    pub fn entries(&self) -> impl Iterator<Item = TableEntry> + '_ {
        self.table.chunks_exact(RECORD_LEN).map(|row| TableEntry {
            string_id_hash: le_u32(row, 0).unwrap_or_default(),
            key_hash: le_u32(row, 4).unwrap_or_default(),
            pool_offset: le_u32(row, 8).unwrap_or_default(),
            byte_length: le_u32(row, 12).unwrap_or_default(),
        })
    }
}

/// Reads a `u16`-length-prefixed UTF-8 string from `slot` at `*at`.
fn read_prefixed(slot: &[u8], at: &mut usize, index: usize) -> Result<String, Error> {
    let len = le_u16(slot, *at)
        .ok_or_else(|| Error::format_error(format!("record {index}: truncated slot")))?;
    let start = *at + 2;
    let end = start + usize::from(len);
    let raw = slot
        .get(start..end)
        .ok_or_else(|| Error::format_error(format!("record {index}: truncated slot")))?;
    *at = end;
    String::from_utf8(raw.to_vec())
        .map_err(|_| Error::format_error(format!("record {index}: invalid UTF-8")))
}

fn decode_slot(
    pool: &[u8],
    entry: &TableEntry,
    cipher: Cipher,
    index: usize,
) -> Result<BinaryRecord, Error> {
    let start = entry.pool_offset as usize;
    let end = start.checked_add(entry.byte_length as usize);
    let mut slot = end
        .and_then(|end| pool.get(start..end))
        .ok_or_else(|| {
            Error::format_error(format!(
                "record {index}: slot {}+{} lies outside the {}-byte pool",
                entry.pool_offset,
                entry.byte_length,
                pool.len()
            ))
        })?
        .to_vec();
    cipher.decode(&mut slot);

    let mut at = 0;
    let string_id = read_prefixed(&slot, &mut at, index)?;
    let key_name = read_prefixed(&slot, &mut at, index)?;
    let text = String::from_utf8(slot[at..].to_vec())
        .map_err(|_| Error::format_error(format!("record {index}: invalid UTF-8")))?;

    if fnv1a_32(&string_id) != entry.string_id_hash || fnv1a_32(&key_name) != entry.key_hash {
        return Err(Error::format_error(format!(
            "record {index}: hashes do not match the pool contents"
        )));
    }

    Ok(BinaryRecord {
        string_id,
        key_name,
        key_hash: entry.key_hash,
        text,
    })
}

fn encode_slot(record: &BinaryRecord, cipher: Cipher) -> Result<Vec<u8>, Error> {
    let mut slot =
        Vec::with_capacity(4 + record.string_id.len() + record.key_name.len() + record.text.len());
    for field in [&record.string_id, &record.key_name] {
        let len = u16::try_from(field.len()).map_err(|_| {
            Error::format_error(format!("`{field}` is too long for a binary string table"))
        })?;
        slot.extend_from_slice(&len.to_le_bytes());
        slot.extend_from_slice(field.as_bytes());
    }
    slot.extend_from_slice(record.text.as_bytes());
    cipher.encode(&mut slot);
    Ok(slot)
}

impl Parser for Format {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let sections = split_sections(&bytes)?;
        let cipher = Cipher::for_language(sections.header.language);
        debug!(
            language = %sections.header.language,
            records = sections.header.record_count,
            pool = sections.header.pool_len,
            "decoding binary string table"
        );

        let records = sections
            .entries()
            .enumerate()
            .map(|(index, entry)| decode_slot(sections.pool, &entry, cipher, index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Format {
            language: sections.header.language,
            id_space: sections.header.id_space,
            records,
        })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let cipher = Cipher::for_language(self.language);
        let too_large = || Error::format_error("string table exceeds the 4 GiB format limit");

        let mut table = Vec::with_capacity(self.records.len() * RECORD_LEN);
        let mut pool = Vec::new();
        for record in &self.records {
            let slot = encode_slot(record, cipher)?;
            let offset = u32::try_from(pool.len()).map_err(|_| too_large())?;
            let length = u32::try_from(slot.len()).map_err(|_| too_large())?;
            table.extend_from_slice(&fnv1a_32(&record.string_id).to_le_bytes());
            table.extend_from_slice(&record.key_hash.to_le_bytes());
            table.extend_from_slice(&offset.to_le_bytes());
            table.extend_from_slice(&length.to_le_bytes());
            pool.extend_from_slice(&slot);
        }
        let record_count = u32::try_from(self.records.len()).map_err(|_| too_large())?;
        let pool_len = u32::try_from(pool.len()).map_err(|_| too_large())?;

        writer.write_all(&MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&self.language.code().to_le_bytes())?;
        writer.write_all(&self.id_space.to_le_bytes())?;
        writer.write_all(&record_count.to_le_bytes())?;
        writer.write_all(&pool_len.to_le_bytes())?;
        writer.write_all(&table)?;
        writer.write_all(&pool)?;
        writer.flush()?;
        Ok(())
    }
}

impl From<Format> for Vec<StringRecord> {
    fn from(value: Format) -> Self {
        value
            .records
            .into_iter()
            .map(|r| {
                StringRecord::from_parts(r.string_id, format_key_hex(r.key_hash), r.key_name, r.text)
            })
            .collect()
    }
}

/// Builds the binary form of a job, enciphered for the job's language.
impl TryFrom<&ResourceJob> for Format {
    type Error = Error;

    fn try_from(job: &ResourceJob) -> Result<Self, Self::Error> {
        let records = job
            .items
            .iter()
            .map(|r| {
                if r.key_hex != key_hex(&r.key_name) {
                    return Err(Error::format_error(format!(
                        "keyHex {} does not match key `{}`",
                        r.key_hex, r.key_name
                    )));
                }
                Ok(BinaryRecord {
                    string_id: r.string_id.clone(),
                    key_name: r.key_name.clone(),
                    key_hash: fnv1a_32(&r.key_name),
                    text: r.text.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Format {
            language: job.language,
            id_space: job.id_space,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatType;

    fn sample_job(language: Language) -> ResourceJob {
        ResourceJob::new("t.stbl", FormatType::Binary)
            .with_language(language)
            .with_id_space(5)
            .with_items(vec![
                StringRecord::new("500001", "greeting", "Hello"),
                StringRecord::new("500002", "farewell", "До свидания"),
                StringRecord::new("500003", "empty", ""),
            ])
    }

    fn encode(job: &ResourceJob) -> Vec<u8> {
        Format::try_from(job).unwrap().to_bytes().unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&sample_job(Language::French));
        assert_eq!(&bytes[..4], b"STBL");
        assert_eq!(le_u16(&bytes, 4), Some(VERSION));
        assert_eq!(le_u16(&bytes, 6), Some(Language::French.code()));
        assert_eq!(le_u32(&bytes, 8), Some(5));
        assert_eq!(le_u32(&bytes, 12), Some(3));

        let sections = split_sections(&bytes).unwrap();
        let entries: Vec<TableEntry> = sections.entries().collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].string_id_hash, fnv1a_32("500001"));
        assert_eq!(entries[0].key_hash, fnv1a_32("greeting"));
        assert_eq!(entries[0].pool_offset, 0);
        assert_eq!(entries[1].pool_offset, entries[0].byte_length);
    }

    #[test]
    fn test_decode_restores_records_and_header() {
        for language in [Language::EnglishUs, Language::Russian, Language::Japanese] {
            let job = sample_job(language);
            let format = Format::from_bytes(&encode(&job)).unwrap();
            assert_eq!(format.language, language);
            assert_eq!(format.id_space, 5);
            let records: Vec<StringRecord> = format.into();
            assert_eq!(records, job.items);
        }
    }

    #[test]
    fn test_clear_locale_stores_plain_text() {
        let bytes = encode(&sample_job(Language::EnglishUs));
        let pool = split_sections(&bytes).unwrap().pool;
        assert!(pool.windows(5).any(|w| w == b"Hello"));

        let bytes = encode(&sample_job(Language::ChineseSimplified));
        let pool = split_sections(&bytes).unwrap().pool;
        assert!(!pool.windows(5).any(|w| w == b"Hello"));
    }

    #[test]
    fn test_duplicate_string_ids_keep_order() {
        let job = ResourceJob::new("t.stbl", FormatType::Binary).with_items(vec![
            StringRecord::new("7", "b", "second"),
            StringRecord::new("7", "a", "first"),
        ]);
        let records: Vec<StringRecord> = Format::from_bytes(&encode(&job)).unwrap().into();
        assert_eq!(records[0].text, "second");
        assert_eq!(records[1].text, "first");
    }

    #[test]
    fn test_truncated_header() {
        let err = Format::from_bytes(b"STBL\x01\x00").unwrap_err();
        assert!(err.to_string().contains("truncated header"), "{err}");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample_job(Language::EnglishUs));
        bytes[0] = b'X';
        assert!(matches!(Format::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_unknown_language_code() {
        let mut bytes = encode(&sample_job(Language::EnglishUs));
        bytes[6..8].copy_from_slice(&99u16.to_le_bytes());
        let err = Format::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown language code 99"), "{err}");
    }

    #[test]
    fn test_record_table_overrun() {
        let mut bytes = encode(&sample_job(Language::EnglishUs));
        bytes[12..16].copy_from_slice(&1_000u32.to_le_bytes());
        let err = Format::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("overruns"), "{err}");
    }

    #[test]
    fn test_truncated_pool() {
        let mut bytes = encode(&sample_job(Language::EnglishUs));
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(Format::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_pool_offset_outside_pool() {
        let mut bytes = encode(&sample_job(Language::EnglishUs));
        let offset_field = HEADER_LEN + 8;
        bytes[offset_field..offset_field + 4].copy_from_slice(&10_000u32.to_le_bytes());
        let err = Format::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("outside"), "{err}");
    }

    #[test]
    fn test_wrong_language_tag_is_detected() {
        let mut bytes = encode(&sample_job(Language::Russian));
        bytes[6..8].copy_from_slice(&Language::EnglishUs.code().to_le_bytes());
        assert!(matches!(Format::from_bytes(&bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_mismatched_key_hex_is_rejected() {
        let mut job = sample_job(Language::EnglishUs);
        job.items[0].key_name = "renamed".to_string();
        assert!(matches!(Format::try_from(&job), Err(Error::Format(_))));
    }
}
