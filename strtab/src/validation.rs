//! Checks a job must pass before it is written.

use lazy_static::lazy_static;
use regex::Regex;

use crate::{error::Error, types::ResourceJob};

lazy_static! {
    static ref LEADING_DIGITS: Regex = Regex::new(r"^[0-9]+").unwrap();
}

/// The numeric value of the leading digit run of a string id, if any.
///
/// ```rust
/// use strtab::validation::leading_number;
/// assert_eq!(leading_number("500123_title"), Some(500123));
/// assert_eq!(leading_number("000042"), Some(42));
/// assert_eq!(leading_number("title"), None);
/// ```
pub fn leading_number(string_id: &str) -> Option<u64> {
    LEADING_DIGITS
        .find(string_id)
        .and_then(|m| m.as_str().parse().ok())
}

/// Half-open range of ids owned by `id_space`.
pub fn id_space_range(id_space: u32, width: u64) -> (u64, u64) {
    let start = u64::from(id_space).saturating_mul(width);
    (start, start.saturating_add(width))
}

/// Every record's `key_hex` must render the hash of its `key_name`.
pub fn validate_key_hashes(job: &ResourceJob) -> Result<(), Error> {
    match job.items.iter().position(|r| !r.has_valid_key_hex()) {
        Some(index) => {
            let record = &job.items[index];
            Err(Error::format_error(format!(
                "record {index} (`{}`): keyHex {} does not match key `{}`",
                record.string_id, record.key_hex, record.key_name
            )))
        }
        None => Ok(()),
    }
}

/// Every string id must fall inside the job's id space unless the job opts out.
pub fn validate_id_space(job: &ResourceJob, width: u64) -> Result<(), Error> {
    if job.ignore_id_space_check {
        return Ok(());
    }
    let (start, end) = id_space_range(job.id_space, width);
    for record in &job.items {
        let inside = leading_number(&record.string_id).is_some_and(|n| n >= start && n < end);
        if !inside {
            return Err(Error::IdSpaceViolation {
                string_id: record.string_id.clone(),
                id_space: job.id_space,
                range: (start, end),
            });
        }
    }
    Ok(())
}

/// Runs every pre-write check in order: key hashes first, then id space.
pub fn validate_job(job: &ResourceJob, width: u64) -> Result<(), Error> {
    validate_key_hashes(job)?;
    validate_id_space(job, width)
}
