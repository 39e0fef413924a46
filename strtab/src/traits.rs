//! Traits for format-agnostic parsing and serialization in strtab.

use std::{
    fs,
    io::{BufRead, Cursor, Write},
    path::Path,
};

use crate::error::Error;

/// A trait for parsing and writing one string-table file.
///
/// Writing to a path goes through the service's atomic write, so only the
/// in-memory forms are required here.
///
/// # Example
///
/// ```rust,no_run
/// use strtab::traits::Parser;
/// let format = strtab::formats::csv::Format::read_from("strings.csv")?;
/// let bytes = format.to_bytes()?;
/// # Ok::<(), strtab::Error>(())
/// ```
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from file path. A missing file is [`Error::NotFound`].
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| Error::from_io_at(e, path))?;
        Self::from_bytes(&bytes)
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Encode into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        Ok(buffer)
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}
