//! Options for loading files into a [`crate::ResourceJob`] and for the job service.

use crate::language::Language;

/// Job settings applied when a file does not carry them itself.
///
/// CSV and spreadsheet files store records only, so the language and id space
/// come from here. Binary files declare both in their header, which wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadOptions {
    pub language: Language,
    pub id_space: u32,
    pub ignore_id_space_check: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_id_space(mut self, id_space: u32) -> Self {
        self.id_space = id_space;
        self
    }

    pub fn with_ignore_id_space_check(mut self, ignore: bool) -> Self {
        self.ignore_id_space_check = ignore;
        self
    }
}

/// Default number of string ids per id space.
pub const DEFAULT_ID_SPACE_WIDTH: u64 = 100_000;

/// Settings for [`crate::JobService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Width of one id space: space `n` owns `[n*width, (n+1)*width)`.
    pub id_space_width: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            id_space_width: DEFAULT_ID_SPACE_WIDTH,
        }
    }
}

impl ServiceConfig {
    pub fn with_id_space_width(mut self, width: u64) -> Self {
        self.id_space_width = width.max(1);
        self
    }
}
