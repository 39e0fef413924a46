//! Core, format-agnostic types for strtab.
//! Codecs decode into these; encoders serialize these.

use std::{fmt::Display, path::PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error, formats::FormatType, hash, language::Language, read_options::LoadOptions,
    validation,
};

/// One localized string of a string table.
///
/// `key_hex` always renders `hash(key_name)`; use [`StringRecord::rename_key`]
/// to change the key so both stay in step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StringRecord {
    /// Session identity, assigned at load. Not persisted by any format.
    pub id: Uuid,

    /// String identifier; its leading digits place it inside an id space.
    pub string_id: String,

    /// Hex rendering of the key name's hash (see [`crate::hash::key_hex`]).
    pub key_hex: String,

    pub key_name: String,

    /// Text as it was when the record was loaded.
    pub original_text: String,

    /// Current, possibly edited, text.
    pub text: String,
}

impl StringRecord {
    pub fn new(
        string_id: impl Into<String>,
        key_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let key_name = key_name.into();
        let text = text.into();
        StringRecord {
            id: Uuid::new_v4(),
            string_id: string_id.into(),
            key_hex: hash::key_hex(&key_name),
            key_name,
            original_text: text.clone(),
            text,
        }
    }

    /// Builds a record from decoded columns, keeping the stored `key_hex` as is
    /// so a mismatch surfaces on the next serialize.
    pub(crate) fn from_parts(
        string_id: String,
        key_hex: String,
        key_name: String,
        text: String,
    ) -> Self {
        StringRecord {
            id: Uuid::new_v4(),
            string_id,
            key_hex,
            key_name,
            original_text: text.clone(),
            text,
        }
    }

    /// Renames the key and recomputes `key_hex`.
    pub fn rename_key(&mut self, key_name: impl Into<String>) {
        self.key_name = key_name.into();
        self.key_hex = hash::key_hex(&self.key_name);
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn is_modified(&self) -> bool {
        self.text != self.original_text
    }

    pub fn has_valid_key_hex(&self) -> bool {
        self.key_hex == hash::key_hex(&self.key_name)
    }
}

/// Records compare by content; `id` is ignored because it is regenerated on
/// every load.
impl PartialEq for StringRecord {
    fn eq(&self, other: &Self) -> bool {
        self.string_id == other.string_id
            && self.key_hex == other.key_hex
            && self.key_name == other.key_name
            && self.original_text == other.original_text
            && self.text == other.text
    }
}

impl Eq for StringRecord {}

impl Display for StringRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "StringRecord {{ string_id: {}, key: {} ({}), text: {} }}",
            self.string_id, self.key_name, self.key_hex, self.text
        )
    }
}

/// A loaded string table together with the settings it will be written with.
///
/// Created by [`crate::JobService::deserialize`], edited by the caller and
/// consumed by [`crate::JobService::serialize`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceJob {
    pub language: Language,
    pub id_space: u32,
    pub ignore_id_space_check: bool,
    pub format: FormatType,
    pub path: PathBuf,

    /// Records in file order.
    #[serde(default)]
    pub items: Vec<StringRecord>,
}

impl ResourceJob {
    pub fn new(path: impl Into<PathBuf>, format: FormatType) -> Self {
        ResourceJob {
            language: Language::default(),
            id_space: 0,
            ignore_id_space_check: false,
            format,
            path: path.into(),
            items: Vec::new(),
        }
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

    pub fn with_items(mut self, items: Vec<StringRecord>) -> Self {
        self.items = items;
        self
    }

    /// Applies the job-level settings carried by `options`.
    pub(crate) fn apply_options(&mut self, options: &LoadOptions) {
        self.language = options.language;
        self.id_space = options.id_space;
        self.ignore_id_space_check = options.ignore_id_space_check;
    }

    pub fn push(&mut self, record: StringRecord) {
        self.items.push(record);
    }

    /// First record with the given string id.
    pub fn find(&self, string_id: &str) -> Option<&StringRecord> {
        self.items.iter().find(|r| r.string_id == string_id)
    }

    pub fn find_mut(&mut self, string_id: &str) -> Option<&mut StringRecord> {
        self.items.iter_mut().find(|r| r.string_id == string_id)
    }

    pub fn modified_count(&self) -> usize {
        self.items.iter().filter(|r| r.is_modified()).count()
    }

    /// Runs the pre-write checks with the given id space width.
    pub fn validate(&self, id_space_width: u64) -> Result<(), Error> {
        validation::validate_job(self, id_space_width)
    }
}
