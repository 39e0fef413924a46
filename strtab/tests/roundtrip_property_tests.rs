use proptest::prelude::*;
use std::sync::Arc;
use strtab::{
    BackupStore, CancelToken, FormatType, JobService, Language, LoadOptions, ResourceJob,
    ServiceConfig, StringRecord,
};
use tempfile::TempDir;

fn string_id_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("3[0-9]{5}(_[a-z]{1,8})?").expect("valid id regex")
}

fn key_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_.]{0,15}").expect("valid key regex")
}

fn text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9 _,;\"'\\n.!?éßжあ한]{0,40}").expect("valid text regex")
}

// Workbook cells start and end with a visible character. Inside, they mix
// control characters and text shaped like OOXML `_xHHHH_` escapes.
fn cell_text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex(
        "[A-Za-z0-9éжあ]([A-Za-z0-9 _,;\"'\r\u{1}éжあ]{0,30}(_x0041_|_x005F_)?[A-Za-z0-9.!?])?",
    )
    .expect("valid cell regex")
}

fn records_strategy(
    text: impl Strategy<Value = String>,
) -> impl Strategy<Value = Vec<StringRecord>> {
    prop::collection::vec(
        (string_id_strategy(), key_strategy(), text)
            .prop_map(|(id, key, text)| StringRecord::new(id, key, text)),
        0..12,
    )
}

fn language_strategy() -> impl Strategy<Value = Language> {
    prop::sample::select(Language::ALL.to_vec())
}

fn round_trip(format: FormatType, language: Language, records: Vec<StringRecord>) {
    let dir = TempDir::new().expect("temp dir");
    let backups = BackupStore::open(dir.path().join("backups")).expect("backup store");
    let service = JobService::new(Arc::new(backups), ServiceConfig::default());
    let path = dir.path().join(format!("strings.{}", format.extension()));

    let job = ResourceJob::new(&path, format)
        .with_language(language)
        .with_id_space(3)
        .with_items(records.clone());
    service
        .serialize(job, &CancelToken::new())
        .expect("serialize generated job");

    let options = LoadOptions::new().with_language(language).with_id_space(3);
    let loaded = service
        .deserialize(&path, format, &options, &CancelToken::new())
        .expect("deserialize generated job");
    assert_eq!(loaded.items, records);
    assert_eq!(loaded.language, language);
    assert_eq!(loaded.id_space, 3);

    // Saving the unchanged job again must reproduce the same records.
    service
        .serialize(loaded.clone(), &CancelToken::new())
        .expect("re-serialize");
    let again = service
        .deserialize(&path, format, &options, &CancelToken::new())
        .expect("re-deserialize");
    assert_eq!(again.items, loaded.items);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn csv_round_trip_preserves_records(records in records_strategy(text_strategy())) {
        round_trip(FormatType::Csv, Language::EnglishUs, records);
    }

    #[test]
    fn binary_round_trip_preserves_records(
        records in records_strategy(text_strategy()),
        language in language_strategy(),
    ) {
        round_trip(FormatType::Binary, language, records);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn spreadsheet_round_trip_preserves_records(records in records_strategy(cell_text_strategy())) {
        round_trip(FormatType::Spreadsheet, Language::EnglishUs, records);
    }
}
