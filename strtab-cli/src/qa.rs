use strtab::{CancelToken, IssueType, QaEntry, QaKey, QualityAssuranceStore};

use strtab_cli::CliConfig;

fn open_store(config: &CliConfig) -> Result<QualityAssuranceStore, String> {
    QualityAssuranceStore::open(&config.qa_database).map_err(|e| {
        format!(
            "Cannot open QA database {}: {}",
            config.qa_database.display(),
            e
        )
    })
}

fn parse_issue(issue: &str) -> Result<IssueType, String> {
    issue.parse::<IssueType>().map_err(|e| e.to_string())
}

/// Exits non-zero when the finding is unknown so scripts can branch on it.
pub fn run_qa_find(config: &CliConfig, source: &str, target: &str, issue: &str) -> Result<(), String> {
    let store = open_store(config)?;
    let key = QaKey::new(source, target, parse_issue(issue)?);
    match store
        .find(&key, &CancelToken::new())
        .map_err(|e| format!("Lookup failed: {}", e))?
    {
        Some(entry) => {
            println!(
                "Acknowledged {} at {}{}",
                entry.issue_type,
                entry.created_at.to_rfc3339(),
                entry
                    .details
                    .as_ref()
                    .map(|d| format!(": {}", d))
                    .unwrap_or_default()
            );
            Ok(())
        }
        None => Err(format!("No acknowledged {} finding for this pair", key.issue_type)),
    }
}

pub fn run_qa_save(
    config: &CliConfig,
    source: &str,
    target: &str,
    issue: &str,
    details: Option<String>,
) -> Result<(), String> {
    let store = open_store(config)?;
    let mut entry = QaEntry::new(source, target, parse_issue(issue)?);
    if let Some(details) = details {
        entry = entry.with_details(details);
    }
    store
        .save(&entry, &CancelToken::new())
        .map_err(|e| format!("Save failed: {}", e))?;
    println!("✅ Saved {} finding", entry.issue_type);
    Ok(())
}

pub fn run_qa_list(config: &CliConfig, json: bool) -> Result<(), String> {
    let store = open_store(config)?;
    let entries = store.list().map_err(|e| format!("Listing failed: {}", e))?;
    if json {
        let out = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }
    println!("{} finding(s)", entries.len());
    for entry in &entries {
        println!(
            "  [{}] {:?} -> {:?}{}",
            entry.issue_type,
            entry.source_text,
            entry.target_text,
            entry
                .details
                .as_ref()
                .map(|d| format!(" ({})", d))
                .unwrap_or_default()
        );
    }
    Ok(())
}
