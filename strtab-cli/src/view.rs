use strtab::ResourceJob;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Longest text shown per record unless `--full` is given, in terminal columns.
const MAX_TEXT_WIDTH: usize = 50;

/// Cuts `value` to at most `max_width` display columns, appending `...` when
/// anything was dropped. Newlines are shown as `\n` so each record stays on
/// one line.
pub fn truncate_display(value: &str, max_width: usize) -> String {
    let flat = value.replace('\n', "\\n");
    if UnicodeWidthStr::width(flat.as_str()) <= max_width {
        return flat;
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in flat.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > max_width {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}

/// Print a view of the records in a job.
pub fn print_view(job: &ResourceJob, full: bool) {
    println!("=== {} ===", job.path.display());
    println!("Format: {}", job.format);
    println!("Language: {}", job.language);
    println!("Id space: {}", job.id_space);
    println!("Records: {}", job.items.len());

    for (i, record) in job.items.iter().enumerate() {
        println!("\n  Record {}: {}", i + 1, record.string_id);
        println!("    Key: {} ({})", record.key_name, record.key_hex);
        if !record.has_valid_key_hex() {
            println!("    Warning: keyHex does not match key");
        }
        if full {
            println!("    Text: {}", record.text);
        } else {
            println!("    Text: {}", truncate_display(&record.text, MAX_TEXT_WIDTH));
        }
    }
}
