//! Small helpers for string handling and file system checks.
//!
//! - Character-safe truncation for entry summaries and log previews
//! - Word counting for script length estimates
//! - Compact star counts for trending titles
//! - Output directory validation

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Spoken words per minute used for duration estimates.
pub const WORDS_PER_MINUTE: usize = 150;

/// Keep at most `max` characters of `s`.
///
/// Counts `char`s, not bytes, so multi-byte text is never split mid-character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with `"…(+N bytes)"` appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        kept
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Number of whitespace-separated words.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Estimated read-aloud time in minutes.
pub fn estimated_minutes(words: usize) -> f64 {
    words as f64 / WORDS_PER_MINUTE as f64
}

/// Render a count compactly: `950`, `1.2k`, `12k`.
pub fn human_count(n: u64) -> String {
    if n < 1_000 {
        n.to_string()
    } else if n < 10_000 {
        let tenths = (n + 50) / 100;
        if tenths % 10 == 0 {
            format!("{}k", tenths / 10)
        } else {
            format!("{}.{}k", tenths / 10, tenths % 10)
        }
    } else {
        format!("{}k", n.saturating_add(500) / 1_000)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
