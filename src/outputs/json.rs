//! Archive and summary JSON.
//!
//! The archive records everything the run saw (all ranked entries, the
//! story list, and where the script, digest and audio ended up). The
//! summary holds only the `{title, link, source}` list used for delivery.

use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::models::{BriefingArchive, StorySummary};

async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    fs::write(path, json).await?;
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display(), date = %archive.date))]
pub async fn write_archive(archive: &BriefingArchive, path: &Path) -> Result<(), Box<dyn Error>> {
    write_pretty(path, archive).await?;
    info!(
        entries = archive.entries_found,
        top_stories = archive.top_stories.len(),
        "Archive saved"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_summary(stories: &[StorySummary], path: &Path) -> Result<(), Box<dyn Error>> {
    write_pretty(path, &stories).await?;
    info!(stories = stories.len(), "Summary saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewsEntry, Priority, Published};
    use chrono::{TimeZone, Utc};

    fn sample_archive() -> BriefingArchive {
        let entry = NewsEntry::new(
            "Story A",
            "https://a.com",
            "...",
            Published::At(Utc.with_ymd_and_hms(2026, 2, 22, 8, 0, 0).unwrap()),
            "SourceA",
            Priority::High,
        );
        let undated = NewsEntry::new(
            "Story B",
            "https://b.com",
            "",
            Published::Unknown,
            "SourceB",
            Priority::Low,
        );
        BriefingArchive {
            date: "2026-02-22".to_string(),
            entries_found: 2,
            top_stories: vec![StorySummary::from(&entry)],
            entries: vec![entry, undated],
            script_path: "scripts/briefing-2026-02-22.txt".to_string(),
            audio_path: None,
            digest_path: Some("scripts/digest-2026-02-22.txt".to_string()),
            script_word_count: 3,
        }
    }

    #[tokio::test]
    async fn test_archive_json_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("archive").join("2026-02-22.json");
        write_archive(&sample_archive(), &path).await.unwrap();

        let data: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(data["date"], "2026-02-22");
        assert_eq!(data["entries_found"], 2);
        assert_eq!(data["top_stories"][0]["title"], "Story A");
        assert_eq!(data["top_stories"][0]["link"], "https://a.com");
        assert_eq!(data["top_stories"][0]["source"], "SourceA");
        assert_eq!(data["entries"][0]["priority"], "high");
        assert_eq!(data["entries"][0]["published"], "2026-02-22T08:00:00+00:00");
        assert_eq!(data["entries"][1]["published"], "unknown");
        assert!(data["audio_path"].is_null());
    }

    #[tokio::test]
    async fn test_summary_json_saved() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("archive").join("2026-02-22-summary.json");
        let stories = sample_archive().top_stories;
        write_summary(&stories, &path).await.unwrap();

        let back: Vec<StorySummary> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, stories);
    }
}
