//! Files written for each briefing run.
//!
//! # Submodules
//!
//! - [`text`]: the spoken script and the text digest
//! - [`json`]: the run archive and the top-story summary
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── scripts/
//! │   ├── briefing-2026-02-21.txt
//! │   └── digest-2026-02-21.txt
//! ├── audio/
//! │   └── briefing-2026-02-21.mp3
//! └── archive/
//!     ├── 2026-02-21.json
//!     └── 2026-02-21-summary.json
//! ```

use std::path::{Path, PathBuf};

pub mod json;
pub mod text;

/// Output locations for one run date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BriefingPaths {
    pub script: PathBuf,
    pub digest: PathBuf,
    pub audio: PathBuf,
    pub archive: PathBuf,
    pub summary: PathBuf,
}

impl BriefingPaths {
    pub fn new(output_dir: &Path, date: &str) -> Self {
        let scripts = output_dir.join("scripts");
        let archive = output_dir.join("archive");
        Self {
            script: scripts.join(format!("briefing-{date}.txt")),
            digest: scripts.join(format!("digest-{date}.txt")),
            audio: output_dir.join("audio").join(format!("briefing-{date}.mp3")),
            archive: archive.join(format!("{date}.json")),
            summary: archive.join(format!("{date}-summary.json")),
        }
    }
}
