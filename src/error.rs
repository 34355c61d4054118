//! Error taxonomy for conditions the pipeline needs to tell apart.
//!
//! Most stages still return `Box<dyn Error>` at the process edge; these
//! variants exist for the failures a caller reacts to specifically (an empty
//! aggregate aborts the run, a missing secret names the variable, and so on).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Nothing survived aggregation and filtering.
    #[error("no news entries found; try increasing hours_back or checking feed URLs")]
    NoEntries,

    #[error("{0} env var not set")]
    MissingEnv(&'static str),

    #[error("feed parse error: {0}")]
    Feed(String),

    #[error("TTS request failed with status {status}: {body}")]
    Tts { status: u16, body: String },

    #[error("delivery step `{step}` failed with {status}")]
    Delivery { step: &'static str, status: String },

    #[error("failed to load config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
