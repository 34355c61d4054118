//! Text-to-speech via the ElevenLabs HTTP API.
//!
//! The script is cleaned of stage markers, split into chunks under the
//! per-request character limit, synthesized chunk by chunk and written as a
//! single MP3 (MP3 frames concatenate cleanly).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration as StdDuration;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::api::Backoff;
use crate::config::TtsConfig;
use crate::error::PipelineError;

pub const ELEVENLABS_BASE: &str = "https://api.elevenlabs.io";
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

const TTS_TIMEOUT: StdDuration = StdDuration::from_secs(120);

static PAUSE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[pause\]").unwrap());
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Turns a piece of text into audio bytes.
pub trait Synthesize {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Box<dyn Error>>;
}

/// Strip `[pause]` markers and surrounding whitespace.
pub fn clean_script(script: &str) -> String {
    PAUSE_MARKER.replace_all(script, "").trim().to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Sentences of a paragraph, whitespace normalized to single spaces.
fn sentences(paragraph: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in paragraph.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            out.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}

/// Break one paragraph into pieces that each fit in `max_chars`.
fn split_to_fit(paragraph: &str, max_chars: usize) -> Vec<String> {
    if char_len(paragraph) <= max_chars {
        return vec![paragraph.to_string()];
    }

    let mut pieces = Vec::new();
    for sentence in sentences(paragraph) {
        if char_len(&sentence) <= max_chars {
            pieces.push(sentence);
            continue;
        }
        for word in sentence.split_whitespace() {
            if char_len(word) <= max_chars {
                pieces.push(word.to_string());
            } else {
                // a single token longer than the limit; cut it by characters
                let chars: Vec<char> = word.chars().collect();
                pieces.extend(chars.chunks(max_chars).map(|c| c.iter().collect::<String>()));
            }
        }
    }
    pieces
}

/// Split `text` into chunks of at most `max_chars` characters, preferring
/// paragraph, then sentence, then word boundaries.
pub fn chunk_script(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let mut sep = "\n\n";
        for piece in split_to_fit(paragraph, max_chars) {
            if current.is_empty() {
                current = piece;
            } else if char_len(&current) + sep.len() + char_len(&piece) <= max_chars {
                current.push_str(sep);
                current.push_str(&piece);
            } else {
                chunks.push(std::mem::take(&mut current));
                current = piece;
            }
            sep = " ";
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// ElevenLabs client bound to one voice, model and output format.
#[derive(Debug)]
pub struct ElevenLabs {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model_id: String,
    backoff: Backoff,
}

impl ElevenLabs {
    pub fn new(api_key: &str, settings: &TtsConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(TTS_TIMEOUT).build()?;
        let endpoint = format!(
            "{ELEVENLABS_BASE}/v1/text-to-speech/{}?output_format={}",
            urlencoding::encode(&settings.voice_id),
            urlencoding::encode(&settings.output_format),
        );
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint,
            model_id: settings.model_id.clone(),
            backoff: Backoff::default(),
        })
    }

    async fn request(&self, text: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("xi-api-key", &self.api_key)
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Box::new(PipelineError::Tts {
                status: status.as_u16(),
                body,
            }));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

impl Synthesize for ElevenLabs {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Box<dyn Error>> {
        self.backoff.retry("tts", || self.request(text)).await
    }
}

/// Clean, chunk and synthesize `script`, writing the joined audio to `output_path`.
#[instrument(level = "info", skip_all, fields(output = %output_path.display()))]
pub async fn synthesize_to_file<S: Synthesize>(
    synth: &S,
    script: &str,
    output_path: &Path,
    max_chars: usize,
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let chunks = chunk_script(&clean_script(script), max_chars);
    info!(chunks = chunks.len(), "Generating audio");

    let mut audio = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let bytes = synth.synthesize(chunk).await?;
        debug!(chunk = i + 1, chars = char_len(chunk), bytes = bytes.len(), "Chunk synthesized");
        audio.extend_from_slice(&bytes);
    }

    fs::write(output_path, &audio).await?;
    info!(bytes = audio.len(), "Audio saved");
    Ok(())
}

/// Generate the MP3 for `script` with ElevenLabs.
pub async fn generate_audio(
    script: &str,
    output_path: &Path,
    settings: &TtsConfig,
    api_key: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(PipelineError::MissingEnv(API_KEY_ENV))?;
    let client = ElevenLabs::new(api_key, settings)?;
    synthesize_to_file(&client, script, output_path, settings.max_chars).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl Synthesize for Recorder {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Box<dyn Error>> {
            let n = {
                let mut calls = self.calls.borrow_mut();
                calls.push(text.to_string());
                calls.len()
            };
            Ok(format!("chunk{n}").into_bytes())
        }
    }

    #[test]
    fn test_clean_script_strips_pause_markers() {
        assert_eq!(
            clean_script("  Hello. [pause] Next story. [PAUSE]\n"),
            "Hello.  Next story."
        );
        assert_eq!(clean_script("[Pause]"), "");
    }

    #[test]
    fn test_short_script_is_one_chunk() {
        let chunks = chunk_script("Hello there.\n\nSecond paragraph.", 4500);
        assert_eq!(chunks, vec!["Hello there.\n\nSecond paragraph.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_limit_and_keep_words() {
        let paragraph = "This is a sentence about models. Another one follows here! Does it fit? ";
        let text = format!("{}\n\n{}\n\n{}", paragraph.repeat(3), paragraph.repeat(2), "Short end.");
        let chunks = chunk_script(&text, 80);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80, "chunk too long: {chunk:?}");
        }
        let rejoined = chunks.join(" ");
        let original: Vec<&str> = text.split_whitespace().collect();
        let after: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(original, after);
    }

    #[test]
    fn test_overlong_sentence_splits_on_words() {
        let sentence = "word ".repeat(30);
        let chunks = chunk_script(sentence.trim(), 12);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.join(" ").split_whitespace().count(), 30);
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let a = "a".repeat(40);
        let b = "b".repeat(40);
        let chunks = chunk_script(&format!("{a}\n\n{b}"), 60);
        assert_eq!(chunks, vec![a, b]);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_audio("Test.", &dir.path().join("out.mp3"), &TtsConfig::default(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));

        let err = generate_audio("Test.", &dir.path().join("out.mp3"), &TtsConfig::default(), Some(" "))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ELEVENLABS_API_KEY"));
    }

    #[tokio::test]
    async fn test_synthesize_to_file_concatenates_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("dir").join("briefing.mp3");
        let synth = Recorder {
            calls: RefCell::new(Vec::new()),
        };

        let script = format!("{}\n\n[pause]{}", "x".repeat(30), "y".repeat(30));
        synthesize_to_file(&synth, &script, &out, 40).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"chunk1chunk2");
        let calls = synth.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].contains("[pause]"));
    }
}
