//! WhatsApp delivery through the `openclaw` CLI.
//!
//! Two messages go out per run: the MP3 as a voice note with a short caption,
//! then the text digest. `openclaw` only attaches media from its own state
//! directory, so the MP3 is staged into `~/.openclaw/media/` first.

use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tracing::{info, instrument};

use crate::error::PipelineError;
use crate::models::StorySummary;

pub const TARGET_ENV: &str = "WHATSAPP_TARGET_NUMBER";
pub const VOICE_NOTE_CAPTION: &str = "🎙️ Your AI news briefing is ready";

const OPENCLAW_BIN: &str = "openclaw";
const CHANNEL: &str = "whatsapp";

/// Sends one message, optionally with a media attachment.
pub trait MessageSender {
    async fn send(
        &self,
        target: &str,
        message: &str,
        media: Option<&Path>,
    ) -> Result<(), Box<dyn Error>>;
}

/// `openclaw message send` on the WhatsApp channel.
#[derive(Debug, Default)]
pub struct OpenClaw;

impl MessageSender for OpenClaw {
    async fn send(
        &self,
        target: &str,
        message: &str,
        media: Option<&Path>,
    ) -> Result<(), Box<dyn Error>> {
        let mut cmd = Command::new(OPENCLAW_BIN);
        cmd.args(["message", "send", "--channel", CHANNEL, "--target", target]);
        if let Some(media) = media {
            cmd.arg("--media").arg(media);
        }
        cmd.arg("--message").arg(message);

        let status = cmd.status().await?;
        if !status.success() {
            let step = if media.is_some() { "voice note" } else { "text message" };
            return Err(Box::new(PipelineError::Delivery {
                step,
                status: status.to_string(),
            }));
        }
        Ok(())
    }
}

/// Directory `openclaw` accepts media from.
pub fn default_media_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".openclaw").join("media"))
}

/// Copy `audio` into `media_dir`, keeping its file name.
pub async fn stage_media(audio: &Path, media_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let name = audio
        .file_name()
        .ok_or_else(|| format!("not a file path: {}", audio.display()))?;
    fs::create_dir_all(media_dir).await?;
    let staged = media_dir.join(name);
    fs::copy(audio, &staged).await?;
    Ok(staged)
}

/// Fallback text message built from the story list.
pub fn format_story_message(stories: &[StorySummary]) -> String {
    let mut lines = vec!["*🎙️ Today's AI News*\n".to_string()];
    for (i, story) in stories.iter().enumerate() {
        lines.push(format!("{}. *{}*", i + 1, story.title));
        lines.push(format!("   _{}_ - {}\n", story.source, story.link));
    }
    lines.push("_Daily briefing by AI News Caster_".to_string());
    lines.join("\n")
}

/// Send the voice note, then the text message, to `target`.
#[instrument(level = "info", skip_all, fields(audio = %audio.display()))]
pub async fn deliver_whatsapp<S: MessageSender>(
    sender: &S,
    audio: &Path,
    message: &str,
    target: Option<&str>,
    media_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let target = target
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(PipelineError::MissingEnv(TARGET_ENV))?;

    let staged = stage_media(audio, media_dir).await?;
    info!(%target, staged = %staged.display(), "Sending voice note");
    sender.send(target, VOICE_NOTE_CAPTION, Some(&staged)).await?;

    info!(%target, chars = message.chars().count(), "Sending text message");
    sender.send(target, message, None).await?;
    info!("Delivery complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Outbox {
        sent: RefCell<Vec<(String, String, Option<PathBuf>)>>,
        fail_text: bool,
    }

    impl MessageSender for Outbox {
        async fn send(
            &self,
            target: &str,
            message: &str,
            media: Option<&Path>,
        ) -> Result<(), Box<dyn Error>> {
            if self.fail_text && media.is_none() {
                return Err(Box::new(PipelineError::Delivery {
                    step: "text message",
                    status: "exit status: 1".to_string(),
                }));
            }
            self.sent.borrow_mut().push((
                target.to_string(),
                message.to_string(),
                media.map(Path::to_path_buf),
            ));
            Ok(())
        }
    }

    fn stories() -> Vec<StorySummary> {
        vec![
            StorySummary {
                title: "GPT-5 Released".to_string(),
                link: "https://openai.com/gpt5".to_string(),
                source: "OpenAI Blog".to_string(),
            },
            StorySummary {
                title: "Claude 4 Launches".to_string(),
                link: "https://anthropic.com/claude4".to_string(),
                source: "Anthropic".to_string(),
            },
        ]
    }

    #[test]
    fn test_format_story_message() {
        let msg = format_story_message(&stories());
        assert!(msg.starts_with("*🎙️ Today's AI News*\n"));
        assert!(msg.contains("1. *GPT-5 Released*"));
        assert!(msg.contains("   _OpenAI Blog_ - https://openai.com/gpt5"));
        assert!(msg.contains("2. *Claude 4 Launches*"));
        assert!(msg.ends_with("_Daily briefing by AI News Caster_"));
    }

    #[test]
    fn test_format_story_message_empty() {
        let msg = format_story_message(&[]);
        assert_eq!(msg, "*🎙️ Today's AI News*\n\n_Daily briefing by AI News Caster_");
    }

    #[tokio::test]
    async fn test_deliver_stages_audio_and_sends_both() {
        let tmp = tempfile::tempdir().unwrap();
        let audio = tmp.path().join("briefing-2026-02-21.mp3");
        std::fs::write(&audio, b"mp3").unwrap();
        let media_dir = tmp.path().join("media");

        let outbox = Outbox::default();
        deliver_whatsapp(&outbox, &audio, "digest", Some("+15550001111"), &media_dir)
            .await
            .unwrap();

        let staged = media_dir.join("briefing-2026-02-21.mp3");
        assert_eq!(std::fs::read(&staged).unwrap(), b"mp3");

        let sent = outbox.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "+15550001111");
        assert_eq!(sent[0].1, VOICE_NOTE_CAPTION);
        assert_eq!(sent[0].2.as_deref(), Some(staged.as_path()));
        assert_eq!(sent[1].1, "digest");
        assert_eq!(sent[1].2, None);
    }

    #[tokio::test]
    async fn test_deliver_requires_target() {
        let tmp = tempfile::tempdir().unwrap();
        let outbox = Outbox::default();
        let err = deliver_whatsapp(&outbox, &tmp.path().join("a.mp3"), "m", None, tmp.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains(TARGET_ENV));
        assert!(outbox.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_propagates_send_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let audio = tmp.path().join("a.mp3");
        std::fs::write(&audio, b"mp3").unwrap();
        let outbox = Outbox {
            fail_text: true,
            ..Default::default()
        };
        let err = deliver_whatsapp(&outbox, &audio, "m", Some("+1"), &tmp.path().join("media"))
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<PipelineError>().is_some());
        assert_eq!(outbox.sent.borrow().len(), 1);
    }
}
