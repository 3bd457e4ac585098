use std::fs;
use std::path::{Path, PathBuf};

use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs,
    CreateSpeechRequestArgs, ImageUrlArgs, SpeechModel, Voice,
};
use async_openai::Client;
use tracing::info;

use crate::ffmpeg::Ffmpeg;
use crate::playlist;
use crate::workspace;

/// Longest text sent to the speech endpoint in one request.
pub(crate) const SPEECH_CHUNK_CHARS: usize = 2000;

pub(crate) const DEFAULT_PERSONA: &str = "You narrate short vertical videos. \
Everything you write is read aloud by a text to speech voice over the footage. \
Speak only as the narrator. Never mention frames, images, video length or timestamps. \
Keep it vivid and concise.";

#[derive(Debug, Clone)]
pub(crate) struct SpeechSettings {
    pub voice: Voice,
    pub model: SpeechModel,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice: Voice::Onyx,
            model: SpeechModel::Tts1,
        }
    }
}

/// What the narrator is told about the footage besides the frames themselves.
#[derive(Debug, Clone)]
pub(crate) struct NarrationBrief<'a> {
    pub persona: &'a str,
    pub description: &'a str,
    pub video_name: &'a str,
    pub speech_secs: u32,
}

fn brief_text(brief: &NarrationBrief) -> String {
    let mut text = format!("Video name: {}\n", brief.video_name);
    if !brief.description.trim().is_empty() {
        text.push_str(brief.description.trim());
        text.push('\n');
    }
    text.push_str(&format!(
        "The frames below are sampled in order from one continuous scene. \
         Write narration that fits within {} seconds of speech.",
        brief.speech_secs
    ));
    text
}

pub(crate) async fn narrate_frames(
    brief: &NarrationBrief<'_>,
    frames: Vec<String>,
) -> anyhow::Result<String> {
    let request = CreateChatCompletionRequestArgs::default()
        .model("gpt-4o")
        .max_tokens(512_u32)
        .messages([
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(brief.persona)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        [
                            vec![ChatCompletionRequestUserMessageContentPart::Text(
                                ChatCompletionRequestMessageContentPartTextArgs::default()
                                    .text(brief_text(brief))
                                    .build()?,
                            )],
                            frames
                                .into_iter()
                                .map(|frame| -> Result<_, OpenAIError> {
                                    Ok(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                                        ChatCompletionRequestMessageContentPartImageArgs::default()
                                            .image_url(ImageUrlArgs::default().url(frame).build()?)
                                            .build()?,
                                    ))
                                })
                                .collect::<Result<_, _>>()?,
                        ]
                        .concat(),
                    ))
                    .build()?,
            ),
        ])
        .build()?;

    let ai_client = Client::new();
    let response = tokio::time::timeout(
        tokio::time::Duration::from_secs(300),
        ai_client.chat().create(request),
    )
    .await??;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(anyhow::anyhow!("No content in response from OpenAI"))
}

pub(crate) async fn audio_speech(
    text: &str,
    settings: &SpeechSettings,
    output_path: &Path,
) -> anyhow::Result<()> {
    let request = CreateSpeechRequestArgs::default()
        .input(text)
        .voice(settings.voice.clone())
        .model(settings.model.clone())
        .build()?;

    let client = Client::new();
    let response = tokio::time::timeout(
        tokio::time::Duration::from_secs(120),
        client.audio().speech(request),
    )
    .await??;
    response.save(output_path).await?;
    Ok(())
}

/// Splits `text` into pieces of at most `max_chars` characters, breaking after
/// whitespace where possible and never inside a character.
pub(crate) fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let boundary = match rest.char_indices().nth(max_chars) {
            None => rest.len(),
            Some((hard_end, _)) => rest[..hard_end]
                .char_indices()
                .filter(|(_, c)| c.is_whitespace())
                .map(|(i, c)| i + c.len_utf8())
                .last()
                .unwrap_or(hard_end),
        };
        let chunk = rest[..boundary].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_owned());
        }
        rest = rest[boundary..].trim_start();
    }
    chunks
}

/// Reads `text` aloud chunk by chunk and joins the parts into `output`.
/// Does nothing when `output` already exists.
pub(crate) async fn speak_script(
    text: &str,
    settings: &SpeechSettings,
    work_dir: &Path,
    output: &Path,
    ffmpeg: &Ffmpeg,
) -> anyhow::Result<()> {
    if workspace::already_done(output) {
        return Ok(());
    }
    fs::create_dir_all(work_dir)?;

    let chunks = chunk_text(text, SPEECH_CHUNK_CHARS);
    if chunks.is_empty() {
        return Err(anyhow::anyhow!("Script is empty"));
    }

    let mut parts: Vec<PathBuf> = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let part_path = work_dir.join(format!("narration_part_{i:03}.mp3"));
        if !part_path.exists() {
            audio_speech(chunk, settings, &part_path).await?;
            info!("Generated speech part {}/{}", i + 1, chunks.len());
        }
        parts.push(part_path);
    }

    if let [single] = parts.as_slice() {
        fs::copy(single, output)?;
    } else {
        let list_path = work_dir.join("narration_parts.txt");
        playlist::write(&list_path, &playlist::render_files(&parts))?;
        ffmpeg
            .run(&crate::assemble::concat_copy_args(&list_path, output))
            .await?;
    }
    info!("Narration saved to {}", output.display());
    Ok(())
}
