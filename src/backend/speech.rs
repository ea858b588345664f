use std::process::Stdio;

use tokio::process::Command;
use tokio::sync::mpsc;

use super::Speaker;

const LANGUAGE_PLACEHOLDER: &str = "{lang}";

/// Writes what would be spoken to the log.
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn speak(&self, text: &str, language_tag: &str) {
        log::info!("[speech {language_tag}] {text}");
    }
}

/// Used with `--mute`.
pub struct MutedSpeaker;

impl Speaker for MutedSpeaker {
    fn speak(&self, _text: &str, _language_tag: &str) {}
}

/// An external text-to-speech program, e.g. `espeak -v {lang}`. The text is
/// passed as the last argument.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechCommand {
    program: String,
    args: Vec<String>,
}

impl SpeechCommand {
    /// Returns `None` for an empty command line.
    pub fn parse(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn arguments(&self, text: &str, language_tag: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(LANGUAGE_PLACEHOLDER, &speech_language(language_tag)))
            .collect();
        args.push(text.to_string());
        args
    }

    /// Runs the program once and waits for it to exit.
    async fn say(&self, text: &str, language_tag: &str) {
        let spawned = Command::new(&self.program)
            .args(self.arguments(text, language_tag))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                if let Err(err) = child.wait().await {
                    log::debug!("Speech process did not exit cleanly: {err}");
                }
            }
            Err(err) => log::warn!("Failed to start speech program {}: {err}", self.program),
        }
    }
}

struct Utterance {
    text: String,
    language_tag: String,
}

/// Speaks through a [`SpeechCommand`], one utterance at a time in the order
/// they were requested.
pub struct CommandSpeaker {
    queue: mpsc::UnboundedSender<Utterance>,
}

impl CommandSpeaker {
    /// Starts the playback task. Must be called inside a tokio runtime.
    pub fn spawn(command: SpeechCommand) -> Self {
        let (queue, pending) = mpsc::unbounded_channel();
        tokio::spawn(play_queue(command, pending));
        Self { queue }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&self, text: &str, language_tag: &str) {
        let utterance = Utterance {
            text: text.to_string(),
            language_tag: language_tag.to_string(),
        };
        if self.queue.send(utterance).is_err() {
            log::warn!("Speech playback has stopped; dropping utterance");
        }
    }
}

async fn play_queue(command: SpeechCommand, mut pending: mpsc::UnboundedReceiver<Utterance>) {
    while let Some(utterance) = pending.recv().await {
        command.say(&utterance.text, &utterance.language_tag).await;
    }
    log::debug!("Speech queue closed");
}

/// `en-AU` -> `en-au`, the form most TTS programs accept for voices.
fn speech_language(language_tag: &str) -> String {
    language_tag.to_ascii_lowercase()
}
