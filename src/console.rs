use std::io;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::{Message, SessionCommand, SessionEvent, Sender};

const RESET_COMMAND: &str = "/reset";

/// Tracks how much of the transcript has already been printed so a
/// repeated refresh prints nothing.
#[derive(Default)]
pub struct ConsoleTranscript {
    printed: usize,
    first: Option<Uuid>,
}

impl ConsoleTranscript {
    pub fn render(&mut self, rows: &[Message]) -> Vec<String> {
        let mut out = Vec::new();
        let first = rows.first().map(Message::id);
        if self.printed > 0 && (rows.len() < self.printed || first != self.first) {
            out.push("--- new conversation ---".to_string());
            self.printed = 0;
        }
        out.extend(rows[self.printed..].iter().map(format_row));
        self.printed = rows.len();
        self.first = first;
        out
    }
}

fn format_row(message: &Message) -> String {
    let speaker = match message.sender() {
        Sender::User => "you",
        Sender::Opponent => "toura",
    };
    match message.attachment() {
        Some(attachment) => format!(
            "{speaker}> {} [image {}, {} bytes]",
            message.content(),
            attachment.url,
            attachment.bytes.len()
        ),
        None => format!("{speaker}> {}", message.content()),
    }
}

/// Line-oriented front end: stdin lines become submissions, transcript
/// refreshes are printed to stdout.
pub async fn run(
    command_sender: mpsc::Sender<SessionCommand>,
    mut event_receiver: mpsc::Receiver<SessionEvent>,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = ConsoleTranscript::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let command = match line? {
                    Some(line) if line.trim() == RESET_COMMAND => SessionCommand::Reset,
                    Some(line) => SessionCommand::Submit(line),
                    None => SessionCommand::Shutdown,
                };
                let done = matches!(command, SessionCommand::Shutdown);
                if command_sender.send(command).await.is_err() || done {
                    break;
                }
            }
            event = event_receiver.recv() => {
                match event {
                    Some(SessionEvent::Refresh(rows)) => {
                        for line in transcript.render(&rows) {
                            println!("{line}");
                        }
                    }
                    Some(SessionEvent::Notice(text)) => eprintln!("! {text}"),
                    Some(SessionEvent::Busy(_)) => {}
                    None => break,
                }
            }
        }
    }

    Ok(())
}
