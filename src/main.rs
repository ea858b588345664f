use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::sync::mpsc;

use toura_chat::backend::{
    ApiAiBackend, CommandSpeaker, HttpImageFetcher, LogSpeaker, MutedSpeaker, Speaker,
    SpeechCommand,
};
use toura_chat::common::{SessionCommand, SessionEvent};
use toura_chat::config::{self, AppConfig};
use toura_chat::console;
use toura_chat::session::{
    AcceptAll, ChannelSurface, Collaborators, SessionRunner, SessionSettings, TextMetricsOracle,
};
use toura_chat::ui::{ChatApp, ChatStyle};

#[derive(Parser)]
#[command(name = "toura", version, about = "Chat with the Toura travel assistant")]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Dialogue service access token (overrides config and environment)
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,
    /// Do not speak assistant replies
    #[arg(long)]
    mute: bool,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Chat on stdin/stdout instead of opening a window
    Console,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    app_config.apply_token_overrides(cli.token.clone(), std::env::var(config::TOKEN_ENV_VAR).ok());
    if app_config.access_token.trim().is_empty() {
        log::warn!(
            "No access token configured; set {} or pass --token",
            config::TOKEN_ENV_VAR
        );
    }

    // UI -> session
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Session -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    let runner = build_runner(&app_config, cli.mute, cmd_rx, event_tx);
    let session = tokio::spawn(runner.run());

    match cli.mode {
        Some(Mode::Console) => console::run(cmd_tx, event_rx).await?,
        None => run_window(cmd_tx, event_rx)?,
    }

    if let Err(err) = session.await {
        log::error!("Session task terminated: {err}");
    }
    Ok(())
}

fn build_runner(
    app_config: &AppConfig,
    mute: bool,
    command_receiver: mpsc::Receiver<SessionCommand>,
    event_sender: mpsc::Sender<SessionEvent>,
) -> SessionRunner {
    let collaborators = Collaborators {
        backend: Arc::new(ApiAiBackend::new(
            app_config.api_base_url.clone(),
            app_config.access_token.clone(),
            app_config.language.clone(),
        )),
        fetcher: Arc::new(HttpImageFetcher::new(app_config.image_max_bytes)),
        speaker: build_speaker(app_config, mute),
        gate: Box::new(AcceptAll),
    };
    let settings = SessionSettings {
        greeting: app_config.greeting.clone(),
        speech_language: app_config.speech_language.clone(),
    };

    SessionRunner::new(
        settings,
        collaborators,
        Box::new(ChannelSurface::new(event_sender)),
        command_receiver,
        app_config.reply_timeout(),
    )
}

fn build_speaker(app_config: &AppConfig, mute: bool) -> Arc<dyn Speaker> {
    if mute {
        return Arc::new(MutedSpeaker);
    }
    match SpeechCommand::parse(&app_config.speech_command) {
        Some(command) => Arc::new(CommandSpeaker::spawn(command)),
        None => Arc::new(LogSpeaker),
    }
}

fn run_window(
    cmd_tx: mpsc::Sender<SessionCommand>,
    event_rx: mpsc::Receiver<SessionEvent>,
) -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);
    let shutdown_tx = cmd_tx.clone();

    let result = eframe::run_native(
        "Toura Chat",
        options,
        Box::new(move |cc| {
            let event_receiver = event_rx
                .take()
                .expect("ChatApp should only be initialized once");

            log::info!("Chat window opened");

            Ok(Box::new(ChatApp::new(
                cc,
                cmd_tx.clone(),
                event_receiver,
                TextMetricsOracle::default(),
                ChatStyle::default(),
            )))
        }),
    );

    if let Err(err) = shutdown_tx.try_send(SessionCommand::Shutdown) {
        log::warn!("Failed to stop session: {err}");
    }
    result
}
