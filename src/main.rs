use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing_subscriber::EnvFilter;

use grafit_chat::view::show_history;
use grafit_chat::{
    ChatView, Config, InputEvent, Notice, OpenAiChat, Session, SpeechToText, TerminalView,
    Transcriber, TurnOutcome, TurnProcessor,
};

/// grafit-chat - chat with an assistant that models electrical circuits
#[derive(Parser)]
#[command(name = "grafit-chat", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, env = "GRAFIT_CONFIG")]
    config: Option<PathBuf>,

    /// Chat model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Seconds allowed for one full reply, 0 for no limit
    #[arg(long)]
    timeout: Option<u64>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question in a fresh session and print the reply
    Ask {
        /// Question text
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    /// Transcribe an audio file and print the text
    Transcribe {
        /// Path to a WAV recording
        path: PathBuf,
    },
}

/// Line typed at the chat prompt
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Say(&'a str),
    Audio(&'a Path),
    History,
    Help,
    Quit,
}

const HELP: &str = "\
Commands:
  /audio <path>   send a recorded WAV file as a voice message
  /history        show the conversation so far
  /help           show this help
  /quit           end the session";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let default_filter = match cli.verbose {
        0 => "warn,grafit_chat=info",
        1 => "info,grafit_chat=debug",
        _ => "debug,grafit_chat=trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Missing credentials stop everything before a session exists
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if let Some(secs) = cli.timeout {
        config.llm.timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    let transcriber: Arc<dyn Transcriber> = Arc::new(SpeechToText::from_config(&config)?);

    if let Some(Command::Transcribe { path }) = &cli.command {
        let audio = tokio::fs::read(path).await?;
        let text = transcriber.transcribe(&audio).await?;
        println!("{text}");
        return Ok(ExitCode::SUCCESS);
    }

    let completion = Arc::new(OpenAiChat::from_config(&config)?);
    let processor = TurnProcessor::from_config(&config, transcriber, completion);

    match cli.command {
        Some(Command::Ask { prompt }) => ask(&processor, &config, prompt.join(" ")).await,
        _ => chat(&processor, &config).await.map(|()| ExitCode::SUCCESS),
    }
}

/// One-shot question
async fn ask(
    processor: &TurnProcessor,
    config: &Config,
    prompt: String,
) -> anyhow::Result<ExitCode> {
    let mut session = Session::new(config.system_prompt.as_str());
    let mut view = TerminalView::new(std::io::stdout());

    let outcome = processor
        .handle_input(&mut session, InputEvent::Text(prompt), &mut view)
        .await;

    Ok(if ask_succeeded(&outcome)? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Whether a one-shot turn succeeded
///
/// An aborted turn has already shown its notice, so it only fails the exit
/// status instead of being reported again.
fn ask_succeeded(outcome: &TurnOutcome) -> anyhow::Result<bool> {
    match outcome {
        TurnOutcome::Completed { .. } => Ok(true),
        TurnOutcome::Ignored => anyhow::bail!("prompt is empty"),
        TurnOutcome::Aborted(notice) => {
            tracing::debug!(%notice, "one-shot turn aborted");
            Ok(false)
        }
    }
}

/// Interactive chat until `/quit` or end of input
async fn chat(processor: &TurnProcessor, config: &Config) -> anyhow::Result<()> {
    let mut session = Session::new(config.system_prompt.as_str());
    session.initialize();

    tracing::info!(
        session_id = %session.id(),
        created_at = %session.created_at(),
        model = processor.model(),
        "chat session started"
    );

    let mut view = TerminalView::new(std::io::stdout());

    println!("💬 Grafit chat");
    println!(
        "Describe an electrical circuit or ask for it in Grafit format. Type /help for commands."
    );
    println!("Vous pouvez dicter votre question : /audio <fichier.wav>\n");
    show_history(&mut view, session.visible());

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next().await else {
            println!();
            break;
        };
        let line = line?;

        match parse_command(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::History => show_history(&mut view, session.visible()),
            ReplCommand::Audio(path) => match tokio::fs::read(path).await {
                Ok(audio) => {
                    processor
                        .handle_input(&mut session, InputEvent::Audio(audio), &mut view)
                        .await;
                }
                Err(e) => view.show_notice(&Notice::TranscriptionFailed(format!(
                    "cannot read {}: {e}",
                    path.display()
                ))),
            },
            ReplCommand::Say(text) => {
                processor
                    .handle_input(&mut session, InputEvent::Text(text.to_string()), &mut view)
                    .await;
            }
        }
    }

    tracing::info!(
        session_id = %session.id(),
        messages = session.visible().count(),
        age_secs = session.age().num_seconds(),
        "chat session ended"
    );
    Ok(())
}

fn parse_command(line: &str) -> ReplCommand<'_> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplCommand::Say(line);
    };

    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(n, a)| (n, a.trim()));

    match name {
        "quit" | "exit" => ReplCommand::Quit,
        "history" => ReplCommand::History,
        "audio" if !arg.is_empty() => ReplCommand::Audio(Path::new(arg)),
        _ => ReplCommand::Help,
    }
}
