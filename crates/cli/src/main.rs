use clap::{Parser, Subcommand};

use sift::message::IncomingMessage;
use sift::middleware::DialogflowMiddleware;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Sift CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: SIFT_CONFIG_PATH or ~/.sift/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Send one message to the NLU agent and print the extras it would attach.
    Detect {
        /// Message text.
        text: String,

        /// Conversation id used to derive the provider session (default: "cli").
        #[arg(long, value_name = "ID", default_value = "cli")]
        conversation: String,

        /// Config file path (default: SIFT_CONFIG_PATH or ~/.sift/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat through the middleware pipeline (interactive). Replies with the agent's fulfillment text;
    /// with nlu.listenForAction, replies to messages with a detected action are prefixed by it.
    Chat {
        /// Conversation id used to derive the provider session (default: "cli").
        #[arg(long, value_name = "ID", default_value = "cli")]
        conversation: String,

        /// Config file path (default: SIFT_CONFIG_PATH or ~/.sift/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("sift {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Detect {
            text,
            conversation,
            config,
        }) => {
            if let Err(e) = run_detect(config, conversation, text).await {
                log::error!("detect failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            conversation,
            config,
        }) => {
            if let Err(e) = run_chat(config, conversation).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(sift::config::default_config_path);
    let dir = sift::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn load_middleware(
    config_path: Option<std::path::PathBuf>,
) -> anyhow::Result<DialogflowMiddleware> {
    let (config, path) = sift::config::load_config(config_path)?;
    log::debug!("loaded config from {}", path.display());
    let nlu = sift::config::nlu_config(&config)?;
    log::info!(
        "dialogflow agent {} (language {}, listen for action: {})",
        nlu.project_id,
        nlu.language,
        nlu.listen_for_action
    );
    Ok(DialogflowMiddleware::new(nlu))
}

async fn run_detect(
    config_path: Option<std::path::PathBuf>,
    conversation: String,
    text: String,
) -> anyhow::Result<()> {
    let middleware = load_middleware(config_path)?;
    let message = IncomingMessage::new(conversation, text).with_channel("cli");
    let extras = middleware.detect(&message).await?;
    println!("{}", serde_json::to_string_pretty(&extras)?);
    Ok(())
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    conversation: String,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let pipeline = sift::chat::chat_pipeline(load_middleware(config_path)?);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let message = IncomingMessage::new(conversation.clone(), input).with_channel("stdin");
        match pipeline.handle(message).await {
            Ok(replies) if replies.is_empty() => println!("< (no reply)"),
            Ok(replies) => {
                for reply in replies {
                    println!("< {}", reply.text);
                }
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}
