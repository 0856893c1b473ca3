//! NothingAI command line.
//!
//! The `nothingai` command runs chat turns and image generations against the
//! configured services, manages saved conversations and license keys, and
//! inspects `nothingai.json` configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "nothingai")]
#[command(about = "Chat and image generation with model fallback and content filtering")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the configured model; starts a REPL when no message is given
    Chat(commands::chat::ChatArgs),

    /// Generate a single image
    Image(commands::image::ImageArgs),

    /// Manage saved conversations
    Conversations {
        #[command(subcommand)]
        command: commands::conversations::ConversationCommands,
    },

    /// Validate, activate and administer license keys
    License {
        #[command(subcommand)]
        command: commands::license::LicenseCommands,
    },

    /// List chat models
    Models {
        /// Ask the gateway instead of printing the local catalog
        #[arg(long)]
        remote: bool,
    },

    /// Probe the image endpoints
    Health,

    /// Run the content filter over a piece of text
    Moderate {
        /// Text to check
        text: String,

        /// Apply the image-prompt categories instead of the chat ones
        #[arg(long)]
        image: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Chat(args) => commands::chat::execute(args).await,
        Commands::Image(args) => commands::image::execute(args).await,
        Commands::Conversations { command } => commands::conversations::execute(command),
        Commands::License { command } => commands::license::execute(command).await,
        Commands::Models { remote } => commands::models::execute(remote).await,
        Commands::Health => commands::health::execute().await,
        Commands::Moderate { text, image } => commands::moderate::execute(&text, image),
        Commands::Config { command } => commands::config::execute(command),
    }
}

/// `RUST_LOG` wins, then `-v`, then `logging.level` from config.
///
/// Logs go to stderr so streamed replies on stdout stay clean.
fn init_tracing(verbose: u8) {
    let logging = std::env::current_dir()
        .ok()
        .and_then(|dir| nothing_config::load_merged(&dir).ok())
        .map(|loaded| loaded.config.logging)
        .unwrap_or_default();

    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
