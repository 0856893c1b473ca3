//! `nothingai chat`: one-shot message or interactive REPL.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use nothing_chat::{
    CancellationToken, ChatError, ChatEvents, ChatServices, ChatSession, Intent, TurnOutcome,
    settings_from_config,
};
use nothing_store::Message;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::context::AppContext;

#[derive(Args)]
pub struct ChatArgs {
    /// Message to send; omit to start an interactive session
    pub message: Option<String>,

    /// Start a new conversation instead of resuming the active one
    #[arg(long)]
    pub new: bool,

    /// Chat model for this conversation
    #[arg(long, short)]
    pub model: Option<String>,
}

/// Prints streamed tokens as they arrive
struct TerminalEvents;

impl ChatEvents for TerminalEvents {
    fn on_dispatch(&mut self, intent: Intent) {
        if intent == Intent::Image {
            eprintln!("{}", "Generating image...".dimmed());
        }
    }

    fn on_token(&mut self, token: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(token.as_bytes());
        let _ = out.flush();
    }
}

enum Turn {
    Submit(String),
    Regenerate,
}

pub async fn execute(args: ChatArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    ctx.require_license().await?;

    let services = ChatServices::from_config(&ctx.config, ctx.store.clone())?;
    let session = ChatSession::resume(services, settings_from_config(&ctx.config));
    if args.new {
        session.new_conversation()?;
    }
    if let Some(model) = args.model {
        session.update_settings(|s| s.model = model);
    }

    match args.message {
        Some(text) => match run_turn(&session, Turn::Submit(text)).await {
            Ok(outcome) => {
                print_outcome(&outcome);
                Ok(())
            }
            Err(e) => {
                if let ChatError::ModerationBlocked {
                    suggestion: Some(suggestion),
                    ..
                } = &e
                {
                    eprintln!("{suggestion}");
                }
                Err(e.into())
            }
        },
        None => repl(&session).await,
    }
}

async fn repl(session: &ChatSession) -> Result<()> {
    let conv = session.conversation();
    eprintln!(
        "{} {} ({} messages)",
        "Conversation".bold(),
        conv.title.cyan(),
        conv.messages.len()
    );
    eprintln!(
        "{}",
        "/new starts over, /regen retries the last reply, /quit exits. Ctrl-C cancels a reply."
            .dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", ">".green().bold());
        let _ = std::io::stderr().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let turn = match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                session.new_conversation()?;
                eprintln!("{}", "Started a new conversation".dimmed());
                continue;
            }
            "/regen" => Turn::Regenerate,
            text => Turn::Submit(text.to_string()),
        };
        match run_turn(session, turn).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => print_turn_error(&e),
        }
    }
    Ok(())
}

async fn run_turn(session: &ChatSession, turn: Turn) -> Result<TurnOutcome, ChatError> {
    let cancel = CancellationToken::new();
    let watcher = super::cancel_on_ctrl_c(&cancel);
    let mut events = TerminalEvents;
    let result = match turn {
        Turn::Submit(text) => session.submit_with_cancel(text, &mut events, &cancel).await,
        Turn::Regenerate => session.regenerate(&mut events, &cancel).await,
    };
    watcher.abort();
    result
}

fn print_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Reply(message) => {
            println!();
            if let Some(model) = &message.model {
                eprintln!("{}", format!("[{model}]").dimmed());
            }
        }
        TurnOutcome::Image(message) => print_image(message),
        TurnOutcome::Cancelled => {
            println!();
            eprintln!("{}", "(cancelled)".yellow());
        }
    }
}

fn print_image(message: &Message) {
    println!("{}", message.content);
    if let Some(image) = &message.generated_image {
        println!("{} {}", "Image:".bold(), image.url.cyan());
        eprintln!("{}", format!("[{}]", image.model).dimmed());
    }
}

fn print_turn_error(error: &ChatError) {
    match error {
        ChatError::ModerationBlocked { reason, suggestion } => {
            eprintln!("{} {}", "BLOCKED".red(), reason);
            if let Some(suggestion) = suggestion {
                eprintln!("  {suggestion}");
            }
        }
        ChatError::Service { message, detail } => {
            eprintln!("{} {}", "ERROR".red(), message);
            tracing::debug!(%detail, "service failure");
        }
        other => eprintln!("{} {}", "ERROR".red(), other),
    }
}
