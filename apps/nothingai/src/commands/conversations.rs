//! Saved conversation management.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use nothing_store::{ExportFormat, Role};
use std::path::{Path, PathBuf};

use crate::context::AppContext;

#[derive(Subcommand)]
pub enum ConversationCommands {
    /// List saved conversations, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one conversation's transcript
    Show {
        /// Conversation id
        id: String,
    },

    /// Export one conversation, or all of them
    Export {
        /// Conversation id; every conversation when omitted
        id: Option<String>,

        /// `json` (importable) or `markdown`
        #[arg(long, short, default_value = "json")]
        format: ExportFormat,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import conversations from a JSON export
    Import {
        /// Export file
        file: PathBuf,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id
        id: String,
    },
}

pub fn execute(cmd: ConversationCommands) -> Result<()> {
    let ctx = AppContext::load()?;
    match cmd {
        ConversationCommands::List { json } => cmd_list(&ctx, json),
        ConversationCommands::Show { id } => cmd_show(&ctx, &id),
        ConversationCommands::Export { id, format, output } => {
            cmd_export(&ctx, id.as_deref(), format, output)
        }
        ConversationCommands::Import { file } => cmd_import(&ctx, &file),
        ConversationCommands::Delete { id } => cmd_delete(&ctx, &id),
    }
}

fn cmd_list(ctx: &AppContext, json: bool) -> Result<()> {
    let conversations = ctx.store.list_conversations()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }
    if conversations.is_empty() {
        println!("No saved conversations");
        return Ok(());
    }
    let active = ctx.store.active_conversation_id()?;
    for conv in &conversations {
        let marker = if active.as_deref() == Some(conv.id.as_str()) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{marker} {}  {}  {} ({} messages)",
            conv.id.dimmed(),
            conv.updated_at.format("%Y-%m-%d %H:%M"),
            conv.title.bold(),
            conv.messages.len()
        );
    }
    Ok(())
}

fn cmd_show(ctx: &AppContext, id: &str) -> Result<()> {
    let conv = ctx
        .store
        .load_conversation(id)?
        .with_context(|| format!("Conversation not found: {id}"))?;
    println!("{}", conv.title.bold());
    println!(
        "{}",
        format!("model {}  created {}", conv.settings.model, conv.created_at.to_rfc3339())
            .dimmed()
    );
    for message in &conv.messages {
        let who = match message.role {
            Role::User => "you".cyan(),
            Role::Assistant => "assistant".green(),
            Role::System => "system".yellow(),
        };
        println!("\n{who}:");
        println!("{}", message.content);
        if let Some(image) = &message.generated_image {
            println!("{} {}", "Image:".bold(), image.url);
        }
    }
    Ok(())
}

fn cmd_export(
    ctx: &AppContext,
    id: Option<&str>,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let rendered = ctx.store.export(id, format)?;
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Exported to {}",
                "OK".green(),
                path.display().to_string().cyan()
            );
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_import(ctx: &AppContext, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let count = ctx.store.import_json(&raw)?;
    println!("{} Imported {count} conversation(s)", "OK".green());
    Ok(())
}

fn cmd_delete(ctx: &AppContext, id: &str) -> Result<()> {
    if !ctx.store.delete_conversation(id)? {
        anyhow::bail!("Conversation not found: {id}");
    }
    println!("{} Deleted {id}", "OK".green());
    Ok(())
}
