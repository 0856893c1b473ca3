//! `nothingai models`: the local catalog or the gateway's list.

use anyhow::Result;
use colored::Colorize;
use nothing_chat::{ChatServices, catalog_from_config};
use nothing_config::load_merged;

use crate::context::AppContext;

pub async fn execute(remote: bool) -> Result<()> {
    if remote {
        return list_remote().await;
    }

    let loaded = load_merged(&std::env::current_dir()?)?;
    let default_model = &loaded.config.models.default_model;
    let catalog = catalog_from_config(&loaded.config.models);
    for model in catalog.models() {
        let marker = if &model.id == default_model {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        let vision = if model.vision { "  vision" } else { "" };
        println!(
            "{marker} {:<48} {:<10} {:>6} tokens{vision}  {}",
            model.id,
            model.tier.as_str(),
            model.tier.limits().max_tokens,
            model.name.dimmed()
        );
    }
    Ok(())
}

async fn list_remote() -> Result<()> {
    let ctx = AppContext::load()?;
    let services = ChatServices::from_config(&ctx.config, ctx.store.clone())?;
    let listing = services.completion.models().list().await?;
    for model in &listing.data {
        let free = model
            .pricing
            .as_ref()
            .is_some_and(completion_async::types::Pricing::is_free);
        let tag = if free { "free".green() } else { "paid".normal() };
        let context = model
            .context_length
            .map(|n| format!("{n} ctx"))
            .unwrap_or_default();
        println!("{:<56} {tag:<5} {context}", model.id);
    }
    eprintln!("{}", format!("{} models", listing.data.len()).dimmed());
    Ok(())
}
