//! `nothingai health`: probe the image endpoints once each.

use anyhow::Result;
use colored::Colorize;
use nothing_chat::ChatServices;

use crate::context::AppContext;

pub async fn execute() -> Result<()> {
    let ctx = AppContext::load()?;
    let services = ChatServices::from_config(&ctx.config, ctx.store.clone())?;
    let report = services.images.images().health().await;

    let mut healthy = 0;
    for endpoint in &report {
        if endpoint.healthy {
            healthy += 1;
            println!("{} {}", "OK".green(), endpoint.endpoint);
        } else {
            println!("{} {}", "DOWN".red(), endpoint.endpoint);
        }
    }
    if healthy == 0 {
        anyhow::bail!("No image endpoint is reachable");
    }
    Ok(())
}
