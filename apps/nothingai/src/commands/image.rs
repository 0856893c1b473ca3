//! `nothingai image`: one image outside any conversation.

use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use imagegen_async::{CancellationToken, ImageError, ImageProvider, ImageRequest};
use nothing_chat::ChatServices;
use nothing_config::types::ImageProviderKind;
use nothing_logging::{CallTimer, GenerationKind};

use crate::context::AppContext;

#[derive(Clone, Copy, ValueEnum)]
pub enum ProviderArg {
    Url,
    Blob,
}

#[derive(Args)]
pub struct ImageArgs {
    /// What to draw
    pub prompt: String,

    /// Width in pixels (256-2048)
    #[arg(long)]
    pub width: Option<u32>,

    /// Height in pixels (256-2048)
    #[arg(long)]
    pub height: Option<u32>,

    /// Provider model id
    #[arg(long, short)]
    pub model: Option<String>,

    /// Fixed seed
    #[arg(long)]
    pub seed: Option<u32>,

    /// Send the prompt as typed
    #[arg(long)]
    pub no_enhance: bool,

    /// Override the configured provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,
}

pub async fn execute(args: ImageArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    ctx.require_license().await?;
    let services = ChatServices::from_config(&ctx.config, ctx.store.clone())?;

    let verdict = services.moderator.moderate_image_prompt(&args.prompt);
    if verdict.is_blocked {
        if let Some(suggestion) = &verdict.suggestion {
            eprintln!("{suggestion}");
        }
        anyhow::bail!(
            "Prompt blocked: {}",
            verdict.reason.as_deref().unwrap_or("restricted content")
        );
    }

    let defaults = &ctx.config.images;
    let provider = match args.provider {
        Some(ProviderArg::Blob) => ImageProvider::Blob,
        Some(ProviderArg::Url) => ImageProvider::Url,
        None => match ctx.config.services.images.provider {
            ImageProviderKind::Blob => ImageProvider::Blob,
            ImageProviderKind::Url => ImageProvider::Url,
        },
    };
    let mut request = ImageRequest::new(args.prompt.clone())
        .with_size(
            args.width.unwrap_or(defaults.width),
            args.height.unwrap_or(defaults.height),
        )
        .with_model(args.model.unwrap_or_else(|| defaults.model.clone()))
        .with_enhance(defaults.enhance && !args.no_enhance)
        .with_provider(provider);
    if let Some(seed) = args.seed {
        request = request.with_seed(seed);
    }
    if let Some(negative) = &services.negative_prompt {
        request = request.with_negative_prompt(negative.clone());
    }

    eprintln!("{}", "Generating image...".dimmed());
    let timer = CallTimer::start();
    let model = request.model.clone();
    let cancel = CancellationToken::new();
    let watcher = super::cancel_on_ctrl_c(&cancel);
    let result = services
        .images
        .images()
        .generate_with_cancel(request, &cancel)
        .await;
    watcher.abort();

    if let Some(writer) = &services.log {
        let mut record = timer.record(GenerationKind::Image, model);
        record.prompt_chars = args.prompt.chars().count();
        match &result {
            Ok(_) => {
                record.success = true;
                record.attempts = 1;
            }
            Err(ImageError::Cancelled) => record.cancelled = true,
            Err(e) => {
                if let ImageError::Service { attempts, .. } = e {
                    record.attempts = *attempts;
                }
                record.error = Some(e.to_string());
            }
        }
        if let Err(e) = writer.append(&record) {
            tracing::warn!(error = %e, "failed to append generation log record");
        }
    }

    let image = match result {
        Ok(image) => image,
        Err(ImageError::Cancelled) => {
            eprintln!("{}", "(cancelled)".yellow());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let location = match &image.blob {
        Some(blob) => {
            let path = ctx
                .store
                .save_image(&image.id, &blob.bytes, &blob.content_type)?;
            path.display().to_string()
        }
        None => image.url.clone(),
    };
    println!("{location}");
    eprintln!(
        "{}",
        format!(
            "[{} {}x{} seed {}]",
            image.model, image.width, image.height, image.seed
        )
        .dimmed()
    );
    Ok(())
}
