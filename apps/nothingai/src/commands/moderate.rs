//! `nothingai moderate`: run the content filter without sending anything.

use anyhow::Result;
use nothing_moderation::ContentModerator;

pub fn execute(text: &str, image: bool) -> Result<()> {
    let moderator = ContentModerator::new()?;
    let result = if image {
        moderator.moderate_image_prompt(text)
    } else {
        moderator.moderate_chat(text)
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
