//! Conversation export and import.
//!
//! JSON exports wrap conversations in `{version, exportedAt, conversations}`
//! and can be imported back. Markdown exports are for reading only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::StoreError;
use crate::model::{Conversation, Role};
use crate::store::Store;

/// Version written into JSON exports.
pub const EXPORT_VERSION: u32 = 1;

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(format!("unknown export format '{other}' (expected json or markdown)")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument {
    version: u32,
    exported_at: DateTime<Utc>,
    conversations: Vec<Conversation>,
}

/// Render conversations in the requested format.
pub fn export_conversations(
    conversations: &[Conversation],
    format: ExportFormat,
) -> Result<String, StoreError> {
    match format {
        ExportFormat::Json => {
            let doc = ExportDocument {
                version: EXPORT_VERSION,
                exported_at: Utc::now(),
                conversations: conversations.to_vec(),
            };
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        ExportFormat::Markdown => Ok(render_markdown(conversations)),
    }
}

fn render_markdown(conversations: &[Conversation]) -> String {
    let mut out = String::new();
    for (i, convo) in conversations.iter().enumerate() {
        if i > 0 {
            out.push_str("\n---\n\n");
        }
        let _ = writeln!(out, "# {}\n", convo.title);
        let _ = writeln!(
            out,
            "_Created {} · Model {}_\n",
            convo.created_at.format("%Y-%m-%d %H:%M UTC"),
            convo.settings.model
        );
        for msg in convo.messages.iter().filter(|m| !m.is_welcome()) {
            let who = match msg.role {
                Role::User => "You",
                Role::Assistant => "NothingAI",
                Role::System => "System",
            };
            let _ = writeln!(out, "**{who}** ({})\n", msg.timestamp.format("%H:%M:%S"));
            if !msg.content.is_empty() {
                let _ = writeln!(out, "{}\n", msg.content);
            }
            if let Some(img) = &msg.generated_image {
                let _ = writeln!(out, "![{}]({})\n", img.prompt, img.url);
            }
        }
    }
    out
}

/// Parse an import document.
///
/// Accepts a full export envelope, a bare array of conversations, or a
/// single conversation object.
pub fn parse_import(raw: &str) -> Result<Vec<Conversation>, StoreError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| StoreError::Import(format!("not JSON: {e}")))?;

    let conversations = if value.get("conversations").is_some() {
        let doc: ExportDocument =
            serde_json::from_value(value).map_err(|e| StoreError::Import(e.to_string()))?;
        if doc.version > EXPORT_VERSION {
            return Err(StoreError::Import(format!(
                "export version {} is newer than supported version {EXPORT_VERSION}",
                doc.version
            )));
        }
        doc.conversations
    } else if value.is_array() {
        serde_json::from_value(value).map_err(|e| StoreError::Import(e.to_string()))?
    } else {
        vec![serde_json::from_value(value).map_err(|e| StoreError::Import(e.to_string()))?]
    };

    for convo in &conversations {
        if convo.id.trim().is_empty() {
            return Err(StoreError::Import("conversation with empty id".into()));
        }
    }
    Ok(conversations)
}

impl Store {
    /// Export one conversation, or all of them when `id` is `None`.
    pub fn export(&self, id: Option<&str>, format: ExportFormat) -> Result<String, StoreError> {
        let conversations = match id {
            Some(id) => vec![
                self.load_conversation(id)?
                    .ok_or_else(|| StoreError::Import(format!("no conversation with id {id}")))?,
            ],
            None => self.list_conversations()?,
        };
        export_conversations(&conversations, format)
    }

    /// Import a JSON export, upserting by id. Returns how many were imported.
    pub fn import_json(&self, raw: &str) -> Result<usize, StoreError> {
        let conversations = parse_import(raw)?;
        self.save_conversations(&conversations)?;
        tracing::info!(count = conversations.len(), "imported conversations");
        Ok(conversations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversationSettings, GeneratedImageRef, Message};
    use tempfile::TempDir;

    fn sample() -> Conversation {
        let mut c = Conversation::new(ConversationSettings::default());
        c.messages.push(Message::user("generate an image of a red bicycle"));
        let mut reply = Message::assistant("Here is your image.");
        reply.generated_image = Some(GeneratedImageRef {
            url: "https://img.example/bike.png".into(),
            prompt: "a red bicycle".into(),
            model: "flux".into(),
        });
        c.messages.push(reply);
        c.messages.push(Message::user("thanks"));
        c.refresh_title();
        c
    }

    fn role_content(c: &Conversation) -> Vec<(Role, String)> {
        c.messages.iter().map(|m| (m.role, m.content.clone())).collect()
    }

    #[test]
    fn json_export_reimports_same_messages() {
        let temp = TempDir::new().unwrap();
        let source = Store::open(temp.path().join("a")).unwrap();
        let target = Store::open(temp.path().join("b")).unwrap();

        let original = sample();
        source.save_conversation(&original).unwrap();
        let exported = source.export(Some(&original.id), ExportFormat::Json).unwrap();

        assert_eq!(target.import_json(&exported).unwrap(), 1);
        let back = target.load_conversation(&original.id).unwrap().unwrap();
        assert_eq!(role_content(&back), role_content(&original));
        let stamps: Vec<_> = back.messages.iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn import_accepts_bare_conversation() {
        let raw = serde_json::to_string(&sample()).unwrap();
        let parsed = parse_import(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn import_rejects_newer_version() {
        let raw = r#"{"version": 99, "exportedAt": "2026-01-01T00:00:00Z", "conversations": []}"#;
        assert!(matches!(parse_import(raw), Err(StoreError::Import(_))));
    }

    #[test]
    fn markdown_import_is_unsupported() {
        let md = export_conversations(&[sample()], ExportFormat::Markdown).unwrap();
        assert!(md.starts_with("# generate an image of a red..."));
        assert!(md.contains("![a red bicycle](https://img.example/bike.png)"));
        assert!(!md.contains("I'm NothingAI"));
        assert!(parse_import(&md).is_err());
    }

    #[test]
    fn export_format_parses() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
