use atomicwrites::{AllowOverwrite, AtomicFile};
use serde::{Serialize, de::DeserializeOwned};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::Conversation;

/// Key holding the conversation list.
pub const KEY_CONVERSATIONS: &str = "nothingai.conversations";
/// Key holding the id of the conversation that was open last.
pub const KEY_ACTIVE_CONVERSATION: &str = "nothingai.active_conversation";
/// Key holding the obfuscated license string.
pub const KEY_LICENSE: &str = "nothingai.license";
/// Key holding the locally managed license records.
pub const KEY_LICENSE_RECORDS: &str = "nothingai.license_records";
/// Key holding this installation's device id.
pub const KEY_DEVICE_ID: &str = "nothingai.device_id";

/// Namespaced key-value store backed by one JSON file per key.
///
/// Layout under the data directory:
/// - `kv/<key>.json`: serialized values
/// - `images/<id>.<ext>`: image blobs saved from the blob provider
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(root.join("kv"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join("kv").join(format!("{key}.json")))
    }

    /// Read and deserialize a value, `None` when the key is absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read(&path)?;
        let value = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }

    /// Serialize and atomically write a value.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &bytes)
    }

    /// Remove a key. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.key_path(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // ── Conversations ──────────────────────────────────────

    /// All conversations, most recently updated first.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.get(KEY_CONVERSATIONS)?.unwrap_or_default())
    }

    pub fn load_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .list_conversations()?
            .into_iter()
            .find(|c| c.id == id))
    }

    /// Insert or replace a conversation by id.
    pub fn save_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.save_conversations(std::slice::from_ref(conversation))
    }

    /// Upsert several conversations in one write.
    pub fn save_conversations(&self, incoming: &[Conversation]) -> Result<(), StoreError> {
        let mut all = self.list_conversations()?;
        for conversation in incoming {
            match all.iter_mut().find(|c| c.id == conversation.id) {
                Some(existing) => *existing = conversation.clone(),
                None => all.push(conversation.clone()),
            }
        }
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.put(KEY_CONVERSATIONS, &all)
    }

    /// Delete a conversation; clears the active pointer if it pointed there.
    pub fn delete_conversation(&self, id: &str) -> Result<bool, StoreError> {
        let mut all = self.list_conversations()?;
        let before = all.len();
        all.retain(|c| c.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.put(KEY_CONVERSATIONS, &all)?;
        if self.active_conversation_id()?.as_deref() == Some(id) {
            self.set_active_conversation(None)?;
        }
        tracing::debug!(conversation_id = id, "deleted conversation");
        Ok(true)
    }

    pub fn active_conversation_id(&self) -> Result<Option<String>, StoreError> {
        self.get(KEY_ACTIVE_CONVERSATION)
    }

    pub fn set_active_conversation(&self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            Some(id) => self.put(KEY_ACTIVE_CONVERSATION, id),
            None => self.remove(KEY_ACTIVE_CONVERSATION).map(|_| ()),
        }
    }

    // ── Device + images ────────────────────────────────────

    /// Stable id for this installation, created on first use.
    pub fn device_id(&self) -> Result<String, StoreError> {
        if let Some(id) = self.get::<String>(KEY_DEVICE_ID)? {
            return Ok(id);
        }
        let id = format!("device-{}", uuid::Uuid::new_v4());
        self.put(KEY_DEVICE_ID, &id)?;
        Ok(id)
    }

    /// Save image bytes under `images/` and return the file path.
    pub fn save_image(
        &self,
        id: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<PathBuf, StoreError> {
        let ext = match content_type.split(';').next().map(str::trim) {
            Some("image/jpeg" | "image/jpg") => "jpg",
            Some("image/webp") => "webp",
            Some("image/gif") => "gif",
            _ => "png",
        };
        let dir = self.root.join("images");
        std::fs::create_dir_all(&dir)?;
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.join(format!("{safe_id}.{ext}"));
        write_atomic(&path, bytes)?;
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    AtomicFile::new(path, AllowOverwrite)
        .write(|f| f.write_all(bytes))
        .map_err(|e| StoreError::AtomicWrite(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversationSettings, Message};
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let temp = TempDir::new().unwrap();
        let store = Store::open(temp.path()).unwrap();
        (temp, store)
    }

    fn conversation(text: &str) -> Conversation {
        let mut c = Conversation::new(ConversationSettings::default());
        c.messages.push(Message::user(text));
        c.refresh_title();
        c
    }

    #[test]
    fn get_missing_is_none() {
        let (_t, store) = store();
        assert_eq!(store.get::<String>("nothingai.nothing").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_keys() {
        let (_t, store) = store();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                store.put(key, "x"),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn corrupt_value_reports_key() {
        let (temp, store) = store();
        std::fs::write(temp.path().join("kv").join("nothingai.device_id.json"), "{oops").unwrap();
        let err = store.get::<String>(KEY_DEVICE_ID).unwrap_err();
        assert!(err.to_string().contains(KEY_DEVICE_ID));
    }

    #[test]
    fn save_is_upsert_ordered_by_update() {
        let (_t, store) = store();
        let mut first = conversation("first question");
        let second = conversation("second question");
        store.save_conversation(&first).unwrap();
        store.save_conversation(&second).unwrap();

        first.messages.push(Message::assistant("answer"));
        first.updated_at = second.updated_at + chrono::Duration::seconds(5);
        store.save_conversation(&first).unwrap();

        let all = store.list_conversations().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[0].messages.len(), 3);
    }

    #[test]
    fn delete_clears_active_pointer() {
        let (_t, store) = store();
        let c = conversation("hello");
        store.save_conversation(&c).unwrap();
        store.set_active_conversation(Some(&c.id)).unwrap();

        assert!(store.delete_conversation(&c.id).unwrap());
        assert!(!store.delete_conversation(&c.id).unwrap());
        assert_eq!(store.active_conversation_id().unwrap(), None);
        assert!(store.load_conversation(&c.id).unwrap().is_none());
    }

    #[test]
    fn device_id_is_stable() {
        let (_t, store) = store();
        let id = store.device_id().unwrap();
        assert!(id.starts_with("device-"));
        assert_eq!(store.device_id().unwrap(), id);
    }

    #[test]
    fn save_image_picks_extension() {
        let (_t, store) = store();
        let path = store
            .save_image("img/1", &[0xff, 0xd8, 0xff], "image/jpeg")
            .unwrap();
        assert!(path.ends_with("images/img_1.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xff, 0xd8, 0xff]);
    }
}
