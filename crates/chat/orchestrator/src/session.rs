use completion_async::types::{ChatMessage, ChatRequest, Completion};
use completion_async::{CancellationToken, CompletionError, StreamHandler};
use imagegen_async::types::ImageProvider;
use imagegen_async::{GeneratedImage, ImageError, ImageRequest};
use nothing_logging::GenerationKind;
use nothing_store::{
    AttachedImage, Conversation, ConversationSettings, GeneratedImageRef, ImageProviderSetting,
    Message, Role,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::ChatError;
use crate::events::ChatEvents;
use crate::intent::{self, Intent};
use crate::logging::GenLogCtx;
use crate::services::ChatServices;

const IMAGE_PENDING_TEXT: &str = "Generating image...";

/// What the user typed, plus any attached images
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub text: String,
    pub attachments: Vec<AttachedImage>,
}

impl From<&str> for UserInput {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
            attachments: vec![],
        }
    }
}

impl From<String> for UserInput {
    fn from(text: String) -> Self {
        Self {
            text,
            attachments: vec![],
        }
    }
}

/// How a turn ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Assistant text reply
    Reply(Message),
    /// Assistant message carrying a generated image
    Image(Message),
    /// Cancelled; the placeholder was removed and the user message kept
    Cancelled,
}

/// One conversation and the single turn that may be running against it
///
/// Methods take `&self`, so a session can be shared with whatever task
/// cancels turns. A second submission while a turn runs fails with
/// [`ChatError::Busy`] instead of queueing.
#[derive(Debug)]
pub struct ChatSession {
    services: ChatServices,
    conversation: Mutex<Conversation>,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Feeds streamed tokens into the placeholder message
struct TokenSink<'a> {
    conversation: &'a Mutex<Conversation>,
    placeholder_id: &'a str,
    events: &'a mut dyn ChatEvents,
}

impl StreamHandler for TokenSink<'_> {
    fn on_token(&mut self, token: &str) {
        {
            let mut conv = self
                .conversation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(msg) = conv
                .messages
                .iter_mut()
                .find(|m| m.id == self.placeholder_id)
            {
                msg.content.push_str(token);
            }
        }
        self.events.on_token(token);
    }

    fn on_complete(&mut self, _completion: &Completion) {}

    fn on_error(&mut self, _error: &CompletionError) {}
}

impl ChatSession {
    /// Session on a fresh conversation
    pub fn new(services: ChatServices, settings: ConversationSettings) -> Self {
        Self::with_conversation(services, Conversation::new(settings))
    }

    /// Session on the store's active conversation, or a fresh one
    ///
    /// Messages left mid-stream by an interrupted run are dropped.
    pub fn resume(services: ChatServices, settings: ConversationSettings) -> Self {
        let store = &services.store;
        let active = store
            .active_conversation_id()
            .and_then(|id| id.map_or(Ok(None), |id| store.load_conversation(&id)));
        let conversation = match active {
            Ok(Some(mut conv)) => {
                conv.messages.retain(|m| !m.streaming);
                conv
            }
            Ok(None) => Conversation::new(settings),
            Err(e) => {
                tracing::warn!(error = %e, "could not load active conversation; starting fresh");
                Conversation::new(settings)
            }
        };
        Self::with_conversation(services, conversation)
    }

    fn with_conversation(services: ChatServices, conversation: Conversation) -> Self {
        Self {
            services,
            conversation: Mutex::new(conversation),
            busy: AtomicBool::new(false),
        }
    }

    pub fn services(&self) -> &ChatServices {
        &self.services
    }

    /// Snapshot of the current conversation
    pub fn conversation(&self) -> Conversation {
        self.lock().clone()
    }

    /// Whether a turn is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Change settings for the current conversation
    pub fn update_settings(&self, update: impl FnOnce(&mut ConversationSettings)) {
        update(&mut self.lock().settings);
    }

    /// Switch to a fresh conversation with the current settings
    pub fn new_conversation(&self) -> Result<Conversation, ChatError> {
        let _busy = self.acquire()?;
        let fresh = {
            let mut conv = self.lock();
            let settings = conv.settings.clone();
            *conv = Conversation::new(settings);
            conv.clone()
        };
        self.services.store.set_active_conversation(None)?;
        Ok(fresh)
    }

    /// Switch to a stored conversation
    pub fn load_conversation(&self, id: &str) -> Result<Conversation, ChatError> {
        let _busy = self.acquire()?;
        let mut loaded = self
            .services
            .store
            .load_conversation(id)?
            .ok_or_else(|| ChatError::Validation(format!("no conversation with id '{id}'")))?;
        loaded.messages.retain(|m| !m.streaming);
        self.services.store.set_active_conversation(Some(id))?;
        *self.lock() = loaded.clone();
        Ok(loaded)
    }

    /// Delete a stored conversation; the current one is replaced when it goes
    pub fn delete_conversation(&self, id: &str) -> Result<bool, ChatError> {
        let _busy = self.acquire()?;
        let existed = self.services.store.delete_conversation(id)?;
        let mut conv = self.lock();
        if conv.id == id {
            let settings = conv.settings.clone();
            *conv = Conversation::new(settings);
            drop(conv);
            self.services.store.set_active_conversation(None)?;
        }
        Ok(existed)
    }

    /// [`ChatSession::submit_with_cancel`] without a cancel handle
    pub async fn submit(
        &self,
        input: impl Into<UserInput> + Send,
        events: &mut dyn ChatEvents,
    ) -> Result<TurnOutcome, ChatError> {
        self.submit_with_cancel(input, events, &CancellationToken::new())
            .await
    }

    /// Run one turn for a new user message
    ///
    /// The user message is appended before anything else happens. A message
    /// the content filter blocks is removed again and nothing is sent.
    /// Otherwise the turn goes to the image client when the text asks for a
    /// picture and to the completion client for everything else.
    pub async fn submit_with_cancel(
        &self,
        input: impl Into<UserInput> + Send,
        events: &mut dyn ChatEvents,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let input = input.into();
        let _busy = self.acquire()?;

        let text = input.text.trim().to_string();
        if text.is_empty() && input.attachments.is_empty() {
            return Err(ChatError::Validation("message is empty".into()));
        }
        let mut user = Message::user(text);
        user.attached_images = input.attachments;
        let intent = intent_of(&user);

        self.lock().messages.push(user.clone());

        let verdict = match intent {
            Intent::Image => self.services.moderator.moderate_image_prompt(&user.content),
            Intent::Chat => self.services.moderator.moderate_chat(&user.content),
        };
        if verdict.is_blocked {
            self.remove_message(&user.id);
            tracing::info!(
                reason = verdict.reason.as_deref().unwrap_or_default(),
                "message blocked by content filter"
            );
            return Err(ChatError::ModerationBlocked {
                reason: verdict.reason.unwrap_or_else(|| "restricted content".into()),
                suggestion: verdict.suggestion,
            });
        }

        {
            let mut conv = self.lock();
            conv.refresh_title();
            conv.touch();
        }
        self.autosave();

        self.dispatch(intent, &user, events, cancel).await
    }

    /// Answer the most recent user message again
    ///
    /// Everything after that message is dropped first.
    pub async fn regenerate(
        &self,
        events: &mut dyn ChatEvents,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let _busy = self.acquire()?;
        let user = {
            let mut conv = self.lock();
            let idx = conv
                .messages
                .iter()
                .rposition(|m| m.role == Role::User)
                .ok_or_else(|| ChatError::Validation("there is no message to regenerate".into()))?;
            conv.messages.truncate(idx + 1);
            conv.touch();
            conv.messages[idx].clone()
        };
        self.autosave();
        self.dispatch(intent_of(&user), &user, events, cancel).await
    }

    async fn dispatch(
        &self,
        intent: Intent,
        user: &Message,
        events: &mut dyn ChatEvents,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        tracing::debug!(?intent, "dispatching turn");
        events.on_dispatch(intent);
        match intent {
            Intent::Chat => self.chat_turn(user, events, cancel).await,
            Intent::Image => self.image_turn(user, events, cancel).await,
        }
    }

    async fn chat_turn(
        &self,
        user: &Message,
        events: &mut dyn ChatEvents,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let (request, placeholder, conversation_id) = {
            let mut conv = self.lock();
            let request = self.chat_request(&conv);
            let placeholder = Message::placeholder(request.model.clone());
            conv.messages.push(placeholder.clone());
            (request, placeholder, conv.id.clone())
        };

        let log = GenLogCtx::start(
            self.services.log.as_ref(),
            GenerationKind::Chat,
            &request.model,
            &conversation_id,
            &user.content,
        );
        let mut sink = TokenSink {
            conversation: &self.conversation,
            placeholder_id: &placeholder.id,
            events: &mut *events,
        };
        let result = self
            .services
            .completion
            .chat()
            .stream_with_cancel(request, &mut sink, cancel)
            .await;

        match result {
            Ok(completion) => {
                let message = self.settle(&placeholder.id, |m| {
                    m.content.clone_from(&completion.content);
                    m.model = Some(completion.model.clone());
                });
                log.finish(|r| {
                    r.success = true;
                    r.attempts = completion.attempts;
                    r.output_chars = completion.content.chars().count();
                    if completion.fell_back() {
                        r.served_by = Some(completion.model.clone());
                    }
                });
                self.autosave();
                events.on_message(&message);
                Ok(TurnOutcome::Reply(message))
            }
            Err(CompletionError::Cancelled) => {
                self.remove_message(&placeholder.id);
                log.finish(|r| {
                    r.cancelled = true;
                    r.attempts = 1;
                });
                self.autosave();
                tracing::info!("chat turn cancelled");
                Ok(TurnOutcome::Cancelled)
            }
            Err(e) => {
                self.remove_message(&placeholder.id);
                log.finish(|r| {
                    r.error = Some(e.to_string());
                    r.attempts = match &e {
                        CompletionError::Exhausted { attempts, .. } => *attempts,
                        _ => 1,
                    };
                });
                self.autosave();
                tracing::warn!(error = %e, "chat turn failed");
                Err(e.into())
            }
        }
    }

    async fn image_turn(
        &self,
        user: &Message,
        events: &mut dyn ChatEvents,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let (request, placeholder, conversation_id) = {
            let mut conv = self.lock();
            let request = self.image_request(&conv.settings, &user.content);
            let mut placeholder = Message::placeholder(request.model.clone());
            placeholder.content = IMAGE_PENDING_TEXT.into();
            conv.messages.push(placeholder.clone());
            (request, placeholder, conv.id.clone())
        };

        let log = GenLogCtx::start(
            self.services.log.as_ref(),
            GenerationKind::Image,
            &request.model,
            &conversation_id,
            &user.content,
        );
        let result = self
            .services
            .images
            .images()
            .generate_with_cancel(request, cancel)
            .await;

        match result {
            Ok(image) => {
                let url = self.keep_image(&image);
                let message = self.settle(&placeholder.id, |m| {
                    m.content = format!("Here is your image of \"{}\"", user.content);
                    m.model = Some(image.model.clone());
                    m.generated_image = Some(GeneratedImageRef {
                        url: url.clone(),
                        prompt: image.prompt.clone(),
                        model: image.model.clone(),
                    });
                });
                log.finish(|r| {
                    r.success = true;
                    r.attempts = 1;
                    r.output_chars = url.len();
                });
                self.autosave();
                events.on_message(&message);
                Ok(TurnOutcome::Image(message))
            }
            Err(ImageError::Cancelled) => {
                self.remove_message(&placeholder.id);
                log.finish(|r| {
                    r.cancelled = true;
                    r.attempts = 1;
                });
                self.autosave();
                tracing::info!("image turn cancelled");
                Ok(TurnOutcome::Cancelled)
            }
            Err(e) => {
                self.remove_message(&placeholder.id);
                log.finish(|r| {
                    r.error = Some(e.to_string());
                    r.attempts = match &e {
                        ImageError::Service { attempts, .. } => *attempts,
                        _ => 1,
                    };
                });
                self.autosave();
                tracing::warn!(error = %e, "image turn failed");
                Err(e.into())
            }
        }
    }

    /// Blob images are written to the store; the message then points at the file
    fn keep_image(&self, image: &GeneratedImage) -> String {
        let Some(blob) = &image.blob else {
            return image.url.clone();
        };
        match self
            .services
            .store
            .save_image(&image.id, &blob.bytes, &blob.content_type)
        {
            Ok(path) => format!("file://{}", path.display()),
            Err(e) => {
                tracing::warn!(error = %e, "could not save generated image; keeping inline data");
                image.url.clone()
            }
        }
    }

    fn chat_request(&self, conv: &Conversation) -> ChatRequest {
        let mut transcript = Vec::with_capacity(conv.messages.len() + 1);
        if !self.services.system_prompt.trim().is_empty() {
            transcript.push(ChatMessage::system(self.services.system_prompt.clone()));
        }
        for m in &conv.messages {
            if m.is_welcome() || m.streaming || m.content.trim().is_empty() {
                continue;
            }
            transcript.push(match m.role {
                Role::User if !m.attached_images.is_empty() => ChatMessage::user_with_images(
                    m.content.clone(),
                    m.attached_images.iter().map(|a| a.url.clone()),
                ),
                Role::User => ChatMessage::user(m.content.clone()),
                Role::Assistant => ChatMessage::assistant(m.content.clone()),
                Role::System => ChatMessage::system(m.content.clone()),
            });
        }
        let s = &conv.settings;
        ChatRequest::new(s.model.clone(), transcript)
            .with_temperature(s.temperature)
            .with_max_tokens(s.max_tokens)
            .with_top_p(s.top_p)
    }

    fn image_request(&self, s: &ConversationSettings, prompt: &str) -> ImageRequest {
        let mut request = ImageRequest::new(prompt)
            .with_size(s.image_width, s.image_height)
            .with_model(s.image_model.clone())
            .with_enhance(s.enhance)
            .with_provider(match s.image_provider {
                ImageProviderSetting::Url => ImageProvider::Url,
                ImageProviderSetting::Blob => ImageProvider::Blob,
            });
        if let Some(negative) = &self.services.negative_prompt {
            request = request.with_negative_prompt(negative.clone());
        }
        request
    }

    /// Finish a placeholder and return the final message
    fn settle(&self, id: &str, update: impl FnOnce(&mut Message)) -> Message {
        let mut conv = self.lock();
        conv.touch();
        match conv.messages.iter_mut().find(|m| m.id == id) {
            Some(msg) => {
                update(msg);
                msg.streaming = false;
                msg.clone()
            }
            // Only reachable if the conversation was swapped mid-turn
            None => {
                let mut msg = Message::assistant("");
                update(&mut msg);
                conv.messages.push(msg.clone());
                msg
            }
        }
    }

    fn remove_message(&self, id: &str) {
        let mut conv = self.lock();
        conv.messages.retain(|m| m.id != id);
        conv.touch();
    }

    /// Persist once there is more than the welcome message; failures are logged
    fn autosave(&self) {
        let snapshot = {
            let conv = self.lock();
            if !conv.has_content() {
                return;
            }
            conv.clone()
        };
        let store = &self.services.store;
        let saved = store
            .save_conversation(&snapshot)
            .and_then(|()| store.set_active_conversation(Some(&snapshot.id)));
        if let Err(e) = saved {
            tracing::warn!(error = %e, conversation = %snapshot.id, "auto-save failed");
        }
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, ChatError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| ChatError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Attachments always go to the chat model
fn intent_of(user: &Message) -> Intent {
    if user.attached_images.is_empty() {
        intent::classify(&user.content)
    } else {
        Intent::Chat
    }
}
