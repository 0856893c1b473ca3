use crate::error::CompletionError;
use crate::types::Completion;

/// Receives the output of a streamed chat call
///
/// `on_token` runs zero or more times in transport order, then exactly one
/// of `on_complete` or `on_error` runs.
pub trait StreamHandler: Send {
    /// A fragment of generated text
    fn on_token(&mut self, token: &str);

    /// The stream finished; `completion.content` is the full text
    fn on_complete(&mut self, completion: &Completion);

    /// The call failed for good
    fn on_error(&mut self, error: &CompletionError);
}

/// [`StreamHandler`] built from three closures
pub struct Callbacks<T, C, E> {
    on_token: T,
    on_complete: C,
    on_error: E,
}

/// Build a handler from closures
pub const fn callbacks<T, C, E>(on_token: T, on_complete: C, on_error: E) -> Callbacks<T, C, E>
where
    T: FnMut(&str) + Send,
    C: FnMut(&Completion) + Send,
    E: FnMut(&CompletionError) + Send,
{
    Callbacks {
        on_token,
        on_complete,
        on_error,
    }
}

impl<T, C, E> StreamHandler for Callbacks<T, C, E>
where
    T: FnMut(&str) + Send,
    C: FnMut(&Completion) + Send,
    E: FnMut(&CompletionError) + Send,
{
    fn on_token(&mut self, token: &str) {
        (self.on_token)(token);
    }

    fn on_complete(&mut self, completion: &Completion) {
        (self.on_complete)(completion);
    }

    fn on_error(&mut self, error: &CompletionError) {
        (self.on_error)(error);
    }
}

/// Handler that records everything it receives
#[derive(Debug, Default)]
pub struct Recorder {
    /// Tokens in arrival order
    pub tokens: Vec<String>,
    /// Full text passed to `on_complete`
    pub completed: Option<String>,
    /// Display form of the error passed to `on_error`
    pub error: Option<String>,
    /// Terminal callbacks received
    pub terminal_calls: u32,
}

impl StreamHandler for Recorder {
    fn on_token(&mut self, token: &str) {
        self.tokens.push(token.to_string());
    }

    fn on_complete(&mut self, completion: &Completion) {
        self.completed = Some(completion.content.clone());
        self.terminal_calls += 1;
    }

    fn on_error(&mut self, error: &CompletionError) {
        self.error = Some(error.to_string());
        self.terminal_calls += 1;
    }
}
