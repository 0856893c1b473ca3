//! Generation log records for chat and image turns.

use nothing_logging::{CallTimer, GenerationKind, GenerationRecord, LogWriter};

/// Timing and identity for one generation call
///
/// Logging is best-effort: a failed append is reported through tracing and
/// never fails the turn.
pub(crate) struct GenLogCtx {
    timer: CallTimer,
    writer: Option<LogWriter>,
    kind: GenerationKind,
    model: String,
    conversation_id: String,
    prompt_chars: usize,
}

impl GenLogCtx {
    pub(crate) fn start(
        writer: Option<&LogWriter>,
        kind: GenerationKind,
        model: &str,
        conversation_id: &str,
        prompt: &str,
    ) -> Self {
        Self {
            timer: CallTimer::start(),
            writer: writer.cloned(),
            kind,
            model: model.to_string(),
            conversation_id: conversation_id.to_string(),
            prompt_chars: prompt.chars().count(),
        }
    }

    /// Append the record after `fill` sets the outcome fields
    pub(crate) fn finish(self, fill: impl FnOnce(&mut GenerationRecord)) {
        let Some(writer) = self.writer else {
            return;
        };
        let mut record = self.timer.record(self.kind, self.model);
        record.conversation_id = Some(self.conversation_id);
        record.prompt_chars = self.prompt_chars;
        fill(&mut record);
        if let Err(e) = writer.append(&record) {
            tracing::warn!(error = %e, "failed to append generation log record");
        }
    }
}
