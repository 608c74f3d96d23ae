//! Chat-turn glue: store each turn, recall related history, assemble the prompt.
//!
//! Memory failures are non-fatal here. A failed store is logged and the turn
//! continues without it; a failed recall is treated as "no relevant history".
//! Only caller mistakes (`InvalidArgument`) are returned.

use log::warn;
use recollect_rs_memory::{
    BoundedSemanticMemory, MemoryError, MemoryRecord, MessageContent, RecallOptions, RecordId,
    Role, format_context,
};

/// Render the prompt sent to the model for one user question.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the user's question or respond to their message.\n\
         \n\
         CONVERSATION HISTORY:\n\
         {context}\n\
         \n\
         CURRENT USER QUESTION:\n\
         {question}\n\
         \n\
         Based on the conversation history and the current question, provide a helpful response.\n\
         If the question asks about information that was mentioned in previous messages, \
         be sure to recall and use that information.\n"
    )
}

/// Result of preparing a user turn.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    /// Id of the stored user message, if storing succeeded.
    pub stored: Option<RecordId>,
    /// Records recalled as context, most relevant first.
    pub context: Vec<MemoryRecord>,
    /// Prompt assembled from the context and the question.
    pub prompt: String,
}

/// A conversation backed by a bounded memory.
#[derive(Debug)]
pub struct ChatSession {
    memory: BoundedSemanticMemory,
    recall_k: usize,
    recall: RecallOptions,
}

impl ChatSession {
    pub fn new(memory: BoundedSemanticMemory, recall_k: usize, recall: RecallOptions) -> Self {
        Self {
            memory,
            recall_k,
            recall,
        }
    }

    pub fn memory(&self) -> &BoundedSemanticMemory {
        &self.memory
    }

    /// Store the user message, recall related history and build the prompt.
    pub async fn prepare_turn(&self, user_message: &str) -> Result<PreparedTurn, MemoryError> {
        let stored = match self.memory.insert(user_message, Role::User).await {
            Ok(id) => Some(id),
            Err(MemoryError::StorageUnavailable(reason)) => {
                warn!(
                    "continuing without storing user turn (session_id={}, reason={})",
                    self.memory.session_id(),
                    reason
                );
                None
            }
            Err(err) => return Err(err),
        };

        let context = match self
            .memory
            .query_with_options(user_message, self.recall_k, self.recall)
            .await
        {
            Ok(records) => records,
            Err(MemoryError::RetrievalUnavailable(reason)) => {
                warn!(
                    "continuing without history (session_id={}, reason={})",
                    self.memory.session_id(),
                    reason
                );
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let prompt = render_prompt(&format_context(&context), user_message.trim());
        Ok(PreparedTurn {
            stored,
            context,
            prompt,
        })
    }

    /// Store a model response after normalizing it to text.
    ///
    /// Returns `Ok(None)` when the response carries no text (e.g. only tool
    /// calls) or when storage is unavailable.
    pub async fn record_response(
        &self,
        response: impl Into<MessageContent>,
    ) -> Result<Option<RecordId>, MemoryError> {
        let text = response.into().into_text();
        if text.is_empty() {
            return Ok(None);
        }
        match self.memory.insert(&text, Role::Assistant).await {
            Ok(id) => Ok(Some(id)),
            Err(MemoryError::StorageUnavailable(reason)) => {
                warn!(
                    "continuing without storing response (session_id={}, reason={})",
                    self.memory.session_id(),
                    reason
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Store a completed exchange: the user message, then the normalized response.
    ///
    /// Unlike [`prepare_turn`](Self::prepare_turn), storage failures are returned.
    pub async fn remember_exchange(
        &self,
        user_message: &str,
        response: impl Into<MessageContent>,
    ) -> Result<(RecordId, Option<RecordId>), MemoryError> {
        let user_id = self.memory.insert(user_message, Role::User).await?;
        let text = response.into().into_text();
        if text.is_empty() {
            return Ok((user_id, None));
        }
        let response_id = self.memory.insert(&text, Role::Assistant).await?;
        Ok((user_id, Some(response_id)))
    }

    /// Forget everything stored for this conversation.
    pub async fn clear(&self) -> Result<(), MemoryError> {
        self.memory.clear().await
    }
}
