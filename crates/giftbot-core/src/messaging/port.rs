use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{CallbackNotice, DeleteOutcome, InlineKeyboard},
    Result,
};

/// Outbound messaging port used by the conversation flow.
///
/// All texts are plain (no markup): recipient values arrive from callback
/// payloads and are echoed back verbatim.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    async fn send_with_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef>;

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()>;

    /// Delete a message. A message that no longer exists is `AlreadyGone`, not an error.
    async fn delete_message(&self, msg: MessageRef) -> Result<DeleteOutcome>;

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        notice: Option<CallbackNotice>,
    ) -> Result<()>;
}
