use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use giftbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    flow,
    messaging::types::IncomingUpdate,
};

use crate::router::AppState;

use super::dispatch;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let user_id = UserId(q.from.id.0 as i64);
    let pressed = q.message.as_ref().map(|m| MessageRef {
        chat_id: ChatId(m.chat.id.0),
        message_id: MessageId(m.id.0),
    });
    let data = q.data.clone().unwrap_or_default();

    // Inline-mode callbacks have no message; there is nothing to reply to.
    let Some(pressed) = pressed.filter(|_| !data.is_empty()) else {
        if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
            warn!(user_id = user_id.0, error = %e, "failed to answer callback");
        }
        return Ok(());
    };

    let query = flow::callback(
        pressed.chat_id,
        user_id,
        q.id.clone(),
        data,
        Some(pressed),
    );
    dispatch(&state, user_id, IncomingUpdate::Callback(query)).await;
    Ok(())
}
