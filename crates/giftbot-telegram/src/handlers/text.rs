use std::sync::Arc;

use teloxide::prelude::*;

use giftbot_core::{
    domain::{ChatId, UserId},
    messaging::types::{IncomingUpdate, TextMessage},
};

use crate::router::AppState;

use super::dispatch;

/// Anything that is not a command: plain text, stickers, photos and so on.
pub async fn handle_text(
    msg: &Message,
    user_id: UserId,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let text = msg.text().unwrap_or_default().to_string();
    let update = IncomingUpdate::Text(TextMessage {
        chat_id: ChatId(msg.chat.id.0),
        user_id,
        text,
    });
    dispatch(&state, user_id, update).await;
    Ok(())
}
