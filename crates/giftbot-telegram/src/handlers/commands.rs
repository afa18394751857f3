use std::sync::Arc;

use teloxide::prelude::*;

use giftbot_core::{
    domain::{ChatId, UserId},
    messaging::types::{Command, IncomingUpdate},
};

use crate::router::AppState;

use super::dispatch;

/// Lowercase command name from `/cmd@botname args`; arguments are ignored.
pub fn parse_command(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

pub async fn handle_command(
    msg: &Message,
    user_id: UserId,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let cmd = Command {
        chat_id: ChatId(msg.chat.id.0),
        user_id,
        name: parse_command(text),
    };
    dispatch(&state, user_id, IncomingUpdate::Command(cmd)).await;
    Ok(())
}
