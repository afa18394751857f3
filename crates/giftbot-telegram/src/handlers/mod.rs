//! Telegram update handlers.
//!
//! Each handler is a small adapter that turns a teloxide update into a core
//! `IncomingUpdate` and hands it to the gift flow. Flow errors are logged and
//! never stop the dispatcher.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};
use tracing::{debug, warn};

use giftbot_core::{domain::UserId, flow::Outcome, messaging::types::IncomingUpdate};

use crate::router::AppState;

mod callback;
mod commands;
mod text;

pub use commands::parse_command;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Channel posts and service messages carry no sender.
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let user_id = UserId(user.id.0 as i64);

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(&msg, user_id, state).await;
        }
    }

    text::handle_text(&msg, user_id, state).await
}

/// Run one update through the flow and log what happened.
pub(crate) async fn dispatch(state: &AppState, user_id: UserId, update: IncomingUpdate) {
    match state.flow.handle(update).await {
        Ok(outcome) => log_outcome(user_id, &outcome),
        Err(e) => warn!(user_id = user_id.0, error = %e, "update handling failed"),
    }
}

fn log_outcome(user_id: UserId, outcome: &Outcome) {
    match outcome {
        Outcome::Resolved {
            recipient,
            budget,
            suggestion,
        } => debug!(
            user_id = user_id.0,
            recipient = %recipient,
            budget = %budget,
            source = ?suggestion.source,
            "suggestion delivered"
        ),
        Outcome::Refused(reason) => {
            debug!(user_id = user_id.0, reason = reason.as_str(), "update refused")
        }
        other => debug!(user_id = user_id.0, outcome = ?other, "update handled"),
    }
}
