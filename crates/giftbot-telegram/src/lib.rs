//! Telegram adapter (teloxide).
//!
//! This crate implements the `giftbot-core` MessagingPort over Telegram Bot API
//! and feeds Telegram updates into the core conversation flow.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use giftbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{CallbackNotice, DeleteOutcome, InlineKeyboard},
    },
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn tg_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
        let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|b| InlineKeyboardButton::callback(b.label, b.callback_data))
                    .collect()
            })
            .collect();
        InlineKeyboardMarkup::new(rows)
    }

    fn map_err(e: RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }
}

/// Run a request, honoring one Telegram flood-control `RetryAfter`.
async fn with_retry<T, Fut>(mut op: impl FnMut() -> Fut) -> std::result::Result<T, RequestError>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
    Fut::IntoFuture: Send,
{
    const MAX_RETRIES: usize = 1;
    let mut attempts = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(RequestError::RetryAfter(after)) if attempts < MAX_RETRIES => {
                attempts += 1;
                sleep(after).await;
            }
            Err(other) => return Err(other),
        }
    }
}

/// Whether a delete failed only because the message is no longer there.
pub fn is_already_gone(e: &RequestError) -> bool {
    matches!(
        e,
        RequestError::Api(ApiError::MessageToDeleteNotFound)
            | RequestError::Api(ApiError::MessageIdInvalid)
    )
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = with_retry(|| self.bot.send_message(Self::tg_chat(chat_id), text.to_string()))
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_with_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let markup = Self::tg_markup(keyboard);

        let msg = with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .reply_markup(markup.clone())
        })
        .await
        .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
        with_retry(|| {
            self.bot.edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                text.to_string(),
            )
        })
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<DeleteOutcome> {
        let res = with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
        })
        .await;
        match res {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(e) if is_already_gone(&e) => Ok(DeleteOutcome::AlreadyGone),
            Err(e) => Err(Self::map_err(e)),
        }
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        notice: Option<CallbackNotice>,
    ) -> Result<()> {
        with_retry(|| {
            let mut req = self.bot.answer_callback_query(callback_id.to_string());
            if let Some(n) = &notice {
                req = req.text(n.text.clone()).show_alert(n.show_alert);
            }
            req
        })
        .await
        .map_err(Self::map_err)?;
        Ok(())
    }
}
