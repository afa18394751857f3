use crate::domain::{ChatId, MessageRef, UserId};

/// Incoming update, already stripped of platform-specific fields.
#[derive(Clone, Debug)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
    Callback(CallbackQuery),
}

#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct CallbackQuery {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub callback_id: String,
    pub data: String,
    /// The message carrying the pressed button, if the platform still has it.
    pub message: Option<MessageRef>,
}

/// Short text shown in response to a button press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackNotice {
    pub text: String,
    /// Modal alert instead of a transient toast.
    pub show_alert: bool,
}

impl CallbackNotice {
    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            show_alert: true,
        }
    }
}

/// Result of a delete request that did not fail at the transport level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

/// Inline keyboard (buttons) attached to a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn single(button: InlineButton) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    /// Lay buttons out left to right, `per_row` buttons per row.
    pub fn in_rows(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows: Vec<Vec<InlineButton>> = Vec::new();
        for b in buttons {
            match rows.last_mut() {
                Some(row) if row.len() < per_row => row.push(b),
                _ => rows.push(vec![b]),
            }
        }
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}
