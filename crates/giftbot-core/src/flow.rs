//! Conversation state machine: Idle -> AwaitingRecipient -> AwaitingBudget -> Idle.
//!
//! The flow owns no transport details; it talks to the user through
//! [`MessagingPort`] and keeps per-user progress in an injected [`SessionStore`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    budget::BudgetCode,
    domain::{ChatId, MessageRef, UserId},
    messaging::{
        port::MessagingPort,
        types::{
            CallbackNotice, CallbackQuery, Command, DeleteOutcome, IncomingUpdate, InlineButton,
            InlineKeyboard, TextMessage,
        },
    },
    session::{SessionStore, Step},
    suggestion::{Suggestion, SuggestionResolver, SuggestionSource},
    Result,
};

pub const START_FLOW: &str = "start_flow";
const RECIPIENT_PREFIX: &str = "recipient:";
const BUDGET_PREFIX: &str = "budget:";

/// User-facing texts.
pub mod texts {
    pub const WELCOME: &str =
        "Привет! 😊 Я помогу подобрать идеальный подарок.\nНажми кнопку ниже, чтобы начать:";
    pub const HELP: &str = "Я подбираю идею подарка в два шага: кому и на какой бюджет.\n\
/start — начать, /cancel — сбросить подбор.";
    pub const START_BUTTON: &str = "🎁 Помоги выбрать подарок";
    pub const ASK_RECIPIENT: &str = "🎁 Кому будем выбирать подарок?";
    pub const THINKING: &str = "✨ Подбираю идею подарка...\n(это может занять несколько секунд)";
    pub const AGAIN: &str = "Хочешь подобрать ещё один подарок?";
    pub const HINT: &str = "Нажми /start или кнопку ниже, чтобы начать подбор подарка 👇";
    pub const PRESS_START_FIRST: &str = "Сначала нажми «Помоги выбрать подарок»";
    pub const CHOOSE_RECIPIENT_FIRST: &str = "Сначала выбери получателя";
    pub const USE_RECIPIENT_BUTTONS: &str = "Выбери получателя кнопкой ниже";
    pub const USE_BUDGET_BUTTONS: &str = "Выбери бюджет кнопкой ниже";
    pub const CANCELLED: &str = "Подбор отменён.";
    pub const NOTHING_TO_CANCEL: &str = "Сейчас нечего отменять.";

    pub fn recipient_chosen(recipient: &str) -> String {
        format!("✅ Выбрано: подарок {recipient}\n💰 Укажи бюджет:")
    }

    pub fn result(recipient: &str, budget_text: &str, suggestion: &str) -> String {
        format!("🎁 Подарок {recipient} в бюджете {budget_text}:\n\n{suggestion}")
    }
}

/// A recipient offered in the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecipientOption {
    /// Value carried in `recipient:<value>` and echoed in replies.
    pub value: &'static str,
    pub label: &'static str,
}

pub const RECIPIENTS: [RecipientOption; 3] = [
    RecipientOption {
        value: "другу",
        label: "Другу 👨",
    },
    RecipientOption {
        value: "подруге",
        label: "Подруге 👩",
    },
    RecipientOption {
        value: "программисту",
        label: "Программисту 💻",
    },
];

pub fn find_recipient(value: &str) -> Option<RecipientOption> {
    RECIPIENTS.into_iter().find(|r| r.value == value)
}

/// Structured callback payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    StartFlow,
    Recipient(String),
    Budget(String),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == START_FLOW {
            return Some(Self::StartFlow);
        }
        if let Some(v) = data.strip_prefix(RECIPIENT_PREFIX) {
            return Some(Self::Recipient(v.to_string()));
        }
        if let Some(v) = data.strip_prefix(BUDGET_PREFIX) {
            return Some(Self::Budget(v.to_string()));
        }
        None
    }

    pub fn encode(&self) -> String {
        match self {
            Self::StartFlow => START_FLOW.to_string(),
            Self::Recipient(v) => format!("{RECIPIENT_PREFIX}{v}"),
            Self::Budget(v) => format!("{BUDGET_PREFIX}{v}"),
        }
    }
}

pub fn main_keyboard() -> InlineKeyboard {
    InlineKeyboard::single(InlineButton::new(
        texts::START_BUTTON,
        CallbackAction::StartFlow.encode(),
    ))
}

pub fn recipient_keyboard() -> InlineKeyboard {
    let buttons = RECIPIENTS
        .iter()
        .map(|r| {
            InlineButton::new(
                r.label,
                CallbackAction::Recipient(r.value.to_string()).encode(),
            )
        })
        .collect();
    InlineKeyboard::in_rows(buttons, 2)
}

pub fn budget_keyboard() -> InlineKeyboard {
    let buttons = BudgetCode::ALL
        .iter()
        .map(|b| {
            InlineButton::new(
                b.button_label(),
                CallbackAction::Budget(b.code().to_string()).encode(),
            )
        })
        .collect();
    InlineKeyboard::in_rows(buttons, 2)
}

/// Why an input did not advance the flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refusal {
    RecipientOutOfOrder,
    UnknownRecipient,
    BudgetOutOfOrder,
    UnknownBudget,
    UnknownAction,
}

impl Refusal {
    fn notice(self) -> CallbackNotice {
        match self {
            Refusal::RecipientOutOfOrder => CallbackNotice::alert(texts::PRESS_START_FIRST),
            Refusal::UnknownRecipient => CallbackNotice::alert(texts::USE_RECIPIENT_BUTTONS),
            Refusal::BudgetOutOfOrder => CallbackNotice::alert(texts::CHOOSE_RECIPIENT_FIRST),
            Refusal::UnknownBudget => CallbackNotice::alert(texts::USE_BUDGET_BUTTONS),
            Refusal::UnknownAction => CallbackNotice::toast(texts::HINT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Refusal::RecipientOutOfOrder => "recipient_out_of_order",
            Refusal::UnknownRecipient => "unknown_recipient",
            Refusal::BudgetOutOfOrder => "budget_out_of_order",
            Refusal::UnknownBudget => "unknown_budget",
            Refusal::UnknownAction => "unknown_action",
        }
    }
}

/// What handling an update did; handy for logs and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Welcomed,
    Helped,
    Hinted,
    Started,
    RecipientChosen(String),
    Resolved {
        recipient: String,
        budget: BudgetCode,
        suggestion: Suggestion,
    },
    Refused(Refusal),
    Cancelled {
        had_state: bool,
    },
}

pub struct GiftFlow {
    store: Arc<SessionStore>,
    resolver: Arc<SuggestionResolver>,
    messenger: Arc<dyn MessagingPort>,
    audit: Option<Arc<AuditLogger>>,
}

impl GiftFlow {
    pub fn new(
        store: Arc<SessionStore>,
        resolver: Arc<SuggestionResolver>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Self {
        Self {
            store,
            resolver,
            messenger,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub async fn handle(&self, update: IncomingUpdate) -> Result<Outcome> {
        match update {
            IncomingUpdate::Command(cmd) => self.handle_command(cmd).await,
            IncomingUpdate::Text(msg) => self.handle_text(msg).await,
            IncomingUpdate::Callback(q) => self.handle_callback(q).await,
        }
    }

    pub async fn handle_command(&self, cmd: Command) -> Result<Outcome> {
        match cmd.name.as_str() {
            "start" => {
                self.messenger
                    .send_with_keyboard(cmd.chat_id, texts::WELCOME, main_keyboard())
                    .await?;
                Ok(Outcome::Welcomed)
            }
            "help" => {
                self.messenger
                    .send_with_keyboard(cmd.chat_id, texts::HELP, main_keyboard())
                    .await?;
                Ok(Outcome::Helped)
            }
            "cancel" => {
                let had_state = self.store.clear(cmd.user_id).await;
                if had_state {
                    self.audit(AuditEvent::cancel(cmd.user_id.0));
                }
                let text = if had_state {
                    texts::CANCELLED
                } else {
                    texts::NOTHING_TO_CANCEL
                };
                self.messenger
                    .send_with_keyboard(cmd.chat_id, text, main_keyboard())
                    .await?;
                Ok(Outcome::Cancelled { had_state })
            }
            _ => self.hint(cmd.chat_id).await,
        }
    }

    /// Free text is never interpreted; it only earns a hint.
    pub async fn handle_text(&self, msg: TextMessage) -> Result<Outcome> {
        debug!(user_id = msg.user_id.0, "free text ignored");
        self.hint(msg.chat_id).await
    }

    pub async fn handle_callback(&self, q: CallbackQuery) -> Result<Outcome> {
        match CallbackAction::parse(&q.data) {
            Some(CallbackAction::StartFlow) => self.start(&q).await,
            Some(CallbackAction::Recipient(v)) => self.choose_recipient(&q, &v).await,
            Some(CallbackAction::Budget(code)) => self.choose_budget(&q, &code).await,
            None => self.refuse(&q, Refusal::UnknownAction).await,
        }
    }

    async fn start(&self, q: &CallbackQuery) -> Result<Outcome> {
        self.store.begin(q.user_id).await;
        info!(user_id = q.user_id.0, "gift flow started");
        self.audit(AuditEvent::flow_start(q.user_id.0));

        self.answer(&q.callback_id, None).await;
        self.discard_pressed(q).await;
        self.messenger
            .send_with_keyboard(q.chat_id, texts::ASK_RECIPIENT, recipient_keyboard())
            .await?;
        Ok(Outcome::Started)
    }

    async fn choose_recipient(&self, q: &CallbackQuery, value: &str) -> Result<Outcome> {
        // Out-of-order presses win over bad values.
        if self.store.step(q.user_id).await != Step::AwaitingRecipient {
            return self.refuse(q, Refusal::RecipientOutOfOrder).await;
        }
        let Some(option) = find_recipient(value) else {
            return self.refuse(q, Refusal::UnknownRecipient).await;
        };
        if let Err(e) = self.store.record_recipient(q.user_id, option.value).await {
            debug!(user_id = q.user_id.0, ?e, "recipient choice out of order");
            return self.refuse(q, Refusal::RecipientOutOfOrder).await;
        }
        info!(user_id = q.user_id.0, recipient = option.value, "recipient chosen");
        self.audit(AuditEvent::recipient(q.user_id.0, option.value));

        self.answer(&q.callback_id, None).await;
        self.discard_pressed(q).await;
        self.messenger
            .send_with_keyboard(
                q.chat_id,
                &texts::recipient_chosen(option.value),
                budget_keyboard(),
            )
            .await?;
        Ok(Outcome::RecipientChosen(option.value.to_string()))
    }

    async fn choose_budget(&self, q: &CallbackQuery, code: &str) -> Result<Outcome> {
        if self.store.step(q.user_id).await != Step::AwaitingBudget {
            return self.refuse(q, Refusal::BudgetOutOfOrder).await;
        }
        let Some(budget) = BudgetCode::from_code(code) else {
            return self.refuse(q, Refusal::UnknownBudget).await;
        };
        // Taking the state here makes a repeated press a no-op.
        let recipient = match self.store.take_for_budget(q.user_id).await {
            Ok(r) => r,
            Err(e) => {
                debug!(user_id = q.user_id.0, ?e, "budget choice out of order");
                return self.refuse(q, Refusal::BudgetOutOfOrder).await;
            }
        };

        self.answer(&q.callback_id, None).await;
        self.discard_pressed(q).await;

        let placeholder = match self.messenger.send_text(q.chat_id, texts::THINKING).await {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(chat_id = q.chat_id.0, error = %e, "failed to send placeholder");
                None
            }
        };

        let suggestion = self.resolver.resolve(&recipient, budget).await;
        info!(
            user_id = q.user_id.0,
            recipient = %recipient,
            %budget,
            source = ?suggestion.source,
            "suggestion resolved"
        );
        self.audit(AuditEvent::suggestion(
            q.user_id.0,
            &recipient,
            budget.code(),
            source_label(suggestion.source),
            &suggestion.text,
        ));

        let reply = texts::result(&recipient, budget.display_text(), &suggestion.text);
        self.deliver(q.chat_id, placeholder, &reply).await?;
        self.messenger
            .send_with_keyboard(q.chat_id, texts::AGAIN, main_keyboard())
            .await?;

        Ok(Outcome::Resolved {
            recipient,
            budget,
            suggestion,
        })
    }

    async fn refuse(&self, q: &CallbackQuery, refusal: Refusal) -> Result<Outcome> {
        self.audit(AuditEvent::rejected(
            q.user_id.0,
            &q.data,
            refusal.as_str(),
        ));
        self.answer(&q.callback_id, Some(refusal.notice())).await;
        Ok(Outcome::Refused(refusal))
    }

    async fn hint(&self, chat_id: ChatId) -> Result<Outcome> {
        self.messenger
            .send_with_keyboard(chat_id, texts::HINT, main_keyboard())
            .await?;
        Ok(Outcome::Hinted)
    }

    /// Replace the placeholder with the final text, or send it fresh.
    async fn deliver(
        &self,
        chat_id: ChatId,
        placeholder: Option<MessageRef>,
        text: &str,
    ) -> Result<()> {
        if let Some(msg) = placeholder {
            match self.messenger.edit_text(msg, text).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(chat_id = chat_id.0, error = %e, "failed to edit placeholder"),
            }
        }
        self.messenger.send_text(chat_id, text).await?;
        Ok(())
    }

    async fn answer(&self, callback_id: &str, notice: Option<CallbackNotice>) {
        if let Err(e) = self
            .messenger
            .answer_callback_query(callback_id, notice)
            .await
        {
            warn!(error = %e, "failed to answer callback query");
        }
    }

    /// Remove the menu message whose button was pressed.
    async fn discard_pressed(&self, q: &CallbackQuery) {
        let Some(msg) = q.message else {
            return;
        };
        match self.messenger.delete_message(msg).await {
            Ok(DeleteOutcome::Deleted) => {}
            Ok(DeleteOutcome::AlreadyGone) => {
                debug!(chat_id = msg.chat_id.0, "menu message already gone")
            }
            Err(e) => warn!(chat_id = msg.chat_id.0, error = %e, "failed to delete menu message"),
        }
    }

    fn audit(&self, event: AuditEvent) {
        if let Some(a) = &self.audit {
            a.record(event);
        }
    }
}

fn source_label(source: SuggestionSource) -> &'static str {
    match source {
        SuggestionSource::Generated => "generated",
        SuggestionSource::Fallback => "fallback",
    }
}

/// Convenience for adapters building callback events.
pub fn callback(
    chat_id: ChatId,
    user_id: UserId,
    callback_id: impl Into<String>,
    data: impl Into<String>,
    message: Option<MessageRef>,
) -> CallbackQuery {
    CallbackQuery {
        chat_id,
        user_id,
        callback_id: callback_id.into(),
        data: data.into(),
        message,
    }
}
