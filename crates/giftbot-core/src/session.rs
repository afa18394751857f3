use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::domain::UserId;

/// Position of a user in the gift flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Idle,
    AwaitingRecipient,
    AwaitingBudget,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    pub step: Step,
    pub recipient: Option<String>,
    touched_at: Instant,
}

impl ConversationState {
    fn new(now: Instant) -> Self {
        Self {
            step: Step::AwaitingRecipient,
            recipient: None,
            touched_at: now,
        }
    }
}

/// Why a transition was refused. The stored state is left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepError {
    /// Expected step did not match (includes "no conversation at all").
    OutOfOrder { current: Step },
    /// AwaitingBudget without a recorded recipient.
    MissingRecipient,
}

/// Per-user conversation store.
///
/// A user without an entry (or with an expired one) is `Idle`. Each transition
/// checks and mutates under a single lock acquisition.
pub struct SessionStore {
    ttl: Duration,
    inner: Mutex<HashMap<UserId, ConversationState>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn snapshot(&self, user: UserId) -> Option<ConversationState> {
        self.snapshot_at(user, Instant::now()).await
    }

    pub async fn snapshot_at(&self, user: UserId, now: Instant) -> Option<ConversationState> {
        let mut map = self.inner.lock().await;
        self.live_entry(&mut map, user, now).cloned()
    }

    pub async fn step(&self, user: UserId) -> Step {
        self.step_at(user, Instant::now()).await
    }

    pub async fn step_at(&self, user: UserId, now: Instant) -> Step {
        self.snapshot_at(user, now)
            .await
            .map(|s| s.step)
            .unwrap_or(Step::Idle)
    }

    /// Start (or restart) the flow: any previous state is replaced.
    pub async fn begin(&self, user: UserId) {
        self.begin_at(user, Instant::now()).await
    }

    pub async fn begin_at(&self, user: UserId, now: Instant) {
        let mut map = self.inner.lock().await;
        map.insert(user, ConversationState::new(now));
    }

    /// AwaitingRecipient -> AwaitingBudget.
    pub async fn record_recipient(
        &self,
        user: UserId,
        recipient: &str,
    ) -> Result<(), StepError> {
        self.record_recipient_at(user, recipient, Instant::now())
            .await
    }

    pub async fn record_recipient_at(
        &self,
        user: UserId,
        recipient: &str,
        now: Instant,
    ) -> Result<(), StepError> {
        let mut map = self.inner.lock().await;
        let Some(state) = self.live_entry(&mut map, user, now) else {
            return Err(StepError::OutOfOrder {
                current: Step::Idle,
            });
        };
        if state.step != Step::AwaitingRecipient {
            return Err(StepError::OutOfOrder {
                current: state.step,
            });
        }
        state.step = Step::AwaitingBudget;
        state.recipient = Some(recipient.to_string());
        state.touched_at = now;
        Ok(())
    }

    /// AwaitingBudget -> Idle: remove the state and hand back the recipient.
    ///
    /// On error the state is left in place.
    pub async fn take_for_budget(&self, user: UserId) -> Result<String, StepError> {
        self.take_for_budget_at(user, Instant::now()).await
    }

    pub async fn take_for_budget_at(
        &self,
        user: UserId,
        now: Instant,
    ) -> Result<String, StepError> {
        let mut map = self.inner.lock().await;
        let Some(state) = self.live_entry(&mut map, user, now) else {
            return Err(StepError::OutOfOrder {
                current: Step::Idle,
            });
        };
        let recipient = budget_guard(state)?;
        map.remove(&user);
        Ok(recipient)
    }

    /// Drop the user's state. Returns whether anything was removed.
    pub async fn clear(&self, user: UserId) -> bool {
        self.inner.lock().await.remove(&user).is_some()
    }

    /// Remove all expired conversations; returns how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now()).await
    }

    pub async fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, s| !is_expired(s, self.ttl, now));
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    fn live_entry<'a>(
        &self,
        map: &'a mut HashMap<UserId, ConversationState>,
        user: UserId,
        now: Instant,
    ) -> Option<&'a mut ConversationState> {
        let expired = map
            .get(&user)
            .map(|s| is_expired(s, self.ttl, now))
            .unwrap_or(false);
        if expired {
            map.remove(&user);
            return None;
        }
        map.get_mut(&user)
    }
}

fn budget_guard(state: &ConversationState) -> Result<String, StepError> {
    if state.step != Step::AwaitingBudget {
        return Err(StepError::OutOfOrder {
            current: state.step,
        });
    }
    state.recipient.clone().ok_or(StepError::MissingRecipient)
}

fn is_expired(state: &ConversationState, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(state.touched_at) >= ttl
}
