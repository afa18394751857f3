use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use giftbot_core::{
    audit::AuditLogger, config::Config, flow::GiftFlow, messaging::port::MessagingPort,
    session::SessionStore, suggestion::SuggestionResolver,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<GiftFlow>,
}

/// How often expired conversations are swept: half the TTL, within [1s, 60s].
pub fn sweep_interval(ttl: Duration) -> Duration {
    (ttl / 2).clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Periodically drop expired conversations until the task is aborted.
pub fn spawn_session_sweeper(store: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let dropped = store.sweep_expired().await;
            if dropped > 0 {
                debug!(dropped, "expired conversations swept");
            }
        }
    })
}

pub async fn run_polling(cfg: Arc<Config>, resolver: SuggestionResolver) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "giftbot started"),
        Err(e) => warn!(error = %e, "get_me failed; continuing"),
    }
    info!(
        generator = resolver.has_generator(),
        session_ttl_secs = cfg.session_ttl.as_secs(),
        audit_log = %cfg.audit_log_path.display(),
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let store = Arc::new(SessionStore::new(cfg.session_ttl));
    let audit = Arc::new(AuditLogger::new(
        cfg.audit_log_path.clone(),
        cfg.audit_log_json,
    ));
    let flow = GiftFlow::new(store.clone(), Arc::new(resolver), messenger).with_audit(audit);

    let sweeper = spawn_session_sweeper(store, sweep_interval(cfg.session_ttl));

    let state = Arc::new(AppState {
        flow: Arc::new(flow),
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    sweeper.abort();
    info!("dispatcher stopped");
    Ok(())
}
