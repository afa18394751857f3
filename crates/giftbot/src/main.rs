use std::sync::Arc;

use tracing::info;

use giftbot_core::{
    config::Config,
    model::{client::TextGenerator, types::Sampling},
    suggestion::{fallback::FallbackTable, SuggestionResolver},
};
use giftbot_llm::ChatCompletionsClient;

/// Wire the fallback table and the optional model client from configuration.
fn build_resolver(cfg: &Config) -> Result<SuggestionResolver, giftbot_core::Error> {
    let table = match &cfg.fallback_table_path {
        Some(path) => {
            info!(path = %path.display(), "loading fallback overrides");
            FallbackTable::with_overrides_from(path)?
        }
        None => FallbackTable::builtin(),
    };

    let Some(gen_cfg) = cfg.generation.clone() else {
        info!("no generation endpoint configured; using fallback suggestions only");
        return Ok(SuggestionResolver::fallback_only(table));
    };

    let sampling = Sampling {
        max_tokens: gen_cfg.max_tokens,
        temperature: gen_cfg.temperature,
        top_p: gen_cfg.top_p,
    };
    let client = ChatCompletionsClient::new(gen_cfg)?;
    info!(endpoint = client.endpoint(), model = client.name(), "text generation enabled");

    let generator: Arc<dyn TextGenerator> = Arc::new(client);
    Ok(SuggestionResolver::new(Some(generator), table).with_sampling(sampling))
}

#[tokio::main]
async fn main() -> Result<(), giftbot_core::Error> {
    giftbot_core::logging::init("giftbot")?;

    let cfg = Arc::new(Config::load()?);
    let resolver = build_resolver(&cfg)?;

    giftbot_telegram::router::run_polling(cfg, resolver)
        .await
        .map_err(|e| giftbot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
