use std::{env, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Text generation (None disables the model and always uses the fallback table)
    pub generation: Option<GenerationConfig>,

    // Conversation
    pub session_ttl: Duration,
    pub fallback_table_path: Option<PathBuf>,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

/// Settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

pub const DEFAULT_MODEL: &str = "qwen2.5:1.5b-instruct";

impl Config {
    /// Load from the process environment, after applying `.env` if present.
    ///
    /// Variables already set in the environment win over `.env`.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(Error::Config(format!(".env could not be loaded: {e}")));
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env_str = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;

        let generation = env_str("GIFTBOT_LLM_BASE_URL").map(|base_url| GenerationConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: env_str("GIFTBOT_LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: env_str("GIFTBOT_LLM_API_KEY"),
            timeout: Duration::from_millis(
                parse_num(env_str("GIFTBOT_LLM_TIMEOUT_MS")).unwrap_or(30_000),
            ),
            max_tokens: parse_num(env_str("GIFTBOT_LLM_MAX_TOKENS")).unwrap_or(60),
            temperature: parse_num(env_str("GIFTBOT_LLM_TEMPERATURE")).unwrap_or(0.65),
            top_p: parse_num(env_str("GIFTBOT_LLM_TOP_P")).unwrap_or(0.9),
        });

        let session_ttl =
            Duration::from_secs(parse_num(env_str("GIFTBOT_SESSION_TTL_SECS")).unwrap_or(1800));
        let fallback_table_path = env_str("GIFTBOT_FALLBACK_FILE").map(PathBuf::from);

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or_else(|| "/tmp/giftbot-audit.log".to_string()),
        );
        let audit_log_json = env_str("AUDIT_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            generation,
            session_ttl,
            fallback_table_path,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn generation_is_disabled_without_base_url() {
        let cfg = Config::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "t")])).unwrap();
        assert!(cfg.generation.is_none());
        assert_eq!(cfg.session_ttl, Duration::from_secs(1800));
        assert!(!cfg.audit_log_json);
        assert!(cfg.fallback_table_path.is_none());
    }

    #[test]
    fn generation_defaults_and_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GIFTBOT_LLM_BASE_URL", "http://localhost:11434/v1/"),
            ("GIFTBOT_LLM_TEMPERATURE", "0.2"),
            ("GIFTBOT_LLM_MAX_TOKENS", "not-a-number"),
            ("AUDIT_LOG_JSON", "yes"),
        ]))
        .unwrap();

        let g = cfg.generation.unwrap();
        assert_eq!(g.base_url, "http://localhost:11434/v1");
        assert_eq!(g.model, DEFAULT_MODEL);
        assert_eq!(g.max_tokens, 60);
        assert!((g.temperature - 0.2).abs() < f32::EPSILON);
        assert!((g.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(g.timeout, Duration::from_secs(30));
        assert!(g.api_key.is_none());
        assert!(cfg.audit_log_json);
    }
}
