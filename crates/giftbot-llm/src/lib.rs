//! Text generation over an OpenAI-compatible `chat/completions` endpoint.
//!
//! Works with Ollama (`/v1`), vLLM, llama.cpp server and hosted OpenAI-style APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use giftbot_core::{
    config::GenerationConfig,
    errors::Error,
    model::{
        client::TextGenerator,
        types::{ChatMessage, GenerationRequest},
    },
    Result,
};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ChatCompletionsClient {
    cfg: GenerationConfig,
    endpoint: String,
    http: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(cfg: GenerationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        let endpoint = format!("{}/chat/completions", cfg.base_url.trim_end_matches('/'));
        Ok(Self {
            cfg,
            endpoint,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.cfg.model
    }

    async fn generate(&self, req: GenerationRequest) -> Result<String> {
        let body = CompletionRequest {
            model: &self.cfg.model,
            messages: &req.messages,
            max_tokens: req.sampling.max_tokens,
            temperature: req.sampling.temperature,
            top_p: req.sampling.top_p,
            stream: false,
        };

        let mut call = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.cfg.api_key {
            call = call.bearer_auth(key);
        }

        let resp = call
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Generation(format!(
                "completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid completion json: {e}")))?;
        debug!(choices = parsed.choices.len(), "completion received");

        // Only one completion is requested; alternatives beyond it are ignored.
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Generation(
                "completion returned empty text".to_string(),
            ));
        }

        Ok(text)
    }
}
