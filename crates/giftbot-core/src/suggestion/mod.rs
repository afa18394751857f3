//! Gift suggestion resolution: model first, static table when the model
//! is missing, failing, or produces something unusable.

pub mod fallback;
pub mod policy;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    budget::BudgetCode,
    model::{
        client::TextGenerator,
        types::{ChatMessage, GenerationRequest, Sampling},
    },
};

use fallback::FallbackTable;
use policy::{truncate_chars, HeuristicPolicy, QualityPolicy, MAX_SUGGESTION_CHARS};

const SYSTEM_PROMPT: &str = "Ты — эксперт по подаркам. Отвечай ТОЛЬКО на русском языке. \
Предложи ОДИН конкретный, практичный и оригинальный подарок для указанного человека и бюджета. \
Ответ должен быть кратким — одно предложение без лишних комментариев, вопросов или оговорок. \
Не пиши 'Я предлагаю', 'Можно подарить' — сразу назови подарок.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionSource {
    Generated,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub source: SuggestionSource,
}

pub struct SuggestionResolver {
    generator: Option<Arc<dyn TextGenerator>>,
    policy: Arc<dyn QualityPolicy>,
    fallback: FallbackTable,
    sampling: Sampling,
}

impl SuggestionResolver {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, fallback: FallbackTable) -> Self {
        Self {
            generator,
            policy: Arc::new(HeuristicPolicy::new()),
            fallback,
            sampling: Sampling::default(),
        }
    }

    /// Resolver that never calls a model.
    pub fn fallback_only(fallback: FallbackTable) -> Self {
        Self::new(None, fallback)
    }

    pub fn with_policy(mut self, policy: Arc<dyn QualityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Produce one suggestion. Never fails: generator errors degrade to the table.
    ///
    /// The returned text is non-empty and at most [`MAX_SUGGESTION_CHARS`] characters.
    pub async fn resolve(&self, recipient: &str, budget: BudgetCode) -> Suggestion {
        if let Some(text) = self.try_generate(recipient, budget).await {
            return Suggestion {
                text,
                source: SuggestionSource::Generated,
            };
        }

        Suggestion {
            text: truncate_chars(&self.fallback.suggest(recipient, budget), MAX_SUGGESTION_CHARS),
            source: SuggestionSource::Fallback,
        }
    }

    async fn try_generate(&self, recipient: &str, budget: BudgetCode) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let req = build_request(recipient, budget, self.sampling);

        let raw = match generator.generate(req).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(backend = generator.name(), error = %e, "generation failed, using fallback");
                return None;
            }
        };
        debug!(backend = generator.name(), raw = %raw, "raw generation");

        match self.policy.clean(&raw) {
            Ok(text) => {
                info!(backend = generator.name(), %budget, "generated suggestion accepted");
                Some(text)
            }
            Err(rejection) => {
                info!(?rejection, "generated suggestion rejected, using fallback");
                None
            }
        }
    }
}

pub fn build_request(recipient: &str, budget: BudgetCode, sampling: Sampling) -> GenerationRequest {
    GenerationRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Подарок для {recipient} с бюджетом {}.",
                budget.display_text()
            )),
        ],
        sampling,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeGenerator;
    use super::*;
    use crate::model::types::ChatRole;

    fn resolver(gen: Arc<FakeGenerator>) -> SuggestionResolver {
        SuggestionResolver::new(Some(gen as Arc<dyn TextGenerator>), FallbackTable::builtin())
    }

    #[tokio::test]
    async fn generation_failure_falls_back_to_table() {
        let gen = Arc::new(FakeGenerator::failing("connection refused"));
        let s = resolver(gen.clone()).resolve("другу", BudgetCode::UpTo100).await;
        assert_eq!(s.source, SuggestionSource::Fallback);
        assert!(s.text.contains("забавная открытка"));
        assert!(!s.text.contains("connection refused"));
        assert_eq!(gen.calls(), 1);
    }

    #[tokio::test]
    async fn refusal_is_replaced_by_fallback() {
        let gen = Arc::new(FakeGenerator::replying(
            "Извините, я не могу выбирать подарки за вас.",
        ));
        let s = resolver(gen).resolve("подруге", BudgetCode::From5000To15000).await;
        assert_eq!(s.source, SuggestionSource::Fallback);
        assert!(s.text.contains("стильная сумка через плечо"));
        assert!(!s.text.contains("Извините"));
    }

    #[tokio::test]
    async fn clean_generation_is_used() {
        let gen = Arc::new(FakeGenerator::replying(
            "Эргономичная клавиатура с тихими свитчами. Подойдёт для долгой работы.",
        ));
        let s = resolver(gen.clone())
            .resolve("программисту", BudgetCode::From5000To15000)
            .await;
        assert_eq!(
            s,
            Suggestion {
                text: "Эргономичная клавиатура с тихими свитчами.".to_string(),
                source: SuggestionSource::Generated,
            }
        );

        let req = gen.requests.lock().unwrap()[0].clone();
        assert_eq!(req.messages[0].role, ChatRole::System);
        assert_eq!(
            req.messages[1].content,
            "Подарок для программисту с бюджетом 5000–15000 рублей."
        );
        assert_eq!(req.sampling, Sampling::default());
    }

    #[tokio::test]
    async fn every_budget_yields_bounded_non_empty_text() {
        let resolvers = [
            SuggestionResolver::fallback_only(FallbackTable::builtin()),
            resolver(Arc::new(FakeGenerator::failing("boom"))),
            resolver(Arc::new(FakeGenerator::replying(&"Большой ".repeat(100)))),
        ];
        for r in &resolvers {
            for recipient in ["другу", "подруге", "программисту", "коллеге"] {
                for b in BudgetCode::ALL {
                    let s = r.resolve(recipient, b).await;
                    assert!(!s.text.trim().is_empty());
                    assert!(s.text.chars().count() <= MAX_SUGGESTION_CHARS);
                }
            }
        }
    }

    #[tokio::test]
    async fn fallback_only_never_reports_generated() {
        let r = SuggestionResolver::fallback_only(FallbackTable::builtin());
        assert!(!r.has_generator());
        let s = r.resolve("программисту", BudgetCode::From30000To150000).await;
        assert_eq!(s.source, SuggestionSource::Fallback);
        assert!(s.text.contains("премиум-класса"));
    }

    struct RejectAll;

    impl QualityPolicy for RejectAll {
        fn clean(&self, _raw: &str) -> Result<String, policy::Rejection> {
            Err(policy::Rejection::Empty)
        }
    }

    #[tokio::test]
    async fn policy_is_replaceable() {
        let gen = Arc::new(FakeGenerator::replying("Набор хорошего чая с чайником."));
        let r = resolver(gen).with_policy(Arc::new(RejectAll));
        let s = r.resolve("другу", BudgetCode::From2500To3000).await;
        assert_eq!(s.source, SuggestionSource::Fallback);
    }
}
