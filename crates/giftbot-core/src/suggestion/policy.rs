use regex::Regex;

/// Maximum suggestion length, in characters.
pub const MAX_SUGGESTION_CHARS: usize = 200;

const MIN_SUGGESTION_CHARS: usize = 10;
const QUESTION_WINDOW_CHARS: usize = 30;
const TERMINAL_PUNCTUATION: [char; 4] = ['.', '!', '?', '…'];

const REFUSAL_PATTERNS: &[&str] = &[
    r"извини",
    r"не могу",
    r"не умею",
    r"я — языковая модель",
    r"я не могу",
    r"я не имею возможности",
    r"я не должен",
    r"я не рекомендую",
    r"я не советую",
    r"я не предлагаю",
];

/// Fragments that show the model talking about the question instead of answering it.
const ECHO_FRAGMENTS: &[&str] = &["расскаж", "дума", "знаешь", "умеешь", "подарок", "бюджет"];

/// Why a raw generation was not accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Refusal(String),
    TooShort(usize),
    Question,
    Echo(String),
}

/// Turns raw model output into a presentable suggestion, or rejects it.
pub trait QualityPolicy: Send + Sync {
    fn clean(&self, raw: &str) -> Result<String, Rejection>;
}

/// Heuristics tuned for short Russian one-liners from small instruct models.
pub struct HeuristicPolicy {
    refusals: Vec<Regex>,
    sentence_end: Regex,
    whitespace: Regex,
}

impl HeuristicPolicy {
    pub fn new() -> Self {
        Self {
            refusals: REFUSAL_PATTERNS
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
                .collect(),
            sentence_end: Regex::new(r"[.!?]\s").expect("valid regex"),
            whitespace: Regex::new(r"\s+").expect("valid regex"),
        }
    }
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityPolicy for HeuristicPolicy {
    fn clean(&self, raw: &str) -> Result<String, Rejection> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Rejection::Empty);
        }

        if let Some(m) = self.refusals.iter().find_map(|re| re.find(raw)) {
            return Err(Rejection::Refusal(m.as_str().to_string()));
        }

        let first = self
            .sentence_end
            .split(raw)
            .next()
            .unwrap_or_default()
            .trim();
        let sentence = self.whitespace.replace_all(first, " ").into_owned();

        let len = sentence.chars().count();
        if len < MIN_SUGGESTION_CHARS {
            return Err(Rejection::TooShort(len));
        }
        if sentence
            .chars()
            .take(QUESTION_WINDOW_CHARS)
            .any(|c| c == '?')
        {
            return Err(Rejection::Question);
        }
        let lower = sentence.to_lowercase();
        if let Some(frag) = ECHO_FRAGMENTS.iter().find(|f| lower.contains(*f)) {
            return Err(Rejection::Echo(frag.to_string()));
        }

        Ok(finish_sentence(&sentence, MAX_SUGGESTION_CHARS))
    }
}

/// Truncate to `max_chars` and make sure the text ends with terminal punctuation.
///
/// The result never exceeds `max_chars` characters.
pub fn finish_sentence(text: &str, max_chars: usize) -> String {
    let text = text.trim_end();
    if text.ends_with(TERMINAL_PUNCTUATION) && text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out = truncate_chars(text, max_chars.saturating_sub(1))
        .trim_end()
        .to_string();
    if !out.ends_with(TERMINAL_PUNCTUATION) {
        out.push('.');
    }
    out
}

pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> Result<String, Rejection> {
        HeuristicPolicy::new().clean(raw)
    }

    #[test]
    fn keeps_first_sentence_and_collapses_whitespace() {
        let out = clean("Механическая   клавиатура\nс подсветкой. Она понравится любому.").unwrap();
        assert_eq!(out, "Механическая клавиатура с подсветкой.");
    }

    #[test]
    fn appends_terminal_punctuation() {
        assert_eq!(
            clean("Беспроводные наушники с шумоподавлением").unwrap(),
            "Беспроводные наушники с шумоподавлением."
        );
        assert_eq!(
            clean("Сертификат на картинг!").unwrap(),
            "Сертификат на картинг!"
        );
    }

    #[test]
    fn refusals_are_rejected_case_insensitively() {
        assert!(matches!(
            clean("Извините, я не могу помочь с этим."),
            Err(Rejection::Refusal(_))
        ));
        assert!(matches!(
            clean("Я — языковая модель и не выбираю вещи."),
            Err(Rejection::Refusal(_))
        ));
    }

    #[test]
    fn short_and_empty_outputs_are_rejected() {
        assert_eq!(clean("   "), Err(Rejection::Empty));
        assert!(matches!(clean("Носки."), Err(Rejection::TooShort(6))));
    }

    #[test]
    fn early_question_is_rejected() {
        assert_eq!(
            clean("Кому нужен набор?Может, набор для пикника"),
            Err(Rejection::Question)
        );
    }

    #[test]
    fn echo_fragments_are_rejected() {
        assert!(matches!(
            clean("Хороший подарок для друга это книга"),
            Err(Rejection::Echo(_))
        ));
        assert!(matches!(
            clean("Я думаю, что подойдёт книга"),
            Err(Rejection::Echo(_))
        ));
    }

    #[test]
    fn long_outputs_are_capped_at_max_chars() {
        let raw = "Очень ".repeat(80);
        let out = clean(&raw).unwrap();
        assert!(out.chars().count() <= MAX_SUGGESTION_CHARS);
        assert!(out.ends_with('.'));
    }

    #[test]
    fn finish_sentence_respects_limit_with_punctuation() {
        let s = "а".repeat(300);
        let out = finish_sentence(&s, 200);
        assert_eq!(out.chars().count(), 200);
        assert!(out.ends_with('.'));

        let s = format!("{}!", "б".repeat(300));
        let out = finish_sentence(&s, 200);
        assert_eq!(out.chars().count(), 200);
        assert!(out.ends_with('.'));

        assert_eq!(finish_sentence("Готово!", 200), "Готово!");
    }
}
