use std::{collections::BTreeMap, fs, path::Path};

use serde::Deserialize;

use crate::{budget::BudgetCode, Result};

pub const DEFAULT_CATEGORY: &str = "друг";
pub const PLACEHOLDER_ITEM: &str = "персонализированный подарок";

const BUILTIN: &[(&str, [(&str, &str); 4])] = &[
    (
        "друг",
        [
            ("100", "забавная открытка с личной надписью или мини-шоколадка"),
            (
                "2500-3000",
                "настольная игра \"Кодenames\" или стильный чехол для телефона",
            ),
            ("5000-15000", "беспроводные наушники или сертификат на квест"),
            ("30000-150000", "игровая приставка или билеты на концерт"),
        ],
    ),
    (
        "подруг",
        [
            ("100", "милый брелок или мини-набор конфет"),
            (
                "2500-3000",
                "ароматическая свеча люксового бренда или набор для скетчинга",
            ),
            (
                "5000-15000",
                "стильная сумка через плечо или сертификат в спа",
            ),
            ("30000-150000", "ювелирное украшение или путёвка на выходные"),
        ],
    ),
    (
        "программист",
        [
            (
                "100",
                "стикерпак с мемами про код или кружка \"Hello World\"",
            ),
            (
                "2500-3000",
                "механическая клавиатура начального уровня или набор наушников",
            ),
            (
                "5000-15000",
                "эргономичная мышь Logitech MX Master или подставка для монитора",
            ),
            (
                "30000-150000",
                "механическая клавиатура премиум-класса или сертификат на конференцию",
            ),
        ],
    ),
];

/// Pre-authored suggestions keyed by recipient category, then budget code.
///
/// Budget keys are codes (`"2500-3000"`), not `BudgetCode` values, so a partial
/// override file can leave gaps; gaps resolve to [`PLACEHOLDER_ITEM`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FallbackTable {
    default_category: String,
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

/// On-disk override format.
#[derive(Debug, Default, Deserialize)]
struct FallbackFile {
    #[serde(default)]
    default_category: Option<String>,
    #[serde(default)]
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FallbackTable {
    pub fn builtin() -> Self {
        let categories = BUILTIN
            .iter()
            .map(|(cat, items)| {
                let items = items
                    .iter()
                    .map(|(code, text)| (code.to_string(), text.to_string()))
                    .collect();
                (cat.to_string(), items)
            })
            .collect();
        Self {
            default_category: DEFAULT_CATEGORY.to_string(),
            categories,
        }
    }

    /// Built-in table with entries from a JSON file merged on top.
    pub fn with_overrides_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut table = Self::builtin();
        table.merge_json(&text)?;
        Ok(table)
    }

    /// Merge `{"default_category": "...", "categories": {"cat": {"code": "item"}}}`.
    ///
    /// Category keys are normalized the same way recipients are.
    pub fn merge_json(&mut self, json: &str) -> Result<()> {
        let file: FallbackFile = serde_json::from_str(json)?;
        if let Some(def) = file.default_category {
            self.default_category = normalize_category(&def);
        }
        for (cat, items) in file.categories {
            self.categories
                .entry(normalize_category(&cat))
                .or_default()
                .extend(items);
        }
        Ok(())
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Item for a recipient/budget pair, falling back to the default category,
    /// then to the generic placeholder.
    pub fn item(&self, recipient: &str, budget: BudgetCode) -> &str {
        let key = normalize_category(recipient);
        let items = self
            .categories
            .get(&key)
            .or_else(|| self.categories.get(&self.default_category));
        items
            .and_then(|m| m.get(budget.code()))
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_ITEM)
    }

    /// Full user-facing fallback line.
    pub fn suggest(&self, recipient: &str, budget: BudgetCode) -> String {
        format!(
            "💡 Проверенный вариант для {recipient} в бюджете {}: {}",
            budget.display_text(),
            self.item(recipient, budget)
        )
    }
}

/// "Другу" -> "друг", "подруге" -> "подруг", "программисту" -> "программист".
pub fn normalize_category(recipient: &str) -> String {
    recipient
        .trim()
        .to_lowercase()
        .trim_end_matches(['у', 'е'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dative_forms() {
        assert_eq!(normalize_category("другу"), "друг");
        assert_eq!(normalize_category("Подруге"), "подруг");
        assert_eq!(normalize_category("программисту"), "программист");
    }

    #[test]
    fn friend_small_budget_is_a_postcard() {
        let t = FallbackTable::builtin();
        let s = t.suggest("другу", BudgetCode::UpTo100);
        assert!(s.contains("забавная открытка"));
        assert!(s.contains("до 100 рублей"));
        assert!(s.starts_with("💡 Проверенный вариант для другу"));
    }

    #[test]
    fn unknown_category_uses_default_table() {
        let t = FallbackTable::builtin();
        assert_eq!(
            t.item("бабушке", BudgetCode::From30000To150000),
            "игровая приставка или билеты на концерт"
        );
    }

    #[test]
    fn every_builtin_cell_is_filled() {
        let t = FallbackTable::builtin();
        for cat in ["другу", "подруге", "программисту"] {
            for b in BudgetCode::ALL {
                assert_ne!(t.item(cat, b), PLACEHOLDER_ITEM, "{cat} {b}");
            }
        }
    }

    #[test]
    fn overrides_merge_and_gaps_use_placeholder() {
        let mut t = FallbackTable::builtin();
        t.merge_json(
            r#"{
              "default_category": "Маме",
              "categories": {
                "маме": { "100": "букет ромашек" },
                "программисту": { "100": "резиновая уточка для отладки" }
              }
            }"#,
        )
        .unwrap();

        assert_eq!(t.default_category(), "мам");
        assert_eq!(t.item("маме", BudgetCode::UpTo100), "букет ромашек");
        assert_eq!(
            t.item("коллеге", BudgetCode::From5000To15000),
            PLACEHOLDER_ITEM
        );
        assert_eq!(
            t.item("программисту", BudgetCode::UpTo100),
            "резиновая уточка для отладки"
        );
        assert_eq!(
            t.item("программисту", BudgetCode::From2500To3000),
            "механическая клавиатура начального уровня или набор наушников"
        );
    }

    #[test]
    fn malformed_override_is_an_error() {
        let mut t = FallbackTable::builtin();
        assert!(t.merge_json("{ not json").is_err());
        assert_eq!(t, FallbackTable::builtin());
    }

    #[test]
    fn loads_overrides_from_file() {
        let path = std::env::temp_dir().join(format!("giftbot-fallback-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"categories": {"другу": {"100": "наклейка"}}}"#).unwrap();
        let t = FallbackTable::with_overrides_from(&path).unwrap();
        assert_eq!(t.item("другу", BudgetCode::UpTo100), "наклейка");
        let _ = std::fs::remove_file(&path);
    }
}
