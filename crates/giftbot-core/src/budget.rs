use std::{fmt, str::FromStr};

use crate::errors::Error;

/// Price range offered in the budget menu.
///
/// The `code` is what travels in callback payloads (`budget:<code>`); the
/// display text is what users and the model see.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BudgetCode {
    UpTo100,
    From2500To3000,
    From5000To15000,
    From30000To150000,
}

impl BudgetCode {
    pub const ALL: [BudgetCode; 4] = [
        BudgetCode::UpTo100,
        BudgetCode::From2500To3000,
        BudgetCode::From5000To15000,
        BudgetCode::From30000To150000,
    ];

    pub fn code(self) -> &'static str {
        match self {
            BudgetCode::UpTo100 => "100",
            BudgetCode::From2500To3000 => "2500-3000",
            BudgetCode::From5000To15000 => "5000-15000",
            BudgetCode::From30000To150000 => "30000-150000",
        }
    }

    /// Human-readable range used in prompts and replies.
    pub fn display_text(self) -> &'static str {
        match self {
            BudgetCode::UpTo100 => "до 100 рублей",
            BudgetCode::From2500To3000 => "2500–3000 рублей",
            BudgetCode::From5000To15000 => "5000–15000 рублей",
            BudgetCode::From30000To150000 => "30000–150000 рублей",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            BudgetCode::UpTo100 => "До 100 ₽",
            BudgetCode::From2500To3000 => "2 500–3 000 ₽",
            BudgetCode::From5000To15000 => "5 000–15 000 ₽",
            BudgetCode::From30000To150000 => "30 000–150 000 ₽",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.code() == code.trim())
    }
}

impl fmt::Display for BudgetCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BudgetCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| Error::External(format!("unknown budget code: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_back_to_the_same_variant() {
        for b in BudgetCode::ALL {
            assert_eq!(BudgetCode::from_code(b.code()), Some(b));
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(BudgetCode::from_code("999"), None);
        assert_eq!(BudgetCode::from_code(""), None);
        assert!("2500–3000".parse::<BudgetCode>().is_err());
    }

    #[test]
    fn display_text_is_distinct_from_code() {
        assert_eq!(BudgetCode::UpTo100.display_text(), "до 100 рублей");
        assert_eq!(BudgetCode::From5000To15000.to_string(), "5000-15000");
    }
}
