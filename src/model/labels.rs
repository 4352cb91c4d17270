//! The fixed vocabularies a transaction is checked against: expense categories and the people
//! who share the ledger.

use serde::{Deserialize, Serialize};

/// The expense categories offered when recording a transaction.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "식비",
    "카페",
    "외식",
    "교통",
    "쇼핑",
    "생활",
    "주거/통신",
    "의료/건강",
    "미용",
    "금융",
    "문화/여가",
    "교육/학습",
    "자녀/육아",
    "반려동물",
    "경조사/선물",
    "기타",
];

pub const DEFAULT_PERSON1: &str = "남편";
pub const DEFAULT_PERSON2: &str = "아내";

/// The label for spending that belongs to both people.
pub const SHARED: &str = "함께";

/// The two people sharing the ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Participants {
    person1: String,
    person2: String,
}

impl Participants {
    /// Blank labels fall back to the defaults.
    pub fn new(person1: impl Into<String>, person2: impl Into<String>) -> Self {
        let pick = |s: String, default: &str| {
            let s = s.trim().to_string();
            if s.is_empty() {
                default.to_string()
            } else {
                s
            }
        };
        Self {
            person1: pick(person1.into(), DEFAULT_PERSON1),
            person2: pick(person2.into(), DEFAULT_PERSON2),
        }
    }

    pub fn person1(&self) -> &str {
        &self.person1
    }

    pub fn person2(&self) -> &str {
        &self.person2
    }

    /// Every label a transaction's consumer may carry.
    pub fn labels(&self) -> [&str; 3] {
        [&self.person1, &self.person2, SHARED]
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels().contains(&label)
    }
}

impl Default for Participants {
    fn default() -> Self {
        Self::new(DEFAULT_PERSON1, DEFAULT_PERSON2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_labels() {
        let p = Participants::default();
        assert_eq!(p.labels(), ["남편", "아내", "함께"]);
    }

    #[test]
    fn test_custom_labels_with_blank_fallback() {
        let p = Participants::new("민수", "  ");
        assert_eq!(p.person1(), "민수");
        assert_eq!(p.person2(), "아내");
        assert!(p.contains("함께"));
        assert!(!p.contains("남편"));
    }

    #[test]
    fn test_category_count() {
        assert_eq!(EXPENSE_CATEGORIES.len(), 16);
        assert!(EXPENSE_CATEGORIES.contains(&"식비"));
    }
}
