//! Keyword-based document categorization.
//!
//! A [`Taxonomy`] is an ordered list of [`CategoryRule`]s plus a default
//! label. Categorizing a document walks the rules in order and returns the
//! label of the first rule whose keywords occur in either the document's
//! path relative to the archive root or its content. Matching is case-insensitive substring
//! matching, so keywords written in scripts without word separators (e.g.
//! Chinese) work the same as English ones.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const AI_TECHNOLOGY: &str = "AI & Technology";
pub const FINTECH_ECONOMY: &str = "FinTech & Economy";
pub const HUMANITIES_HISTORY: &str = "Humanities & History";
pub const GENERAL: &str = "General / Uncategorized";

const AI_KEYWORDS: &[&str] = &[
    "learning",
    "neural",
    "intelligence",
    "gpt",
    "python",
    "data",
    "cloud",
    "人工智能",
];

const FINTECH_KEYWORDS: &[&str] = &[
    "blockchain",
    "bitcoin",
    "payment",
    "finance",
    "wallet",
    "economy",
    "bank",
    "金融",
    "经济",
];

const HUMANITIES_KEYWORDS: &[&str] = &[
    "history",
    "culture",
    "art",
    "philosophy",
    "literature",
    "civilization",
    "museum",
    "历史",
    "文化",
    "哲学",
];

/// One category and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, path: &str, content: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| path.contains(k.as_str()) || content.contains(k.as_str()))
    }
}

/// An ordered set of category rules. Earlier rules take priority.
///
/// # Examples
///
/// ```
/// use infostream::category::{Taxonomy, AI_TECHNOLOGY, GENERAL};
///
/// let taxonomy = Taxonomy::default();
/// assert_eq!(
///     taxonomy.categorize("docs/ai_notes.txt", "neural networks"),
///     AI_TECHNOLOGY,
/// );
/// assert_eq!(taxonomy.categorize("docs/pasta.txt", "boil water"), GENERAL);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub rules: Vec<CategoryRule>,
    pub default_label: String,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::new(
            vec![
                CategoryRule::new(AI_TECHNOLOGY, AI_KEYWORDS),
                CategoryRule::new(FINTECH_ECONOMY, FINTECH_KEYWORDS),
                CategoryRule::new(HUMANITIES_HISTORY, HUMANITIES_KEYWORDS),
            ],
            GENERAL,
        )
    }
}

impl Taxonomy {
    /// Build a taxonomy. Keywords are lower-cased here so that
    /// [`categorize`](Self::categorize) only has to fold its inputs.
    pub fn new(rules: Vec<CategoryRule>, default_label: &str) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| CategoryRule {
                label: rule.label,
                keywords: rule
                    .keywords
                    .into_iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();

        Self {
            rules,
            default_label: default_label.to_string(),
        }
    }

    /// Load a taxonomy from a JSON file.
    ///
    /// Rule labels must be unique and must not collide with the default
    /// label, otherwise category filters would be ambiguous.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: Taxonomy = serde_json::from_str(&contents)?;

        let mut seen = std::collections::HashSet::new();
        for rule in &raw.rules {
            if rule.label == raw.default_label || !seen.insert(&rule.label) {
                return Err(Error::Config(format!(
                    "duplicate category label in {}: {}",
                    path.display(),
                    rule.label
                )));
            }
        }

        Ok(Self::new(raw.rules, &raw.default_label))
    }

    /// Assign a category label to a document. `path` is relative to the
    /// archive root, so the location of the root never affects the result.
    pub fn categorize(&self, path: &str, content: &str) -> &str {
        let path = path.to_lowercase();
        let content = content.to_lowercase();

        self.rules
            .iter()
            .find(|rule| rule.matches(&path, &content))
            .map_or(self.default_label.as_str(), |rule| rule.label.as_str())
    }

    /// Every label this taxonomy can produce, in priority order, with the
    /// default label last.
    pub fn labels(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|r| r.label.clone())
            .chain(std::iter::once(self.default_label.clone()))
            .collect()
    }

    /// Labels offered as navigable filters.
    pub fn display_labels(&self, include_default: bool) -> Vec<String> {
        let mut labels: Vec<String> =
            self.rules.iter().map(|r| r.label.clone()).collect();
        if include_default {
            labels.push(self.default_label.clone());
        }
        labels
    }
}
