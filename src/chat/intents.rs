//! Keyword rules that map a chat message to a reply template.

use regex::Regex;

/// What the client is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Completes against target.
    Status,
    /// How much of the quota is left.
    Remaining,
    /// Per-segment counts.
    Segments,
    /// The written analysis.
    Analysis,
    /// Nothing matched.
    General,
}

/// Error type for intent rule construction.
#[derive(thiserror::Error, Debug)]
pub enum IntentError {
    /// Invalid regex pattern.
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// A single keyword rule.
#[derive(Debug, Clone)]
pub struct IntentRule {
    intent: Intent,
    pattern: Regex,
}

impl IntentRule {
    /// Create a rule; the pattern is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `IntentError::InvalidPattern` if the regex is invalid.
    pub fn new(intent: Intent, pattern: &str) -> Result<Self, IntentError> {
        Ok(Self {
            intent,
            pattern: Regex::new(&format!("(?i){pattern}"))?,
        })
    }

    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }

    #[must_use]
    pub fn intent(&self) -> Intent {
        self.intent
    }
}

/// Ordered keyword rules; the first match decides.
#[derive(Debug, Clone, Default)]
pub struct IntentMatcher {
    rules: Vec<IntentRule>,
}

impl IntentMatcher {
    /// Create a matcher with the built-in rules.
    #[must_use]
    pub fn with_default_rules() -> Self {
        let rules = Self::default_rules()
            .into_iter()
            .filter_map(|result| match result {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile default intent rule");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Classify a message.
    #[must_use]
    pub fn classify(&self, message: &str) -> Intent {
        self.rules
            .iter()
            .find(|rule| rule.matches(message))
            .map_or(Intent::General, IntentRule::intent)
    }

    fn default_rules() -> Vec<Result<IntentRule, IntentError>> {
        vec![
            IntentRule::new(Intent::Status, r"\b(status|progress|how many|completes?)\b"),
            IntentRule::new(
                Intent::Analysis,
                r"\b(behind|ahead|on track|track|analysis|insights?)\b",
            ),
            IntentRule::new(Intent::Remaining, r"\b(remaining|left|need|quota)\b"),
            IntentRule::new(Intent::Segments, r"\b(segments?|breakdown)\b"),
        ]
    }
}
