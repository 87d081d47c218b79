// Pronunciation check: recognized text vs. the lesson's target word

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How a normalized recognition is compared with the expected word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Equal, or either string contains the other. Lenient: a one-letter
    /// target matches almost any sentence containing that letter.
    #[default]
    Substring,
    /// Equal, or one side's words appear as a contiguous run in the other's.
    Word,
    Exact,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::Word => "word",
            MatchMode::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" | "contains" => Ok(MatchMode::Substring),
            "word" | "whole-word" => Ok(MatchMode::Word),
            "exact" => Ok(MatchMode::Exact),
            other => Err(format!("unknown match mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub is_correct: bool,
    pub recognized_text: String,
    pub expected_word: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher {
    mode: MatchMode,
}

impl TextMatcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Lower-case, drop `. , ! ? ; :`, collapse whitespace, trim.
    pub fn normalize(text: &str) -> String {
        static PUNCT_RE: OnceLock<Regex> = OnceLock::new();
        let re = PUNCT_RE.get_or_init(|| Regex::new(r"[.,!?;:]").expect("valid punctuation regex"));
        let lowered = text.to_lowercase();
        let stripped = re.replace_all(&lowered, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn is_correct(&self, recognized: &str, expected: &str) -> bool {
        self.matches_normalized(&Self::normalize(recognized), &Self::normalize(expected))
    }

    pub fn check(&self, recognized: &str, expected: &str) -> MatchOutcome {
        let recognized_text = Self::normalize(recognized);
        let expected_word = Self::normalize(expected);
        let is_correct = self.matches_normalized(&recognized_text, &expected_word);

        tracing::debug!(
            recognized = %recognized_text,
            expected = %expected_word,
            mode = %self.mode,
            is_correct,
            "Match check"
        );

        MatchOutcome {
            is_correct,
            recognized_text,
            expected_word,
        }
    }

    fn matches_normalized(&self, recognized: &str, expected: &str) -> bool {
        // Nothing heard (or nothing to hear) is never a match.
        if recognized.is_empty() || expected.is_empty() {
            return false;
        }
        if recognized == expected {
            return true;
        }
        match self.mode {
            MatchMode::Exact => false,
            MatchMode::Substring => recognized.contains(expected) || expected.contains(recognized),
            MatchMode::Word => {
                let a: Vec<&str> = recognized.split(' ').collect();
                let b: Vec<&str> = expected.split(' ').collect();
                contains_run(&a, &b) || contains_run(&b, &a)
            }
        }
    }
}

fn contains_run(haystack: &[&str], needle: &[&str]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}
