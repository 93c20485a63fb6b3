//! Goal parsing: best-effort, deterministic keyword/regex extraction used
//! only to enrich the AI oracle's planning context. It never drives
//! execution directly; `GoalHints::empty()` is always a legal input to the
//! rest of the system.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use crate::action::ActionKind;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GoalHints {
    pub urls: Vec<String>,
    pub quoted_terms: Vec<String>,
    pub action_hints: Vec<ActionKind>,
}

impl GoalHints {
    pub fn empty() -> Self {
        Self::default()
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s,]+").expect("static url regex is valid"))
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("static quoted-term regex is valid"))
}

/// Deterministic, best-effort extraction of hints from a natural-language
/// goal string.
pub struct GoalParser;

impl GoalParser {
    pub fn extract(goal: &str) -> GoalHints {
        debug!(goal_len = goal.len(), "GoalParser::extract: called");
        let urls = url_regex().find_iter(goal).map(|m| m.as_str().to_string()).collect();

        let quoted_terms = quoted_regex()
            .captures_iter(goal)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
            .map(|m| m.as_str().to_string())
            .collect();

        let lower = goal.to_lowercase();
        let mut action_hints = Vec::new();
        let keyword_map: &[(&str, ActionKind)] = &[
            ("navigate", ActionKind::Navigate),
            ("go to", ActionKind::Navigate),
            ("visit", ActionKind::Navigate),
            ("click", ActionKind::Click),
            ("type", ActionKind::Type),
            ("enter", ActionKind::Type),
            ("extract", ActionKind::ExtractText),
            ("collect", ActionKind::ExtractText),
            ("scrape", ActionKind::ExtractText),
            ("wait", ActionKind::Wait),
            ("search", ActionKind::Search),
            ("find", ActionKind::Search),
        ];
        for (keyword, kind) in keyword_map {
            if lower.contains(keyword) && !action_hints.contains(kind) {
                action_hints.push(*kind);
            }
        }

        GoalHints { urls, quoted_terms, action_hints }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls() {
        let hints = GoalParser::extract("go to https://m.example.com/search and find a price");
        assert_eq!(hints.urls, vec!["https://m.example.com/search"]);
    }

    #[test]
    fn test_extract_quoted_terms() {
        let hints = GoalParser::extract(r#"search for "iPhone 14" on the site"#);
        assert_eq!(hints.quoted_terms, vec!["iPhone 14"]);
    }

    #[test]
    fn test_extract_action_hints() {
        let hints = GoalParser::extract("click the buy button then extract the price");
        assert!(hints.action_hints.contains(&ActionKind::Click));
        assert!(hints.action_hints.contains(&ActionKind::ExtractText));
    }

    #[test]
    fn test_empty_hints_is_valid_input() {
        let hints = GoalHints::empty();
        assert!(hints.urls.is_empty());
        assert!(hints.action_hints.is_empty());
    }

    #[test]
    fn test_no_hints_in_plain_goal() {
        let hints = GoalParser::extract("do the thing");
        assert!(hints.urls.is_empty());
        assert!(hints.quoted_terms.is_empty());
    }
}
