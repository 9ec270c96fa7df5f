//! Voice command grammar - an ordered substring table.
//!
//! The table is data: it serializes into the config file and can be
//! replaced without touching the dispatcher. Rules are tried in order and
//! the first rule with a keyword contained in the normalized transcript
//! wins.

use serde::{Deserialize, Serialize};

use crate::state::View;

/// What a matched rule asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleAction {
    Navigate { view: View },
    SetTracking { enabled: bool },
    TogglePrecision,
    ResetCalibration,
    /// Only matches while the calibration view is showing.
    StartCalibration,
    Click,
}

/// One grammar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRule {
    pub keywords: Vec<String>,
    pub action: RuleAction,
}

impl CommandRule {
    fn new(keywords: &[&str], action: RuleAction) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            action,
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && normalized.contains(k.as_str()))
    }
}

/// Full command table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub rules: Vec<CommandRule>,
    /// The only keywords honoured while calibration runs.
    pub cancel_keywords: Vec<String>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            rules: vec![
                CommandRule::new(
                    &["start tracking", "resume tracking", "tracking on", "enable tracking"],
                    RuleAction::SetTracking { enabled: true },
                ),
                CommandRule::new(
                    &["stop tracking", "pause tracking", "tracking off", "disable tracking"],
                    RuleAction::SetTracking { enabled: false },
                ),
                CommandRule::new(&["precision", "slow mode", "slow down"], RuleAction::TogglePrecision),
                CommandRule::new(&["reset"], RuleAction::ResetCalibration),
                CommandRule::new(&["start", "begin"], RuleAction::StartCalibration),
                CommandRule::new(
                    &["dashboard", "home"],
                    RuleAction::Navigate { view: View::Dashboard },
                ),
                CommandRule::new(
                    &["calibrat"],
                    RuleAction::Navigate { view: View::Calibration },
                ),
                CommandRule::new(
                    &["setting", "preference"],
                    RuleAction::Navigate { view: View::Settings },
                ),
                CommandRule::new(
                    &["analytic", "statistic", "stats"],
                    RuleAction::Navigate { view: View::Analytics },
                ),
                CommandRule::new(&["click", "select", "press"], RuleAction::Click),
            ],
            cancel_keywords: vec!["stop".to_string(), "cancel".to_string(), "abort".to_string()],
        }
    }
}

/// Lowercase, trim and collapse whitespace.
pub fn normalize(transcript: &str) -> String {
    transcript
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Grammar {
    /// First rule matching `transcript` in the given view.
    pub fn match_transcript(&self, transcript: &str, view: View) -> Option<&RuleAction> {
        let normalized = normalize(transcript);
        if normalized.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .filter(|r| r.action != RuleAction::StartCalibration || view == View::Calibration)
            .find(|r| r.matches(&normalized))
            .map(|r| &r.action)
    }

    /// Whether `transcript` is a stop/cancel command.
    pub fn is_cancel(&self, transcript: &str) -> bool {
        let normalized = normalize(transcript);
        self.cancel_keywords
            .iter()
            .any(|k| !k.is_empty() && normalized.contains(k.as_str()))
    }
}
