//! Keyword-based risk detection for code the executor is asked to run.
//!
//! Detection runs in two phases:
//!
//! 1. **Keyword pairs**: each `RiskRule` lists pairs of terms. If both terms
//!    of any pair appear (case-insensitive substring) the rule matches. Rules
//!    are tried in order and the first match wins.
//! 2. **Heuristic**: if no rule matched but at least `heuristic_threshold`
//!    distinct danger keywords appear, the text is flagged with a medium
//!    severity finding.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Risk type reported by the multi-keyword heuristic.
pub const HEURISTIC_RISK: &str = "multiple_dangerous_keywords";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
        }
    }
}

/// A dangerous combination, described by the keyword pairs that reveal it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    pub id: String,
    pub description: String,
    pub keyword_pairs: Vec<(String, String)>,
    pub severity: Severity,
}

impl RiskRule {
    pub fn new(id: &str, description: &str, pairs: &[(&str, &str)]) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            keyword_pairs: pairs
                .iter()
                .map(|(a, b)| (a.to_lowercase(), b.to_lowercase()))
                .collect(),
            severity: Severity::High,
        }
    }

    /// The first pair whose terms both occur in `lowered`.
    fn matching_pair(&self, lowered: &str) -> Option<&(String, String)> {
        self.keyword_pairs
            .iter()
            .find(|(a, b)| lowered.contains(a.as_str()) && lowered.contains(b.as_str()))
    }
}

/// Why a piece of text was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub risk_type: String,
    pub description: String,
    pub detected_keywords: Vec<String>,
    pub severity: Severity,
    /// Which part of the invocation matched, e.g. `"code"` or `"arguments.chemicals"`.
    pub detected_in: String,
}

#[derive(Debug, Clone)]
pub struct RiskDetector {
    rules: Vec<RiskRule>,
    heuristic_keywords: Vec<String>,
    heuristic_threshold: usize,
}

impl Default for RiskDetector {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Chemical combinations the lab must never perform.
pub fn default_rules() -> Vec<RiskRule> {
    vec![
        RiskRule::new(
            "chlorine_ammonia",
            "Produces toxic chloramine gas",
            &[("chlorine", "ammonia"), ("Cl2", "NH3"), ("bleach", "ammonia")],
        ),
        RiskRule::new(
            "acid_bleach",
            "Produces toxic chlorine gas",
            &[("acid", "bleach"), ("HCl", "NaClO"), ("hydrochloric", "hypochlorite")],
        ),
        RiskRule::new(
            "oxidizer_fuel",
            "Can cause violent reactions or explosions",
            &[("oxidizer", "fuel"), ("oxidizing", "reducing"), ("peroxide", "organic")],
        ),
        RiskRule::new(
            "explosive_precursors",
            "Can form explosive compounds",
            &[("nitrate", "sulfur"), ("nitric", "glycerin"), ("explosive", "precursor")],
        ),
    ]
}

const HEURISTIC_KEYWORDS: [&str; 11] = [
    "explosive",
    "detonat",
    "ignit",
    "combust",
    "toxic",
    "poison",
    "lethal",
    "fatal",
    "radiation",
    "radioactive",
    "nuclear",
];

impl RiskDetector {
    pub fn new(rules: Vec<RiskRule>) -> Self {
        Self {
            rules,
            heuristic_keywords: HEURISTIC_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            heuristic_threshold: 2,
        }
    }

    /// Append a rule. It is tried after the existing ones.
    pub fn with_rule(mut self, rule: RiskRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RiskRule] {
        &self.rules
    }

    /// Check free text (code, a message, an argument value).
    pub fn check_code(&self, code: &str) -> Option<RiskFinding> {
        self.check_text(code, "code")
    }

    /// Check tool arguments other than `code`.
    ///
    /// A `chemicals` list is joined and checked against the keyword pairs;
    /// every other string argument is checked like code.
    pub fn check_arguments(&self, arguments: &Value) -> Option<RiskFinding> {
        let object = arguments.as_object()?;

        if let Some(chemicals) = object.get("chemicals").and_then(Value::as_array) {
            if chemicals.len() >= 2 {
                let joined = chemicals
                    .iter()
                    .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                if let Some(finding) = self.match_rules(&joined, "arguments.chemicals") {
                    return Some(finding);
                }
            }
        }

        object
            .iter()
            .filter(|(key, _)| key.as_str() != "code")
            .filter_map(|(key, value)| value.as_str().map(|s| (key, s)))
            .find_map(|(key, s)| self.check_text(s, &format!("arguments.{}", key)))
    }

    fn check_text(&self, text: &str, location: &str) -> Option<RiskFinding> {
        let lowered = text.to_lowercase();
        if let Some(finding) = self.match_rules(&lowered, location) {
            return Some(finding);
        }

        let found: Vec<String> = self
            .heuristic_keywords
            .iter()
            .filter(|kw| lowered.contains(kw.as_str()))
            .cloned()
            .collect();
        if found.len() >= self.heuristic_threshold {
            warn!(keywords = ?found, location, "multiple danger keywords detected");
            return Some(RiskFinding {
                risk_type: HEURISTIC_RISK.to_string(),
                description: "Multiple dangerous keywords detected".to_string(),
                detected_keywords: found,
                severity: Severity::Medium,
                detected_in: location.to_string(),
            });
        }
        None
    }

    fn match_rules(&self, lowered: &str, location: &str) -> Option<RiskFinding> {
        for rule in &self.rules {
            if let Some((a, b)) = rule.matching_pair(lowered) {
                debug!(rule_id = %rule.id, location, "risk rule matched");
                return Some(RiskFinding {
                    risk_type: rule.id.clone(),
                    description: rule.description.clone(),
                    detected_keywords: vec![a.clone(), b.clone()],
                    severity: rule.severity,
                    detected_in: location.to_string(),
                });
            }
        }
        None
    }
}
