//! Input validation and output moderation applied around every generation call.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[\w.-]+@[\w.-]+\.\w+\b").expect("email pattern is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{10}\b").expect("phone pattern is valid"));

const INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore previous",
    "forget previous",
    "disregard earlier",
    "ignore instruction",
];

const TOXIC_WORDS: &[&str] = &[
    "hate",
    "stupid",
    "idiot",
    "dumb",
    "kill",
    "ugly",
    "fool",
    "trash",
    "nonsense",
    "worthless",
    "pathetic",
    "damn",
];

/// Outcome of a single rule, or of a whole rule chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub passed: bool,
    pub reason: Option<String>,
}

impl RuleResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Email address or a standalone 10-digit number.
    Pii,
    PromptInjection,
    Toxicity,
    /// "as an ai" together with "cannot verify".
    HallucinationMarker,
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Self::Pii => "pii",
            Self::PromptInjection => "prompt_injection",
            Self::Toxicity => "toxicity",
            Self::HallucinationMarker => "hallucination_marker",
        }
    }

    pub fn evaluate(self, text: &str) -> RuleResult {
        match self {
            Self::Pii => {
                if EMAIL_RE.is_match(text) || PHONE_RE.is_match(text) {
                    RuleResult::fail("PII detected")
                } else {
                    RuleResult::pass()
                }
            }
            Self::PromptInjection => {
                let lower = text.to_lowercase();
                if INJECTION_PHRASES.iter().any(|p| lower.contains(p)) {
                    RuleResult::fail("Prompt injection detected")
                } else {
                    RuleResult::pass()
                }
            }
            Self::Toxicity => {
                let lower = text.to_lowercase();
                if TOXIC_WORDS.iter().any(|w| lower.contains(w)) {
                    RuleResult::fail("Toxicity detected")
                } else {
                    RuleResult::pass()
                }
            }
            Self::HallucinationMarker => {
                let lower = text.to_lowercase();
                if lower.contains("as an ai") && lower.contains("cannot verify") {
                    RuleResult::fail("Possible hallucination")
                } else {
                    RuleResult::pass()
                }
            }
        }
    }
}

/// Ordered rule chains for the input and output phases.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    input_rules: Vec<Rule>,
    output_rules: Vec<Rule>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(
            vec![Rule::Pii, Rule::PromptInjection],
            vec![Rule::Toxicity, Rule::HallucinationMarker],
        )
    }
}

impl PolicyEngine {
    pub fn new(input_rules: Vec<Rule>, output_rules: Vec<Rule>) -> Self {
        Self {
            input_rules,
            output_rules,
        }
    }

    pub fn validate_input(&self, text: &str) -> RuleResult {
        run_chain(&self.input_rules, text, "input")
    }

    pub fn moderate_output(&self, text: &str) -> RuleResult {
        run_chain(&self.output_rules, text, "output")
    }
}

fn run_chain(rules: &[Rule], text: &str, phase: &str) -> RuleResult {
    for rule in rules {
        let result = rule.evaluate(text);
        if !result.passed {
            tracing::warn!(
                "Guardrail {phase} rule '{}' failed: {}",
                rule.name(),
                result.reason.as_deref().unwrap_or_default()
            );
            return result;
        }
    }
    RuleResult::pass()
}
