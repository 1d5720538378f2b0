use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::llm::Generator;
use crate::metrics::{Metrics, Phase, TokenKind};
use crate::models::ChatResponse;
use crate::policy::PolicyEngine;

/// Outcome of a policy-gated generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gated {
    /// Generated text that passed output moderation.
    Allowed(String),
    /// A guardrail rejected the prompt or the completion; carries the user-facing message.
    Blocked(String),
}

impl Gated {
    pub fn into_response(self) -> ChatResponse {
        match self {
            Self::Allowed(t) | Self::Blocked(t) => ChatResponse::text(t),
        }
    }
}

/// Wraps a [`Generator`] with input validation, output moderation, a timeout and metrics.
pub struct GatedGenerator {
    generator: Arc<dyn Generator>,
    policy: Arc<PolicyEngine>,
    metrics: Arc<Metrics>,
    timeout: Duration,
}

impl GatedGenerator {
    pub fn new(
        generator: Arc<dyn Generator>,
        policy: Arc<PolicyEngine>,
        metrics: Arc<Metrics>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            policy,
            metrics,
            timeout,
        }
    }

    /// Validate `prompt`, generate, moderate. Upstream failures and timeouts
    /// are returned as errors; guardrail rejections are `Ok(Gated::Blocked)`.
    pub async fn call(&self, prompt: &str) -> Result<Gated> {
        let started = Instant::now();
        let outcome = self.call_inner(prompt).await;
        self.metrics.record_llm_request(started.elapsed());
        outcome
    }

    async fn call_inner(&self, prompt: &str) -> Result<Gated> {
        let check = self.policy.validate_input(prompt);
        if !check.passed {
            self.metrics.record_violation(Phase::Input);
            return Ok(Gated::Blocked(format!(
                "Input Guardrail Violation: {}",
                check.reason.unwrap_or_default()
            )));
        }

        self.metrics.record_tokens(TokenKind::Prompt, prompt);
        let generated = tokio::time::timeout(self.timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;
        let generated = generated.trim().to_string();
        self.metrics.record_tokens(TokenKind::Completion, &generated);

        let check = self.policy.moderate_output(&generated);
        if !check.passed {
            self.metrics.record_violation(Phase::Output);
            return Ok(Gated::Blocked(format!(
                "Output Guardrail Violation: {}",
                check.reason.unwrap_or_default()
            )));
        }

        Ok(Gated::Allowed(generated))
    }
}
