//! Process-wide counters rendered in the Prometheus text exposition format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Upper bounds (seconds) of the LLM latency histogram buckets.
const LATENCY_BUCKETS: [f64; 9] = [0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

const PREFIX: &str = "listing_assistant";

#[derive(Debug, Clone, Copy)]
pub enum Phase {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy)]
pub enum TokenKind {
    Prompt,
    Completion,
}

#[derive(Default)]
struct Histogram {
    buckets: [AtomicU64; LATENCY_BUCKETS.len()],
    count: AtomicU64,
    /// Sum in microseconds.
    sum_micros: AtomicU64,
}

impl Histogram {
    fn observe(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        for (bound, bucket) in LATENCY_BUCKETS.iter().zip(&self.buckets) {
            if secs <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
    }
}

/// Monotonic counters shared by every request handler.
#[derive(Default)]
pub struct Metrics {
    chat_requests: AtomicU64,
    llm_requests: AtomicU64,
    llm_latency: Histogram,
    input_violations: AtomicU64,
    output_violations: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_chat_request(&self) {
        self.chat_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_llm_request(&self, elapsed: Duration) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
        self.llm_latency.observe(elapsed);
    }

    pub fn record_violation(&self, phase: Phase) {
        let counter = match phase {
            Phase::Input => &self.input_violations,
            Phase::Output => &self.output_violations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds an estimated token count (about four characters per token).
    pub fn record_tokens(&self, kind: TokenKind, text: &str) {
        let tokens = (text.chars().count() as u64).div_ceil(4);
        let counter = match kind {
            TokenKind::Prompt => &self.prompt_tokens,
            TokenKind::Completion => &self.completion_tokens,
        };
        counter.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn llm_requests(&self) -> u64 {
        self.llm_requests.load(Ordering::Relaxed)
    }

    pub fn violations(&self) -> u64 {
        self.input_violations.load(Ordering::Relaxed)
            + self.output_violations.load(Ordering::Relaxed)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# HELP {PREFIX}_chat_requests_total Chat turns received.");
        let _ = writeln!(out, "# TYPE {PREFIX}_chat_requests_total counter");
        let _ = writeln!(
            out,
            "{PREFIX}_chat_requests_total {}",
            self.chat_requests.load(Ordering::Relaxed)
        );

        let _ = writeln!(out, "# HELP {PREFIX}_llm_requests_total Policy-gated generation calls.");
        let _ = writeln!(out, "# TYPE {PREFIX}_llm_requests_total counter");
        let _ = writeln!(out, "{PREFIX}_llm_requests_total {}", self.llm_requests());

        let name = format!("{PREFIX}_llm_request_duration_seconds");
        let _ = writeln!(out, "# HELP {name} Latency of policy-gated generation calls.");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (bound, bucket) in LATENCY_BUCKETS.iter().zip(&self.llm_latency.buckets) {
            let _ = writeln!(
                out,
                "{name}_bucket{{le=\"{bound}\"}} {}",
                bucket.load(Ordering::Relaxed)
            );
        }
        let count = self.llm_latency.count.load(Ordering::Relaxed);
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
        let sum = self.llm_latency.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let _ = writeln!(out, "{name}_sum {sum}");
        let _ = writeln!(out, "{name}_count {count}");

        let _ = writeln!(out, "# HELP {PREFIX}_guardrail_violations_total Guardrail rule failures.");
        let _ = writeln!(out, "# TYPE {PREFIX}_guardrail_violations_total counter");
        let _ = writeln!(
            out,
            "{PREFIX}_guardrail_violations_total{{phase=\"input\"}} {}",
            self.input_violations.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "{PREFIX}_guardrail_violations_total{{phase=\"output\"}} {}",
            self.output_violations.load(Ordering::Relaxed)
        );

        let _ = writeln!(out, "# HELP {PREFIX}_llm_tokens_total Estimated tokens sent and received.");
        let _ = writeln!(out, "# TYPE {PREFIX}_llm_tokens_total counter");
        let _ = writeln!(
            out,
            "{PREFIX}_llm_tokens_total{{kind=\"prompt\"}} {}",
            self.prompt_tokens.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            out,
            "{PREFIX}_llm_tokens_total{{kind=\"completion\"}} {}",
            self.completion_tokens.load(Ordering::Relaxed)
        );

        out
    }
}
