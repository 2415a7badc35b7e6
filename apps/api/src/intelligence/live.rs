//! LLM-backed document intelligence.
//!
//! Each call is bounded by the configured timeout. Any failure (transport,
//! API status, malformed JSON, timeout) is logged, counted and turned into
//! the operation's empty result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::prompts::*;
use super::{
    normalize_labels, truncate_chars, CandidateSummary, DocumentIntelligence, JobFields,
    MatchAssessment, ParsedResume, ProviderKind, RecruitmentPlanDraft, TagLimits,
    MAX_PORTRAIT_CHARS, MAX_RECOMMENDATIONS,
};
use crate::llm_client::prompts::{FACTUAL_INSTRUCTION, JSON_ONLY_INSTRUCTION};
use crate::llm_client::{LlmClient, LlmError};

/// Result of one provider call before it crosses the trait boundary.
#[derive(Debug)]
pub enum ProviderOutcome<T> {
    Answered(T),
    Degraded {
        operation: &'static str,
        reason: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagResponse {
    Wrapped { tags: Vec<String> },
    Bare(Vec<String>),
}

impl TagResponse {
    fn into_labels(self) -> Vec<String> {
        match self {
            TagResponse::Wrapped { tags } | TagResponse::Bare(tags) => tags,
        }
    }
}

pub struct LlmIntelligence {
    llm: LlmClient,
    limits: TagLimits,
    timeout: Duration,
    degraded: AtomicU64,
}

impl LlmIntelligence {
    pub fn new(llm: LlmClient, limits: TagLimits, timeout: Duration) -> Self {
        Self {
            llm,
            limits,
            timeout,
            degraded: AtomicU64::new(0),
        }
    }

    /// Runs one LLM call under the provider timeout.
    async fn ask<T, F>(&self, operation: &'static str, call: F) -> ProviderOutcome<T>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => ProviderOutcome::Answered(value),
            Ok(Err(e)) => ProviderOutcome::Degraded {
                operation,
                reason: e.to_string(),
            },
            Err(_) => ProviderOutcome::Degraded {
                operation,
                reason: format!("timed out after {}s", self.timeout.as_secs()),
            },
        }
    }

    /// Unwraps an outcome, substituting `fallback` and counting the degradation.
    fn settle<T>(&self, outcome: ProviderOutcome<T>, fallback: T) -> T {
        match outcome {
            ProviderOutcome::Answered(value) => value,
            ProviderOutcome::Degraded { operation, reason } => {
                let total = self.degraded.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(operation, degraded_total = total, "Provider call degraded: {reason}");
                fallback
            }
        }
    }

    async fn tags(&self, operation: &'static str, system: &str, prompt: String, cap: usize) -> Vec<String> {
        let system = structured(system);
        let outcome = self
            .ask(operation, self.llm.call_json::<TagResponse>(&prompt, &system))
            .await;
        let labels = normalize_labels(self.settle(outcome, TagResponse::Bare(Vec::new())).into_labels(), cap);
        info!("{operation}: {} tag(s)", labels.len());
        labels
    }
}

fn structured(system: &str) -> String {
    format!("{system} {FACTUAL_INSTRUCTION} {JSON_ONLY_INSTRUCTION}")
}

#[async_trait]
impl DocumentIntelligence for LlmIntelligence {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Live
    }

    fn degraded_calls(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    async fn parse_resume(&self, raw_text: &str) -> ParsedResume {
        if raw_text.trim().is_empty() {
            return ParsedResume::default();
        }
        let prompt = RESUME_PARSE_PROMPT_TEMPLATE.replace("{resume_text}", raw_text);
        let system = structured(RESUME_PARSE_SYSTEM);
        let outcome = self
            .ask("parse_resume", self.llm.call_json::<ParsedResume>(&prompt, &system))
            .await;
        self.settle(outcome, ParsedResume::default())
    }

    async fn generate_talent_portrait(&self, resume: &ParsedResume) -> String {
        if resume.is_empty() {
            return String::new();
        }
        let candidate_json = match serde_json::to_string_pretty(resume) {
            Ok(json) => json,
            Err(e) => {
                let outcome = ProviderOutcome::Degraded {
                    operation: "generate_talent_portrait",
                    reason: e.to_string(),
                };
                return self.settle(outcome, String::new());
            }
        };
        let prompt = PORTRAIT_PROMPT_TEMPLATE.replace("{candidate_json}", &candidate_json);
        let system = format!("{PORTRAIT_SYSTEM} {FACTUAL_INSTRUCTION}");
        let outcome = self
            .ask("generate_talent_portrait", self.llm.call_text(&prompt, &system))
            .await;
        truncate_chars(&self.settle(outcome, String::new()), MAX_PORTRAIT_CHARS)
    }

    async fn generate_resume_tags(&self, raw_text: &str) -> Vec<String> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }
        let prompt = RESUME_TAGS_PROMPT_TEMPLATE
            .replace("{limit}", &self.limits.resume.to_string())
            .replace("{resume_text}", raw_text);
        self.tags("generate_resume_tags", RESUME_TAGS_SYSTEM, prompt, self.limits.resume)
            .await
    }

    async fn extract_job_tags(&self, description: &str) -> Vec<String> {
        if description.trim().is_empty() {
            return Vec::new();
        }
        let prompt = JOB_TAGS_PROMPT_TEMPLATE
            .replace("{limit}", &self.limits.job.to_string())
            .replace("{job_text}", description);
        self.tags("extract_job_tags", JOB_TAGS_SYSTEM, prompt, self.limits.job)
            .await
    }

    async fn match_resume_to_job(&self, resume_text: &str, job_text: &str) -> MatchAssessment {
        if resume_text.trim().is_empty() || job_text.trim().is_empty() {
            return MatchAssessment::insufficient();
        }
        let prompt = MATCH_PROMPT_TEMPLATE
            .replace("{job_text}", job_text)
            .replace("{resume_text}", resume_text);
        let system = structured(MATCH_SYSTEM);
        let outcome = self
            .ask("match_resume_to_job", self.llm.call_json::<MatchAssessment>(&prompt, &system))
            .await;
        let fallback = MatchAssessment {
            score: 0.0,
            explanation: "Match assessment unavailable.".to_string(),
        };
        self.settle(outcome, fallback).clamped()
    }

    async fn generate_recruitment_plan(
        &self,
        job: &JobFields,
        candidates: &[CandidateSummary],
    ) -> RecruitmentPlanDraft {
        if job.is_empty() || candidates.is_empty() {
            return RecruitmentPlanDraft::default();
        }
        let inputs = serde_json::to_string_pretty(job)
            .and_then(|job_json| Ok((job_json, serde_json::to_string_pretty(candidates)?)));
        let (job_json, candidates_json) = match inputs {
            Ok(pair) => pair,
            Err(e) => {
                let outcome = ProviderOutcome::Degraded {
                    operation: "generate_recruitment_plan",
                    reason: e.to_string(),
                };
                return self.settle(outcome, RecruitmentPlanDraft::default());
            }
        };
        let prompt = PLAN_PROMPT_TEMPLATE
            .replace("{job_json}", &job_json)
            .replace("{candidates_json}", &candidates_json);
        let system = structured(PLAN_SYSTEM);
        let outcome = self
            .ask(
                "generate_recruitment_plan",
                self.llm.call_json::<RecruitmentPlanDraft>(&prompt, &system),
            )
            .await;
        let mut plan = self.settle(outcome, RecruitmentPlanDraft::default());
        plan.candidate_recommendations.truncate(MAX_RECOMMENDATIONS);
        plan
    }

    async fn parse_job_requirement(&self, raw_text: &str) -> JobFields {
        if raw_text.trim().is_empty() {
            return JobFields::default();
        }
        let prompt = JOB_PARSE_PROMPT_TEMPLATE.replace("{job_text}", raw_text);
        let system = structured(JOB_PARSE_SYSTEM);
        let outcome = self
            .ask("parse_job_requirement", self.llm.call_json::<JobFields>(&prompt, &system))
            .await;
        self.settle(outcome, JobFields::default())
    }
}
