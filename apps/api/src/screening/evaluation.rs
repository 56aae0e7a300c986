//! Evaluation Client — sends a built request to the judgment service and turns
//! the reply into a validated `EvaluationResult` or a typed `EvaluationError`.
//!
//! Parsing is strict: code fences are stripped, nothing else is repaired.
//! Judgments are reconciled to the input qualifications by echoed id, and the
//! echoed text must be byte-identical to the input text. Responses without ids
//! fall back to exact-text matching within the echoed tier.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::{strip_json_fences, JudgmentService, TransportError};
use crate::models::evaluation::{
    EvaluationResult, QualificationJudgment, EMAIL_NOT_FOUND, NAME_NOT_FOUND,
};
use crate::models::qualification::{QualificationId, QualificationSet, QualificationTier};
use crate::screening::request_builder::EvaluationRequest;

/// Raw responses longer than this are truncated in logs (never in errors).
const LOG_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("schema violation: {reason}")]
    SchemaViolation { reason: String, raw: String },
}

impl EvaluationError {
    pub fn code(&self) -> &'static str {
        match self {
            EvaluationError::Transport(_) => "TRANSPORT_ERROR",
            EvaluationError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            EvaluationError::SchemaViolation { .. } => "SCHEMA_VIOLATION",
        }
    }

    /// Only transport failures can be fixed by resending the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EvaluationError::Transport(_))
    }

    /// The service's raw reply, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            EvaluationError::Transport(_) => None,
            EvaluationError::MalformedResponse { raw, .. }
            | EvaluationError::SchemaViolation { raw, .. } => Some(raw),
        }
    }
}

/// Wraps a `JudgmentService` with a per-call timeout and response validation.
#[derive(Clone)]
pub struct EvaluationClient {
    service: Arc<dyn JudgmentService>,
    timeout: Duration,
}

impl EvaluationClient {
    pub fn new(service: Arc<dyn JudgmentService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
        qualifications: &QualificationSet,
    ) -> Result<EvaluationResult, EvaluationError> {
        let raw = tokio::time::timeout(
            self.timeout,
            self.service.complete(&request.prompt, &request.system),
        )
        .await
        .map_err(|_| TransportError::timeout(self.timeout))??;

        match parse_evaluation(&raw, qualifications) {
            Ok(result) => {
                debug!(
                    judgments = result.judgments.len(),
                    is_veteran = result.is_veteran,
                    "evaluation parsed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(
                    code = err.code(),
                    error = %err,
                    raw = %preview(&raw),
                    "judgment service returned an unusable response"
                );
                Err(err)
            }
        }
    }
}

fn preview(raw: &str) -> String {
    if raw.chars().count() <= LOG_PREVIEW_CHARS {
        return raw.to_string();
    }
    let head: String = raw.chars().take(LOG_PREVIEW_CHARS).collect();
    format!("{head}…")
}

// ────────────────────────────────────────────────────────────────────────────
// Wire shape
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    name: String,
    #[serde(default)]
    email: Option<String>,
    summarization: String,
    #[serde(deserialize_with = "strict_flag")]
    is_veteran: bool,
    qualifications: Vec<RawJudgment>,
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    #[serde(default)]
    id: Option<QualificationId>,
    qualification_type: String,
    qualification: String,
    #[serde(deserialize_with = "strict_flag")]
    true_or_false: bool,
    explanation: String,
}

/// A JSON boolean, or the string "true"/"false" in any case. Nothing else:
/// "yes", "unknown", numbers and null are rejected.
fn strict_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(serde::de::Error::custom(format!(
                "expected a boolean, got string {text:?}"
            ))),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, got {other}"
        ))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing and reconciliation
// ────────────────────────────────────────────────────────────────────────────

/// Parses raw service output against the qualification set it was asked about.
pub fn parse_evaluation(
    raw: &str,
    qualifications: &QualificationSet,
) -> Result<EvaluationResult, EvaluationError> {
    let body = strip_json_fences(raw);

    let value: Value =
        serde_json::from_str(body).map_err(|e| EvaluationError::MalformedResponse {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;

    let violation = |reason: String| EvaluationError::SchemaViolation {
        reason,
        raw: raw.to_string(),
    };

    if !value.is_object() {
        return Err(violation("response is not a JSON object".to_string()));
    }

    let parsed: RawEvaluation =
        serde_json::from_value(value).map_err(|e| violation(e.to_string()))?;

    let judgments = reconcile(parsed.qualifications, qualifications).map_err(violation)?;

    Ok(EvaluationResult {
        candidate_name: non_blank(&parsed.name).unwrap_or(NAME_NOT_FOUND).to_string(),
        candidate_email: parsed
            .email
            .as_deref()
            .and_then(non_blank)
            .unwrap_or(EMAIL_NOT_FOUND)
            .to_string(),
        summary: parsed.summarization.trim().to_string(),
        is_veteran: parsed.is_veteran,
        judgments,
    })
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Matches every raw judgment to exactly one input qualification and returns
/// the judgments in qualification-set order.
fn reconcile(
    raw: Vec<RawJudgment>,
    qualifications: &QualificationSet,
) -> Result<Vec<QualificationJudgment>, String> {
    let mut slots: Vec<Option<QualificationJudgment>> = vec![None; qualifications.len()];
    let mut seen: HashSet<QualificationId> = HashSet::new();

    for judgment in raw {
        let echoed_tier = QualificationTier::from_label(&judgment.qualification_type)
            .ok_or_else(|| {
                format!(
                    "unknown qualification_type {:?} for {:?}",
                    judgment.qualification_type, judgment.qualification
                )
            })?;

        let qualification = match &judgment.id {
            Some(id) => qualifications
                .get(id)
                .ok_or_else(|| format!("unknown qualification id {id}"))?,
            None => qualifications
                .tier(echoed_tier)
                .find(|q| q.description == judgment.qualification && !seen.contains(&q.id))
                .ok_or_else(|| {
                    format!(
                        "judgment {:?} matches no remaining {} qualification",
                        judgment.qualification, echoed_tier
                    )
                })?,
        };

        if !seen.insert(qualification.id.clone()) {
            return Err(format!("duplicate judgment for {}", qualification.id));
        }
        if judgment.qualification != qualification.description {
            return Err(format!(
                "text for {} does not match: expected {:?}, got {:?}",
                qualification.id, qualification.description, judgment.qualification
            ));
        }
        if echoed_tier != qualification.tier {
            return Err(format!(
                "{} is a {} but was returned as {}",
                qualification.id, qualification.tier, echoed_tier
            ));
        }

        let index = qualifications
            .index_of(&qualification.id)
            .ok_or_else(|| format!("unknown qualification id {}", qualification.id))?;
        slots[index] = Some(QualificationJudgment {
            id: qualification.id.clone(),
            tier: qualification.tier,
            qualification_text: qualification.description.clone(),
            satisfied: judgment.true_or_false,
            explanation: judgment.explanation,
        });
    }

    let missing: Vec<String> = qualifications
        .iter()
        .zip(&slots)
        .filter(|(_, slot)| slot.is_none())
        .map(|(q, _)| q.id.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing judgments for {}", missing.join(", ")));
    }

    Ok(slots.into_iter().flatten().collect())
}
