//! Axum route handlers for the Screening API.
//!
//! Handlers are stateless: the caller supplies the position's criteria and the
//! already-extracted resume texts on every request.

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::evaluation::ScoreRow;
use crate::models::qualification::{Position, QualificationSet, ScoreConfig};
use crate::screening::pipeline::{screen_batch, ResumeInput, ScreeningError, ScreeningOutcome};
use crate::screening::report::ScreeningReport;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualificationLists {
    #[serde(default)]
    pub minimum: Vec<String>,
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub added_value: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreeningRequest {
    pub position_name: String,
    pub qualifications: QualificationLists,
    /// Defaults to 1 / 2 / 3 points per satisfied qualification.
    #[serde(default)]
    pub scores: Option<ScoreConfig>,
    pub resumes: Vec<ResumeInput>,
}

#[derive(Debug, Serialize)]
pub struct ScreeningResponse {
    pub batch_id: Uuid,
    pub position_name: String,
    pub generated_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<OutcomeView>,
}

/// Wire form of one outcome: either a scorecard or an error, never both.
#[derive(Debug, Serialize)]
pub struct OutcomeView {
    pub file_name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorView>,
}

#[derive(Debug, Serialize)]
pub struct ErrorView {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
    /// Heuristic identity from the resume text, since no judgment is available.
    pub candidate_name: String,
    pub candidate_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl From<ScreeningOutcome> for OutcomeView {
    fn from(outcome: ScreeningOutcome) -> Self {
        match outcome.result {
            Ok(row) => OutcomeView {
                file_name: outcome.file_name,
                status: "scored",
                score: Some(row),
                error: None,
            },
            Err(e) => {
                let raw_response = match &e {
                    ScreeningError::Evaluation(inner) => {
                        inner.raw_response().map(String::from)
                    }
                    _ => None,
                };
                OutcomeView {
                    file_name: outcome.file_name,
                    status: "failed",
                    score: None,
                    error: Some(ErrorView {
                        code: e.code(),
                        message: e.to_string(),
                        retryable: e.is_retryable(),
                        candidate_name: outcome.record.name,
                        candidate_email: outcome.record.email,
                        raw_response,
                    }),
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation + batch execution shared by both endpoints
// ────────────────────────────────────────────────────────────────────────────

fn validate(request: &ScreeningRequest) -> Result<(), AppError> {
    if request.position_name.trim().is_empty() {
        return Err(AppError::Validation(
            "position_name cannot be empty".to_string(),
        ));
    }
    if request.resumes.is_empty() {
        return Err(AppError::Validation(
            "at least one resume is required".to_string(),
        ));
    }
    let lists = &request.qualifications;
    if lists.minimum.is_empty() && lists.preferred.is_empty() && lists.added_value.is_empty() {
        return Err(AppError::Validation(
            "at least one qualification is required".to_string(),
        ));
    }
    let blank = lists
        .minimum
        .iter()
        .chain(&lists.preferred)
        .chain(&lists.added_value)
        .any(|q| q.trim().is_empty());
    if blank {
        return Err(AppError::Validation(
            "qualification descriptions cannot be blank".to_string(),
        ));
    }
    Ok(())
}

async fn run_screening(
    state: &AppState,
    request: ScreeningRequest,
) -> Result<(Arc<Position>, Vec<ScreeningOutcome>), AppError> {
    validate(&request)?;

    let ScreeningRequest {
        position_name,
        qualifications,
        scores,
        resumes,
    } = request;

    let position = Arc::new(Position {
        name: position_name,
        qualifications: QualificationSet::from_tiers(
            qualifications.minimum,
            qualifications.preferred,
            qualifications.added_value,
        ),
        scores: scores.unwrap_or_default(),
    });

    let outcomes = screen_batch(
        resumes,
        position.clone(),
        state.evaluator.clone(),
        state.config.max_concurrent_evaluations,
    )
    .await;

    Ok((position, outcomes))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/screenings
///
/// Screens every resume and returns one outcome per resume, in input order.
/// Individual failures are reported inline; the request still succeeds.
pub async fn handle_screen(
    State(state): State<AppState>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Json<ScreeningResponse>, AppError> {
    let batch_id = Uuid::new_v4();
    let (position, outcomes) = run_screening(&state, request).await?;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    let failed = outcomes.len() - succeeded;
    info!(%batch_id, succeeded, failed, "screening request completed");

    Ok(Json(ScreeningResponse {
        batch_id,
        position_name: position.name.clone(),
        generated_at: Utc::now(),
        succeeded,
        failed,
        outcomes: outcomes.into_iter().map(OutcomeView::from).collect(),
    }))
}

/// POST /api/v1/screenings/report
///
/// Same input as `handle_screen`; responds with the tabular report as CSV.
pub async fn handle_screen_report(
    State(state): State<AppState>,
    Json(request): Json<ScreeningRequest>,
) -> Result<Response, AppError> {
    let (position, outcomes) = run_screening(&state, request).await?;
    let csv = ScreeningReport::build(&position.qualifications, &outcomes).to_csv()?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{} Screening Result.csv\"",
        sanitize_file_stem(&position.name)
    ))
    .map_err(|e| AppError::Internal(anyhow!("invalid Content-Disposition header: {e}")))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Keeps the position name usable inside a quoted header filename.
fn sanitize_file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::{JudgmentService, TransportError};
    use crate::routes::build_router;
    use crate::screening::evaluation::EvaluationClient;

    /// Satisfies every qualification whose text appears in the resume.
    struct KeywordJudge;

    #[async_trait]
    impl JudgmentService for KeywordJudge {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, TransportError> {
            if prompt.contains("GARBLED") {
                return Ok("not json at all".to_string());
            }
            let resume = prompt
                .split("Resume:\n")
                .nth(1)
                .and_then(|rest| rest.split("\n---").next())
                .unwrap_or_default()
                .to_string();
            let judgments: Vec<Value> = prompt
                .lines()
                .filter_map(|line| line.strip_prefix("- ["))
                .filter_map(|rest| rest.split_once("] "))
                .map(|(id, text)| {
                    let kind = match id.split('-').next() {
                        Some("MIN") => "Minimum Qualification",
                        Some("PREF") => "Preferred Qualification",
                        _ => "Added Value",
                    };
                    json!({
                        "id": id,
                        "qualification_type": kind,
                        "qualification": text,
                        "true_or_false": resume.contains(text),
                        "explanation": "keyword check"
                    })
                })
                .collect();
            Ok(json!({
                "name": "Test Candidate",
                "email": "candidate@example.com",
                "summarization": "Test summary.",
                "is_veteran": resume.contains("Navy"),
                "qualifications": judgments
            })
            .to_string())
        }
    }

    fn test_state() -> AppState {
        let config = Config::from_lookup(|key| {
            (key == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string())
        })
        .unwrap();
        AppState {
            evaluator: EvaluationClient::new(Arc::new(KeywordJudge), Duration::from_secs(5)),
            config,
        }
    }

    fn body() -> Value {
        json!({
            "position_name": "Data Engineer",
            "qualifications": {
                "minimum": ["Python", "SQL"],
                "preferred": ["Airflow"],
                "added_value": ["Spark"]
            },
            "scores": {"minimum": 10, "preferred": 5, "added_value": 2},
            "resumes": [
                {"file_name": "a.pdf", "text": "Ann Lee\nPython and SQL, Airflow. Navy 2010-2014"},
                {"file_name": "b.pdf", "text": "Bo Kim\nGARBLED"},
                {"file_name": "c.pdf", "text": "Cy Park\nSpark only"}
            ]
        })
    }

    async fn post(uri: &str, payload: Value) -> Response {
        build_router(test_state())
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_screening_returns_outcomes_in_input_order() {
        let response = post("/api/v1/screenings", body()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let payload = read_json(response).await;
        assert_eq!(payload["succeeded"], 2);
        assert_eq!(payload["failed"], 1);

        let outcomes = payload["outcomes"].as_array().unwrap();
        assert_eq!(outcomes[0]["file_name"], "a.pdf");
        assert_eq!(outcomes[0]["score"]["minimum_total"], 20);
        assert_eq!(outcomes[0]["score"]["preferred_total"], 5);
        assert_eq!(outcomes[0]["score"]["added_value_total"], 0);
        assert_eq!(outcomes[0]["score"]["veteran_bonus"], 1.25);
        assert_eq!(outcomes[0]["score"]["final_score"], 26.25);

        assert_eq!(outcomes[1]["status"], "failed");
        assert_eq!(outcomes[1]["error"]["code"], "MALFORMED_RESPONSE");
        assert_eq!(outcomes[1]["error"]["raw_response"], "not json at all");
        assert_eq!(outcomes[1]["error"]["candidate_name"], "Bo Kim");
        assert!(outcomes[1].get("score").is_none());

        assert_eq!(outcomes[2]["score"]["added_value_total"], 2);
        assert_eq!(outcomes[2]["score"]["final_score"], 2.0);
    }

    #[tokio::test]
    async fn test_report_endpoint_returns_csv() {
        let response = post("/api/v1/screenings/report", body()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Data Engineer Screening Result.csv\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(bytes.to_vec()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Python,SQL,Airflow,Spark"));
        assert!(lines[1].starts_with("a.pdf,Test Candidate"));
        assert!(lines[2].contains("MALFORMED_RESPONSE"));
    }

    #[tokio::test]
    async fn test_rejects_empty_resume_list() {
        let mut payload = body();
        payload["resumes"] = json!([]);
        let response = post("/api/v1/screenings", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(payload["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_rejects_position_without_qualifications() {
        let mut payload = body();
        payload["qualifications"] = json!({});
        let response = post("/api/v1/screenings", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejects_blank_qualification() {
        let mut payload = body();
        payload["qualifications"]["preferred"] = json!(["  "]);
        let response = post("/api/v1/screenings", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejects_blank_position_name() {
        let mut payload = body();
        payload["position_name"] = json!("   ");
        let response = post("/api/v1/screenings", payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json(response).await;
        assert_eq!(payload["error"]["code"], "VALIDATION_ERROR");
        assert!(payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("position_name"));
    }

    #[tokio::test]
    async fn test_health_reports_service_status() {
        let response = build_router(test_state())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json(response).await;
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["service"], "screener-api");
        assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_scores_default_when_omitted() {
        let mut payload = body();
        payload.as_object_mut().unwrap().remove("scores");
        let response = post("/api/v1/screenings", payload).await;
        let payload = read_json(response).await;
        // Python + SQL at 1, Airflow at 2, veteran bonus 5% of 4.
        assert_eq!(payload["outcomes"][0]["score"]["final_score"], 4.2);
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem(" Ops/Dev \"Lead\" "), "Ops_Dev _Lead_");
    }
}
