//! Screening pipeline — one resume: preprocess → build request → evaluate → score.
//!
//! Each resume is independent. A batch runs resumes concurrently behind a
//! semaphore and reports one outcome per input, in input order. A failure
//! is recorded on its own outcome and never touches the others. Dropping the
//! batch future aborts every resume that has not finished.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::models::evaluation::{ResumeRecord, ScoreRow};
use crate::models::qualification::Position;
use crate::screening::evaluation::{EvaluationClient, EvaluationError};
use crate::screening::preprocess::preprocess_resume;
use crate::screening::request_builder::build_evaluation_request;
use crate::screening::scorer::{score_evaluation, ScorerReconciliationError};

/// One resume as handed over by the upload layer: already-extracted text.
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeInput {
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("scorer reconciliation failed: {0}")]
    Reconciliation(#[from] ScorerReconciliationError),

    #[error("screening task aborted: {0}")]
    Aborted(String),
}

impl ScreeningError {
    pub fn code(&self) -> &'static str {
        match self {
            ScreeningError::Evaluation(e) => e.code(),
            ScreeningError::Reconciliation(_) => "RECONCILIATION_ERROR",
            ScreeningError::Aborted(_) => "ABORTED",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ScreeningError::Evaluation(e) => e.is_retryable(),
            ScreeningError::Reconciliation(_) => false,
            ScreeningError::Aborted(_) => false,
        }
    }
}

/// Result of screening one resume. `record` keeps the heuristic identity so
/// failed outcomes can still be labelled in the report.
#[derive(Debug, Clone)]
pub struct ScreeningOutcome {
    pub file_name: String,
    pub record: ResumeRecord,
    pub result: Result<ScoreRow, ScreeningError>,
}

impl ScreeningOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub async fn screen_resume(
    input: ResumeInput,
    position: &Position,
    client: &EvaluationClient,
) -> ScreeningOutcome {
    let record = preprocess_resume(&input.text);
    let request = build_evaluation_request(&record, &position.qualifications);

    let result = async {
        let evaluation = client.evaluate(&request, &position.qualifications).await?;
        let row = score_evaluation(&evaluation, &position.qualifications, &position.scores)?;
        Ok::<ScoreRow, ScreeningError>(row)
    }
    .await;

    match &result {
        Ok(row) => debug!(
            candidate = %row.candidate_name,
            final_score = %row.final_score,
            "resume scored"
        ),
        Err(e) => warn!(
            code = e.code(),
            retryable = e.is_retryable(),
            error = %e,
            "resume screening failed"
        ),
    }

    ScreeningOutcome {
        file_name: input.file_name,
        record,
        result,
    }
}

/// Screens every resume with at most `max_concurrency` evaluations in flight.
/// Outcomes come back in input order regardless of completion order.
pub async fn screen_batch(
    inputs: Vec<ResumeInput>,
    position: Arc<Position>,
    client: EvaluationClient,
    max_concurrency: usize,
) -> Vec<ScreeningOutcome> {
    let total = inputs.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    info!(
        total,
        max_concurrency,
        position = %position.name,
        "screening batch started"
    );

    let mut tasks = JoinSet::new();
    let mut task_index = HashMap::with_capacity(total);
    let mut pending = Vec::with_capacity(total);
    for (index, input) in inputs.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let position = position.clone();
        let client = client.clone();
        let span = info_span!("screen_resume", index, file = %input.file_name);
        pending.push((input.file_name.clone(), input.text.clone()));

        let handle = tasks.spawn(
            async move {
                // The semaphore is never closed, so acquire only fails if it is.
                let _permit = semaphore.acquire_owned().await.ok();
                (index, screen_resume(input, &position, &client).await)
            }
            .instrument(span),
        );
        task_index.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<ScreeningOutcome>> = vec![None; total];
    let mut failures: HashMap<usize, String> = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => {
                let index = task_index.get(&e.id()).copied();
                error!(?index, error = %e, "screening task failed");
                if let Some(index) = index {
                    failures.insert(index, e.to_string());
                }
            }
        }
    }

    let outcomes: Vec<ScreeningOutcome> = slots
        .into_iter()
        .zip(pending)
        .enumerate()
        .map(|(index, (slot, (file_name, raw_text)))| {
            slot.unwrap_or_else(|| ScreeningOutcome {
                file_name,
                record: preprocess_resume(&raw_text),
                result: Err(ScreeningError::Aborted(
                    failures
                        .remove(&index)
                        .unwrap_or_else(|| "task did not complete".to_string()),
                )),
            })
        })
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        succeeded,
        failed = total - succeeded,
        "screening batch finished"
    );
    outcomes
}
