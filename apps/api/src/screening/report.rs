//! Report assembly — one row per screened resume, in input order.
//!
//! Failed screenings get an explicit error row: heuristic name/email, blank
//! score cells, and the error in the last column. Nothing is zero-filled.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::qualification::{QualificationSet, QualificationTier};
use crate::screening::pipeline::ScreeningOutcome;

pub const FILE_NAME_COLUMN: &str = "File Name";
pub const ERROR_COLUMN: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningReport {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ScreeningReport {
    pub fn build(qualifications: &QualificationSet, outcomes: &[ScreeningOutcome]) -> Self {
        let mut columns = vec![
            FILE_NAME_COLUMN.to_string(),
            "Candidate Name".to_string(),
            "Email".to_string(),
            "Veteran".to_string(),
        ];
        columns.extend(qualifications.iter().map(|q| q.description.clone()));
        columns.extend(QualificationTier::ALL.iter().map(|t| t.total_column()));
        columns.extend(
            ["Veteran Score", "Final Score", "Summary", ERROR_COLUMN]
                .into_iter()
                .map(String::from),
        );

        let rows = outcomes
            .iter()
            .map(|outcome| report_row(qualifications.len(), outcome))
            .collect();

        Self { columns, rows }
    }

    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        // Every field written was a valid UTF-8 String.
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn report_row(qualification_count: usize, outcome: &ScreeningOutcome) -> Vec<String> {
    let mut row = Vec::with_capacity(qualification_count + 11);
    row.push(outcome.file_name.clone());

    match &outcome.result {
        Ok(score) => {
            row.push(score.candidate_name.clone());
            row.push(score.candidate_email.clone());
            row.push(score.is_veteran.to_string());
            row.extend(score.qualification_scores.iter().map(|s| s.score.to_string()));
            row.extend(
                QualificationTier::ALL
                    .iter()
                    .map(|&t| score.tier_total(t).to_string()),
            );
            row.push(money(score.veteran_bonus));
            row.push(money(score.final_score));
            row.push(score.summary.clone());
            row.push(String::new());
        }
        Err(e) => {
            row.push(outcome.record.name.clone());
            row.push(outcome.record.email.clone());
            row.push(String::new());
            // Qualification cells, tier totals, veteran score, final score, summary.
            row.extend(std::iter::repeat(String::new()).take(qualification_count + 6));
            row.push(format!("{}: {}", e.code(), e));
        }
    }
    row
}

/// Score cells always carry two decimal places, so `0` renders as `0.00`.
fn money(mut value: Decimal) -> String {
    value.rescale(2);
    value.to_string()
}
