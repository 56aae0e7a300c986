use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::qualification::{QualificationId, QualificationTier};

pub const NAME_NOT_FOUND: &str = "Name not found";
pub const EMAIL_NOT_FOUND: &str = "Email not found";

/// Canonical form of one resume's extracted text.
///
/// `name` and `email` are heuristics (or the sentinels above) and are
/// superseded by the judgment service's answer once an evaluation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeRecord {
    pub cleaned_text: String,
    pub name: String,
    pub email: String,
}

/// The service's verdict on one qualification, reconciled to its input id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualificationJudgment {
    pub id: QualificationId,
    pub tier: QualificationTier,
    pub qualification_text: String,
    pub satisfied: bool,
    pub explanation: String,
}

/// A validated evaluation. `judgments` covers every input qualification
/// exactly once, in qualification-set order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub candidate_name: String,
    pub candidate_email: String,
    pub summary: String,
    pub is_veteran: bool,
    pub judgments: Vec<QualificationJudgment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationScore {
    pub id: QualificationId,
    pub tier: QualificationTier,
    pub qualification: String,
    pub satisfied: bool,
    pub score: u32,
}

/// One resume's scorecard.
///
/// `final_score == minimum_total + preferred_total + added_value_total + veteran_bonus`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRow {
    pub candidate_name: String,
    pub candidate_email: String,
    pub is_veteran: bool,
    pub summary: String,
    pub qualification_scores: Vec<QualificationScore>,
    pub minimum_total: u64,
    pub preferred_total: u64,
    pub added_value_total: u64,
    pub veteran_bonus: Decimal,
    pub final_score: Decimal,
}

impl ScoreRow {
    pub fn tier_total(&self, tier: QualificationTier) -> u64 {
        match tier {
            QualificationTier::Minimum => self.minimum_total,
            QualificationTier::Preferred => self.preferred_total,
            QualificationTier::AddedValue => self.added_value_total,
        }
    }
}
