//! Scorer — converts a validated evaluation into a `ScoreRow`.
//!
//! Algorithm:
//! 1. score = tier points if satisfied, else 0 (no partial credit)
//! 2. tier total = Σ scores in that tier (0 for an empty tier)
//! 3. veteran bonus = round(Σ tier totals × 0.05, 2), half away from zero, else 0
//! 4. final score = Σ tier totals + veteran bonus
//!
//! Judgments are keyed by qualification id, never by text, so duplicate
//! descriptions are scored independently.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::evaluation::{
    EvaluationResult, QualificationJudgment, QualificationScore, ScoreRow,
};
use crate::models::qualification::{
    QualificationId, QualificationSet, QualificationTier, ScoreConfig,
};

/// Raised when the judgments handed to the scorer do not cover the
/// qualification set exactly. Never zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScorerReconciliationError {
    #[error("no judgment for qualification {0}")]
    Missing(QualificationId),

    #[error("more than one judgment for qualification {0}")]
    Duplicate(QualificationId),

    #[error("judgment for unknown qualification {0}")]
    Unexpected(QualificationId),

    #[error("judgment for {id} is tagged {found}, expected {expected}")]
    TierMismatch {
        id: QualificationId,
        expected: QualificationTier,
        found: QualificationTier,
    },
}

/// 5% of the qualification total, exact to the cent.
pub fn compute_veteran_bonus(qualification_total: u64) -> Decimal {
    (Decimal::from(qualification_total) * Decimal::new(5, 2))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn score_evaluation(
    evaluation: &EvaluationResult,
    qualifications: &QualificationSet,
    config: &ScoreConfig,
) -> Result<ScoreRow, ScorerReconciliationError> {
    let mut by_id: HashMap<&QualificationId, &QualificationJudgment> = HashMap::new();
    for judgment in &evaluation.judgments {
        if qualifications.get(&judgment.id).is_none() {
            return Err(ScorerReconciliationError::Unexpected(judgment.id.clone()));
        }
        if by_id.insert(&judgment.id, judgment).is_some() {
            return Err(ScorerReconciliationError::Duplicate(judgment.id.clone()));
        }
    }

    let mut qualification_scores = Vec::with_capacity(qualifications.len());
    let mut totals: HashMap<QualificationTier, u64> = HashMap::new();

    for qualification in qualifications.iter() {
        let judgment = by_id
            .get(&qualification.id)
            .ok_or_else(|| ScorerReconciliationError::Missing(qualification.id.clone()))?;
        if judgment.tier != qualification.tier {
            return Err(ScorerReconciliationError::TierMismatch {
                id: qualification.id.clone(),
                expected: qualification.tier,
                found: judgment.tier,
            });
        }

        let score = if judgment.satisfied {
            config.points_for(qualification.tier)
        } else {
            0
        };
        *totals.entry(qualification.tier).or_default() += u64::from(score);

        qualification_scores.push(QualificationScore {
            id: qualification.id.clone(),
            tier: qualification.tier,
            qualification: qualification.description.clone(),
            satisfied: judgment.satisfied,
            score,
        });
    }

    let total_for = |tier: QualificationTier| totals.get(&tier).copied().unwrap_or(0);
    let minimum_total = total_for(QualificationTier::Minimum);
    let preferred_total = total_for(QualificationTier::Preferred);
    let added_value_total = total_for(QualificationTier::AddedValue);
    let qualification_total = minimum_total + preferred_total + added_value_total;

    let veteran_bonus = if evaluation.is_veteran {
        compute_veteran_bonus(qualification_total)
    } else {
        Decimal::ZERO
    };

    Ok(ScoreRow {
        candidate_name: evaluation.candidate_name.clone(),
        candidate_email: evaluation.candidate_email.clone(),
        is_veteran: evaluation.is_veteran,
        summary: evaluation.summary.clone(),
        qualification_scores,
        minimum_total,
        preferred_total,
        added_value_total,
        veteran_bonus,
        final_score: Decimal::from(qualification_total) + veteran_bonus,
    })
}
