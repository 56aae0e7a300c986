//! Qualification Evaluation Request Builder.
//!
//! Output is a pure function of the resume record and the qualification set:
//! no timestamps, no map iteration, no randomness. Identical inputs give a
//! byte-identical request.

use std::fmt::Write;

use serde::Serialize;

use crate::models::evaluation::{ResumeRecord, EMAIL_NOT_FOUND};
use crate::models::qualification::{QualificationSet, QualificationTier};
use crate::screening::prompts::{
    screening_system, EMPTY_TIER_NOTE, SCREENING_PREAMBLE, SCREENING_RESPONSE_SCHEMA,
    SCREENING_RULES,
};

const SECTION_RULE: &str = "---";

/// A fully assembled request for the judgment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationRequest {
    pub system: String,
    pub prompt: String,
}

pub fn build_evaluation_request(
    record: &ResumeRecord,
    qualifications: &QualificationSet,
) -> EvaluationRequest {
    let mut prompt = String::with_capacity(record.cleaned_text.len() + 2048);

    prompt.push_str(SCREENING_PREAMBLE);
    prompt.push_str("\n\n");
    prompt.push_str(SECTION_RULE);
    prompt.push_str("\nResume:\n");
    prompt.push_str(&record.cleaned_text);
    prompt.push('\n');
    prompt.push_str(SECTION_RULE);
    prompt.push('\n');

    if record.email != EMAIL_NOT_FOUND {
        // Writing to a String cannot fail.
        let _ = writeln!(prompt, "Email detected in the resume: {}", record.email);
        prompt.push_str(SECTION_RULE);
        prompt.push('\n');
    }

    for tier in QualificationTier::ALL {
        let _ = writeln!(prompt, "{}:", tier.label());
        let mut listed = 0;
        for qualification in qualifications.tier(tier) {
            let _ = writeln!(
                prompt,
                "- [{}] {}",
                qualification.id, qualification.description
            );
            listed += 1;
        }
        if listed == 0 {
            prompt.push_str(EMPTY_TIER_NOTE);
            prompt.push('\n');
        }
        prompt.push_str(SECTION_RULE);
        prompt.push('\n');
    }

    prompt.push('\n');
    prompt.push_str(SCREENING_RESPONSE_SCHEMA);
    prompt.push_str("\n\n");
    prompt.push_str(SCREENING_RULES);
    prompt.push('\n');

    EvaluationRequest {
        system: screening_system(),
        prompt,
    }
}
