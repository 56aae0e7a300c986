//! Resume Preprocessor — turns raw extracted text into a `ResumeRecord`.
//!
//! Never fails: anything it cannot find is replaced by a sentinel.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::evaluation::{ResumeRecord, EMAIL_NOT_FOUND, NAME_NOT_FOUND};

static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn email_pattern() -> &'static Regex {
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("email pattern is a valid regex")
    })
}

pub fn preprocess_resume(raw_text: &str) -> ResumeRecord {
    ResumeRecord {
        cleaned_text: collapse_whitespace(raw_text),
        name: guess_name(raw_text),
        email: find_email(raw_text),
    }
}

/// Collapses every whitespace run (newlines included) to one space and trims.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First non-blank line. Usually the candidate's name on a resume, often not.
fn guess_name(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
        .unwrap_or_else(|| NAME_NOT_FOUND.to_string())
}

fn find_email(text: &str) -> String {
    email_pattern()
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| EMAIL_NOT_FOUND.to_string())
}
