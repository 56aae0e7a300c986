// Prompt constants for resume screening.
// Reuses the JSON-only fragment from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// Role line of the screening system prompt; `screening_system` appends the JSON-only rules.
const SCREENING_ROLE: &str = "You are an expert recruiter evaluating resumes against job \
    qualifications. Judge only from the resume text you are given.";

/// Opening paragraph of every screening request.
pub const SCREENING_PREAMBLE: &str = "You are evaluating whether a candidate meets the \
    qualifications of a job position. Read the resume, then judge every qualification \
    listed below.";

/// Shown under a tier header that has no qualifications.
pub const EMPTY_TIER_NOTE: &str = "(no qualifications in this tier)";

/// Expected response shape. Field names are part of the parsing contract.
pub const SCREENING_RESPONSE_SCHEMA: &str = r#"Your response MUST be a JSON object with this EXACT schema (no extra fields):
{
  "name": "The candidate's full name, inferred from the resume",
  "email": "The candidate's email address as written in the resume",
  "summarization": "A concise summary of the resume in 2-3 sentences.",
  "is_veteran": false,
  "qualifications": [
    {
      "id": "MIN-1",
      "qualification_type": "Minimum Qualification",
      "qualification": "Exact qualification text from the input",
      "true_or_false": true,
      "explanation": "Why the candidate meets or does not meet this qualification, based on the resume content."
    }
  ]
}"#;

/// Rules appended after the schema.
pub const SCREENING_RULES: &str = "\
RULES:
1. Return exactly one entry in \"qualifications\" for EVERY bullet listed above, and no others.
2. Copy each bullet's id (the value in square brackets) into \"id\" exactly.
3. Copy each bullet's text into \"qualification\" exactly, character for character. Do NOT rephrase, shorten or fix it.
4. Set \"qualification_type\" to the header of the section the bullet appears under.
5. \"true_or_false\" and \"is_veteran\" MUST be JSON booleans (true or false), never strings.
6. \"is_veteran\" is true only if the resume shows military service.
7. If information is missing from the resume, say so in the explanation and set \"true_or_false\" to false.
8. Maintain a formal and professional tone.";

pub fn screening_system() -> String {
    format!("{SCREENING_ROLE} {JSON_ONLY_SYSTEM}")
}
