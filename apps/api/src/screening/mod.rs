// Resume screening: preprocess → request → evaluate → score → report.
// All judgment-service calls go through llm_client::JudgmentService.

pub mod evaluation;
pub mod handlers;
pub mod pipeline;
pub mod preprocess;
pub mod prompts;
pub mod report;
pub mod request_builder;
pub mod scorer;
