pub mod evaluation;
pub mod qualification;
