//! Clinical development pipeline: candidate state, the monthly trial loop
//! and the deterministic cross check.

pub mod candidate;
pub mod check;
pub mod trial;

pub use candidate::{CandidateState, PipelineModel};
pub use check::{CandidateCheck, cross_check};
pub use trial::{PipelineOutcome, PipelineTrial, TrialRow};
