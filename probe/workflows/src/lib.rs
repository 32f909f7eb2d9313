pub mod case;
pub mod submitter;

pub use case::{CaseConfig, CaseError, CaseReport, DeadlineProbe, run_probe};
pub use submitter::build_transactions;
