pub mod run;
pub mod types;

pub use run::{Harness, run_extraction, run_harness};
pub use types::{HarnessConfig, HarnessError, HarnessResult, resolve_targets};
