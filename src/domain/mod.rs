pub mod encoded;
pub mod errors;
pub mod matcher;
pub mod models;
pub mod pac;
pub mod rewrite;
pub mod service;
pub mod tester;

pub use errors::*;
pub use matcher::{match_host, MatchOutcome};
pub use models::*;
pub use pac::{generate, PacDocument};
pub use service::{CycleReport, PacManager};
pub use tester::PacTester;
