//! On-disk output: split entries and run reports

pub mod link;
pub mod report;

pub use link::{materialize, resolves_to, verify_tree, LinkOutcome, VerifyReport};
pub use report::{ManifestDigests, Operation, RunReport, RunSummary, SplitCounts};
