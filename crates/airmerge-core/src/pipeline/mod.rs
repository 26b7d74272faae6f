//! Merge pipeline.
//!
//! ## Stages
//!
//! 1. [`merge`] -- fold tokenized snapshots into the device indexes
//! 2. [`history`] -- persisted peaks and the display throttle
//! 3. [`report`] -- filtering, ordering and rendering
//! 4. [`orchestrator`] -- one full invocation

pub mod history;
pub mod merge;
pub mod orchestrator;
pub mod report;

pub use history::{ThrottleDecision, ThrottleOutcome, ThrottlePolicy, PRESENCE_WINDOW_SECS};
pub use merge::{MergeEngine, MergeStats, SnapshotRole};
pub use orchestrator::{load_directory, run, MergeRun, RunSummary};
pub use report::{Novelty, Report, ReportFilter, SortKey};
