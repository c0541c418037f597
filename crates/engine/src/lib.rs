//! Asynchronous scan orchestration.
//!
//! A scan is submitted to the [`Scanner`], which registers it in the
//! [`Registry`] (so it can be polled and stopped straight away) and then runs
//! it on its own Tokio task:
//!
//! 1. The scan is persisted through the result store in the `scanning` state.
//! 2. The [`SourceEnumerator`](tally_storage::SourceEnumerator) is drained,
//!    honouring the scan's cancellation token.
//! 3. The discovered files are stored as one batch and, unless the scan was
//!    stopped, reduced to [`ScanTotals`] by the [`summary`] aggregator.
//! 4. The scan is moved to its terminal state, both in the store and in the
//!    registry.
//!
//! Failures after submission never reach the submitter: they end the scan in
//! the `failed` state with a message that status polling reports.

pub mod error;
mod job;
mod registry;
mod runner;
pub mod summary;

pub use crate::job::{ScanId, ScanRequest, default_name};
pub use crate::registry::{Outcome, Registry, StatusReport};
pub use crate::runner::{Scanner, Submission};
pub use tally_store::{ScanJob, ScanStatus, ScanTotals};
