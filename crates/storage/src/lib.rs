pub mod backend;
pub mod error;
mod prefix;
mod record;
mod target;

pub use crate::backend::{CHECK_INTERVAL, SourceEnumerator, connect};
pub use crate::prefix::normalize_prefix;
pub use crate::record::FileRecord;
pub use crate::target::{BackendKind, ObjectStoreTarget, Target};
pub use tokio_util::sync::CancellationToken;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn SourceEnumerator + Send + Sync>;
