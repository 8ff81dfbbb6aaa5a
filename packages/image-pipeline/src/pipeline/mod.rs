//! Result-set processing: canonical keys, dedupe, filtering, batch merge.

pub mod batch;
pub mod canonical;
pub mod dedupe;
pub mod filter;

pub use batch::{run_batch, BatchOutcome, BatchTracker};
pub use canonical::canonicalize;
pub use dedupe::{dedupe_records, dedupe_urls, Deduplicated};
pub use filter::{filter_images, FilterCriteria};
