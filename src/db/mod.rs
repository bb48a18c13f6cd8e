pub mod feedback;
pub mod pool;

pub use feedback::{FeedbackStore, RelatedFilesLookup, StoreStats};
pub use pool::{create_pool, run_migrations};
