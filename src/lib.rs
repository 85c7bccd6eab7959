// Trust Duplicates - Core Library
// Flags likely double-submitted transactions in a batch; exposed for the CLI, API server, and tests

pub mod deduplication;
pub mod error;
pub mod loader;
pub mod transaction;

// Re-export commonly used types
pub use deduplication::{
    assemble_clusters, build_clusters, business_key, detect_duplicates, group_by_key, resolve_times,
    sort_by_time, suppress_duplicates, AmountKey, BusinessKey, DetectionReport, DetectionSummary,
    DuplicateCluster, DuplicateDetector, TimedTransaction, TransactionGroup, DUPLICATE_WINDOW_MS,
};
pub use error::DetectionError;
pub use loader::{load_csv, load_json, load_transactions, TransactionFormat};
pub use transaction::{parse_time, Transaction};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
