//! Domain types and models

pub mod query;
pub mod results;
pub mod stats;

// Re-export the working set for convenience
pub use query::{
    AdvancedSearch, FilterAction, FilterLogic, FilterNode, QueryDescription, SortDirection,
};
pub use results::{ChangeKind, QueryResult};
pub use stats::CacheStatistics;
