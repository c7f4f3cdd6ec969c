//! Query execution: filter evaluation, search and result caching.

pub mod cache;
pub mod filter;
pub mod search;

pub use cache::{CacheStats, QueryFingerprint, ResultCache, ResultKey};
pub use filter::FilterEvaluator;
pub use search::{SearchHit, SearchQuery, SearchResponse, Searcher};
