//! The aggregation-and-filtering pipeline: cluster resolution, content
//! filtering and the organization overview.

pub mod filter;
pub mod overview;
pub mod resolver;

pub use filter::{filter_rules, FilterOutcome, FilterPolicy, FilterResult};
pub use overview::{compute_overview, Overview};
pub use resolver::ClusterResolver;
