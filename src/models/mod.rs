//! Wire and domain types shared by the clients, the pipeline and the API.

pub mod cluster;
pub mod content;
pub mod group;
pub mod report;

pub use cluster::{ClusterInfo, ClusterSet};
pub use content::{RuleContent, RuleWithContent};
pub use group::RuleGroup;
pub use report::{ClusterReports, ReportMeta, ReportMetainfo, ReportResponse, RuleOnReport};
