// Query request sent to a datasource: one or more sub-queries (targets) over a time range.

use serde::{Deserialize, Serialize};

use super::frame::RawResult;

/// One LogQL sub-query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LokiQuery {
    pub ref_id: String,
    pub expr: String,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<u32>,
}

/// Absolute time range in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub request_id: String,
    /// Dashboard interval, substituted for `$__interval` (e.g. "1m").
    pub interval: String,
    pub interval_ms: u64,
    pub range: TimeRange,
    pub targets: Vec<LokiQuery>,
}

/// One partial delivery from a dispatch stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub data: Vec<RawResult>,
}

impl QueryResponse {
    pub fn new(data: Vec<RawResult>) -> Self {
        Self { key: None, data }
    }
}
