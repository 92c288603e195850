//! Deserialization targets for the documents the aggregation jobs write into
//! their auxiliary collections.

use serde::{Deserialize, Serialize};

/// One row of a per-URL aggregation: `{_id: <url>, value: <n>}`.
///
/// `value` is a visit count or a summed duration depending on which report
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlAccumulator {
    #[serde(rename = "_id")]
    pub url: String,
    pub value: i64,
}

/// One row of the per-IP aggregation: `{_id: <ip>, totalCount, totalDuration}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpVisitSummary {
    #[serde(rename = "_id")]
    pub ip: String,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
    #[serde(rename = "totalDuration")]
    pub total_duration: i64,
}
