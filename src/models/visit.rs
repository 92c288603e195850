//! The visit record and its mapping to the stored document shape.

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("stored document is missing field '{field}'")]
    MissingField { field: &'static str },
    #[error("malformed log timestamp '{input}': {reason}")]
    MalformedTimestamp { input: String, reason: &'static str },
}

/// One observed page visit.
///
/// All four fields are always present in a persisted record; partial records
/// are not modeled. Records are never updated in place — the store only
/// inserts and aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    #[serde(rename = "IP")]
    pub visitor_ip: String,
    #[serde(rename = "URL")]
    pub source_url: String,
    #[serde(
        rename = "timeStamp",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "timeSpent")]
    pub time_spent_ms: i64,
}

impl VisitRecord {
    /// Field names in the primary collection.
    pub const IP: &'static str = "IP";
    pub const URL: &'static str = "URL";
    pub const TIME_STAMP: &'static str = "timeStamp";
    pub const TIME_SPENT: &'static str = "timeSpent";

    pub fn new(
        visitor_ip: impl Into<String>,
        source_url: impl Into<String>,
        timestamp: DateTime<Utc>,
        time_spent_ms: i64,
    ) -> Self {
        Self {
            visitor_ip: visitor_ip.into(),
            source_url: source_url.into(),
            timestamp,
            time_spent_ms,
        }
    }

    /// Serialize into the stored document shape. Always succeeds.
    pub fn to_document(&self) -> Document {
        doc! {
            Self::IP: &self.visitor_ip,
            Self::URL: &self.source_url,
            Self::TIME_STAMP: bson::DateTime::from_chrono(self.timestamp),
            Self::TIME_SPENT: self.time_spent_ms,
        }
    }

    /// Decode a stored document, checking each expected field explicitly.
    ///
    /// Extra fields (such as `_id`) are ignored. A missing or mistyped field
    /// yields [`ModelError::MissingField`] rather than a panic.
    pub fn from_document(doc: &Document) -> Result<Self, ModelError> {
        let visitor_ip = doc
            .get_str(Self::IP)
            .map_err(|_| ModelError::MissingField { field: Self::IP })?
            .to_string();
        let source_url = doc
            .get_str(Self::URL)
            .map_err(|_| ModelError::MissingField { field: Self::URL })?
            .to_string();
        let timestamp = doc
            .get_datetime(Self::TIME_STAMP)
            .map_err(|_| ModelError::MissingField {
                field: Self::TIME_STAMP,
            })?
            .to_chrono();
        // The engine may narrow small values to int32
        let time_spent_ms = match doc.get(Self::TIME_SPENT) {
            Some(Bson::Int64(n)) => *n,
            Some(Bson::Int32(n)) => i64::from(*n),
            _ => {
                return Err(ModelError::MissingField {
                    field: Self::TIME_SPENT,
                })
            }
        };

        Ok(Self {
            visitor_ip,
            source_url,
            timestamp,
            time_spent_ms,
        })
    }
}
