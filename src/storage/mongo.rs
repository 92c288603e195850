//! MongoDB-backed visit store.
//!
//! Owns the client, database, and primary collection handles, and exposes the
//! fixed catalog of insert, query, and aggregation operations. Every
//! non-trivial operation (filtering, sorting, grouping) is delegated to the
//! engine; aggregations run as native pipelines that materialize into named
//! auxiliary collections via `$out`, overwriting the previous run's output.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Cursor, Database};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::MongoConfig;
use crate::models::{IpVisitSummary, ModelError, UrlAccumulator, VisitRecord};
use crate::storage::StorageResult;

/// Auxiliary collection names for the aggregation reports. Each run of a
/// report overwrites its collection; concurrent runs of the same report race
/// on that output.
const TOTAL_VISIT_COUNT_OF_URLS: &str = "totalVisitCountOfUrls";
const TOTAL_VISIT_TIME_OF_URLS: &str = "totalVisitTimeOfUrls";
const VISITS_COUNT_OF_URLS_IN_PERIOD: &str = "visitsCountOfUrlsInPeriod";
const TOTAL_VISITS_COUNT_AND_TIME_OF_IPS: &str = "totalVisitsCountAndTimeOfIps";

pub struct VisitStore {
    client: Client,
    database: Database,
    collection: Collection<Document>,
}

impl VisitStore {
    /// Connect to the configured deployment and bind the database and primary
    /// collection handles.
    pub async fn connect(config: &MongoConfig) -> StorageResult<Self> {
        let client = Client::with_uri_str(&config.url).await?;
        let database = client.database(&config.database);
        let collection = database.collection(&config.collection);
        debug!(
            database = %config.database,
            collection = %config.collection,
            "connected visit store"
        );
        Ok(Self {
            client,
            database,
            collection,
        })
    }

    /// Tear the connection down deterministically. Dropping the store also
    /// releases the connection, but this waits for in-flight cleanup.
    pub async fn shutdown(self) {
        let Self { client, .. } = self;
        client.shutdown().await;
    }

    /// Insert one record. Engine faults are logged and reported as `false`,
    /// never raised to the caller.
    pub async fn insert_one(&self, record: &VisitRecord) -> bool {
        match self.collection.insert_one(record.to_document()).await {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, "failed to insert visit record");
                false
            }
        }
    }

    /// Batch insert. Same failure contract as [`insert_one`](Self::insert_one).
    pub async fn insert_many(&self, records: &[VisitRecord]) -> bool {
        let documents: Vec<Document> = records.iter().map(VisitRecord::to_document).collect();
        match self.collection.insert_many(documents).await {
            Ok(_) => true,
            Err(err) => {
                error!(error = %err, count = records.len(), "failed to insert visit records");
                false
            }
        }
    }

    /// The full primary collection as a lazy cursor of records, in engine
    /// order.
    pub async fn all_visits(&self) -> StorageResult<Cursor<VisitRecord>> {
        let cursor = self
            .collection
            .clone_with_type::<VisitRecord>()
            .find(doc! {})
            .await?;
        Ok(cursor)
    }

    /// IPs that visited `url`, ascending, one entry per matching record.
    pub async fn ips_for_url(&self, url: &str) -> StorageResult<Vec<String>> {
        let cursor = self
            .collection
            .find(doc! { VisitRecord::URL: url })
            .projection(doc! { VisitRecord::IP: 1, "_id": 0 })
            .sort(doc! { VisitRecord::IP: 1 })
            .await?;
        self.collect_field(cursor, VisitRecord::IP).await
    }

    /// URLs visited within the inclusive window `[from, to]`, ascending.
    /// Duplicates are kept: one entry per matching record.
    pub async fn urls_visited_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<String>> {
        let cursor = self
            .collection
            .find(doc! {
                VisitRecord::TIME_STAMP: {
                    "$gte": bson::DateTime::from_chrono(from),
                    "$lte": bson::DateTime::from_chrono(to),
                }
            })
            .projection(doc! { VisitRecord::URL: 1, "_id": 0 })
            .sort(doc! { VisitRecord::URL: 1 })
            .await?;
        self.collect_field(cursor, VisitRecord::URL).await
    }

    /// URLs visited by `ip`, ascending.
    pub async fn urls_visited_by_ip(&self, ip: &str) -> StorageResult<Vec<String>> {
        let cursor = self
            .collection
            .find(doc! { VisitRecord::IP: ip })
            .projection(doc! { VisitRecord::URL: 1, "_id": 0 })
            .sort(doc! { VisitRecord::URL: 1 })
            .await?;
        self.collect_field(cursor, VisitRecord::URL).await
    }

    /// Visit count per URL, descending by count.
    pub async fn total_visit_count_per_url(&self) -> StorageResult<Vec<UrlAccumulator>> {
        let pipeline = [
            doc! { "$group": { "_id": "$URL", "value": { "$sum": 1 } } },
            doc! { "$out": TOTAL_VISIT_COUNT_OF_URLS },
        ];
        self.collection.aggregate(pipeline).await?;
        self.read_report(TOTAL_VISIT_COUNT_OF_URLS, doc! { "value": -1 })
            .await
    }

    /// Total time spent per URL, descending by total.
    pub async fn total_time_spent_per_url(&self) -> StorageResult<Vec<UrlAccumulator>> {
        let pipeline = [
            doc! { "$group": { "_id": "$URL", "value": { "$sum": "$timeSpent" } } },
            doc! { "$out": TOTAL_VISIT_TIME_OF_URLS },
        ];
        self.collection.aggregate(pipeline).await?;
        self.read_report(TOTAL_VISIT_TIME_OF_URLS, doc! { "value": -1 })
            .await
    }

    /// Visit count per URL restricted to the inclusive window `[from, to]`,
    /// descending by count.
    pub async fn visit_count_per_url_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StorageResult<Vec<UrlAccumulator>> {
        let pipeline = [
            doc! { "$match": {
                VisitRecord::TIME_STAMP: {
                    "$gte": bson::DateTime::from_chrono(from),
                    "$lte": bson::DateTime::from_chrono(to),
                }
            } },
            doc! { "$group": { "_id": "$URL", "value": { "$sum": 1 } } },
            doc! { "$out": VISITS_COUNT_OF_URLS_IN_PERIOD },
        ];
        self.collection.aggregate(pipeline).await?;
        self.read_report(VISITS_COUNT_OF_URLS_IN_PERIOD, doc! { "value": -1 })
            .await
    }

    /// Visit count and total time spent per IP in one pass, descending by
    /// count, then by total duration.
    pub async fn visit_count_and_time_per_ip(&self) -> StorageResult<Vec<IpVisitSummary>> {
        let pipeline = [
            doc! { "$group": {
                "_id": "$IP",
                "totalCount": { "$sum": 1 },
                "totalDuration": { "$sum": "$timeSpent" },
            } },
            doc! { "$out": TOTAL_VISITS_COUNT_AND_TIME_OF_IPS },
        ];
        self.collection.aggregate(pipeline).await?;
        self.read_report(
            TOTAL_VISITS_COUNT_AND_TIME_OF_IPS,
            doc! { "totalCount": -1, "totalDuration": -1 },
        )
        .await
    }

    /// Drain a projected cursor, pulling one named string field out of each
    /// document.
    async fn collect_field(
        &self,
        mut cursor: Cursor<Document>,
        field: &'static str,
    ) -> StorageResult<Vec<String>> {
        let mut values = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            let value = doc
                .get_str(field)
                .map_err(|_| ModelError::MissingField { field })?;
            values.push(value.to_string());
        }
        Ok(values)
    }

    /// Read an auxiliary report collection back in the given sort order.
    async fn read_report<T>(&self, name: &str, sort: Document) -> StorageResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        let rows = self
            .database
            .collection::<T>(name)
            .find(doc! {})
            .sort(sort)
            .await?
            .try_collect()
            .await?;
        Ok(rows)
    }
}
