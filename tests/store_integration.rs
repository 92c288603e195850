//! Integration tests for the MongoDB visit store.
//!
//! These run against a live deployment named by MONGODB_TEST_URL (for
//! example `mongodb://localhost:27017`) and are skipped when it is not set.
//! Each test works in its own throwaway database so the fixed-name report
//! collections cannot race across tests.

use futures::TryStreamExt;
use visitlog::config::MongoConfig;
use visitlog::models::{parse_log_timestamp, VisitRecord};
use visitlog::storage::VisitStore;

fn visit(ip: &str, url: &str, timestamp: &str, time_spent_ms: i64) -> VisitRecord {
    VisitRecord::new(ip, url, parse_log_timestamp(timestamp).unwrap(), time_spent_ms)
}

/// Connect a store bound to a per-test database, or skip if no deployment is
/// configured.
async fn test_store(test_name: &str) -> Option<(VisitStore, MongoConfig)> {
    let Ok(url) = std::env::var("MONGODB_TEST_URL") else {
        println!("SKIPPED: MONGODB_TEST_URL not set");
        return None;
    };

    let config = MongoConfig {
        url,
        database: format!("visitlogTest_{}_{}", test_name, std::process::id()),
        collection: "logs".to_string(),
    };
    let store = VisitStore::connect(&config)
        .await
        .expect("failed to connect to test deployment");
    Some((store, config))
}

/// Drop the per-test database once a test is done with it.
async fn cleanup(config: &MongoConfig) {
    let client = mongodb::Client::with_uri_str(&config.url)
        .await
        .expect("failed to connect for cleanup");
    client
        .database(&config.database)
        .drop()
        .await
        .expect("failed to drop test database");
}

#[tokio::test]
async fn insert_then_all_visits_returns_each_record() {
    let Some((store, config)) = test_store("all_visits").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/home", "2023-05-01T10:15:30", 100),
        visit("10.0.0.2", "/home", "2023-05-01T10:16:00", 200),
        visit("10.0.0.1", "/about", "2023-05-01T10:17:00", 300),
    ];
    assert!(store.insert_one(&records[0]).await);
    assert!(store.insert_many(&records[1..]).await);

    let mut stored: Vec<VisitRecord> = store
        .all_visits()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(stored.len(), records.len());

    // Order is not guaranteed
    stored.sort_by_key(|r| r.timestamp);
    assert_eq!(stored, records);

    cleanup(&config).await;
}

#[tokio::test]
async fn ips_for_url_are_sorted_and_filtered() {
    let Some((store, config)) = test_store("ips_for_url").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.9", "/home", "2023-05-01T10:00:00", 10),
        visit("10.0.0.1", "/home", "2023-05-01T11:00:00", 10),
        visit("10.0.0.5", "/home", "2023-05-01T12:00:00", 10),
        visit("10.0.0.3", "/other", "2023-05-01T13:00:00", 10),
    ];
    assert!(store.insert_many(&records).await);

    let ips = store.ips_for_url("/home").await.unwrap();
    assert_eq!(ips, ["10.0.0.1", "10.0.0.5", "10.0.0.9"]);

    let mut sorted = ips.clone();
    sorted.sort();
    assert_eq!(ips, sorted, "IPs must be non-decreasing");

    cleanup(&config).await;
}

#[tokio::test]
async fn urls_in_range_includes_boundaries_and_keeps_duplicates() {
    let Some((store, config)) = test_store("urls_in_range").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/early", "2023-05-01T09:59:59", 10),
        visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 10),
        visit("10.0.0.2", "/home", "2023-05-01T10:30:00", 10),
        visit("10.0.0.3", "/about", "2023-05-01T11:00:00", 10),
        visit("10.0.0.4", "/late", "2023-05-01T11:00:01", 10),
    ];
    assert!(store.insert_many(&records).await);

    let from = parse_log_timestamp("2023-05-01T10:00:00").unwrap();
    let to = parse_log_timestamp("2023-05-01T11:00:00").unwrap();
    let urls = store.urls_visited_in_range(from, to).await.unwrap();

    // Boundary records are included, out-of-window ones are not, and the
    // duplicate /home visit is kept
    assert_eq!(urls, ["/about", "/home", "/home"]);

    cleanup(&config).await;
}

#[tokio::test]
async fn urls_visited_by_ip_are_sorted() {
    let Some((store, config)) = test_store("urls_by_ip").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/zebra", "2023-05-01T10:00:00", 10),
        visit("10.0.0.1", "/alpha", "2023-05-01T11:00:00", 10),
        visit("10.0.0.2", "/other", "2023-05-01T12:00:00", 10),
    ];
    assert!(store.insert_many(&records).await);

    let urls = store.urls_visited_by_ip("10.0.0.1").await.unwrap();
    assert_eq!(urls, ["/alpha", "/zebra"]);

    cleanup(&config).await;
}

#[tokio::test]
async fn visit_counts_per_url_are_exact_and_descending() {
    let Some((store, config)) = test_store("count_per_url").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 10),
        visit("10.0.0.2", "/home", "2023-05-01T11:00:00", 10),
        visit("10.0.0.3", "/home", "2023-05-01T12:00:00", 10),
        visit("10.0.0.1", "/about", "2023-05-01T13:00:00", 10),
    ];
    assert!(store.insert_many(&records).await);

    let rows = store.total_visit_count_per_url().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].url, "/home");
    assert_eq!(rows[0].value, 3);
    assert_eq!(rows[1].url, "/about");
    assert_eq!(rows[1].value, 1);

    cleanup(&config).await;
}

#[tokio::test]
async fn time_spent_per_url_sums_durations() {
    let Some((store, config)) = test_store("time_per_url").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 100),
        visit("10.0.0.2", "/home", "2023-05-01T11:00:00", 250),
        visit("10.0.0.1", "/about", "2023-05-01T12:00:00", 40),
    ];
    assert!(store.insert_many(&records).await);

    let rows = store.total_time_spent_per_url().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].url, "/home");
    assert_eq!(rows[0].value, 350);
    assert_eq!(rows[1].url, "/about");
    assert_eq!(rows[1].value, 40);

    cleanup(&config).await;
}

#[tokio::test]
async fn visit_counts_in_range_respect_inclusive_window() {
    let Some((store, config)) = test_store("count_in_range").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/home", "2023-05-01T09:00:00", 10),
        visit("10.0.0.2", "/home", "2023-05-01T10:00:00", 10),
        visit("10.0.0.3", "/home", "2023-05-01T10:30:00", 10),
        visit("10.0.0.4", "/about", "2023-05-01T10:45:00", 10),
        visit("10.0.0.5", "/about", "2023-05-01T11:00:01", 10),
    ];
    assert!(store.insert_many(&records).await);

    let from = parse_log_timestamp("2023-05-01T10:00:00").unwrap();
    let to = parse_log_timestamp("2023-05-01T11:00:00").unwrap();
    let rows = store.visit_count_per_url_in_range(from, to).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].url, "/home");
    assert_eq!(rows[0].value, 2);
    assert_eq!(rows[1].url, "/about");
    assert_eq!(rows[1].value, 1);

    cleanup(&config).await;
}

#[tokio::test]
async fn per_ip_summary_counts_and_sums_in_one_pass() {
    let Some((store, config)) = test_store("per_ip").await else {
        return;
    };

    let records = vec![
        visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 10),
        visit("10.0.0.1", "/about", "2023-05-01T11:00:00", 20),
        visit("10.0.0.2", "/home", "2023-05-01T12:00:00", 5),
    ];
    assert!(store.insert_many(&records).await);

    let rows = store.visit_count_and_time_per_ip().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ip, "10.0.0.1");
    assert_eq!(rows[0].total_count, 2);
    assert_eq!(rows[0].total_duration, 30);
    assert_eq!(rows[1].ip, "10.0.0.2");
    assert_eq!(rows[1].total_count, 1);
    assert_eq!(rows[1].total_duration, 5);

    cleanup(&config).await;
}

#[tokio::test]
async fn rerunning_a_report_overwrites_the_previous_output() {
    let Some((store, config)) = test_store("report_overwrite").await else {
        return;
    };

    assert!(
        store
            .insert_one(&visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 10))
            .await
    );
    let rows = store.total_visit_count_per_url().await.unwrap();
    assert_eq!(rows[0].value, 1);

    assert!(
        store
            .insert_one(&visit("10.0.0.2", "/home", "2023-05-01T11:00:00", 10))
            .await
    );
    let rows = store.total_visit_count_per_url().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value, 2, "report must be recomputed from scratch");

    cleanup(&config).await;
}

#[tokio::test]
async fn insert_against_unreachable_engine_returns_false() {
    // No live deployment needed: nothing listens on this port, and the short
    // timeouts keep server selection from blocking the suite.
    let config = MongoConfig {
        url: "mongodb://127.0.0.1:9/?serverSelectionTimeoutMS=1000&connectTimeoutMS=1000"
            .to_string(),
        database: "visitlogTest_unreachable".to_string(),
        collection: "logs".to_string(),
    };
    let store = VisitStore::connect(&config)
        .await
        .expect("client construction does not dial the server");

    let record = visit("10.0.0.1", "/home", "2023-05-01T10:00:00", 10);
    assert!(!store.insert_one(&record).await);
    assert!(!store.insert_many(std::slice::from_ref(&record)).await);
}
