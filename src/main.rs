use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use tracing::warn;

use visitlog::config::Config;
use visitlog::models::{parse_log_timestamp, VisitRecord};
use visitlog::storage::VisitStore;

#[derive(Parser)]
#[command(name = "visitlog")]
#[command(about = "Page-visit log store backed by MongoDB", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a log file with one `ip,url,timestamp,time_spent` line per visit
    Ingest {
        file: PathBuf,
    },
    /// Print every stored visit
    All,
    /// List IPs that visited a URL
    Ips {
        url: String,
    },
    /// List URLs visited by an IP
    Urls {
        ip: String,
    },
    /// List URLs visited between two timestamps (inclusive)
    UrlsInRange {
        from: String,
        to: String,
    },
    /// Visit count per URL, most visited first
    CountPerUrl,
    /// Total time spent per URL, largest first
    TimePerUrl,
    /// Visit count per URL between two timestamps (inclusive)
    CountPerUrlInRange {
        from: String,
        to: String,
    },
    /// Visit count and total time spent per IP
    PerIp,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = VisitStore::connect(&config.mongodb).await?;

    match cli.command {
        Commands::Ingest { file } => {
            let records = read_log_file(&file)?;
            let count = records.len();
            if store.insert_many(&records).await {
                println!("Ingested {count} visits from {}", file.display());
            } else {
                println!("Failed to ingest {}", file.display());
            }
        }
        Commands::All => {
            let mut cursor = store.all_visits().await?;
            while let Some(visit) = cursor.try_next().await? {
                println!(
                    "{} {} {} {}ms",
                    visit.timestamp.format("%Y-%m-%dT%H:%M:%S"),
                    visit.visitor_ip,
                    visit.source_url,
                    visit.time_spent_ms
                );
            }
        }
        Commands::Ips { url } => {
            for ip in store.ips_for_url(&url).await? {
                println!("{ip}");
            }
        }
        Commands::Urls { ip } => {
            for url in store.urls_visited_by_ip(&ip).await? {
                println!("{url}");
            }
        }
        Commands::UrlsInRange { from, to } => {
            let (from, to) = parse_range(&from, &to)?;
            for url in store.urls_visited_in_range(from, to).await? {
                println!("{url}");
            }
        }
        Commands::CountPerUrl => {
            for row in store.total_visit_count_per_url().await? {
                println!("{:>8}  {}", row.value, row.url);
            }
        }
        Commands::TimePerUrl => {
            for row in store.total_time_spent_per_url().await? {
                println!("{:>8}ms  {}", row.value, row.url);
            }
        }
        Commands::CountPerUrlInRange { from, to } => {
            let (from, to) = parse_range(&from, &to)?;
            for row in store.visit_count_per_url_in_range(from, to).await? {
                println!("{:>8}  {}", row.value, row.url);
            }
        }
        Commands::PerIp => {
            for row in store.visit_count_and_time_per_ip().await? {
                println!(
                    "{:>8} visits  {:>10}ms  {}",
                    row.total_count, row.total_duration, row.ip
                );
            }
        }
    }

    store.shutdown().await;
    Ok(())
}

fn parse_range(from: &str, to: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let from = parse_log_timestamp(from).context("invalid 'from' timestamp")?;
    let to = parse_log_timestamp(to).context("invalid 'to' timestamp")?;
    Ok((from, to))
}

/// Parse a raw log file, skipping lines that do not have the expected
/// `ip,url,timestamp,time_spent` shape.
fn read_log_file(path: &PathBuf) -> Result<Vec<VisitRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read log file {}", path.display()))?;

    let mut records = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_log_line(line) {
            Ok(record) => records.push(record),
            Err(err) => warn!(line = number + 1, error = %err, "skipping malformed log line"),
        }
    }
    Ok(records)
}

fn parse_log_line(line: &str) -> Result<VisitRecord> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [ip, url, timestamp, time_spent] = fields[..] else {
        anyhow::bail!("expected 4 comma-separated fields, got {}", fields.len());
    };
    let timestamp = parse_log_timestamp(timestamp)?;
    let time_spent_ms: i64 = time_spent
        .parse()
        .with_context(|| format!("invalid time_spent '{time_spent}'"))?;
    Ok(VisitRecord::new(ip, url, timestamp, time_spent_ms))
}
