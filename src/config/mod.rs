use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mongodb: MongoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string for the MongoDB deployment
    pub url: String,
    pub database: String,
    /// Primary collection holding visit records
    pub collection: String,
}

impl MongoConfig {
    const DEFAULT_URL: &'static str = "mongodb://localhost:27017";
    const DEFAULT_DATABASE: &'static str = "logsDb";
    const DEFAULT_COLLECTION: &'static str = "logs";
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| MongoConfig::DEFAULT_URL.to_string());
        let database = std::env::var("MONGODB_DATABASE")
            .unwrap_or_else(|_| MongoConfig::DEFAULT_DATABASE.to_string());
        let collection = std::env::var("MONGODB_COLLECTION")
            .unwrap_or_else(|_| MongoConfig::DEFAULT_COLLECTION.to_string());

        Ok(Config {
            mongodb: MongoConfig {
                url,
                database,
                collection,
            },
        })
    }
}
