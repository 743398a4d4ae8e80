use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where the session's key-value state is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Nothing survives a restart. Useful for demos and tests.
    Memory,
    /// One JSON file per key inside a directory.
    File { data_dir: PathBuf },
    /// One item per key in a DynamoDB table.
    DynamoDb {
        table_name: String,
        aws_region: String,
        // Optional endpoint for LocalStack
        localstack_endpoint: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage: StorageBackend,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "file".to_string());
        let storage = match backend.to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "file" => StorageBackend::File {
                data_dir: PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "./data".to_string())),
            },
            "dynamodb" => {
                let table_name = lookup("KV_TABLE_NAME").unwrap_or_else(|| "memes_today_kv".to_string());
                if table_name.trim().is_empty() {
                    return Err(ConfigError::MissingVar("KV_TABLE_NAME".into()));
                }
                StorageBackend::DynamoDb {
                    table_name,
                    aws_region: lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string()),
                    localstack_endpoint: lookup("AWS_ENDPOINT_URL"),
                }
            }
            other => {
                return Err(ConfigError::InvalidVar(
                    "STORAGE_BACKEND".into(),
                    format!("unknown backend '{}', expected memory, file or dynamodb", other),
                ));
            }
        };

        Ok(Config { bind_address, storage })
    }
}
