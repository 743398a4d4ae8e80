use crate::{domain::KeyValueStore, errors::StorageError};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{ProvideErrorMetadata, SdkError},
    types::AttributeValue,
    Client as DynamoDbClient,
};
use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use std::{fmt, time::Duration};
use tracing::{self, info};

/// Partition key attribute of the key-value table.
pub const KEY_ATTRIBUTE: &str = "key";
/// Attribute holding the JSON text of the value.
pub const VALUE_ATTRIBUTE: &str = "value";

const RETRYABLE_CODES: [&str; 4] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "InternalServerError",
];

#[derive(Debug, Clone)]
pub struct DynamoDbKeyValueStore {
    client: DynamoDbClient,
    table_name: String, // Store the table name
}

impl DynamoDbKeyValueStore {
    /// Creates a store instance configured for a specific table.
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbKeyValueStore");
        Self { client, table_name }
    }

    fn retry_policy() -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(50))
            .with_max_elapsed_time(Some(Duration::from_secs(5)))
            .build()
    }
}

/// Sorts SDK failures into ones worth retrying and ones that are final.
fn classify<E, R>(err: SdkError<E, R>, context: String) -> backoff::Error<StorageError>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => true,
        SdkError::ServiceError(service_err) => {
            matches!(service_err.err().code(), Some(code) if RETRYABLE_CODES.contains(&code))
        }
        _ => false,
    };

    let storage_err = StorageError::BackendError(anyhow::Error::new(err).context(context));
    if transient {
        tracing::warn!(error = %storage_err, "DynamoDB: transient failure, retrying");
        backoff::Error::transient(storage_err)
    } else {
        backoff::Error::permanent(storage_err)
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbKeyValueStore {
    /// Reads the item for `key` using GetItem.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let resp = retry(Self::retry_policy(), || async {
            self.client
                .get_item()
                .table_name(&self.table_name) // Use stored table name
                .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
                .send()
                .await
                .map_err(|e| {
                    classify(
                        e,
                        format!("DynamoDB (table: {}): Failed to get key '{}'", self.table_name, key),
                    )
                })
        })
        .await?;

        let Some(item) = resp.item else {
            tracing::debug!(%key, table_name = %self.table_name, "DynamoDB: key not present");
            return Ok(None); // Item not found is not an error
        };

        let raw = item
            .get(VALUE_ATTRIBUTE)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| {
                tracing::error!(%key, table_name = %self.table_name, "DynamoDB: item has no string value attribute");
                StorageError::DataCorruption(key.to_string())
            })?;

        let value = serde_json::from_str(raw)
            .map_err(|source| StorageError::Serialization { key: key.to_string(), source })?;
        Ok(Some(value))
    }

    /// Stores the JSON text for `key` using PutItem.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&value)
            .map_err(|source| StorageError::Serialization { key: key.to_string(), source })?;

        retry(Self::retry_policy(), || async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .item(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
                .item(VALUE_ATTRIBUTE, AttributeValue::S(raw.clone()))
                .send()
                .await
                .map_err(|e| {
                    classify(
                        e,
                        format!("DynamoDB (table: {}): Failed to put key '{}'", self.table_name, key),
                    )
                })
        })
        .await?;

        tracing::debug!(%key, table_name = %self.table_name, "DynamoDB: value written");
        Ok(())
    }
}
