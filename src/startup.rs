use crate::{
    aws_clients::{create_dynamodb_client, create_sdk_config},
    config::StorageBackend,
    domain::KeyValueStore,
    errors::AppError,
    repositories::{DynamoDbKeyValueStore, KEY_ATTRIBUTE},
    storage::{InMemoryStore, JsonFileStore},
};
use aws_sdk_dynamodb::{
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
    Client as DynamoDbClient,
};
use std::sync::Arc;
use tracing;

/// Creates the key-value table if it doesn't exist.
async fn create_kv_table_if_not_exists(client: &DynamoDbClient, table_name: &str) -> Result<(), AppError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(KEY_ATTRIBUTE)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(|e| AppError::InitError(format!("Failed to build attribute definition: {}", e)))?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(KEY_ATTRIBUTE)
                .key_type(KeyType::Hash)
                .build()
                .map_err(|e| AppError::InitError(format!("Failed to build key schema: {}", e)))?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;
    match result {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    Ok(())
                } else {
                    let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                    tracing::error!("{}: {:?}", context, service_err);
                    Err(AppError::InitError(format!("{}: {}", context, e)))
                }
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(AppError::InitError(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Builds the persistence adapter selected by configuration, creating
/// whatever backing resource it needs.
pub async fn init_store(backend: &StorageBackend) -> Result<Arc<dyn KeyValueStore>, AppError> {
    tracing::info!("Startup: Initializing persistence backend...");
    let store: Arc<dyn KeyValueStore> = match backend {
        StorageBackend::Memory => {
            tracing::warn!("Startup: Using in-memory storage, state will not survive a restart.");
            Arc::new(InMemoryStore::new())
        }
        StorageBackend::File { data_dir } => {
            let store = JsonFileStore::open(data_dir.clone())
                .await
                .map_err(|e| AppError::InitError(format!("Failed to open data directory: {}", e)))?;
            tracing::info!(data_dir = %store.data_dir().display(), "Startup: Using JSON file storage.");
            Arc::new(store)
        }
        StorageBackend::DynamoDb { table_name, aws_region, localstack_endpoint } => {
            let sdk_config = create_sdk_config(aws_region, localstack_endpoint.as_deref()).await;
            let client = create_dynamodb_client(&sdk_config);
            create_kv_table_if_not_exists(&client, table_name).await?;
            Arc::new(DynamoDbKeyValueStore::new(client, table_name.clone()))
        }
    };
    tracing::info!("Startup: Persistence backend ready.");
    Ok(store)
}
