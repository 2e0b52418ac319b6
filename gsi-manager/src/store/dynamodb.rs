//! DynamoDB index store
//!
//! Provides `DynamoDbIndexStore`, which implements [`IndexStore`] with one
//! `DescribeTable` or `UpdateTable` call per method. Retries are left to the
//! [`StoreAdapter`](super::StoreAdapter).

use super::schema;
use super::{CreateIndexRequest, IndexStore, TableDescription};
use crate::error::{GsiError, Result, StoreError};
use crate::model::ProvisionedThroughput;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::timeout::TimeoutConfig;
use std::time::Duration;

/// DynamoDB index store configuration
#[derive(Debug, Clone, Default)]
pub struct DynamoDbConfig {
    /// AWS region (optional, uses SDK default if not specified)
    pub region: Option<String>,
    /// Optional endpoint override (e.g. LocalStack)
    pub endpoint: Option<String>,
    /// Timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

#[derive(Clone)]
pub struct DynamoDbIndexStore {
    client: Client,
}

impl std::fmt::Debug for DynamoDbIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbIndexStore")
            .field("region", &self.client.config().region())
            .finish()
    }
}

impl DynamoDbIndexStore {
    /// Create a new DynamoDB index store
    ///
    /// Configuration:
    /// - `region`: Override SDK region (uses SDK default if not specified)
    /// - `timeout_ms`: Operation timeout in milliseconds
    pub fn new(sdk_config: &aws_config::SdkConfig, config: DynamoDbConfig) -> Self {
        // Inherit HTTP client, credentials and sleep impl from the shared config
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Create from a pre-built client (for testing)
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn update_table(
        &self,
        table_name: &str,
        update: aws_sdk_dynamodb::types::GlobalSecondaryIndexUpdate,
        attribute_definitions: Option<Vec<aws_sdk_dynamodb::types::AttributeDefinition>>,
    ) -> Result<()> {
        self.client
            .update_table()
            .table_name(table_name)
            .set_attribute_definitions(attribute_definitions)
            .global_secondary_index_updates(update)
            .send()
            .await
            .map_err(|e| sdk_error("UpdateTable", e))?;
        Ok(())
    }
}

/// Convert an SDK failure into a [`StoreError`], keeping the service error
/// code for retry classification
fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> GsiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = format!("DynamoDB {operation} failed: {}", DisplayErrorContext(&err));
    let store_error = match err.code() {
        Some(code) => StoreError::with_code(code, message),
        None => {
            let name = match &err {
                SdkError::TimeoutError(_) => "TimeoutError",
                SdkError::DispatchFailure(_) => "DispatchFailure",
                SdkError::ResponseError(_) => "ResponseError",
                SdkError::ConstructionFailure(_) => "ConstructionFailure",
                SdkError::ServiceError(_) => "ServiceError",
                _ => "SdkError",
            };
            StoreError::with_name(name, message)
        }
    };
    GsiError::store(store_error)
}

#[async_trait]
impl IndexStore for DynamoDbIndexStore {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let response = self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeTable", e))?;

        let Some(table) = response.table() else {
            return Err(GsiError::store(StoreError::with_code(
                "ResourceNotFoundException",
                format!("DescribeTable returned no table for {table_name}"),
            )));
        };

        Ok(TableDescription {
            status: schema::table_status(table.table_status()),
            indexes: table
                .global_secondary_indexes()
                .iter()
                .filter_map(schema::index_info)
                .collect(),
        })
    }

    async fn create_index(&self, table_name: &str, request: &CreateIndexRequest) -> Result<()> {
        let update = schema::create_update(request)?;
        let definitions = schema::attribute_definitions(request)?;
        self.update_table(table_name, update, Some(definitions)).await
    }

    async fn update_index_throughput(
        &self,
        table_name: &str,
        index_name: &str,
        throughput: ProvisionedThroughput,
    ) -> Result<()> {
        let update = schema::throughput_update(index_name, throughput)?;
        self.update_table(table_name, update, None).await
    }

    async fn delete_index(&self, table_name: &str, index_name: &str) -> Result<()> {
        let update = schema::delete_update(index_name)?;
        self.update_table(table_name, update, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};

    fn offline_store(endpoint: &str) -> DynamoDbIndexStore {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .endpoint_url(endpoint)
            .build();
        DynamoDbIndexStore::from_client(Client::from_conf(config))
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_maps_to_named_store_error() {
        // Nothing listens on port 9; the request fails before reaching a service
        let store = offline_store("http://127.0.0.1:9");
        let err = store.describe_table("Orders").await.unwrap_err();

        match err {
            GsiError::Store(store_error) => {
                assert!(store_error.code.is_none());
                assert!(store_error.name.is_some());
                assert!(store_error.message.contains("DescribeTable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
