//! Store access
//!
//! [`IndexStore`] is the raw seam to the storage engine: one describe call and
//! three index mutations. [`StoreAdapter`] layers retries, status probes and
//! blocking waiters on top of any implementation.
//!
//! - [`dynamodb`]: Amazon DynamoDB (`dynamodb` feature)
//! - [`memory`]: in-memory table that simulates asynchronous index transitions

pub mod adapter;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;
#[cfg(feature = "dynamodb")]
pub mod schema;

pub use adapter::StoreAdapter;

use crate::error::Result;
use crate::model::{
    AttributeDefinition, IndexConfiguration, IndexInfo, KeyElement, Projection, ProjectionType,
    ProvisionedThroughput, TableStatus,
};
use async_trait::async_trait;
use std::fmt::Debug;

/// Snapshot of one table from a single describe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub status: TableStatus,
    /// Global secondary indexes, empty when the table has none
    pub indexes: Vec<IndexInfo>,
}

/// Shape of a single index-creation mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexRequest {
    pub index_name: String,
    /// Key attributes, deduplicated by name
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// HASH first, then RANGE
    pub key_schema: Vec<KeyElement>,
    /// Carries non-key attributes only for INCLUDE
    pub projection: Projection,
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

impl CreateIndexRequest {
    pub fn from_configuration(config: &IndexConfiguration) -> Self {
        let mut attribute_definitions = vec![config.partition_key.clone()];
        let mut key_schema = vec![KeyElement::hash(&config.partition_key.name)];

        if let Some(sort_key) = &config.sort_key {
            if sort_key.name != config.partition_key.name {
                attribute_definitions.push(sort_key.clone());
            }
            key_schema.push(KeyElement::range(&sort_key.name));
        }

        let non_key_attributes = match config.projection_type {
            ProjectionType::Include => config.non_key_attributes.clone(),
            ProjectionType::All | ProjectionType::KeysOnly => Vec::new(),
        };

        Self {
            index_name: config.index_name.clone(),
            attribute_definitions,
            key_schema,
            projection: Projection {
                projection_type: config.projection_type,
                non_key_attributes,
            },
            provisioned_throughput: config.provisioned_throughput,
        }
    }
}

/// Raw storage-engine operations for one table's indexes
///
/// Implementations issue exactly one store call per method and do not retry;
/// [`StoreAdapter`] owns retry policy.
#[async_trait]
pub trait IndexStore: Debug + Send + Sync {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription>;

    async fn create_index(&self, table_name: &str, request: &CreateIndexRequest) -> Result<()>;

    async fn update_index_throughput(
        &self,
        table_name: &str,
        index_name: &str,
        throughput: ProvisionedThroughput,
    ) -> Result<()>;

    async fn delete_index(&self, table_name: &str, index_name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeyRole;

    #[test]
    fn test_create_request_orders_and_dedupes_keys() {
        let config = IndexConfiguration::new("GSI1", AttributeDefinition::string("PK"))
            .with_sort_key(AttributeDefinition::string("PK"));
        let request = CreateIndexRequest::from_configuration(&config);

        assert_eq!(request.attribute_definitions.len(), 1);
        assert_eq!(request.key_schema[0].role, KeyRole::Hash);
        assert_eq!(request.key_schema[1].role, KeyRole::Range);
    }

    #[test]
    fn test_create_request_projection_attributes_only_for_include() {
        let config = IndexConfiguration::new("GSI1", AttributeDefinition::string("PK"))
            .with_sort_key(AttributeDefinition::number("SK"))
            .with_projection(ProjectionType::KeysOnly, vec!["ignored".to_string()]);
        let request = CreateIndexRequest::from_configuration(&config);
        assert_eq!(request.attribute_definitions.len(), 2);
        assert!(request.projection.non_key_attributes.is_empty());
        assert!(request.provisioned_throughput.is_none());

        let config = config
            .with_projection(ProjectionType::Include, vec!["total".to_string()])
            .with_throughput(3, 4);
        let request = CreateIndexRequest::from_configuration(&config);
        assert_eq!(request.projection.non_key_attributes, vec!["total"]);
        assert_eq!(
            request.provisioned_throughput,
            Some(ProvisionedThroughput::new(3, 4))
        );
    }
}
