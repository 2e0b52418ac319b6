//! Mapping between DynamoDB wire types and the crate's index model
//!
//! ```text
//! UpdateTable
//!   AttributeDefinitions       <- CreateIndexRequest.attribute_definitions
//!   GlobalSecondaryIndexUpdates[0]
//!     Create { IndexName, KeySchema, Projection, ProvisionedThroughput? }
//!     Update { IndexName, ProvisionedThroughput }
//!     Delete { IndexName }
//!
//! DescribeTable
//!   Table.TableStatus          -> TableStatus
//!   Table.GlobalSecondaryIndexes[*]
//!     IndexName, KeySchema, Projection, IndexStatus, ProvisionedThroughput
//! ```
//!
//! On-demand tables report index throughput as 0/0; that is read back as
//! "no provisioned throughput".

use crate::error::{GsiError, Result, StoreError};
use crate::model::{
    AttributeDefinition, AttributeType, IndexInfo, IndexStatus, KeyElement, KeyRole, Projection,
    ProjectionType, ProvisionedThroughput, TableStatus,
};
use crate::store::CreateIndexRequest;
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::types as ddb;

/// Capacity value reported for indexes on on-demand tables
pub const ON_DEMAND_CAPACITY: i64 = 0;

fn build_error(err: BuildError) -> StoreError {
    StoreError::with_name("BuildError", err.to_string())
}

pub fn scalar_type(attribute_type: AttributeType) -> ddb::ScalarAttributeType {
    match attribute_type {
        AttributeType::String => ddb::ScalarAttributeType::S,
        AttributeType::Number => ddb::ScalarAttributeType::N,
        AttributeType::Binary => ddb::ScalarAttributeType::B,
    }
}

pub fn projection_type(projection_type: ProjectionType) -> ddb::ProjectionType {
    match projection_type {
        ProjectionType::All => ddb::ProjectionType::All,
        ProjectionType::KeysOnly => ddb::ProjectionType::KeysOnly,
        ProjectionType::Include => ddb::ProjectionType::Include,
    }
}

pub fn attribute_definitions(
    request: &CreateIndexRequest,
) -> Result<Vec<ddb::AttributeDefinition>> {
    request
        .attribute_definitions
        .iter()
        .map(|attr: &AttributeDefinition| {
            ddb::AttributeDefinition::builder()
                .attribute_name(&attr.name)
                .attribute_type(scalar_type(attr.attribute_type))
                .build()
                .map_err(|e| GsiError::from(build_error(e)))
        })
        .collect()
}

pub fn key_schema(elements: &[KeyElement]) -> Result<Vec<ddb::KeySchemaElement>> {
    elements
        .iter()
        .map(|element| {
            let key_type = match element.role {
                KeyRole::Hash => ddb::KeyType::Hash,
                KeyRole::Range => ddb::KeyType::Range,
            };
            ddb::KeySchemaElement::builder()
                .attribute_name(&element.attribute_name)
                .key_type(key_type)
                .build()
                .map_err(|e| GsiError::from(build_error(e)))
        })
        .collect()
}

pub fn throughput(throughput: ProvisionedThroughput) -> Result<ddb::ProvisionedThroughput> {
    ddb::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(|e| GsiError::from(build_error(e)))
}

/// `Create` action for a new index
pub fn create_update(request: &CreateIndexRequest) -> Result<ddb::GlobalSecondaryIndexUpdate> {
    let mut projection = ddb::Projection::builder()
        .projection_type(projection_type(request.projection.projection_type));
    if !request.projection.non_key_attributes.is_empty() {
        projection =
            projection.set_non_key_attributes(Some(request.projection.non_key_attributes.clone()));
    }

    let action = ddb::CreateGlobalSecondaryIndexAction::builder()
        .index_name(&request.index_name)
        .set_key_schema(Some(key_schema(&request.key_schema)?))
        .projection(projection.build())
        .set_provisioned_throughput(request.provisioned_throughput.map(throughput).transpose()?)
        .build()
        .map_err(build_error)?;

    Ok(ddb::GlobalSecondaryIndexUpdate::builder().create(action).build())
}

/// `Update` action changing only provisioned throughput
pub fn throughput_update(
    index_name: &str,
    wanted: ProvisionedThroughput,
) -> Result<ddb::GlobalSecondaryIndexUpdate> {
    let action = ddb::UpdateGlobalSecondaryIndexAction::builder()
        .index_name(index_name)
        .provisioned_throughput(throughput(wanted)?)
        .build()
        .map_err(build_error)?;
    Ok(ddb::GlobalSecondaryIndexUpdate::builder().update(action).build())
}

pub fn delete_update(index_name: &str) -> Result<ddb::GlobalSecondaryIndexUpdate> {
    let action = ddb::DeleteGlobalSecondaryIndexAction::builder()
        .index_name(index_name)
        .build()
        .map_err(build_error)?;
    Ok(ddb::GlobalSecondaryIndexUpdate::builder().delete(action).build())
}

pub fn table_status(status: Option<&ddb::TableStatus>) -> TableStatus {
    status
        .map(|s| TableStatus::parse(s.as_str()))
        .unwrap_or_else(|| TableStatus::Other("UNKNOWN".to_string()))
}

/// Observed index from a DescribeTable listing entry. Entries without a name
/// are skipped.
pub fn index_info(description: &ddb::GlobalSecondaryIndexDescription) -> Option<IndexInfo> {
    let index_name = description.index_name()?.to_string();

    let key_schema = description
        .key_schema()
        .iter()
        .filter_map(|element| {
            let role = match element.key_type() {
                ddb::KeyType::Hash => KeyRole::Hash,
                ddb::KeyType::Range => KeyRole::Range,
                _ => return None,
            };
            Some(KeyElement {
                attribute_name: element.attribute_name().to_string(),
                role,
            })
        })
        .collect();

    let projection = description
        .projection()
        .map(|p| Projection {
            projection_type: p
                .projection_type()
                .and_then(|t| ProjectionType::parse(t.as_str()))
                .unwrap_or_default(),
            non_key_attributes: p.non_key_attributes().to_vec(),
        })
        .unwrap_or_default();

    let provisioned_throughput = description.provisioned_throughput().and_then(|t| {
        let read = t.read_capacity_units().unwrap_or(ON_DEMAND_CAPACITY);
        let write = t.write_capacity_units().unwrap_or(ON_DEMAND_CAPACITY);
        if read == ON_DEMAND_CAPACITY && write == ON_DEMAND_CAPACITY {
            None
        } else {
            Some(ProvisionedThroughput::new(read, write))
        }
    });

    Some(IndexInfo {
        index_name,
        key_schema,
        projection,
        status: description
            .index_status()
            .map(|s| IndexStatus::parse(s.as_str())),
        provisioned_throughput,
    })
}
