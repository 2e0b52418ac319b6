//! Declared resource properties
//!
//! The lifecycle framework hands over a property bag whose field names may be
//! lower-camel (`tableName`) or capitalised (`TableName`), with numbers that
//! are often stringified. This module is the only place that sees those raw
//! shapes: [`ResourceProperties::normalize`] turns them into a canonical
//! [`Declaration`] or fails with every problem found.

use crate::config::{ErrorHandlingConfig, ErrorHandlingOverrides, Numeric};
use crate::error::{GsiError, Result};
use crate::model::{
    AttributeDefinition, AttributeType, IndexConfiguration, ProjectionType, ProvisionedThroughput,
};
use crate::validation;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "tableName", alias = "TableName", default)]
    pub table_name: Option<String>,
    #[serde(
        rename = "globalSecondaryIndexes",
        alias = "GlobalSecondaryIndexes",
        default
    )]
    pub global_secondary_indexes: Vec<RawIndexConfiguration>,
    #[serde(rename = "errorHandling", alias = "ErrorHandling", default)]
    pub error_handling: Option<ErrorHandlingOverrides>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawIndexConfiguration {
    #[serde(rename = "indexName", alias = "IndexName", default)]
    pub index_name: Option<String>,
    #[serde(rename = "partitionKey", alias = "PartitionKey", default)]
    pub partition_key: Option<RawAttribute>,
    #[serde(rename = "sortKey", alias = "SortKey", default)]
    pub sort_key: Option<RawAttribute>,
    #[serde(rename = "projectionType", alias = "ProjectionType", default)]
    pub projection_type: Option<String>,
    #[serde(rename = "nonKeyAttributes", alias = "NonKeyAttributes", default)]
    pub non_key_attributes: Option<Vec<String>>,
    #[serde(
        rename = "provisionedThroughput",
        alias = "ProvisionedThroughput",
        default
    )]
    pub provisioned_throughput: Option<RawThroughput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttribute {
    #[serde(
        rename = "name",
        alias = "Name",
        alias = "attributeName",
        alias = "AttributeName",
        default
    )]
    pub name: Option<String>,
    #[serde(
        rename = "type",
        alias = "Type",
        alias = "attributeType",
        alias = "AttributeType",
        default
    )]
    pub attribute_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawThroughput {
    #[serde(
        rename = "readCapacityUnits",
        alias = "ReadCapacityUnits",
        alias = "readUnits",
        alias = "ReadUnits",
        default
    )]
    pub read_capacity_units: Option<Numeric>,
    #[serde(
        rename = "writeCapacityUnits",
        alias = "WriteCapacityUnits",
        alias = "writeUnits",
        alias = "WriteUnits",
        default
    )]
    pub write_capacity_units: Option<Numeric>,
}

/// Canonical declaration for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub table_name: String,
    pub indexes: Vec<IndexConfiguration>,
    pub error_handling: ErrorHandlingConfig,
}

impl ResourceProperties {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Normalize into a canonical declaration, reporting every problem found.
    pub fn normalize(&self) -> Result<Declaration> {
        let mut issues = Vec::new();

        let table_name = match self.table_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                issues.push("tableName is required".to_string());
                String::new()
            }
        };

        let mut seen = HashSet::new();
        let mut indexes = Vec::with_capacity(self.global_secondary_indexes.len());
        for (position, raw) in self.global_secondary_indexes.iter().enumerate() {
            if let Some(index) = normalize_index(position, raw, &mut seen, &mut issues) {
                indexes.push(index);
            }
        }

        let error_handling = self
            .error_handling
            .as_ref()
            .map(|overrides| overrides.merge(&mut issues))
            .unwrap_or_default();

        if !issues.is_empty() {
            return Err(GsiError::validation(issues));
        }

        Ok(Declaration {
            table_name,
            indexes,
            error_handling,
        })
    }

    /// Index names declared here, read leniently.
    ///
    /// Used for prior declarations, which only contribute names to the
    /// managed set and must not block an update when they are malformed.
    pub fn declared_index_names(&self) -> Vec<String> {
        self.global_secondary_indexes
            .iter()
            .filter_map(|raw| raw.index_name.as_deref().map(str::trim))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn normalize_index(
    position: usize,
    raw: &RawIndexConfiguration,
    seen: &mut HashSet<String>,
    issues: &mut Vec<String>,
) -> Option<IndexConfiguration> {
    let name = match raw.index_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            issues.push(validation::missing_index_name(position));
            return None;
        }
    };
    if !seen.insert(name.clone()) {
        issues.push(validation::duplicate_index_name(&name));
    }

    let partition_key = match &raw.partition_key {
        Some(attr) => normalize_attribute(&name, "partitionKey", attr, issues),
        None => {
            issues.push(format!("Index {name}: partitionKey is required"));
            None
        }
    };

    let sort_key = raw
        .sort_key
        .as_ref()
        .map(|attr| normalize_attribute(&name, "sortKey", attr, issues));

    let projection_type = match raw.projection_type.as_deref() {
        None => Some(ProjectionType::All),
        Some(value) => {
            let parsed = ProjectionType::parse(value);
            if parsed.is_none() {
                issues.push(format!(
                    "Index {name}: invalid projectionType '{value}' \
                     (expected ALL, KEYS_ONLY or INCLUDE)"
                ));
            }
            parsed
        }
    };

    let provisioned_throughput = raw
        .provisioned_throughput
        .as_ref()
        .map(|t| normalize_throughput(&name, t, issues));

    let partition_key = partition_key?;
    let projection_type = projection_type?;
    let sort_key = match sort_key {
        Some(Some(key)) => Some(key),
        Some(None) => return None,
        None => None,
    };
    let provisioned_throughput = match provisioned_throughput {
        Some(Some(t)) => Some(t),
        Some(None) => return None,
        None => None,
    };

    Some(IndexConfiguration {
        index_name: name,
        partition_key,
        sort_key,
        projection_type,
        non_key_attributes: raw.non_key_attributes.clone().unwrap_or_default(),
        provisioned_throughput,
    })
}

fn normalize_attribute(
    index_name: &str,
    field: &str,
    raw: &RawAttribute,
    issues: &mut Vec<String>,
) -> Option<AttributeDefinition> {
    let name = match raw.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(name.to_string()),
        _ => {
            issues.push(format!("Index {index_name}: {field} name is required"));
            None
        }
    };
    let attribute_type = match raw.attribute_type.as_deref() {
        Some(value) => {
            let parsed = AttributeType::parse(value);
            if parsed.is_none() {
                issues.push(format!(
                    "Index {index_name}: invalid {field} type '{value}' (expected S, N or B)"
                ));
            }
            parsed
        }
        None => {
            issues.push(format!("Index {index_name}: {field} type is required"));
            None
        }
    };

    Some(AttributeDefinition::new(name?, attribute_type?))
}

fn normalize_throughput(
    index_name: &str,
    raw: &RawThroughput,
    issues: &mut Vec<String>,
) -> Option<ProvisionedThroughput> {
    let read = capacity_units(index_name, "readCapacityUnits", &raw.read_capacity_units, issues);
    let write = capacity_units(
        index_name,
        "writeCapacityUnits",
        &raw.write_capacity_units,
        issues,
    );
    Some(ProvisionedThroughput::new(read?, write?))
}

fn capacity_units(
    index_name: &str,
    field: &str,
    value: &Option<Numeric>,
    issues: &mut Vec<String>,
) -> Option<i64> {
    match value.as_ref().and_then(Numeric::as_i64) {
        Some(n) if n > 0 => Some(n),
        _ => {
            issues.push(format!(
                "Index {index_name}: provisionedThroughput.{field} must be a positive integer"
            ));
            None
        }
    }
}
