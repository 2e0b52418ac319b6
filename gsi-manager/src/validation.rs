//! Checks on canonical index configurations
//!
//! Every issue is collected so that a failed declaration reports all of its
//! problems at once.

use crate::error::{GsiError, Result};
use crate::model::{IndexConfiguration, ProjectionType};
use std::collections::HashSet;

/// Collect configuration problems in a desired index list
pub fn validate_indexes(indexes: &[IndexConfiguration]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (position, index) in indexes.iter().enumerate() {
        let name = index.index_name.trim();
        if name.is_empty() {
            issues.push(missing_index_name(position));
            continue;
        }
        if !seen.insert(name) {
            issues.push(duplicate_index_name(name));
        }
        if index.partition_key.name.trim().is_empty() {
            issues.push(format!("Index {name}: partitionKey name is required"));
        }
        if let Some(sort_key) = &index.sort_key {
            if sort_key.name.trim().is_empty() {
                issues.push(format!("Index {name}: sortKey name must not be empty"));
            }
        }
        if index.projection_type == ProjectionType::Include && index.non_key_attributes.is_empty() {
            issues.push(format!(
                "Index {name}: INCLUDE projection requires at least one nonKeyAttributes entry"
            ));
        }
    }

    issues
}

/// Fail with every problem found, or succeed when there are none
pub fn ensure_valid(indexes: &[IndexConfiguration]) -> Result<()> {
    let issues = validate_indexes(indexes);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(GsiError::validation(issues))
    }
}

pub(crate) fn missing_index_name(position: usize) -> String {
    format!("Index at position {position}: indexName is required")
}

pub(crate) fn duplicate_index_name(name: &str) -> String {
    format!("Duplicate index name: {name}")
}
