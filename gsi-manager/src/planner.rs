//! Operation planning
//!
//! [`plan`] diffs observed indexes against the desired list and emits the
//! operations that converge them. It is pure: no I/O, no hidden state, the
//! same inputs always give the same plan.
//!
//! Emission order is stable: deletions of removed indexes first (in observed
//! order), then one decision per desired entry (in declared order). Key schema
//! and projection changes are never applied in place because the store only
//! supports create, delete and throughput updates per index; they become a
//! DELETE immediately followed by a CREATE.

use crate::model::{IndexConfiguration, IndexInfo, Operation, ProjectionType};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Compute the operations that take `current` to `desired`
pub fn plan(current: &[IndexInfo], desired: &[IndexConfiguration]) -> Vec<Operation> {
    let desired_names: HashSet<&str> = desired.iter().map(|d| d.index_name.as_str()).collect();
    let current_by_name: HashMap<&str, &IndexInfo> = current
        .iter()
        .map(|c| (c.index_name.as_str(), c))
        .collect();

    let mut operations: Vec<Operation> = current
        .iter()
        .filter(|c| !desired_names.contains(c.index_name.as_str()))
        .map(|c| Operation::delete(c.clone()))
        .collect();

    for config in desired {
        let Some(existing) = current_by_name.get(config.index_name.as_str()) else {
            operations.push(Operation::create(config.clone()));
            continue;
        };

        if key_schema_changed(existing, config) || projection_changed(existing, config) {
            operations.push(Operation::delete((*existing).clone()));
            operations.push(Operation::create(config.clone()));
        } else if throughput_changed(existing, config) {
            operations.push(Operation::update(config.clone(), (*existing).clone()));
        }
    }

    operations
}

/// Partition key is not the HASH element, or the sort key differs from the
/// RANGE element (added, removed or renamed).
pub fn key_schema_changed(current: &IndexInfo, desired: &IndexConfiguration) -> bool {
    if current.hash_key() != Some(desired.partition_key.name.as_str()) {
        return true;
    }
    current.range_key() != desired.sort_key.as_ref().map(|k| k.name.as_str())
}

/// Projection type differs, or for INCLUDE the non-key attribute sets differ.
/// Attribute order is irrelevant.
pub fn projection_changed(current: &IndexInfo, desired: &IndexConfiguration) -> bool {
    if current.projection.projection_type != desired.projection_type {
        return true;
    }
    if desired.projection_type != ProjectionType::Include {
        return false;
    }
    let current_attrs: BTreeSet<&str> = current
        .projection
        .non_key_attributes
        .iter()
        .map(String::as_str)
        .collect();
    let desired_attrs: BTreeSet<&str> = desired
        .non_key_attributes
        .iter()
        .map(String::as_str)
        .collect();
    current_attrs != desired_attrs
}

/// Desired throughput differs from the observed one.
///
/// Always false when the desired index has no provisioned throughput: on
/// demand capacity is not managed.
pub fn throughput_changed(current: &IndexInfo, desired: &IndexConfiguration) -> bool {
    let Some(wanted) = desired.provisioned_throughput else {
        return false;
    };
    match current.provisioned_throughput {
        None => true,
        Some(have) => {
            have.read_capacity_units != wanted.read_capacity_units
                || have.write_capacity_units != wanted.write_capacity_units
        }
    }
}
