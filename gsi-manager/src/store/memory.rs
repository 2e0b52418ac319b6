//! In-memory index store for testing
//!
//! Simulates the asynchronous index lifecycle of the real store: a mutation
//! puts the index into CREATING, UPDATING or DELETING and it settles later,
//! according to the store's [`SettleMode`]. Like the real store, a mutation is
//! rejected with `ResourceInUseException` while the table is not ACTIVE or
//! another index on it is still in flight.

use super::{CreateIndexRequest, IndexStore, TableDescription};
use crate::error::{GsiError, Result, StoreError};
use crate::model::{IndexInfo, IndexStatus, OperationKind, ProvisionedThroughput, TableStatus};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

/// When an in-flight index reaches its terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettleMode {
    /// The mutation completes before the call returns
    #[default]
    Immediate,
    /// The index reports in flight for this many describe calls, then settles
    AfterReads(u32),
    /// Only [`MemoryIndexStore::settle_all`] completes in-flight indexes
    Manual,
}

/// A mutation the store accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub table_name: String,
    pub kind: OperationKind,
    pub index_name: String,
}

/// Serialized store contents, used to seed and persist fixture files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub tables: Vec<FixtureTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTable {
    pub table_name: String,
    #[serde(default = "active_table")]
    pub status: TableStatus,
    #[serde(default)]
    pub indexes: Vec<IndexInfo>,
}

fn active_table() -> TableStatus {
    TableStatus::Active
}

#[derive(Debug, Clone)]
struct StoredIndex {
    info: IndexInfo,
    /// Describe calls left before an in-flight index settles; `None` waits
    /// for a manual settle
    reads_until_settled: Option<u32>,
}

#[derive(Debug, Clone)]
struct StoredTable {
    status: TableStatus,
    /// Insertion ordered, like the real store's listing
    indexes: Vec<StoredIndex>,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, StoredTable>,
    mutations: Vec<MutationRecord>,
    rejected: usize,
    describe_calls: usize,
    injected: VecDeque<StoreError>,
}

/// In-memory [`IndexStore`]
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct MemoryIndexStore {
    state: Arc<RwLock<State>>,
    settle_mode: SettleMode,
}

impl Debug for MemoryIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryIndexStore")
            .field("table_count", &state.tables.len())
            .field("mutation_count", &state.mutations.len())
            .field("settle_mode", &self.settle_mode)
            .finish()
    }
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settle_mode(settle_mode: SettleMode) -> Self {
        Self {
            state: Arc::default(),
            settle_mode,
        }
    }

    /// Seed a store from fixture contents
    pub fn from_fixture(fixture: Fixture, settle_mode: SettleMode) -> Self {
        let store = Self::with_settle_mode(settle_mode);
        {
            let mut state = store.state.write();
            for table in fixture.tables {
                let indexes = table
                    .indexes
                    .into_iter()
                    .map(|info| StoredIndex {
                        reads_until_settled: store.initial_reads(&info),
                        info,
                    })
                    .collect();
                state.tables.insert(
                    table.table_name,
                    StoredTable {
                        status: table.status,
                        indexes,
                    },
                );
            }
        }
        store
    }

    /// Current contents in fixture form
    pub fn to_fixture(&self) -> Fixture {
        let state = self.state.read();
        Fixture {
            tables: state
                .tables
                .iter()
                .map(|(name, table)| FixtureTable {
                    table_name: name.clone(),
                    status: table.status.clone(),
                    indexes: table.indexes.iter().map(|i| i.info.clone()).collect(),
                })
                .collect(),
        }
    }

    /// Add an ACTIVE table with no indexes
    pub fn create_table(&self, table_name: &str) {
        self.state.write().tables.insert(
            table_name.to_string(),
            StoredTable {
                status: TableStatus::Active,
                indexes: Vec::new(),
            },
        );
    }

    /// Insert an index directly, bypassing mutation checks
    pub fn put_index(&self, table_name: &str, info: IndexInfo) {
        let reads_until_settled = self.initial_reads(&info);
        let mut state = self.state.write();
        if let Some(table) = state.tables.get_mut(table_name) {
            table.indexes.retain(|i| i.info.index_name != info.index_name);
            table.indexes.push(StoredIndex {
                info,
                reads_until_settled,
            });
        }
    }

    pub fn set_table_status(&self, table_name: &str, status: TableStatus) {
        if let Some(table) = self.state.write().tables.get_mut(table_name) {
            table.status = status;
        }
    }

    /// Fail the next `times` store calls with `error`
    pub fn fail_next(&self, error: StoreError, times: usize) {
        let mut state = self.state.write();
        state
            .injected
            .extend(std::iter::repeat(error).take(times));
    }

    /// Complete every in-flight index on every table
    pub fn settle_all(&self) {
        let mut state = self.state.write();
        for table in state.tables.values_mut() {
            let names: Vec<String> = table
                .indexes
                .iter()
                .filter(|i| i.info.is_in_flight())
                .map(|i| i.info.index_name.clone())
                .collect();
            for name in names {
                settle(table, &name);
            }
        }
    }

    /// Accepted mutations, oldest first
    pub fn mutations(&self) -> Vec<MutationRecord> {
        self.state.read().mutations.clone()
    }

    /// Mutations refused because the table or another index was busy
    pub fn rejected_mutations(&self) -> usize {
        self.state.read().rejected
    }

    pub fn describe_calls(&self) -> usize {
        self.state.read().describe_calls
    }

    /// Index listing without advancing any settle counters
    pub fn indexes(&self, table_name: &str) -> Vec<IndexInfo> {
        self.state
            .read()
            .tables
            .get(table_name)
            .map(|t| t.indexes.iter().map(|i| i.info.clone()).collect())
            .unwrap_or_default()
    }

    fn initial_reads(&self, info: &IndexInfo) -> Option<u32> {
        if !info.is_in_flight() {
            return Some(0);
        }
        match self.settle_mode {
            SettleMode::Immediate => Some(0),
            SettleMode::AfterReads(n) => Some(n),
            SettleMode::Manual => None,
        }
    }

    /// Run a mutation against one table under the store's admission rules
    fn mutate<F>(
        &self,
        table_name: &str,
        kind: OperationKind,
        index_name: &str,
        apply: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut StoredTable) -> std::result::Result<IndexInfo, StoreError>,
    {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if let Some(err) = state.injected.pop_front() {
            return Err(err.into());
        }

        let Some(table) = state.tables.get_mut(table_name) else {
            return Err(not_found(table_name).into());
        };

        if !table.status.is_stable() {
            let message = format!(
                "Table {table_name} is {} and cannot be modified",
                table.status
            );
            state.rejected += 1;
            return Err(in_use(message).into());
        }
        if let Some(busy) = table.indexes.iter().find(|i| i.info.is_in_flight()) {
            let message = format!(
                "Index {} on table {table_name} is {}",
                busy.info.index_name,
                busy.info
                    .status
                    .as_ref()
                    .map(IndexStatus::as_str)
                    .unwrap_or_default()
            );
            state.rejected += 1;
            return Err(in_use(message).into());
        }

        let info = apply(table).map_err(GsiError::from)?;
        let reads_until_settled = self.initial_reads(&info);
        table.indexes.retain(|i| i.info.index_name != info.index_name);
        table.indexes.push(StoredIndex {
            info,
            reads_until_settled,
        });
        if reads_until_settled == Some(0) {
            settle(table, index_name);
        }

        tracing::debug!(table = table_name, index = index_name, %kind, "Accepted mutation");
        state.mutations.push(MutationRecord {
            table_name: table_name.to_string(),
            kind,
            index_name: index_name.to_string(),
        });
        Ok(())
    }
}

/// Move an in-flight index to its terminal state
fn settle(table: &mut StoredTable, index_name: &str) {
    let Some(position) = table
        .indexes
        .iter()
        .position(|i| i.info.index_name == index_name)
    else {
        return;
    };
    match table.indexes[position].info.status.clone() {
        Some(IndexStatus::Deleting) => {
            table.indexes.remove(position);
        }
        Some(IndexStatus::Creating) | Some(IndexStatus::Updating) => {
            let index = &mut table.indexes[position];
            index.info.status = Some(IndexStatus::Active);
            index.reads_until_settled = Some(0);
        }
        _ => {}
    }
}

fn not_found(table_name: &str) -> StoreError {
    StoreError::with_code(
        "ResourceNotFoundException",
        format!("Requested resource not found: Table: {table_name} not found"),
    )
}

fn in_use(message: String) -> StoreError {
    StoreError::with_code("ResourceInUseException", message)
}

fn find_index<'a>(table: &'a StoredTable, index_name: &str) -> Option<&'a IndexInfo> {
    table
        .indexes
        .iter()
        .map(|i| &i.info)
        .find(|i| i.index_name == index_name)
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn describe_table(&self, table_name: &str) -> Result<TableDescription> {
        let mut state = self.state.write();
        state.describe_calls += 1;
        if let Some(err) = state.injected.pop_front() {
            return Err(err.into());
        }
        let Some(table) = state.tables.get_mut(table_name) else {
            return Err(not_found(table_name).into());
        };

        let mut due = Vec::new();
        for index in table.indexes.iter_mut().filter(|i| i.info.is_in_flight()) {
            match index.reads_until_settled.as_mut() {
                Some(0) => due.push(index.info.index_name.clone()),
                Some(remaining) => *remaining -= 1,
                None => {}
            }
        }
        for name in due {
            settle(table, &name);
        }

        Ok(TableDescription {
            status: table.status.clone(),
            indexes: table.indexes.iter().map(|i| i.info.clone()).collect(),
        })
    }

    async fn create_index(&self, table_name: &str, request: &CreateIndexRequest) -> Result<()> {
        self.mutate(table_name, OperationKind::Create, &request.index_name, |table| {
            if find_index(table, &request.index_name).is_some() {
                return Err(StoreError::with_code(
                    "ValidationException",
                    format!(
                        "Attempting to create an index which already exists: {}",
                        request.index_name
                    ),
                ));
            }
            Ok(IndexInfo {
                index_name: request.index_name.clone(),
                key_schema: request.key_schema.clone(),
                projection: request.projection.clone(),
                status: Some(IndexStatus::Creating),
                provisioned_throughput: request.provisioned_throughput,
            })
        })
    }

    async fn update_index_throughput(
        &self,
        table_name: &str,
        index_name: &str,
        throughput: ProvisionedThroughput,
    ) -> Result<()> {
        self.mutate(table_name, OperationKind::Update, index_name, |table| {
            let mut info = find_index(table, index_name)
                .cloned()
                .ok_or_else(|| missing_index(index_name))?;
            info.status = Some(IndexStatus::Updating);
            info.provisioned_throughput = Some(throughput);
            Ok(info)
        })
    }

    async fn delete_index(&self, table_name: &str, index_name: &str) -> Result<()> {
        self.mutate(table_name, OperationKind::Delete, index_name, |table| {
            let mut info = find_index(table, index_name)
                .cloned()
                .ok_or_else(|| missing_index(index_name))?;
            info.status = Some(IndexStatus::Deleting);
            Ok(info)
        })
    }
}

fn missing_index(index_name: &str) -> StoreError {
    StoreError::with_code(
        "ResourceNotFoundException",
        format!("Requested resource not found: Index: {index_name} not found"),
    )
}

/// Parse fixture JSON, mapping malformed input to a configuration error
pub fn parse_fixture(json: &str) -> Result<Fixture> {
    serde_json::from_str(json)
        .map_err(|e| GsiError::invalid_config(format!("invalid store fixture: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeDefinition, IndexConfiguration};

    fn request(name: &str) -> CreateIndexRequest {
        CreateIndexRequest::from_configuration(&IndexConfiguration::new(
            name,
            AttributeDefinition::string("PK"),
        ))
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let store = MemoryIndexStore::new();
        let err = store.describe_table("Nope").await.unwrap_err();
        assert_eq!(err.error_code(), Some("ResourceNotFoundException"));
    }

    #[tokio::test]
    async fn test_immediate_mode_settles_on_mutation() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.create_index("Orders", &request("GSI1")).await.unwrap();

        let description = store.describe_table("Orders").await.unwrap();
        assert_eq!(description.indexes[0].status, Some(IndexStatus::Active));

        store.delete_index("Orders", "GSI1").await.unwrap();
        assert!(store.indexes("Orders").is_empty());
    }

    #[tokio::test]
    async fn test_after_reads_mode() {
        let store = MemoryIndexStore::with_settle_mode(SettleMode::AfterReads(2));
        store.create_table("Orders");
        store.create_index("Orders", &request("GSI1")).await.unwrap();

        for _ in 0..2 {
            let d = store.describe_table("Orders").await.unwrap();
            assert_eq!(d.indexes[0].status, Some(IndexStatus::Creating));
        }
        let d = store.describe_table("Orders").await.unwrap();
        assert_eq!(d.indexes[0].status, Some(IndexStatus::Active));
    }

    #[tokio::test]
    async fn test_rejects_mutation_while_index_in_flight() {
        let store = MemoryIndexStore::with_settle_mode(SettleMode::Manual);
        store.create_table("Orders");
        store.create_index("Orders", &request("GSI1")).await.unwrap();

        let err = store.create_index("Orders", &request("GSI2")).await.unwrap_err();
        assert_eq!(err.error_code(), Some("ResourceInUseException"));
        assert_eq!(store.rejected_mutations(), 1);
        assert_eq!(store.mutations().len(), 1);

        store.settle_all();
        store.create_index("Orders", &request("GSI2")).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_mutation_while_table_unstable() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.set_table_status("Orders", TableStatus::Updating);

        let err = store.delete_index("Orders", "GSI1").await.unwrap_err();
        assert_eq!(err.error_code(), Some("ResourceInUseException"));
    }

    #[tokio::test]
    async fn test_update_records_throughput() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.create_index("Orders", &request("GSI1")).await.unwrap();
        store
            .update_index_throughput("Orders", "GSI1", ProvisionedThroughput::new(7, 8))
            .await
            .unwrap();

        let info = &store.indexes("Orders")[0];
        assert_eq!(info.provisioned_throughput, Some(ProvisionedThroughput::new(7, 8)));
        assert_eq!(
            store.mutations().iter().map(|m| m.kind).collect::<Vec<_>>(),
            vec![OperationKind::Create, OperationKind::Update]
        );
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed_in_order() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.fail_next(StoreError::with_code("ThrottlingException", "slow"), 1);

        assert!(store.describe_table("Orders").await.is_err());
        assert!(store.describe_table("Orders").await.is_ok());
    }

    #[test]
    fn test_fixture_round_trip_preserves_listing() {
        let fixture = parse_fixture(
            r#"{"tables": [{"tableName": "Orders", "indexes": [
                {"indexName": "GSI1", "keySchema": [{"attributeName": "PK", "role": "HASH"}],
                 "status": "ACTIVE"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(fixture.tables[0].status, TableStatus::Active);

        let store = MemoryIndexStore::from_fixture(fixture.clone(), SettleMode::Immediate);
        let saved = store.to_fixture();
        assert_eq!(saved, fixture);
        assert_eq!(store.indexes("Orders")[0].index_name, "GSI1");
    }

    #[test]
    fn test_malformed_fixture_is_config_error() {
        let err = parse_fixture("{\"tables\": 3}").unwrap_err();
        assert!(matches!(err, GsiError::InvalidConfig(_)));
    }
}
