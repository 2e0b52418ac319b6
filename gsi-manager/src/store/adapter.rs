//! Retrying store adapter with probes and waiters

use super::{CreateIndexRequest, IndexStore, TableDescription};
use crate::backoff::{self, Backoff};
use crate::config::{ErrorHandlingConfig, WaitConfig};
use crate::error::{GsiError, Result};
use crate::model::{IndexConfiguration, IndexInfo, IndexStatus, IndexTarget};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// Store access for one reconciliation
///
/// Every store call goes through the backoff executor with the declaration's
/// [`ErrorHandlingConfig`]. Probes (`is_*`) make a single describe call;
/// waiters (`wait_for_*`) block until their condition holds or the
/// [`WaitConfig`] timeout passes.
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    store: Arc<dyn IndexStore>,
    error_handling: ErrorHandlingConfig,
    wait: WaitConfig,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn IndexStore>, error_handling: ErrorHandlingConfig) -> Self {
        Self {
            store,
            error_handling,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    async fn describe(&self, table_name: &str) -> Result<TableDescription> {
        backoff::execute(
            || self.store.describe_table(table_name),
            &self.error_handling,
            None,
        )
        .await
    }

    /// All global secondary indexes on the table, empty if none
    pub async fn list_indexes(&self, table_name: &str) -> Result<Vec<IndexInfo>> {
        Ok(self.describe(table_name).await?.indexes)
    }

    pub async fn create_index(&self, table_name: &str, config: &IndexConfiguration) -> Result<()> {
        let request = CreateIndexRequest::from_configuration(config);
        tracing::info!(table = table_name, index = %config.index_name, "Creating index");
        backoff::execute(
            || self.store.create_index(table_name, &request),
            &self.error_handling,
            None,
        )
        .await
    }

    /// Throughput-only update. Returns immediately when `config` has no
    /// provisioned throughput.
    pub async fn update_index(&self, table_name: &str, config: &IndexConfiguration) -> Result<()> {
        let Some(throughput) = config.provisioned_throughput else {
            tracing::debug!(
                index = %config.index_name,
                "No provisioned throughput declared, skipping update"
            );
            return Ok(());
        };
        tracing::info!(
            table = table_name,
            index = %config.index_name,
            read = throughput.read_capacity_units,
            write = throughput.write_capacity_units,
            "Updating index throughput"
        );
        backoff::execute(
            || {
                self.store
                    .update_index_throughput(table_name, &config.index_name, throughput)
            },
            &self.error_handling,
            None,
        )
        .await
    }

    pub async fn delete_index(&self, table_name: &str, index_name: &str) -> Result<()> {
        tracing::info!(table = table_name, index = index_name, "Deleting index");
        backoff::execute(
            || self.store.delete_index(table_name, index_name),
            &self.error_handling,
            None,
        )
        .await
    }

    /// True iff the table itself is ACTIVE
    pub async fn is_table_stable(&self, table_name: &str) -> Result<bool> {
        let description = self.describe(table_name).await?;
        tracing::debug!(table = table_name, status = %description.status, "Table status");
        Ok(description.status.is_stable())
    }

    /// For `Deleted`: the index is absent. For `Active`: present and ACTIVE.
    pub async fn is_index_in_status(
        &self,
        table_name: &str,
        index_name: &str,
        target: IndexTarget,
    ) -> Result<bool> {
        let indexes = self.list_indexes(table_name).await?;
        Ok(index_matches(&indexes, index_name, target))
    }

    /// Block until the table is ACTIVE. Must precede any mutation: the store
    /// rejects index mutations while the table is changing.
    pub async fn wait_for_table_stable(&self, table_name: &str) -> Result<()> {
        self.wait_until(&format!("table {table_name} to become ACTIVE"), || {
            self.is_table_stable(table_name)
        })
        .await
    }

    pub async fn wait_for_index_status(
        &self,
        table_name: &str,
        index_name: &str,
        target: IndexTarget,
    ) -> Result<()> {
        self.wait_until(&format!("index {index_name} to become {target}"), || {
            self.is_index_in_status(table_name, index_name, target)
        })
        .await
    }

    async fn wait_until<F, Fut>(&self, what: &str, mut condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let deadline = Instant::now() + self.wait.timeout;
        let mut delays = Backoff::new(
            self.wait.initial_delay.as_millis() as u64,
            self.wait.max_delay.as_millis() as u64,
        );

        loop {
            if condition().await? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(GsiError::timeout(format!(
                    "waiting for {what} exceeded {:?}",
                    self.wait.timeout
                )));
            }

            let delay = delays.next_delay().min(deadline - now);
            tracing::debug!(?delay, "Waiting for {}", what);
            tokio::time::sleep(delay).await;
        }
    }
}

pub(crate) fn index_matches(indexes: &[IndexInfo], index_name: &str, target: IndexTarget) -> bool {
    let found = indexes.iter().find(|i| i.index_name == index_name);
    match target {
        IndexTarget::Deleted => found.is_none(),
        IndexTarget::Active => found.is_some_and(|i| i.status == Some(IndexStatus::Active)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{AttributeDefinition, TableStatus};
    use crate::store::memory::{MemoryIndexStore, SettleMode};
    use std::time::Duration;

    fn fast_errors() -> ErrorHandlingConfig {
        ErrorHandlingConfig {
            base_delay_ms: 1,
            max_delay_ms: 5,
            ..ErrorHandlingConfig::default()
        }
    }

    fn adapter(store: &MemoryIndexStore) -> StoreAdapter {
        StoreAdapter::new(Arc::new(store.clone()), fast_errors())
    }

    fn gsi(name: &str) -> IndexConfiguration {
        IndexConfiguration::new(name, AttributeDefinition::string("PK"))
    }

    #[tokio::test]
    async fn test_list_indexes_empty_table() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        assert!(adapter(&store).list_indexes("Orders").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.fail_next(StoreError::with_code("ThrottlingException", "slow down"), 2);

        let adapter = adapter(&store);
        adapter.create_index("Orders", &gsi("GSI1")).await.unwrap();
        assert_eq!(store.mutations().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails_fatally() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        let adapter = adapter(&store);

        adapter.create_index("Orders", &gsi("GSI1")).await.unwrap();
        let err = adapter.create_index("Orders", &gsi("GSI1")).await.unwrap_err();
        assert_eq!(err.error_code(), Some("ValidationException"));
    }

    #[tokio::test]
    async fn test_update_without_throughput_is_noop() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        adapter(&store)
            .update_index("Orders", &gsi("GSI1"))
            .await
            .unwrap();
        assert!(store.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_probes() {
        let store = MemoryIndexStore::with_settle_mode(SettleMode::Manual);
        store.create_table("Orders");
        let adapter = adapter(&store);

        assert!(adapter.is_table_stable("Orders").await.unwrap());
        assert!(adapter
            .is_index_in_status("Orders", "GSI1", IndexTarget::Deleted)
            .await
            .unwrap());

        adapter.create_index("Orders", &gsi("GSI1")).await.unwrap();
        assert!(!adapter
            .is_index_in_status("Orders", "GSI1", IndexTarget::Active)
            .await
            .unwrap());

        store.settle_all();
        assert!(adapter
            .is_index_in_status("Orders", "GSI1", IndexTarget::Active)
            .await
            .unwrap());

        store.set_table_status("Orders", TableStatus::Updating);
        assert!(!adapter.is_table_stable("Orders").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_index_status_polls_until_settled() {
        let store = MemoryIndexStore::with_settle_mode(SettleMode::AfterReads(3));
        store.create_table("Orders");
        let adapter = adapter(&store);

        adapter.create_index("Orders", &gsi("GSI1")).await.unwrap();
        let start = Instant::now();
        adapter
            .wait_for_index_status("Orders", "GSI1", IndexTarget::Active)
            .await
            .unwrap();

        // Three in-flight reads: sleeps of 3s, 6s and 12s before the fourth read
        assert_eq!(start.elapsed(), Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_table_stable_times_out() {
        let store = MemoryIndexStore::new();
        store.create_table("Orders");
        store.set_table_status("Orders", TableStatus::Updating);

        let adapter = adapter(&store).with_wait_config(WaitConfig {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(20),
            timeout: Duration::from_secs(60),
        });

        let start = Instant::now();
        let err = adapter.wait_for_table_stable("Orders").await.unwrap_err();
        assert!(err.is_timeout(), "{err}");
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}
