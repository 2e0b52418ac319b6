use crate::cli::StoreArgs;
use crate::error::{CliError, CliResult};
use gsi_manager::store::memory::{self, MemoryIndexStore, SettleMode};
use gsi_manager::{DynamoDbConfig, DynamoDbIndexStore, IndexStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Store backing one CLI invocation.
pub enum StoreContext {
    /// Live DynamoDB via the AWS SDK.
    DynamoDb(Arc<DynamoDbIndexStore>),
    /// In-memory simulation seeded from a fixture file.
    Fixture {
        store: MemoryIndexStore,
        path: PathBuf,
    },
}

impl StoreContext {
    pub async fn build(args: &StoreArgs) -> CliResult<Self> {
        if let Some(path) = &args.fixture {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CliError::Input(format!("failed to read fixture {}: {e}", path.display()))
            })?;
            let fixture = memory::parse_fixture(&content)?;
            tracing::debug!(
                path = %path.display(),
                tables = fixture.tables.len(),
                "Loaded store fixture"
            );
            return Ok(Self::Fixture {
                store: MemoryIndexStore::from_fixture(fixture, SettleMode::Immediate),
                path: path.clone(),
            });
        }

        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        if sdk_config.region().is_none() && args.region.is_none() {
            return Err(CliError::Config(
                "no AWS region configured; pass --region or set AWS_REGION".into(),
            ));
        }
        let config = DynamoDbConfig {
            region: args.region.clone(),
            endpoint: args.endpoint_url.clone(),
            timeout_ms: args.request_timeout_ms,
        };
        Ok(Self::DynamoDb(Arc::new(DynamoDbIndexStore::new(
            &sdk_config,
            config,
        ))))
    }

    pub fn store(&self) -> Arc<dyn IndexStore> {
        match self {
            Self::DynamoDb(store) => Arc::clone(store) as Arc<dyn IndexStore>,
            Self::Fixture { store, .. } => Arc::new(store.clone()),
        }
    }

    /// Write simulated state back to the fixture file. No-op for DynamoDB.
    pub fn persist(&self) -> CliResult<()> {
        let Self::Fixture { store, path } = self else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&store.to_fixture())?;
        std::fs::write(path, json + "\n").map_err(|e| {
            CliError::Input(format!("failed to write fixture {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
