//! Reconciliation sequencer
//!
//! [`Reconciler::start`] and [`Reconciler::poll`] form a resumable state
//! machine driven by an external framework: each call re-reads the table,
//! re-resolves ownership, re-plans, and issues at most one index mutation.
//! Nothing is remembered between calls, so a call can be repeated or resumed
//! after a crash without double-issuing work.
//!
//! [`Reconciler::reconcile_to_completion`] drives the same decisions in one
//! blocking call for callers that can wait for the whole sequence.

use crate::config::{ErrorHandlingConfig, WaitConfig};
use crate::error::{GsiError, Result};
use crate::model::{
    IndexConfiguration, IndexInfo, IndexStatus, IndexTarget, Operation, OperationKind,
    RequestKind,
};
use crate::ownership::{self, Resolution};
use crate::planner;
use crate::properties::Declaration;
use crate::store::{IndexStore, StoreAdapter};
use crate::validation;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Prefix of synthesized physical resource ids
pub const PHYSICAL_ID_PREFIX: &str = "GSIManager-";

/// One reconciliation request for a single table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub kind: RequestKind,
    pub table_name: String,
    pub desired: Vec<IndexConfiguration>,
    /// Index names of the previous declaration (UPDATE only)
    pub prior_index_names: Vec<String>,
    pub physical_id: Option<String>,
    pub error_handling: ErrorHandlingConfig,
}

impl ReconcileRequest {
    pub fn new(kind: RequestKind, declaration: Declaration) -> Self {
        Self {
            kind,
            table_name: declaration.table_name,
            desired: declaration.indexes,
            prior_index_names: Vec::new(),
            physical_id: None,
            error_handling: declaration.error_handling,
        }
    }

    pub fn with_prior_index_names(mut self, names: Vec<String>) -> Self {
        self.prior_index_names = names;
        self
    }

    pub fn with_physical_id(mut self, physical_id: Option<String>) -> Self {
        self.physical_id = physical_id;
        self
    }

    /// Supplied id verbatim, else `GSIManager-<tableName>`
    pub fn physical_id(&self) -> String {
        self.physical_id
            .clone()
            .unwrap_or_else(|| format!("{PHYSICAL_ID_PREFIX}{}", self.table_name))
    }

    pub fn index_names(&self) -> Vec<String> {
        self.desired.iter().map(|d| d.index_name.clone()).collect()
    }

    /// Describes the declared set, not a tally of mutations issued
    pub fn completion_data(&self) -> CompletionData {
        CompletionData {
            operations_executed: self.desired.len(),
            managed_indexes: self.index_names().join(","),
        }
    }

    fn managed_names(&self) -> std::collections::BTreeSet<String> {
        ownership::managed_names(
            self.kind,
            self.desired.iter().map(|d| d.index_name.as_str()),
            self.prior_index_names.iter().map(String::as_str),
        )
    }
}

/// Data reported to the framework once reconciliation is complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub operations_executed: usize,
    pub managed_indexes: String,
}

/// Conceptual position of a reconciliation, derived fresh on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    NoOpNeeded,
    OperationInFlight,
    OperationPendingStart,
    AllComplete,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOpNeeded => f.write_str("NO_OP_NEEDED"),
            Self::OperationInFlight => f.write_str("OPERATION_IN_FLIGHT"),
            Self::OperationPendingStart => f.write_str("OPERATION_PENDING_START"),
            Self::AllComplete => f.write_str("ALL_COMPLETE"),
        }
    }
}

/// What a reconciliation step should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Nothing left to do
    Complete,
    /// A managed index is mid-mutation; nothing new may start
    AwaitInFlight {
        index_name: String,
        target: IndexTarget,
    },
    /// Issue this operation's mutation
    Issue(Operation),
}

/// Operations that take `candidates` to the requested end state.
///
/// DELETE requests bypass the planner: every candidate is deleted.
pub fn plan_for(
    kind: RequestKind,
    candidates: &[IndexInfo],
    desired: &[IndexConfiguration],
) -> Vec<Operation> {
    match kind {
        RequestKind::Delete => candidates.iter().cloned().map(Operation::delete).collect(),
        RequestKind::Create | RequestKind::Update => planner::plan(candidates, desired),
    }
}

/// Decide the next step from observed candidates alone
pub fn next_action(
    kind: RequestKind,
    candidates: &[IndexInfo],
    desired: &[IndexConfiguration],
) -> NextAction {
    if let Some(busy) = candidates.iter().find(|c| c.is_in_flight()) {
        return NextAction::AwaitInFlight {
            index_name: busy.index_name.clone(),
            target: busy.pending_target(),
        };
    }

    let operations = plan_for(kind, candidates, desired);
    tracing::debug!(request = %kind, planned = operations.len(), "Planned operations");
    match operations.into_iter().next() {
        Some(operation) => NextAction::Issue(operation),
        None => NextAction::Complete,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub complete: bool,
    pub physical_id: String,
    pub state: ReconcileState,
    /// Present only when complete
    pub data: Option<CompletionData>,
    /// The mutation issued by this call, if any
    pub issued: Option<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub complete: bool,
    pub state: ReconcileState,
    /// Present only when complete
    pub data: Option<CompletionData>,
    pub issued: Option<Operation>,
}

impl PollOutcome {
    fn pending(state: ReconcileState, issued: Option<Operation>) -> Self {
        Self {
            complete: false,
            state,
            data: None,
            issued,
        }
    }
}

/// Resolution and plan computed without mutating anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub resolution: Resolution,
    pub operations: Vec<Operation>,
    /// Managed index currently mid-mutation, which blocks new operations
    pub in_flight: Option<String>,
}

/// Result of a single-shot reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    /// Mutations actually issued
    pub operations_executed: usize,
    pub managed_indexes: Vec<String>,
}

/// Drives reconciliation against an injected store
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<dyn IndexStore>,
    wait: WaitConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    fn adapter(&self, request: &ReconcileRequest) -> StoreAdapter {
        StoreAdapter::new(Arc::clone(&self.store), request.error_handling.clone())
            .with_wait_config(self.wait)
    }

    async fn resolve(
        &self,
        adapter: &StoreAdapter,
        request: &ReconcileRequest,
    ) -> Result<Resolution> {
        let observed = adapter.list_indexes(&request.table_name).await?;
        let resolution = ownership::resolve(request.kind, &observed, &request.managed_names());
        tracing::debug!(
            table = %request.table_name,
            observed = observed.len(),
            candidates = resolution.candidates.len(),
            adopted = resolution.adopted,
            "Resolved managed indexes"
        );
        Ok(resolution)
    }

    /// Begin a reconciliation.
    ///
    /// Issues at most the first planned mutation and returns without waiting
    /// for it. Validation failures surface before the store is touched.
    pub async fn start(&self, request: &ReconcileRequest) -> Result<StartOutcome> {
        validation::ensure_valid(&request.desired)?;
        let adapter = self.adapter(request);
        let resolution = self.resolve(&adapter, request).await?;
        let physical_id = request.physical_id();

        let (state, issued) =
            match next_action(request.kind, &resolution.candidates, &request.desired) {
                NextAction::Complete => {
                    tracing::info!(
                        table = %request.table_name,
                        request = %request.kind,
                        "No index changes needed"
                    );
                    return Ok(StartOutcome {
                        complete: true,
                        physical_id,
                        state: ReconcileState::NoOpNeeded,
                        data: Some(request.completion_data()),
                        issued: None,
                    });
                }
                NextAction::AwaitInFlight { index_name, target } => {
                    tracing::info!(
                        index = %index_name,
                        %target,
                        "Index mutation already in flight, deferring to poll"
                    );
                    (ReconcileState::OperationInFlight, None)
                }
                NextAction::Issue(operation) => {
                    adapter.wait_for_table_stable(&request.table_name).await?;
                    issue(&adapter, &request.table_name, &operation).await?;
                    (ReconcileState::OperationPendingStart, Some(operation))
                }
            };

        Ok(StartOutcome {
            complete: false,
            physical_id,
            state,
            data: None,
            issued,
        })
    }

    /// Advance a reconciliation by at most one mutation.
    ///
    /// Uses only non-blocking probes. An in-flight mutation that has just
    /// finished still reports not complete; the next poll re-plans.
    pub async fn poll(&self, request: &ReconcileRequest) -> Result<PollOutcome> {
        validation::ensure_valid(&request.desired)?;
        let adapter = self.adapter(request);
        let table = request.table_name.as_str();
        let resolution = self.resolve(&adapter, request).await?;

        let operation = match next_action(request.kind, &resolution.candidates, &request.desired) {
            NextAction::Complete => {
                tracing::info!(table, request = %request.kind, "Reconciliation complete");
                return Ok(PollOutcome {
                    complete: true,
                    state: ReconcileState::AllComplete,
                    data: Some(request.completion_data()),
                    issued: None,
                });
            }
            NextAction::AwaitInFlight { index_name, target } => {
                let reached = adapter.is_index_in_status(table, &index_name, target).await?;
                tracing::debug!(index = %index_name, %target, reached, "In-flight index probed");
                return Ok(PollOutcome::pending(ReconcileState::OperationInFlight, None));
            }
            NextAction::Issue(operation) => operation,
        };

        if !adapter.is_table_stable(table).await? {
            tracing::info!(table, "Table not stable, deferring {}", operation);
            return Ok(PollOutcome::pending(ReconcileState::OperationPendingStart, None));
        }

        let should_issue = match operation.kind {
            OperationKind::Create => {
                adapter
                    .is_index_in_status(table, &operation.index_name, IndexTarget::Deleted)
                    .await?
            }
            OperationKind::Delete => operation
                .current
                .as_ref()
                .map_or(true, |c| c.status != Some(IndexStatus::Deleting)),
            OperationKind::Update => true,
        };

        if !should_issue {
            tracing::debug!("Skipping {}, already under way", operation);
            return Ok(PollOutcome::pending(ReconcileState::OperationInFlight, None));
        }

        issue(&adapter, table, &operation).await?;
        Ok(PollOutcome::pending(
            ReconcileState::OperationPendingStart,
            Some(operation),
        ))
    }

    /// Compute what `start` would do, without mutating anything
    pub async fn preview(&self, request: &ReconcileRequest) -> Result<Preview> {
        validation::ensure_valid(&request.desired)?;
        let adapter = self.adapter(request);
        let resolution = self.resolve(&adapter, request).await?;
        let operations = plan_for(request.kind, &resolution.candidates, &request.desired);
        let in_flight = resolution
            .candidates
            .iter()
            .find(|c| c.is_in_flight())
            .map(|c| c.index_name.clone());
        Ok(Preview {
            resolution,
            operations,
            in_flight,
        })
    }

    /// Reconcile in one blocking call, waiting out every mutation
    pub async fn reconcile_to_completion(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileSummary> {
        validation::ensure_valid(&request.desired)?;
        let adapter = self.adapter(request);
        let table = request.table_name.as_str();
        let mut executed = 0;

        loop {
            adapter.wait_for_table_stable(table).await?;
            let resolution = self.resolve(&adapter, request).await?;

            match next_action(request.kind, &resolution.candidates, &request.desired) {
                NextAction::Complete => break,
                NextAction::AwaitInFlight { index_name, target } => {
                    tracing::info!(index = %index_name, %target, "Waiting for in-flight index");
                    adapter.wait_for_index_status(table, &index_name, target).await?;
                }
                NextAction::Issue(operation) => {
                    issue(&adapter, table, &operation).await?;
                    executed += 1;
                    adapter
                        .wait_for_index_status(table, &operation.index_name, operation.target())
                        .await?;
                }
            }
        }

        tracing::info!(table, operations = executed, "Reconciled to completion");
        Ok(ReconcileSummary {
            operations_executed: executed,
            managed_indexes: request.index_names(),
        })
    }
}

async fn issue(adapter: &StoreAdapter, table: &str, operation: &Operation) -> Result<()> {
    tracing::info!(table, "Issuing {}", operation);
    match operation.kind {
        OperationKind::Create => adapter.create_index(table, desired_of(operation)?).await,
        OperationKind::Update => adapter.update_index(table, desired_of(operation)?).await,
        OperationKind::Delete => adapter.delete_index(table, &operation.index_name).await,
    }
}

fn desired_of(operation: &Operation) -> Result<&IndexConfiguration> {
    operation.desired.as_ref().ok_or_else(|| {
        GsiError::invalid_operation(format!("{operation} carries no desired configuration"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::AttributeDefinition;
    use crate::store::memory::{MemoryIndexStore, SettleMode};

    fn gsi(name: &str, pk: &str) -> IndexConfiguration {
        IndexConfiguration::new(name, AttributeDefinition::string(pk))
    }

    fn request(kind: RequestKind, desired: Vec<IndexConfiguration>) -> ReconcileRequest {
        ReconcileRequest {
            kind,
            table_name: "Orders".to_string(),
            desired,
            prior_index_names: Vec::new(),
            physical_id: None,
            error_handling: ErrorHandlingConfig {
                base_delay_ms: 1,
                max_delay_ms: 2,
                ..ErrorHandlingConfig::default()
            },
        }
    }

    fn store_with(mode: SettleMode, existing: &[IndexConfiguration]) -> MemoryIndexStore {
        let store = MemoryIndexStore::with_settle_mode(mode);
        store.create_table("Orders");
        for config in existing {
            store.put_index(
                "Orders",
                IndexInfo::from_configuration(config, Some(IndexStatus::Active)),
            );
        }
        store
    }

    fn reconciler(store: &MemoryIndexStore) -> Reconciler {
        Reconciler::new(Arc::new(store.clone()))
    }

    fn observed(config: &IndexConfiguration, status: IndexStatus) -> IndexInfo {
        IndexInfo::from_configuration(config, Some(status))
    }

    #[test]
    fn test_next_action_guards_in_flight() {
        let candidates = vec![
            observed(&gsi("GSI1", "PK"), IndexStatus::Active),
            observed(&gsi("GSI2", "PK"), IndexStatus::Deleting),
        ];
        let action = next_action(RequestKind::Update, &candidates, &[gsi("GSI3", "PK")]);
        assert_eq!(
            action,
            NextAction::AwaitInFlight {
                index_name: "GSI2".to_string(),
                target: IndexTarget::Deleted,
            }
        );
    }

    #[test]
    fn test_delete_plan_bypasses_planner() {
        let candidates = vec![
            observed(&gsi("GSI1", "PK"), IndexStatus::Active),
            observed(&gsi("GSI2", "PK"), IndexStatus::Active),
        ];
        let ops = plan_for(RequestKind::Delete, &candidates, &[gsi("GSI1", "PK")]);
        let names: Vec<String> = ops.iter().map(Operation::to_string).collect();
        assert_eq!(names, vec!["DELETE GSI1", "DELETE GSI2"]);
    }

    #[test]
    fn test_physical_id_synthesized_when_absent() {
        let req = request(RequestKind::Create, vec![]);
        assert_eq!(req.physical_id(), "GSIManager-Orders");
        let req = req.with_physical_id(Some("given-id".to_string()));
        assert_eq!(req.physical_id(), "given-id");
    }

    #[test]
    fn test_completion_data_describes_declared_set() {
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A"), gsi("GSI2", "B")]);
        let data = req.completion_data();
        assert_eq!(data.operations_executed, 2);
        assert_eq!(data.managed_indexes, "GSI1,GSI2");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({"operationsExecuted": 2, "managedIndexes": "GSI1,GSI2"})
        );
    }

    #[tokio::test]
    async fn test_start_issues_only_first_operation() {
        let store = store_with(SettleMode::Manual, &[]);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A"), gsi("GSI2", "B")]);

        let outcome = reconciler(&store).start(&req).await.unwrap();
        assert!(!outcome.complete);
        assert_eq!(outcome.physical_id, "GSIManager-Orders");
        assert_eq!(outcome.state, ReconcileState::OperationPendingStart);
        assert!(outcome.data.is_none());
        assert_eq!(store.mutations().len(), 1);
        assert_eq!(store.mutations()[0].index_name, "GSI1");
    }

    #[tokio::test]
    async fn test_start_complete_when_nothing_to_do() {
        let existing = vec![gsi("GSI1", "A")];
        let store = store_with(SettleMode::Manual, &existing);
        let req = request(RequestKind::Create, existing);

        let outcome = reconciler(&store).start(&req).await.unwrap();
        assert!(outcome.complete);
        assert_eq!(outcome.state, ReconcileState::NoOpNeeded);
        assert_eq!(outcome.data.unwrap().managed_indexes, "GSI1");
        assert!(store.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_fail_before_any_store_call() {
        let store = store_with(SettleMode::Manual, &[]);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A"), gsi("GSI1", "B")]);

        let err = reconciler(&store).start(&req).await.unwrap_err();
        assert!(matches!(err, GsiError::Validation(_)));
        assert!(err.to_string().contains("Duplicate index name: GSI1"));
        assert_eq!(store.describe_calls(), 0);
        assert!(store.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_start_then_poll_until_complete_never_overlaps() {
        let store = store_with(SettleMode::AfterReads(2), &[]);
        let req = request(
            RequestKind::Create,
            vec![gsi("GSI1", "A"), gsi("GSI2", "B"), gsi("GSI3", "C")],
        );
        let reconciler = reconciler(&store);

        assert!(!reconciler.start(&req).await.unwrap().complete);
        let mut polls = 0;
        let data = loop {
            let outcome = reconciler.poll(&req).await.unwrap();
            polls += 1;
            assert!(polls < 50, "did not converge");
            if outcome.complete {
                break outcome.data.unwrap();
            }
        };

        assert_eq!(data.operations_executed, 3);
        assert_eq!(store.mutations().len(), 3);
        assert_eq!(store.rejected_mutations(), 0);
    }

    #[tokio::test]
    async fn test_poll_reports_in_flight_without_issuing() {
        let store = store_with(SettleMode::Manual, &[]);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A"), gsi("GSI2", "B")]);
        let reconciler = reconciler(&store);

        reconciler.start(&req).await.unwrap();
        let outcome = reconciler.poll(&req).await.unwrap();
        assert!(!outcome.complete);
        assert_eq!(outcome.state, ReconcileState::OperationInFlight);
        assert_eq!(store.mutations().len(), 1);

        // Settled but still one poll to re-plan
        store.settle_all();
        let outcome = reconciler.poll(&req).await.unwrap();
        assert_eq!(outcome.issued.map(|op| op.to_string()), Some("CREATE GSI2".to_string()));
    }

    #[tokio::test]
    async fn test_repeated_start_does_not_double_issue() {
        let store = store_with(SettleMode::Manual, &[]);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A")]);
        let reconciler = reconciler(&store);

        reconciler.start(&req).await.unwrap();
        let again = reconciler.start(&req).await.unwrap();
        assert_eq!(again.state, ReconcileState::OperationInFlight);
        assert_eq!(store.mutations().len(), 1);
        assert_eq!(store.rejected_mutations(), 0);
    }

    #[tokio::test]
    async fn test_update_deletes_index_dropped_from_declaration() {
        let gsi1 = gsi("GSI1", "A");
        let gsi2 = gsi("GSI2", "B");
        let store = store_with(SettleMode::Immediate, &[gsi1.clone(), gsi2]);
        let req = request(RequestKind::Update, vec![gsi1])
            .with_prior_index_names(vec!["GSI1".to_string(), "GSI2".to_string()]);
        let reconciler = reconciler(&store);

        let preview = reconciler.preview(&req).await.unwrap();
        assert_eq!(preview.operations.len(), 1);
        assert_eq!(preview.operations[0].to_string(), "DELETE GSI2");

        let outcome = reconciler.start(&req).await.unwrap();
        assert_eq!(outcome.issued.unwrap().to_string(), "DELETE GSI2");
        assert!(reconciler.poll(&req).await.unwrap().complete);
        assert_eq!(store.indexes("Orders").len(), 1);
    }

    #[tokio::test]
    async fn test_update_reissued_each_poll_until_converged() {
        let current = gsi("GSI1", "A").with_throughput(5, 5);
        let store = store_with(SettleMode::Immediate, &[current]);
        let req = request(
            RequestKind::Update,
            vec![gsi("GSI1", "A").with_throughput(10, 10)],
        );
        let reconciler = reconciler(&store);

        let outcome = reconciler.start(&req).await.unwrap();
        assert_eq!(outcome.issued.unwrap().kind, OperationKind::Update);
        assert!(reconciler.poll(&req).await.unwrap().complete);
    }

    #[tokio::test]
    async fn test_delete_request_removes_all_candidates_one_at_a_time() {
        let store = store_with(
            SettleMode::Manual,
            &[gsi("GSI1", "A"), gsi("GSI2", "B"), gsi("MANUAL", "C")],
        );
        let req = request(RequestKind::Delete, vec![gsi("GSI1", "A"), gsi("GSI2", "B")]);
        let reconciler = reconciler(&store);

        let outcome = reconciler.start(&req).await.unwrap();
        assert_eq!(outcome.issued.unwrap().to_string(), "DELETE GSI1");

        let outcome = reconciler.poll(&req).await.unwrap();
        assert_eq!(outcome.state, ReconcileState::OperationInFlight);
        assert!(!outcome.complete);

        for _ in 0..2 {
            store.settle_all();
            let outcome = reconciler.poll(&req).await.unwrap();
            assert!(outcome.issued.is_some());
        }
        store.settle_all();
        let outcome = reconciler.poll(&req).await.unwrap();
        assert!(outcome.complete);
        assert!(store.indexes("Orders").is_empty());
        assert_eq!(store.rejected_mutations(), 0);
    }

    #[tokio::test]
    async fn test_poll_waits_for_unstable_table() {
        let store = store_with(SettleMode::Immediate, &[]);
        store.set_table_status("Orders", crate::model::TableStatus::Updating);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A")]);

        let outcome = reconciler(&store).poll(&req).await.unwrap();
        assert!(!outcome.complete);
        assert!(outcome.issued.is_none());
        assert!(store.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_delete_poll_waits_for_unstable_table() {
        let store = store_with(SettleMode::Manual, &[gsi("GSI1", "A"), gsi("GSI2", "B")]);
        store.set_table_status("Orders", crate::model::TableStatus::Updating);
        let req = request(RequestKind::Delete, vec![gsi("GSI1", "A"), gsi("GSI2", "B")]);
        let reconciler = reconciler(&store);

        let outcome = reconciler.poll(&req).await.unwrap();
        assert!(!outcome.complete);
        assert!(outcome.issued.is_none());
        assert!(store.mutations().is_empty());

        store.set_table_status("Orders", crate::model::TableStatus::Active);
        let outcome = reconciler.poll(&req).await.unwrap();
        assert!(!outcome.complete);
        assert_eq!(
            outcome.issued.map(|op| op.to_string()),
            Some("DELETE GSI1".to_string())
        );
        assert_eq!(store.mutations().len(), 1);
        assert_eq!(store.rejected_mutations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_for_table_stability_before_mutating() {
        let store = store_with(SettleMode::Manual, &[]);
        store.set_table_status("Orders", crate::model::TableStatus::Updating);
        let req = request(RequestKind::Create, vec![gsi("GSI1", "A")]);

        let flipper = store.clone();
        let flip = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            flipper.set_table_status("Orders", crate::model::TableStatus::Active);
        });

        let began = tokio::time::Instant::now();
        let outcome = reconciler(&store).start(&req).await.unwrap();
        flip.await.unwrap();

        assert!(began.elapsed() >= std::time::Duration::from_secs(5));
        assert!(!outcome.complete);
        assert_eq!(outcome.state, ReconcileState::OperationPendingStart);
        assert_eq!(store.mutations().len(), 1);
        assert_eq!(store.rejected_mutations(), 0);
    }

    #[tokio::test]
    async fn test_create_leaves_foreign_indexes_alone() {
        let store = store_with(SettleMode::Immediate, &[gsi("FOREIGN", "X")]);
        let req = request(RequestKind::Create, vec![]);

        let outcome = reconciler(&store).start(&req).await.unwrap();
        assert!(outcome.complete);
        assert_eq!(store.indexes("Orders").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_to_completion_counts_real_mutations() {
        let store = store_with(
            SettleMode::AfterReads(1),
            &[gsi("REKEY", "OLD"), gsi("DROP", "D")],
        );
        let req = request(RequestKind::Update, vec![gsi("REKEY", "NEW"), gsi("ADD", "N")])
            .with_prior_index_names(vec!["REKEY".to_string(), "DROP".to_string()]);

        let summary = reconciler(&store).reconcile_to_completion(&req).await.unwrap();
        // DELETE DROP, DELETE REKEY, CREATE REKEY, CREATE ADD
        assert_eq!(summary.operations_executed, 4);
        assert_eq!(summary.managed_indexes, vec!["REKEY", "ADD"]);
        assert_eq!(store.rejected_mutations(), 0);

        let names: Vec<String> = store
            .indexes("Orders")
            .into_iter()
            .map(|i| i.index_name)
            .collect();
        assert_eq!(names, vec!["REKEY", "ADD"]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_from_start() {
        let store = store_with(SettleMode::Immediate, &[]);
        store.fail_next(StoreError::with_code("ThrottlingException", "slow"), 10);
        let mut req = request(RequestKind::Create, vec![gsi("GSI1", "A")]);
        req.error_handling.max_retries = 2;

        let err = reconciler(&store).start(&req).await.unwrap_err();
        assert_eq!(err.error_code(), Some("ThrottlingException"));
        assert!(store.mutations().is_empty());
    }
}
