//! Lifecycle event entry points
//!
//! The provisioning framework calls [`LifecycleHandler::on_event`] once per
//! create, update or delete and then [`LifecycleHandler::is_complete`]
//! repeatedly until it reports completion. Both take the same event; the
//! property bags are normalized here and nowhere else.

use crate::config::WaitConfig;
use crate::error::Result;
use crate::model::RequestKind;
use crate::properties::ResourceProperties;
use crate::reconciler::{CompletionData, ReconcileRequest, Reconciler};
use crate::store::IndexStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Event delivered by the provisioning framework
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    #[serde(alias = "requestType")]
    pub request_type: RequestKind,
    #[serde(default, alias = "physicalResourceId")]
    pub physical_resource_id: Option<String>,
    #[serde(default, alias = "resourceProperties")]
    pub resource_properties: ResourceProperties,
    /// Prior property bag, present on updates
    #[serde(default, alias = "oldResourceProperties")]
    pub old_resource_properties: Option<ResourceProperties>,
}

impl LifecycleEvent {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalize into a reconciliation request, failing with every problem
    /// found in the current property bag
    pub fn to_request(&self) -> Result<ReconcileRequest> {
        let declaration = self.resource_properties.normalize()?;
        let prior = match (self.request_type, &self.old_resource_properties) {
            (RequestKind::Update, Some(old)) => old.declared_index_names(),
            _ => Vec::new(),
        };
        Ok(ReconcileRequest::new(self.request_type, declaration)
            .with_prior_index_names(prior)
            .with_physical_id(self.physical_resource_id.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartResponse {
    pub physical_resource_id: String,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CompletionData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PollResponse {
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CompletionData>,
}

#[derive(Debug, Clone)]
pub struct LifecycleHandler {
    reconciler: Reconciler,
}

impl LifecycleHandler {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            reconciler: Reconciler::new(store),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.reconciler = self.reconciler.with_wait_config(wait);
        self
    }

    pub async fn on_event(&self, event: &LifecycleEvent) -> Result<StartResponse> {
        let request = event.to_request()?;
        tracing::info!(
            request = %request.kind,
            table = %request.table_name,
            indexes = request.desired.len(),
            "Lifecycle event received"
        );
        let outcome = self.reconciler.start(&request).await?;
        Ok(StartResponse {
            physical_resource_id: outcome.physical_id,
            is_complete: outcome.complete,
            data: outcome.data,
        })
    }

    pub async fn is_complete(&self, event: &LifecycleEvent) -> Result<PollResponse> {
        let request = event.to_request()?;
        let outcome = self.reconciler.poll(&request).await?;
        tracing::debug!(state = %outcome.state, complete = outcome.complete, "Polled");
        Ok(PollResponse {
            is_complete: outcome.complete,
            data: outcome.data,
        })
    }
}
