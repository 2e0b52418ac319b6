//! Global secondary index reconciliation for DynamoDB
//!
//! This crate converges the global secondary indexes of a table onto a
//! declared set while respecting the store's rule that only one index
//! mutation may be in flight per table:
//!
//! - [`planner`]: pure diff of observed indexes against the declaration
//! - [`ownership`]: which observed indexes a declaration may touch
//! - [`reconciler`]: resumable `start`/`poll` state machine plus a blocking
//!   single-shot path
//! - [`store`]: the [`IndexStore`] seam, the retrying [`StoreAdapter`], and the
//!   DynamoDB and in-memory implementations
//! - [`lifecycle`]: framework-facing event handling
//!
//! ## Features
//!
//! - `dynamodb` (default): Enable the DynamoDB store backend
//!
//! ## Usage
//!
//! ```ignore
//! use gsi_manager::store::dynamodb::{DynamoDbConfig, DynamoDbIndexStore};
//! use gsi_manager::{LifecycleEvent, LifecycleHandler};
//!
//! let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
//! let store = DynamoDbIndexStore::new(&sdk_config, DynamoDbConfig::default());
//! let handler = LifecycleHandler::new(Arc::new(store));
//!
//! let event = LifecycleEvent::from_json(&payload)?;
//! let response = handler.on_event(&event).await?;
//! ```

pub mod backoff;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod ownership;
pub mod planner;
pub mod properties;
pub mod reconciler;
pub mod store;
pub mod validation;

pub use config::{ErrorHandlingConfig, WaitConfig};
pub use error::{GsiError, Result, StoreError};
pub use lifecycle::{LifecycleEvent, LifecycleHandler, PollResponse, StartResponse};
pub use model::{
    AttributeDefinition, AttributeType, IndexConfiguration, IndexInfo, IndexStatus, Operation,
    OperationKind, ProjectionType, ProvisionedThroughput, RequestKind,
};
pub use properties::{Declaration, ResourceProperties};
pub use reconciler::{
    CompletionData, PollOutcome, Preview, ReconcileRequest, ReconcileState, ReconcileSummary,
    Reconciler, StartOutcome,
};
pub use store::{IndexStore, StoreAdapter, TableDescription};

#[cfg(feature = "dynamodb")]
pub use store::dynamodb::{DynamoDbConfig, DynamoDbIndexStore};
