//! Control-service abstraction
//!
//! The load generator talks to a cluster only through the [`ControlService`]
//! trait. Any implementation works: a live API client or the in-memory
//! [`fake::FakeControlService`] used by tests and by the simulated cluster.
//!
//! # Concurrency
//!
//! The dispatcher keeps many calls in flight at once, each in its own task, so
//! implementations must be `Send + Sync` and tolerate concurrent outstanding
//! calls. Returned futures must be `Send`.

pub mod fake;

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::net::IpAddr;
use uuid::Uuid;

/// A cluster node as reported by the control service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    pub public_address: IpAddr,
}

/// Desired configuration of one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub dataset_id: Uuid,
    /// Node the dataset should live on
    pub primary: Uuid,
    pub maximum_size: Option<u64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Parameters of a `create_dataset` call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateDataset {
    pub primary: Uuid,
    pub maximum_size: Option<u64>,
    /// Id to use; the control service picks one when `None`
    pub dataset_id: Option<Uuid>,
    pub metadata: BTreeMap<String, String>,
    /// Optimistic-concurrency tag of the configuration being modified
    pub configuration_tag: Option<String>,
}

impl CreateDataset {
    pub fn on(primary: Uuid) -> Self {
        Self {
            primary,
            ..Default::default()
        }
    }
}

/// Control-service API consumed by the load generator
pub trait ControlService: Send + Sync + 'static {
    /// Create a dataset on `request.primary`
    fn create_dataset(
        &self,
        request: CreateDataset,
    ) -> impl Future<Output = Result<Dataset, ControlError>> + Send;

    /// Change the primary of an existing dataset
    fn move_dataset(
        &self,
        primary: Uuid,
        dataset_id: Uuid,
        configuration_tag: Option<String>,
    ) -> impl Future<Output = Result<Dataset, ControlError>> + Send;

    /// Current desired configuration of every dataset
    fn list_datasets_configuration(
        &self,
    ) -> impl Future<Output = Result<Vec<Dataset>, ControlError>> + Send;

    /// Nodes known to the control service
    fn list_nodes(&self) -> impl Future<Output = Result<Vec<Node>, ControlError>> + Send;
}
