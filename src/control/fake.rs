//! In-memory control service
//!
//! `FakeControlService` keeps the cluster's dataset configuration in memory and
//! answers immediately, which makes scenario tests fast and deterministic. It
//! also backs the CLI's simulated cluster.
//!
//! # Fault knobs
//!
//! - [`DropPolicy`]: `move_dataset` calls that are dropped never complete
//! - unresponsive dataset creation: `create_dataset` never completes
//! - failing moves: `move_dataset` completes with an error
//! - response latency: every call sleeps on the tokio clock before answering
//!
//! Clones share state, so a test can keep a handle and flip knobs while a
//! scenario is running against another clone.
//!
//! # Example
//!
//! ```
//! use writepulse::control::fake::FakeControlService;
//! use writepulse::control::{ControlService, CreateDataset};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fake = FakeControlService::with_addresses(["10.0.0.1".parse().unwrap()]);
//! let node = fake.nodes()[0].clone();
//!
//! let dataset = fake.create_dataset(CreateDataset::on(node.uuid)).await.unwrap();
//! let datasets = fake.list_datasets_configuration().await.unwrap();
//! assert_eq!(datasets, vec![dataset]);
//! # });
//! ```

use super::{ControlService, CreateDataset, Dataset, Node};
use crate::error::ControlError;
use std::collections::BTreeMap;
use std::future::{self, Future};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Which `move_dataset` calls are silently dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Every call completes
    #[default]
    None,
    /// Every other call never completes
    Alternate,
    /// No call completes
    All,
}

#[derive(Debug, Default)]
struct FakeState {
    nodes: Vec<Node>,
    datasets: BTreeMap<Uuid, Dataset>,
    generation: u64,

    drop_policy: DropPolicy,
    dropped_last: bool,
    unresponsive_creation: bool,
    fail_moves: bool,
    latency: Duration,

    moves_received: u64,
    moves_dropped: u64,
}

impl FakeState {
    fn should_drop_move(&mut self) -> bool {
        let drop = match self.drop_policy {
            DropPolicy::None => false,
            DropPolicy::All => true,
            DropPolicy::Alternate => !self.dropped_last,
        };
        self.dropped_last = drop;
        if drop {
            self.moves_dropped += 1;
        }
        drop
    }

    fn knows_node(&self, uuid: Uuid) -> bool {
        self.nodes.iter().any(|n| n.uuid == uuid)
    }

    fn check_tag(&self, tag: Option<&str>) -> Result<(), ControlError> {
        match tag {
            Some(tag) if tag != self.generation.to_string() => Err(ControlError::Rejected(format!(
                "configuration tag {} is stale (current {})",
                tag, self.generation
            ))),
            _ => Ok(()),
        }
    }

    fn create(&mut self, request: CreateDataset) -> Result<Dataset, ControlError> {
        self.check_tag(request.configuration_tag.as_deref())?;
        if !self.knows_node(request.primary) {
            return Err(ControlError::UnknownNode(request.primary));
        }

        let dataset_id = request.dataset_id.unwrap_or_else(Uuid::new_v4);
        if self.datasets.contains_key(&dataset_id) {
            return Err(ControlError::DatasetAlreadyExists(dataset_id));
        }

        let dataset = Dataset {
            dataset_id,
            primary: request.primary,
            maximum_size: request.maximum_size,
            metadata: request.metadata,
            deleted: false,
        };
        self.datasets.insert(dataset_id, dataset.clone());
        self.generation += 1;
        Ok(dataset)
    }

    fn relocate(
        &mut self,
        primary: Uuid,
        dataset_id: Uuid,
        tag: Option<&str>,
    ) -> Result<Dataset, ControlError> {
        self.check_tag(tag)?;
        if !self.knows_node(primary) {
            return Err(ControlError::UnknownNode(primary));
        }

        let dataset = self
            .datasets
            .get_mut(&dataset_id)
            .filter(|d| !d.deleted)
            .ok_or(ControlError::DatasetNotFound(dataset_id))?;
        dataset.primary = primary;
        let updated = dataset.clone();
        self.generation += 1;
        Ok(updated)
    }
}

/// In-memory control service with fault injection
#[derive(Debug, Clone, Default)]
pub struct FakeControlService {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeControlService {
    /// Create a fake cluster with the given nodes
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                nodes,
                ..Default::default()
            })),
        }
    }

    /// Create a fake cluster with one freshly identified node per address
    pub fn with_addresses(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        let nodes = addresses
            .into_iter()
            .map(|public_address| Node {
                uuid: Uuid::new_v4(),
                public_address,
            })
            .collect();
        Self::new(nodes)
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.inner)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.state().nodes.clone()
    }

    pub fn set_drop_policy(&self, policy: DropPolicy) {
        let mut state = self.state();
        state.drop_policy = policy;
        state.dropped_last = false;
    }

    /// Make `create_dataset` hang forever
    pub fn set_unresponsive_dataset_creation(&self, unresponsive: bool) {
        self.state().unresponsive_creation = unresponsive;
    }

    /// Make `move_dataset` complete with an error
    pub fn set_fail_moves(&self, fail: bool) {
        self.state().fail_moves = fail;
    }

    /// Delay every answer by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Tag to pass to a call that must not race other configuration changes
    pub fn configuration_tag(&self) -> String {
        self.state().generation.to_string()
    }

    /// `move_dataset` calls received, dropped ones included
    pub fn moves_received(&self) -> u64 {
        self.state().moves_received
    }

    pub fn moves_dropped(&self) -> u64 {
        self.state().moves_dropped
    }
}

fn lock(inner: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
    // A panicking test holding the lock must not hide the state from others
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn respond_after(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

impl ControlService for FakeControlService {
    fn create_dataset(
        &self,
        request: CreateDataset,
    ) -> impl Future<Output = Result<Dataset, ControlError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let (unresponsive, latency) = {
                let state = lock(&inner);
                (state.unresponsive_creation, state.latency)
            };
            if unresponsive {
                return future::pending().await;
            }
            respond_after(latency).await;
            lock(&inner).create(request)
        }
    }

    fn move_dataset(
        &self,
        primary: Uuid,
        dataset_id: Uuid,
        configuration_tag: Option<String>,
    ) -> impl Future<Output = Result<Dataset, ControlError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let (dropped, fail, latency) = {
                let mut state = lock(&inner);
                state.moves_received += 1;
                (state.should_drop_move(), state.fail_moves, state.latency)
            };
            if dropped {
                return future::pending().await;
            }
            respond_after(latency).await;
            if fail {
                return Err(ControlError::Transport("injected failure".to_string()));
            }
            lock(&inner).relocate(primary, dataset_id, configuration_tag.as_deref())
        }
    }

    fn list_datasets_configuration(
        &self,
    ) -> impl Future<Output = Result<Vec<Dataset>, ControlError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let latency = lock(&inner).latency;
            respond_after(latency).await;
            Ok(lock(&inner).datasets.values().cloned().collect())
        }
    }

    fn list_nodes(&self) -> impl Future<Output = Result<Vec<Node>, ControlError>> + Send {
        let inner = Arc::clone(&self.inner);
        async move {
            let latency = lock(&inner).latency;
            respond_after(latency).await;
            Ok(lock(&inner).nodes.clone())
        }
    }
}
