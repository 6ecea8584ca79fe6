//! Benchmark cluster handle
//!
//! Holds the control node's address, the addresses of the nodes that may host
//! the benchmark dataset, and a factory for the control-service client. The
//! client is built on first use and shared afterwards, so every caller (the
//! scenario, a test flipping fault knobs) sees the same instance.

use crate::control::ControlService;
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

type ClientFactory<C> = Box<dyn Fn() -> C + Send + Sync>;

/// Handle on the cluster under test
pub struct BenchmarkCluster<C> {
    control_node_address: IpAddr,
    node_addresses: BTreeSet<IpAddr>,
    factory: ClientFactory<C>,
    client: OnceLock<Arc<C>>,
}

impl<C: ControlService> BenchmarkCluster<C> {
    /// Create a handle
    ///
    /// `factory` is called at most once, the first time the control service is
    /// requested.
    pub fn new(
        control_node_address: IpAddr,
        factory: impl Fn() -> C + Send + Sync + 'static,
        node_addresses: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        Self {
            control_node_address,
            node_addresses: node_addresses.into_iter().collect(),
            factory: Box::new(factory),
            client: OnceLock::new(),
        }
    }

    pub fn control_node_address(&self) -> IpAddr {
        self.control_node_address
    }

    pub fn node_addresses(&self) -> &BTreeSet<IpAddr> {
        &self.node_addresses
    }

    /// Shared control-service client
    pub fn control_service(&self) -> Arc<C> {
        Arc::clone(self.client.get_or_init(|| Arc::new((self.factory)())))
    }
}

impl<C> fmt::Debug for BenchmarkCluster<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkCluster")
            .field("control_node_address", &self.control_node_address)
            .field("node_addresses", &self.node_addresses)
            .field("client_initialized", &self.client.get().is_some())
            .finish()
    }
}
