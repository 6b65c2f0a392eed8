use serde::Serialize;
use strum_macros::Display;
use tracing::debug;

use super::queue::OperationQueue;
use super::topology::{ServiceInfo, TopologyCache};
use super::types::{ConnectionHandle, DeviceId};

/// Lifecycle of one device connection.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    DiscoveringServices,
    Ready,
    Disconnecting,
}

impl ConnectionState {
    /// Returns whether `next` may follow `self`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{
            Connected, Connecting, Disconnected, Disconnecting, DiscoveringServices, Ready,
        };

        match (self, next) {
            (Disconnected, Connecting)
            | (Connecting, Connected)
            | (Connected, DiscoveringServices)
            | (DiscoveringServices, Ready) => true,
            (Disconnected, Disconnected | Disconnecting) => false,
            (_, Disconnected | Disconnecting) => true,
            _ => false,
        }
    }

    /// Returns whether the link to the peripheral is established.
    #[must_use]
    pub fn is_link_up(self) -> bool {
        matches!(self, Self::Connected | Self::DiscoveringServices | Self::Ready)
    }
}

/// Attempted transition that the lifecycle does not allow.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) struct IllegalTransition {
    pub(crate) from: ConnectionState,
    pub(crate) to: ConnectionState,
}

/// One device's connection, owning its topology cache and operation queue.
#[derive(Debug)]
pub(crate) struct Connection {
    handle: ConnectionHandle,
    name: Option<String>,
    state: ConnectionState,
    topology: TopologyCache,
    queue: OperationQueue,
    mtu: Option<u16>,
}

impl Connection {
    /// Creates a connection for a freshly requested attempt.
    pub(crate) fn connecting(handle: ConnectionHandle, name: Option<String>) -> Self {
        Self {
            handle,
            name,
            state: ConnectionState::Connecting,
            topology: TopologyCache::default(),
            queue: OperationQueue::default(),
            mtu: None,
        }
    }

    pub(crate) fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub(crate) fn device(&self) -> &DeviceId {
        self.handle.device()
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub(crate) fn mtu(&self) -> Option<u16> {
        self.mtu
    }

    pub(crate) fn set_mtu(&mut self, mtu: u16) {
        self.mtu = Some(mtu);
    }

    pub(crate) fn topology(&self) -> &TopologyCache {
        &self.topology
    }

    pub(crate) fn topology_mut(&mut self) -> &mut TopologyCache {
        &mut self.topology
    }

    pub(crate) fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    pub(crate) fn queue_mut(&mut self) -> &mut OperationQueue {
        &mut self.queue
    }

    /// `Connecting -> Connected`.
    pub(crate) fn on_link_up(&mut self) -> Result<(), IllegalTransition> {
        self.transition(ConnectionState::Connected)
    }

    /// `Connected -> DiscoveringServices`.
    pub(crate) fn begin_discovery(&mut self) -> Result<(), IllegalTransition> {
        self.transition(ConnectionState::DiscoveringServices)
    }

    /// `DiscoveringServices -> Ready`, caching the discovered tree.
    pub(crate) fn on_services_discovered(
        &mut self,
        services: &[ServiceInfo],
    ) -> Result<(), IllegalTransition> {
        self.transition(ConnectionState::Ready)?;
        self.topology.record(services);
        Ok(())
    }

    pub(crate) fn begin_disconnect(&mut self) -> Result<(), IllegalTransition> {
        self.transition(ConnectionState::Disconnecting)
    }

    /// Moves to `Disconnected`, clearing the cache and queue together.
    ///
    /// Returns the number of operations that were dropped.
    pub(crate) fn teardown(&mut self) -> usize {
        if self.state != ConnectionState::Disconnected {
            self.log_transition(ConnectionState::Disconnected);
            self.state = ConnectionState::Disconnected;
        }
        self.topology.clear();
        self.mtu = None;
        self.queue.clear()
    }

    fn transition(&mut self, next: ConnectionState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.log_transition(next);
        self.state = next;
        Ok(())
    }

    fn log_transition(&self, next: ConnectionState) {
        debug!(
            device = %self.handle.device(),
            generation = self.handle.generation(),
            from = %self.state,
            to = %next,
            "connection state changed"
        );
    }
}
