use std::collections::VecDeque;

use serde::Serialize;

use super::value::WriteMode;

/// One GATT request that occupies the connection's single in-flight slot.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) enum GattOperation {
    Read {
        uuid: String,
    },
    Write {
        uuid: String,
        payload: Vec<u8>,
        mode: WriteMode,
    },
    DescriptorWrite {
        characteristic_uuid: String,
        descriptor_uuid: String,
        value: [u8; 2],
        enable: bool,
    },
}

impl GattOperation {
    pub(crate) fn characteristic_uuid(&self) -> &str {
        match self {
            Self::Read { uuid } | Self::Write { uuid, .. } => uuid,
            Self::DescriptorWrite {
                characteristic_uuid,
                ..
            } => characteristic_uuid,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::DescriptorWrite { .. } => "descriptor_write",
        }
    }
}

/// Immediate outcome of submitting an operation.
///
/// `Queued` means accepted but not yet sent; the terminal event follows once
/// the operations ahead of it complete.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationOutcome {
    Dispatched,
    Queued { position: usize },
}

/// Result of releasing the in-flight slot.
#[derive(Debug, Default, Eq, PartialEq)]
pub(crate) struct Completion {
    pub(crate) finished: Option<GattOperation>,
    pub(crate) next: Option<GattOperation>,
}

/// FIFO that keeps at most one operation outstanding on a connection.
#[derive(Debug, Default)]
pub(crate) struct OperationQueue {
    in_flight: Option<GattOperation>,
    pending: VecDeque<GattOperation>,
}

impl OperationQueue {
    /// Submits an operation.
    ///
    /// Returns the operation back when the slot was idle and it must be sent
    /// now; otherwise it waits at the tail.
    pub(crate) fn enqueue(&mut self, operation: GattOperation) -> (OperationOutcome, Option<GattOperation>) {
        if self.in_flight.is_none() {
            self.in_flight = Some(operation.clone());
            return (OperationOutcome::Dispatched, Some(operation));
        }

        self.pending.push_back(operation);
        (
            OperationOutcome::Queued {
                position: self.pending.len(),
            },
            None,
        )
    }

    /// Releases the in-flight slot and promotes the head of the FIFO.
    pub(crate) fn complete(&mut self) -> Completion {
        let finished = self.in_flight.take();
        let next = self.pending.pop_front();
        self.in_flight.clone_from(&next);
        Completion { finished, next }
    }

    pub(crate) fn in_flight(&self) -> Option<&GattOperation> {
        self.in_flight.as_ref()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.pending.is_empty()
    }

    /// Drops the in-flight marker and every queued operation.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.pending.len() + usize::from(self.in_flight.is_some());
        self.in_flight = None;
        self.pending.clear();
        dropped
    }
}
