//! Cooperative entity creation.
//!
//! The host creates entities over several frames. A task is started once and
//! polled from the host's update loop; it never blocks. Once the timeout
//! elapses the task settles on [`EntityHandle::Void`] instead of waiting
//! forever.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::task::Poll;
use std::time::{Duration, Instant};

use super::{Host, NodeId};

/// Outcome of a creation task. `Void` is the "failed / N/A" sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityHandle {
    Ready(NodeId),
    Void,
}

impl EntityHandle {
    pub fn node(self) -> Option<NodeId> {
        match self {
            EntityHandle::Ready(n) => Some(n),
            EntityHandle::Void => None,
        }
    }
}

#[derive(Debug)]
pub struct CreateTask {
    id: String,
    deadline: Instant,
    settled: Option<EntityHandle>,
}

impl CreateTask {
    /// Ask the host for entity `id` of type `kind`. An id that already resolves
    /// settles immediately on the existing entity.
    pub fn start(
        host: &mut dyn Host,
        kind: &str,
        id: &str,
        timeout: Duration,
        now: Instant,
    ) -> Result<Self> {
        let mut task = CreateTask {
            id: id.to_string(),
            deadline: now + timeout,
            settled: None,
        };
        if let Some(node) = host.resolve_entity(id) {
            debug!("create {}: already present as {}", id, node);
            task.settled = Some(EntityHandle::Ready(node));
            return Ok(task);
        }
        host.begin_create(kind, id)
            .with_context(|| format!("begin create {} ({})", id, kind))?;
        Ok(task)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    /// Check progress. Call once per host frame.
    pub fn poll(&mut self, host: &dyn Host, now: Instant) -> Poll<EntityHandle> {
        if let Some(h) = self.settled {
            return Poll::Ready(h);
        }
        if let Some(node) = host.resolve_entity(&self.id) {
            self.settled = Some(EntityHandle::Ready(node));
        } else if now >= self.deadline {
            warn!("create {}: timed out", self.id);
            self.settled = Some(EntityHandle::Void);
        }
        match self.settled {
            Some(h) => Poll::Ready(h),
            None => Poll::Pending,
        }
    }
}
