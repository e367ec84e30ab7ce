//! Fire-and-forget task dispatch
//!
//! Hardware refresh and connectivity tests run on an external worker. The
//! request path only enqueues a job and hands back an opaque handle; it never
//! waits for the result.

use bastion_core::AssetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AssetError, Result};

/// Background job concerning one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetJob {
    RefreshHardware { asset_id: AssetId },
    TestConnectivity { asset_id: AssetId },
}

impl AssetJob {
    /// Task name understood by the remote worker
    pub fn task_name(&self) -> &'static str {
        match self {
            AssetJob::RefreshHardware { .. } => "assets.tasks.update_asset_hardware_info_manual",
            AssetJob::TestConnectivity { .. } => "assets.tasks.test_asset_connectivity_manual",
        }
    }

    pub fn asset_id(&self) -> AssetId {
        match self {
            AssetJob::RefreshHardware { asset_id } | AssetJob::TestConnectivity { asset_id } => *asset_id,
        }
    }
}

/// Opaque handle of a dispatched task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(Uuid);

impl TaskHandle {
    pub fn new() -> Self {
        TaskHandle(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Job waiting for a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub handle: TaskHandle,
    pub job: AssetJob,
    pub queued_at: DateTime<Utc>,
}

/// Dispatches jobs without waiting for them
pub trait TaskDispatcher: Send + Sync {
    /// Enqueue `job` and return its handle immediately
    fn dispatch(&self, job: AssetJob) -> Result<TaskHandle>;
}

/// Dispatcher backed by an unbounded tokio channel
///
/// The receiving half is drained by whatever forwards jobs to the worker.
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<QueuedTask>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver its jobs arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TaskDispatcher for ChannelDispatcher {
    fn dispatch(&self, job: AssetJob) -> Result<TaskHandle> {
        let handle = TaskHandle::new();
        let task = QueuedTask {
            handle,
            job,
            queued_at: Utc::now(),
        };

        self.tx
            .send(task)
            .map_err(|_| AssetError::Dispatch("task queue is closed".to_string()))?;

        info!(task = %handle.id(), asset = job.asset_id(), task_name = job.task_name(), "Dispatched task");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_returns_immediately() {
        let (dispatcher, mut rx) = ChannelDispatcher::new();

        let h1 = dispatcher.dispatch(AssetJob::RefreshHardware { asset_id: 1 }).unwrap();
        let h2 = dispatcher.dispatch(AssetJob::TestConnectivity { asset_id: 2 }).unwrap();
        assert_ne!(h1, h2);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.handle, h1);
        assert_eq!(first.job.task_name(), "assets.tasks.update_asset_hardware_info_manual");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.job.asset_id(), 2);
    }

    #[test]
    fn test_dispatch_fails_when_queue_closed() {
        let (dispatcher, rx) = ChannelDispatcher::new();
        drop(rx);

        let err = dispatcher.dispatch(AssetJob::RefreshHardware { asset_id: 1 }).unwrap_err();
        assert!(matches!(err, AssetError::Dispatch(_)));
    }

    #[test]
    fn test_job_serialization() {
        let json = serde_json::to_value(AssetJob::TestConnectivity { asset_id: 3 }).unwrap();
        assert_eq!(json["kind"], "test_connectivity");
        assert_eq!(json["asset_id"], 3);
    }
}
