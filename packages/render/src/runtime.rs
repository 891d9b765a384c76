//! Host-facing renderer: one tokio task per request.
//!
//! The Renderer is responsible for:
//! - Bounding how many workers run at once
//! - Running each worker on its own task, isolated from the others
//! - Turning panics and deadlines into failure envelopes

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use crate::error::RenderError;
use crate::request::{RenderEnvelope, RenderRequest};
use crate::worker::{RenderShared, RenderWorker};

/// Unique identifier for a render worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned, waiting for a permit.
    Created,
    Running,
    /// Produced a success envelope.
    Finished,
    /// Produced a failure envelope.
    Failed,
}

/// Handle to a spawned worker.
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: WorkerId,
    state: Arc<Mutex<WorkerState>>,
    join: JoinHandle<RenderEnvelope>,
}

impl WorkerHandle {
    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    /// Wait for the envelope.
    ///
    /// A worker that panicked yields a failure envelope.
    pub async fn join(self) -> RenderEnvelope {
        match self.join.await {
            Ok(envelope) => envelope,
            Err(e) => {
                let e = RenderError::Panicked(e.to_string());
                error!(worker = %self.id, error = %e, "render worker aborted");
                *self.state.lock().await = WorkerState::Failed;
                RenderEnvelope::failure(&e)
            }
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Maximum number of concurrently running workers.
    pub max_workers: usize,

    /// Deadline for a whole render. `None` waits indefinitely.
    pub prepare_timeout: Option<Duration>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_workers: 1024,
            prepare_timeout: None,
        }
    }
}

/// Runs render requests against shared, immutable inputs.
///
/// # Example
///
/// ```ignore
/// let renderer = Renderer::new(shared, RendererConfig::default());
/// let envelope = renderer.render(RenderRequest::new("/news")).await;
/// assert_eq!(envelope.status, 200);
/// ```
#[derive(Debug, Clone)]
pub struct Renderer {
    shared: Arc<RenderShared>,
    config: RendererConfig,
    permits: Arc<Semaphore>,
}

impl Renderer {
    pub fn new(shared: RenderShared, config: RendererConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_workers));
        Self {
            shared: Arc::new(shared),
            config,
            permits,
        }
    }

    pub fn shared(&self) -> &Arc<RenderShared> {
        &self.shared
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Start a worker on a new task.
    ///
    /// The worker waits for a permit before it renders.
    pub fn spawn(&self, request: RenderRequest) -> WorkerHandle {
        let id = WorkerId::new();
        let state = Arc::new(Mutex::new(WorkerState::Created));
        let span = info_span!("render", worker = %id, url = %request.url);

        let task_state = state.clone();
        let permits = self.permits.clone();
        let timeout = self.config.prepare_timeout;
        let worker = RenderWorker::new(self.shared.clone(), request);

        let join = tokio::spawn(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    *task_state.lock().await = WorkerState::Failed;
                    return RenderEnvelope::failure(&RenderError::Unavailable);
                };
                *task_state.lock().await = WorkerState::Running;

                let envelope = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, worker.run()).await {
                        Ok(envelope) => envelope,
                        Err(_) => {
                            let e = RenderError::Timeout(limit);
                            error!(error = %e, "render failed");
                            RenderEnvelope::failure(&e)
                        }
                    },
                    None => worker.run().await,
                };

                *task_state.lock().await = if envelope.is_success() {
                    WorkerState::Finished
                } else {
                    WorkerState::Failed
                };
                envelope
            }
            .instrument(span),
        );

        WorkerHandle { id, state, join }
    }

    /// Render one request to its envelope.
    pub async fn render(&self, request: RenderRequest) -> RenderEnvelope {
        self.spawn(request).join().await
    }

    /// Permits currently free.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}
