//! Data-loading effects registered during a render pass.
//!
//! An effect is keyed; registering a key that was already registered in this
//! render is a no-op, so re-rendering after the data arrived does not fetch
//! it again. Effects may register further effects while they run; those start
//! right away, so a parent may wait on a child it registered. `drain` keeps
//! going until nothing is running and nothing is pending.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, warn};

use prerender_store::BoxError;

use crate::error::{RenderError, Result};

/// A boxed prepare effect.
pub type PrepareEffect = BoxFuture<'static, std::result::Result<(), BoxError>>;

#[derive(Default)]
struct QueueState {
    pending: Vec<(String, PrepareEffect)>,
    seen: BTreeSet<String>,
    executed: Vec<String>,
}

/// Per-render queue of prepare effects.
///
/// Clones share the queue, so an effect can hold one and register
/// dependents.
#[derive(Clone, Default)]
pub struct PrepareQueue {
    inner: Arc<Mutex<QueueState>>,
    /// Signalled on every registration so a running drain picks it up.
    registered: Arc<Notify>,
}

impl PrepareQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `effect` under `key`.
    ///
    /// Returns `false` and drops the effect if the key was already
    /// registered in this render.
    pub fn register<F>(&self, key: impl Into<String>, effect: F) -> bool
    where
        F: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        let key = key.into();
        {
            let mut state = self.lock();
            if !state.seen.insert(key.clone()) {
                return false;
            }
            state.pending.push((key, effect.boxed()));
        }
        self.registered.notify_one();
        true
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.lock().seen.contains(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.lock().pending.is_empty()
    }

    /// Keys of the effects started so far, in start order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    fn take_pending(&self) -> Vec<(String, PrepareEffect)> {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending);
        state
            .executed
            .extend(pending.iter().map(|(key, _)| key.clone()));
        pending
    }

    /// Run every pending effect, and every effect those register, to
    /// completion.
    ///
    /// Effects run concurrently. All of them are awaited even if one fails;
    /// the first failure is returned. Returns the number of effects run.
    pub async fn drain(&self) -> Result<usize> {
        let mut running = FuturesUnordered::new();
        let mut ran = 0;
        let mut failure: Option<RenderError> = None;

        loop {
            for (key, effect) in self.take_pending() {
                debug!(key = %key, "running prepare effect");
                ran += 1;
                running.push(async move { (key, effect.await) });
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                finished = running.next() => match finished {
                    Some((_, Ok(()))) => {}
                    Some((key, Err(source))) => {
                        warn!(key = %key, error = %source, "prepare effect failed");
                        if failure.is_none() {
                            failure = Some(RenderError::Prepare { key, source });
                        }
                    }
                    None => {}
                },
                // A running effect registered another; start it now.
                _ = self.registered.notified() => {}
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(ran),
        }
    }
}

impl std::fmt::Debug for PrepareQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("PrepareQueue")
            .field("pending", &state.pending.len())
            .field("seen", &state.seen)
            .field("executed", &state.executed)
            .finish()
    }
}
