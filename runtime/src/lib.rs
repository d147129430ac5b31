//! # KIMBO Runtime
//!
//! Store runtime for the procurement lifecycle.
//!
//! The [`Store`] owns a state value, runs the reducer for every action and
//! then drives the returned effects to completion. Actions produced by
//! effects are fed back into the reducer and broadcast to subscribers.
//!
//! Unlike a fire-and-forget runtime, [`Store::send`] resolves only once the
//! whole feedback chain has settled, so a caller that sends a transition
//! command can read the persisted outcome immediately afterwards.
//!
//! ## Example
//!
//! ```ignore
//! use kimbo_runtime::Store;
//!
//! let store = Store::new(ProcurementState::default(), ProcurementReducer::new(), env);
//!
//! store.send(ProcurementAction::Transition { .. }).await?;
//!
//! let status = store.state(|s| s.request.as_ref().map(|r| r.status)).await;
//! ```

use futures::future::{BoxFuture, FutureExt, join_all};
use kimbo_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, broadcast};

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

use metrics::{EffectMetrics, ReducerMetrics};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RuntimeError {
        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is observed.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::RuntimeError;

const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// The Store: owns state, runs the reducer and executes effects.
///
/// Cloning a `Store` is cheap and yields a handle onto the same state.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer type
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: Arc<R>,
    environment: Arc<E>,
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: Arc::clone(&self.reducer),
            environment: Arc::clone(&self.environment),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    S: Send + Sync + 'static,
    A: Clone + Send + std::fmt::Debug + 'static,
    E: Send + Sync + 'static,
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer and environment.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, DEFAULT_BROADCAST_CAPACITY)
    }

    /// Create a store with a custom action broadcast capacity.
    ///
    /// Subscribers that fall more than `capacity` actions behind skip the
    /// oldest ones.
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer: Arc::new(reducer),
            environment: Arc::new(environment),
            action_broadcast,
        }
    }

    /// Send an action and drive its effects to completion.
    ///
    /// The reducer runs under the state write lock; effects run after the
    /// lock is released. Feedback actions are reduced in the order their
    /// effects complete.
    #[tracing::instrument(skip_all, name = "store_send")]
    pub async fn send(&self, action: A) {
        self.dispatch(action).await;
    }

    /// Send an action and wait for the first feedback action matching `predicate`.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Timeout`] if no matching action is observed in time
    /// - [`RuntimeError::ChannelClosed`] if the broadcast channel closed
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, RuntimeError>
    where
        F: Fn(&A) -> bool,
    {
        // Subscribe before sending so no feedback action is missed.
        let mut rx = self.action_broadcast.subscribe();

        tokio::time::timeout(timeout, async {
            self.send(action).await;
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Ok(action),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(RuntimeError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| RuntimeError::Timeout)?
    }

    /// Subscribe to every action produced by effects.
    ///
    /// Actions passed to [`send`](Self::send) directly are not broadcast.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Read a projection of the current state.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    fn dispatch(&self, action: A) -> BoxFuture<'_, ()> {
        async move {
            let effects = {
                let mut state = self.state.write().await;
                let started = Instant::now();
                let effects = self.reducer.reduce(&mut state, action, &self.environment);
                ReducerMetrics::record_action(started.elapsed());
                effects
            };

            for effect in effects {
                self.execute(effect).await;
            }
        }
        .boxed()
    }

    fn execute(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
        async move {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    join_all(effects.into_iter().map(|e| self.execute(e))).await;
                },
                Effect::Sequential(effects) => {
                    for e in effects {
                        self.execute(e).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    self.feed_back(*action).await;
                },
                Effect::Future(future) => {
                    let started = Instant::now();
                    let produced = future.await;
                    EffectMetrics::record_execution(started.elapsed());
                    if let Some(action) = produced {
                        self.feed_back(action).await;
                    }
                },
            }
        }
        .boxed()
    }

    async fn feed_back(&self, action: A) {
        tracing::trace!(?action, "Feeding action back into reducer");
        // No subscribers is the common case and not an error.
        let _ = self.action_broadcast.send(action.clone());
        self.dispatch(action).await;
    }
}
