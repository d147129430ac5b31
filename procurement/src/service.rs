//! Request-scoped service tying the reducer to its collaborators.
//!
//! Every command reads the request fresh from the store, runs it through a
//! runtime [`Store`] seeded with that read and reports the outcome. Version
//! conflicts can be retried with [`ProcurementService::transition_with_retry`];
//! guard failures never are.

use crate::actor::ActorDirectory;
use crate::config::Config;
use crate::engine::LifecycleEngine;
use crate::error::LifecycleError;
use crate::export::{ExportOptions, ExportSummary};
use crate::reducer::{ProcurementAction, ProcurementEnvironment, ProcurementReducer, ProcurementState};
use crate::store::{RequestStore, VersionedRequest};
use crate::timeline::{Timeline, TimelineReconstructor};
use crate::types::{ActorRef, ProcurementRequest, RequestStatus, StageRecord};
use kimbo_core::environment::Clock;
use kimbo_core::identity::{RequestId, Version};
use kimbo_runtime::Store;
use kimbo_runtime::metrics::TransitionMetrics;
use kimbo_runtime::retry::{RetryPolicy, retry_with_predicate};
use std::sync::Arc;

/// Runtime store specialised for procurement requests.
pub type ProcurementStore =
    Store<ProcurementState, ProcurementAction, ProcurementEnvironment, ProcurementReducer>;

/// Entry point for lifecycle commands and read models.
#[derive(Clone)]
pub struct ProcurementService {
    environment: ProcurementEnvironment,
    directory: Arc<dyn ActorDirectory>,
    retry: RetryPolicy,
    export: ExportOptions,
}

impl ProcurementService {
    /// Service with default retry policy and English wording.
    pub fn new(
        store: Arc<dyn RequestStore>,
        clock: Arc<dyn Clock>,
        directory: Arc<dyn ActorDirectory>,
    ) -> Self {
        Self {
            environment: ProcurementEnvironment::new(store, clock),
            directory,
            retry: RetryPolicy::default(),
            export: ExportOptions::default(),
        }
    }

    /// Apply the retry policy and wording of `config`.
    #[must_use]
    pub fn with_config(mut self, config: &Config) -> Self {
        self.retry = config.retry_policy();
        self.export = config.export_options();
        self
    }

    /// Replace the lifecycle engine.
    #[must_use]
    pub fn with_engine(mut self, engine: LifecycleEngine) -> Self {
        self.environment.engine = engine;
        self
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn runtime(&self, state: ProcurementState) -> ProcurementStore {
        Store::new(state, ProcurementReducer::new(), self.environment.clone())
    }

    /// Store a new request.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] when the reference is blank
    /// - [`LifecycleError::Store`] when the id is already taken
    #[tracing::instrument(skip_all, fields(request_id = %request.id()))]
    pub async fn create(&self, request: ProcurementRequest) -> Result<Version, LifecycleError> {
        let store = self.runtime(ProcurementState::default());
        store.send(ProcurementAction::Create { request }).await;

        store
            .state(|state| match &state.last_error {
                Some(error) => Err(error.clone()),
                None => Ok(state.version),
            })
            .await
    }

    /// Read a request.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] if no request has this id.
    pub async fn request(&self, id: &RequestId) -> Result<ProcurementRequest, LifecycleError> {
        Ok(self.environment.store.read_request(id).await?.request)
    }

    /// Move a request to `target` and return the stage record written.
    ///
    /// One attempt: the request is read, evaluated and written against the
    /// version it was read at.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::IllegalTransition`] when `target` is not reachable
    /// - [`LifecycleError::Validation`] when a justification guard fails
    /// - [`LifecycleError::Conflict`] when the request changed since it was read
    /// - [`LifecycleError::NotFound`] if no request has this id
    #[tracing::instrument(skip_all, fields(request_id = %id, %target))]
    pub async fn transition(
        &self,
        id: &RequestId,
        target: RequestStatus,
        actor: Option<ActorRef>,
        justification: Option<&str>,
    ) -> Result<StageRecord, LifecycleError> {
        let VersionedRequest { request, version } = self.environment.store.read_request(id).await?;

        let store = self.runtime(ProcurementState::loaded(request, version));
        store
            .send(ProcurementAction::Transition {
                request_id: id.clone(),
                target,
                actor,
                justification: justification.map(str::to_string),
            })
            .await;

        store
            .state(|state| {
                if let Some(error) = &state.last_error {
                    return Err(error.clone());
                }
                state
                    .last_transition
                    .as_ref()
                    .map(|transition| transition.record.clone())
                    .ok_or_else(|| LifecycleError::Runtime("transition produced no outcome".into()))
            })
            .await
    }

    /// [`transition`](Self::transition), retried on version conflicts.
    ///
    /// Each retry re-reads the request and re-evaluates the guards, so a
    /// transition that became illegal in the meantime fails as such.
    ///
    /// # Errors
    ///
    /// Same as [`transition`](Self::transition); a conflict is only returned
    /// once the retry policy is exhausted.
    pub async fn transition_with_retry(
        &self,
        id: &RequestId,
        target: RequestStatus,
        actor: Option<ActorRef>,
        justification: Option<&str>,
    ) -> Result<StageRecord, LifecycleError> {
        retry_with_predicate(
            self.retry.clone(),
            || self.transition(id, target, actor.clone(), justification),
            LifecycleError::is_retryable,
        )
        .await
    }

    /// Timeline of a request in the configured locale.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] if no request has this id.
    #[tracing::instrument(skip_all, fields(request_id = %id))]
    pub async fn timeline(&self, id: &RequestId) -> Result<Timeline, LifecycleError> {
        let request = self.request(id).await?;
        let timeline =
            TimelineReconstructor::new(self.export.locale).reconstruct(&request, self.directory.as_ref());
        TransitionMetrics::record_timeline(timeline.len());
        Ok(timeline)
    }

    /// Document summary of a request.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::NotFound`] if no request has this id.
    #[tracing::instrument(skip_all, fields(request_id = %id))]
    pub async fn export_summary(&self, id: &RequestId) -> Result<ExportSummary, LifecycleError> {
        let request = self.request(id).await?;
        Ok(ExportSummary::from_request(
            &request,
            self.directory.as_ref(),
            &self.export,
        ))
    }
}
