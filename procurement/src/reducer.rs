//! Procurement reducer.
//!
//! Commands are validated against the loaded request by the lifecycle
//! engine. A transition that passes every guard becomes a store write
//! effect stating the version the request was read at; the write's outcome
//! comes back as an event and is only then applied to state.

use crate::engine::LifecycleEngine;
use crate::error::{GuardFailure, LifecycleError};
use crate::store::{RequestStore, StageWrite};
use crate::types::{
    ActorRef, GuardResult, ProcurementRequest, RequestStatus, StageTransition, TransitionRecord,
};
use kimbo_core::effect::Effect;
use kimbo_core::environment::Clock;
use kimbo_core::identity::{RequestId, Version};
use kimbo_core::reducer::Reducer;
use kimbo_core::{SmallVec, smallvec};
use kimbo_runtime::metrics::TransitionMetrics;
use std::sync::Arc;

/// Environment for the procurement reducer
#[derive(Clone)]
pub struct ProcurementEnvironment {
    /// Request persistence
    pub store: Arc<dyn RequestStore>,
    /// Clock stamping every stage record
    pub clock: Arc<dyn Clock>,
    /// Guard evaluation
    pub engine: LifecycleEngine,
}

impl ProcurementEnvironment {
    /// Creates a new environment with the standard engine
    pub fn new(store: Arc<dyn RequestStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            engine: LifecycleEngine::new(),
        }
    }
}

/// State of one procurement request as seen by the reducer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcurementState {
    /// Loaded request, `None` before creation
    pub request: Option<ProcurementRequest>,
    /// Version the request was read or last written at
    pub version: Version,
    /// Every attempted transition, passed or refused
    pub attempts: Vec<TransitionRecord>,
    /// Last persisted transition
    pub last_transition: Option<StageTransition>,
    /// Error of the last command, cleared by the next success
    pub last_error: Option<LifecycleError>,
}

impl ProcurementState {
    /// State holding `request` read at `version`.
    #[must_use]
    pub fn loaded(request: ProcurementRequest, version: Version) -> Self {
        Self {
            request: Some(request),
            version,
            ..Self::default()
        }
    }

    /// Current status of the loaded request.
    #[must_use]
    pub fn status(&self) -> Option<RequestStatus> {
        self.request.as_ref().map(ProcurementRequest::status)
    }
}

/// Actions processed by the procurement reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcurementAction {
    // ========== Commands ==========
    /// Store a new draft request
    Create {
        /// Request to store
        request: ProcurementRequest,
    },

    /// Move the loaded request to `target`
    Transition {
        /// Request the command is addressed to
        request_id: RequestId,
        /// Requested status
        target: RequestStatus,
        /// User performing the action
        actor: Option<ActorRef>,
        /// Free-text reason, mandatory for refusals and cancellations
        justification: Option<String>,
    },

    // ========== Events ==========
    /// The request was stored
    RequestCreated {
        /// Stored request
        request: ProcurementRequest,
        /// Version it was stored at
        version: Version,
    },

    /// A transition was written
    TransitionPersisted {
        /// Written transition
        transition: StageTransition,
        /// Version after the write
        version: Version,
    },

    /// The store refused a write
    PersistenceFailed {
        /// Store error
        error: LifecycleError,
    },
}

/// Reducer implementing the procurement lifecycle
#[derive(Clone, Debug, Default)]
pub struct ProcurementReducer;

impl ProcurementReducer {
    /// Creates a new procurement reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn refuse(
        state: &mut ProcurementState,
        error: LifecycleError,
    ) -> SmallVec<[Effect<ProcurementAction>; 4]> {
        tracing::warn!(%error, "Command refused");
        state.last_error = Some(error);
        smallvec![Effect::None]
    }

    fn create_effect(
        store: Arc<dyn RequestStore>,
        request: ProcurementRequest,
    ) -> Effect<ProcurementAction> {
        Effect::Future(Box::pin(async move {
            match store.create_request(request.clone()).await {
                Ok(version) => Some(ProcurementAction::RequestCreated { request, version }),
                Err(error) => Some(ProcurementAction::PersistenceFailed {
                    error: error.into(),
                }),
            }
        }))
    }

    fn write_effect(
        store: Arc<dyn RequestStore>,
        expected: Version,
        transition: StageTransition,
    ) -> Effect<ProcurementAction> {
        Effect::Future(Box::pin(async move {
            let write = StageWrite {
                status: transition.audit.to,
                stage: transition.stage,
                record: transition.record.clone(),
            };
            match store
                .write_transition(&transition.request_id, expected, write)
                .await
            {
                Ok(version) => Some(ProcurementAction::TransitionPersisted {
                    transition,
                    version,
                }),
                Err(error) => Some(ProcurementAction::PersistenceFailed {
                    error: error.into(),
                }),
            }
        }))
    }
}

impl Reducer for ProcurementReducer {
    type State = ProcurementState;
    type Action = ProcurementAction;
    type Environment = ProcurementEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            ProcurementAction::Create { request } => {
                if request.reference().trim().is_empty() {
                    return Self::refuse(
                        state,
                        GuardFailure::MissingField { field: "reference" }.into(),
                    );
                }

                state.last_error = None;
                smallvec![Self::create_effect(Arc::clone(&env.store), request)]
            },

            ProcurementAction::Transition {
                request_id,
                target,
                actor,
                justification,
            } => {
                let Some(request) = state.request.as_ref().filter(|r| r.id() == &request_id)
                else {
                    return Self::refuse(state, LifecycleError::NotFound(request_id));
                };

                let from = request.status();
                let outcome = env.engine.apply(
                    request,
                    target,
                    actor,
                    justification.as_deref(),
                    env.clock.now(),
                );

                match outcome {
                    Ok(transition) => {
                        state.attempts.push(transition.audit.clone());
                        state.last_error = None;
                        smallvec![Self::write_effect(
                            Arc::clone(&env.store),
                            state.version,
                            transition,
                        )]
                    },
                    Err(error) => {
                        TransitionMetrics::record_guard_failure(error.kind());
                        state.attempts.push(TransitionRecord {
                            from,
                            to: target,
                            guard: GuardResult::Failed(error.clone()),
                            superseded: false,
                        });
                        state.last_error = Some(error);
                        smallvec![Effect::None]
                    },
                }
            },

            // ========== Events ==========
            ProcurementAction::RequestCreated { request, version } => {
                tracing::info!(request_id = %request.id(), %version, "Request created");
                state.request = Some(request);
                state.version = version;
                smallvec![Effect::None]
            },

            ProcurementAction::TransitionPersisted {
                transition,
                version,
            } => {
                let Some(request) = state.request.as_mut() else {
                    return Self::refuse(
                        state,
                        LifecycleError::NotFound(transition.request_id),
                    );
                };

                if let Err(error) = request.apply_transition(&transition) {
                    return Self::refuse(state, error);
                }

                tracing::info!(
                    request_id = %transition.request_id,
                    from = %transition.audit.from,
                    to = %transition.audit.to,
                    stage = %transition.stage,
                    %version,
                    "Transition applied"
                );
                TransitionMetrics::record_applied(transition.audit.to.as_str());
                state.version = version;
                state.last_transition = Some(transition);
                smallvec![Effect::None]
            },

            ProcurementAction::PersistenceFailed { error } => {
                if error.is_retryable() {
                    TransitionMetrics::record_conflict();
                }
                Self::refuse(state, error)
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::store::InMemoryRequestStore;
    use crate::types::{StageKind, StageRecord};
    use kimbo_testing::assertions::{assert_has_future_effect, assert_no_effects};
    use kimbo_testing::{ReducerTest, test_clock, test_epoch};

    fn env() -> ProcurementEnvironment {
        ProcurementEnvironment::new(Arc::new(InMemoryRequestStore::new()), Arc::new(test_clock()))
    }

    fn draft() -> ProcurementRequest {
        ProcurementRequest::create(RequestId::new("da-1"), "DA-2025-0001", None, test_epoch())
    }

    fn transition(target: RequestStatus, justification: Option<&str>) -> ProcurementAction {
        ProcurementAction::Transition {
            request_id: RequestId::new("da-1"),
            target,
            actor: Some(ActorRef::new("u-1")),
            justification: justification.map(str::to_string),
        }
    }

    #[test]
    fn legal_transition_emits_store_write() {
        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::loaded(draft(), Version::new(1)))
            .when_action(transition(RequestStatus::Submitted, None))
            .then_state(|state| {
                assert_eq!(state.status(), Some(RequestStatus::Draft));
                assert_eq!(state.attempts.len(), 1);
                assert!(state.attempts[0].guard.is_passed());
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| assert_has_future_effect(effects))
            .run();
    }

    #[test]
    fn illegal_transition_is_recorded_without_effects() {
        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::loaded(draft(), Version::new(1)))
            .when_action(transition(RequestStatus::Paid, None))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::IllegalTransition {
                        from: RequestStatus::Draft,
                        to: RequestStatus::Paid,
                    })
                );
                assert!(!state.attempts[0].guard.is_passed());
                assert_eq!(state.status(), Some(RequestStatus::Draft));
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn short_cancellation_reason_is_refused() {
        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::loaded(draft(), Version::new(1)))
            .when_action(transition(RequestStatus::Cancelled, Some("too late")))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(GuardFailure::ReasonTooShort { min: 10, actual: 8 }.into())
                );
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn command_for_another_request_is_not_found() {
        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::default())
            .when_action(transition(RequestStatus::Submitted, None))
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(LifecycleError::NotFound(RequestId::new("da-1")))
                );
                assert!(state.attempts.is_empty());
            })
            .run();
    }

    #[test]
    fn blank_reference_is_refused_on_create() {
        let request =
            ProcurementRequest::create(RequestId::new("da-2"), "  ", None, test_epoch());

        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::default())
            .when_action(ProcurementAction::Create { request })
            .then_state(|state| {
                assert_eq!(
                    state.last_error,
                    Some(GuardFailure::MissingField { field: "reference" }.into())
                );
            })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn persisted_transition_updates_status_stage_and_version() {
        let persisted = ProcurementAction::TransitionPersisted {
            transition: StageTransition {
                request_id: RequestId::new("da-1"),
                stage: StageKind::Submission,
                record: StageRecord::new(test_epoch()),
                audit: TransitionRecord {
                    from: RequestStatus::Draft,
                    to: RequestStatus::Submitted,
                    guard: GuardResult::Passed,
                    superseded: false,
                },
            },
            version: Version::new(2),
        };

        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::loaded(draft(), Version::new(1)))
            .when_action(persisted)
            .then_state(|state| {
                let request = state.request.as_ref().unwrap();
                assert_eq!(request.status(), RequestStatus::Submitted);
                assert!(request.stage(StageKind::Submission).is_some());
                assert_eq!(state.version, Version::new(2));
                assert!(state.last_transition.is_some());
            })
            .run();
    }

    #[test]
    fn conflict_is_kept_as_last_error() {
        let conflict = LifecycleError::Conflict {
            id: RequestId::new("da-1"),
            expected: Version::new(1),
            actual: Version::new(2),
        };

        ReducerTest::new(ProcurementReducer::new())
            .with_env(env())
            .given_state(ProcurementState::loaded(draft(), Version::new(1)))
            .when_action(ProcurementAction::PersistenceFailed {
                error: conflict.clone(),
            })
            .then_state(move |state| {
                assert_eq!(state.last_error, Some(conflict));
                assert_eq!(state.version, Version::new(1));
            })
            .run();
    }
}
