//! Lifecycle engine: guard evaluation and stage stamping.
//!
//! The engine is pure. It reads a request, checks the guards and describes
//! the write; it never touches storage and never mutates its input.

use crate::error::{GuardFailure, LifecycleError};
use crate::transitions::{MIN_JUSTIFICATION_CHARS, TransitionRule, transition_rule};
use crate::types::{
    ActorRef, GuardResult, ProcurementRequest, RequestStatus, StageRecord, StageTransition,
    TransitionRecord,
};
use chrono::{DateTime, Utc};

/// Guards passed for one transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guard {
    /// The legal edge taken
    pub rule: &'static TransitionRule,
    /// Trimmed note to store, if any
    pub note: Option<String>,
}

/// Evaluates transitions against the transition table.
#[derive(Clone, Copy, Debug)]
pub struct LifecycleEngine {
    min_justification_chars: usize,
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleEngine {
    /// Engine with the standard ten-character justification minimum.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_justification_chars: MIN_JUSTIFICATION_CHARS,
        }
    }

    /// Check the guards of `current -> target`.
    ///
    /// Legality is checked before the justification, so an illegal edge is
    /// always reported as such whatever the note.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::IllegalTransition`] when the edge is not in the table
    /// - [`LifecycleError::Validation`] when a mandatory justification is
    ///   missing or shorter than the minimum once trimmed
    pub fn evaluate(
        &self,
        current: RequestStatus,
        target: RequestStatus,
        justification: Option<&str>,
    ) -> Result<Guard, LifecycleError> {
        let rule = transition_rule(current, target).ok_or(LifecycleError::IllegalTransition {
            from: current,
            to: target,
        })?;

        let note = justification.map(str::trim).filter(|note| !note.is_empty());

        if rule.requires_justification {
            let Some(note) = note else {
                return Err(GuardFailure::MissingField {
                    field: "justification",
                }
                .into());
            };
            let actual = note.chars().count();
            if actual < self.min_justification_chars {
                return Err(GuardFailure::ReasonTooShort {
                    min: self.min_justification_chars,
                    actual,
                }
                .into());
            }
        }

        Ok(Guard {
            rule,
            note: note.map(str::to_string),
        })
    }

    /// Describe the write that moves `request` into `target`.
    ///
    /// The returned transition stamps `now`, the actor, the trimmed note and
    /// the outcome on the target slot only. A slot that already holds a
    /// record (re-pricing after a revision, a second revision request) is
    /// replaced and the audit entry is flagged as superseding it.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    pub fn apply(
        &self,
        request: &ProcurementRequest,
        target: RequestStatus,
        actor: Option<ActorRef>,
        justification: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StageTransition, LifecycleError> {
        let from = request.status();
        let guard = match self.evaluate(from, target, justification) {
            Ok(guard) => guard,
            Err(error) => {
                tracing::warn!(
                    request_id = %request.id(),
                    %from,
                    to = %target,
                    %error,
                    "Transition refused"
                );
                return Err(error);
            },
        };

        let superseded = request.stage(guard.rule.stage).is_some();
        if superseded {
            tracing::debug!(
                request_id = %request.id(),
                stage = %guard.rule.stage,
                "Replacing previously recorded stage"
            );
        }

        let record = StageRecord {
            occurred_at: now,
            actor,
            note: guard.note,
            outcome: guard.rule.outcome,
        };

        Ok(StageTransition {
            request_id: request.id().clone(),
            stage: guard.rule.stage,
            record,
            audit: TransitionRecord {
                from,
                to: target,
                guard: GuardResult::Passed,
                superseded,
            },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::types::{StageKind, StageOutcome};
    use chrono::Duration;
    use kimbo_core::identity::RequestId;
    use kimbo_testing::test_epoch;

    fn request_in(status: RequestStatus) -> ProcurementRequest {
        ProcurementRequest::from_history(
            RequestId::new("da-1"),
            "DA-2025-0001",
            status,
            [(StageKind::Creation, StageRecord::new(test_epoch()))].into(),
        )
    }

    #[test]
    fn cancel_stamps_now_actor_and_note() {
        let engine = LifecycleEngine::new();
        let now = test_epoch() + Duration::hours(3);
        let request = request_in(RequestStatus::Draft);

        let transition = engine
            .apply(
                &request,
                RequestStatus::Cancelled,
                Some(ActorRef::new("u-7")),
                Some("No longer needed"),
                now,
            )
            .unwrap();

        assert_eq!(transition.stage, StageKind::Cancellation);
        assert_eq!(transition.record.occurred_at, now);
        assert_eq!(transition.record.actor, Some(ActorRef::new("u-7")));
        assert_eq!(transition.record.note.as_deref(), Some("No longer needed"));
        assert!(!transition.audit.superseded);
    }

    #[test]
    fn justification_boundary_is_ten_trimmed_chars() {
        let engine = LifecycleEngine::new();

        let nine = engine.evaluate(RequestStatus::Submitted, RequestStatus::Rejected, Some("  123456789  "));
        assert_eq!(
            nine,
            Err(LifecycleError::Validation(GuardFailure::ReasonTooShort { min: 10, actual: 9 }))
        );

        let ten = engine
            .evaluate(RequestStatus::Submitted, RequestStatus::Rejected, Some("  1234567890  "))
            .unwrap();
        assert_eq!(ten.note.as_deref(), Some("1234567890"));
    }

    #[test]
    fn justification_counts_characters_not_bytes() {
        let engine = LifecycleEngine::new();
        // Nine accented characters are eighteen bytes.
        let result = engine.evaluate(RequestStatus::Draft, RequestStatus::Cancelled, Some("ééééééééé"));
        assert!(matches!(
            result,
            Err(LifecycleError::Validation(GuardFailure::ReasonTooShort { actual: 9, .. }))
        ));
    }

    #[test]
    fn missing_justification_is_a_missing_field() {
        let engine = LifecycleEngine::new();
        for note in [None, Some("   ")] {
            assert_eq!(
                engine.evaluate(RequestStatus::Priced, RequestStatus::Cancelled, note),
                Err(LifecycleError::Validation(GuardFailure::MissingField { field: "justification" }))
            );
        }
    }

    #[test]
    fn legality_is_checked_before_justification() {
        let engine = LifecycleEngine::new();
        assert_eq!(
            engine.evaluate(RequestStatus::Paid, RequestStatus::Cancelled, None),
            Err(LifecycleError::IllegalTransition {
                from: RequestStatus::Paid,
                to: RequestStatus::Cancelled,
            })
        );
    }

    #[test]
    fn optional_note_is_kept_and_blank_dropped() {
        let engine = LifecycleEngine::new();
        let with_comment = engine
            .evaluate(RequestStatus::SubmittedForValidation, RequestStatus::ValidatedFinance, Some(" OK "))
            .unwrap();
        assert_eq!(with_comment.note.as_deref(), Some("OK"));

        let blank = engine
            .evaluate(RequestStatus::SubmittedForValidation, RequestStatus::ValidatedFinance, Some(""))
            .unwrap();
        assert_eq!(blank.note, None);
    }

    #[test]
    fn finance_approval_tags_the_outcome() {
        let engine = LifecycleEngine::new();
        let request = request_in(RequestStatus::SubmittedForValidation);
        let transition = engine
            .apply(&request, RequestStatus::ValidatedFinance, None, None, test_epoch())
            .unwrap();
        assert_eq!(transition.stage, StageKind::FinanceDecision);
        assert_eq!(transition.record.outcome, Some(StageOutcome::FinanceApproved));
    }

    #[test]
    fn repricing_after_revision_supersedes_the_slot() {
        let engine = LifecycleEngine::new();
        let mut stages: std::collections::BTreeMap<_, _> =
            [(StageKind::Creation, StageRecord::new(test_epoch()))].into();
        stages.insert(StageKind::Pricing, StageRecord::new(test_epoch()));
        let request = ProcurementRequest::from_history(
            RequestId::new("da-1"),
            "DA-1",
            RequestStatus::RevisionRequested,
            stages,
        );

        let transition = engine
            .apply(&request, RequestStatus::Priced, None, None, test_epoch() + Duration::days(1))
            .unwrap();
        assert!(transition.audit.superseded);
    }

    #[test]
    fn apply_never_mutates_the_request() {
        let engine = LifecycleEngine::new();
        let request = request_in(RequestStatus::Draft);
        let before = request.clone();
        let _ = engine.apply(&request, RequestStatus::Submitted, None, None, test_epoch());
        let _ = engine.apply(&request, RequestStatus::Paid, None, None, test_epoch());
        assert_eq!(request, before);
    }
}
