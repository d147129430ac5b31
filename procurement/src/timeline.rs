//! Timeline reconstruction.
//!
//! The timeline is derived from the stage records of a request on every
//! read and never stored. One event is emitted per recorded stage; stages
//! that have not happened produce nothing.
//!
//! Overloaded slots (finance decision, accounting outcome) are resolved from
//! the outcome tag of the record. Records without a tag, as imported from
//! legacy rows, are resolved from the request status. A slot that matches
//! neither is still emitted under a generic label so the audit trail stays
//! complete. Only an event whose meaning is the blocking status itself is
//! tagged current.

use crate::actor::{ActorDirectory, format_actor_name};
use crate::labels::Locale;
use crate::types::{ProcurementRequest, RequestStatus, StageKind, StageOutcome, StageRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Position of an event relative to the present state of the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Happened and is behind the request
    Completed,
    /// Embodies the status the request is blocked in
    Current,
    /// Not produced by reconstruction; stages that did not happen are absent
    Pending,
}

/// Presentation tone of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Neutral progress
    Primary,
    /// Needs attention
    Warning,
    /// Positive outcome
    Success,
    /// Hand-over to another department
    Accent,
    /// Adverse outcome
    Destructive,
}

/// Semantic meaning of a timeline event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Request created
    Created,
    /// Sent to procurement
    Submitted,
    /// Taken over by procurement
    AnalysisStarted,
    /// Quote recorded
    Priced,
    /// Sent to finance
    SubmittedForValidation,
    /// Approved by finance
    FinanceValidated,
    /// Refused by finance
    FinanceRefused,
    /// Sent back for revision
    RevisionRequested,
    /// Rejected by procurement
    Rejected,
    /// Payment recorded
    Paid,
    /// Rejected by accounting
    AccountingRejected,
    /// Withdrawn
    Cancelled,
    /// Overloaded slot whose meaning could not be determined
    Unresolved(StageKind),
}

impl EventCategory {
    /// Stable event identifier.
    #[must_use]
    pub fn id(self) -> String {
        let id = match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::AnalysisStarted => "analyzed",
            Self::Priced => "priced",
            Self::SubmittedForValidation => "submitted_validation",
            Self::FinanceValidated => "validated_finance",
            Self::FinanceRefused => "refused_finance",
            Self::RevisionRequested => "revision",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
            Self::AccountingRejected => "rejected_accounting",
            Self::Cancelled => "cancelled",
            Self::Unresolved(stage) => return format!("unresolved_{stage}"),
        };
        id.to_string()
    }

    /// Presentation tone.
    #[must_use]
    pub const fn tone(self) -> Tone {
        match self {
            Self::Created | Self::Submitted => Tone::Primary,
            Self::AnalysisStarted | Self::RevisionRequested | Self::Unresolved(_) => Tone::Warning,
            Self::Priced | Self::FinanceValidated | Self::Paid => Tone::Success,
            Self::SubmittedForValidation => Tone::Accent,
            Self::FinanceRefused | Self::Rejected | Self::AccountingRejected | Self::Cancelled => {
                Tone::Destructive
            },
        }
    }

    /// The category that embodies a blocking status, if the status blocks.
    #[must_use]
    pub const fn embodying(status: RequestStatus) -> Option<Self> {
        match status {
            RequestStatus::RevisionRequested => Some(Self::RevisionRequested),
            RequestStatus::FinanceRefused => Some(Self::FinanceRefused),
            RequestStatus::Rejected => Some(Self::Rejected),
            RequestStatus::AccountingRejected => Some(Self::AccountingRejected),
            RequestStatus::Cancelled => Some(Self::Cancelled),
            RequestStatus::Draft
            | RequestStatus::Submitted
            | RequestStatus::UnderAnalysis
            | RequestStatus::Priced
            | RequestStatus::SubmittedForValidation
            | RequestStatus::ValidatedFinance
            | RequestStatus::Paid => None,
        }
    }

    const fn from_outcome(outcome: StageOutcome) -> Self {
        match outcome {
            StageOutcome::FinanceApproved => Self::FinanceValidated,
            StageOutcome::FinanceRefused => Self::FinanceRefused,
            StageOutcome::Paid => Self::Paid,
            StageOutcome::AccountingRejected => Self::AccountingRejected,
        }
    }
}

/// One entry of a reconstructed timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    /// Stable identifier of the event kind
    pub id: String,
    /// Localised title
    pub label: String,
    /// When the stage occurred
    pub timestamp: Option<DateTime<Utc>>,
    /// Display name of the actor; never empty
    pub actor_name: String,
    /// Justification or comment recorded with the stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completed or current
    pub lifecycle_state: LifecycleState,
    /// Semantic meaning
    pub category: EventCategory,
    /// Slot the event was read from
    pub stage: StageKind,
}

impl TimelineEvent {
    /// Presentation tone of the event.
    #[must_use]
    pub const fn tone(&self) -> Tone {
        self.category.tone()
    }
}

/// Chronologically ordered history of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    /// True when the request has no recorded stage at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events in chronological order.
    #[must_use]
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// The event tagged current, if any.
    #[must_use]
    pub fn current(&self) -> Option<&TimelineEvent> {
        self.events
            .iter()
            .find(|event| event.lifecycle_state == LifecycleState::Current)
    }

    /// Iterate over the events.
    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }
}

impl IntoIterator for Timeline {
    type Item = TimelineEvent;
    type IntoIter = std::vec::IntoIter<TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Pick the single meaning of a recorded slot.
///
/// Returns `None` for an overloaded slot that neither its outcome tag nor
/// the request status can resolve.
#[must_use]
pub fn resolve_category(
    stage: StageKind,
    record: &StageRecord,
    status: RequestStatus,
) -> Option<EventCategory> {
    use RequestStatus as S;

    let category = match stage {
        StageKind::Creation => EventCategory::Created,
        StageKind::Submission => EventCategory::Submitted,
        StageKind::AnalysisStart => EventCategory::AnalysisStarted,
        StageKind::Pricing => EventCategory::Priced,
        StageKind::ValidationSubmission => EventCategory::SubmittedForValidation,
        StageKind::ProcurementRejection => EventCategory::Rejected,
        StageKind::RevisionRequest => EventCategory::RevisionRequested,
        StageKind::Cancellation => EventCategory::Cancelled,
        StageKind::FinanceDecision | StageKind::AccountingOutcome => {
            return match record.outcome {
                Some(outcome) if outcome.stage() == stage => Some(EventCategory::from_outcome(outcome)),
                Some(_) => None,
                None => match (stage, status) {
                    (StageKind::FinanceDecision, S::ValidatedFinance | S::Paid | S::AccountingRejected) => {
                        Some(EventCategory::FinanceValidated)
                    },
                    (StageKind::FinanceDecision, S::FinanceRefused) => Some(EventCategory::FinanceRefused),
                    (StageKind::AccountingOutcome, S::Paid) => Some(EventCategory::Paid),
                    (StageKind::AccountingOutcome, S::AccountingRejected) => {
                        Some(EventCategory::AccountingRejected)
                    },
                    _ => None,
                },
            };
        },
    };
    Some(category)
}

/// Builds timelines in one locale.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimelineReconstructor {
    locale: Locale,
}

impl TimelineReconstructor {
    /// Reconstructor producing labels in `locale`.
    #[must_use]
    pub const fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Locale of the produced labels.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    /// Derive the ordered timeline of `request`.
    ///
    /// Never fails: an unresolvable slot degrades to a generic event and a
    /// warning.
    #[must_use]
    pub fn reconstruct(&self, request: &ProcurementRequest, directory: &dyn ActorDirectory) -> Timeline {
        let status = request.status();
        let blocking = status.blocking_stage();
        let embodying = EventCategory::embodying(status);

        let mut events: Vec<TimelineEvent> = request
            .stages()
            .map(|(stage, record)| {
                let category = resolve_category(stage, record, status).unwrap_or_else(|| {
                    tracing::warn!(
                        request_id = %request.id(),
                        %stage,
                        %status,
                        outcome = ?record.outcome,
                        "Malformed history: stage meaning could not be resolved"
                    );
                    EventCategory::Unresolved(stage)
                });

                let lifecycle_state = if blocking != Some(stage) {
                    LifecycleState::Completed
                } else if embodying == Some(category) {
                    LifecycleState::Current
                } else {
                    tracing::warn!(
                        request_id = %request.id(),
                        %stage,
                        %status,
                        category = %category.id(),
                        "Malformed history: blocking slot does not record the status"
                    );
                    LifecycleState::Completed
                };

                TimelineEvent {
                    id: category.id(),
                    label: self.locale.event_label(category).to_string(),
                    timestamp: Some(record.occurred_at),
                    actor_name: format_actor_name(record.actor.as_ref(), directory, self.locale),
                    description: record.note.clone(),
                    lifecycle_state,
                    category,
                    stage,
                }
            })
            .collect();

        sort_chronologically(&mut events);
        Timeline { events }
    }
}

/// Sort by timestamp, then stage-definition order.
///
/// An event without timestamp takes the effective timestamp of its
/// predecessor in stage order, so it keeps its relative stage position.
fn sort_chronologically(events: &mut Vec<TimelineEvent>) {
    events.sort_by_key(|event| event.stage);

    let mut previous: Option<DateTime<Utc>> = None;
    let mut keyed: Vec<_> = events
        .drain(..)
        .map(|event| {
            let effective = event.timestamp.or(previous);
            previous = effective;
            ((effective, event.stage), event)
        })
        .collect();

    keyed.sort_by_key(|(key, _)| *key);
    events.extend(keyed.into_iter().map(|(_, event)| event));
}
