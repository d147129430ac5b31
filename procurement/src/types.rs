//! Core domain types for the procurement request (DA) lifecycle.
//!
//! A request moves through submission, analysis, pricing, financial
//! validation and accounting. Every stage it has gone through is kept as a
//! discrete [`StageRecord`] keyed by [`StageKind`]; the current position is
//! the single [`RequestStatus`].

use crate::error::LifecycleError;
use chrono::{DateTime, Utc};
use kimbo_core::identity::RequestId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Integer amount in the request currency.
///
/// XAF has no minor unit, so amounts are whole francs.
pub type Money = i64;

/// Lifecycle status of a procurement request.
///
/// The legacy French status codes are accepted when deserializing or parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Being written by its author
    #[serde(alias = "brouillon")]
    Draft,
    /// Sent to the procurement department
    #[serde(alias = "soumise")]
    Submitted,
    /// Taken over by a procurement officer
    #[serde(alias = "en_analyse")]
    UnderAnalysis,
    /// Supplier quotes obtained
    #[serde(alias = "chiffree")]
    Priced,
    /// Waiting for the finance director's decision
    #[serde(alias = "soumise_validation")]
    SubmittedForValidation,
    /// Approved by finance
    #[serde(alias = "validee_finance")]
    ValidatedFinance,
    /// Refused by finance
    #[serde(alias = "refusee_finance")]
    FinanceRefused,
    /// Sent back to procurement for a new quote
    #[serde(alias = "en_revision_achats")]
    RevisionRequested,
    /// Rejected by procurement
    #[serde(alias = "rejetee")]
    Rejected,
    /// Withdrawn
    #[serde(alias = "annulee")]
    Cancelled,
    /// Payment recorded by accounting
    #[serde(alias = "payee")]
    Paid,
    /// Rejected by accounting
    #[serde(alias = "rejetee_comptabilite")]
    AccountingRejected,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 12] = [
        Self::Draft,
        Self::Submitted,
        Self::UnderAnalysis,
        Self::Priced,
        Self::SubmittedForValidation,
        Self::ValidatedFinance,
        Self::FinanceRefused,
        Self::RevisionRequested,
        Self::Rejected,
        Self::Cancelled,
        Self::Paid,
        Self::AccountingRejected,
    ];

    /// Canonical `snake_case` code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderAnalysis => "under_analysis",
            Self::Priced => "priced",
            Self::SubmittedForValidation => "submitted_for_validation",
            Self::ValidatedFinance => "validated_finance",
            Self::FinanceRefused => "finance_refused",
            Self::RevisionRequested => "revision_requested",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Paid => "paid",
            Self::AccountingRejected => "accounting_rejected",
        }
    }

    /// Terminal statuses have no legal successor.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Paid | Self::Cancelled | Self::Rejected | Self::AccountingRejected
        )
    }

    /// Entering this status requires a written justification.
    #[must_use]
    pub const fn requires_justification(self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::Rejected
                | Self::FinanceRefused
                | Self::AccountingRejected
                | Self::RevisionRequested
        )
    }

    /// The stage slot that embodies this status while the request sits in it
    /// as an unresolved or adverse outcome.
    ///
    /// Paid is a successful terminal state and therefore not blocking.
    #[must_use]
    pub const fn blocking_stage(self) -> Option<StageKind> {
        match self {
            Self::RevisionRequested => Some(StageKind::RevisionRequest),
            Self::FinanceRefused => Some(StageKind::FinanceDecision),
            Self::Rejected => Some(StageKind::ProcurementRejection),
            Self::AccountingRejected => Some(StageKind::AccountingOutcome),
            Self::Cancelled => Some(StageKind::Cancellation),
            Self::Draft
            | Self::Submitted
            | Self::UnderAnalysis
            | Self::Priced
            | Self::SubmittedForValidation
            | Self::ValidatedFinance
            | Self::Paid => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status code is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown request status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for RequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim() {
            "draft" | "brouillon" => Self::Draft,
            "submitted" | "soumise" => Self::Submitted,
            "under_analysis" | "en_analyse" => Self::UnderAnalysis,
            "priced" | "chiffree" => Self::Priced,
            "submitted_for_validation" | "soumise_validation" => Self::SubmittedForValidation,
            "validated_finance" | "validee_finance" => Self::ValidatedFinance,
            "finance_refused" | "refusee_finance" => Self::FinanceRefused,
            "revision_requested" | "en_revision_achats" => Self::RevisionRequested,
            "rejected" | "rejetee" => Self::Rejected,
            "cancelled" | "annulee" => Self::Cancelled,
            "paid" | "payee" => Self::Paid,
            "accounting_rejected" | "rejetee_comptabilite" => Self::AccountingRejected,
            other => return Err(ParseStatusError(other.to_string())),
        };
        Ok(status)
    }
}

/// A lifecycle stage slot.
///
/// Declaration order is the stage-definition order used to break timestamp
/// ties in the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Request created
    Creation,
    /// Sent to procurement
    Submission,
    /// Procurement started the analysis
    AnalysisStart,
    /// Quote recorded
    Pricing,
    /// Sent to finance
    ValidationSubmission,
    /// Finance approved or refused
    FinanceDecision,
    /// Procurement rejected
    ProcurementRejection,
    /// Finance sent it back for revision
    RevisionRequest,
    /// Accounting paid or rejected
    AccountingOutcome,
    /// Withdrawn
    Cancellation,
}

impl StageKind {
    /// Every stage, in definition order.
    pub const ALL: [Self; 10] = [
        Self::Creation,
        Self::Submission,
        Self::AnalysisStart,
        Self::Pricing,
        Self::ValidationSubmission,
        Self::FinanceDecision,
        Self::ProcurementRejection,
        Self::RevisionRequest,
        Self::AccountingOutcome,
        Self::Cancellation,
    ];

    /// Position in the stage-definition order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// `snake_case` code of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Submission => "submission",
            Self::AnalysisStart => "analysis_start",
            Self::Pricing => "pricing",
            Self::ValidationSubmission => "validation_submission",
            Self::FinanceDecision => "finance_decision",
            Self::ProcurementRejection => "procurement_rejection",
            Self::RevisionRequest => "revision_request",
            Self::AccountingOutcome => "accounting_outcome",
            Self::Cancellation => "cancellation",
        }
    }

    /// Slots shared by two mutually exclusive outcomes.
    #[must_use]
    pub const fn is_overloaded(self) -> bool {
        matches!(self, Self::FinanceDecision | Self::AccountingOutcome)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two meanings an overloaded slot carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Finance approved the request
    FinanceApproved,
    /// Finance refused the request
    FinanceRefused,
    /// Accounting recorded the payment
    Paid,
    /// Accounting rejected the request
    AccountingRejected,
}

impl StageOutcome {
    /// The slot this outcome belongs to.
    #[must_use]
    pub const fn stage(self) -> StageKind {
        match self {
            Self::FinanceApproved | Self::FinanceRefused => StageKind::FinanceDecision,
            Self::Paid | Self::AccountingRejected => StageKind::AccountingOutcome,
        }
    }
}

/// Opaque reference to a user (profile id).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorRef(String);

impl ActorRef {
    /// Create an actor reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata recorded when a stage occurs.
///
/// The record exists iff the stage happened. A missing actor means the stage
/// was system-initiated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    /// When the stage occurred
    pub occurred_at: DateTime<Utc>,
    /// Who performed it
    pub actor: Option<ActorRef>,
    /// Justification or comment
    pub note: Option<String>,
    /// Meaning of an overloaded slot
    pub outcome: Option<StageOutcome>,
}

impl StageRecord {
    /// A system-initiated record without note or outcome.
    #[must_use]
    pub const fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            actor: None,
            note: None,
            outcome: None,
        }
    }

    /// Set the actor.
    #[must_use]
    pub fn with_actor(mut self, actor: ActorRef) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Set the outcome of an overloaded slot.
    #[must_use]
    pub const fn with_outcome(mut self, outcome: StageOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }
}

/// One article of a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// What is being bought
    pub designation: String,
    /// How many units
    pub quantity: u32,
    /// Unit of measure ("pièce", "carton", ...)
    pub unit: String,
    /// Unit price once priced
    pub unit_price: Option<Money>,
}

impl LineItem {
    /// An unpriced line item.
    #[must_use]
    pub fn new(designation: impl Into<String>, quantity: u32, unit: impl Into<String>) -> Self {
        Self {
            designation: designation.into(),
            quantity,
            unit: unit.into(),
            unit_price: None,
        }
    }

    /// Set the unit price.
    #[must_use]
    pub const fn priced(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Unit price times quantity, if priced.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.unit_price
            .map(|price| price.saturating_mul(Money::from(self.quantity)))
    }
}

/// A purchase request (DA) and its stage history.
///
/// Status and history change together, only through
/// [`apply_transition`](Self::apply_transition).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementRequest {
    id: RequestId,
    reference: String,
    description: String,
    department: String,
    supplier: Option<String>,
    currency: String,
    line_items: Vec<LineItem>,
    status: RequestStatus,
    stages: BTreeMap<StageKind, StageRecord>,
}

/// Default currency of requests.
pub const DEFAULT_CURRENCY: &str = "XAF";

impl ProcurementRequest {
    /// Create a draft request, stamping the creation stage.
    #[must_use]
    pub fn create(
        id: RequestId,
        reference: impl Into<String>,
        author: Option<ActorRef>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut creation = StageRecord::new(now);
        creation.actor = author;

        let mut stages = BTreeMap::new();
        stages.insert(StageKind::Creation, creation);

        Self {
            id,
            reference: reference.into(),
            description: String::new(),
            department: String::new(),
            supplier: None,
            currency: DEFAULT_CURRENCY.to_string(),
            line_items: Vec::new(),
            status: RequestStatus::Draft,
            stages,
        }
    }

    /// Rebuild a request from already recorded history.
    ///
    /// Used by adapters reading stored data; no lifecycle rule is checked.
    #[must_use]
    pub fn from_history(
        id: RequestId,
        reference: impl Into<String>,
        status: RequestStatus,
        stages: BTreeMap<StageKind, StageRecord>,
    ) -> Self {
        Self {
            status,
            stages,
            ..Self::create(id, reference, None, DateTime::<Utc>::UNIX_EPOCH)
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the requesting department.
    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Set the supplier.
    #[must_use]
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Set the currency code.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Append a line item.
    #[must_use]
    pub fn with_line_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// Human-facing reference ("DA-2024-0042").
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Requesting department.
    #[must_use]
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Selected supplier, once known.
    #[must_use]
    pub fn supplier(&self) -> Option<&str> {
        self.supplier.as_deref()
    }

    /// Currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Articles of the request.
    #[must_use]
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    /// Record of `stage`, if it occurred.
    #[must_use]
    pub fn stage(&self, stage: StageKind) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    /// Every recorded stage in definition order.
    pub fn stages(&self) -> impl Iterator<Item = (StageKind, &StageRecord)> {
        self.stages.iter().map(|(kind, record)| (*kind, record))
    }

    /// Sum of the priced line totals.
    #[must_use]
    pub fn total_amount(&self) -> Money {
        self.line_items
            .iter()
            .filter_map(LineItem::total)
            .fold(0, Money::saturating_add)
    }

    /// Write a validated transition: status and stage record together.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] when the transition targets
    /// another request, or [`LifecycleError::IllegalTransition`] when it was
    /// evaluated against a status the request no longer has or writes a slot
    /// or outcome other than the one its target status owns. The request is
    /// left unchanged in every case.
    pub fn apply_transition(&mut self, transition: &StageTransition) -> Result<(), LifecycleError> {
        if transition.request_id != self.id {
            return Err(LifecycleError::NotFound(transition.request_id.clone()));
        }
        let slot = crate::transitions::target_slot(transition.audit.to);
        if transition.audit.from != self.status || slot != (transition.stage, transition.record.outcome) {
            return Err(LifecycleError::IllegalTransition {
                from: self.status,
                to: transition.audit.to,
            });
        }

        self.write_stage(transition.audit.to, transition.stage, transition.record.clone());
        Ok(())
    }

    /// Persist a status and its stage record as one write.
    pub(crate) fn write_stage(&mut self, status: RequestStatus, stage: StageKind, record: StageRecord) {
        self.status = status;
        self.stages.insert(stage, record);
    }
}

/// Whether the guards let an attempted transition through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardResult {
    /// Every guard passed
    Passed,
    /// A guard refused the transition
    Failed(LifecycleError),
}

impl GuardResult {
    /// True when the transition was allowed.
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Audit entry for one attempted transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Status before the attempt
    pub from: RequestStatus,
    /// Requested status
    pub to: RequestStatus,
    /// Guard outcome
    pub guard: GuardResult,
    /// The target slot already held a record that this transition replaces
    pub superseded: bool,
}

/// A transition that passed every guard and is ready to be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageTransition {
    /// Request the transition applies to
    pub request_id: RequestId,
    /// Slot to write
    pub stage: StageKind,
    /// Record to write into the slot
    pub record: StageRecord,
    /// Audit entry
    pub audit: TransitionRecord,
}
