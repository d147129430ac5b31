//! The transition table.
//!
//! Every legal `(from, to)` pair is listed exactly once in [`TRANSITIONS`].
//! The stage slot a transition writes depends only on its target status.

use crate::types::{RequestStatus, StageKind, StageOutcome};

/// Minimum trimmed length, in characters, of a mandatory justification.
pub const MIN_JUSTIFICATION_CHARS: usize = 10;

/// One legal edge of the lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRule {
    /// Source status
    pub from: RequestStatus,
    /// Target status
    pub to: RequestStatus,
    /// Slot written when the edge is taken
    pub stage: StageKind,
    /// Outcome tag for overloaded slots
    pub outcome: Option<StageOutcome>,
    /// Whether the edge needs a justification
    pub requires_justification: bool,
}

const fn rule(from: RequestStatus, to: RequestStatus) -> TransitionRule {
    let (stage, outcome) = target_slot(to);
    TransitionRule {
        from,
        to,
        stage,
        outcome,
        requires_justification: to.requires_justification(),
    }
}

/// Slot (and outcome) written when a request enters `target`.
///
/// `Draft` maps to the creation slot; it is only ever entered by creating a
/// request and never appears as a transition target.
#[must_use]
pub const fn target_slot(target: RequestStatus) -> (StageKind, Option<StageOutcome>) {
    use RequestStatus as S;
    match target {
        S::Draft => (StageKind::Creation, None),
        S::Submitted => (StageKind::Submission, None),
        S::UnderAnalysis => (StageKind::AnalysisStart, None),
        S::Priced => (StageKind::Pricing, None),
        S::SubmittedForValidation => (StageKind::ValidationSubmission, None),
        S::ValidatedFinance => (StageKind::FinanceDecision, Some(StageOutcome::FinanceApproved)),
        S::FinanceRefused => (StageKind::FinanceDecision, Some(StageOutcome::FinanceRefused)),
        S::RevisionRequested => (StageKind::RevisionRequest, None),
        S::Rejected => (StageKind::ProcurementRejection, None),
        S::Paid => (StageKind::AccountingOutcome, Some(StageOutcome::Paid)),
        S::AccountingRejected => (
            StageKind::AccountingOutcome,
            Some(StageOutcome::AccountingRejected),
        ),
        S::Cancelled => (StageKind::Cancellation, None),
    }
}

use RequestStatus::{
    AccountingRejected, Cancelled, Draft, FinanceRefused, Paid, Priced, Rejected,
    RevisionRequested, Submitted, SubmittedForValidation, UnderAnalysis, ValidatedFinance,
};

/// Every legal transition. Terminal statuses have no outgoing edge.
pub static TRANSITIONS: [TransitionRule; 23] = [
    rule(Draft, Submitted),
    rule(Draft, Cancelled),
    rule(Submitted, UnderAnalysis),
    rule(Submitted, Rejected),
    rule(Submitted, Cancelled),
    rule(UnderAnalysis, Priced),
    rule(UnderAnalysis, Rejected),
    rule(UnderAnalysis, Cancelled),
    rule(Priced, SubmittedForValidation),
    rule(Priced, Rejected),
    rule(Priced, Cancelled),
    rule(SubmittedForValidation, ValidatedFinance),
    rule(SubmittedForValidation, FinanceRefused),
    rule(SubmittedForValidation, RevisionRequested),
    rule(SubmittedForValidation, Cancelled),
    rule(RevisionRequested, Priced),
    rule(RevisionRequested, Rejected),
    rule(RevisionRequested, Cancelled),
    rule(ValidatedFinance, Paid),
    rule(ValidatedFinance, AccountingRejected),
    rule(ValidatedFinance, Cancelled),
    rule(FinanceRefused, RevisionRequested),
    rule(FinanceRefused, Cancelled),
];

/// The rule for `from -> to`, if the edge is legal.
#[must_use]
pub fn transition_rule(from: RequestStatus, to: RequestStatus) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.from == from && rule.to == to)
}

/// Legal successors of `status`, in table order.
#[must_use]
pub fn successors(status: RequestStatus) -> Vec<RequestStatus> {
    TRANSITIONS
        .iter()
        .filter(|rule| rule.from == status)
        .map(|rule| rule.to)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn adjacency_is_total() {
        for status in RequestStatus::ALL {
            let next = successors(status);
            assert_eq!(
                next.is_empty(),
                status.is_terminal(),
                "{status} successors: {next:?}"
            );
        }
    }

    #[test]
    fn every_edge_is_listed_once() {
        let edges: HashSet<_> = TRANSITIONS.iter().map(|r| (r.from, r.to)).collect();
        assert_eq!(edges.len(), TRANSITIONS.len());
    }

    #[test]
    fn draft_is_never_a_target() {
        assert!(TRANSITIONS.iter().all(|r| r.to != Draft));
    }

    #[test]
    fn overloaded_targets_carry_outcomes() {
        let approve = transition_rule(SubmittedForValidation, ValidatedFinance).map(|r| (r.stage, r.outcome));
        assert_eq!(
            approve,
            Some((StageKind::FinanceDecision, Some(StageOutcome::FinanceApproved)))
        );

        for rule in &TRANSITIONS {
            assert_eq!(rule.stage.is_overloaded(), rule.outcome.is_some());
            if let Some(outcome) = rule.outcome {
                assert_eq!(outcome.stage(), rule.stage);
            }
        }
    }

    #[test]
    fn finance_refusal_leads_to_revision_or_cancellation() {
        assert_eq!(successors(FinanceRefused), vec![RevisionRequested, Cancelled]);
    }

    #[test]
    fn adverse_targets_require_justification() {
        assert!(transition_rule(Draft, Cancelled).is_some_and(|r| r.requires_justification));
        assert!(transition_rule(ValidatedFinance, Paid).is_some_and(|r| !r.requires_justification));
    }
}
