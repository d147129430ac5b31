//! Localised wording for timelines and exports.

use crate::timeline::EventCategory;
use crate::types::{RequestStatus, StageKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Language of user-facing labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English wording
    #[default]
    English,
    /// French wording, as used by the procurement teams
    French,
}

/// Error returned for an unsupported locale code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported locale: {0}")]
pub struct ParseLocaleError(String);

impl FromStr for Locale {
    type Err = ParseLocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        match code.split(['-', '_']).next() {
            Some("en" | "english") => Ok(Self::English),
            Some("fr" | "french") => Ok(Self::French),
            _ => Err(ParseLocaleError(s.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => f.write_str("en"),
            Self::French => f.write_str("fr"),
        }
    }
}

impl Locale {
    /// Actor name shown for system-initiated stages.
    #[must_use]
    pub const fn system_actor(self) -> &'static str {
        match self {
            Self::English => "System",
            Self::French => "Système",
        }
    }

    /// Actor name shown when a referenced user has no usable name.
    #[must_use]
    pub const fn unknown_actor(self) -> &'static str {
        match self {
            Self::English => "Unknown user",
            Self::French => "Utilisateur",
        }
    }

    /// Title of a timeline event.
    #[must_use]
    pub const fn event_label(self, category: EventCategory) -> &'static str {
        use EventCategory as C;
        match self {
            Self::English => match category {
                C::Created => "Creation",
                C::Submitted => "Submitted to procurement",
                C::AnalysisStarted => "Taken over by procurement",
                C::Priced => "Pricing completed",
                C::SubmittedForValidation => "Submitted for finance approval",
                C::FinanceValidated => "Financially approved",
                C::FinanceRefused => "Refused by finance",
                C::RevisionRequested => "Revision requested",
                C::Rejected => "Rejected by procurement",
                C::Paid => "Payment recorded",
                C::AccountingRejected => "Rejected by accounting",
                C::Cancelled => "Cancelled",
                C::Unresolved(StageKind::FinanceDecision) => "Finance decision",
                C::Unresolved(StageKind::AccountingOutcome) => "Accounting decision",
                C::Unresolved(_) => "Stage recorded",
            },
            Self::French => match category {
                C::Created => "Création de la DA",
                C::Submitted => "Soumise aux Achats",
                C::AnalysisStarted => "Prise en charge Achats",
                C::Priced => "Chiffrage effectué",
                C::SubmittedForValidation => "Soumise à validation DAF/DG",
                C::FinanceValidated => "Validée financièrement",
                C::FinanceRefused => "Refusée par DAF/DG",
                C::RevisionRequested => "Révision demandée",
                C::Rejected => "Rejetée par les Achats",
                C::Paid => "Paiement enregistré",
                C::AccountingRejected => "Rejetée par la Comptabilité",
                C::Cancelled => "Annulée",
                C::Unresolved(StageKind::FinanceDecision) => "Décision financière",
                C::Unresolved(StageKind::AccountingOutcome) => "Décision comptable",
                C::Unresolved(_) => "Étape enregistrée",
            },
        }
    }

    /// Display name of a status.
    #[must_use]
    pub const fn status_label(self, status: RequestStatus) -> &'static str {
        use RequestStatus as S;
        match self {
            Self::English => match status {
                S::Draft => "Draft",
                S::Submitted => "Submitted",
                S::UnderAnalysis => "Under analysis",
                S::Priced => "Priced",
                S::SubmittedForValidation => "Awaiting finance approval",
                S::ValidatedFinance => "Financially approved",
                S::FinanceRefused => "Refused by finance",
                S::RevisionRequested => "Revision requested",
                S::Rejected => "Rejected",
                S::Cancelled => "Cancelled",
                S::Paid => "Paid",
                S::AccountingRejected => "Rejected by accounting",
            },
            Self::French => match status {
                S::Draft => "Brouillon",
                S::Submitted => "Soumise",
                S::UnderAnalysis => "En analyse",
                S::Priced => "Chiffrée",
                S::SubmittedForValidation => "Soumise à validation",
                S::ValidatedFinance => "Validée finance",
                S::FinanceRefused => "Refusée finance",
                S::RevisionRequested => "En révision",
                S::Rejected => "Rejetée",
                S::Cancelled => "Annulée",
                S::Paid => "Payée",
                S::AccountingRejected => "Rejetée comptabilité",
            },
        }
    }

    /// Column title of a stage in exported documents.
    #[must_use]
    pub const fn stage_label(self, stage: StageKind) -> &'static str {
        use StageKind as K;
        match self {
            Self::English => match stage {
                K::Creation => "Created",
                K::Submission => "Submitted",
                K::AnalysisStart => "Analysis",
                K::Pricing => "Pricing",
                K::ValidationSubmission => "Validation submission",
                K::FinanceDecision => "Finance decision",
                K::ProcurementRejection => "Procurement rejection",
                K::RevisionRequest => "Revision request",
                K::AccountingOutcome => "Accounting outcome",
                K::Cancellation => "Cancellation",
            },
            Self::French => match stage {
                K::Creation => "Création",
                K::Submission => "Soumission",
                K::AnalysisStart => "Analyse",
                K::Pricing => "Chiffrage",
                K::ValidationSubmission => "Soumission validation",
                K::FinanceDecision => "Décision financière",
                K::ProcurementRejection => "Rejet Achats",
                K::RevisionRequest => "Demande de révision",
                K::AccountingOutcome => "Décision comptable",
                K::Cancellation => "Annulation",
            },
        }
    }
}
