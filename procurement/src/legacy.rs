//! Adapter for the legacy wide request row.
//!
//! The historical storage kept one nullable `*_at` column per stage, an
//! optional embedded `*_by_profile` per actor and loose comment columns. One
//! `validated_finance_at` column served both finance outcomes and one
//! `comptabilise_at` column both accounting outcomes, distinguished only by
//! the status. Converted records therefore carry no outcome tag; the
//! timeline resolves them from the status.

use crate::actor::{Profile, StaticDirectory};
use crate::types::{
    ActorRef, LineItem, ProcurementRequest, RequestStatus, StageKind, StageRecord,
};
use chrono::{DateTime, Utc};
use kimbo_core::identity::RequestId;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A flat request row as exported by the legacy application.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)] // field names mirror the legacy columns
pub struct LegacyDaRow {
    pub id: String,
    pub reference: String,
    pub status: Option<RequestStatus>,
    pub description: Option<String>,
    pub department: Option<String>,
    #[serde(alias = "fournisseur")]
    pub supplier: Option<String>,
    pub currency: Option<String>,
    pub articles: Vec<LegacyArticle>,

    pub created_at: Option<DateTime<Utc>>,
    pub created_by_profile: Option<Profile>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_by_profile: Option<Profile>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub analyzed_by_profile: Option<Profile>,
    pub priced_at: Option<DateTime<Utc>>,
    pub priced_by_profile: Option<Profile>,
    pub submitted_validation_at: Option<DateTime<Utc>>,
    pub submitted_validation_by_profile: Option<Profile>,
    pub validated_finance_at: Option<DateTime<Utc>>,
    pub validated_finance_by_profile: Option<Profile>,
    pub finance_decision_comment: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejected_by_profile: Option<Profile>,
    pub rejection_reason: Option<String>,
    pub revision_requested_at: Option<DateTime<Utc>>,
    pub revision_requested_by_profile: Option<Profile>,
    pub revision_comment: Option<String>,
    pub comptabilise_at: Option<DateTime<Utc>>,
    pub comptabilise_by_profile: Option<Profile>,
    pub comptabilite_rejection_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by_profile: Option<Profile>,
    pub cancellation_reason: Option<String>,
}

/// A legacy article row.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)] // field names mirror the legacy columns
pub struct LegacyArticle {
    pub designation: String,
    pub quantity: u32,
    pub unit: String,
    #[serde(alias = "unitPrice")]
    pub unit_price: Option<i64>,
}

/// A converted row: the request and the profiles embedded in it.
#[derive(Clone, Debug)]
pub struct ImportedRequest {
    /// Request rebuilt from the row
    pub request: ProcurementRequest,
    /// Directory resolving the synthetic actor references of the request
    pub directory: StaticDirectory,
}

impl LegacyDaRow {
    /// Convert into a request plus a directory of the embedded profiles.
    ///
    /// Each embedded profile gets a synthetic actor reference
    /// (`<row id>/<stage>`); a stage without profile is attributed to the
    /// system. Submission falls back to the creator, since the requester
    /// submits their own request. A missing status defaults to draft.
    #[must_use]
    pub fn into_request(self) -> ImportedRequest {
        let mut directory = StaticDirectory::new();
        let mut stages = BTreeMap::new();
        let row_id = self.id.clone();

        let mut record = |stage: StageKind,
                          at: Option<DateTime<Utc>>,
                          profile: Option<Profile>,
                          note: Option<String>| {
            let Some(at) = at else { return };
            let mut record = StageRecord::new(at);
            if let Some(profile) = profile {
                let actor = ActorRef::new(format!("{row_id}/{stage}"));
                directory.insert(actor.clone(), profile);
                record.actor = Some(actor);
            }
            record.note = note.filter(|note| !note.trim().is_empty());
            stages.insert(stage, record);
        };

        let status = self.status.unwrap_or(RequestStatus::Draft);
        let accounting_note = (status == RequestStatus::AccountingRejected)
            .then_some(self.comptabilite_rejection_reason)
            .flatten();

        let submitter = self
            .submitted_by_profile
            .or_else(|| self.created_by_profile.clone());
        record(StageKind::Creation, self.created_at, self.created_by_profile, None);
        record(StageKind::Submission, self.submitted_at, submitter, None);
        record(StageKind::AnalysisStart, self.analyzed_at, self.analyzed_by_profile, None);
        record(StageKind::Pricing, self.priced_at, self.priced_by_profile, None);
        record(
            StageKind::ValidationSubmission,
            self.submitted_validation_at,
            self.submitted_validation_by_profile,
            None,
        );
        record(
            StageKind::FinanceDecision,
            self.validated_finance_at,
            self.validated_finance_by_profile,
            self.finance_decision_comment,
        );
        record(
            StageKind::ProcurementRejection,
            self.rejected_at,
            self.rejected_by_profile,
            self.rejection_reason,
        );
        record(
            StageKind::RevisionRequest,
            self.revision_requested_at,
            self.revision_requested_by_profile,
            self.revision_comment,
        );
        record(
            StageKind::AccountingOutcome,
            self.comptabilise_at,
            self.comptabilise_by_profile,
            accounting_note,
        );
        record(
            StageKind::Cancellation,
            self.cancelled_at,
            self.cancelled_by_profile,
            self.cancellation_reason,
        );

        let mut request =
            ProcurementRequest::from_history(RequestId::new(self.id), self.reference, status, stages)
                .with_description(self.description.unwrap_or_default())
                .with_department(self.department.unwrap_or_default());
        if let Some(supplier) = self.supplier.filter(|s| !s.trim().is_empty()) {
            request = request.with_supplier(supplier);
        }
        if let Some(currency) = self.currency.filter(|c| !c.trim().is_empty()) {
            request = request.with_currency(currency);
        }
        for article in self.articles {
            let mut item = LineItem::new(article.designation, article.quantity, article.unit);
            item.unit_price = article.unit_price;
            request = request.with_line_item(item);
        }

        ImportedRequest { request, directory }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::timeline::{EventCategory, LifecycleState, TimelineReconstructor};

    const REFUSED_ROW: &str = r#"{
        "id": "7f1c",
        "reference": "DA-2024-0113",
        "status": "refusee_finance",
        "fournisseur": "SOCATRAL",
        "created_at": "2024-03-01T08:00:00Z",
        "created_by_profile": { "first_name": "Awa", "last_name": "Ndiaye" },
        "submitted_at": "2024-03-01T09:00:00Z",
        "priced_at": "2024-03-04T10:00:00Z",
        "submitted_validation_at": "2024-03-04T11:00:00Z",
        "validated_finance_at": "2024-03-05T15:30:00Z",
        "validated_finance_by_profile": { "first_name": "", "last_name": "" },
        "finance_decision_comment": "Budget exceeded this quarter",
        "articles": [ { "designation": "Toner", "quantity": 3, "unit": "pièce", "unitPrice": 45000 } ]
    }"#;

    #[test]
    fn converts_wide_row_into_stage_records() {
        let row: LegacyDaRow = serde_json::from_str(REFUSED_ROW).unwrap();
        let imported = row.into_request();
        let request = &imported.request;

        assert_eq!(request.status(), RequestStatus::FinanceRefused);
        assert_eq!(request.supplier(), Some("SOCATRAL"));
        assert_eq!(request.stages().count(), 5);
        assert_eq!(request.total_amount(), 135_000);

        let finance = request.stage(StageKind::FinanceDecision).unwrap();
        assert_eq!(finance.outcome, None);
        assert_eq!(finance.note.as_deref(), Some("Budget exceeded this quarter"));
        assert_eq!(imported.directory.len(), 3);
    }

    #[test]
    fn refused_row_timeline_has_refusal_as_current() {
        let imported = serde_json::from_str::<LegacyDaRow>(REFUSED_ROW).unwrap().into_request();
        let timeline = TimelineReconstructor::default().reconstruct(&imported.request, &imported.directory);

        let current = timeline.current().unwrap();
        assert_eq!(current.category, EventCategory::FinanceRefused);
        assert_eq!(current.actor_name, "Unknown user");
        assert_eq!(timeline.events()[0].actor_name, "Awa Ndiaye");
        assert_eq!(timeline.events()[1].category, EventCategory::Submitted);
        assert_eq!(timeline.events()[1].actor_name, "Awa Ndiaye");
        assert_eq!(
            timeline.iter().filter(|e| e.lifecycle_state == LifecycleState::Current).count(),
            1
        );
    }

    #[test]
    fn explicit_submitter_wins_over_creator() {
        let row = LegacyDaRow {
            id: "r2".into(),
            reference: "DA-2".into(),
            status: Some(RequestStatus::Submitted),
            created_at: Some(DateTime::<Utc>::UNIX_EPOCH),
            created_by_profile: Some(Profile::new("Awa", "Ndiaye")),
            submitted_at: Some(DateTime::<Utc>::UNIX_EPOCH),
            submitted_by_profile: Some(Profile::new("Jean", "Mbarga")),
            ..LegacyDaRow::default()
        };

        let imported = row.into_request();
        let timeline = TimelineReconstructor::default().reconstruct(&imported.request, &imported.directory);
        let names: Vec<_> = timeline.iter().map(|e| e.actor_name.as_str()).collect();
        assert_eq!(names, vec!["Awa Ndiaye", "Jean Mbarga"]);
    }

    #[test]
    fn accounting_reason_only_kept_for_accounting_rejection() {
        let row = LegacyDaRow {
            id: "r1".into(),
            reference: "DA-1".into(),
            status: Some(RequestStatus::Paid),
            created_at: Some(DateTime::<Utc>::UNIX_EPOCH),
            comptabilise_at: Some(DateTime::<Utc>::UNIX_EPOCH),
            comptabilite_rejection_reason: Some("Facture manquante".into()),
            ..LegacyDaRow::default()
        };

        let request = row.into_request().request;
        assert_eq!(request.stage(StageKind::AccountingOutcome).unwrap().note, None);
        assert!(request.stage(StageKind::Creation).unwrap().actor.is_none());
    }
}
