//! Document export summary.
//!
//! The PDF renderer is an external consumer; this module prepares the
//! already formatted values it lays out: reference, status label, dated
//! stages, line items and totals.

use crate::actor::{ActorDirectory, format_actor_name};
use crate::labels::Locale;
use crate::types::{DEFAULT_CURRENCY, Money, ProcurementRequest, StageKind};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Company name printed in document headers.
pub const DEFAULT_COMPANY_NAME: &str = "KIMBO Procurement Management";

/// Placeholder for a value that is not known yet.
const MISSING: &str = "-";

/// Narrow no-break space used as the French thousands separator.
const GROUP_SEPARATOR: char = '\u{202f}';

/// Format an amount the way procurement documents print it.
///
/// Whole units, French digit grouping, currency code suffix. Zero is always
/// printed as `0 XAF`.
#[must_use]
pub fn format_amount(value: Money, currency: &str) -> String {
    if value == 0 {
        return format!("0 {DEFAULT_CURRENCY}");
    }

    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }

    let currency = if currency.trim().is_empty() {
        DEFAULT_CURRENCY
    } else {
        currency
    };
    format!("{grouped} {currency}")
}

/// Format a date as printed on documents (`dd/mm/yyyy hh:mm`, UTC).
#[must_use]
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}

/// One dated stage row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportStage {
    /// Stage slot
    pub stage: StageKind,
    /// Localised stage title
    pub label: String,
    /// Formatted date
    pub date: String,
    /// Actor display name
    pub actor: String,
    /// Recorded justification or comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One article row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportLine {
    /// What is being bought
    pub designation: String,
    /// How many units
    pub quantity: u32,
    /// Unit of measure
    pub unit: String,
    /// Formatted unit price, `-` when unpriced
    pub unit_price: String,
    /// Formatted line total, `-` when unpriced
    pub total: String,
}

/// Everything a document renderer needs about one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Header company name
    pub company: String,
    /// Request reference
    pub reference: String,
    /// Status code
    pub status: String,
    /// Localised status
    pub status_label: String,
    /// Requesting department
    pub department: String,
    /// Description
    pub description: String,
    /// Supplier, `-` when not selected
    pub supplier: String,
    /// Currency code
    pub currency: String,
    /// Formatted creation date
    pub created_at: String,
    /// Author display name
    pub created_by: String,
    /// Recorded stages in definition order
    pub stages: Vec<ExportStage>,
    /// Articles
    pub line_items: Vec<ExportLine>,
    /// Formatted total of priced lines
    pub total_amount: String,
}

/// Options controlling the export wording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Label language
    pub locale: Locale,
    /// Header company name
    pub company: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            company: DEFAULT_COMPANY_NAME.to_string(),
        }
    }
}

impl ExportSummary {
    /// Build the summary of `request`.
    #[must_use]
    pub fn from_request(
        request: &ProcurementRequest,
        directory: &dyn ActorDirectory,
        options: &ExportOptions,
    ) -> Self {
        let locale = options.locale;
        let currency = request.currency();

        let stages: Vec<ExportStage> = request
            .stages()
            .map(|(stage, record)| ExportStage {
                stage,
                label: locale.stage_label(stage).to_string(),
                date: format_date(record.occurred_at),
                actor: format_actor_name(record.actor.as_ref(), directory, locale),
                note: record.note.clone(),
            })
            .collect();

        let (created_at, created_by) = stages
            .iter()
            .find(|row| row.stage == StageKind::Creation)
            .map_or_else(
                || (MISSING.to_string(), locale.system_actor().to_string()),
                |row| (row.date.clone(), row.actor.clone()),
            );

        let line_items = request
            .line_items()
            .iter()
            .map(|item| ExportLine {
                designation: item.designation.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                unit_price: item
                    .unit_price
                    .map_or_else(|| MISSING.to_string(), |price| format_amount(price, currency)),
                total: item
                    .total()
                    .map_or_else(|| MISSING.to_string(), |total| format_amount(total, currency)),
            })
            .collect();

        Self {
            company: options.company.clone(),
            reference: request.reference().to_string(),
            status: request.status().as_str().to_string(),
            status_label: locale.status_label(request.status()).to_string(),
            department: request.department().to_string(),
            description: request.description().to_string(),
            supplier: request.supplier().unwrap_or(MISSING).to_string(),
            currency: currency.to_string(),
            created_at,
            created_by,
            stages,
            line_items,
            total_amount: format_amount(request.total_amount(), currency),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::actor::{Profile, StaticDirectory};
    use crate::types::{ActorRef, LineItem};
    use kimbo_core::identity::RequestId;
    use kimbo_testing::test_epoch;

    #[test]
    fn amounts_use_french_grouping() {
        assert_eq!(format_amount(1_234_567, "XAF"), "1\u{202f}234\u{202f}567 XAF");
        assert_eq!(format_amount(950, "EUR"), "950 EUR");
        assert_eq!(format_amount(-12_000, "XAF"), "-12\u{202f}000 XAF");
        assert_eq!(format_amount(1_000, ""), "1\u{202f}000 XAF");
    }

    #[test]
    fn zero_is_printed_in_xaf() {
        assert_eq!(format_amount(0, "EUR"), "0 XAF");
    }

    #[test]
    fn dates_are_day_first() {
        assert_eq!(format_date(test_epoch()), "01/01/2025 00:00");
    }

    #[test]
    fn summary_formats_lines_and_total() {
        let request = ProcurementRequest::create(
            RequestId::new("da-1"),
            "DA-2025-0007",
            Some(ActorRef::new("u-1")),
            test_epoch(),
        )
        .with_department("Logistique")
        .with_line_item(LineItem::new("Palette bois", 4, "pièce").priced(15_000))
        .with_line_item(LineItem::new("Film étirable", 2, "rouleau"));
        let directory =
            StaticDirectory::new().with_profile(ActorRef::new("u-1"), Profile::new("Paul", "Biya"));

        let summary = ExportSummary::from_request(&request, &directory, &ExportOptions::default());

        assert_eq!(summary.company, DEFAULT_COMPANY_NAME);
        assert_eq!(summary.status, "draft");
        assert_eq!(summary.status_label, "Draft");
        assert_eq!(summary.created_by, "Paul Biya");
        assert_eq!(summary.created_at, "01/01/2025 00:00");
        assert_eq!(summary.supplier, "-");
        assert_eq!(summary.line_items[0].total, "60\u{202f}000 XAF");
        assert_eq!(summary.line_items[1].unit_price, "-");
        assert_eq!(summary.total_amount, "60\u{202f}000 XAF");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["reference"], "DA-2025-0007");
        assert_eq!(json["stages"][0]["stage"], "creation");
    }
}
