//! Procurement lifecycle demo.
//!
//! Walks one request from draft to payment through a revision loop, then
//! prints its timeline and document summary as JSON.
//!
//! # Usage
//!
//! ```bash
//! KIMBO_LOCALE=fr KIMBO_METRICS_ENABLED=true cargo run --bin kimbo-demo
//! ```

use anyhow::Context;
use chrono::Utc;
use kimbo_core::environment::{Clock, SystemClock};
use kimbo_core::identity::RequestId;
use kimbo_procurement::actor::{Profile, StaticDirectory};
use kimbo_procurement::store::{InMemoryRequestStore, RequestStore};
use kimbo_procurement::types::{ActorRef, LineItem, ProcurementRequest, RequestStatus};
use kimbo_procurement::{Config, ProcurementService};
use kimbo_runtime::metrics::MetricsRecorder;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.observability.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut metrics = MetricsRecorder::new();
    if config.observability.metrics_enabled {
        metrics.install().context("installing metrics recorder")?;
    }

    info!(locale = %config.presentation.locale, "=== KIMBO procurement demo ===");

    let requester = ActorRef::new("u-requester");
    let buyer = ActorRef::new("u-buyer");
    let director = ActorRef::new("u-director");
    let accountant = ActorRef::new("u-accountant");

    let directory = StaticDirectory::new()
        .with_profile(requester.clone(), Profile::new("Awa", "Ndiaye"))
        .with_profile(buyer.clone(), Profile::new("Jean", "Mbarga"))
        .with_profile(director.clone(), Profile::new("Claire", "Essomba"))
        .with_profile(accountant.clone(), Profile::new("Paul", "Nkodo"));

    let store: Arc<dyn RequestStore> = Arc::new(InMemoryRequestStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = ProcurementService::new(store, clock, Arc::new(directory)).with_config(&config);

    let id = RequestId::new("da-demo");
    let request = ProcurementRequest::create(id.clone(), "DA-2025-0042", Some(requester.clone()), Utc::now())
        .with_description("Office supplies for the Douala branch")
        .with_department("Logistique")
        .with_supplier("SOCATRAL")
        .with_currency(config.presentation.currency.clone())
        .with_line_item(LineItem::new("Ramette papier A4", 40, "carton").priced(3_500))
        .with_line_item(LineItem::new("Toner laser", 6, "pièce").priced(45_000));
    service.create(request).await?;

    let steps: [(RequestStatus, &ActorRef, Option<&str>); 8] = [
        (RequestStatus::Submitted, &requester, None),
        (RequestStatus::UnderAnalysis, &buyer, None),
        (RequestStatus::Priced, &buyer, None),
        (RequestStatus::SubmittedForValidation, &buyer, None),
        (
            RequestStatus::RevisionRequested,
            &director,
            Some("Please obtain a second supplier quote"),
        ),
        (RequestStatus::Priced, &buyer, None),
        (RequestStatus::SubmittedForValidation, &buyer, None),
        (RequestStatus::ValidatedFinance, &director, Some("Within budget")),
    ];

    for (target, actor, justification) in steps {
        service
            .transition_with_retry(&id, target, Some(actor.clone()), justification)
            .await
            .with_context(|| format!("moving request to {target}"))?;
        info!(%target, "Request moved");
    }

    // Refused on purpose: a cancellation needs a ten-character reason.
    if let Err(error) = service
        .transition(&id, RequestStatus::Cancelled, Some(requester), Some("oops"))
        .await
    {
        info!(%error, "Cancellation refused as expected");
    }

    service
        .transition(&id, RequestStatus::Paid, Some(accountant), None)
        .await?;

    let timeline = service.timeline(&id).await?;
    println!("{}", serde_json::to_string_pretty(&timeline)?);

    let summary = service.export_summary(&id).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(rendered) = metrics.render() {
        println!("{rendered}");
    }

    Ok(())
}
