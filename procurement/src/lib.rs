//! Procurement request (DA) lifecycle and timeline reconstruction.
//!
//! A purchase request ("demande d'achat") moves through a fixed status
//! graph from draft to payment, with refusal, revision and cancellation
//! branches. Every move stamps one stage slot with a date, an actor and an
//! optional note; the timeline of a request is derived from those slots.
//!
//! # Architecture
//!
//! 1. **Transition table** ([`transitions`]) lists every legal edge with its
//!    stage slot, outcome tag and justification requirement
//! 2. **Lifecycle engine** ([`engine`]) checks the guards and describes the
//!    stage write without touching storage
//! 3. **Reducer** ([`reducer`]) turns commands into store write effects
//!    under optimistic concurrency
//! 4. **Service** ([`service`]) reads, evaluates and writes one request per
//!    call, with retry on version conflicts
//! 5. **Timeline reconstructor** ([`timeline`]) derives the ordered,
//!    localised event list shown to users
//!
//! # Example Usage
//!
//! ```no_run
//! use kimbo_core::environment::SystemClock;
//! use kimbo_core::identity::RequestId;
//! use kimbo_procurement::actor::StaticDirectory;
//! use kimbo_procurement::service::ProcurementService;
//! use kimbo_procurement::store::InMemoryRequestStore;
//! use kimbo_procurement::types::{ProcurementRequest, RequestStatus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), kimbo_procurement::LifecycleError> {
//! let service = ProcurementService::new(
//!     Arc::new(InMemoryRequestStore::new()),
//!     Arc::new(SystemClock),
//!     Arc::new(StaticDirectory::new()),
//! );
//!
//! let id = RequestId::new("da-1");
//! service
//!     .create(ProcurementRequest::create(id.clone(), "DA-2025-0001", None, chrono::Utc::now()))
//!     .await?;
//! service.transition(&id, RequestStatus::Submitted, None, None).await?;
//!
//! for event in &service.timeline(&id).await? {
//!     println!("{} - {}", event.label, event.actor_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod labels;
pub mod legacy;
pub mod reducer;
pub mod service;
pub mod store;
pub mod timeline;
pub mod transitions;
pub mod types;

pub use config::Config;
pub use engine::LifecycleEngine;
pub use error::{GuardFailure, LifecycleError};
pub use reducer::{ProcurementAction, ProcurementEnvironment, ProcurementReducer, ProcurementState};
pub use service::ProcurementService;
pub use timeline::{Timeline, TimelineEvent, TimelineReconstructor};
pub use types::{ProcurementRequest, RequestStatus, StageKind, StageRecord};
