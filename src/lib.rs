//! Núcleo de coordinación de transporte corporativo
//!
//! Esta biblioteca contiene el motor de agrupamiento/clasificación de
//! solicitaciones y la máquina de estados del ciclo de vida de los
//! viajes. Todo lo demás (routing HTTP, autenticación, selección de
//! banco multi-tenant, reportes, notificaciones WhatsApp/email) vive en
//! la capa que nos envuelve y nos invoca de forma síncrona.
//!
//! Flujo típico de una corrida de agrupamiento:
//!
//! ```no_run
//! use std::sync::Arc;
//! use transport_coordination::config::Settings;
//! use transport_coordination::models::RequestFilter;
//! use transport_coordination::repositories::{MemoryStore, TransportStore};
//! use transport_coordination::services::{GroupingEngine, TripFactoryService};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let settings = Settings::load(store.as_ref()).await?;
//!
//! let pending = store
//!     .fetch_pending_requests(&RequestFilter::default())
//!     .await?;
//!
//! let engine = GroupingEngine::new((&settings).into());
//! let plan = engine.plan(pending, &(&settings).into());
//!
//! let factory = TripFactoryService::new(store.clone());
//! let result = factory.materialize_trips(&plan, None).await?;
//! println!("{} viajes, {} solicitaciones", result.trips_created, result.requests_grouped);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;

pub use utils::errors::{AppError, AppResult};
