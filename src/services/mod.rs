//! Services module
//!
//! Este módulo contiene la lógica de negocio del núcleo: el motor de
//! agrupamiento, la clasificación fretado/vehículo, la fábrica de viajes
//! y la máquina de estados del ciclo de vida.

pub mod charter_service;
pub mod grouping_service;
pub mod trip_factory_service;
pub mod trip_lifecycle_service;

pub use charter_service::{
    block_group, classify, cluster_by_block_group, summarize, Classification, ClassificationConfig,
    Cluster, GroupingSummary,
};
pub use grouping_service::{
    is_duplicate, GroupingConfig, GroupingEngine, GroupingOutcome, GroupingPlan, PlannedGroup,
    SkippedRequest,
};
pub use trip_factory_service::{MaterializationResult, TripFactoryService};
pub use trip_lifecycle_service::TripLifecycleService;
