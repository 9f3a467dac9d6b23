//! Fábrica de viajes
//!
//! Materializa los grupos de un plan de agrupamiento en entidades Trip,
//! calculando los campos agregados. Regla de negocio explícita: el valor
//! del viaje es el MAYOR valor entre las solicitaciones miembro, no la
//! suma (ídem para el repasse). El lote completo de una corrida se
//! persiste en una sola transacción.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{NewTrip, NewTripMember, RideType};
use crate::repositories::TransportStore;
use crate::utils::errors::AppResult;

use super::charter_service::block_group;
use super::grouping_service::{GroupingPlan, PlannedGroup};

/// Resultado de una corrida de materialización
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MaterializationResult {
    pub trips_created: usize,
    pub requests_grouped: usize,
}

pub struct TripFactoryService {
    store: Arc<dyn TransportStore>,
}

impl TripFactoryService {
    pub fn new(store: Arc<dyn TransportStore>) -> Self {
        Self { store }
    }

    /// Construye el Trip agregado de un grupo. Devuelve None para grupos
    /// vacíos (se saltean en silencio).
    pub fn build_trip(group: &PlannedGroup, created_by: Option<Uuid>) -> Option<NewTrip> {
        let first = group.requests.first()?;

        // Mayor valor entre miembros, no suma (regla de negocio)
        let value = group.requests.iter().filter_map(|r| r.value).max();
        let repasse = group.requests.iter().filter_map(|r| r.repasse).max();

        // Solo el campo de horario que gobierna el tipo de corrida del
        // grupo se copia del representante; desligamento cae al horario
        // de salida si no tiene horario propio
        let (entry_time, exit_time, termination_time) = match first.ride_type {
            RideType::Entry => (first.entry_time, None, None),
            RideType::Exit => (None, first.exit_time, None),
            RideType::Termination => (None, None, first.termination_time.or(first.exit_time)),
            RideType::EntryExit => (first.entry_time, first.exit_time, first.termination_time),
        };

        Some(NewTrip {
            vehicle_class: group.vehicle_class,
            block_id: Some(first.block_id),
            block_group: Some(block_group(&first.block_code).to_string()),
            ride_type: first.ride_type,
            entry_time,
            exit_time,
            termination_time,
            value,
            repasse,
            created_by,
            members: group
                .requests
                .iter()
                .map(|r| NewTripMember {
                    request_id: r.id,
                    employee_id: r.employee_id,
                })
                .collect(),
        })
    }

    /// Materializa todos los grupos del plan en una sola transacción:
    /// si la persistencia de algún grupo falla, ningún grupo de la
    /// corrida queda parcialmente confirmado. Cada solicitación miembro
    /// pasa a Agrupada y queda vinculada a su viaje.
    pub async fn materialize_trips(
        &self,
        plan: &GroupingPlan,
        created_by: Option<Uuid>,
    ) -> AppResult<MaterializationResult> {
        let new_trips: Vec<NewTrip> = plan
            .groups
            .iter()
            .filter_map(|group| Self::build_trip(group, created_by))
            .collect();

        let requests_grouped: usize = new_trips.iter().map(|t| t.members.len()).sum();

        if new_trips.is_empty() {
            return Ok(MaterializationResult {
                trips_created: 0,
                requests_grouped: 0,
            });
        }

        let trip_ids = self.store.create_trip_batch(new_trips).await?;

        info!(
            "✅ Materialización: {} viajes creados, {} solicitaciones agrupadas",
            trip_ids.len(),
            requests_grouped
        );

        Ok(MaterializationResult {
            trips_created: trip_ids.len(),
            requests_grouped,
        })
    }
}
