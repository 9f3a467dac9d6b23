//! Máquina de estados del ciclo de vida del viaje
//!
//! Pendiente → Agendada → En Andamento → Finalizada; Cancelada es
//! terminal y solo alcanzable desde Pendiente o Agendada. Todas las
//! transiciones releen el estado actual del almacén, fallan rápido con
//! un error tipado y no mutan NADA si alguna precondición no se cumple.
//! Las escrituras son condicionales (check-then-set) para que dos
//! llamadores concurrentes nunca pierdan una actualización.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    derive_driver_status, CancelTripInput, Driver, DriverStatus, RequestStatus, RideType, Trip,
    TripStatus,
};
use crate::repositories::TransportStore;
use crate::utils::errors::{
    bad_request_error, forbidden_error, not_found_error, state_conflict, AppError, AppResult,
};

pub struct TripLifecycleService {
    store: Arc<dyn TransportStore>,
}

impl TripLifecycleService {
    pub fn new(store: Arc<dyn TransportStore>) -> Self {
        Self { store }
    }

    async fn load_trip(&self, trip_id: Uuid) -> AppResult<Trip> {
        self.store
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| not_found_error("Trip", &trip_id.to_string()))
    }

    async fn load_driver(&self, driver_id: Uuid) -> AppResult<Driver> {
        self.store
            .get_driver(driver_id)
            .await?
            .ok_or_else(|| not_found_error("Driver", &driver_id.to_string()))
    }

    /// Error tipado tras perder una escritura condicional: relee el
    /// estado que ganó la carrera para reportarlo.
    async fn lost_race(&self, trip_id: Uuid, expected: &str) -> AppError {
        match self.store.get_trip(trip_id).await {
            Ok(Some(current)) => state_conflict(trip_id, expected, current.status),
            Ok(None) => not_found_error("Trip", &trip_id.to_string()),
            Err(e) => e,
        }
    }

    /// El motorista acepta un viaje pendiente.
    ///
    /// El reclamo es una actualización condicional atómica en el almacén:
    /// dos motoristas compitiendo por el mismo viaje producen exactamente
    /// un éxito y un StateConflict, nunca doble asignación.
    pub async fn accept(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let driver = self.load_driver(driver_id).await?;

        if driver.vehicle_plate.is_none() {
            return Err(bad_request_error(
                "driver must have a registered vehicle to accept trips",
            ));
        }

        let active = self.store.driver_active_statuses(driver_id).await?;
        let driver_status = derive_driver_status(driver.offline, &active);
        if driver_status != DriverStatus::Available {
            return Err(AppError::Conflict(format!(
                "driver {} is not available (status: {})",
                driver_id, driver_status
            )));
        }

        let trip = self.load_trip(trip_id).await?;
        if trip.status != TripStatus::Pending || trip.driver_id.is_some() {
            return Err(state_conflict(trip_id, "pending", trip.status));
        }

        if !self.store.try_claim_trip(trip_id, driver_id).await? {
            // El reclamo también falla si el motorista ganó otro viaje
            // entre la derivación de su estado y el reclamo: un viaje
            // todavía pendiente y sin asignar delata ese caso
            let current = self.store.get_trip(trip_id).await?;
            return Err(match current {
                Some(t) if t.status == TripStatus::Pending && t.driver_id.is_none() => {
                    AppError::Conflict(format!(
                        "driver {} is no longer available",
                        driver_id
                    ))
                }
                Some(t) => state_conflict(trip_id, "pending", t.status),
                None => not_found_error("Trip", &trip_id.to_string()),
            });
        }

        for member in self.store.get_trip_members(trip_id).await? {
            self.store
                .save_request_status(member.id, RequestStatus::Scheduled, Some(trip_id))
                .await?;
        }

        info!("🚗 Viaje {} aceptado por motorista {}", trip_id, driver_id);

        self.load_trip(trip_id).await
    }

    /// El motorista inicia un viaje agendado.
    pub async fn start(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let trip = self.load_trip(trip_id).await?;

        if trip.driver_id != Some(driver_id) {
            return Err(forbidden_error("start trip", "driver does not own this trip"));
        }
        if trip.status != TripStatus::Scheduled {
            return Err(state_conflict(trip_id, "scheduled", trip.status));
        }

        let now = Utc::now();
        let mut updated = trip;
        updated.status = TripStatus::InProgress;
        updated.started_at = Some(now);
        updated.updated_at = now;

        if !self
            .store
            .save_trip_if_status(&updated, TripStatus::Scheduled)
            .await?
        {
            return Err(self.lost_race(trip_id, "scheduled").await);
        }

        for member in self.store.get_trip_members(trip_id).await? {
            self.store
                .save_request_status(member.id, RequestStatus::InProgress, Some(trip_id))
                .await?;
        }

        info!("🛣️ Viaje {} iniciado", trip_id);

        Ok(updated)
    }

    /// El motorista finaliza un viaje en andamento. Si la corrida es de
    /// desligamento, cada colaborador vinculado queda marcado Desligado.
    pub async fn finish(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let trip = self.load_trip(trip_id).await?;

        if trip.driver_id != Some(driver_id) {
            return Err(forbidden_error("finish trip", "driver does not own this trip"));
        }
        if trip.status != TripStatus::InProgress {
            return Err(state_conflict(trip_id, "in_progress", trip.status));
        }

        let now = Utc::now();
        let mut updated = trip;
        updated.status = TripStatus::Finalized;
        updated.finished_at = Some(now);
        updated.updated_at = now;

        if !self
            .store
            .save_trip_if_status(&updated, TripStatus::InProgress)
            .await?
        {
            return Err(self.lost_race(trip_id, "in_progress").await);
        }

        let members = self.store.get_trip_members(trip_id).await?;
        for member in &members {
            self.store
                .save_request_status(member.id, RequestStatus::Finalized, Some(trip_id))
                .await?;
        }

        if updated.ride_type == RideType::Termination {
            let employee_ids: Vec<Uuid> = members.iter().map(|m| m.employee_id).collect();
            let terminated = self.store.mark_employees_terminated(&employee_ids).await?;
            info!(
                "Viaje de desligamento {}: {} colaboradores marcados desligados",
                trip_id, terminated
            );
        }

        info!("🏁 Viaje {} finalizado", trip_id);

        Ok(updated)
    }

    /// Admin/supervisor cancela un viaje pendiente o agendado. Las
    /// solicitaciones miembro vuelven a Pendiente y se desvinculan del
    /// viaje; la vinculación del motorista se limpia.
    pub async fn cancel(&self, trip_id: Uuid, input: &CancelTripInput) -> AppResult<Trip> {
        input.validate()?;

        let trip = self.load_trip(trip_id).await?;

        if !matches!(trip.status, TripStatus::Pending | TripStatus::Scheduled) {
            return Err(state_conflict(trip_id, "pending or scheduled", trip.status));
        }

        let expected = trip.status;
        let now = Utc::now();
        let mut updated = trip;
        updated.status = TripStatus::Cancelled;
        updated.driver_id = None;
        updated.cancellation_reason = Some(input.reason.clone());
        updated.cancelled_by = Some(input.actor_id);
        updated.cancelled_at = Some(now);
        updated.updated_at = now;

        if !self.store.save_trip_if_status(&updated, expected).await? {
            return Err(self.lost_race(trip_id, "pending or scheduled").await);
        }

        let members = self.store.get_trip_members(trip_id).await?;
        for member in &members {
            self.store
                .save_request_status(member.id, RequestStatus::Pending, None)
                .await?;
        }

        // La membresía del viaje cancelado se elimina: cada solicitación
        // queda libre para el próximo agrupamiento
        self.store.clear_trip_members(trip_id).await?;

        info!(
            "🚫 Viaje {} cancelado ({}); {} solicitaciones vuelven a pendiente",
            trip_id,
            input.reason,
            members.len()
        );

        Ok(updated)
    }

    /// El motorista se baja de un viaje aceptado pero no iniciado. El
    /// viaje vuelve a Pendiente para que otro motorista lo tome; las
    /// solicitaciones vuelven a Agrupada (NO a Pendiente: el cascarón
    /// del viaje se preserva para la reasignación).
    pub async fn withdraw(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<Trip> {
        let trip = self.load_trip(trip_id).await?;

        if trip.driver_id != Some(driver_id) {
            return Err(forbidden_error(
                "withdraw from trip",
                "driver does not own this trip",
            ));
        }
        if trip.status != TripStatus::Scheduled {
            return Err(state_conflict(trip_id, "scheduled", trip.status));
        }

        let mut updated = trip;
        updated.status = TripStatus::Pending;
        updated.driver_id = None;
        updated.updated_at = Utc::now();

        if !self
            .store
            .save_trip_if_status(&updated, TripStatus::Scheduled)
            .await?
        {
            return Err(self.lost_race(trip_id, "scheduled").await);
        }

        for member in self.store.get_trip_members(trip_id).await? {
            self.store
                .save_request_status(member.id, RequestStatus::Grouped, Some(trip_id))
                .await?;
        }

        info!(
            "↩️ Motorista {} desasociado del viaje {}; disponible de nuevo",
            driver_id, trip_id
        );

        Ok(updated)
    }
}
