//! Implementación en memoria del almacén de transporte
//!
//! Doble de pruebas con la misma semántica que PostgresStore: reclamo
//! atómico de viajes, escrituras condicionales y lote de agrupamiento
//! todo-o-nada. Un único Mutex por almacén hace que cada operación del
//! trait sea un snapshot consistente.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Driver, Employee, EmployeeStatus, NewTrip, RequestFilter, RequestStatus, RideRequest, Trip,
    TripStatus,
};
use crate::utils::errors::{internal_error, AppError, AppResult};

use super::store::TransportStore;

#[derive(Default)]
struct MemoryInner {
    requests: HashMap<Uuid, RideRequest>,
    trips: HashMap<Uuid, Trip>,
    /// trip_id → request_ids en orden de inserción
    members: HashMap<Uuid, Vec<Uuid>>,
    drivers: HashMap<Uuid, Driver>,
    employees: HashMap<Uuid, Employee>,
    config: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| internal_error("memory store lock poisoned"))
    }

    pub fn seed_request(&self, request: RideRequest) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.requests.insert(request.id, request);
        }
    }

    pub fn seed_driver(&self, driver: Driver) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.drivers.insert(driver.id, driver);
        }
    }

    pub fn seed_employee(&self, employee: Employee) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.employees.insert(employee.id, employee);
        }
    }

    pub fn set_config(&self, key: &str, value: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.config.insert(key.to_string(), value.to_string());
        }
    }

    pub fn get_employee(&self, id: Uuid) -> Option<Employee> {
        self.inner.lock().ok()?.employees.get(&id).cloned()
    }
}

#[async_trait]
impl TransportStore for MemoryStore {
    async fn fetch_pending_requests(&self, filter: &RequestFilter) -> AppResult<Vec<RideRequest>> {
        let inner = self.lock()?;
        let mut pending: Vec<RideRequest> = inner
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .filter(|r| filter.block_id.map_or(true, |b| r.block_id == b))
            .filter(|r| filter.ride_type.map_or(true, |t| r.ride_type == t))
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        Ok(pending)
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<RideRequest>> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn save_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        trip_id: Option<Uuid>,
    ) -> AppResult<()> {
        let mut inner = self.lock()?;
        let request = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("RideRequest with id '{}' not found", id)))?;
        request.status = status;
        request.trip_id = trip_id;
        Ok(())
    }

    async fn create_trip_batch(&self, trips: Vec<NewTrip>) -> AppResult<Vec<Uuid>> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        // Fase de validación: ningún grupo se aplica si alguno falla
        let mut seen: Vec<Uuid> = Vec::new();
        for new_trip in &trips {
            for member in &new_trip.members {
                let request = inner.requests.get(&member.request_id).ok_or_else(|| {
                    AppError::NotFound(format!(
                        "RideRequest with id '{}' not found",
                        member.request_id
                    ))
                })?;
                if request.status != RequestStatus::Pending || seen.contains(&member.request_id) {
                    return Err(AppError::Conflict(format!(
                        "request {} is no longer pending, aborting grouping run",
                        member.request_id
                    )));
                }
                seen.push(member.request_id);
            }
        }

        // Fase de aplicación
        let mut trip_ids = Vec::with_capacity(trips.len());
        for new_trip in trips {
            let trip_id = Uuid::new_v4();
            let member_ids: Vec<Uuid> = new_trip.members.iter().map(|m| m.request_id).collect();

            inner.trips.insert(
                trip_id,
                Trip {
                    id: trip_id,
                    status: TripStatus::Pending,
                    vehicle_class: new_trip.vehicle_class,
                    block_id: new_trip.block_id,
                    block_group: new_trip.block_group,
                    ride_type: new_trip.ride_type,
                    entry_time: new_trip.entry_time,
                    exit_time: new_trip.exit_time,
                    termination_time: new_trip.termination_time,
                    passenger_count: member_ids.len() as i32,
                    driver_id: None,
                    value: new_trip.value,
                    repasse: new_trip.repasse,
                    cancellation_reason: None,
                    cancelled_by: None,
                    created_by: new_trip.created_by,
                    created_at: now,
                    updated_at: now,
                    started_at: None,
                    finished_at: None,
                    cancelled_at: None,
                },
            );

            for request_id in &member_ids {
                if let Some(request) = inner.requests.get_mut(request_id) {
                    request.status = RequestStatus::Grouped;
                    request.trip_id = Some(trip_id);
                }
            }

            inner.members.insert(trip_id, member_ids);
            trip_ids.push(trip_id);
        }

        Ok(trip_ids)
    }

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.lock()?.trips.get(&id).cloned())
    }

    async fn get_trip_members(&self, trip_id: Uuid) -> AppResult<Vec<RideRequest>> {
        let inner = self.lock()?;
        let member_ids = inner.members.get(&trip_id).cloned().unwrap_or_default();
        Ok(member_ids
            .iter()
            .filter_map(|id| inner.requests.get(id).cloned())
            .collect())
    }

    async fn clear_trip_members(&self, trip_id: Uuid) -> AppResult<()> {
        let mut inner = self.lock()?;
        inner.members.remove(&trip_id);
        Ok(())
    }

    async fn save_trip_if_status(&self, trip: &Trip, expected: TripStatus) -> AppResult<bool> {
        let mut inner = self.lock()?;
        match inner.trips.get_mut(&trip.id) {
            Some(current) if current.status == expected => {
                *current = trip.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn try_claim_trip(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock()?;

        // Mismo snapshot que el reclamo: el motorista no puede tener
        // otro viaje activo en el momento de reclamar
        let driver_busy = inner.trips.values().any(|t| {
            t.driver_id == Some(driver_id)
                && matches!(t.status, TripStatus::Scheduled | TripStatus::InProgress)
        });
        if driver_busy {
            return Ok(false);
        }

        match inner.trips.get_mut(&trip_id) {
            Some(trip) if trip.status == TripStatus::Pending && trip.driver_id.is_none() => {
                trip.driver_id = Some(driver_id);
                trip.status = TripStatus::Scheduled;
                trip.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        Ok(self.lock()?.drivers.get(&id).cloned())
    }

    async fn set_driver_offline(&self, driver_id: Uuid, offline: bool) -> AppResult<()> {
        let mut inner = self.lock()?;
        let driver = inner
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| AppError::NotFound(format!("Driver with id '{}' not found", driver_id)))?;
        driver.offline = offline;
        Ok(())
    }

    async fn driver_active_statuses(&self, driver_id: Uuid) -> AppResult<Vec<TripStatus>> {
        let inner = self.lock()?;
        Ok(inner
            .trips
            .values()
            .filter(|t| t.driver_id == Some(driver_id))
            .filter(|t| matches!(t.status, TripStatus::Scheduled | TripStatus::InProgress))
            .map(|t| t.status)
            .collect())
    }

    async fn mark_employees_terminated(&self, employee_ids: &[Uuid]) -> AppResult<u64> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        for id in employee_ids {
            if let Some(employee) = inner.employees.get_mut(id) {
                employee.status = EmployeeStatus::Terminated;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn get_config_value(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.config.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTripMember, VehicleClass};
    use chrono::TimeZone;

    fn pending_request() -> RideRequest {
        RideRequest {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            supervisor_id: None,
            block_id: Uuid::new_v4(),
            block_code: "CPV1.1".to_string(),
            ride_type: crate::models::RideType::Entry,
            entry_time: Some(Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap()),
            exit_time: None,
            termination_time: None,
            value: None,
            repasse: None,
            status: RequestStatus::Pending,
            trip_id: None,
            created_at: Utc::now(),
        }
    }

    fn new_trip(members: Vec<NewTripMember>) -> NewTrip {
        NewTrip {
            vehicle_class: VehicleClass::Vehicle,
            block_id: None,
            block_group: Some("CPV1".to_string()),
            ride_type: crate::models::RideType::Entry,
            entry_time: None,
            exit_time: None,
            termination_time: None,
            value: None,
            repasse: None,
            created_by: None,
            members,
        }
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let ok = pending_request();
        let mut grouped = pending_request();
        grouped.status = RequestStatus::Grouped;
        store.seed_request(ok.clone());
        store.seed_request(grouped.clone());

        let batch = vec![
            new_trip(vec![NewTripMember {
                request_id: ok.id,
                employee_id: ok.employee_id,
            }]),
            new_trip(vec![NewTripMember {
                request_id: grouped.id,
                employee_id: grouped.employee_id,
            }]),
        ];

        let err = store.create_trip_batch(batch).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // El primer grupo tampoco se aplicó
        let reloaded = store.get_request(ok.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, RequestStatus::Pending);
        assert!(reloaded.trip_id.is_none());
    }

    #[tokio::test]
    async fn test_claim_rejects_busy_driver() {
        let store = MemoryStore::new();
        let req_a = pending_request();
        let req_b = pending_request();
        store.seed_request(req_a.clone());
        store.seed_request(req_b.clone());

        let trip_ids = store
            .create_trip_batch(vec![
                new_trip(vec![NewTripMember {
                    request_id: req_a.id,
                    employee_id: req_a.employee_id,
                }]),
                new_trip(vec![NewTripMember {
                    request_id: req_b.id,
                    employee_id: req_b.employee_id,
                }]),
            ])
            .await
            .unwrap();

        let driver = Uuid::new_v4();
        assert!(store.try_claim_trip(trip_ids[0], driver).await.unwrap());
        // El segundo viaje está pendiente, pero el motorista ya no
        assert!(!store.try_claim_trip(trip_ids[1], driver).await.unwrap());

        let second = store.get_trip(trip_ids[1]).await.unwrap().unwrap();
        assert_eq!(second.status, TripStatus::Pending);
        assert!(second.driver_id.is_none());
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = MemoryStore::new();
        let req = pending_request();
        store.seed_request(req.clone());
        let trip_ids = store
            .create_trip_batch(vec![new_trip(vec![NewTripMember {
                request_id: req.id,
                employee_id: req.employee_id,
            }])])
            .await
            .unwrap();

        let driver_a = Uuid::new_v4();
        let driver_b = Uuid::new_v4();
        assert!(store.try_claim_trip(trip_ids[0], driver_a).await.unwrap());
        assert!(!store.try_claim_trip(trip_ids[0], driver_b).await.unwrap());

        let trip = store.get_trip(trip_ids[0]).await.unwrap().unwrap();
        assert_eq!(trip.driver_id, Some(driver_a));
        assert_eq!(trip.status, TripStatus::Scheduled);
    }
}
