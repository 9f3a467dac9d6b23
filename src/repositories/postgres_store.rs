//! Implementación PostgreSQL del almacén de transporte
//!
//! Mapea el contrato TransportStore a sqlx/PostgreSQL. La membresía de
//! pasajeros vive en la tabla normalizada trip_passengers (no en un blob
//! JSON como en el sistema legacy), con columna position para preservar
//! el orden de inserción. El schema está en migrations/001_initial.sql.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Driver, NewTrip, RequestFilter, RequestStatus, RideRequest, Trip, TripStatus,
};
use crate::utils::errors::{AppError, AppResult};

use super::store::TransportStore;

/// Crear un pool de conexiones a la base de datos
pub async fn create_pool(database_url: Option<&str>) -> Result<PgPool> {
    let database_url = match database_url {
        Some(url) => url.to_string(),
        None => std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in environment variables"),
    };

    let pool = PgPool::connect(&database_url).await?;

    Ok(pool)
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransportStore for PostgresStore {
    async fn fetch_pending_requests(&self, filter: &RequestFilter) -> AppResult<Vec<RideRequest>> {
        let requests = sqlx::query_as::<_, RideRequest>(
            r#"
            SELECT * FROM ride_requests
            WHERE status = 'pending'
              AND ($1::uuid IS NULL OR block_id = $1)
              AND ($2::ride_type IS NULL OR ride_type = $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.block_id)
        .bind(filter.ride_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn get_request(&self, id: Uuid) -> AppResult<Option<RideRequest>> {
        let request = sqlx::query_as::<_, RideRequest>("SELECT * FROM ride_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn save_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        trip_id: Option<Uuid>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE ride_requests SET status = $2, trip_id = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(trip_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "RideRequest with id '{}' not found",
                id
            )));
        }

        Ok(())
    }

    async fn create_trip_batch(&self, trips: Vec<NewTrip>) -> AppResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;
        let mut trip_ids = Vec::with_capacity(trips.len());
        let now = Utc::now();

        for new_trip in trips {
            let trip_id = Uuid::new_v4();

            sqlx::query(
                r#"
                INSERT INTO trips (
                    id, status, vehicle_class, block_id, block_group, ride_type,
                    entry_time, exit_time, termination_time, passenger_count,
                    value, repasse, created_by, created_at, updated_at
                )
                VALUES ($1, 'pending', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
                "#,
            )
            .bind(trip_id)
            .bind(new_trip.vehicle_class)
            .bind(new_trip.block_id)
            .bind(&new_trip.block_group)
            .bind(new_trip.ride_type)
            .bind(new_trip.entry_time)
            .bind(new_trip.exit_time)
            .bind(new_trip.termination_time)
            .bind(new_trip.members.len() as i32)
            .bind(new_trip.value)
            .bind(new_trip.repasse)
            .bind(new_trip.created_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for (position, member) in new_trip.members.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO trip_passengers (trip_id, request_id, employee_id, position)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(trip_id)
                .bind(member.request_id)
                .bind(member.employee_id)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;

                // La solicitación debe seguir pendiente en el momento del
                // commit; si otra corrida la agrupó, aborta el lote entero
                let result = sqlx::query(
                    r#"
                    UPDATE ride_requests
                    SET status = 'grouped', trip_id = $2, updated_at = $3
                    WHERE id = $1 AND status = 'pending'
                    "#,
                )
                .bind(member.request_id)
                .bind(trip_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() != 1 {
                    return Err(AppError::Conflict(format!(
                        "request {} is no longer pending, aborting grouping run",
                        member.request_id
                    )));
                }
            }

            trip_ids.push(trip_id);
        }

        tx.commit().await?;

        Ok(trip_ids)
    }

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(trip)
    }

    async fn get_trip_members(&self, trip_id: Uuid) -> AppResult<Vec<RideRequest>> {
        let members = sqlx::query_as::<_, RideRequest>(
            r#"
            SELECT r.*
            FROM ride_requests r
            INNER JOIN trip_passengers tp ON tp.request_id = r.id
            WHERE tp.trip_id = $1
            ORDER BY tp.position ASC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn clear_trip_members(&self, trip_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM trip_passengers WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn save_trip_if_status(&self, trip: &Trip, expected: TripStatus) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET status = $3, driver_id = $4, passenger_count = $5, value = $6,
                repasse = $7, cancellation_reason = $8, cancelled_by = $9,
                updated_at = $10, started_at = $11, finished_at = $12,
                cancelled_at = $13
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(trip.id)
        .bind(expected)
        .bind(trip.status)
        .bind(trip.driver_id)
        .bind(trip.passenger_count)
        .bind(trip.value)
        .bind(trip.repasse)
        .bind(&trip.cancellation_reason)
        .bind(trip.cancelled_by)
        .bind(trip.updated_at)
        .bind(trip.started_at)
        .bind(trip.finished_at)
        .bind(trip.cancelled_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_claim_trip(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Los reclamos del mismo motorista se serializan sobre su fila;
        // sin esto, dos aceptaciones concurrentes sobre viajes distintos
        // podrían pasar ambas el chequeo de disponibilidad
        sqlx::query("SELECT id FROM drivers WHERE id = $1 FOR UPDATE")
            .bind(driver_id)
            .fetch_optional(&mut *tx)
            .await?;

        let result = sqlx::query(
            r#"
            UPDATE trips
            SET driver_id = $2, status = 'scheduled', updated_at = $3
            WHERE id = $1 AND status = 'pending' AND driver_id IS NULL
              AND NOT EXISTS (
                  SELECT 1 FROM trips
                  WHERE driver_id = $2 AND status IN ('scheduled', 'in_progress')
              )
            "#,
        )
        .bind(trip_id)
        .bind(driver_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn set_driver_offline(&self, driver_id: Uuid, offline: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE drivers SET offline = $2 WHERE id = $1")
            .bind(driver_id)
            .bind(offline)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Driver with id '{}' not found",
                driver_id
            )));
        }

        Ok(())
    }

    async fn driver_active_statuses(&self, driver_id: Uuid) -> AppResult<Vec<TripStatus>> {
        let statuses: Vec<(TripStatus,)> = sqlx::query_as(
            r#"
            SELECT status FROM trips
            WHERE driver_id = $1 AND status IN ('scheduled', 'in_progress')
            "#,
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(statuses.into_iter().map(|(s,)| s).collect())
    }

    async fn mark_employees_terminated(&self, employee_ids: &[Uuid]) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE employees SET status = 'terminated', updated_at = $2 WHERE id = ANY($1)",
        )
        .bind(employee_ids)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_config_value(&self, key: &str) -> AppResult<Option<String>> {
        let value: Option<(String,)> =
            sqlx::query_as("SELECT value FROM system_config WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.map(|(v,)| v))
    }
}
