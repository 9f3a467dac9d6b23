//! Modelo de Viaje
//!
//! Este módulo contiene el struct Trip y sus variantes.
//! Un viaje agrupa solicitaciones de un mismo bloque y tipo de corrida;
//! un "grupo fretado" es el mismo Trip con vehicle_class = charter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use super::request::RideType;

/// Estado del viaje - mapea al ENUM trip_status
///
/// Pendiente → Agendada → En Andamento → Finalizada.
/// Cancelada es terminal, alcanzable solo desde Pendiente o Agendada.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Scheduled,
    InProgress,
    Finalized,
    Cancelled,
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Clase de vehículo asignada en la clasificación - mapea al ENUM vehicle_class
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "vehicle_class", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    /// Viaje ordinario, sujeto a max_passengers
    Vehicle,
    /// Fretado: un solo bus para todo el cluster, exento de capacidad
    Charter,
}

/// Trip principal - mapea exactamente a la tabla trips
///
/// La membresía de pasajeros vive en la tabla trip_passengers (normalizada,
/// con columna position para preservar el orden de inserción); aquí solo
/// se mantiene el contador calculado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: Uuid,
    pub status: TripStatus,
    pub vehicle_class: VehicleClass,
    pub block_id: Option<Uuid>,
    /// Grupo de bloque (ej: "CPV1") usado en la clasificación
    pub block_group: Option<String>,
    pub ride_type: RideType,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub termination_time: Option<DateTime<Utc>>,
    pub passenger_count: i32,
    pub driver_id: Option<Uuid>,
    pub value: Option<Decimal>,
    pub repasse: Option<Decimal>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Miembro de un viaje pendiente de persistir
#[derive(Debug, Clone)]
pub struct NewTripMember {
    pub request_id: Uuid,
    pub employee_id: Uuid,
}

/// Viaje pendiente de persistir, producido por la fábrica de viajes
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub vehicle_class: VehicleClass,
    pub block_id: Option<Uuid>,
    pub block_group: Option<String>,
    pub ride_type: RideType,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub termination_time: Option<DateTime<Utc>>,
    pub value: Option<Decimal>,
    pub repasse: Option<Decimal>,
    pub created_by: Option<Uuid>,
    /// Miembros en orden de inserción
    pub members: Vec<NewTripMember>,
}

/// Input para cancelar un viaje (admin o supervisor)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelTripInput {
    /// El motivo de cancelación es obligatorio
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub actor_id: Uuid,
}
