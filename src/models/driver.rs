//! Modelo de Motorista
//!
//! El estado del motorista NO se almacena: se deriva de sus viajes
//! activos en cada lectura. Solo el flag offline es explícito.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::trip::TripStatus;

/// Estado derivado del motorista
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    Scheduled,
    Busy,
    Offline,
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Scheduled => "scheduled",
            Self::Busy => "busy",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Motorista principal - mapea exactamente a la tabla drivers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub vehicle_plate: Option<String>,
    /// Flag explícito; los demás estados se derivan de los viajes
    pub offline: bool,
    pub created_at: DateTime<Utc>,
}

/// Deriva el estado del motorista a partir de sus viajes activos.
///
/// Precedencia: offline manual > ocupado (viaje en andamento) >
/// agendado (viaje aceptado) > disponible. Los estados de los viajes
/// deben venir del mismo snapshot transaccional que cualquier chequeo
/// de precondición para evitar carreras con una transición concurrente.
pub fn derive_driver_status(offline: bool, active_trips: &[TripStatus]) -> DriverStatus {
    if offline {
        return DriverStatus::Offline;
    }
    if active_trips.contains(&TripStatus::InProgress) {
        return DriverStatus::Busy;
    }
    if active_trips.contains(&TripStatus::Scheduled) {
        return DriverStatus::Scheduled;
    }
    DriverStatus::Available
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_driver_status_precedence() {
        assert_eq!(derive_driver_status(true, &[]), DriverStatus::Offline);
        assert_eq!(
            derive_driver_status(true, &[TripStatus::InProgress]),
            DriverStatus::Offline
        );
        assert_eq!(
            derive_driver_status(false, &[TripStatus::Scheduled, TripStatus::InProgress]),
            DriverStatus::Busy
        );
        assert_eq!(
            derive_driver_status(false, &[TripStatus::Scheduled]),
            DriverStatus::Scheduled
        );
        assert_eq!(derive_driver_status(false, &[]), DriverStatus::Available);
    }
}
