//! Modelo de Solicitación de transporte
//!
//! Este módulo contiene el struct RideRequest y sus variantes.
//! Mapea exactamente al schema PostgreSQL con primary key 'id'.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Tipo de corrida - mapea al ENUM ride_type
///
/// Selecciona qué campo de horario gobierna el agrupamiento:
/// entrada → entry_time, salida → exit_time,
/// desligamento → termination_time (fallback a exit_time).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "ride_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RideType {
    Entry,
    Exit,
    EntryExit,
    Termination,
}

impl RideType {
    /// Parsea el tipo de corrida desde los strings del sistema legacy
    /// ("Entrada", "Saída", "Desligamento", "Entrada_Saída"),
    /// normalizando acentos y mayúsculas.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'ã' | 'á' | 'â' => 'a',
                'í' => 'i',
                'é' | 'ê' => 'e',
                _ => c,
            })
            .collect();

        match normalized.as_str() {
            "entrada" | "entry" => Some(Self::Entry),
            "saida" | "exit" => Some(Self::Exit),
            "entrada_saida" | "entry_exit" => Some(Self::EntryExit),
            "desligamento" | "termination" => Some(Self::Termination),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
            Self::EntryExit => "entry_exit",
            Self::Termination => "termination",
        }
    }
}

impl std::fmt::Display for RideType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estado de la solicitación - mapea al ENUM request_status
///
/// Pendiente → Agrupada (vinculada a un viaje) → Agendada →
/// En Andamento → Finalizada. Cancelada es terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Grouped,
    Scheduled,
    InProgress,
    Finalized,
    Cancelled,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Grouped => "grouped",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Finalized => "finalized",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Solicitación principal - mapea exactamente a la tabla ride_requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RideRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub supervisor_id: Option<Uuid>,
    pub block_id: Uuid,
    /// Código del bloque (ej: "CPV1.2") - la raíz antes del último punto
    /// define el grupo de bloque usado por la clasificación de fretados
    pub block_code: String,
    pub ride_type: RideType,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub termination_time: Option<DateTime<Utc>>,
    pub value: Option<Decimal>,
    pub repasse: Option<Decimal>,
    pub status: RequestStatus,
    pub trip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RideRequest {
    /// Horario relevante de la solicitación según el tipo de corrida.
    ///
    /// Desligamento cae a exit_time si no hay horario propio; para
    /// entrada_saida (o datos legacy inconsistentes) se toma el primer
    /// campo poblado. `None` significa solicitación malformada: el
    /// agrupamiento la reporta en la lista de descartadas, nunca aborta
    /// el lote completo.
    pub fn requested_time(&self) -> Option<DateTime<Utc>> {
        match self.ride_type {
            RideType::Entry => self.entry_time,
            RideType::Exit => self.exit_time,
            RideType::Termination => self.termination_time.or(self.exit_time),
            RideType::EntryExit => self
                .entry_time
                .or(self.exit_time)
                .or(self.termination_time),
        }
    }
}

/// Filtro para búsqueda de solicitaciones pendientes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    pub block_id: Option<Uuid>,
    pub ride_type: Option<RideType>,
}
