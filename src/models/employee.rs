//! Modelo de Colaborador

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del colaborador - mapea al ENUM employee_status
///
/// Terminated solo se establece al finalizar un viaje de desligamento.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "employee_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Terminated,
}

/// Colaborador principal - mapea exactamente a la tabla employees
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub block_id: Option<Uuid>,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
}
