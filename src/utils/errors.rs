//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del núcleo de
//! coordinación. El contrato es simple: valores de error tipados y
//! ninguna mutación parcial en caso de fallo; los mensajes de cara al
//! usuario, los reintentos y el rollback UX son responsabilidad de la
//! capa que nos invoca.

use thiserror::Error;
use uuid::Uuid;

use crate::models::TripStatus;

/// Errores principales del núcleo
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Transición intentada desde un estado no permitido, incluida la
    /// derrota en la carrera de aceptación de un viaje.
    #[error("State conflict on trip {trip_id}: expected {expected}, found {actual}")]
    StateConflict {
        trip_id: Uuid,
        expected: String,
        actual: TripStatus,
    },

    /// El agrupamiento manual excedería el máximo de pasajeros
    #[error("Capacity exceeded: group holds {current} of {capacity} passengers")]
    CapacityExceeded { capacity: usize, current: usize },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto de estado
pub fn state_conflict(trip_id: Uuid, expected: impl Into<String>, actual: TripStatus) -> AppError {
    AppError::StateConflict {
        trip_id,
        expected: expected.into(),
        actual,
    }
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

/// Función helper para crear errores internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}
