//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar. Los estados son
//! ENUMs cerrados: las transiciones se validan en una tabla central
//! (services::trip_lifecycle_service), nunca con comparaciones de strings.

pub mod driver;
pub mod employee;
pub mod request;
pub mod trip;

pub use driver::{derive_driver_status, Driver, DriverStatus};
pub use employee::{Employee, EmployeeStatus};
pub use request::{RequestFilter, RequestStatus, RideRequest, RideType};
pub use trip::{CancelTripInput, NewTrip, NewTripMember, Trip, TripStatus, VehicleClass};
