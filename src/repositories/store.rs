//! Contrato abstracto del almacén de transporte
//!
//! El núcleo no posee la tecnología de persistencia: opera contra este
//! trait. Toda operación de ciclo de vida relee el estado actual del
//! almacén (no hay estado mutable compartido en memoria entre llamadas)
//! y las escrituras de transición son condicionales (check-then-set)
//! para prevenir actualizaciones perdidas entre llamadores concurrentes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Driver, NewTrip, RequestFilter, RequestStatus, RideRequest, Trip, TripStatus,
};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait TransportStore: Send + Sync {
    /// Solicitaciones en estado pendiente, orden de creación ascendente
    async fn fetch_pending_requests(&self, filter: &RequestFilter) -> AppResult<Vec<RideRequest>>;

    async fn get_request(&self, id: Uuid) -> AppResult<Option<RideRequest>>;

    /// Actualiza estado y vínculo de viaje de una solicitación
    async fn save_request_status(
        &self,
        id: Uuid,
        status: RequestStatus,
        trip_id: Option<Uuid>,
    ) -> AppResult<()>;

    /// Persiste un lote completo de viajes con sus miembros en UNA
    /// transacción: si algún grupo falla, ningún grupo del lote queda
    /// parcialmente confirmado. Cada miembro debe seguir pendiente en el
    /// momento del commit; un miembro ya agrupado aborta el lote entero.
    async fn create_trip_batch(&self, trips: Vec<NewTrip>) -> AppResult<Vec<Uuid>>;

    async fn get_trip(&self, id: Uuid) -> AppResult<Option<Trip>>;

    /// Solicitaciones miembro del viaje, en orden de inserción
    async fn get_trip_members(&self, trip_id: Uuid) -> AppResult<Vec<RideRequest>>;

    /// Elimina la membresía del viaje. La cancelación DEBE llamarla al
    /// desvincular a los miembros: una solicitación solo puede pertenecer
    /// a un viaje vivo, y una fila de membresía huérfana bloquearía su
    /// re-agrupamiento en corridas futuras.
    async fn clear_trip_members(&self, trip_id: Uuid) -> AppResult<()>;

    /// Escritura condicional: aplica `trip` solo si el estado almacenado
    /// sigue siendo `expected`. Devuelve false si otra transición ganó.
    async fn save_trip_if_status(&self, trip: &Trip, expected: TripStatus) -> AppResult<bool>;

    /// Reclamo atómico de un viaje pendiente por un motorista: escritura
    /// condicional sobre el viaje (pendiente y sin motorista) que además
    /// verifica EN EL MISMO SNAPSHOT que el motorista no tenga otro viaje
    /// activo. Dos motoristas compitiendo por el mismo viaje, o el mismo
    /// motorista compitiendo por dos viajes, producen exactamente un
    /// reclamo exitoso.
    async fn try_claim_trip(&self, trip_id: Uuid, driver_id: Uuid) -> AppResult<bool>;

    async fn get_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;

    /// Alterna el flag offline manual del motorista (el único estado
    /// suyo que se almacena)
    async fn set_driver_offline(&self, driver_id: Uuid, offline: bool) -> AppResult<()>;

    /// Estados de los viajes activos (agendados o en andamento) del
    /// motorista, insumo de la derivación pura de su estado
    async fn driver_active_statuses(&self, driver_id: Uuid) -> AppResult<Vec<TripStatus>>;

    /// Marca los colaboradores como desligados; devuelve cuántos cambió
    async fn mark_employees_terminated(&self, employee_ids: &[Uuid]) -> AppResult<u64>;

    /// Valor crudo de configuración (tabla configuracion del sistema)
    async fn get_config_value(&self, key: &str) -> AppResult<Option<String>>;
}
