//! Tests de integración del flujo completo: agrupamiento,
//! clasificación fretado/vehículo y materialización de viajes

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use transport_coordination::config::Settings;
use transport_coordination::models::{
    RequestStatus, RideRequest, RideType, TripStatus, VehicleClass,
};
use transport_coordination::repositories::{MemoryStore, TransportStore};
use transport_coordination::services::{
    ClassificationConfig, GroupingConfig, GroupingEngine, TripFactoryService,
};
use transport_coordination::AppError;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
}

fn entry_request(
    block: Uuid,
    block_code: &str,
    time: DateTime<Utc>,
    value: Decimal,
) -> RideRequest {
    RideRequest {
        id: Uuid::new_v4(),
        employee_id: Uuid::new_v4(),
        supervisor_id: None,
        block_id: block,
        block_code: block_code.to_string(),
        ride_type: RideType::Entry,
        entry_time: Some(time),
        exit_time: None,
        termination_time: None,
        value: Some(value),
        repasse: Some(value / Decimal::from(2)),
        status: RequestStatus::Pending,
        trip_id: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_charter_and_vehicle_trips_end_to_end() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let charter_block = Uuid::new_v4();
    let small_block = Uuid::new_v4();

    // 12 solicitaciones del mismo grupo de bloque: volumen de fretado
    let mut requests: Vec<RideRequest> = (0..12)
        .map(|i| {
            entry_request(
                charter_block,
                "CPV1.3",
                at(6, 0) + Duration::minutes(i * 3),
                Decimal::new(4000 + i * 100, 2),
            )
        })
        .collect();
    // 3 solicitaciones de otro bloque dentro de la janela: un vehículo
    requests.push(entry_request(small_block, "MDL2.1", at(6, 0), Decimal::new(5000, 2)));
    requests.push(entry_request(small_block, "MDL2.1", at(6, 10), Decimal::new(7500, 2)));
    requests.push(entry_request(small_block, "MDL2.1", at(6, 20), Decimal::new(6000, 2)));

    for request in &requests {
        store.seed_request(request.clone());
    }

    let engine = GroupingEngine::new(GroupingConfig::default());
    let plan = engine.plan(requests.clone(), &ClassificationConfig::default());

    assert_eq!(plan.groups.len(), 2);
    assert!(plan.skipped.is_empty());
    assert_eq!(plan.summary.charter_clusters, 1);

    // El resumen se expone serializable para la capa de reportes
    let summary_json = serde_json::to_value(&plan.summary).unwrap();
    assert_eq!(summary_json["total_requests"], 15);
    assert_eq!(summary_json["charter_passengers"], 12);
    assert_eq!(summary_json["charter_block_groups"][0], "CPV1");

    let factory = TripFactoryService::new(store.clone() as Arc<dyn TransportStore>);
    let result = factory.materialize_trips(&plan, None).await.unwrap();
    assert_eq!(result.trips_created, 2);
    assert_eq!(result.requests_grouped, 15);

    // Todas las solicitaciones quedaron agrupadas y vinculadas
    for request in &requests {
        let stored = store.get_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Grouped);
        assert!(stored.trip_id.is_some());
    }

    // El fretado lleva los 12 pasajeros sin partirse
    let charter_member = requests
        .iter()
        .find(|r| r.block_id == charter_block)
        .unwrap();
    let charter_trip_id = store
        .get_request(charter_member.id)
        .await
        .unwrap()
        .unwrap()
        .trip_id
        .unwrap();
    let charter_trip = store.get_trip(charter_trip_id).await.unwrap().unwrap();
    assert_eq!(charter_trip.vehicle_class, VehicleClass::Charter);
    assert_eq!(charter_trip.passenger_count, 12);
    assert_eq!(charter_trip.status, TripStatus::Pending);

    // El valor del viaje es el máximo entre los miembros, no la suma
    let small_member = requests.iter().find(|r| r.block_id == small_block).unwrap();
    let small_trip_id = store
        .get_request(small_member.id)
        .await
        .unwrap()
        .unwrap()
        .trip_id
        .unwrap();
    let small_trip = store.get_trip(small_trip_id).await.unwrap().unwrap();
    assert_eq!(small_trip.vehicle_class, VehicleClass::Vehicle);
    assert_eq!(small_trip.passenger_count, 3);
    assert_eq!(small_trip.value, Some(Decimal::new(7500, 2)));
}

#[tokio::test]
async fn test_window_splits_trips_by_reference_time() {
    let store = Arc::new(MemoryStore::new());
    let block = Uuid::new_v4();

    // 10:00 y 10:10 caben en la janela de la referencia; 10:45 no
    let requests = vec![
        entry_request(block, "CPV1.1", at(10, 0), Decimal::new(5000, 2)),
        entry_request(block, "CPV1.1", at(10, 10), Decimal::new(5000, 2)),
        entry_request(block, "CPV1.1", at(10, 45), Decimal::new(5000, 2)),
    ];
    for request in &requests {
        store.seed_request(request.clone());
    }

    let engine = GroupingEngine::new(GroupingConfig::default());
    let plan = engine.plan(requests.clone(), &ClassificationConfig::default());
    assert_eq!(plan.groups.len(), 2);
    assert_eq!(plan.groups[0].requests.len(), 2);
    assert_eq!(plan.groups[1].requests.len(), 1);
    assert_eq!(plan.groups[1].requests[0].id, requests[2].id);

    let factory = TripFactoryService::new(store.clone() as Arc<dyn TransportStore>);
    let result = factory.materialize_trips(&plan, None).await.unwrap();
    assert_eq!(result.trips_created, 2);
}

#[tokio::test]
async fn test_capacity_caps_every_vehicle_group() {
    let store = Arc::new(MemoryStore::new());
    let block = Uuid::new_v4();

    // 7 en el mismo horario: bajo el límite de fretado, sobre el de vehículo
    let requests: Vec<RideRequest> = (0..7)
        .map(|_| entry_request(block, "CPV1.1", at(8, 0), Decimal::new(5000, 2)))
        .collect();
    for request in &requests {
        store.seed_request(request.clone());
    }

    let engine = GroupingEngine::new(GroupingConfig::default());
    let plan = engine.plan(requests, &ClassificationConfig::default());

    let sizes: Vec<usize> = plan.groups.iter().map(|g| g.requests.len()).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
    assert!(plan
        .groups
        .iter()
        .all(|g| g.vehicle_class == VehicleClass::Vehicle));
}

#[tokio::test]
async fn test_request_without_timestamp_is_skipped_not_lost() {
    let store = Arc::new(MemoryStore::new());
    let block = Uuid::new_v4();

    let good = entry_request(block, "CPV1.1", at(8, 0), Decimal::new(5000, 2));
    let mut broken = entry_request(block, "CPV1.1", at(8, 5), Decimal::new(5000, 2));
    broken.entry_time = None;

    store.seed_request(good.clone());
    store.seed_request(broken.clone());

    let engine = GroupingEngine::new(GroupingConfig::default());
    let plan = engine.plan(vec![good.clone(), broken.clone()], &ClassificationConfig::default());

    assert_eq!(plan.groups.len(), 1);
    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.skipped[0].request_id, broken.id);

    let factory = TripFactoryService::new(store.clone() as Arc<dyn TransportStore>);
    factory.materialize_trips(&plan, None).await.unwrap();

    // La solicitación sin horario sigue pendiente para la próxima corrida
    let stored = store.get_request(broken.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(stored.trip_id.is_none());
}

#[tokio::test]
async fn test_materialize_twice_fails_without_duplicates() {
    let store = Arc::new(MemoryStore::new());
    let block = Uuid::new_v4();
    let request = entry_request(block, "CPV1.1", at(8, 0), Decimal::new(5000, 2));
    store.seed_request(request.clone());

    let engine = GroupingEngine::new(GroupingConfig::default());
    let plan = engine.plan(vec![request.clone()], &ClassificationConfig::default());

    let factory = TripFactoryService::new(store.clone() as Arc<dyn TransportStore>);
    factory.materialize_trips(&plan, None).await.unwrap();
    let first_trip = store
        .get_request(request.id)
        .await
        .unwrap()
        .unwrap()
        .trip_id;

    // Corrida repetida sobre el mismo plan: miembros ya no pendientes
    let err = factory.materialize_trips(&plan, None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // El vínculo original no cambia
    let stored = store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Grouped);
    assert_eq!(stored.trip_id, first_trip);
}

#[tokio::test]
async fn test_settings_from_config_store_drive_grouping() {
    let store = Arc::new(MemoryStore::new());
    store.set_config("max_passengers", "2");
    store.set_config("time_window_minutes", "60");

    let settings = Settings::load(store.as_ref()).await.unwrap();
    assert_eq!(settings.max_passengers, 2);
    assert_eq!(settings.time_window_minutes, 60);

    let block = Uuid::new_v4();
    // 10:00, 10:45 y 10:50: con janela de 60 entran juntos, pero el
    // límite de 2 pasajeros parte el tercero
    let requests = vec![
        entry_request(block, "CPV1.1", at(10, 0), Decimal::new(5000, 2)),
        entry_request(block, "CPV1.1", at(10, 45), Decimal::new(5000, 2)),
        entry_request(block, "CPV1.1", at(10, 50), Decimal::new(5000, 2)),
    ];

    let engine = GroupingEngine::new((&settings).into());
    let plan = engine.plan(requests, &(&settings).into());

    let sizes: Vec<usize> = plan.groups.iter().map(|g| g.requests.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
}
