//! Clasificación fretado vs. vehículo
//!
//! Se aplica sobre el agrupamiento grueso (grupo de bloque + tipo de
//! corrida, ignorando la janela fina de tiempo) ANTES del motor de
//! agrupamiento: una demanda simultánea grande para un mismo grupo de
//! bloque sale más barata con un bus fretado que con muchos viajes
//! chicos de auto.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::Settings;
use crate::models::{RideRequest, RideType};

/// Parámetros de la clasificación
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    /// Un cluster con fretado_limit + 1 o más solicitaciones es fretado
    pub fretado_limit: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { fretado_limit: 9 }
    }
}

impl From<&Settings> for ClassificationConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            fretado_limit: settings.fretado_limit,
        }
    }
}

/// Cluster grueso: todas las solicitaciones de un grupo de bloque y tipo
/// de corrida, sin sub-dividir todavía
#[derive(Debug, Clone)]
pub struct Cluster {
    pub block_group: String,
    pub ride_type: RideType,
    pub requests: Vec<RideRequest>,
}

/// Resultado de la clasificación
#[derive(Debug, Default)]
pub struct Classification {
    pub chartered: Vec<Cluster>,
    pub vehicle: Vec<Cluster>,
}

/// Estadísticas de una corrida de clasificación
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupingSummary {
    pub total_requests: usize,
    pub charter_clusters: usize,
    pub vehicle_clusters: usize,
    pub charter_passengers: usize,
    pub vehicle_passengers: usize,
    pub charter_block_groups: Vec<String>,
    pub vehicle_block_groups: Vec<String>,
    pub fretado_limit: usize,
}

/// Extrae el grupo de bloque a partir del código del bloque:
/// la raíz antes del último punto (CPV1.2 → CPV1, ABC → ABC).
pub fn block_group(block_code: &str) -> &str {
    match block_code.rfind('.') {
        Some(idx) => &block_code[..idx],
        None => block_code,
    }
}

/// Agrupa solicitaciones por (grupo de bloque, tipo de corrida),
/// preservando el orden de aparición de los clusters y de sus miembros.
pub fn cluster_by_block_group(requests: Vec<RideRequest>) -> Vec<Cluster> {
    let mut order: Vec<(String, RideType)> = Vec::new();
    let mut buckets: HashMap<(String, RideType), Vec<RideRequest>> = HashMap::new();

    for request in requests {
        let key = (
            block_group(&request.block_code).to_string(),
            request.ride_type,
        );
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(request);
    }

    order
        .into_iter()
        .filter_map(|key| {
            buckets.remove(&key).map(|requests| Cluster {
                block_group: key.0,
                ride_type: key.1,
                requests,
            })
        })
        .collect()
}

/// Clasifica cada cluster: fretado si su tamaño alcanza
/// fretado_limit + 1, vehículo en caso contrario (se lo sub-divide
/// después con la janela de tiempo y max_passengers).
pub fn classify(clusters: Vec<Cluster>, config: &ClassificationConfig) -> Classification {
    let mut classification = Classification::default();

    for cluster in clusters {
        if cluster.requests.len() >= config.fretado_limit + 1 {
            classification.chartered.push(cluster);
        } else {
            classification.vehicle.push(cluster);
        }
    }

    classification
}

/// Resumen estadístico de la clasificación
pub fn summarize(
    classification: &Classification,
    config: &ClassificationConfig,
) -> GroupingSummary {
    let charter_passengers: usize = classification
        .chartered
        .iter()
        .map(|c| c.requests.len())
        .sum();
    let vehicle_passengers: usize = classification
        .vehicle
        .iter()
        .map(|c| c.requests.len())
        .sum();

    GroupingSummary {
        total_requests: charter_passengers + vehicle_passengers,
        charter_clusters: classification.chartered.len(),
        vehicle_clusters: classification.vehicle.len(),
        charter_passengers,
        vehicle_passengers,
        charter_block_groups: classification
            .chartered
            .iter()
            .map(|c| c.block_group.clone())
            .collect(),
        vehicle_block_groups: classification
            .vehicle
            .iter()
            .map(|c| c.block_group.clone())
            .collect(),
        fretado_limit: config.fretado_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestStatus;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn request_in_block(block_code: &str, ride_type: RideType) -> RideRequest {
        RideRequest {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            supervisor_id: None,
            block_id: Uuid::new_v4(),
            block_code: block_code.to_string(),
            ride_type,
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

    #[test]
    fn test_block_group_extraction() {
        assert_eq!(block_group("CPV1.1"), "CPV1");
        assert_eq!(block_group("CPV1.2"), "CPV1");
        assert_eq!(block_group("SJC1.3"), "SJC1");
        // Sin punto, el código es su propio grupo
        assert_eq!(block_group("ABC"), "ABC");
        // Solo el último punto separa el sufijo
        assert_eq!(block_group("A.B.C"), "A.B");
    }

    #[test]
    fn test_twelve_requests_become_one_charter() {
        // 12 solicitaciones del mismo grupo/tipo con limite=9 → un solo
        // fretado de 12, no cuatro viajes de 3
        let requests: Vec<RideRequest> = (0..12)
            .map(|i| request_in_block(if i % 2 == 0 { "CPV1.1" } else { "CPV1.2" }, RideType::Entry))
            .collect();

        let clusters = cluster_by_block_group(requests);
        assert_eq!(clusters.len(), 1);

        let classification = classify(clusters, &ClassificationConfig { fretado_limit: 9 });
        assert_eq!(classification.chartered.len(), 1);
        assert_eq!(classification.chartered[0].requests.len(), 12);
        assert!(classification.vehicle.is_empty());
    }

    #[test]
    fn test_limit_is_exclusive_threshold() {
        // Exactamente fretado_limit solicitaciones siguen siendo vehículo;
        // hace falta limite + 1 para fretar
        let nine: Vec<RideRequest> = (0..9)
            .map(|_| request_in_block("SJC1.1", RideType::Exit))
            .collect();
        let ten: Vec<RideRequest> = (0..10)
            .map(|_| request_in_block("CPV1.1", RideType::Exit))
            .collect();

        let config = ClassificationConfig { fretado_limit: 9 };
        let classification = classify(
            cluster_by_block_group(nine.into_iter().chain(ten).collect()),
            &config,
        );

        assert_eq!(classification.vehicle.len(), 1);
        assert_eq!(classification.vehicle[0].block_group, "SJC1");
        assert_eq!(classification.chartered.len(), 1);
        assert_eq!(classification.chartered[0].block_group, "CPV1");
    }

    #[test]
    fn test_ride_type_separates_clusters() {
        let mut requests: Vec<RideRequest> = (0..6)
            .map(|_| request_in_block("CPV1.1", RideType::Entry))
            .collect();
        requests.extend((0..6).map(|_| request_in_block("CPV1.1", RideType::Exit)));

        let clusters = cluster_by_block_group(requests);
        // 12 personas del mismo grupo de bloque pero en direcciones
        // opuestas no se fretan juntas
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_summary_counts() {
        let mut requests: Vec<RideRequest> = (0..10)
            .map(|_| request_in_block("CPV1.1", RideType::Entry))
            .collect();
        requests.extend((0..3).map(|_| request_in_block("ABC", RideType::Entry)));

        let config = ClassificationConfig { fretado_limit: 9 };
        let classification = classify(cluster_by_block_group(requests), &config);
        let summary = summarize(&classification, &config);

        assert_eq!(summary.total_requests, 13);
        assert_eq!(summary.charter_clusters, 1);
        assert_eq!(summary.vehicle_clusters, 1);
        assert_eq!(summary.charter_passengers, 10);
        assert_eq!(summary.vehicle_passengers, 3);
        assert_eq!(summary.charter_block_groups, vec!["CPV1".to_string()]);
        assert_eq!(summary.vehicle_block_groups, vec!["ABC".to_string()]);
    }
}
