//! Motor de agrupamiento de solicitaciones
//!
//! Agrupa solicitaciones pendientes que comparten bloque y tipo de
//! corrida en sub-grupos acotados por una janela de tiempo y una
//! capacidad de pasajeros. Las funciones son puras y deterministas dado
//! el mismo orden de entrada; una solicitación malformada nunca aborta
//! el lote: se reporta en la lista de descartadas y el resto sigue.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::Settings;
use crate::models::{RideRequest, RideType, VehicleClass};
use crate::utils::errors::{bad_request_error, AppError, AppResult};

use super::charter_service::{
    classify, cluster_by_block_group, summarize, ClassificationConfig, GroupingSummary,
};

/// Parámetros del barrido greedy
#[derive(Debug, Clone)]
pub struct GroupingConfig {
    pub max_passengers: usize,
    pub time_window_minutes: i64,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_passengers: 3,
            time_window_minutes: 30,
        }
    }
}

impl From<&Settings> for GroupingConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_passengers: settings.max_passengers,
            time_window_minutes: settings.time_window_minutes,
        }
    }
}

/// Solicitación descartada de una corrida de agrupamiento
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRequest {
    pub request_id: Uuid,
    pub reason: String,
}

/// Resultado del barrido greedy sobre una partición
#[derive(Debug, Default)]
pub struct GroupingOutcome {
    pub groups: Vec<Vec<RideRequest>>,
    pub skipped: Vec<SkippedRequest>,
}

/// Grupo sugerido, aún sin persistir
#[derive(Debug, Clone)]
pub struct PlannedGroup {
    pub vehicle_class: VehicleClass,
    pub requests: Vec<RideRequest>,
}

/// Plan completo de una corrida de agrupamiento (fretados + vehículos),
/// editable manualmente antes de materializarse en viajes
#[derive(Debug)]
pub struct GroupingPlan {
    pub groups: Vec<PlannedGroup>,
    pub skipped: Vec<SkippedRequest>,
    pub summary: GroupingSummary,
}

pub struct GroupingEngine {
    config: GroupingConfig,
}

impl GroupingEngine {
    pub fn new(config: GroupingConfig) -> Self {
        Self { config }
    }

    /// Procesamiento completo: clasifica los clusters gruesos en fretados
    /// y vehículos, y sub-divide los de vehículo por janela de tiempo.
    pub fn plan(
        &self,
        requests: Vec<RideRequest>,
        classification_config: &ClassificationConfig,
    ) -> GroupingPlan {
        let total = requests.len();
        let clusters = cluster_by_block_group(requests);
        let classification = classify(clusters, classification_config);
        let summary = summarize(&classification, classification_config);

        let mut groups = Vec::new();
        let mut skipped = Vec::new();

        // Un fretado sirve el cluster completo, exento de max_passengers
        for cluster in classification.chartered {
            groups.push(PlannedGroup {
                vehicle_class: VehicleClass::Charter,
                requests: cluster.requests,
            });
        }

        for cluster in classification.vehicle {
            let outcome = self.group_vehicle_requests(cluster.requests);
            skipped.extend(outcome.skipped);
            groups.extend(outcome.groups.into_iter().map(|requests| PlannedGroup {
                vehicle_class: VehicleClass::Vehicle,
                requests,
            }));
        }

        info!(
            "📊 Agrupamiento: {} solicitaciones → {} grupos ({} descartadas)",
            total,
            groups.len(),
            skipped.len()
        );

        GroupingPlan {
            groups,
            skipped,
            summary,
        }
    }

    /// Barrido greedy dentro de particiones (block_id, ride_type):
    /// ordena por horario relevante ascendente (estable) y cierra el
    /// grupo al exceder la janela respecto de la referencia o la
    /// capacidad. La primera solicitación de cada grupo es la referencia.
    pub fn group_vehicle_requests(&self, requests: Vec<RideRequest>) -> GroupingOutcome {
        let mut skipped = Vec::new();
        let mut order: Vec<(Uuid, RideType)> = Vec::new();
        let mut partitions: HashMap<(Uuid, RideType), Vec<RideRequest>> = HashMap::new();

        for request in requests {
            if request.requested_time().is_none() {
                skipped.push(SkippedRequest {
                    request_id: request.id,
                    reason: "no resolvable requested_time for ride_type".to_string(),
                });
                continue;
            }
            let key = (request.block_id, request.ride_type);
            partitions
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(request);
        }

        let window_seconds = self.config.time_window_minutes * 60;
        let mut groups = Vec::new();

        for key in &order {
            let Some(mut partition) = partitions.remove(key) else {
                continue;
            };
            // sort estable: empates conservan el orden relativo de entrada
            partition.sort_by_key(|r| r.requested_time());

            let mut iter = partition.into_iter();
            let Some(first) = iter.next() else { continue };
            let mut reference_time = first.requested_time();
            let mut current = vec![first];

            for request in iter {
                let time = request.requested_time();
                let within_window = match (time, reference_time) {
                    (Some(t), Some(reference)) => {
                        (t - reference).num_seconds().abs() <= window_seconds
                    }
                    _ => false,
                };

                if within_window && current.len() < self.config.max_passengers {
                    current.push(request);
                } else {
                    groups.push(current);
                    reference_time = time;
                    current = vec![request];
                }
            }

            groups.push(current);
        }

        GroupingOutcome { groups, skipped }
    }
}

impl GroupingPlan {
    /// Agrega una solicitación pendiente a un grupo vehículo existente.
    /// Rechaza grupos llenos y solicitaciones ya presentes en otro grupo.
    pub fn add_to_group(
        &mut self,
        group_index: usize,
        request: RideRequest,
        max_passengers: usize,
    ) -> AppResult<()> {
        if self
            .groups
            .iter()
            .any(|g| g.requests.iter().any(|r| r.id == request.id))
        {
            return Err(AppError::Conflict(
                "request is already part of another group".to_string(),
            ));
        }

        let group = self
            .groups
            .get_mut(group_index)
            .ok_or_else(|| bad_request_error("invalid group index"))?;

        if group.vehicle_class != VehicleClass::Vehicle {
            return Err(bad_request_error("charter groups cannot be edited manually"));
        }

        if group.requests.len() >= max_passengers {
            return Err(AppError::CapacityExceeded {
                capacity: max_passengers,
                current: group.requests.len(),
            });
        }

        group.requests.push(request);
        Ok(())
    }

    /// Quita una solicitación de un grupo; un grupo que queda vacío se
    /// elimina del plan.
    pub fn remove_from_group(&mut self, group_index: usize, request_id: Uuid) -> AppResult<()> {
        let group = self
            .groups
            .get_mut(group_index)
            .ok_or_else(|| bad_request_error("invalid group index"))?;

        group.requests.retain(|r| r.id != request_id);

        if group.requests.is_empty() {
            self.groups.remove(group_index);
        }
        Ok(())
    }

    /// Mezcla dos grupos vehículo si el total no excede la capacidad
    pub fn merge_groups(
        &mut self,
        first: usize,
        second: usize,
        max_passengers: usize,
    ) -> AppResult<()> {
        if first == second || first >= self.groups.len() || second >= self.groups.len() {
            return Err(bad_request_error("invalid group indexes"));
        }
        if self.groups[first].vehicle_class != VehicleClass::Vehicle
            || self.groups[second].vehicle_class != VehicleClass::Vehicle
        {
            return Err(bad_request_error("charter groups cannot be merged manually"));
        }

        let total = self.groups[first].requests.len() + self.groups[second].requests.len();
        if total > max_passengers {
            return Err(AppError::CapacityExceeded {
                capacity: max_passengers,
                current: total,
            });
        }

        let moved = self.groups.remove(second);
        let target = if second < first { first - 1 } else { first };
        self.groups[target].requests.extend(moved.requests);
        Ok(())
    }
}

/// Política de duplicados (aún no decidida en producto, ver Settings):
/// una solicitación del mismo colaborador, mismo tipo de corrida y mismo
/// día calendario que otra existente se considera duplicada.
pub fn is_duplicate(candidate: &RideRequest, existing: &[RideRequest]) -> bool {
    let Some(candidate_time) = candidate.requested_time() else {
        return false;
    };
    existing.iter().any(|other| {
        other.id != candidate.id
            && other.employee_id == candidate.employee_id
            && other.ride_type == candidate.ride_type
            && other
                .requested_time()
                .map_or(false, |t| t.date_naive() == candidate_time.date_naive())
    })
}
