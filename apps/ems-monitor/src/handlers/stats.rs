//! 能效统计 handlers
//!
//! - GET /api/stats/equipment
//! - GET /api/stats/areas

use crate::AppState;
use crate::utils::response::{ok, storage_error};
use crate::utils::stats_window;
use api_contract::{AreaStatsDto, EquipmentStatsDto, InefficiencyDto, StatsQuery};
use axum::{
    extract::{Query, State},
    response::Response,
};
use domain::{Equipment, ValidatedReading};
use ems_storage::{ReadingQuery, StorageError};
use ems_threshold::{AreaIndicators, EquipmentIndicators};
use std::collections::{BTreeSet, HashMap};

/// 每台已配置设备一条，区间内无读数的设备 sampleCount 为 0。
pub async fn equipment_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let (from, to) = match stats_window(query.from, query.to) {
        Ok(window) => window,
        Err(response) => return response,
    };
    let (equipment, readings) = match load_window(&state, from, to).await {
        Ok(loaded) => loaded,
        Err(err) => return storage_error(err),
    };

    let mut by_equipment: HashMap<&str, Vec<ValidatedReading>> = HashMap::new();
    for reading in &readings {
        by_equipment
            .entry(reading.equipment_id.as_str())
            .or_default()
            .push(reading.clone());
    }

    let data: Vec<EquipmentStatsDto> = equipment
        .iter()
        .map(|item| {
            let samples = by_equipment.get(item.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            equipment_stats_dto(item, &EquipmentIndicators::from_readings(samples))
        })
        .collect();
    ok(data)
}

/// 区域来自设备配置的 area_id；越限数取未确认的阈值事件。
pub async fn area_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Response {
    let (from, to) = match stats_window(query.from, query.to) {
        Ok(window) => window,
        Err(response) => return response,
    };
    let (equipment, readings) = match load_window(&state, from, to).await {
        Ok(loaded) => loaded,
        Err(err) => return storage_error(err),
    };
    let events = match state.events.list_active_events(0).await {
        Ok(events) => events,
        Err(err) => return storage_error(err),
    };

    let area_of: HashMap<&str, &str> = equipment
        .iter()
        .filter_map(|item| item.area_id.as_deref().map(|area| (item.id.as_str(), area)))
        .collect();
    let areas: BTreeSet<&str> = area_of.values().copied().collect();

    let mut violations: HashMap<&str, usize> = HashMap::new();
    for event in events
        .iter()
        .filter(|event| event.event_type != "communication_error")
    {
        if let Some(area) = area_of.get(event.equipment_id.as_str()) {
            *violations.entry(*area).or_default() += 1;
        }
    }

    let data: Vec<AreaStatsDto> = areas
        .into_iter()
        .map(|area| {
            let indicators = AreaIndicators::from_readings(area, &readings);
            AreaStatsDto {
                area_id: indicators.area_id,
                equipment_count: equipment
                    .iter()
                    .filter(|item| item.area_id.as_deref() == Some(area))
                    .count(),
                sample_count: indicators.sample_count,
                total_energy_kwh: indicators.total_energy_kwh,
                average_power: indicators.average_power,
                average_power_factor: indicators.average_power_factor,
                quality_score: indicators.quality_score,
                active_violations: violations.get(area).copied().unwrap_or(0),
            }
        })
        .collect();
    ok(data)
}

async fn load_window(
    state: &AppState,
    from: i64,
    to: i64,
) -> Result<(Vec<Equipment>, Vec<ValidatedReading>), StorageError> {
    let equipment = state.equipment.list_equipment().await?;
    let readings = state
        .readings
        .query_all_readings(ReadingQuery {
            from_ms: Some(from),
            to_ms: Some(to),
            ..ReadingQuery::default()
        })
        .await?;
    Ok((equipment, readings))
}

fn equipment_stats_dto(item: &Equipment, indicators: &EquipmentIndicators) -> EquipmentStatsDto {
    EquipmentStatsDto {
        equipment_id: item.id.clone(),
        equipment_name: item.name.clone(),
        area_id: item.area_id.clone(),
        sample_count: indicators.sample_count,
        average_power: indicators.average_power,
        max_power: indicators.max_power,
        min_power: indicators.min_power,
        load_factor: indicators.load_factor,
        average_power_factor: indicators.average_power_factor,
        min_power_factor: indicators.min_power_factor,
        average_voltage: indicators.average_voltage,
        voltage_deviation: indicators.voltage_deviation,
        energy_kwh: indicators.energy_kwh,
        quality_score: indicators.quality_score,
        rating: indicators.rating.as_str().to_string(),
        inefficiencies: indicators
            .inefficiencies()
            .into_iter()
            .map(|found| InefficiencyDto {
                kind: found.kind.as_str().to_string(),
                value: found.value,
                description: found.description,
            })
            .collect(),
    }
}
