//! Joining realtime vehicle entities with static shape and delay data.

use std::collections::HashMap;

use tracing::debug;

use super::realtime::VehicleEntity;
use super::static_data::ScheduleTables;
use super::types::{Position, VehicleRecord};

/// Join vehicle entities with the delay index and the schedule tables.
///
/// Produces exactly one record per input entity, in feed order. A missing
/// delay, trip-to-shape mapping or shape geometry leaves the corresponding
/// field empty; no entity is dropped here.
pub fn fuse_vehicles(
    vehicles: &[VehicleEntity],
    delays: &HashMap<String, i32>,
    schedule: &ScheduleTables,
) -> Vec<VehicleRecord> {
    let mut with_shape = 0usize;
    let records: Vec<VehicleRecord> = vehicles
        .iter()
        .map(|vehicle| {
            let delay_seconds = delays.get(&vehicle.trip_id).copied();
            let shape_id = schedule.trip_shapes.get(&vehicle.trip_id).cloned();
            let shape_points = shape_id
                .as_ref()
                .and_then(|id| schedule.shapes.get(id))
                .cloned()
                .unwrap_or_default();
            if !shape_points.is_empty() {
                with_shape += 1;
            }
            VehicleRecord {
                vehicle_id: vehicle.vehicle_id.clone(),
                route_id: vehicle.route_id.clone(),
                trip_id: vehicle.trip_id.clone(),
                position: Position {
                    latitude: vehicle.latitude,
                    longitude: vehicle.longitude,
                },
                delay_seconds,
                shape_id,
                shape_points,
            }
        })
        .collect();
    debug!(total = records.len(), with_shape, "Fused vehicle records");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::ShapePoint;
    use chrono::Utc;

    fn schedule() -> ScheduleTables {
        let mut shapes = HashMap::new();
        shapes.insert(
            "S1".to_string(),
            vec![
                ShapePoint {
                    lat: 52.40,
                    lon: 16.92,
                    seq: 1,
                },
                ShapePoint {
                    lat: 52.41,
                    lon: 16.93,
                    seq: 2,
                },
            ],
        );
        let mut trip_shapes = HashMap::new();
        trip_shapes.insert("T1".to_string(), "S1".to_string());
        // Mapped, but the shape itself is missing from shapes.txt.
        trip_shapes.insert("T9".to_string(), "S9".to_string());
        ScheduleTables {
            shapes,
            trips: Vec::new(),
            trip_shapes,
            loaded_at: Utc::now(),
        }
    }

    fn entity(vehicle_id: &str, trip_id: &str) -> VehicleEntity {
        VehicleEntity {
            vehicle_id: vehicle_id.to_string(),
            route_id: "12".to_string(),
            trip_id: trip_id.to_string(),
            latitude: 52.4,
            longitude: 16.9,
        }
    }

    #[test]
    fn mapped_trip_gets_delay_shape_and_points() {
        let mut delays = HashMap::new();
        delays.insert("T1".to_string(), 95);

        let records = fuse_vehicles(&[entity("v1", "T1")], &delays, &schedule());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.delay_seconds, Some(95));
        assert_eq!(record.shape_id.as_deref(), Some("S1"));
        assert_eq!(record.shape_points.len(), 2);
        assert_eq!(record.shape_points[0].seq, 1);
        assert_eq!(record.position.latitude, 52.4);
    }

    #[test]
    fn unmapped_trip_yields_absent_shape_id_and_empty_points() {
        let records = fuse_vehicles(&[entity("v1", "T-unknown")], &HashMap::new(), &schedule());
        let record = &records[0];
        assert_eq!(record.delay_seconds, None);
        assert_eq!(record.shape_id, None);
        assert!(record.shape_points.is_empty());
    }

    #[test]
    fn mapped_shape_missing_from_table_keeps_id_with_empty_points() {
        let records = fuse_vehicles(&[entity("v1", "T9")], &HashMap::new(), &schedule());
        let record = &records[0];
        assert_eq!(record.shape_id.as_deref(), Some("S9"));
        assert!(record.shape_points.is_empty());
    }

    #[test]
    fn one_record_per_entity_in_feed_order() {
        let input = [entity("v2", "T1"), entity("v1", "T-x"), entity("v2", "T1")];
        let records = fuse_vehicles(&input, &HashMap::new(), &schedule());
        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.vehicle_id.as_str()).collect();
        assert_eq!(ids, vec!["v2", "v1", "v2"]);
    }
}
