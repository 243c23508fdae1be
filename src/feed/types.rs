//! Model types produced by the feed pipeline.

use serde::Serialize;
use utoipa::ToSchema;

/// A single point of a route's shape polyline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ShapePoint {
    pub lat: f64,
    pub lon: f64,
    /// Ordering key within the shape; points are sorted by this ascending
    pub seq: u32,
}

/// Geographic position reported by the vehicle-positions feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// One vehicle as served by the API: realtime position and identifiers,
/// joined with the delay and shape geometry known for its trip. Rebuilt from
/// scratch on every refresh, never patched in place.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub route_id: String,
    /// Unique trip identifier (GTFS trip_id); empty when the feed omits it
    pub trip_id: String,
    pub position: Position,
    /// Schedule deviation in seconds, when the trip-updates feed reported one
    pub delay_seconds: Option<i32>,
    /// Shape this trip runs along, when trips.txt maps one
    pub shape_id: Option<String>,
    /// Polyline of the mapped shape; empty when no shape is known
    pub shape_points: Vec<ShapePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_record_serializes_with_stable_field_names() {
        let record = VehicleRecord {
            vehicle_id: "v1".into(),
            route_id: "12".into(),
            trip_id: "T1".into(),
            position: Position {
                latitude: 52.4,
                longitude: 16.9,
            },
            delay_seconds: Some(60),
            shape_id: Some("S1".into()),
            shape_points: vec![ShapePoint {
                lat: 52.4,
                lon: 16.9,
                seq: 1,
            }],
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["vehicle_id"], "v1");
        assert_eq!(value["position"]["latitude"], 52.4);
        assert_eq!(value["delay_seconds"], 60);
        assert_eq!(value["shape_points"][0]["seq"], 1);
    }
}
