//! GTFS-realtime feed decoding and entity extraction.

use std::collections::HashMap;

use prost::Message;
use tracing::debug;

use super::error::FeedError;

/// One vehicle-positions entity, as consumed by the fusion stage.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleEntity {
    pub vehicle_id: String,
    pub route_id: String,
    pub trip_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Decode a GTFS-RT protobuf message.
pub fn decode_feed(bytes: &[u8]) -> Result<gtfs_realtime::FeedMessage, FeedError> {
    gtfs_realtime::FeedMessage::decode(bytes).map_err(FeedError::from)
}

/// Extract vehicle entities from the vehicle-positions feed, preserving feed
/// order. Entities without a vehicle payload are skipped; absent descriptor
/// fields keep their proto2 defaults (empty strings, zero coordinates).
pub fn vehicle_entities(feed: &gtfs_realtime::FeedMessage) -> Vec<VehicleEntity> {
    let mut vehicles = Vec::new();
    let mut skipped = 0usize;
    for entity in &feed.entity {
        let Some(vehicle) = &entity.vehicle else {
            skipped += 1;
            continue;
        };
        let trip = vehicle.trip.as_ref();
        let position = vehicle.position.as_ref();
        vehicles.push(VehicleEntity {
            vehicle_id: vehicle
                .vehicle
                .as_ref()
                .and_then(|d| d.id.clone())
                .unwrap_or_default(),
            route_id: trip.and_then(|t| t.route_id.clone()).unwrap_or_default(),
            trip_id: trip.and_then(|t| t.trip_id.clone()).unwrap_or_default(),
            latitude: position.map(|p| p.latitude as f64).unwrap_or_default(),
            longitude: position.map(|p| p.longitude as f64).unwrap_or_default(),
        });
    }
    debug!(
        vehicles = vehicles.len(),
        skipped, "Extracted vehicle position entities"
    );
    vehicles
}

/// Build the trip_id -> delay-seconds index from the trip-updates feed.
///
/// Only the first stop-time update of each entity counts, preferring its
/// arrival delay and falling back to its departure delay. A trip_id seen in
/// several entities keeps the last value in feed order.
pub fn trip_delays(feed: &gtfs_realtime::FeedMessage) -> HashMap<String, i32> {
    let mut delays = HashMap::new();
    for entity in &feed.entity {
        let Some(trip_update) = &entity.trip_update else {
            continue;
        };
        let Some(trip_id) = &trip_update.trip.trip_id else {
            continue;
        };
        let Some(first) = trip_update.stop_time_update.first() else {
            continue;
        };
        let delay = first
            .arrival
            .as_ref()
            .and_then(|event| event.delay)
            .or_else(|| first.departure.as_ref().and_then(|event| event.delay));
        if let Some(delay) = delay {
            delays.insert(trip_id.clone(), delay);
        }
    }
    debug!(trips = delays.len(), "Built trip delay index");
    delays
}
