//! Static schedule tables: archive extraction and CSV loading.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::error::FeedError;
use super::types::ShapePoint;

/// ZIP bomb protection limit for the extracted archive.
const MAX_DECOMPRESSED_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GB

/// One row of trips.txt, validated at parse time.
#[derive(Debug, Clone)]
pub struct TripRow {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    /// Shape this trip runs along; an empty table value reads as unmapped
    pub shape_id: Option<String>,
}

/// Parsed static schedule bundle. Loaded once per archive download and
/// reused across refreshes while the cached archive stays fresh.
#[derive(Debug)]
pub struct ScheduleTables {
    pub shapes: HashMap<String, Vec<ShapePoint>>,
    pub trips: Vec<TripRow>,
    pub trip_shapes: HashMap<String, String>,
    pub loaded_at: DateTime<Utc>,
}

/// Extract the cached schedule archive into `dest_dir` (blocking — call on
/// spawn_blocking).
///
/// A corrupt archive is removed from the cache before the error is returned;
/// otherwise every following refresh would fail against the same bad bytes
/// instead of re-downloading.
pub fn extract_archive(zip_path: &Path, dest_dir: &Path) -> Result<(), FeedError> {
    let result = try_extract(zip_path, dest_dir);
    if let Err(FeedError::ParseError(_)) = &result {
        warn!(zip = %zip_path.display(), "Removing corrupt schedule archive from cache");
        if let Err(e) = std::fs::remove_file(zip_path) {
            warn!(zip = %zip_path.display(), error = %e, "Failed to remove corrupt archive");
        }
    }
    result
}

fn try_extract(zip_path: &Path, dest_dir: &Path) -> Result<(), FeedError> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| FeedError::ParseError(format!("corrupt schedule archive: {e}")))?;

    // ZIP bomb protection: check total uncompressed size
    let mut total_uncompressed: u64 = 0;
    for i in 0..archive.len() {
        if let Ok(entry) = archive.by_index(i) {
            total_uncompressed += entry.size();
        }
    }
    if total_uncompressed > MAX_DECOMPRESSED_SIZE {
        return Err(FeedError::ParseError(format!(
            "archive decompressed size {} bytes exceeds limit {} bytes",
            total_uncompressed, MAX_DECOMPRESSED_SIZE
        )));
    }

    std::fs::create_dir_all(dest_dir)?;
    archive
        .extract(dest_dir)
        .map_err(|e| FeedError::ParseError(format!("corrupt schedule archive: {e}")))?;

    info!(
        entries = archive.len(),
        decompressed_mb = total_uncompressed / (1024 * 1024),
        dest = %dest_dir.display(),
        "Extracted schedule archive"
    );
    Ok(())
}

/// Header lookup tolerant of a UTF-8 byte-order-mark on the field name (the
/// upstream export writes one in front of the first column).
fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == name)
}

fn parse_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    idx: usize,
    table: &str,
    column: &str,
) -> Result<T, FeedError> {
    let raw = record.get(idx).unwrap_or("");
    raw.parse()
        .map_err(|_| FeedError::ParseError(format!("{table}: invalid {column} value {raw:?}")))
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Load shapes.txt: points grouped by shape_id, each group sorted by
/// shape_pt_sequence ascending.
pub fn load_shapes(path: &Path) -> Result<HashMap<String, Vec<ShapePoint>>, FeedError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let idx_id = header_index(&headers, "shape_id")
        .ok_or_else(|| FeedError::ParseError("shapes.txt missing shape_id".into()))?;
    let idx_lat = header_index(&headers, "shape_pt_lat")
        .ok_or_else(|| FeedError::ParseError("shapes.txt missing shape_pt_lat".into()))?;
    let idx_lon = header_index(&headers, "shape_pt_lon")
        .ok_or_else(|| FeedError::ParseError("shapes.txt missing shape_pt_lon".into()))?;
    let idx_seq = header_index(&headers, "shape_pt_sequence")
        .ok_or_else(|| FeedError::ParseError("shapes.txt missing shape_pt_sequence".into()))?;

    let mut shapes: HashMap<String, Vec<ShapePoint>> = HashMap::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let shape_id = record.get(idx_id).unwrap_or("").to_string();
        if shape_id.is_empty() {
            skipped += 1;
            continue;
        }
        let lat = parse_field(&record, idx_lat, "shapes.txt", "shape_pt_lat")?;
        let lon = parse_field(&record, idx_lon, "shapes.txt", "shape_pt_lon")?;
        let seq = parse_field(&record, idx_seq, "shapes.txt", "shape_pt_sequence")?;
        shapes
            .entry(shape_id)
            .or_default()
            .push(ShapePoint { lat, lon, seq });
    }
    if skipped > 0 {
        warn!(skipped, "Skipped shapes.txt records with empty shape_id");
    }

    for points in shapes.values_mut() {
        points.sort_by_key(|p| p.seq);
    }
    Ok(shapes)
}

/// Load trips.txt into typed rows. trip_id, route_id and service_id columns
/// are required.
pub fn load_trips(path: &Path) -> Result<Vec<TripRow>, FeedError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let idx_trip = header_index(&headers, "trip_id")
        .ok_or_else(|| FeedError::ParseError("trips.txt missing trip_id".into()))?;
    let idx_route = header_index(&headers, "route_id")
        .ok_or_else(|| FeedError::ParseError("trips.txt missing route_id".into()))?;
    let idx_service = header_index(&headers, "service_id")
        .ok_or_else(|| FeedError::ParseError("trips.txt missing service_id".into()))?;
    let idx_shape = header_index(&headers, "shape_id");

    let mut trips = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = result?;
        let trip_id = record.get(idx_trip).unwrap_or("").to_string();
        if trip_id.is_empty() {
            skipped += 1;
            continue;
        }
        trips.push(TripRow {
            trip_id,
            route_id: record.get(idx_route).unwrap_or("").to_string(),
            service_id: record.get(idx_service).unwrap_or("").to_string(),
            shape_id: idx_shape.and_then(|i| record.get(i)).and_then(non_empty),
        });
    }
    if skipped > 0 {
        warn!(skipped, "Skipped trips.txt records with empty trip_id");
    }
    Ok(trips)
}

/// Load the full static bundle from an extracted archive directory
/// (blocking — call on spawn_blocking).
pub fn load_tables(dir: &Path) -> Result<ScheduleTables, FeedError> {
    let shapes = load_shapes(&dir.join("shapes.txt"))?;
    let total_points: usize = shapes.values().map(|v| v.len()).sum();
    info!(shapes = shapes.len(), points = total_points, "Parsed shapes.txt");

    let trips = load_trips(&dir.join("trips.txt"))?;
    info!(count = trips.len(), "Parsed trips.txt");

    // The last row wins for a duplicate trip_id, including a row that drops
    // the mapping again.
    let mut trip_shapes: HashMap<String, String> = HashMap::new();
    for trip in &trips {
        match &trip.shape_id {
            Some(shape_id) => {
                trip_shapes.insert(trip.trip_id.clone(), shape_id.clone());
            }
            None => {
                trip_shapes.remove(&trip.trip_id);
            }
        }
    }
    info!(mapped_trips = trip_shapes.len(), "Built trip-to-shape index");

    Ok(ScheduleTables {
        shapes,
        trips,
        trip_shapes,
        loaded_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // shapes.txt with a BOM in front of the header row and points out of
    // sequence order, as the upstream export delivers them.
    const SHAPES_CSV: &str = "\u{feff}shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
        S1,52.41,16.93,2\n\
        S1,52.40,16.92,1\n\
        S1,52.42,16.94,3\n\
        S2,52.39,16.91,1\n";

    const TRIPS_CSV: &str = "trip_id,route_id,service_id,shape_id\n\
        T1,R12,WD,S1\n\
        T2,R12,WD,S2\n\
        T3,R5,WD,\n";

    fn write_table(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn write_archive(zip_path: &Path, tables: &[(&str, &str)]) {
        let file = std::fs::File::create(zip_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in tables {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn shapes_grouped_and_sorted_by_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "shapes.txt", SHAPES_CSV);

        let shapes = load_shapes(&dir.path().join("shapes.txt")).unwrap();
        assert_eq!(shapes.len(), 2);

        let s1 = &shapes["S1"];
        let seqs: Vec<u32> = s1.iter().map(|p| p.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(s1.windows(2).all(|w| w[0].seq <= w[1].seq));
        assert_eq!(s1[0].lat, 52.40);
        assert_eq!(shapes["S2"].len(), 1);
    }

    #[test]
    fn missing_required_column_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon\nS1,52.4,16.9\n",
        );

        let err = load_shapes(&dir.path().join("shapes.txt")).unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
        assert!(err.to_string().contains("shape_pt_sequence"));
    }

    #[test]
    fn malformed_coordinate_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nS1,not-a-number,16.9,1\n",
        );

        let err = load_shapes(&dir.path().join("shapes.txt")).unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
        assert!(err.to_string().contains("shape_pt_lat"));
    }

    #[test]
    fn absent_table_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_trips(&dir.path().join("trips.txt")).unwrap_err();
        assert!(matches!(err, FeedError::CsvError(_)));
    }

    #[test]
    fn trips_typed_rows_and_empty_shape_reads_unmapped() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "trips.txt", TRIPS_CSV);

        let trips = load_trips(&dir.path().join("trips.txt")).unwrap();
        assert_eq!(trips.len(), 3);
        assert_eq!(trips[0].trip_id, "T1");
        assert_eq!(trips[0].route_id, "R12");
        assert_eq!(trips[0].shape_id.as_deref(), Some("S1"));
        assert_eq!(trips[2].shape_id, None);
    }

    #[test]
    fn duplicate_trip_id_last_row_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\nS1,52.4,16.9,1\nS9,52.5,17.0,1\n",
        );
        write_table(
            dir.path(),
            "trips.txt",
            "trip_id,route_id,service_id,shape_id\n\
             T1,R12,WD,S1\n\
             T1,R12,WD,S9\n\
             T2,R5,WD,S1\n\
             T2,R5,WD,\n",
        );

        let tables = load_tables(dir.path()).unwrap();
        assert_eq!(tables.trip_shapes.get("T1").map(String::as_str), Some("S9"));
        assert_eq!(tables.trip_shapes.get("T2"), None);
    }

    #[test]
    fn load_tables_builds_full_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "shapes.txt", SHAPES_CSV);
        write_table(dir.path(), "trips.txt", TRIPS_CSV);

        let tables = load_tables(dir.path()).unwrap();
        assert_eq!(tables.shapes.len(), 2);
        assert_eq!(tables.trips.len(), 3);
        assert_eq!(tables.trip_shapes.len(), 2);
        assert_eq!(tables.trip_shapes["T2"], "S2");
    }

    #[test]
    fn corrupt_archive_is_removed_and_fails_as_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("gtfs.zip");
        std::fs::write(&zip_path, b"definitely not a zip archive").unwrap();

        let err = extract_archive(&zip_path, &dir.path().join("gtfs")).unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
        assert!(!zip_path.exists());
    }

    #[test]
    fn missing_archive_is_io_error_and_nothing_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(&dir.path().join("gtfs.zip"), &dir.path().join("gtfs"))
            .unwrap_err();
        assert!(matches!(err, FeedError::IoError(_)));
    }

    #[test]
    fn valid_archive_extracts_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("gtfs.zip");
        write_archive(&zip_path, &[("shapes.txt", SHAPES_CSV), ("trips.txt", TRIPS_CSV)]);

        let dest = dir.path().join("gtfs");
        extract_archive(&zip_path, &dest).unwrap();
        let tables = load_tables(&dest).unwrap();
        assert_eq!(tables.shapes.len(), 2);
        assert_eq!(tables.trips.len(), 3);
        assert_eq!(tables.trip_shapes["T1"], "S1");
        // The archive itself stays cached.
        assert!(zip_path.exists());
    }
}
