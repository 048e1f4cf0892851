use crate::graph::{OsmDocument, OsmNode};
use crate::models::{AmenityCategory, AmenityRecord, Coordinate};
use geo::{Centroid, LineString, Polygon};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read amenity dataset: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid amenity dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry of a static JSON dataset.
#[derive(Debug, Deserialize)]
struct DatasetEntry {
    id: i64,
    category: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    name: Option<String>,
}

/// Loads a JSON array of `{id, category, lat, lon, name?}` objects.
///
/// Entries with an unknown category or an invalid position are skipped.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<AmenityRecord>, DatasetError> {
    let file = File::open(path)?;
    read_dataset(BufReader::new(file))
}

pub fn read_dataset(reader: impl Read) -> Result<Vec<AmenityRecord>, DatasetError> {
    let entries: Vec<DatasetEntry> = serde_json::from_reader(reader)?;
    let total = entries.len();

    let records = entries
        .into_iter()
        .filter_map(|entry| {
            let category = entry
                .category
                .parse::<AmenityCategory>()
                .map_err(|err| tracing::warn!(id = entry.id, %err, "skipping dataset entry"))
                .ok()?;
            let coordinate = Coordinate::new(entry.lat, entry.lon)
                .map_err(|err| tracing::warn!(id = entry.id, %err, "skipping dataset entry"))
                .ok()?;
            Some(AmenityRecord {
                id: entry.id,
                category,
                coordinate,
                name: entry.name,
            })
        })
        .collect::<Vec<_>>();

    tracing::info!(loaded = records.len(), skipped = total - records.len(), "amenity dataset loaded");
    Ok(records)
}

fn amenity_category(tag: Option<&str>) -> Option<AmenityCategory> {
    tag?.parse().ok()
}

/// Extracts amenities from an Overpass response.
///
/// Tagged nodes are used as they are; tagged ways (building outlines,
/// grounds) are placed at the centroid of their member nodes.
pub fn amenities_from_osm(document: &OsmDocument) -> Vec<AmenityRecord> {
    let positions: HashMap<i64, &OsmNode> =
        document.nodes.iter().map(|node| (node.id, node)).collect();

    let from_nodes = document.nodes.iter().filter_map(|node| {
        let category = amenity_category(node.tag("amenity"))?;
        let coordinate = Coordinate::new(node.lat, node.lon).ok()?;
        Some(AmenityRecord {
            id: node.id,
            category,
            coordinate,
            name: node.tag("name").map(str::to_string),
        })
    });

    let from_ways = document.ways.iter().filter_map(|way| {
        let category = amenity_category(way.tag("amenity"))?;
        let outline = way
            .nodes
            .iter()
            .filter_map(|nd| positions.get(&nd.node_id))
            .map(|node| (node.lon, node.lat))
            .collect::<Vec<_>>();
        if outline.is_empty() {
            tracing::warn!(id = way.id, "amenity way without resolvable nodes");
            return None;
        }
        let centroid = Polygon::new(LineString::from(outline), vec![]).centroid()?;
        let coordinate = Coordinate::new(centroid.y(), centroid.x()).ok()?;
        Some(AmenityRecord {
            id: way.id,
            category,
            coordinate,
            name: way.tag("name").map(str::to_string),
        })
    });

    from_nodes.chain(from_ways).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::parse_xml;

    const AMENITY_XML: &str = r#"<osm version="0.6">
  <node id="201" lat="27.7182" lon="85.3240">
    <tag k="amenity" v="pharmacy"/>
    <tag k="name" v="Sunrise Pharmacy"/>
  </node>
  <node id="205" lat="27.7180" lon="85.3250">
    <tag k="amenity" v="bank"/>
  </node>
  <node id="301" lat="27.7198" lon="85.3198"/>
  <node id="302" lat="27.7198" lon="85.3202"/>
  <node id="303" lat="27.7202" lon="85.3202"/>
  <node id="304" lat="27.7202" lon="85.3198"/>
  <way id="300">
    <nd ref="301"/>
    <nd ref="302"/>
    <nd ref="303"/>
    <nd ref="304"/>
    <nd ref="301"/>
    <tag k="amenity" v="school"/>
    <tag k="name" v="Durbar School"/>
  </way>
  <way id="310">
    <nd ref="999"/>
    <tag k="amenity" v="gym"/>
  </way>
</osm>"#;

    #[test]
    fn test_amenities_from_osm() {
        let document = parse_xml(AMENITY_XML).unwrap();
        let records = amenities_from_osm(&document);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].id, 201);
        assert_eq!(records[0].category, AmenityCategory::Pharmacy);
        assert_eq!(records[0].display_name(), "Sunrise Pharmacy");

        let school = &records[1];
        assert_eq!(school.id, 300);
        assert_eq!(school.category, AmenityCategory::School);
        assert!((school.coordinate.lat() - 27.72).abs() < 1e-9);
        assert!((school.coordinate.lon() - 85.32).abs() < 1e-9);
    }

    #[test]
    fn test_read_dataset_skips_bad_entries() {
        let json = r#"[
            {"id": 1, "category": "pharmacy", "lat": 27.7182, "lon": 85.3240, "name": "Sunrise Pharmacy"},
            {"id": 2, "category": "bank", "lat": 27.7182, "lon": 85.3240},
            {"id": 3, "category": "school", "lat": 95.0, "lon": 85.3240},
            {"id": 4, "category": "bus_station", "lat": 27.7172, "lon": 85.3260}
        ]"#;
        let records = read_dataset(json.as_bytes()).unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(records[1].name, None);
    }

    #[test]
    fn test_read_dataset_rejects_invalid_json() {
        assert!(matches!(
            read_dataset("{\"id\": 1}".as_bytes()),
            Err(DatasetError::Parse(_))
        ));
    }

    #[test]
    fn test_load_dataset_missing_file() {
        assert!(matches!(
            load_dataset("/definitely/not/here.json"),
            Err(DatasetError::Io(_))
        ));
    }
}
