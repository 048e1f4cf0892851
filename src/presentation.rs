//! Map layers and the results table for a [`SearchResult`].
//!
//! Rendering itself happens elsewhere: a web map consumes the GeoJSON, a
//! terminal or dataframe consumes the rows.

use crate::aggregate::SearchResult;
use crate::models::Coordinate;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;

pub const ORIGIN_LABEL: &str = "Property Location";
pub const EMPTY_RESULT_MESSAGE: &str = "No amenities found or selected within the radius.";

// GeoJSON positions are [lon, lat]
fn position(coordinate: Coordinate) -> Vec<f64> {
    vec![coordinate.lon(), coordinate.lat()]
}

fn feature(value: Value, properties: serde_json::Value) -> Feature {
    let properties = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None::<JsonObject>,
    };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties,
        foreign_members: None,
    }
}

/// Origin marker, one marker per amenity and one polyline per route.
///
/// `listing_url` links the origin marker to the property it was picked from.
pub fn map_layers(result: &SearchResult, listing_url: Option<&str>) -> FeatureCollection {
    let mut features = Vec::with_capacity(1 + 2 * result.len());

    let mut origin = json!({
        "kind": "origin",
        "tooltip": ORIGIN_LABEL,
        "radius_m": result.radius_m,
    });
    if let Some(url) = listing_url {
        origin["url"] = json!(url);
    }
    features.push(feature(Value::Point(position(result.origin)), origin));

    for entry in &result.entries {
        let category = entry.record.category;
        if let Some(route) = entry.route.as_ref().filter(|route| route.path.len() > 1) {
            features.push(feature(
                Value::LineString(route.path.iter().copied().map(position).collect()),
                json!({
                    "kind": "route",
                    "amenity_id": entry.record.id,
                    "color": category.marker_color(),
                    "length_m": route.length_m,
                    "duration_s": route.duration_s,
                }),
            ));
        }
        features.push(feature(
            Value::Point(position(entry.record.coordinate)),
            json!({
                "kind": "amenity",
                "amenity_id": entry.record.id,
                "category": category.as_tag(),
                "name": entry.record.display_name(),
                "popup": category.label(),
                "color": category.marker_color(),
                "distance_m": entry.distance_m,
            }),
        ));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn map_layers_string(result: &SearchResult, listing_url: Option<&str>) -> String {
    GeoJson::FeatureCollection(map_layers(result, listing_url)).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub amenity: String,
    pub name: String,
    pub distance: String,
    pub total_within_radius: usize,
}

pub fn results_table(result: &SearchResult) -> Vec<TableRow> {
    result
        .entries
        .iter()
        .map(|entry| TableRow {
            amenity: entry.record.category.label().to_string(),
            name: entry.record.display_name().to_string(),
            distance: format!("{:.0} meters", entry.travel_distance_m()),
            total_within_radius: result.count(entry.record.category),
        })
        .collect()
}

/// Plain-text table with aligned columns.
pub fn render_table(result: &SearchResult) -> String {
    if result.is_empty() {
        return EMPTY_RESULT_MESSAGE.to_string();
    }

    let headers = [
        "Amenity".to_string(),
        "Name".to_string(),
        "Distance".to_string(),
        format!("Total Amenities within {:.0} meters", result.radius_m),
    ];
    let rows = results_table(result)
        .into_iter()
        .map(|row| {
            [
                row.amenity,
                row.name,
                row.distance,
                row.total_within_radius.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = [0usize; 4];
    for row in std::iter::once(&headers).chain(&rows) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String; 4]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(&headers)];
    lines.push(
        widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(rows.iter().map(format_line));
    lines.join("\n")
}
