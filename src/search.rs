use crate::models::{AmenityRecord, Coordinate, SearchRequest};
use crate::utils::{haversine_m, planar_m};
use std::str::FromStr;

/// How distance from the origin is measured when filtering by radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Planar,
}

impl DistanceMetric {
    pub fn distance_m(self, a: Coordinate, b: Coordinate) -> f64 {
        match self {
            DistanceMetric::Haversine => haversine_m(a, b),
            DistanceMetric::Planar => planar_m(a, b),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "haversine" => Ok(DistanceMetric::Haversine),
            "planar" => Ok(DistanceMetric::Planar),
            _ => Err(format!("unknown distance metric {s:?}, expected haversine or planar")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmenityMatch {
    pub record: AmenityRecord,
    pub distance_m: f64,
}

/// Records in `dataset` that match the request, in dataset order.
///
/// A non-positive radius or an empty category set matches nothing.
pub fn query_amenities(
    request: &SearchRequest,
    dataset: &[AmenityRecord],
    metric: DistanceMetric,
) -> Vec<AmenityMatch> {
    if request.is_vacuous() {
        return Vec::new();
    }

    dataset
        .iter()
        .filter(|record| request.categories.contains(&record.category))
        .filter_map(|record| {
            let distance_m = metric.distance_m(request.origin, record.coordinate);
            (distance_m <= request.radius_m).then(|| AmenityMatch {
                record: record.clone(),
                distance_m,
            })
        })
        .collect()
}
