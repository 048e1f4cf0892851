use crate::models::{AmenityCategory, AmenityRecord, Coordinate, Route};
use crate::route::RouteError;
use crate::search::AmenityMatch;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    pub record: AmenityRecord,
    pub distance_m: f64,
    /// `None` when no route could be produced; the entry is still shown.
    pub route: Option<Route>,
}

impl SearchEntry {
    /// Route length when routed, straight distance otherwise.
    pub fn travel_distance_m(&self) -> f64 {
        self.route
            .as_ref()
            .map_or(self.distance_m, |route| route.length_m)
    }
}

/// Matched amenities, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub origin: Coordinate,
    pub radius_m: f64,
    pub entries: Vec<SearchEntry>,
    pub category_counts: BTreeMap<AmenityCategory, usize>,
}

impl SearchResult {
    pub fn empty(origin: Coordinate, radius_m: f64) -> Self {
        Self {
            origin,
            radius_m,
            entries: Vec::new(),
            category_counts: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, category: AmenityCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    pub fn nearest(&self, category: AmenityCategory) -> Option<&SearchEntry> {
        self.entries
            .iter()
            .find(|entry| entry.record.category == category)
    }

    pub fn routed(&self) -> usize {
        self.entries.iter().filter(|entry| entry.route.is_some()).count()
    }
}

/// Pairs matches with their routes and orders them by ascending distance.
///
/// The sort is stable, so equal distances keep the order of `matches`.
/// Failed routes are logged and dropped from their entry.
pub fn aggregate(
    origin: Coordinate,
    radius_m: f64,
    matches: Vec<AmenityMatch>,
    routes: Vec<Result<Route, RouteError>>,
) -> SearchResult {
    debug_assert_eq!(matches.len(), routes.len());

    let mut entries = matches
        .into_iter()
        .zip(routes)
        .map(|(m, route)| {
            let route = route
                .map_err(|err| {
                    tracing::warn!(id = m.record.id, category = %m.record.category, %err, "showing amenity without route");
                })
                .ok();
            SearchEntry {
                record: m.record,
                distance_m: m.distance_m,
                route,
            }
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));

    let mut category_counts = BTreeMap::new();
    for entry in &entries {
        *category_counts.entry(entry.record.category).or_insert(0) += 1;
    }

    SearchResult {
        origin,
        radius_m,
        entries,
        category_counts,
    }
}
