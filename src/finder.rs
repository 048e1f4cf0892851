use crate::aggregate::{aggregate, SearchResult};
use crate::amenities::amenities_from_osm;
use crate::cache;
use crate::config::Settings;
use crate::error::FinderError;
use crate::graph::{self, StreetGraph};
use crate::models::{AmenityRecord, Coordinate, SearchRequest};
use crate::overpass::{self, NetworkType, OverpassError};
use crate::route::{
    resolve_routes, NetworkRouteResolver, NoNetworkResolver, RouteResolver, RoutingMode,
    StraightLineResolver,
};
use crate::search::{query_amenities, AmenityMatch};
use std::sync::Arc;

/// Runs searches with one set of [`Settings`].
///
/// Every call recomputes its result from the request; only Overpass
/// responses are memoized.
#[derive(Debug, Clone, Default)]
pub struct AmenityFinder {
    settings: Settings,
}

impl AmenityFinder {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Searches `dataset` and routes with the given resolver.
    pub async fn search_with(
        &self,
        request: &SearchRequest,
        dataset: &[AmenityRecord],
        resolver: Arc<dyn RouteResolver>,
    ) -> SearchResult {
        let matches = query_amenities(request, dataset, self.settings.metric);
        self.route_and_rank(request, matches, resolver).await
    }

    /// Searches a static dataset, routing per the configured mode.
    ///
    /// Routing problems never fail the search; affected entries come back
    /// without a route.
    pub async fn search_dataset(
        &self,
        request: &SearchRequest,
        dataset: &[AmenityRecord],
    ) -> SearchResult {
        let matches = query_amenities(request, dataset, self.settings.metric);
        if matches.is_empty() {
            tracing::info!(radius_m = request.radius_m, "no amenities within radius");
            return SearchResult::empty(request.origin, request.radius_m);
        }
        let resolver = self.route_resolver(request.origin, request.radius_m).await;
        self.route_and_rank(request, matches, resolver).await
    }

    /// Fetches amenities around the origin from Overpass, then searches them.
    pub async fn search_overpass(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResult, FinderError> {
        if request.is_vacuous() {
            return Ok(SearchResult::empty(request.origin, request.radius_m));
        }
        let amenities = fetch_amenities(&self.settings, request).await?;
        Ok(self.search_dataset(request, &amenities).await)
    }

    /// Resolver for the configured routing mode. If the street network cannot
    /// be fetched, every route resolves as unavailable.
    pub async fn route_resolver(
        &self,
        origin: Coordinate,
        radius_m: f64,
    ) -> Arc<dyn RouteResolver> {
        if self.settings.routing == RoutingMode::StraightLine {
            return Arc::new(StraightLineResolver {
                speed_kph: self.settings.walking_speed_kph,
            });
        }
        match fetch_street_graph(&self.settings, origin, radius_m).await {
            Ok(graph) => Arc::new(NetworkRouteResolver::new(
                graph,
                self.settings.max_snap_distance_m,
            )),
            Err(err) => {
                tracing::warn!(%err, "street network unavailable, listing amenities without routes");
                Arc::new(NoNetworkResolver)
            }
        }
    }

    async fn route_and_rank(
        &self,
        request: &SearchRequest,
        matches: Vec<AmenityMatch>,
        resolver: Arc<dyn RouteResolver>,
    ) -> SearchResult {
        let destinations = matches
            .iter()
            .map(|m| m.record.coordinate)
            .collect::<Vec<_>>();
        let routes = resolve_routes(
            resolver,
            request.origin,
            &destinations,
            self.settings.route_timeout,
        )
        .await;

        let result = aggregate(request.origin, request.radius_m, matches, routes);
        tracing::info!(
            found = result.len(),
            routed = result.routed(),
            radius_m = request.radius_m,
            "search finished"
        );
        result
    }
}

pub fn street_graph_from_xml(
    xml: &str,
    network_type: NetworkType,
) -> Result<StreetGraph, OverpassError> {
    let parsed = graph::parse_xml(xml)?;
    Ok(graph::create_graph(
        parsed.nodes,
        parsed.ways,
        network_type.is_bidirectional(),
    ))
}

/// Street network covering `dist` meters around `origin`.
pub async fn fetch_street_graph(
    settings: &Settings,
    origin: Coordinate,
    dist: f64,
) -> Result<Arc<StreetGraph>, OverpassError> {
    let polygon_coord_str = overpass::bbox_from_point(origin, dist);
    let query = overpass::create_overpass_query(&polygon_coord_str, settings.network_type);

    if let Some(graph) = cache::check_graph_cache(&query) {
        tracing::debug!("street graph cache hit");
        return Ok(graph);
    }

    let response =
        overpass::make_request(&settings.overpass_url, &query, settings.overpass_timeout).await?;
    let graph = Arc::new(street_graph_from_xml(&response, settings.network_type)?);
    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "fetched street graph"
    );
    cache::insert_graph(query, Arc::clone(&graph));
    Ok(graph)
}

/// Amenities of the requested categories around the request origin.
pub async fn fetch_amenities(
    settings: &Settings,
    request: &SearchRequest,
) -> Result<Arc<Vec<AmenityRecord>>, OverpassError> {
    let query =
        overpass::create_amenity_query(request.origin, request.radius_m, &request.categories);

    if let Some(amenities) = cache::check_amenity_cache(&query) {
        tracing::debug!("amenity cache hit");
        return Ok(amenities);
    }

    let response =
        overpass::make_request(&settings.overpass_url, &query, settings.overpass_timeout).await?;
    let document = graph::parse_xml(&response)?;
    let amenities = Arc::new(amenities_from_osm(&document));
    tracing::info!(count = amenities.len(), "fetched amenities");
    cache::insert_amenities(query, Arc::clone(&amenities));
    Ok(amenities)
}
