use crate::graph::{node_to_coordinate, StreetGraph};
use crate::models::{Coordinate, Route};
use crate::spatial_index::NodeLocator;
use crate::utils::{calculate_travel_time, haversine_m, path_length_m};
use petgraph::algo::astar;
use petgraph::graph::NodeIndex;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("No route available from {origin} to {destination}")]
    Unavailable {
        origin: Coordinate,
        destination: Coordinate,
    },
    #[error("Route resolution timed out after {0:?}")]
    Timeout(Duration),
}

/// Produces a route between two coordinates.
///
/// Implementations are called from the blocking thread pool and may block.
pub trait RouteResolver: Send + Sync {
    fn resolve_route(&self, origin: Coordinate, destination: Coordinate)
        -> Result<Route, RouteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    StraightLine,
    #[default]
    Network,
}

impl FromStr for RoutingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "straight" | "straight_line" | "straightline" => Ok(RoutingMode::StraightLine),
            "network" => Ok(RoutingMode::Network),
            _ => Err(format!("unknown routing mode {s:?}, expected straight or network")),
        }
    }
}

/// Direct two-point route, used when no street network is wanted.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineResolver {
    pub speed_kph: f64,
}

impl RouteResolver for StraightLineResolver {
    fn resolve_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteError> {
        let path = vec![origin, destination];
        let length_m = path_length_m(&path);
        Ok(Route {
            path,
            length_m,
            duration_s: calculate_travel_time(length_m, self.speed_kph),
        })
    }
}

/// Stands in when no street network could be loaded: every route is
/// unavailable, so amenities are still listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetworkResolver;

impl RouteResolver for NoNetworkResolver {
    fn resolve_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteError> {
        Err(RouteError::Unavailable {
            origin,
            destination,
        })
    }
}

/// Shortest path by length over a street network.
pub struct NetworkRouteResolver {
    graph: Arc<StreetGraph>,
    locator: NodeLocator,
    max_snap_distance_m: f64,
}

impl NetworkRouteResolver {
    pub fn new(graph: Arc<StreetGraph>, max_snap_distance_m: f64) -> Self {
        let locator = NodeLocator::build(&graph);
        Self {
            graph,
            locator,
            max_snap_distance_m,
        }
    }

    fn snap(&self, coordinate: Coordinate) -> Option<NodeIndex> {
        self.locator
            .nearest(&self.graph, coordinate, self.max_snap_distance_m)
    }

    fn travel_time(&self, path: &[NodeIndex]) -> f64 {
        // parallel edges: the shortest one is the one astar took
        path.windows(2)
            .filter_map(|w| {
                self.graph
                    .edges_connecting(w[0], w[1])
                    .min_by(|a, b| a.weight().length.total_cmp(&b.weight().length))
                    .map(|edge| edge.weight().travel_time)
            })
            .sum()
    }
}

impl RouteResolver for NetworkRouteResolver {
    fn resolve_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RouteError> {
        let unavailable = || RouteError::Unavailable {
            origin,
            destination,
        };
        let start = self.snap(origin).ok_or_else(unavailable)?;
        let goal = self.snap(destination).ok_or_else(unavailable)?;
        let goal_coordinate = node_to_coordinate(&self.graph, goal);

        let (length_m, nodes) = astar(
            &*self.graph,
            start,
            |node| node == goal,
            |edge| edge.weight().length,
            |node| haversine_m(node_to_coordinate(&self.graph, node), goal_coordinate),
        )
        .ok_or_else(unavailable)?;

        tracing::trace!(%origin, %destination, hops = nodes.len(), length_m, "network route");
        Ok(Route {
            path: nodes
                .iter()
                .map(|&node| node_to_coordinate(&self.graph, node))
                .collect(),
            length_m,
            duration_s: self.travel_time(&nodes),
        })
    }
}

/// Resolves a route to every destination concurrently.
///
/// Each resolution runs on the blocking pool under its own `timeout`; a slow
/// or failed destination only affects its own slot. Results keep the order of
/// `destinations`.
///
/// Timed-out resolutions are abandoned, not cancelled. Callers owning a
/// runtime should shut it down with `shutdown_background` so they are not
/// kept waiting on them.
pub async fn resolve_routes(
    resolver: Arc<dyn RouteResolver>,
    origin: Coordinate,
    destinations: &[Coordinate],
    timeout: Duration,
) -> Vec<Result<Route, RouteError>> {
    // None when the timeout is too large to be represented as a deadline
    let deadline = tokio::time::Instant::now().checked_add(timeout);
    let handles = destinations
        .iter()
        .map(|&destination| {
            let resolver = Arc::clone(&resolver);
            let handle = tokio::task::spawn_blocking(move || {
                resolver.resolve_route(origin, destination)
            });
            (destination, handle)
        })
        .collect::<Vec<_>>();

    let mut routes = Vec::with_capacity(handles.len());
    for (destination, handle) in handles {
        let joined = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, handle).await,
            None => Ok(handle.await),
        };
        let route = match joined {
            Ok(Ok(route)) => route,
            Ok(Err(join_err)) => {
                tracing::error!(%destination, %join_err, "route resolver panicked");
                Err(RouteError::Unavailable {
                    origin,
                    destination,
                })
            }
            Err(_) => Err(RouteError::Timeout(timeout)),
        };
        routes.push(route);
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{create_graph, OsmNode, OsmNodeRef, OsmTag, OsmWay};

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn node(id: i64, lat: f64, lon: f64) -> OsmNode {
        OsmNode { id, lat, lon, tags: vec![] }
    }

    fn way(id: i64, refs: &[i64]) -> OsmWay {
        OsmWay {
            id,
            nodes: refs.iter().map(|&node_id| OsmNodeRef { node_id }).collect(),
            tags: vec![OsmTag {
                key: "highway".into(),
                value: "footway".into(),
            }],
            length: 0.0,
            speed_kph: 0.0,
            travel_time: 0.0,
        }
    }

    // 1 -- 2 -- 3 north of the origin, 1 -- 4 -- 5 east, and an island 6 -- 7
    fn network() -> Arc<StreetGraph> {
        let nodes = vec![
            node(1, 27.7172, 85.3240),
            node(2, 27.7182, 85.3240),
            node(3, 27.7192, 85.3240),
            node(4, 27.7172, 85.3250),
            node(5, 27.7172, 85.3260),
            node(6, 27.7300, 85.3400),
            node(7, 27.7301, 85.3401),
        ];
        let ways = vec![way(10, &[1, 2, 3]), way(11, &[1, 4, 5]), way(12, &[6, 7])];
        Arc::new(create_graph(nodes, ways, true))
    }

    #[test]
    fn test_straight_line_route() {
        let resolver = StraightLineResolver { speed_kph: 3.6 };
        let route = resolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7182, 85.3240))
            .unwrap();
        assert_eq!(route.path.len(), 2);
        assert!((route.length_m - 111.19).abs() < 0.05);
        assert!((route.duration_s - route.length_m).abs() < 1e-9);
    }

    #[test]
    fn test_network_route_follows_streets() {
        let resolver = NetworkRouteResolver::new(network(), 250.0);
        let route = resolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7192, 85.3241))
            .unwrap();

        assert_eq!(
            route.path,
            vec![
                coord(27.7172, 85.3240),
                coord(27.7182, 85.3240),
                coord(27.7192, 85.3240)
            ]
        );
        assert!((route.length_m - 222.39).abs() < 0.1);
        // footway default speed is 4.5 km/h
        assert!((route.duration_s - route.length_m / (4.5 / 3.6)).abs() < 1e-6);
    }

    #[test]
    fn test_same_node_gives_empty_length_route() {
        let resolver = NetworkRouteResolver::new(network(), 250.0);
        let route = resolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7172, 85.3240))
            .unwrap();
        assert_eq!(route.path.len(), 1);
        assert_eq!(route.length_m, 0.0);
    }

    #[test]
    fn test_disconnected_destination_is_unavailable() {
        let resolver = NetworkRouteResolver::new(network(), 250.0);
        let err = resolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7301, 85.3401))
            .unwrap_err();
        assert!(matches!(err, RouteError::Unavailable { .. }));
    }

    #[test]
    fn test_destination_too_far_from_network_is_unavailable() {
        let resolver = NetworkRouteResolver::new(network(), 250.0);
        let err = resolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7500, 85.3240))
            .unwrap_err();
        assert!(matches!(err, RouteError::Unavailable { .. }));
    }

    #[test]
    fn test_routing_mode_from_str() {
        assert_eq!("straight".parse::<RoutingMode>(), Ok(RoutingMode::StraightLine));
        assert_eq!("Network".parse::<RoutingMode>(), Ok(RoutingMode::Network));
        assert!("teleport".parse::<RoutingMode>().is_err());
    }

    struct SlowFor(Coordinate);

    impl RouteResolver for SlowFor {
        fn resolve_route(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<Route, RouteError> {
            if destination == self.0 {
                std::thread::sleep(Duration::from_millis(500));
            }
            StraightLineResolver { speed_kph: 5.0 }.resolve_route(origin, destination)
        }
    }

    #[tokio::test]
    async fn test_timeout_only_degrades_slow_destination() {
        let origin = coord(27.7172, 85.3240);
        let slow = coord(27.7182, 85.3240);
        let fast = coord(27.7192, 85.3240);
        let routes = resolve_routes(
            Arc::new(SlowFor(slow)),
            origin,
            &[fast, slow, fast],
            Duration::from_millis(100),
        )
        .await;

        assert_eq!(routes.len(), 3);
        assert!(routes[0].is_ok());
        assert_eq!(routes[1], Err(RouteError::Timeout(Duration::from_millis(100))));
        assert!(routes[2].is_ok());
    }

    #[test]
    fn test_shutdown_does_not_wait_for_timed_out_routes() {
        let origin = coord(27.7172, 85.3240);
        let slow = coord(27.7182, 85.3240);
        let started = std::time::Instant::now();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let routes = runtime.block_on(resolve_routes(
            Arc::new(SlowFor(slow)),
            origin,
            &[slow],
            Duration::from_millis(100),
        ));
        runtime.shutdown_background();

        assert_eq!(routes, vec![Err(RouteError::Timeout(Duration::from_millis(100)))]);
        assert!(started.elapsed() < Duration::from_millis(400), "{:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_unbounded_timeout() {
        let origin = coord(27.7172, 85.3240);
        let routes = resolve_routes(
            Arc::new(StraightLineResolver { speed_kph: 5.0 }),
            origin,
            &[coord(27.7182, 85.3240)],
            Duration::MAX,
        )
        .await;
        assert!(routes[0].is_ok());
    }

    #[test]
    fn test_no_network_resolver_is_unavailable() {
        let err = NoNetworkResolver
            .resolve_route(coord(27.7172, 85.3240), coord(27.7182, 85.3240))
            .unwrap_err();
        assert!(matches!(err, RouteError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_resolve_routes_keeps_order() {
        let origin = coord(27.7172, 85.3240);
        let destinations = [coord(27.7192, 85.3240), coord(27.7172, 85.3260)];
        let routes = resolve_routes(
            Arc::new(NetworkRouteResolver::new(network(), 250.0)),
            origin,
            &destinations,
            Duration::from_secs(5),
        )
        .await;

        let ends: Vec<Coordinate> = routes
            .iter()
            .map(|route| *route.as_ref().unwrap().path.last().unwrap())
            .collect();
        assert_eq!(ends, destinations);
    }
}
