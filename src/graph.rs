use crate::models::Coordinate;
use crate::utils::{calculate_distance, calculate_travel_time};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

/// Directed street network; edge weights carry length, speed and travel time.
pub type StreetGraph = DiGraph<OsmNode, OsmWay>;

/// Body of an Overpass `[out:xml]` response.
#[derive(Debug, Deserialize, Default)]
pub struct OsmDocument {
    #[serde(rename = "node", default)]
    pub nodes: Vec<OsmNode>,
    #[serde(rename = "way", default)]
    pub ways: Vec<OsmWay>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OsmNode {
    #[serde(rename = "@id")]
    pub id: i64,
    #[serde(rename = "@lat")]
    pub lat: f64,
    #[serde(rename = "@lon")]
    pub lon: f64,
    #[serde(rename = "tag", default)]
    pub tags: Vec<OsmTag>,
}

impl OsmNode {
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from_trusted(self.lat, self.lon)
    }

    fn has_valid_position(&self) -> bool {
        Coordinate::new(self.lat, self.lon).is_ok()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OsmWay {
    #[serde(rename = "@id")]
    pub id: i64,
    #[serde(rename = "nd", default)]
    pub nodes: Vec<OsmNodeRef>,
    #[serde(rename = "tag", default)]
    pub tags: Vec<OsmTag>,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub speed_kph: f64,
    #[serde(default)]
    pub travel_time: f64,
}

impl OsmWay {
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }

    /// Edge weights don't need the node list or descriptive tags.
    fn as_edge(&self) -> OsmWay {
        let useful_tags_way: HashSet<&str> = [
            "bridge", "tunnel", "oneway", "lanes", "ref", "name", "highway", "maxspeed",
            "service", "access", "area", "landuse", "width", "est_width", "junction",
        ]
        .into_iter()
        .collect();

        OsmWay {
            id: self.id,
            nodes: Vec::new(),
            tags: self
                .tags
                .iter()
                .filter(|tag| useful_tags_way.contains(tag.key.as_str()))
                .cloned()
                .collect(),
            length: 0.0,
            speed_kph: 0.0,
            travel_time: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OsmNodeRef {
    #[serde(rename = "@ref")]
    pub node_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OsmTag {
    #[serde(rename = "@k")]
    pub key: String,
    #[serde(rename = "@v")]
    pub value: String,
}

fn find_tag<'a>(tags: &'a [OsmTag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.key == key)
        .map(|tag| tag.value.as_str())
}

pub fn parse_xml(xml_data: &str) -> Result<OsmDocument, quick_xml::DeError> {
    quick_xml::de::from_str(xml_data)
}

fn is_path_one_way(path: &OsmWay, bidirectional: bool) -> bool {
    let oneway_values = ["yes", "true", "1", "-1", "reverse", "T", "F"];

    if bidirectional {
        return false;
    }

    if let Some(oneway) = path.tag("oneway") {
        return oneway_values.contains(&oneway);
    }

    // Roundabouts are implicitly one way
    path.tag("junction") == Some("roundabout")
}

fn is_path_reversed(path: &OsmWay) -> bool {
    let reversed_values = ["-1", "reverse", "T"];
    path.tag("oneway")
        .is_some_and(|oneway| reversed_values.contains(&oneway))
}

/// Builds the street network from parsed Overpass data.
///
/// Nodes with out-of-range positions are dropped, and so are way segments
/// touching nodes that are missing from the document.
pub fn create_graph(nodes: Vec<OsmNode>, ways: Vec<OsmWay>, bidirectional: bool) -> StreetGraph {
    let mut graph = StreetGraph::new();
    let mut node_index_map = HashMap::new();

    for node in nodes {
        if !node.has_valid_position() {
            tracing::warn!(id = node.id, lat = node.lat, lon = node.lon, "skipping node with invalid position");
            continue;
        }
        let id = node.id;
        let node_index = graph.add_node(node);
        node_index_map.insert(id, node_index);
    }

    let mut dangling = 0usize;
    for way in ways {
        let edge = way.as_edge();
        let is_one_way = is_path_one_way(&edge, bidirectional);
        let is_reversed = is_path_reversed(&edge);

        for window in way.nodes.windows(2) {
            let [start_ref, end_ref] = window else {
                continue;
            };
            let (Some(&start), Some(&end)) = (
                node_index_map.get(&start_ref.node_id),
                node_index_map.get(&end_ref.node_id),
            ) else {
                dangling += 1;
                continue;
            };
            let (from, to) = if is_reversed { (end, start) } else { (start, end) };

            graph.add_edge(from, to, edge.clone());
            if !is_one_way {
                graph.add_edge(to, from, edge.clone());
            }
        }
    }
    if dangling > 0 {
        tracing::warn!(dangling, "skipped way segments referencing unknown nodes");
    }

    add_edge_lengths(&mut graph);

    // Default highway speeds in kph
    let hwy_speeds = HashMap::from([
        ("footway", 4.5),
        ("pedestrian", 4.5),
        ("path", 4.5),
        ("steps", 2.0),
        ("living_street", 10.0),
        ("residential", 50.0),
        ("tertiary", 50.0),
        ("secondary", 60.0),
        ("primary", 70.0),
        ("trunk", 88.5),
        ("motorway", 88.5),
    ]);
    let fallback_speed = 50.0;

    add_edge_speeds(&mut graph, &hwy_speeds, fallback_speed);
    add_edge_travel_times(&mut graph);

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built street graph"
    );
    graph
}

fn add_edge_lengths(graph: &mut StreetGraph) {
    for edge in graph.edge_indices() {
        let Some((start_index, end_index)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let start_node = &graph[start_index];
        let end_node = &graph[end_index];

        let distance =
            calculate_distance(start_node.lat, start_node.lon, end_node.lat, end_node.lon);
        graph[edge].length = distance;
    }
}

fn add_edge_speeds(graph: &mut StreetGraph, hwy_speeds: &HashMap<&str, f64>, fallback: f64) {
    for way in graph.edge_weights_mut() {
        let speed = way
            .tag("maxspeed")
            .and_then(clean_maxspeed)
            .or_else(|| way.tag("highway").and_then(|hwy| hwy_speeds.get(hwy).copied()))
            .unwrap_or(fallback);
        way.speed_kph = speed;
    }
}

fn clean_maxspeed(maxspeed: &str) -> Option<f64> {
    let mph_to_kph = 1.60934;
    let lowered = maxspeed.to_lowercase();
    let speed = lowered
        .trim_end_matches("mph")
        .trim_end_matches("km/h")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|speed| *speed > 0.0)?;
    if lowered.contains("mph") {
        Some(speed * mph_to_kph)
    } else {
        Some(speed)
    }
}

fn add_edge_travel_times(graph: &mut StreetGraph) {
    for way in graph.edge_weights_mut() {
        way.travel_time = calculate_travel_time(way.length, way.speed_kph);
    }
}

pub fn node_to_coordinate(graph: &StreetGraph, node_index: NodeIndex) -> Coordinate {
    graph[node_index].coordinate()
}
