use crate::graph::StreetGraph;
use crate::models::Coordinate;
use crate::utils::haversine_m;
use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use petgraph::graph::NodeIndex;

/// KD-tree over street graph nodes for nearest-node snapping.
///
/// Points are stored as `[lon * cos(lat0), lat]` degrees, `lat0` being the
/// mean latitude of the graph, so euclidean distance in the tree tracks
/// ground distance. The candidate found is then checked against a haversine
/// distance limit.
pub struct NodeLocator {
    tree: KdTree<f64, usize, [f64; 2]>,
    lon_scale: f64,
}

impl NodeLocator {
    pub fn build(graph: &StreetGraph) -> Self {
        let count = graph.node_count().max(1) as f64;
        let mean_lat = graph.node_indices().map(|i| graph[i].lat).sum::<f64>() / count;
        let lon_scale = mean_lat.to_radians().cos();

        let mut tree = KdTree::new(2);
        for node_index in graph.node_indices() {
            let node = &graph[node_index];
            if let Err(err) = tree.add([node.lon * lon_scale, node.lat], node_index.index()) {
                tracing::warn!(id = node.id, ?err, "node left out of spatial index");
            }
        }
        Self { tree, lon_scale }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closest node to `target`, if it lies within `max_distance_m`.
    pub fn nearest(
        &self,
        graph: &StreetGraph,
        target: Coordinate,
        max_distance_m: f64,
    ) -> Option<NodeIndex> {
        if self.is_empty() {
            return None;
        }
        let nearest = self
            .tree
            .nearest(
                &[target.lon() * self.lon_scale, target.lat()],
                1,
                &squared_euclidean,
            )
            .ok()?;
        let (_, &idx) = nearest.first()?;
        let node_index = NodeIndex::new(idx);

        let distance = haversine_m(graph[node_index].coordinate(), target);
        (distance <= max_distance_m).then_some(node_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OsmNode;

    fn node(id: i64, lat: f64, lon: f64) -> OsmNode {
        OsmNode { id, lat, lon, tags: vec![] }
    }

    #[test]
    fn test_nearest_within_limit() {
        let mut graph = StreetGraph::new();
        graph.add_node(node(1, 27.7172, 85.3240));
        let far = graph.add_node(node(2, 27.7300, 85.3400));
        let locator = NodeLocator::build(&graph);
        assert_eq!(locator.len(), 2);

        let target = Coordinate::new(27.7299, 85.3399).unwrap();
        assert_eq!(locator.nearest(&graph, target, 100.0), Some(far));
        assert_eq!(locator.nearest(&graph, target, 1.0), None);
    }

    #[test]
    fn test_nearest_is_measured_in_meters_at_high_latitude() {
        // at 60 degrees north a degree of longitude is half a degree of latitude
        let mut graph = StreetGraph::new();
        let east = graph.add_node(node(1, 60.0, 10.0015));
        graph.add_node(node(2, 60.0012, 10.0));
        let locator = NodeLocator::build(&graph);

        let target = Coordinate::new(60.0, 10.0).unwrap();
        assert_eq!(locator.nearest(&graph, target, 100.0), Some(east));
    }

    #[test]
    fn test_empty_graph_has_no_nearest() {
        let graph = StreetGraph::new();
        let locator = NodeLocator::build(&graph);
        assert!(locator.is_empty());
        let target = Coordinate::new(0.0, 0.0).unwrap();
        assert_eq!(locator.nearest(&graph, target, f64::INFINITY), None);
    }
}
