//! Screen-point to node hit-testing.

use super::graph::Graph;
use super::types::Point;
use super::viewport::Viewport;

/// Nearest node whose radius plus `slop` (world units) contains the device
/// pixel `screen`. Ties on distance go to the earlier node.
pub fn pick(graph: &Graph, viewport: &Viewport, screen: Point, slop: f64) -> Option<usize> {
	let p = viewport.screen_to_world(screen);
	let mut best: Option<(usize, f64)> = None;
	for (i, node) in graph.nodes.iter().enumerate() {
		let (dx, dy) = (node.x - p.x, node.y - p.y);
		let d2 = dx * dx + dy * dy;
		let reach = node.radius + slop;
		if d2 < reach * reach && best.is_none_or(|(_, best_d2)| d2 < best_d2) {
			best = Some((i, d2));
		}
	}
	best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::{GraphData, GraphNode};
	use crate::components::force_graph::viewport::{Transform, ViewportConfig};

	fn setup(points: &[(f64, f64)]) -> (Graph, Viewport) {
		let nodes = points
			.iter()
			.enumerate()
			.map(|(i, &(x, y))| GraphNode::stub(&format!("n{i}"), Point::new(x, y)))
			.collect();
		let graph = Graph::from_data(GraphData {
			nodes,
			links: Vec::new(),
		});
		let mut viewport = Viewport::new(ViewportConfig::default(), 800.0, 600.0, 1.0);
		viewport.transform = Transform {
			x: 400.0,
			y: 300.0,
			k: 1.0,
		};
		(graph, viewport)
	}

	#[test]
	fn hit_within_radius_plus_slop() {
		let (g, v) = setup(&[(0.0, 0.0)]);
		assert_eq!(pick(&g, &v, Point::new(400.0, 300.0), 10.0), Some(0));
		assert_eq!(pick(&g, &v, Point::new(413.0, 300.0), 10.0), Some(0));
		assert_eq!(pick(&g, &v, Point::new(415.0, 300.0), 10.0), None);
	}

	#[test]
	fn nearest_hit_wins() {
		let (g, v) = setup(&[(0.0, 0.0), (6.0, 0.0), (3.0, 0.0)]);
		assert_eq!(pick(&g, &v, Point::new(405.0, 300.0), 10.0), Some(1));
		assert_eq!(pick(&g, &v, Point::new(403.0, 300.0), 10.0), Some(2));
	}

	#[test]
	fn equal_distance_goes_to_first() {
		let (g, v) = setup(&[(-2.0, 0.0), (2.0, 0.0)]);
		assert_eq!(pick(&g, &v, Point::new(400.0, 300.0), 10.0), Some(0));
	}

	#[test]
	fn respects_zoom() {
		let (g, mut v) = setup(&[(10.0, 0.0)]);
		v.transform.k = 4.0;
		// Node sits at screen x = 440; slop of 10 screen px is 2.5 world units.
		assert_eq!(pick(&g, &v, Point::new(440.0 + 4.0 * 6.0, 300.0), 2.5), Some(0));
		assert_eq!(pick(&g, &v, Point::new(440.0 + 4.0 * 7.0, 300.0), 2.5), None);
	}

	#[test]
	fn empty_graph_misses() {
		let (g, v) = setup(&[]);
		assert_eq!(pick(&g, &v, Point::new(0.0, 0.0), 10.0), None);
	}
}
