//! The loaded graph and its derived indices.
//!
//! Node and link records are replaced wholesale on every load; adjacency,
//! direction and degree indices are rebuilt in the same pass and never patched.

use std::collections::{BTreeSet, HashMap};

use serde_json::Value;

use super::types::{GraphData, GraphLink, GraphNode, Point, Scatter};

/// Upper bound on search results.
pub const SEARCH_LIMIT: usize = 80;

/// Axis-aligned bounds of node positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min: Point,
	pub max: Point,
}

impl Bounds {
	pub fn center(&self) -> Point {
		Point::new(
			(self.min.x + self.max.x) * 0.5,
			(self.min.y + self.max.y) * 0.5,
		)
	}

	pub fn width(&self) -> f64 {
		self.max.x - self.min.x
	}

	pub fn height(&self) -> f64 {
		self.max.y - self.min.y
	}
}

/// Nodes, links and the indices derived from them.
#[derive(Clone, Debug, Default)]
pub struct Graph {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
	by_id: HashMap<String, usize>,
	/// Resolved endpoints per link, `None` if either end is unknown.
	ends: Vec<Option<(usize, usize)>>,
	adjacent: Vec<BTreeSet<usize>>,
	outgoing: Vec<BTreeSet<usize>>,
	incoming: Vec<BTreeSet<usize>>,
	degree: Vec<usize>,
}

impl Graph {
	/// Normalizes `raw` and indexes the result.
	pub fn load(raw: &Value, scatter: &mut Scatter) -> Self {
		Self::from_data(GraphData::from_value(raw, scatter))
	}

	pub fn from_data(data: GraphData) -> Self {
		let GraphData { nodes, links } = data;
		let n = nodes.len();
		let by_id: HashMap<String, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| (node.id.clone(), i))
			.collect();

		let mut adjacent = vec![BTreeSet::new(); n];
		let mut outgoing = vec![BTreeSet::new(); n];
		let mut incoming = vec![BTreeSet::new(); n];
		let mut degree = vec![0; n];
		let mut ends = Vec::with_capacity(links.len());

		for link in &links {
			let resolved = by_id
				.get(&link.source)
				.zip(by_id.get(&link.target))
				.map(|(&s, &t)| (s, t));
			if let Some((s, t)) = resolved {
				degree[s] += 1;
				degree[t] += 1;
				adjacent[s].insert(t);
				adjacent[t].insert(s);
				outgoing[s].insert(t);
				incoming[t].insert(s);
			}
			ends.push(resolved);
		}

		Self {
			nodes,
			links,
			by_id,
			ends,
			adjacent,
			outgoing,
			incoming,
			degree,
		}
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn index_of(&self, id: &str) -> Option<usize> {
		self.by_id.get(id).copied()
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.index_of(id).map(|i| &self.nodes[i])
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
		self.index_of(id).map(|i| &mut self.nodes[i])
	}

	/// Resolved `(source, target)` indices for link `i`.
	pub fn link_ends(&self, i: usize) -> Option<(usize, usize)> {
		self.ends.get(i).copied().flatten()
	}

	/// Iterates links whose endpoints both resolve, with their indices.
	pub fn resolved_links(&self) -> impl Iterator<Item = (&GraphLink, usize, usize)> {
		self.links
			.iter()
			.zip(&self.ends)
			.filter_map(|(link, ends)| ends.map(|(s, t)| (link, s, t)))
	}

	/// Undirected neighbors of node `i`.
	pub fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
		self.adjacent.get(i).into_iter().flatten().copied()
	}

	pub fn successors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
		self.outgoing.get(i).into_iter().flatten().copied()
	}

	pub fn predecessors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
		self.incoming.get(i).into_iter().flatten().copied()
	}

	/// Number of resolved link endpoints touching node `i`.
	pub fn degree(&self, i: usize) -> usize {
		self.degree.get(i).copied().unwrap_or(0)
	}

	/// Highest-degree node; the earliest one wins ties.
	pub fn hub(&self) -> Option<usize> {
		(0..self.len()).reduce(|best, i| {
			if self.degree(i) > self.degree(best) {
				i
			} else {
				best
			}
		})
	}

	pub fn bounds(&self) -> Option<Bounds> {
		let first = self.nodes.first()?.position();
		let mut bounds = Bounds {
			min: first,
			max: first,
		};
		for node in &self.nodes[1..] {
			bounds.min.x = bounds.min.x.min(node.x);
			bounds.min.y = bounds.min.y.min(node.y);
			bounds.max.x = bounds.max.x.max(node.x);
			bounds.max.y = bounds.max.y.max(node.y);
		}
		Some(bounds)
	}

	/// Case-insensitive substring search over label and path.
	pub fn search(&self, query: &str) -> Vec<usize> {
		let needle = query.trim().to_lowercase();
		if needle.is_empty() {
			return Vec::new();
		}
		self.nodes
			.iter()
			.enumerate()
			.filter(|(_, node)| {
				format!("{} {}", node.label, node.path)
					.to_lowercase()
					.contains(&needle)
			})
			.map(|(i, _)| i)
			.take(SEARCH_LIMIT)
			.collect()
	}
}
