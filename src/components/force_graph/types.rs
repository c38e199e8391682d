//! Node and link records plus normalization from loosely shaped input.
//!
//! Hosts hand over whatever their graph looks like; the accepted key names are
//! resolved here through fixed fallback chains so the rest of the component
//! only ever sees [`GraphNode`] and [`GraphLink`].

use std::collections::HashSet;

use log::debug;
use serde_json::{Map, Value};

/// Radius assigned to nodes that do not specify `r`.
pub const DEFAULT_RADIUS: f64 = 4.0;

/// Half extents of the box fresh nodes are scattered into.
const SCATTER_HALF_WIDTH: f64 = 400.0;
const SCATTER_HALF_HEIGHT: f64 = 300.0;

/// `value` if it is finite and positive, else `fallback`.
pub(crate) fn positive_or(value: f64, fallback: f64) -> f64 {
	if value.is_finite() && value > 0.0 { value } else { fallback }
}

/// A 2D point or vector in whichever space the caller is working in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// A node in the graph.
#[derive(Clone, Debug)]
pub struct GraphNode {
	/// Unique identifier. Links reference nodes by this.
	pub id: String,
	/// Display label.
	pub label: String,
	/// Optional path, shown as the node subtitle and used by search.
	pub path: String,
	/// Optional classification, drives the default fill color.
	pub group: String,
	/// Opaque host metadata.
	pub meta: Value,
	/// World position, x.
	pub x: f64,
	/// World position, y.
	pub y: f64,
	/// Velocity per step, x.
	pub vx: f64,
	/// Velocity per step, y.
	pub vy: f64,
	/// Externally fixed position. While set, the integrator holds the node
	/// here with zero velocity.
	pub fixed: Option<Point>,
	/// User pin. A pinned node keeps `fixed` after a drag ends.
	pub pinned: bool,
	/// Visual radius in world units.
	pub radius: f64,
	/// Optional CSS color override.
	pub color: Option<String>,
}

impl GraphNode {
	/// Creates a stub for an id that only appears as a link endpoint.
	pub fn stub(id: &str, at: Point) -> Self {
		Self {
			id: id.to_string(),
			label: id.to_string(),
			path: String::new(),
			group: String::new(),
			meta: Value::Object(Map::new()),
			x: at.x,
			y: at.y,
			vx: 0.0,
			vy: 0.0,
			fixed: None,
			pinned: false,
			radius: DEFAULT_RADIUS,
			color: None,
		}
	}

	/// Current world position.
	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}

	/// Fixes the node at `at`, zeroing velocity.
	pub fn hold_at(&mut self, at: Point) {
		self.fixed = Some(at);
		self.x = at.x;
		self.y = at.y;
		self.vx = 0.0;
		self.vy = 0.0;
	}
}

/// A directed edge between two nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	/// Source node ID.
	pub source: String,
	/// Target node ID.
	pub target: String,
	/// Spring stiffness multiplier.
	pub weight: f64,
}

/// Normalized nodes and links, ready to be indexed.
#[derive(Clone, Debug, Default)]
pub struct GraphData {
	/// Nodes with unique ids, in input order.
	pub nodes: Vec<GraphNode>,
	/// Links, each resolving to two entries of `nodes`.
	pub links: Vec<GraphLink>,
}

/// Deterministic scatter for initial placement.
///
/// Layout reproducibility is not required, so a hash of a running counter is
/// enough to spread nodes apart.
#[derive(Clone, Debug, Default)]
pub struct Scatter {
	seed: u64,
}

impl Scatter {
	pub fn new(seed: u64) -> Self {
		Self { seed }
	}

	fn unit(&mut self) -> f64 {
		self.seed = self.seed.wrapping_add(1);
		let s = self.seed as f64;
		let x = (s * 12.9898 + s * 78.233).sin() * 43758.5453;
		x - x.floor()
	}

	pub fn next_point(&mut self) -> Point {
		let x = (self.unit() - 0.5) * 2.0 * SCATTER_HALF_WIDTH;
		let y = (self.unit() - 0.5) * 2.0 * SCATTER_HALF_HEIGHT;
		Point::new(x, y)
	}
}

/// Returns the first present, non-null value among `keys`.
fn first<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
	keys.iter()
		.filter_map(|k| record.get(*k))
		.find(|v| !v.is_null())
}

/// String coercion for scalar fields.
fn scalar_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

/// Coerces a link endpoint. Records resolve through `id`, `key`, `name`, `path`.
fn endpoint(value: Option<&Value>) -> String {
	match value {
		None | Some(Value::Null) => String::new(),
		Some(Value::Object(record)) => first(record, &["id", "key", "name", "path"])
			.and_then(scalar_string)
			.unwrap_or_default(),
		Some(other) => scalar_string(other).unwrap_or_else(|| other.to_string()),
	}
}

fn finite(value: Option<&Value>) -> Option<f64> {
	value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn normalize_node(index: usize, value: &Value, scatter: &mut Scatter) -> GraphNode {
	let empty = Map::new();
	let record = value.as_object().unwrap_or(&empty);
	let text = |keys: &[&str]| first(record, keys).and_then(scalar_string);

	let id = text(&["id", "key"]).unwrap_or_else(|| index.to_string());
	let label = text(&["label", "name", "title", "path", "id"]).unwrap_or_else(|| index.to_string());
	let at = match (finite(record.get("x")), finite(record.get("y"))) {
		(Some(x), Some(y)) => Point::new(x, y),
		_ => scatter.next_point(),
	};
	let radius = finite(record.get("r"))
		.filter(|r| *r > 0.0)
		.unwrap_or(DEFAULT_RADIUS);

	GraphNode {
		id,
		label,
		path: text(&["path", "file"]).unwrap_or_default(),
		group: text(&["group", "type"]).unwrap_or_default(),
		meta: record
			.get("meta")
			.filter(|m| !m.is_null())
			.cloned()
			.unwrap_or_else(|| value.clone()),
		x: at.x,
		y: at.y,
		vx: 0.0,
		vy: 0.0,
		fixed: None,
		pinned: false,
		radius,
		color: record.get("color").and_then(Value::as_str).map(str::to_string),
	}
}

fn normalize_link(value: &Value) -> Option<GraphLink> {
	let record = value.as_object()?;
	let source = endpoint(first(record, &["source", "from"]));
	let target = endpoint(first(record, &["target", "to"]));
	if source.is_empty() || target.is_empty() {
		debug!("spider-graph: skipping link with empty endpoint: {}", value);
		return None;
	}
	let weight = finite(first(record, &["w", "weight"]))
		.filter(|w| *w > 0.0)
		.unwrap_or(1.0);
	Some(GraphLink {
		source,
		target,
		weight,
	})
}

impl GraphData {
	/// Normalizes a raw host record into nodes and links.
	///
	/// Never fails: anything unusable is skipped. Link endpoints missing from
	/// the node list get stub nodes, so every returned link resolves.
	pub fn from_value(raw: &Value, scatter: &mut Scatter) -> Self {
		let Some(record) = raw.as_object() else {
			return Self::default();
		};
		let list = |keys: &[&str]| {
			first(record, keys)
				.and_then(Value::as_array)
				.map(Vec::as_slice)
				.unwrap_or(&[])
		};

		let mut seen = HashSet::new();
		let mut nodes = Vec::new();
		for (i, value) in list(&["nodes"]).iter().enumerate() {
			let node = normalize_node(i, value, scatter);
			if seen.insert(node.id.clone()) {
				nodes.push(node);
			} else {
				debug!("spider-graph: duplicate node id {:?} skipped", node.id);
			}
		}

		let links: Vec<GraphLink> = list(&["links", "edges"])
			.iter()
			.filter_map(normalize_link)
			.collect();

		for link in &links {
			for id in [&link.source, &link.target] {
				if seen.insert(id.clone()) {
					nodes.push(GraphNode::stub(id, scatter.next_point()));
				}
			}
		}

		Self { nodes, links }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn load(raw: Value) -> GraphData {
		GraphData::from_value(&raw, &mut Scatter::new(7))
	}

	#[test]
	fn link_only_input_creates_stub_nodes() {
		let data = load(json!({ "links": [{ "source": "X", "target": "Y" }] }));
		assert_eq!(data.nodes.len(), 2);
		let ids: Vec<_> = data.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["X", "Y"]);
		for node in &data.nodes {
			assert_eq!(node.label, node.id);
			assert!(node.group.is_empty());
		}
	}

	#[test]
	fn key_fallbacks() {
		let data = load(json!({
			"nodes": [
				{ "key": "k1", "title": "Title" },
				{ "name": "named", "file": "src/a.rs", "type": "file" },
				{ "id": 42, "path": "lib/x" },
			],
			"edges": [{ "from": "k1", "to": 42, "w": 3 }],
		}));

		assert_eq!(data.nodes[0].id, "k1");
		assert_eq!(data.nodes[0].label, "Title");
		assert_eq!(data.nodes[1].id, "1");
		assert_eq!(data.nodes[1].label, "named");
		assert_eq!(data.nodes[1].path, "src/a.rs");
		assert_eq!(data.nodes[1].group, "file");
		assert_eq!(data.nodes[2].id, "42");
		assert_eq!(data.nodes[2].label, "lib/x");
		assert_eq!(data.links, vec![GraphLink {
			source: "k1".into(),
			target: "42".into(),
			weight: 3.0,
		}]);
		assert_eq!(data.nodes.len(), 3);
	}

	#[test]
	fn record_endpoints_and_empty_endpoints() {
		let data = load(json!({
			"nodes": [{ "id": "a" }, { "id": "b" }],
			"links": [
				{ "source": { "id": "a" }, "target": { "name": "b" } },
				{ "source": "a", "target": "" },
				{ "source": null, "target": "b" },
				"not a record",
			],
		}));
		assert_eq!(data.links.len(), 1);
		assert_eq!(data.links[0].source, "a");
		assert_eq!(data.links[0].target, "b");
		assert_eq!(data.links[0].weight, 1.0);
	}

	#[test]
	fn meta_defaults_to_whole_record() {
		let data = load(json!({
			"nodes": [
				{ "id": "a", "meta": { "size": 3 } },
				{ "id": "b", "owner": "me" },
			],
		}));
		assert_eq!(data.nodes[0].meta, json!({ "size": 3 }));
		assert_eq!(data.nodes[1].meta, json!({ "id": "b", "owner": "me" }));
	}

	#[test]
	fn duplicate_ids_keep_first() {
		let data = load(json!({ "nodes": [{ "id": "a", "label": "one" }, { "id": "a", "label": "two" }] }));
		assert_eq!(data.nodes.len(), 1);
		assert_eq!(data.nodes[0].label, "one");
	}

	#[test]
	fn positions_are_finite() {
		let data = load(json!({ "nodes": [{ "id": "a", "x": 5.0, "y": -2.0 }, { "id": "b" }] }));
		assert_eq!(data.nodes[0].position(), Point::new(5.0, -2.0));
		let b = &data.nodes[1];
		assert!(b.position().is_finite());
		assert!(b.x.abs() <= SCATTER_HALF_WIDTH && b.y.abs() <= SCATTER_HALF_HEIGHT);
	}

	#[test]
	fn non_record_input_is_empty() {
		let data = load(json!([1, 2, 3]));
		assert!(data.nodes.is_empty());
		assert!(data.links.is_empty());
	}
}
