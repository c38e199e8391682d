//! Side panel model for the selected node.

use serde_json::{Map, Value, json};

use super::graph::Graph;
use super::types::GraphNode;

/// Neighbors listed in the panel.
const MAX_NEIGHBORS: usize = 80;
/// Metadata keys shown in the panel body.
const MAX_META_KEYS: usize = 80;
/// Longer metadata strings are cut and suffixed with an ellipsis.
const MAX_META_CHARS: usize = 320;

/// Prefix of directory node ids; the first such predecessor is the parent crumb.
const DIR_PREFIX: &str = "dir:";

/// Breadcrumb target above the selected node.
#[derive(Clone, Debug, PartialEq)]
pub enum Crumb {
	/// Navigate to a parent directory node.
	Parent { id: String, label: String },
	/// Navigate back to the overview.
	Overview,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
	pub id: String,
	pub label: String,
	pub subtitle: String,
}

/// Everything the panel shows for one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDetail {
	pub id: String,
	pub title: String,
	pub subtitle: String,
	pub degree: usize,
	pub pinned: bool,
	pub crumb: Crumb,
	pub neighbors: Vec<Neighbor>,
	/// Pretty-printed JSON body.
	pub body: String,
}

impl NodeDetail {
	/// Builds the panel for node `index`. `extra` is host-provided detail
	/// that replaces the node's own metadata when present.
	pub fn build(graph: &Graph, index: usize, extra: Option<Value>) -> Option<Self> {
		let node = graph.nodes.get(index)?;
		let title = if node.label.is_empty() {
			node.id.clone()
		} else {
			node.label.clone()
		};
		let subtitle = subtitle_of(node);

		let crumb = graph
			.predecessors(index)
			.map(|j| &graph.nodes[j])
			.find(|n| n.id.starts_with(DIR_PREFIX))
			.map_or(Crumb::Overview, |n| Crumb::Parent {
				id: n.id.clone(),
				label: n.label.clone(),
			});

		let neighbors = graph
			.neighbors(index)
			.take(MAX_NEIGHBORS)
			.map(|j| {
				let n = &graph.nodes[j];
				Neighbor {
					id: n.id.clone(),
					label: if n.label.is_empty() { n.id.clone() } else { n.label.clone() },
					subtitle: subtitle_of(n),
				}
			})
			.collect();

		let degree = graph.degree(index);
		let meta = slim_meta(extra.as_ref().unwrap_or(&node.meta));
		let body = serde_json::to_string_pretty(&json!({
			"id": node.id,
			"label": node.label,
			"path": node.path,
			"group": node.group,
			"degree": degree,
			"outgoing": graph.successors(index).count(),
			"incoming": graph.predecessors(index).count(),
			"meta": meta,
		}))
		.unwrap_or_default();

		Some(Self {
			id: node.id.clone(),
			title,
			subtitle,
			degree,
			pinned: node.pinned,
			crumb,
			neighbors,
			body,
		})
	}
}

/// Path, else group, else id.
fn subtitle_of(node: &GraphNode) -> String {
	[&node.path, &node.group, &node.id]
		.into_iter()
		.find(|s| !s.is_empty())
		.cloned()
		.unwrap_or_default()
}

fn slim_meta(meta: &Value) -> Value {
	let Value::Object(record) = meta else {
		return meta.clone();
	};
	let slim: Map<String, Value> = record
		.iter()
		.take(MAX_META_KEYS)
		.map(|(k, v)| (k.clone(), truncate(v)))
		.collect();
	Value::Object(slim)
}

fn truncate(value: &Value) -> Value {
	match value {
		Value::String(s) if s.chars().count() > MAX_META_CHARS => {
			let mut cut: String = s.chars().take(MAX_META_CHARS).collect();
			cut.push('…');
			Value::String(cut)
		}
		other => other.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::types::Scatter;

	fn tree() -> Graph {
		Graph::load(
			&json!({
				"nodes": [
					{ "id": "dir:src", "label": "src" },
					{ "id": "src/main.rs", "label": "main.rs", "path": "src/main.rs",
					  "meta": { "lang": "rust", "doc": "x".repeat(400) } },
					{ "id": "lib", "group": "crate" },
				],
				"links": [
					{ "source": "dir:src", "target": "src/main.rs" },
					{ "source": "src/main.rs", "target": "lib" },
				],
			}),
			&mut Scatter::default(),
		)
	}

	#[test]
	fn file_node_links_to_its_directory() {
		let g = tree();
		let d = NodeDetail::build(&g, 1, None).unwrap();
		assert_eq!(d.title, "main.rs");
		assert_eq!(d.subtitle, "src/main.rs");
		assert_eq!(d.degree, 2);
		assert_eq!(
			d.crumb,
			Crumb::Parent {
				id: "dir:src".into(),
				label: "src".into()
			}
		);
		let ids: Vec<&str> = d.neighbors.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["dir:src", "lib"]);
		assert_eq!(d.neighbors[1].subtitle, "crate");
	}

	#[test]
	fn orphan_falls_back_to_overview_crumb() {
		let g = tree();
		let d = NodeDetail::build(&g, 0, None).unwrap();
		assert_eq!(d.crumb, Crumb::Overview);
		let lib = NodeDetail::build(&g, 2, None).unwrap();
		assert_eq!(lib.subtitle, "crate");
		assert_eq!(lib.crumb, Crumb::Overview);
	}

	#[test]
	fn long_meta_strings_are_cut() {
		let g = tree();
		let d = NodeDetail::build(&g, 1, None).unwrap();
		let body: Value = serde_json::from_str(&d.body).unwrap();
		let doc = body["meta"]["doc"].as_str().unwrap();
		assert_eq!(doc.chars().count(), MAX_META_CHARS + 1);
		assert!(doc.ends_with('…'));
		assert_eq!(body["meta"]["lang"], "rust");
		assert_eq!(body["outgoing"], 1);
		assert_eq!(body["incoming"], 1);
	}

	#[test]
	fn host_detail_replaces_meta_and_is_capped() {
		let g = tree();
		let extra: Map<String, Value> = (0..100).map(|i| (format!("k{i:03}"), json!(i))).collect();
		let d = NodeDetail::build(&g, 2, Some(Value::Object(extra))).unwrap();
		let body: Value = serde_json::from_str(&d.body).unwrap();
		assert_eq!(body["meta"].as_object().unwrap().len(), MAX_META_KEYS);
		assert!(body["meta"].get("lang").is_none());
	}

	#[test]
	fn out_of_range_is_none() {
		assert!(NodeDetail::build(&tree(), 9, None).is_none());
	}
}
