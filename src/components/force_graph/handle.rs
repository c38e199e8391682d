//! Shared handle to a running graph.
//!
//! The canvas component, the host bridge subscriptions and the JS embedding
//! API all drive the same [`Simulation`] through a [`GraphHandle`]. Host
//! callbacks are never invoked while the simulation is borrowed, so a host
//! that answers synchronously cannot re-enter a live borrow.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{info, warn};
use serde_json::Value;

use super::bridge::{Command, HostBridge, Subscription};
use super::detail::NodeDetail;
use super::state::{GraphConfig, Simulation};
use crate::error::{GraphError, Result};

/// Canvas size assumed until the component mounts and measures.
const INITIAL_SIZE: (f64, f64) = (800.0, 600.0);

/// One search result row.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
	/// Node id.
	pub id: String,
	/// Display label.
	pub label: String,
	/// Path, else group.
	pub subtitle: String,
}

/// Cheap-to-clone handle to a simulation and its host bridge.
#[derive(Clone)]
pub struct GraphHandle {
	sim: Rc<RefCell<Simulation>>,
	bridge: Rc<RefCell<Option<Rc<HostBridge>>>>,
	subscriptions: Rc<RefCell<Vec<Subscription>>>,
	config: Rc<GraphConfig>,
}

fn load_json_into(sim: &RefCell<Simulation>, json: &str) -> Result<()> {
	let Ok(mut sim) = sim.try_borrow_mut() else {
		warn!("spider-graph: graph update arrived mid-frame, dropped");
		return Ok(());
	};
	sim.load_json(json).inspect_err(|e| {
		warn!("spider-graph: rejected graph JSON: {}", e);
		sim.toast("Invalid graph JSON");
	})
}

impl GraphHandle {
	/// Creates an empty graph with `config`, repaired if out of range.
	pub fn new(config: GraphConfig) -> Self {
		let config = config.sanitized();
		let (w, h) = INITIAL_SIZE;
		Self {
			sim: Rc::new(RefCell::new(Simulation::new(&config, w, h, 1.0))),
			bridge: Rc::new(RefCell::new(None)),
			subscriptions: Rc::new(RefCell::new(Vec::new())),
			config: Rc::new(config),
		}
	}

	/// Configuration in effect.
	pub fn config(&self) -> &GraphConfig {
		&self.config
	}

	/// Runs `f` against the simulation.
	pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> R {
		f(&mut self.sim.borrow_mut())
	}

	fn downgrade(&self) -> Weak<RefCell<Simulation>> {
		Rc::downgrade(&self.sim)
	}

	/// Currently attached host bridge.
	pub fn bridge(&self) -> Option<Rc<HostBridge>> {
		self.bridge.borrow().clone()
	}

	/// Replaces the graph with a raw record.
	pub fn set_data(&self, raw: &Value) {
		self.with(|sim| sim.load_value(raw));
	}

	/// Replaces the graph with serialized JSON. Invalid input keeps the
	/// current graph.
	pub fn set_json(&self, json: &str) -> Result<()> {
		load_json_into(&self.sim, json)
	}

	/// Selects `id` and animates the camera to it.
	pub fn focus(&self, id: &str) -> bool {
		self.with(|sim| sim.focus(id))
	}

	/// Fits the whole graph into view.
	pub fn fit(&self) {
		self.with(Simulation::fit);
	}

	/// Connects a host bridge, replacing any earlier one. Loads the host's
	/// current graph, or asks it to publish one.
	pub fn attach_bridge(&self, bridge: HostBridge) {
		let bridge = Rc::new(bridge);

		let weak = self.downgrade();
		let on_graph = bridge.graph_replaced.subscribe(move |json| {
			if let Some(sim) = weak.upgrade() {
				let _ = load_json_into(&sim, json);
			}
		});
		let weak = self.downgrade();
		let on_select = bridge.selection_changed.subscribe(move |id| {
			let Some(sim) = weak.upgrade() else {
				return;
			};
			match sim.try_borrow_mut() {
				Ok(mut sim) => {
					sim.focus(id);
				}
				Err(_) => warn!("spider-graph: selection {:?} arrived mid-frame, dropped", id),
			}
		});
		// Dropping the old handles unsubscribes from the previous bridge.
		*self.subscriptions.borrow_mut() = vec![on_graph, on_select];
		*self.bridge.borrow_mut() = Some(bridge.clone());

		if let Some(json) = bridge.initial_graph() {
			let _ = self.set_json(&json);
		} else if let Some(request) = &bridge.request_graph {
			request();
		}
		self.with(|sim| sim.toast("Bridge connected"));
		info!("spider-graph: host bridge connected");
	}

	/// Asks the host to open the selected node.
	pub fn open_selected(&self) {
		let node = self.with(|sim| {
			sim.selected()
				.and_then(|id| sim.graph.node(id))
				.cloned()
		});
		let Some(node) = node else {
			return;
		};
		let opened = match self.bridge() {
			Some(bridge) => bridge.open(&node),
			None => Err(GraphError::MissingCapability("openNode")),
		};
		if let Err(e) = opened {
			info!("spider-graph: open {:?} unavailable: {}", node.id, e);
			self.with(|sim| sim.toast("No bridge: open disabled"));
		}
	}

	/// Sends a navigation command to the host. Without a host, the commands
	/// the graph can serve itself run locally.
	pub fn command(&self, command: Command, arg: &str) {
		let sent = self.bridge().map(|b| b.send(command, arg));
		if matches!(sent, Some(Ok(()))) {
			return;
		}
		self.with(|sim| match command {
			Command::Focus => {
				sim.focus(arg);
			}
			Command::Fit => sim.fit(),
			Command::Overview => {
				sim.deselect();
				sim.fit();
			}
			Command::PinToggle => {
				sim.toggle_pin(arg);
			}
			other => sim.toast(format!("No bridge: {other} disabled")),
		});
	}

	/// Panel model for `id`, with host detail when the bridge offers it.
	pub fn detail(&self, id: &str) -> Option<NodeDetail> {
		let extra = self.bridge().and_then(|b| b.node_detail(id));
		self.with(|sim| {
			let index = sim.graph.index_of(id)?;
			NodeDetail::build(&sim.graph, index, extra)
		})
	}

	/// Case-insensitive search over labels and paths, capped.
	pub fn search(&self, query: &str) -> Vec<SearchHit> {
		self.with(|sim| {
			sim.graph
				.search(query)
				.into_iter()
				.map(|i| {
					let node = &sim.graph.nodes[i];
					SearchHit {
						id: node.id.clone(),
						label: node.label.clone(),
						subtitle: if node.path.is_empty() {
							node.group.clone()
						} else {
							node.path.clone()
						},
					}
				})
				.collect()
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::state::SimEvent;
	use serde_json::json;

	fn handle() -> GraphHandle {
		let h = GraphHandle::new(GraphConfig::default());
		h.set_data(&json!({
			"nodes": [
				{ "id": "A", "label": "Alpha", "path": "src/alpha.rs" },
				{ "id": "B", "label": "Beta", "group": "mod" },
			],
			"links": [{ "source": "A", "target": "B" }],
		}));
		h.with(|sim| sim.drain_events());
		h
	}

	fn toasts(h: &GraphHandle) -> Vec<String> {
		h.with(|sim| sim.drain_events())
			.into_iter()
			.filter_map(|e| match e {
				SimEvent::Toast(msg) => Some(msg),
				_ => None,
			})
			.collect()
	}

	#[test]
	fn bad_json_keeps_graph_and_toasts() {
		let h = handle();
		assert!(h.set_json("nope").is_err());
		assert_eq!(h.with(|sim| sim.graph.len()), 2);
		assert_eq!(toasts(&h), ["Invalid graph JSON"]);
	}

	#[test]
	fn host_graph_signal_replaces_graph() {
		let h = handle();
		let bridge = HostBridge::default();
		let channel = bridge.graph_replaced.clone();
		h.attach_bridge(bridge);
		channel.publish(&r#"{"nodes":[{"id":"Q"}]}"#.to_string());
		assert_eq!(h.with(|sim| sim.graph.len()), 1);
	}

	#[test]
	fn reattach_drops_old_subscriptions() {
		let h = handle();
		let first = HostBridge::default();
		let old = first.graph_replaced.clone();
		h.attach_bridge(first);
		assert_eq!(old.subscriber_count(), 1);
		h.attach_bridge(HostBridge::default());
		assert_eq!(old.subscriber_count(), 0);
	}

	#[test]
	fn attach_loads_host_graph() {
		let h = handle();
		h.attach_bridge(HostBridge {
			graph_json: Some(Box::new(|| Some(r#"{"nodes":[{"id":"X"},{"id":"Y"},{"id":"Z"}]}"#.into()))),
			..HostBridge::default()
		});
		assert_eq!(h.with(|sim| sim.graph.len()), 3);
		assert!(toasts(&h).contains(&"Bridge connected".to_string()));
	}

	#[test]
	fn host_selection_focuses_node() {
		let h = handle();
		let bridge = HostBridge::default();
		let selection = bridge.selection_changed.clone();
		h.attach_bridge(bridge);
		selection.publish(&"B".to_string());
		assert_eq!(h.with(|sim| sim.selected().map(str::to_string)), Some("B".into()));
	}

	#[test]
	fn open_without_bridge_toasts() {
		let h = handle();
		h.with(|sim| sim.select("A"));
		h.with(|sim| sim.drain_events());
		h.open_selected();
		assert_eq!(toasts(&h), ["No bridge: open disabled"]);
	}

	#[test]
	fn commands_fall_back_locally() {
		let h = handle();
		h.command(Command::Focus, "B");
		assert_eq!(h.with(|sim| sim.selected().map(str::to_string)), Some("B".into()));
		h.command(Command::Overview, "");
		assert_eq!(h.with(|sim| sim.selected().map(str::to_string)), None);
		h.with(|sim| sim.drain_events());
		h.command(Command::Back, "");
		assert_eq!(toasts(&h), ["No bridge: back disabled"]);
	}

	#[test]
	fn commands_go_to_host_when_supported() {
		let h = handle();
		let sent = Rc::new(RefCell::new(Vec::new()));
		let sink = sent.clone();
		h.attach_bridge(HostBridge {
			send_command: Some(Box::new(move |cmd, arg| {
				sink.borrow_mut().push((cmd, arg.to_string()))
			})),
			..HostBridge::default()
		});
		h.command(Command::Focus, "B");
		assert_eq!(*sent.borrow(), [(Command::Focus, "B".to_string())]);
		assert_eq!(h.with(|sim| sim.selected().map(str::to_string)), None);
	}

	#[test]
	fn search_rows_carry_subtitles() {
		let h = handle();
		let hits = h.search("ALPHA");
		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].subtitle, "src/alpha.rs");
		assert_eq!(h.search("beta")[0].subtitle, "mod");
		assert!(h.search("  ").is_empty());
	}

	#[test]
	fn detail_uses_host_meta() {
		let h = handle();
		h.attach_bridge(HostBridge {
			node_detail_json: Some(Box::new(|_| Some(r#"{"owner":"core"}"#.into()))),
			..HostBridge::default()
		});
		let d = h.detail("A").unwrap();
		assert!(d.body.contains("\"owner\": \"core\""));
		assert!(h.detail("missing").is_none());
	}
}
