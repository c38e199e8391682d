//! Simulation aggregate and highlight tracking.
//!
//! [`Simulation`] owns the graph, the integrator, the viewport and the
//! selection/hover ids. The frame loop and the pointer handlers both receive
//! it by `&mut`; nothing else holds node records. Hover, selection and drag
//! targets are stored as ids and re-resolved on use, so a graph replaced in
//! between simply makes them miss.

use std::collections::{HashMap, HashSet};

use log::info;
use serde::Deserialize;
use serde_json::Value;

use super::graph::Graph;
use super::interaction::InteractionConfig;
use super::physics::{Physics, PhysicsParams};
use super::pick::pick;
use super::scale::{ScaleConfig, ScaledValues};
use super::types::{Point, Scatter};
use super::viewport::{Viewport, ViewportConfig};
use crate::error::{GraphError, Result};

/// Seconds per frame assumed by the highlight animation.
pub const FRAME_DT: f64 = 0.016;

/// Frames the hub stays fixed at the origin after a load (~650 ms).
const HUB_HOLD_FRAMES: u32 = 39;

/// Host-overridable configuration, usually read from `<script id="graph-config">`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
	/// Force model tunables.
	pub physics: PhysicsParams,
	/// Zoom limits, fit padding and camera motion.
	pub viewport: ViewportConfig,
	/// Pointer gesture thresholds.
	pub interaction: InteractionConfig,
}

impl GraphConfig {
	/// Repairs out-of-range host overrides so no frame can trip over them.
	pub fn sanitized(self) -> Self {
		Self {
			physics: self.physics.sanitized(),
			viewport: self.viewport.sanitized(),
			interaction: self.interaction.sanitized(),
		}
	}
}

/// Outward notifications, drained by the frame loop.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
	Loaded { nodes: usize, links: usize },
	Selected(String),
	Deselected,
	PinChanged { id: String, pinned: bool },
	RunningChanged(bool),
	/// Short transient message for the user.
	Toast(String),
}

/// Minimum time (seconds) a highlight must be held before it can fade out.
/// This prevents flashing when the pointer briefly skirts a node's hit zone.
const MIN_HOLD_TIME: f64 = 0.12;

/// Smooth per-node highlight intensities for the hovered neighborhood.
///
/// Each node has its own intensity (0.0 to 1.0) that eases toward whether it
/// is in the active set, with exponential smoothing and a short hold time.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered: Option<String>,
	/// Hovered node plus its neighbors.
	target_set: HashSet<String>,
	node_intensity: HashMap<String, f64>,
	/// Intensity of the hover effect proper, tracking only the hovered node.
	hover_intensity: HashMap<String, f64>,
	hold_timer: HashMap<String, f64>,
}

impl HighlightState {
	/// Sets the hovered node and its neighborhood.
	pub fn set_hover(&mut self, node: Option<&str>, neighbors: impl IntoIterator<Item = String>) {
		if self.hovered.as_deref() == node {
			return;
		}
		self.hovered = node.map(str::to_string);
		self.target_set.clear();

		if let Some(id) = node {
			self.target_set.insert(id.to_string());
			self.target_set.extend(neighbors);
			for id in &self.target_set {
				self.hold_timer.insert(id.clone(), MIN_HOLD_TIME);
			}
		}
	}

	/// Drops everything, e.g. when the graph is replaced.
	pub fn clear(&mut self) {
		*self = Self::default();
	}

	/// Eases every intensity toward its target.
	pub fn tick(&mut self, dt: f64) {
		// Fade-in reaches ~95% in ~150 ms, fade-out in ~250 ms.
		const FADE_IN_SPEED: f64 = 6.0;
		const FADE_OUT_SPEED: f64 = 4.0;

		let fade_in = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out = (-FADE_OUT_SPEED * dt).exp();

		for id in &self.target_set {
			let intensity = self.node_intensity.entry(id.clone()).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in;
		}
		if let Some(id) = &self.hovered {
			let intensity = self.hover_intensity.entry(id.clone()).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in;
		}

		let target_set = &self.target_set;
		self.hold_timer.retain(|id, timer| {
			if target_set.contains(id) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		let hold_timer = &self.hold_timer;
		let held = |id: &String| hold_timer.get(id).copied().unwrap_or(0.0) > 0.0;

		self.node_intensity.retain(|id, intensity| {
			if !target_set.contains(id) && !held(id) {
				*intensity *= fade_out;
			}
			*intensity > 0.005
		});

		let hovered = self.hovered.as_ref();
		self.hover_intensity.retain(|id, intensity| {
			if hovered != Some(id) && !held(id) {
				*intensity *= fade_out;
			}
			*intensity > 0.005
		});
	}

	pub fn node_intensity(&self, id: &str) -> f64 {
		self.node_intensity.get(id).copied().unwrap_or(0.0)
	}

	pub fn hover_intensity(&self, id: &str) -> f64 {
		self.hover_intensity.get(id).copied().unwrap_or(0.0)
	}

	/// Geometric mean keeps links from lagging behind their endpoints.
	pub fn edge_intensity(&self, a: &str, b: &str) -> f64 {
		(self.node_intensity(a) * self.node_intensity(b)).sqrt()
	}
}

#[derive(Clone, Debug)]
struct HubHold {
	id: String,
	frames_left: u32,
}

/// Everything the frame loop and input handlers mutate.
pub struct Simulation {
	pub graph: Graph,
	pub physics: Physics,
	pub viewport: Viewport,
	pub highlight: HighlightState,
	pub scale: ScaleConfig,
	running: bool,
	hovered: Option<String>,
	selected: Option<String>,
	dragging: Option<String>,
	hub_hold: Option<HubHold>,
	scatter: Scatter,
	events: Vec<SimEvent>,
}

impl Simulation {
	/// `width`/`height` in CSS pixels.
	pub fn new(config: &GraphConfig, width: f64, height: f64, dpr: f64) -> Self {
		Self {
			graph: Graph::default(),
			physics: Physics::new(config.physics.clone()),
			viewport: Viewport::new(config.viewport.clone(), width, height, dpr),
			highlight: HighlightState::default(),
			scale: ScaleConfig::default(),
			running: true,
			hovered: None,
			selected: None,
			dragging: None,
			hub_hold: None,
			scatter: Scatter::default(),
			events: Vec::new(),
		}
	}

	/// Replaces the graph with a normalized `raw` record.
	pub fn load_value(&mut self, raw: &Value) {
		let graph = Graph::load(raw, &mut self.scatter);
		self.set_graph(graph);
	}

	/// Parses and loads serialized graph JSON. On failure the current graph
	/// stays as it was.
	pub fn load_json(&mut self, json: &str) -> Result<()> {
		let raw: Value = serde_json::from_str(json)?;
		if !raw.is_object() {
			return Err(GraphError::NotARecord);
		}
		self.load_value(&raw);
		Ok(())
	}

	/// Installs a new graph and resets selection, hover and energy.
	pub fn set_graph(&mut self, graph: Graph) {
		self.graph = graph;
		if self.selected.take().is_some() {
			self.events.push(SimEvent::Deselected);
		}
		self.hovered = None;
		self.dragging = None;
		self.highlight.clear();
		self.physics.energy.reheat();

		self.hub_hold = self.graph.hub().map(|hub| {
			let node = &mut self.graph.nodes[hub];
			node.hold_at(Point::default());
			HubHold {
				id: node.id.clone(),
				frames_left: HUB_HOLD_FRAMES,
			}
		});

		self.fit();
		let (nodes, links) = (self.graph.len(), self.graph.links.len());
		info!("spider-graph: loaded {} nodes, {} links", nodes, links);
		self.events.push(SimEvent::Loaded { nodes, links });
		self.toast(format!("Loaded: {nodes} nodes / {links} links"));
	}

	/// One frame: physics (unless paused), hub release, camera animation and
	/// highlight easing.
	pub fn tick(&mut self) {
		if self.running {
			self.physics.step(&mut self.graph);
		}
		self.release_hub();
		self.viewport.advance();
		self.highlight.tick(FRAME_DT);
	}

	fn release_hub(&mut self) {
		let Some(hold) = self.hub_hold.as_mut() else {
			return;
		};
		hold.frames_left = hold.frames_left.saturating_sub(1);
		if hold.frames_left > 0 {
			return;
		}
		let id = hold.id.clone();
		self.hub_hold = None;
		if self.dragging() == Some(id.as_str()) {
			return;
		}
		if let Some(node) = self.graph.node_mut(&id) {
			if !node.pinned {
				node.fixed = None;
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
		self.viewport.resize(width, height, dpr);
	}

	pub fn scaled(&self) -> ScaledValues {
		ScaledValues::new(&self.scale, self.viewport.transform.k, self.viewport.dpr())
	}

	/// Node under a CSS-pixel pointer position.
	pub fn pick(&self, css: Point) -> Option<usize> {
		let screen = self.viewport.to_device(css);
		pick(&self.graph, &self.viewport, screen, self.scaled().hit_slop)
	}

	pub fn hovered(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	pub fn selected(&self) -> Option<&str> {
		self.selected.as_deref()
	}

	pub fn dragging(&self) -> Option<&str> {
		self.dragging.as_deref()
	}

	pub fn running(&self) -> bool {
		self.running
	}

	pub fn set_hover(&mut self, index: Option<usize>) {
		let node = index.and_then(|i| self.graph.nodes.get(i));
		self.hovered = node.map(|n| n.id.clone());
		let neighbors: Vec<String> = index
			.map(|i| {
				self.graph
					.neighbors(i)
					.map(|j| self.graph.nodes[j].id.clone())
					.collect()
			})
			.unwrap_or_default();
		self.highlight.set_hover(self.hovered.as_deref(), neighbors);
	}

	/// Selects `id` if it exists. Returns whether it did.
	pub fn select(&mut self, id: &str) -> bool {
		if self.graph.index_of(id).is_none() {
			return false;
		}
		self.selected = Some(id.to_string());
		self.physics.energy.reheat();
		self.events.push(SimEvent::Selected(id.to_string()));
		true
	}

	pub fn deselect(&mut self) {
		if self.selected.take().is_some() {
			self.events.push(SimEvent::Deselected);
		}
	}

	/// Selects `id` and pans it to the center of the canvas.
	pub fn focus(&mut self, id: &str) -> bool {
		let Some(at) = self.graph.node(id).map(|n| n.position()) else {
			return false;
		};
		self.select(id);
		self.viewport.animate_to(at);
		true
	}

	pub fn fit(&mut self) {
		self.viewport.fit(self.graph.bounds());
	}

	pub fn reheat(&mut self) {
		self.physics.energy.reheat();
	}

	pub fn set_running(&mut self, running: bool) {
		if self.running == running {
			return;
		}
		self.running = running;
		self.events.push(SimEvent::RunningChanged(running));
		self.toast(if running { "Running" } else { "Paused" });
	}

	pub fn toggle_running(&mut self) {
		self.set_running(!self.running);
	}

	/// Pins `id` where it stands, or releases an existing pin.
	pub fn toggle_pin(&mut self, id: &str) -> Option<bool> {
		let dragging = self.dragging() == Some(id);
		let node = self.graph.node_mut(id)?;
		node.pinned = !node.pinned;
		if node.pinned {
			let at = node.position();
			node.hold_at(at);
		} else if !dragging {
			node.fixed = None;
		}
		let pinned = node.pinned;
		self.events.push(SimEvent::PinChanged {
			id: id.to_string(),
			pinned,
		});
		self.toast(if pinned { "Pinned" } else { "Unpinned" });
		Some(pinned)
	}

	/// Starts holding node `index` under the pointer.
	pub fn begin_drag(&mut self, index: usize) -> Option<String> {
		self.end_drag();
		let node = self.graph.nodes.get_mut(index)?;
		let at = node.position();
		node.hold_at(at);
		let id = node.id.clone();
		self.dragging = Some(id.clone());
		self.physics.energy.reheat();
		Some(id)
	}

	/// Moves the dragged node. Returns `false` if it no longer exists.
	pub fn drag_to(&mut self, world: Point) -> bool {
		let Some(id) = self.dragging.clone() else {
			return false;
		};
		match self.graph.node_mut(&id) {
			Some(node) => {
				node.hold_at(world);
				true
			}
			None => {
				self.dragging = None;
				false
			}
		}
	}

	/// Ends a drag. The temporary fix is released unless the node is pinned,
	/// in which case the pin moves to where the node was dropped.
	pub fn end_drag(&mut self) {
		let Some(id) = self.dragging.take() else {
			return;
		};
		if let Some(node) = self.graph.node_mut(&id) {
			if !node.pinned {
				node.fixed = None;
			}
		}
	}

	pub fn toast(&mut self, message: impl Into<String>) {
		self.events.push(SimEvent::Toast(message.into()));
	}

	pub fn drain_events(&mut self) -> Vec<SimEvent> {
		std::mem::take(&mut self.events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn sim_with(raw: Value) -> Simulation {
		let mut sim = Simulation::new(&GraphConfig::default(), 800.0, 600.0, 1.0);
		sim.load_value(&raw);
		sim.drain_events();
		sim
	}

	fn abc() -> Value {
		json!({
			"nodes": [{ "id": "A" }, { "id": "B" }, { "id": "C" }],
			"links": [{ "source": "A", "target": "B" }, { "source": "A", "target": "C" }],
		})
	}

	#[test]
	fn load_reports_and_seeds_hub() {
		let mut sim = Simulation::new(&GraphConfig::default(), 800.0, 600.0, 1.0);
		sim.load_value(&abc());
		let events = sim.drain_events();
		assert!(events.contains(&SimEvent::Loaded { nodes: 3, links: 2 }));
		assert!(events.contains(&SimEvent::Toast("Loaded: 3 nodes / 2 links".into())));

		let hub = sim.graph.node("A").unwrap();
		assert_eq!(hub.position(), Point::default());
		assert!(hub.fixed.is_some());

		for _ in 0..HUB_HOLD_FRAMES {
			sim.tick();
		}
		assert!(sim.graph.node("A").unwrap().fixed.is_none());
	}

	#[test]
	fn load_json_rejects_garbage_and_keeps_graph() {
		let mut sim = sim_with(abc());
		assert!(matches!(sim.load_json("{not json"), Err(GraphError::Json(_))));
		assert!(matches!(sim.load_json("[1,2]"), Err(GraphError::NotARecord)));
		assert_eq!(sim.graph.len(), 3);
		sim.load_json(r#"{"links":[{"source":"X","target":"Y"}]}"#).unwrap();
		assert_eq!(sim.graph.len(), 2);
	}

	#[test]
	fn reload_clears_selection() {
		let mut sim = sim_with(abc());
		assert!(sim.select("B"));
		sim.drain_events();
		sim.load_value(&abc());
		assert_eq!(sim.selected(), None);
		assert!(sim.drain_events().contains(&SimEvent::Deselected));
	}

	#[test]
	fn select_unknown_is_noop() {
		let mut sim = sim_with(abc());
		assert!(!sim.select("nope"));
		assert!(!sim.focus("nope"));
		assert!(sim.drain_events().is_empty());
	}

	#[test]
	fn focus_selects_and_centers() {
		let mut sim = sim_with(abc());
		sim.set_running(false);
		sim.drain_events();
		let at = sim.graph.node("C").unwrap().position();
		assert!(sim.focus("C"));
		assert_eq!(sim.selected(), Some("C"));
		assert_eq!(sim.drain_events(), vec![SimEvent::Selected("C".into())]);
		for _ in 0..16 {
			sim.tick();
		}
		let screen = sim.viewport.world_to_screen(at);
		assert!((screen.x - 400.0).abs() < 1e-6 && (screen.y - 300.0).abs() < 1e-6);
	}

	#[test]
	fn paused_simulation_does_not_move_nodes() {
		let mut sim = sim_with(abc());
		sim.set_running(false);
		let before: Vec<Point> = sim.graph.nodes.iter().map(|n| n.position()).collect();
		for _ in 0..10 {
			sim.tick();
		}
		let after: Vec<Point> = sim.graph.nodes.iter().map(|n| n.position()).collect();
		assert_eq!(before, after);
		assert!(sim.drain_events().contains(&SimEvent::RunningChanged(false)));
	}

	#[test]
	fn pin_toggle_holds_and_releases() {
		let mut sim = sim_with(abc());
		for _ in 0..60 {
			sim.tick();
		}
		assert_eq!(sim.toggle_pin("B"), Some(true));
		let at = sim.graph.node("B").unwrap().position();
		for _ in 0..30 {
			sim.tick();
		}
		assert_eq!(sim.graph.node("B").unwrap().position(), at);

		assert_eq!(sim.toggle_pin("B"), Some(false));
		sim.reheat();
		for _ in 0..5 {
			sim.tick();
		}
		assert_ne!(sim.graph.node("B").unwrap().position(), at);
		assert_eq!(sim.toggle_pin("missing"), None);
	}

	#[test]
	fn drag_release_keeps_user_pin() {
		let mut sim = sim_with(abc());
		let b = sim.graph.index_of("B").unwrap();
		sim.toggle_pin("B");
		sim.begin_drag(b);
		assert!(sim.drag_to(Point::new(40.0, 40.0)));
		sim.end_drag();
		let node = sim.graph.node("B").unwrap();
		assert!(node.pinned);
		assert_eq!(node.fixed, Some(Point::new(40.0, 40.0)));
	}

	#[test]
	fn drag_target_vanishes_on_reload() {
		let mut sim = sim_with(abc());
		sim.begin_drag(1);
		sim.load_value(&json!({ "nodes": [{ "id": "Z" }] }));
		assert!(!sim.drag_to(Point::new(1.0, 1.0)));
		assert_eq!(sim.dragging(), None);
	}

	#[test]
	fn hover_highlights_neighborhood() {
		let mut sim = sim_with(abc());
		let b = sim.graph.index_of("B").unwrap();
		sim.set_hover(Some(b));
		for _ in 0..30 {
			sim.tick();
		}
		assert!(sim.highlight.node_intensity("B") > 0.9);
		assert!(sim.highlight.node_intensity("A") > 0.9);
		assert!(sim.highlight.hover_intensity("B") > 0.9);
		assert_eq!(sim.highlight.node_intensity("C"), 0.0);

		sim.set_hover(None);
		for _ in 0..200 {
			sim.tick();
		}
		assert_eq!(sim.highlight.node_intensity("B"), 0.0);
		assert_eq!(sim.highlight.node_intensity("A"), 0.0);
	}

	#[test]
	fn bad_config_does_not_break_ticks() {
		for overrides in [
			json!({ "viewport": { "minZoom": 10.0 } }),
			json!({ "viewport": { "minZoom": -1.0, "wheelStep": 0.0 } }),
			json!({ "physics": { "energyFloor": 2.0 } }),
			json!({ "physics": { "springMax": -1.0 } }),
			json!({ "interaction": { "clickSlop": -3.0 } }),
		] {
			let config: GraphConfig = serde_json::from_value(overrides.clone()).unwrap();
			let mut sim = Simulation::new(&config, 800.0, 600.0, 1.0);
			sim.load_value(&abc());
			for _ in 0..20 {
				sim.tick();
			}
			sim.viewport.wheel(Point::new(400.0, 300.0), -1.0);
			let v = &sim.viewport;
			assert!(v.min_k() <= v.max_k(), "{overrides}");
			assert!(sim.graph.nodes.iter().all(|n| n.position().is_finite()), "{overrides}");
		}
	}

	#[test]
	fn inverted_zoom_range_is_swapped() {
		let config: GraphConfig =
			serde_json::from_value(json!({ "viewport": { "minZoom": 10.0 } })).unwrap();
		let config = config.sanitized();
		assert_eq!(config.viewport.min_zoom, 5.0);
		assert_eq!(config.viewport.max_zoom, 10.0);
		assert_eq!(config.clone().sanitized(), config);
	}

	#[test]
	fn new_drag_releases_the_previous_one() {
		let mut sim = sim_with(abc());
		let (b, c) = (sim.graph.index_of("B").unwrap(), sim.graph.index_of("C").unwrap());
		sim.begin_drag(b);
		sim.begin_drag(c);
		assert!(sim.graph.node("B").unwrap().fixed.is_none());
		assert_eq!(sim.dragging(), Some("C"));
	}

	#[test]
	fn config_parses_nested_overrides() {
		let config: GraphConfig = serde_json::from_value(json!({
			"physics": { "repulsion": 900.0 },
			"viewport": { "maxZoom": 8.0 },
		}))
		.unwrap();
		assert_eq!(config.physics.repulsion, 900.0);
		assert_eq!(config.viewport.max_zoom, 8.0);
		assert_eq!(config.viewport.min_zoom, 0.20);
	}
}
