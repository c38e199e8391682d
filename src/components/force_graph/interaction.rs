//! Pointer gesture state machine.
//!
//! A press is ambiguous between select, drag and pan until the pointer has
//! moved (or not) and the press point has been hit-tested, so the intent from
//! pointer-down is kept in a [`Gesture`] until pointer-up. One pointer owns a
//! gesture at a time; presses from other pointers are ignored until it ends.
//! All positions are CSS pixels relative to the canvas.

use log::debug;
use serde::Deserialize;

use super::state::Simulation;
use super::types::Point;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
	/// Total pointer travel (CSS px, Manhattan) below which a press counts as a click.
	pub click_slop: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self { click_slop: 2.0 }
	}
}

impl InteractionConfig {
	/// Non-finite slop falls back to the default; negative slop is mirrored.
	pub fn sanitized(self) -> Self {
		let click_slop = if self.click_slop.is_finite() {
			self.click_slop.abs()
		} else {
			Self::default().click_slop
		};
		Self { click_slop }
	}
}

/// What the current press is doing.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
	#[default]
	Idle,
	/// Holding a node under the pointer.
	DraggingNode { id: String, origin: Point, moved: bool },
	/// Dragging the canvas; `view_origin` is the translation at press time.
	PanningCanvas {
		origin: Point,
		view_origin: Point,
		moved: bool,
	},
}

/// Turns pointer and wheel events into simulation actions.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
	gesture: Gesture,
	/// Pointer that started the current gesture.
	owner: Option<i32>,
	config: InteractionConfig,
}

impl Interaction {
	pub fn new(config: InteractionConfig) -> Self {
		Self {
			gesture: Gesture::Idle,
			owner: None,
			config: config.sanitized(),
		}
	}

	pub fn gesture(&self) -> &Gesture {
		&self.gesture
	}

	fn travelled(&self, origin: Point, at: Point) -> bool {
		(at.x - origin.x).abs() + (at.y - origin.y).abs() > self.config.click_slop
	}

	/// Whether events from `pointer` belong to someone else's gesture.
	fn foreign(&self, pointer: i32) -> bool {
		self.gesture != Gesture::Idle && self.owner != Some(pointer)
	}

	pub fn pointer_down(&mut self, sim: &mut Simulation, pointer: i32, at: Point) {
		if self.gesture != Gesture::Idle {
			debug!("spider-graph: pointer {} pressed during a gesture, ignored", pointer);
			return;
		}
		self.owner = Some(pointer);
		if let Some(id) = sim.pick(at).and_then(|i| sim.begin_drag(i)) {
			self.gesture = Gesture::DraggingNode {
				id,
				origin: at,
				moved: false,
			};
		} else {
			self.gesture = Gesture::PanningCanvas {
				origin: at,
				view_origin: sim.viewport.translation(),
				moved: false,
			};
		}
	}

	pub fn pointer_move(&mut self, sim: &mut Simulation, pointer: i32, at: Point) {
		if self.foreign(pointer) {
			return;
		}
		let far = match &self.gesture {
			Gesture::DraggingNode { origin, .. } | Gesture::PanningCanvas { origin, .. } => {
				self.travelled(*origin, at)
			}
			Gesture::Idle => false,
		};

		match &mut self.gesture {
			Gesture::Idle => {
				let hit = sim.pick(at);
				sim.set_hover(hit);
			}
			Gesture::DraggingNode { id, moved, .. } => {
				*moved |= far;
				let world = sim.viewport.pointer_to_world(at);
				if sim.drag_to(world) {
					let index = sim.graph.index_of(id);
					sim.set_hover(index);
				} else {
					self.gesture = Gesture::Idle;
					self.owner = None;
				}
			}
			Gesture::PanningCanvas {
				origin,
				view_origin,
				moved,
			} => {
				*moved |= far;
				let delta = Point::new(at.x - origin.x, at.y - origin.y);
				sim.viewport.pan_from(*view_origin, delta);
			}
		}
	}

	pub fn pointer_up(&mut self, sim: &mut Simulation, pointer: i32, at: Point) {
		if self.owner != Some(pointer) {
			return;
		}
		self.owner = None;
		match std::mem::take(&mut self.gesture) {
			Gesture::DraggingNode { id, moved, .. } => {
				if !moved {
					sim.select(&id);
				}
				sim.end_drag();
			}
			Gesture::PanningCanvas { moved: false, .. } => match sim.pick(at) {
				Some(i) => {
					let id = sim.graph.nodes[i].id.clone();
					sim.select(&id);
				}
				None => sim.deselect(),
			},
			Gesture::PanningCanvas { .. } | Gesture::Idle => {}
		}
	}

	/// Pointer left the canvas or was cancelled without a release: abandon
	/// the gesture it owns.
	pub fn pointer_leave(&mut self, sim: &mut Simulation, pointer: i32) {
		if self.foreign(pointer) {
			return;
		}
		if matches!(self.gesture, Gesture::DraggingNode { .. }) {
			sim.end_drag();
		}
		self.gesture = Gesture::Idle;
		self.owner = None;
		sim.set_hover(None);
	}

	/// Anchor-preserving zoom; valid in every state. A dragged node stays
	/// under the cursor.
	pub fn wheel(&mut self, sim: &mut Simulation, at: Point, delta_y: f64) {
		sim.viewport.wheel(at, delta_y);
		if matches!(self.gesture, Gesture::DraggingNode { .. }) {
			let world = sim.viewport.pointer_to_world(at);
			sim.drag_to(world);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::state::{GraphConfig, SimEvent};
	use serde_json::json;

	const MOUSE: i32 = 1;
	const FINGER: i32 = 7;

	fn setup() -> (Simulation, Interaction) {
		let mut sim = Simulation::new(&GraphConfig::default(), 800.0, 600.0, 1.0);
		sim.load_value(&json!({
			"nodes": [
				{ "id": "A", "x": 0.0, "y": 0.0 },
				{ "id": "B", "x": 150.0, "y": 0.0 },
				{ "id": "C", "x": 0.0, "y": 150.0 },
			],
			"links": [{ "source": "A", "target": "B" }, { "source": "A", "target": "C" }],
		}));
		sim.set_running(false);
		sim.drain_events();
		(sim, Interaction::default())
	}

	fn screen_of(sim: &Simulation, id: &str) -> Point {
		let node = sim.graph.node(id).unwrap();
		let s = sim.viewport.world_to_screen(node.position());
		let dpr = sim.viewport.dpr();
		Point::new(s.x / dpr, s.y / dpr)
	}

	fn empty_spot(sim: &Simulation) -> Point {
		let p = Point::new(5.0, 5.0);
		assert!(sim.pick(p).is_none());
		p
	}

	#[test]
	fn click_on_node_selects_it() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "B");
		ui.pointer_down(&mut sim, MOUSE, at);
		assert!(matches!(ui.gesture(), Gesture::DraggingNode { id, .. } if id == "B"));
		ui.pointer_up(&mut sim, MOUSE, at);

		assert_eq!(ui.gesture(), &Gesture::Idle);
		assert_eq!(sim.selected(), Some("B"));
		assert_eq!(sim.drain_events(), vec![SimEvent::Selected("B".into())]);
		assert!(sim.graph.node("B").unwrap().fixed.is_none());
	}

	#[test]
	fn click_on_empty_space_deselects() {
		let (mut sim, mut ui) = setup();
		sim.select("B");
		sim.drain_events();
		let at = empty_spot(&sim);
		ui.pointer_down(&mut sim, MOUSE, at);
		assert!(matches!(ui.gesture(), Gesture::PanningCanvas { .. }));
		ui.pointer_up(&mut sim, MOUSE, at);
		assert_eq!(sim.selected(), None);
		assert_eq!(sim.drain_events(), vec![SimEvent::Deselected]);
	}

	#[test]
	fn drag_moves_node_and_releases_it() {
		let (mut sim, mut ui) = setup();
		sim.select("C");
		let start = screen_of(&sim, "B");
		let world_start = sim.graph.node("B").unwrap().position();
		let (dx, dy) = (40.0, -25.0);
		let end = Point::new(start.x + dx, start.y + dy);

		ui.pointer_down(&mut sim, MOUSE, start);
		ui.pointer_move(&mut sim, MOUSE, Point::new(start.x + dx / 2.0, start.y + dy / 2.0));
		ui.pointer_move(&mut sim, MOUSE, end);
		let expected = sim.viewport.pointer_to_world(end);
		assert_eq!(sim.graph.node("B").unwrap().fixed, Some(expected));
		assert_eq!(sim.hovered(), Some("B"));
		ui.pointer_up(&mut sim, MOUSE, end);

		let node = sim.graph.node("B").unwrap();
		assert!(node.fixed.is_none());
		assert!(!node.pinned);
		assert_eq!(node.position(), expected);
		assert_ne!(node.position(), world_start);
		assert_eq!(sim.selected(), Some("C"));
	}

	#[test]
	fn tiny_jitter_still_counts_as_click() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "C");
		ui.pointer_down(&mut sim, MOUSE, at);
		ui.pointer_move(&mut sim, MOUSE, Point::new(at.x + 1.0, at.y + 0.5));
		ui.pointer_up(&mut sim, MOUSE, Point::new(at.x + 1.0, at.y + 0.5));
		assert_eq!(sim.selected(), Some("C"));
	}

	#[test]
	fn panning_moves_view_without_deselecting() {
		let (mut sim, mut ui) = setup();
		sim.select("A");
		let at = empty_spot(&sim);
		let before = sim.viewport.translation();
		ui.pointer_down(&mut sim, MOUSE, at);
		ui.pointer_move(&mut sim, MOUSE, Point::new(at.x + 30.0, at.y - 20.0));
		assert_eq!(
			sim.viewport.translation(),
			Point::new(before.x + 30.0, before.y - 20.0)
		);
		ui.pointer_up(&mut sim, MOUSE, Point::new(at.x + 30.0, at.y - 20.0));
		assert_eq!(sim.selected(), Some("A"));
	}

	#[test]
	fn hover_follows_pointer_when_idle() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "A");
		ui.pointer_move(&mut sim, MOUSE, at);
		assert_eq!(sim.hovered(), Some("A"));
		let away = empty_spot(&sim);
		ui.pointer_move(&mut sim, MOUSE, away);
		assert_eq!(sim.hovered(), None);
	}

	#[test]
	fn wheel_zooms_mid_drag() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "B");
		ui.pointer_down(&mut sim, MOUSE, at);
		let k = sim.viewport.transform.k;
		let cursor = Point::new(at.x + 30.0, at.y + 10.0);
		ui.wheel(&mut sim, cursor, -1.0);
		assert!(sim.viewport.transform.k > k);
		assert!(matches!(ui.gesture(), Gesture::DraggingNode { .. }));
		let held = sim.graph.node("B").unwrap().fixed.unwrap();
		let expected = sim.viewport.pointer_to_world(cursor);
		assert!((held.x - expected.x).abs() < 1e-9 && (held.y - expected.y).abs() < 1e-9);
	}

	#[test]
	fn second_pointer_cannot_steal_a_drag() {
		let (mut sim, mut ui) = setup();
		let b = screen_of(&sim, "B");
		let c = screen_of(&sim, "C");
		ui.pointer_down(&mut sim, MOUSE, b);
		ui.pointer_down(&mut sim, FINGER, c);
		assert!(matches!(ui.gesture(), Gesture::DraggingNode { id, .. } if id == "B"));
		assert!(sim.graph.node("C").unwrap().fixed.is_none());

		ui.pointer_move(&mut sim, FINGER, Point::new(c.x + 40.0, c.y));
		ui.pointer_up(&mut sim, FINGER, c);
		assert_eq!(sim.dragging(), Some("B"));

		ui.pointer_move(&mut sim, MOUSE, Point::new(b.x + 40.0, b.y));
		ui.pointer_up(&mut sim, MOUSE, Point::new(b.x + 40.0, b.y));
		assert_eq!(ui.gesture(), &Gesture::Idle);

		sim.set_running(true);
		for _ in 0..50 {
			sim.tick();
		}
		for id in ["B", "C"] {
			let node = sim.graph.node(id).unwrap();
			assert!(node.fixed.is_none(), "{id} left fixed");
			assert!(!node.pinned);
		}
	}

	#[test]
	fn foreign_leave_keeps_gesture() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "B");
		ui.pointer_down(&mut sim, MOUSE, at);
		ui.pointer_leave(&mut sim, FINGER);
		assert_eq!(sim.dragging(), Some("B"));
		ui.pointer_leave(&mut sim, MOUSE);
		assert_eq!(sim.dragging(), None);
	}

	#[test]
	fn leaving_canvas_abandons_drag() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "B");
		ui.pointer_down(&mut sim, MOUSE, at);
		ui.pointer_leave(&mut sim, MOUSE);
		assert_eq!(ui.gesture(), &Gesture::Idle);
		assert!(sim.graph.node("B").unwrap().fixed.is_none());
		assert_eq!(sim.selected(), None);
	}

	#[test]
	fn drag_of_removed_node_goes_idle() {
		let (mut sim, mut ui) = setup();
		let at = screen_of(&sim, "B");
		ui.pointer_down(&mut sim, MOUSE, at);
		sim.load_value(&json!({ "nodes": [{ "id": "Q" }] }));
		ui.pointer_move(&mut sim, MOUSE, Point::new(at.x + 50.0, at.y));
		assert_eq!(ui.gesture(), &Gesture::Idle);
	}
}
