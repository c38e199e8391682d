//! Force integrator.
//!
//! One [`Physics::step`] applies, in order: pin override, grid-bounded
//! collision and repulsion, link springs, then centering, damping and
//! integration scaled by the current [`Energy`]. Every force is clamped or
//! epsilon-guarded so positions stay finite.

use std::f64::consts::TAU;

use log::warn;
use serde::Deserialize;

use super::graph::Graph;
use super::grid::SpatialGrid;
use super::types::{GraphNode, positive_or};

/// Tunables for the force model.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsParams {
	/// Spring rest length in world units.
	pub link_distance: f64,
	/// Spring stiffness, multiplied by link weight.
	pub link_stiffness: f64,
	/// Upper bound on a single spring's pull.
	pub spring_max: f64,
	/// Inverse-square repulsion numerator.
	pub repulsion: f64,
	/// Upper bound on a single pair's repulsion.
	pub repulsion_max: f64,
	/// Pull toward the origin per unit of displacement.
	pub center_strength: f64,
	/// Velocity multiplier applied every step. Must be below 1.
	pub damping: f64,
	/// Extra spacing added to the sum of radii for collisions.
	pub collision_padding: f64,
	/// Fraction of overlap converted into push per step.
	pub collision_strength: f64,
	/// Base integration step.
	pub step: f64,
	/// Grid cell edge. Kept above the repulsion range that matters.
	pub cell_size: f64,
	/// Geometric energy decay per step.
	pub energy_decay: f64,
	/// Energy never drops below this.
	pub energy_floor: f64,
	/// Added to squared distances before dividing.
	pub epsilon: f64,
}

impl Default for PhysicsParams {
	fn default() -> Self {
		Self {
			link_distance: 55.0,
			link_stiffness: 0.010,
			spring_max: 50.0,
			repulsion: 1800.0,
			repulsion_max: 8.0,
			center_strength: 0.0020,
			damping: 0.86,
			collision_padding: 6.5,
			collision_strength: 0.05,
			step: 1.0,
			cell_size: 110.0,
			energy_decay: 0.985,
			energy_floor: 0.02,
			epsilon: 0.01,
		}
	}
}

impl PhysicsParams {
	/// Replaces values that would make a step diverge. Non-finite values fall
	/// back to defaults, bounds become non-negative and the energy floor
	/// lands in `(0, 1]`.
	pub fn sanitized(self) -> Self {
		let d = Self::default();
		let finite = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
		Self {
			link_distance: finite(self.link_distance, d.link_distance).max(0.0),
			link_stiffness: finite(self.link_stiffness, d.link_stiffness).max(0.0),
			spring_max: finite(self.spring_max, d.spring_max).abs(),
			repulsion: finite(self.repulsion, d.repulsion).max(0.0),
			repulsion_max: finite(self.repulsion_max, d.repulsion_max).abs(),
			center_strength: finite(self.center_strength, d.center_strength),
			damping: finite(self.damping, d.damping).clamp(0.0, 1.0),
			collision_padding: finite(self.collision_padding, d.collision_padding),
			collision_strength: finite(self.collision_strength, d.collision_strength).max(0.0),
			step: finite(self.step, d.step).max(0.0),
			cell_size: positive_or(self.cell_size, d.cell_size),
			energy_decay: finite(self.energy_decay, d.energy_decay).clamp(0.0, 1.0),
			energy_floor: positive_or(self.energy_floor, d.energy_floor).min(1.0),
			epsilon: positive_or(self.epsilon, d.epsilon),
		}
	}
}

/// Motion amplitude in `(0, 1]`. Reset to full by disturbances and decayed
/// every step toward a floor, never to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Energy(f64);

impl Energy {
	pub const FULL: Energy = Energy(1.0);

	pub fn value(self) -> f64 {
		self.0
	}

	pub fn reheat(&mut self) {
		*self = Self::FULL;
	}

	pub fn decay(&mut self, factor: f64, floor: f64) {
		self.0 = (self.0 * factor).max(floor).min(1.0);
	}

	/// Integration multiplier: hot right after a disturbance, calm later.
	pub fn gain(self) -> f64 {
		0.25 + self.0
	}
}

impl Default for Energy {
	fn default() -> Self {
		Self::FULL
	}
}

/// Integrator state: parameters, energy and the reusable grid.
#[derive(Clone, Debug)]
pub struct Physics {
	pub params: PhysicsParams,
	pub energy: Energy,
	grid: SpatialGrid,
}

impl Default for Physics {
	fn default() -> Self {
		Self::new(PhysicsParams::default())
	}
}

/// Unit vector from `b` to `a` plus the raw squared distance. Coincident
/// pairs get a fixed direction derived from their indices so they separate.
fn separation(a: &GraphNode, b: &GraphNode, i: usize, j: usize) -> (f64, f64, f64) {
	let (dx, dy) = (a.x - b.x, a.y - b.y);
	let d2 = dx * dx + dy * dy;
	if d2 > 1e-12 {
		let d = d2.sqrt();
		(dx / d, dy / d, d2)
	} else {
		let angle = ((i as f64) * 0.618_034 + (j as f64) * 0.414_214) * TAU;
		(angle.cos(), angle.sin(), d2)
	}
}

fn hold_fixed(node: &mut GraphNode) -> bool {
	match node.fixed {
		Some(at) => {
			node.x = at.x;
			node.y = at.y;
			node.vx = 0.0;
			node.vy = 0.0;
			true
		}
		None => false,
	}
}

impl Physics {
	pub fn new(params: PhysicsParams) -> Self {
		let params = params.sanitized();
		let grid = SpatialGrid::new(params.cell_size);
		Self {
			params,
			energy: Energy::FULL,
			grid,
		}
	}

	/// Advances the layout by one step.
	pub fn step(&mut self, graph: &mut Graph) {
		for node in &mut graph.nodes {
			hold_fixed(node);
		}

		self.grid.rebuild(&graph.nodes, self.params.cell_size);
		self.apply_pair_forces(&mut graph.nodes);
		self.apply_springs(graph);
		self.integrate(&mut graph.nodes);

		self.energy
			.decay(self.params.energy_decay, self.params.energy_floor);
	}

	fn apply_pair_forces(&self, nodes: &mut [GraphNode]) {
		let p = &self.params;
		for i in 0..nodes.len() {
			let cell = self.grid.cell_of(nodes[i].x, nodes[i].y);
			for j in self.grid.neighborhood(cell) {
				if j <= i {
					continue;
				}
				let (nx, ny, raw_d2) = separation(&nodes[i], &nodes[j], i, j);
				let d2 = raw_d2 + p.epsilon;
				let d = d2.sqrt();

				let mut f = (p.repulsion / d2).min(p.repulsion_max);
				let min_d = p.collision_padding + nodes[i].radius + nodes[j].radius;
				if d < min_d {
					f += (min_d - d) * p.collision_strength;
				}

				nodes[i].vx += nx * f;
				nodes[i].vy += ny * f;
				nodes[j].vx -= nx * f;
				nodes[j].vy -= ny * f;
			}
		}
	}

	fn apply_springs(&self, graph: &mut Graph) {
		let p = &self.params;
		for l in 0..graph.links.len() {
			let Some((s, t)) = graph.link_ends(l) else {
				continue;
			};
			if s == t {
				continue;
			}
			let weight = graph.links[l].weight;
			let (a, b) = (&graph.nodes[s], &graph.nodes[t]);
			let (dx, dy) = (b.x - a.x, b.y - a.y);
			let d = (dx * dx + dy * dy).sqrt() + 1e-6;
			let f = ((d - p.link_distance) * p.link_stiffness * weight)
				.max(-p.spring_max)
				.min(p.spring_max);
			let (nx, ny) = (dx / d, dy / d);

			graph.nodes[s].vx += nx * f;
			graph.nodes[s].vy += ny * f;
			graph.nodes[t].vx -= nx * f;
			graph.nodes[t].vy -= ny * f;
		}
	}

	fn integrate(&self, nodes: &mut [GraphNode]) {
		let p = &self.params;
		let gain = p.step * self.energy.gain();
		for node in nodes {
			if hold_fixed(node) {
				continue;
			}
			node.vx = (node.vx - node.x * p.center_strength) * p.damping;
			node.vy = (node.vy - node.y * p.center_strength) * p.damping;
			node.x += node.vx * gain;
			node.y += node.vy * gain;

			if !node.position().is_finite() {
				warn!("spider-graph: node {:?} diverged, recentering", node.id);
				node.x = 0.0;
				node.y = 0.0;
				node.vx = 0.0;
				node.vy = 0.0;
			}
		}
	}
}
