//! Uniform grid over node positions.
//!
//! Rebuilt from scratch before every physics step. Bucket vectors are kept
//! between rebuilds so steady-state stepping does not allocate.

use std::collections::HashMap;

use super::types::GraphNode;

/// Integer cell coordinate.
pub type Cell = (i32, i32);

/// Node indices bucketed by cell.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
	cell_size: f64,
	cells: HashMap<Cell, Vec<usize>>,
}

impl SpatialGrid {
	pub fn new(cell_size: f64) -> Self {
		Self {
			cell_size: cell_size.max(f64::EPSILON),
			cells: HashMap::new(),
		}
	}

	/// Cell containing `(x, y)`. Float-to-int casts saturate, so runaway
	/// coordinates land in edge cells instead of wrapping. Edge cells have no
	/// neighbors past the `i32` range.
	pub fn cell_of(&self, x: f64, y: f64) -> Cell {
		(
			(x / self.cell_size).floor() as i32,
			(y / self.cell_size).floor() as i32,
		)
	}

	/// Re-buckets every node.
	pub fn rebuild(&mut self, nodes: &[GraphNode], cell_size: f64) {
		self.cell_size = cell_size.max(f64::EPSILON);
		self.cells.retain(|_, bucket| {
			let keep = !bucket.is_empty();
			bucket.clear();
			keep
		});
		for (i, node) in nodes.iter().enumerate() {
			let cell = self.cell_of(node.x, node.y);
			self.cells.entry(cell).or_default().push(i);
		}
	}

	pub fn bucket(&self, cell: Cell) -> &[usize] {
		self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Indices in the 3×3 block of cells centered on `cell`.
	pub fn neighborhood(&self, cell: Cell) -> impl Iterator<Item = usize> + '_ {
		let (cx, cy) = cell;
		(-1..=1)
			.flat_map(move |ox| {
				(-1..=1).filter_map(move |oy| Some((cx.checked_add(ox)?, cy.checked_add(oy)?)))
			})
			.flat_map(|c| self.bucket(c).iter().copied())
	}
}
