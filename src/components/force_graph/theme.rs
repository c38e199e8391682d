//! Visual theming for the spider graph.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t) as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t) as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t) as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// Flat fill plus an off-centre radial glow.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	pub color: Color,
	pub glow: Color,
	/// Glow centre as a fraction of canvas width and height.
	pub glow_center: (f64, f64),
	/// Inner glow radius in device pixels.
	pub glow_inner_radius: f64,
}

#[derive(Clone, Debug)]
pub struct EdgeStyle {
	/// Link color; alpha is computed per link.
	pub color: Color,
	/// Canvas composite operation for links.
	pub composite: &'static str,
}

#[derive(Clone, Debug)]
pub struct NodeStyle {
	/// Fill for nodes without a group or explicit color.
	pub fill: Color,
	/// Fill for grouped nodes.
	pub group_fill: Color,
	pub glow: Color,
	pub glow_selected: Color,
	pub ring: Color,
}

#[derive(Clone, Debug)]
pub struct LabelStyle {
	pub color: Color,
	pub selected_color: Color,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: BackgroundStyle,
	pub edge: EdgeStyle,
	pub node: NodeStyle,
	pub label: LabelStyle,
}

impl Theme {
	/// Dark blue field with mint nodes and additive links.
	pub fn spider() -> Self {
		let mint = Color::rgb(112, 255, 210);
		Self {
			background: BackgroundStyle {
				color: Color::rgb(11, 15, 20),
				glow: Color::rgb(16, 26, 39),
				glow_center: (0.35, 0.25),
				glow_inner_radius: 40.0,
			},
			edge: EdgeStyle {
				color: Color::rgb(190, 255, 235),
				composite: "lighter",
			},
			node: NodeStyle {
				fill: mint.with_alpha(0.92),
				group_fill: Color::rgba(150, 200, 255, 0.90),
				glow: mint.with_alpha(0.25),
				glow_selected: mint.with_alpha(0.45),
				ring: mint.with_alpha(0.45),
			},
			label: LabelStyle {
				color: Color::rgba(210, 230, 250, 0.82),
				selected_color: Color::rgba(220, 245, 255, 0.95),
			},
		}
	}

	/// Fill for a node: explicit color, else group color, else default.
	pub fn node_fill(&self, color: Option<&str>, group: &str) -> String {
		match color {
			Some(css) if !css.is_empty() => css.to_string(),
			_ if !group.is_empty() => self.node.group_fill.to_css(),
			_ => self.node.fill.to_css(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::spider()
	}
}
