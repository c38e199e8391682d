//! Zoom-dependent scaling for graph visuals and hit-testing.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: node positions. Sizes here grow on screen when zooming in.
//! - **Screen-space**: CSS pixels on the canvas. Multiplied by the device
//!   pixel ratio before use, then divided by the zoom so the canvas transform
//!   cancels out and the element keeps a fixed on-screen size.
//!
//! Zoom thresholds (label fade) are CSS-relative: `k / dpr`.

/// Label opacity as a function of CSS-relative zoom: zero at or below
/// `zero_alpha_k`, full at or above `full_alpha_k`.
#[derive(Clone, Debug)]
pub struct ZoomFade {
	pub zero_alpha_k: f64,
	pub full_alpha_k: f64,
}

impl ZoomFade {
	pub fn apply(&self, k: f64) -> f64 {
		if self.zero_alpha_k >= self.full_alpha_k {
			return if k >= self.full_alpha_k { 1.0 } else { 0.0 };
		}
		((k - self.zero_alpha_k) / (self.full_alpha_k - self.zero_alpha_k)).clamp(0.0, 1.0)
	}
}

/// Node sizing and hit-testing.
#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Extra pick tolerance around a node's radius, in CSS pixels.
	pub hit_slop: f64,
	/// Radius added to a hovered node, world units.
	pub hover_boost: f64,
	/// Radius added to the selected node, world units.
	pub selected_boost: f64,
	/// Gap between the selected node and its ring, world units.
	pub ring_offset: f64,
	/// Selection ring stroke in CSS pixels.
	pub ring_width: f64,
}

/// Label sizing and visibility.
#[derive(Clone, Debug)]
pub struct LabelScaleConfig {
	/// Font size in CSS pixels.
	pub size: f64,
	/// Gap between node edge and label in CSS pixels.
	pub offset: f64,
	/// Visibility of labels for nodes that are neither hovered nor selected.
	pub visibility: ZoomFade,
}

/// Link stroke and opacity.
#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	/// Line width in CSS pixels.
	pub line_width: f64,
	/// Opacity bounds; shorter links are more opaque.
	pub alpha_min: f64,
	pub alpha_max: f64,
	/// Opacity of links inside the hovered neighborhood at full highlight.
	pub alpha_highlight: f64,
	/// `alpha = falloff / (length + falloff_offset) * falloff_scale`.
	pub falloff: f64,
	pub falloff_offset: f64,
	pub falloff_scale: f64,
}

impl EdgeScaleConfig {
	/// Opacity for a link of world length `length`.
	pub fn alpha_for_length(&self, length: f64) -> f64 {
		(self.falloff / (length + self.falloff_offset) * self.falloff_scale)
			.clamp(self.alpha_min, self.alpha_max)
	}
}

/// Shadow blur per node state, in device pixels.
#[derive(Clone, Debug)]
pub struct GlowScaleConfig {
	pub base_blur: f64,
	pub hovered_blur: f64,
	pub selected_blur: f64,
}

/// Complete scale configuration for all graph elements.
#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub label: LabelScaleConfig,
	pub edge: EdgeScaleConfig,
	pub glow: GlowScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				hit_slop: 10.0,
				hover_boost: 2.0,
				selected_boost: 3.0,
				ring_offset: 6.0,
				ring_width: 1.2,
			},
			label: LabelScaleConfig {
				size: 12.0,
				offset: 8.0,
				visibility: ZoomFade {
					zero_alpha_k: 1.25,
					full_alpha_k: 1.5,
				},
			},
			edge: EdgeScaleConfig {
				line_width: 1.0,
				alpha_min: 0.02,
				alpha_max: 0.22,
				alpha_highlight: 0.45,
				falloff: 140.0,
				falloff_offset: 40.0,
				falloff_scale: 0.18,
			},
			glow: GlowScaleConfig {
				base_blur: 8.0,
				hovered_blur: 10.0,
				selected_blur: 14.0,
			},
		}
	}
}

/// Pre-computed values for one zoom level and pixel ratio.
///
/// Create this once per frame and pass it to rendering functions.
/// All sizes are world-space (ready to use after the canvas transform).
#[derive(Clone, Debug)]
pub struct ScaledValues {
	/// Pick tolerance in world units.
	pub hit_slop: f64,
	/// Label font, e.g. `"12px ui-sans-serif, system-ui"`.
	pub label_font: String,
	pub label_offset: f64,
	/// Opacity multiplier for ordinary labels.
	pub label_alpha: f64,
	pub edge_line_width: f64,
	pub ring_width: f64,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64, dpr: f64) -> Self {
		let px = |css: f64| css * dpr / k;
		Self {
			hit_slop: px(config.node.hit_slop),
			label_font: format!("{}px ui-sans-serif, system-ui", px(config.label.size)),
			label_offset: px(config.label.offset),
			label_alpha: config.label.visibility.apply(k / dpr),
			edge_line_width: px(config.edge.line_width),
			ring_width: px(config.node.ring_width),
		}
	}
}
