//! Pan/zoom transform between screen and world coordinates.
//!
//! Screen coordinates here are device pixels (CSS pixels × device pixel
//! ratio), matching the canvas backing store. Pointer events arrive in CSS
//! pixels and go through [`Viewport::to_device`] first.

use serde::Deserialize;

use super::graph::Bounds;
use super::types::{Point, positive_or};

/// Zoom limits and motion constants. Zoom values are CSS-relative and get
/// multiplied by the device pixel ratio.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
	pub min_zoom: f64,
	pub max_zoom: f64,
	/// Fit-to-screen never zooms in past this, so tiny graphs stay small.
	pub fit_max_zoom: f64,
	/// Zoom factor per wheel notch.
	pub wheel_step: f64,
	/// Fit-to-screen padding in CSS pixels.
	pub fit_padding: f64,
	/// Length of the focus animation.
	pub focus_frames: u32,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			min_zoom: 0.20,
			max_zoom: 5.0,
			fit_max_zoom: 2.4,
			wheel_step: 1.12,
			fit_padding: 70.0,
			focus_frames: 16,
		}
	}
}

impl ViewportConfig {
	/// Replaces values the transform math cannot use. Non-positive or
	/// non-finite values fall back to defaults and an inverted zoom range is
	/// swapped.
	pub fn sanitized(self) -> Self {
		let d = Self::default();
		let lo = positive_or(self.min_zoom, d.min_zoom);
		let hi = positive_or(self.max_zoom, d.max_zoom);
		Self {
			min_zoom: lo.min(hi),
			max_zoom: lo.max(hi),
			fit_max_zoom: positive_or(self.fit_max_zoom, d.fit_max_zoom),
			wheel_step: positive_or(self.wheel_step, d.wheel_step),
			fit_padding: if self.fit_padding.is_finite() {
				self.fit_padding.max(0.0)
			} else {
				d.fit_padding
			},
			focus_frames: self.focus_frames.max(1),
		}
	}
}

/// Translation plus uniform scale, in device pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor. Within the configured clamp, except that a fit on a
	/// canvas too small for the minimum zoom goes below it.
	pub k: f64,
}

impl Default for Transform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Frame-driven eased pan toward a target translation.
#[derive(Clone, Copy, Debug)]
struct PanAnimation {
	from: Point,
	to: Point,
	frame: u32,
	frames: u32,
}

fn ease_out_cubic(t: f64) -> f64 {
	let t = t.clamp(0.0, 1.0);
	1.0 - (1.0 - t).powi(3)
}

/// The view onto the world plus the canvas it maps into.
#[derive(Clone, Debug)]
pub struct Viewport {
	pub transform: Transform,
	pub config: ViewportConfig,
	dpr: f64,
	width: f64,
	height: f64,
	animation: Option<PanAnimation>,
}

impl Viewport {
	/// `width`/`height` are CSS pixels.
	pub fn new(config: ViewportConfig, width: f64, height: f64, dpr: f64) -> Self {
		let mut viewport = Self {
			transform: Transform::default(),
			config: config.sanitized(),
			dpr: 1.0,
			width: 0.0,
			height: 0.0,
			animation: None,
		};
		viewport.resize(width, height, dpr);
		viewport.transform.x = viewport.width / 2.0;
		viewport.transform.y = viewport.height / 2.0;
		viewport.transform.k = viewport.dpr.clamp(viewport.min_k(), viewport.max_k());
		viewport
	}

	/// Updates the canvas size (CSS pixels). The ratio is clamped to `1..=2`.
	pub fn resize(&mut self, width: f64, height: f64, dpr: f64) {
		self.dpr = if dpr.is_finite() { dpr.clamp(1.0, 2.0) } else { 1.0 };
		self.width = (width.max(0.0) * self.dpr).floor();
		self.height = (height.max(0.0) * self.dpr).floor();
		self.transform.k = self.clamp_zoom(self.transform.k);
	}

	pub fn dpr(&self) -> f64 {
		self.dpr
	}

	/// Canvas size in device pixels.
	pub fn device_size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	pub fn min_k(&self) -> f64 {
		self.config.min_zoom * self.dpr
	}

	pub fn max_k(&self) -> f64 {
		self.config.max_zoom * self.dpr
	}

	/// Clamps `k` to the zoom range. A current zoom below the range (from
	/// fitting a tiny canvas) is allowed to stay, so zooming out from it never
	/// jumps inward.
	fn clamp_zoom(&self, k: f64) -> f64 {
		let floor = self.min_k().min(self.transform.k);
		if k.is_finite() {
			k.clamp(floor, self.max_k())
		} else {
			floor
		}
	}

	pub fn to_device(&self, css: Point) -> Point {
		Point::new(css.x * self.dpr, css.y * self.dpr)
	}

	pub fn screen_to_world(&self, screen: Point) -> Point {
		let t = self.transform;
		Point::new((screen.x - t.x) / t.k, (screen.y - t.y) / t.k)
	}

	pub fn world_to_screen(&self, world: Point) -> Point {
		let t = self.transform;
		Point::new(world.x * t.k + t.x, world.y * t.k + t.y)
	}

	/// World point under a CSS-pixel pointer position.
	pub fn pointer_to_world(&self, css: Point) -> Point {
		self.screen_to_world(self.to_device(css))
	}

	/// Scales by `factor` keeping the world point under `anchor` in place.
	pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
		let before = self.screen_to_world(anchor);
		self.transform.k = self.clamp_zoom(self.transform.k * factor);
		let after = self.world_to_screen(before);
		self.transform.x += anchor.x - after.x;
		self.transform.y += anchor.y - after.y;
	}

	/// One wheel notch at a CSS-pixel position. Only the sign of `delta_y`
	/// matters; scrolling down zooms out.
	pub fn wheel(&mut self, css: Point, delta_y: f64) {
		if delta_y == 0.0 || !delta_y.is_finite() {
			return;
		}
		let factor = self.config.wheel_step.powf(-delta_y.signum());
		self.zoom_at(self.to_device(css), factor);
	}

	/// Places the translation at `origin` moved by a CSS-pixel delta.
	pub fn pan_from(&mut self, origin: Point, css_delta: Point) {
		self.transform.x = origin.x + css_delta.x * self.dpr;
		self.transform.y = origin.y + css_delta.y * self.dpr;
	}

	pub fn translation(&self) -> Point {
		Point::new(self.transform.x, self.transform.y)
	}

	/// Scales and centers so `bounds` fits inside the canvas minus padding.
	pub fn fit(&mut self, bounds: Option<Bounds>) {
		let Some(bounds) = bounds else {
			return;
		};
		let pad = self.config.fit_padding * self.dpr;
		let gw = bounds.width().max(1.0);
		let gh = bounds.height().max(1.0);
		// Containment wins over the minimum zoom.
		let k = ((self.width - pad) / gw)
			.min((self.height - pad) / gh)
			.min(self.config.fit_max_zoom * self.dpr)
			.min(self.max_k());
		let k = if k.is_finite() && k > 0.0 { k } else { self.min_k() };

		let center = bounds.center();
		self.animation = None;
		self.transform = Transform {
			x: self.width * 0.5 - center.x * k,
			y: self.height * 0.5 - center.y * k,
			k,
		};
	}

	/// Starts an eased pan that ends with `world` at the canvas center.
	/// Replaces any animation already running.
	pub fn animate_to(&mut self, world: Point) {
		let k = self.transform.k;
		self.animation = Some(PanAnimation {
			from: self.translation(),
			to: Point::new(
				self.width * 0.5 - world.x * k,
				self.height * 0.5 - world.y * k,
			),
			frame: 0,
			frames: self.config.focus_frames.max(1),
		});
	}

	/// Advances the running animation by one frame.
	pub fn advance(&mut self) {
		let Some(anim) = self.animation.as_mut() else {
			return;
		};
		anim.frame += 1;
		let ease = ease_out_cubic(anim.frame as f64 / anim.frames as f64);
		self.transform.x = anim.from.x + (anim.to.x - anim.from.x) * ease;
		self.transform.y = anim.from.y + (anim.to.y - anim.from.y) * ease;
		if anim.frame >= anim.frames {
			self.animation = None;
		}
	}
}
