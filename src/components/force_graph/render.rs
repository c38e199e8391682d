//! Canvas rendering for the spider graph.
//!
//! Passes, back to front:
//! 1. Background fill and radial glow (device pixels)
//! 2. Links with additive blending (world space)
//! 3. Nodes with shadow glow, then the selection ring
//! 4. Labels

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::scale::ScaledValues;
use super::state::Simulation;
use super::theme::Theme;
use super::types::GraphNode;

/// Attempt to smooth values that would otherwise cause abrupt visual changes.
fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Renders one frame.
pub fn render(sim: &Simulation, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let scale = sim.scaled();
	let t = sim.viewport.transform;

	ctx.save();
	draw_background(sim, ctx, theme);

	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);

	draw_links(sim, ctx, &scale, theme);
	draw_nodes(sim, ctx, &scale, theme);
	draw_labels(sim, ctx, &scale, theme);

	ctx.restore();
}

fn draw_background(sim: &Simulation, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	let (w, h) = sim.viewport.device_size();
	let bg = &theme.background;

	ctx.set_fill_style_str(&bg.color.to_css());
	ctx.fill_rect(0.0, 0.0, w, h);

	let (cx, cy) = (w * bg.glow_center.0, h * bg.glow_center.1);
	if let Ok(gradient) = ctx.create_radial_gradient(cx, cy, bg.glow_inner_radius, cx, cy, w.max(h)) {
		let _ = gradient.add_color_stop(0.0, &bg.glow.to_css());
		let _ = gradient.add_color_stop(1.0, &bg.color.to_css());
		#[allow(deprecated)]
		ctx.set_fill_style(&gradient);
		ctx.fill_rect(0.0, 0.0, w, h);
	}
}

fn draw_links(sim: &Simulation, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let edge = &sim.scale.edge;
	let color = theme.edge.color;

	let _ = ctx.set_global_composite_operation(theme.edge.composite);
	ctx.set_line_width(scale.edge_line_width);

	for (_, s, t) in sim.graph.resolved_links() {
		let (a, b) = (&sim.graph.nodes[s], &sim.graph.nodes[t]);
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let base = edge.alpha_for_length((dx * dx + dy * dy).sqrt());
		let lit = smooth_step(sim.highlight.edge_intensity(&a.id, &b.id));
		let alpha = base + (edge.alpha_highlight - base).max(0.0) * lit;

		ctx.set_stroke_style_str(&color.with_alpha(alpha).to_css());
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();
	}
}

/// Drawn radius and shadow blur for `node`.
fn node_look(sim: &Simulation, node: &GraphNode) -> (f64, f64) {
	let node_scale = &sim.scale.node;
	let glow = &sim.scale.glow;
	if sim.selected() == Some(node.id.as_str()) {
		return (node.radius + node_scale.selected_boost, glow.selected_blur);
	}
	let hover = smooth_step(sim.highlight.hover_intensity(&node.id));
	(
		node.radius + node_scale.hover_boost * hover,
		glow.base_blur + (glow.hovered_blur - glow.base_blur) * hover,
	)
}

fn draw_nodes(sim: &Simulation, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let style = &theme.node;
	for node in &sim.graph.nodes {
		let selected = sim.selected() == Some(node.id.as_str());
		let (radius, blur) = node_look(sim, node);

		ctx.save();
		let glow = if selected { style.glow_selected } else { style.glow };
		ctx.set_shadow_color(&glow.to_css());
		ctx.set_shadow_blur(blur);
		ctx.set_fill_style_str(&theme.node_fill(node.color.as_deref(), &node.group));
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, radius, 0.0, 2.0 * PI);
		ctx.fill();
		ctx.restore();

		if selected {
			ctx.set_stroke_style_str(&style.ring.to_css());
			ctx.set_line_width(scale.ring_width);
			ctx.begin_path();
			let _ = ctx.arc(
				node.x,
				node.y,
				radius + sim.scale.node.ring_offset,
				0.0,
				2.0 * PI,
			);
			ctx.stroke();
		}
	}
}

fn draw_labels(sim: &Simulation, ctx: &CanvasRenderingContext2d, scale: &ScaledValues, theme: &Theme) {
	let _ = ctx.set_global_composite_operation("source-over");
	ctx.set_font(&scale.label_font);
	ctx.set_text_baseline("middle");

	for node in &sim.graph.nodes {
		if node.label.is_empty() {
			continue;
		}
		let selected = sim.selected() == Some(node.id.as_str());
		let hover = smooth_step(sim.highlight.hover_intensity(&node.id));
		let alpha = if selected { 1.0 } else { scale.label_alpha.max(hover) };
		if alpha < 0.01 {
			continue;
		}

		let color = if selected {
			theme.label.selected_color
		} else {
			theme.label.color.lerp(theme.label.selected_color, hover)
		};
		let (radius, _) = node_look(sim, node);
		ctx.set_fill_style_str(&color.with_alpha(color.a * alpha).to_css());
		let _ = ctx.fill_text(&node.label, node.x + radius + scale.label_offset, node.y);
	}
}
