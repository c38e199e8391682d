//! Leptos component wrapping the spider graph canvas.
//!
//! The component creates the canvas, the toolbar, the search results and the
//! detail panel, and wires pointer/wheel handlers into an [`Interaction`]. An
//! animation loop runs via `requestAnimationFrame`: each frame ticks the
//! simulation, renders it, then drains its events into reactive signals.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Event, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent, Window,
};

use super::bridge::Command;
use super::detail::{Crumb, NodeDetail};
use super::handle::{GraphHandle, SearchHit};
use super::interaction::{Gesture, Interaction};
use super::render;
use super::state::{SimEvent, Simulation};
use super::theme::Theme;
use super::types::Point;

/// How long a toast stays up.
const TOAST_MS: u64 = 1400;

/// Reactive UI state fed by simulation events.
#[derive(Clone, Copy)]
struct UiSignals {
	panel: RwSignal<Option<NodeDetail>>,
	toast: RwSignal<Option<String>>,
	/// Bumped per toast so a stale timer cannot hide a newer one.
	toast_serial: StoredValue<u64>,
	running: RwSignal<bool>,
	results: RwSignal<Vec<SearchHit>>,
}

impl UiSignals {
	fn apply(&self, handle: &GraphHandle, events: Vec<SimEvent>) {
		for event in events {
			match event {
				SimEvent::Loaded { .. } => {
					self.results.set(Vec::new());
				}
				SimEvent::Selected(id) => self.panel.set(handle.detail(&id)),
				SimEvent::Deselected => self.panel.set(None),
				SimEvent::PinChanged { id, .. } => {
					if self.panel.with_untracked(|p| p.as_ref().is_some_and(|d| d.id == id)) {
						self.panel.set(handle.detail(&id));
					}
				}
				SimEvent::RunningChanged(running) => self.running.set(running),
				SimEvent::Toast(message) => self.show_toast(message),
			}
		}
	}

	fn show_toast(&self, message: String) {
		self.toast_serial.update_value(|n| *n += 1);
		let serial = self.toast_serial.get_value();
		self.toast.set(Some(message));
		let (toast, toast_serial) = (self.toast, self.toast_serial);
		set_timeout(
			move || {
				if toast_serial.get_value() == serial {
					toast.set(None);
				}
			},
			Duration::from_millis(TOAST_MS),
		);
	}
}

/// Canvas size in CSS pixels: the window when fullscreen, else the parent.
fn css_size(window: &Window, canvas: &HtmlCanvasElement, fullscreen: bool) -> (f64, f64) {
	if fullscreen {
		let dim = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
		return (dim(window.inner_width(), 800.0), dim(window.inner_height(), 600.0));
	}
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|(w, h)| *w > 0.0 && *h > 0.0)
		.unwrap_or((800.0, 600.0))
}

/// Sizes the backing store in device pixels and the element in CSS pixels.
fn fit_canvas(handle: &GraphHandle, canvas: &HtmlCanvasElement, w: f64, h: f64, dpr: f64) {
	let (dw, dh) = handle.with(|sim| {
		sim.resize(w, h, dpr);
		sim.viewport.device_size()
	});
	canvas.set_width(dw as u32);
	canvas.set_height(dh as u32);
	let style = web_sys::HtmlElement::style(canvas);
	let _ = style.set_property("width", &format!("{w}px"));
	let _ = style.set_property("height", &format!("{h}px"));
}

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Renders an interactive spider graph backed by `handle`.
///
/// The component sizes itself to its parent container by default; set
/// `fullscreen = true` to fill the window and follow its resizes.
#[component]
pub fn ForceGraphCanvas(
	/// Graph to draw and drive.
	handle: GraphHandle,
	/// Fill the window instead of the parent element.
	#[prop(default = false)]
	fullscreen: bool,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let interaction = Rc::new(RefCell::new(Interaction::new(
		handle.config().interaction.clone(),
	)));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	let ui = UiSignals {
		panel: RwSignal::new(None),
		toast: RwSignal::new(None),
		toast_serial: StoredValue::new(0),
		running: RwSignal::new(handle.with(|sim| sim.running())),
		results: RwSignal::new(Vec::new()),
	};
	let query = RwSignal::new(String::new());
	let stored = StoredValue::new_local(handle.clone());

	let (handle_init, animate_init, resize_cb_init) = (handle.clone(), animate.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx.dyn_into::<CanvasRenderingContext2d>(),
			_ => {
				warn!("spider-graph: canvas 2d context unavailable");
				return;
			}
		};
		let Ok(ctx) = ctx else {
			return;
		};

		let (w, h) = css_size(&window, &canvas, fullscreen);
		fit_canvas(&handle_init, &canvas, w, h, window.device_pixel_ratio());
		handle_init.fit();

		let (handle_resize, canvas_resize) = (handle_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = css_size(&win, &canvas_resize, fullscreen);
			fit_canvas(&handle_resize, &canvas_resize, nw, nh, win.device_pixel_ratio());
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let theme = Theme::default();
		let (handle_anim, animate_inner) = (handle_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let events = handle_anim.with(|sim| {
				sim.tick();
				render::render(sim, &ctx, &theme);
				sim.drain_events()
			});
			ui.apply(&handle_anim, events);

			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let (handle_pd, interaction_pd) = (handle.clone(), interaction.clone());
	let on_pointerdown = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = pointer_position(&canvas, &ev);
		let _ = canvas.set_pointer_capture(ev.pointer_id());
		let pointer = ev.pointer_id();
		handle_pd.with(|sim| interaction_pd.borrow_mut().pointer_down(sim, pointer, at));
	};

	let (handle_pm, interaction_pm) = (handle.clone(), interaction.clone());
	let on_pointermove = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = pointer_position(&canvas, &ev);
		let pointer = ev.pointer_id();
		let cursor = handle_pm.with(|sim| {
			let mut gestures = interaction_pm.borrow_mut();
			gestures.pointer_move(sim, pointer, at);
			match gestures.gesture() {
				Gesture::Idle if sim.hovered().is_some() => "pointer",
				Gesture::Idle => "grab",
				_ => "grabbing",
			}
		});
		let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
	};

	let (handle_pu, interaction_pu) = (handle.clone(), interaction.clone());
	let on_pointerup = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = pointer_position(&canvas, &ev);
		let _ = canvas.release_pointer_capture(ev.pointer_id());
		let pointer = ev.pointer_id();
		handle_pu.with(|sim| interaction_pu.borrow_mut().pointer_up(sim, pointer, at));
	};

	let (handle_pl, interaction_pl) = (handle.clone(), interaction.clone());
	let on_pointerleave = move |ev: PointerEvent| {
		let pointer = ev.pointer_id();
		handle_pl.with(|sim| interaction_pl.borrow_mut().pointer_leave(sim, pointer));
	};
	let (handle_pc, interaction_pc) = (handle.clone(), interaction.clone());
	let on_pointercancel = move |ev: PointerEvent| {
		let pointer = ev.pointer_id();
		handle_pc.with(|sim| interaction_pc.borrow_mut().pointer_leave(sim, pointer));
	};

	let (handle_wh, interaction_wh) = (handle.clone(), interaction);
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = pointer_position(&canvas, &ev);
		let delta = ev.delta_y();
		handle_wh.with(|sim| interaction_wh.borrow_mut().wheel(sim, at, delta));
	};

	let on_search = move |ev: Event| {
		let q = event_target_value(&ev);
		ui.results.set(stored.with_value(|h| h.search(&q)));
		query.set(q);
	};
	let on_fit = move |_: MouseEvent| {
		stored.with_value(|h| {
			h.fit();
			h.with(|sim| sim.toast("Fit"));
		})
	};
	let on_pause = move |_: MouseEvent| stored.with_value(|h| h.with(|sim| sim.toggle_running()));
	let on_reheat = move |_: MouseEvent| {
		stored.with_value(|h| {
			h.with(|sim| {
				sim.reheat();
				sim.toast("Reheat");
			})
		})
	};

	let results_view = move || {
		ui.results
			.get()
			.into_iter()
			.map(|hit| {
				let id = hit.id.clone();
				view! {
					<div
						class="result-item"
						on:click=move |_| {
							ui.results.set(Vec::new());
							stored.with_value(|h| {
								h.focus(&id);
							});
						}
					>
						<div class="result-title">{hit.label}</div>
						<div class="result-sub">{hit.subtitle}</div>
					</div>
				}
			})
			.collect_view()
	};

	let panel_view = move || {
		ui.panel.get().map(|detail| {
			let (crumb_label, crumb_cmd, crumb_arg) = match detail.crumb.clone() {
				Crumb::Parent { id, label } => (label, Command::Focus, id),
				Crumb::Overview => ("overview".to_string(), Command::Overview, String::new()),
			};
			let pin_id = detail.id.clone();
			let neighbors = detail
				.neighbors
				.iter()
				.cloned()
				.map(|n| {
					let id = n.id.clone();
					view! {
						<div class="panel-item" on:click=move |_| stored.with_value(|h| h.command(Command::Focus, &id))>
							<div class="panel-item-title">{n.label}</div>
							<div class="panel-item-sub">{n.subtitle}</div>
						</div>
					}
				})
				.collect_view();
			view! {
				<aside class="spider-panel">
					<div class="breadcrumbs">
						<span class="bc-item" on:click=move |_| stored.with_value(|h| h.command(crumb_cmd, &crumb_arg))>
							{crumb_label}
						</span>
					</div>
					<h2 class="panel-title">{detail.title}</h2>
					<div class="panel-sub">{detail.subtitle}</div>
					<div class="panel-actions">
						<button on:click=move |_| stored.with_value(GraphHandle::open_selected)>"Open"</button>
						<button on:click=move |_| stored.with_value(|h| {
							h.with(|sim| sim.toggle_pin(&pin_id));
						})>
							{if detail.pinned { "Unpin" } else { "Pin" }}
						</button>
						<button on:click=move |_| stored.with_value(|h| h.with(Simulation::deselect))>"Close"</button>
					</div>
					<div class="panel-degree">{format!("degree {}", detail.degree)}</div>
					<div class="panel-kids">{neighbors}</div>
					<pre class="panel-meta">{detail.body}</pre>
				</aside>
			}
		})
	};

	view! {
		<div class="spider-graph">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:pointerdown=on_pointerdown
				on:pointermove=on_pointermove
				on:pointerup=on_pointerup
				on:pointerleave=on_pointerleave
				on:pointercancel=on_pointercancel
				on:wheel=on_wheel
				style="display: block; cursor: grab; touch-action: none;"
			/>
			<div class="spider-toolbar">
				<input
					class="search"
					type="search"
					placeholder="Search nodes"
					prop:value=move || query.get()
					on:input=on_search
				/>
				<button on:click=on_fit>"Fit"</button>
				<button on:click=on_pause>{move || if ui.running.get() { "Pause" } else { "Resume" }}</button>
				<button on:click=on_reheat>"Reheat"</button>
			</div>
			<div class="search-results">{results_view}</div>
			{panel_view}
			{move || ui.toast.get().map(|message| view! { <div class="toast">{message}</div> })}
		</div>
	}
}
