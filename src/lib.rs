//! spider-graph: interactive force-directed graph for embedding in a host page.
//!
//! This crate provides a WASM-based canvas component that renders a node-link
//! graph with a cooling force layout, pan/zoom, search, selection, dragging and
//! pinning. Graph data comes from the page, from a host bridge object, or from
//! scripts calling `window.SDDAI_GRAPH`.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlScriptElement, Window};

pub mod components;
pub mod error;

pub use components::force_graph::{
	Channel, Command, ForceGraphCanvas, GraphConfig, GraphData, GraphHandle, GraphLink, GraphNode,
	HostBridge, SearchHit, Subscription,
};
pub use error::GraphError;

/// Global the embedding API is installed under.
const API_GLOBAL: &str = "SDDAI_GRAPH";
/// Global a host may set to a bridge object before the app mounts.
const BRIDGE_GLOBAL: &str = "SDDAI_BRIDGE";

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("spider-graph: logging initialized");
}

/// Text of the `<script>` element with the given id.
fn script_text(id: &str) -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok().filter(|t| !t.trim().is_empty())
}

/// Overrides from `<script id="graph-config">`, else defaults.
fn load_config() -> GraphConfig {
	let Some(text) = script_text("graph-config") else {
		return GraphConfig::default();
	};
	let parsed: GraphConfig = match serde_json::from_str(&text) {
		Ok(config) => config,
		Err(e) => {
			warn!("spider-graph: ignoring bad graph config: {}", e);
			return GraphConfig::default();
		}
	};
	let config = parsed.clone().sanitized();
	if config != parsed {
		warn!("spider-graph: graph config had out-of-range values, repaired");
	}
	config
}

/// Graph record from `<script id="graph-data">`.
fn load_graph_data() -> Option<Value> {
	let text = script_text("graph-data")?;
	match serde_json::from_str::<Value>(&text) {
		Ok(data) if data.is_object() => Some(data),
		Ok(_) => {
			warn!("spider-graph: graph data is not an object");
			None
		}
		Err(e) => {
			warn!("spider-graph: failed to parse graph data: {}", e);
			None
		}
	}
}

/// Shown when the page supplies nothing.
fn demo_graph() -> Value {
	json!({
		"nodes": [
			{ "id": "A", "label": "Demo A" },
			{ "id": "B", "label": "Demo B" },
			{ "id": "C", "label": "Demo C" },
		],
		"links": [
			{ "source": "A", "target": "B" },
			{ "source": "A", "target": "C" },
		],
	})
}

/// Embedding API exposed to page scripts as `window.SDDAI_GRAPH`.
#[wasm_bindgen]
pub struct GraphApi {
	handle: GraphHandle,
}

#[wasm_bindgen]
impl GraphApi {
	/// Replaces the graph with a plain JS object.
	#[wasm_bindgen(js_name = setData)]
	pub fn set_data(&self, data: JsValue) -> std::result::Result<(), JsError> {
		let json = js_sys::JSON::stringify(&data)
			.ok()
			.and_then(|s| s.as_string())
			.ok_or_else(|| JsError::new("graph data is not serializable"))?;
		self.set_json(&json)
	}

	/// Replaces the graph with serialized JSON.
	#[wasm_bindgen(js_name = setJson)]
	pub fn set_json(&self, json: &str) -> std::result::Result<(), JsError> {
		self.handle
			.set_json(json)
			.map_err(|e| JsError::new(&e.to_string()))
	}

	/// Selects a node and pans to it. Returns whether it exists.
	pub fn focus(&self, id: &str) -> bool {
		self.handle.focus(id)
	}

	/// Fits the whole graph into view.
	pub fn fit(&self) {
		self.handle.fit();
	}

	/// Connects a host bridge object.
	#[wasm_bindgen(js_name = attachBridge)]
	pub fn attach_bridge(&self, bridge: JsValue) {
		self.handle.attach_bridge(HostBridge::from_js(bridge));
	}
}

fn install_api(window: &Window, handle: &GraphHandle) {
	let api = JsValue::from(GraphApi {
		handle: handle.clone(),
	});
	if js_sys::Reflect::set(window, &JsValue::from_str(API_GLOBAL), &api).is_err() {
		warn!("spider-graph: could not install window.{}", API_GLOBAL);
	}
}

fn host_bridge(window: &Window) -> Option<JsValue> {
	js_sys::Reflect::get(window, &JsValue::from_str(BRIDGE_GLOBAL))
		.ok()
		.filter(JsValue::is_object)
}

/// Main application component.
/// Loads configuration and graph data from the DOM, connects a host bridge if
/// one is present, and renders the graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let handle = GraphHandle::new(load_config());
	handle.set_data(&load_graph_data().unwrap_or_else(demo_graph));

	if let Some(window) = web_sys::window() {
		install_api(&window, &handle);
		if let Some(bridge) = host_bridge(&window) {
			handle.attach_bridge(HostBridge::from_js(bridge));
		}
	}

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Spider Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraphCanvas handle=handle fullscreen=true />
			<div class="graph-overlay">
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
			</div>
		</div>
	}
}
