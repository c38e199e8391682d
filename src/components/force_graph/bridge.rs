//! Host application bridge.
//!
//! Every host operation is an independently optional field of [`HostBridge`];
//! callers see missing capabilities in the type rather than probing at call
//! time. Host notifications arrive through [`Channel`]s and are consumed via
//! [`Subscription`] handles.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use log::{debug, info, warn};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::types::GraphNode;
use crate::error::{GraphError, Result};

/// Named navigation commands understood by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
	/// Select a node and center it.
	Focus,
	/// Leave the current node for the whole-graph view.
	Overview,
	/// Step back in the host's navigation history.
	Back,
	/// Step forward in the host's navigation history.
	Forward,
	/// Go to the parent of the current node.
	Up,
	/// Fit the graph into view.
	Fit,
	/// Expand or collapse the node's children.
	ToggleExpand,
	/// Replace the graph with the node's subgraph.
	DrillDown,
	/// Pin or unpin the node.
	PinToggle,
}

impl Command {
	/// Every command, in wire order.
	pub const ALL: [Command; 9] = [
		Command::Focus,
		Command::Overview,
		Command::Back,
		Command::Forward,
		Command::Up,
		Command::Fit,
		Command::ToggleExpand,
		Command::DrillDown,
		Command::PinToggle,
	];

	/// Wire name sent to the host.
	pub fn as_str(self) -> &'static str {
		match self {
			Command::Focus => "focus",
			Command::Overview => "overview",
			Command::Back => "back",
			Command::Forward => "forward",
			Command::Up => "up",
			Command::Fit => "fit",
			Command::ToggleExpand => "toggleExpand",
			Command::DrillDown => "drillDown",
			Command::PinToggle => "pinToggle",
		}
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Command {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Command::ALL
			.into_iter()
			.find(|c| c.as_str() == s)
			.ok_or_else(|| format!("unknown command {s:?}"))
	}
}

type Subscriber<T> = Rc<dyn Fn(&T)>;

struct ChannelInner<T> {
	next_id: u64,
	subscribers: Vec<(u64, Subscriber<T>)>,
}

/// Single-threaded publish/subscribe channel.
pub struct Channel<T> {
	inner: Rc<RefCell<ChannelInner<T>>>,
}

impl<T> Default for Channel<T> {
	fn default() -> Self {
		Self {
			inner: Rc::new(RefCell::new(ChannelInner {
				next_id: 0,
				subscribers: Vec::new(),
			})),
		}
	}
}

impl<T> Clone for Channel<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: 'static> Channel<T> {
	/// Registers `callback`. It stays registered until the returned handle is
	/// dropped or unsubscribed, unless the handle is detached.
	pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
		let id = {
			let mut inner = self.inner.borrow_mut();
			let id = inner.next_id;
			inner.next_id += 1;
			inner.subscribers.push((id, Rc::new(callback)));
			id
		};
		let weak: Weak<RefCell<ChannelInner<T>>> = Rc::downgrade(&self.inner);
		Subscription {
			cancel: Some(Box::new(move || {
				if let Some(inner) = weak.upgrade() {
					inner.borrow_mut().subscribers.retain(|(sid, _)| *sid != id);
				}
			})),
		}
	}

	/// Delivers `value` to every current subscriber. Subscribers may
	/// subscribe or unsubscribe while being called.
	pub fn publish(&self, value: &T) {
		let snapshot: Vec<Subscriber<T>> = self
			.inner
			.borrow()
			.subscribers
			.iter()
			.map(|(_, s)| s.clone())
			.collect();
		for subscriber in snapshot {
			subscriber(value);
		}
	}

	/// Number of live registrations.
	pub fn subscriber_count(&self) -> usize {
		self.inner.borrow().subscribers.len()
	}
}

/// Handle to a channel registration.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
	cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Removes the callback now.
	pub fn unsubscribe(self) {
		drop(self);
	}

	/// Keeps the callback registered for the channel's whole lifetime.
	pub fn detach(mut self) {
		self.cancel = None;
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

type Query = Box<dyn Fn() -> Option<String>>;
type IdQuery = Box<dyn Fn(&str) -> Option<String>>;
type IdAction = Box<dyn Fn(&str)>;
type CommandAction = Box<dyn Fn(Command, &str)>;

/// Operations and notifications a host may provide.
#[derive(Default)]
pub struct HostBridge {
	/// Current graph as serialized JSON.
	pub graph_json: Option<Query>,
	/// Asks the host to publish its graph on `graph_replaced`.
	pub request_graph: Option<Box<dyn Fn()>>,
	/// Forwards a navigation command and its argument.
	pub send_command: Option<CommandAction>,
	/// Opens a node by id in the host.
	pub open_node: Option<IdAction>,
	/// Fallback for hosts that open by path instead of id.
	pub open_path: Option<IdAction>,
	/// Extended node detail as serialized JSON.
	pub node_detail_json: Option<IdQuery>,
	/// Published by the host with serialized graph JSON.
	pub graph_replaced: Channel<String>,
	/// Published by the host with a node id.
	pub selection_changed: Channel<String>,
}

impl HostBridge {
	/// Forwards `command` to the host.
	pub fn send(&self, command: Command, arg: &str) -> Result<()> {
		let send = self
			.send_command
			.as_ref()
			.ok_or(GraphError::MissingCapability("sendCommand"))?;
		send(command, arg);
		Ok(())
	}

	/// Opens a node by id, or by path if the host only supports that.
	pub fn open(&self, node: &GraphNode) -> Result<()> {
		if let Some(open) = &self.open_node {
			open(&node.id);
			return Ok(());
		}
		match &self.open_path {
			Some(open) if !node.path.is_empty() => {
				open(&node.path);
				Ok(())
			}
			_ => Err(GraphError::MissingCapability("openNode")),
		}
	}

	/// Extended detail for `id`; `None` if unsupported, empty or unparsable.
	pub fn node_detail(&self, id: &str) -> Option<Value> {
		let json = (self.node_detail_json.as_ref()?)(id)?;
		if json.is_empty() {
			return None;
		}
		serde_json::from_str(&json)
			.inspect_err(|e| debug!("spider-graph: node detail for {id:?} unparsable: {e}"))
			.ok()
	}

	/// Current graph JSON from the host, if it offers one.
	pub fn initial_graph(&self) -> Option<String> {
		(self.graph_json.as_ref()?)().filter(|s| !s.is_empty())
	}

	/// Whether the host can open nodes at all.
	pub fn can_open(&self) -> bool {
		self.open_node.is_some() || self.open_path.is_some()
	}
}

/// Signals a host object may expose for graph replacement.
const GRAPH_SIGNALS: [&str; 5] = [
	"graphJson",
	"graphJsonChanged",
	"graphReady",
	"graphUpdated",
	"graphChanged",
];

fn js_function(obj: &JsValue, name: &str) -> Option<js_sys::Function> {
	js_sys::Reflect::get(obj, &JsValue::from_str(name))
		.ok()?
		.dyn_into::<js_sys::Function>()
		.ok()
}

/// Strings pass through, anything else is JSON-stringified.
fn js_to_json(value: &JsValue) -> Option<String> {
	if let Some(s) = value.as_string() {
		return Some(s);
	}
	if value.is_null() || value.is_undefined() {
		return None;
	}
	js_sys::JSON::stringify(value).ok()?.as_string()
}

fn log_js_error(op: &str, err: JsValue) {
	warn!("spider-graph: host {} failed: {:?}", op, err);
}

/// Connects `obj[signal].connect(...)` to `channel`, if present.
fn connect_signal(obj: &JsValue, signal: &str, channel: &Channel<String>) -> bool {
	let Ok(sig) = js_sys::Reflect::get(obj, &JsValue::from_str(signal)) else {
		return false;
	};
	let Some(connect) = js_function(&sig, "connect") else {
		return false;
	};
	let channel = channel.clone();
	let handler = Closure::<dyn Fn(JsValue)>::new(move |payload: JsValue| {
		if let Some(text) = js_to_json(&payload) {
			channel.publish(&text);
		}
	});
	let connected = connect.call1(&sig, handler.as_ref().unchecked_ref()).is_ok();
	// The host keeps the callback for the page's lifetime.
	handler.forget();
	connected
}

impl HostBridge {
	/// Wraps a host-provided JS object, keeping whichever operations exist.
	pub fn from_js(obj: JsValue) -> Self {
		let mut bridge = HostBridge::default();

		if let Some(f) = js_function(&obj, "getGraphJson") {
			let this = obj.clone();
			bridge.graph_json = Some(Box::new(move || {
				f.call0(&this)
					.map_err(|e| log_js_error("getGraphJson", e))
					.ok()
					.and_then(|v| js_to_json(&v))
			}));
		}
		if let Some(f) = js_function(&obj, "requestGraph") {
			let this = obj.clone();
			bridge.request_graph = Some(Box::new(move || {
				let _ = f.call0(&this).map_err(|e| log_js_error("requestGraph", e));
			}));
		}
		if let Some(f) = js_function(&obj, "sendCommand") {
			let this = obj.clone();
			bridge.send_command = Some(Box::new(move |cmd, arg| {
				let _ = f
					.call2(&this, &JsValue::from_str(cmd.as_str()), &JsValue::from_str(arg))
					.map_err(|e| log_js_error("sendCommand", e));
			}));
		}
		for (name, slot) in [
			("openNode", &mut bridge.open_node),
			("openPath", &mut bridge.open_path),
		] {
			if let Some(f) = js_function(&obj, name) {
				let this = obj.clone();
				*slot = Some(Box::new(move |arg: &str| {
					let _ = f
						.call1(&this, &JsValue::from_str(arg))
						.map_err(|e| log_js_error(name, e));
				}));
			}
		}
		if let Some(f) = js_function(&obj, "requestNodeDetailJson") {
			let this = obj.clone();
			bridge.node_detail_json = Some(Box::new(move |id: &str| {
				f.call1(&this, &JsValue::from_str(id))
					.map_err(|e| log_js_error("requestNodeDetailJson", e))
					.ok()
					.and_then(|v| js_to_json(&v))
			}));
		}

		let signals = GRAPH_SIGNALS
			.iter()
			.filter(|s| connect_signal(&obj, s, &bridge.graph_replaced))
			.count();
		let selection = connect_signal(&obj, "selectedNodeChanged", &bridge.selection_changed);

		info!(
			"spider-graph: bridge attached (graph query: {}, commands: {}, open: {}, detail: {}, graph signals: {}, selection signal: {})",
			bridge.graph_json.is_some(),
			bridge.send_command.is_some(),
			bridge.can_open(),
			bridge.node_detail_json.is_some(),
			signals,
			selection,
		);
		bridge
	}
}
