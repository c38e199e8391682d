//! Force-directed spider graph.
//!
//! Renders an interactive node-link graph on an HTML canvas with:
//! - A grid-accelerated force simulation that cools down over time
//! - Pan, zoom, node dragging, pinning and search
//! - Smooth highlight transitions on hover
//! - An optional host bridge for graph data, commands and node detail
//!
//! # Example
//!
//! ```ignore
//! use spider_graph::{ForceGraphCanvas, GraphConfig, GraphHandle};
//!
//! let handle = GraphHandle::new(GraphConfig::default());
//! handle.set_data(&serde_json::json!({
//!     "nodes": [{ "id": "a", "label": "Node A" }, { "id": "b" }],
//!     "links": [{ "source": "a", "target": "b" }],
//! }));
//!
//! view! { <ForceGraphCanvas handle=handle fullscreen=true /> }
//! ```

mod bridge;
mod component;
mod detail;
mod graph;
mod grid;
mod handle;
mod interaction;
mod physics;
mod pick;
mod render;
mod scale;
mod state;
mod theme;
mod types;
mod viewport;

pub use bridge::{Channel, Command, HostBridge, Subscription};
pub use component::ForceGraphCanvas;
pub use handle::{GraphHandle, SearchHit};
pub use state::GraphConfig;
pub use types::{GraphData, GraphLink, GraphNode};
