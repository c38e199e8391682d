//! Errors surfaced at the embedding and bridge boundaries.
//!
//! Nothing inside the frame tick returns these; they only come back from
//! calls a host makes into the widget.

use thiserror::Error;

/// Result alias for boundary operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Failures a host call can run into.
#[derive(Error, Debug)]
pub enum GraphError {
	/// Serialized graph text could not be parsed.
	#[error("graph JSON could not be parsed: {0}")]
	Json(#[from] serde_json::Error),

	/// The parsed value was not a record with `nodes`/`links`.
	#[error("graph input is not a record")]
	NotARecord,

	/// The host bridge does not provide the named operation.
	#[error("host bridge lacks `{0}`")]
	MissingCapability(&'static str),
}
