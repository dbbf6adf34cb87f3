use thiserror::Error;

/// Failures of a layout run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
	/// Two nodes share the same name, so positions cannot be mapped back.
	#[error("duplicate node name {0:?}")]
	DuplicateNode(String),

	/// The simulation diverged for the given node.
	#[error("layout produced a non-finite position for node {0:?}")]
	NonFinitePosition(String),

	/// The run was cancelled through its token before it settled.
	#[error("layout run was cancelled")]
	Cancelled,

	/// The run did not settle within the given number of frames.
	#[error("layout did not settle within {0} frames")]
	TimedOut(u32),
}

/// Failures allocating drawing surfaces for label textures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderResourceError {
	#[error("no window available")]
	NoWindow,

	#[error("no document available")]
	NoDocument,

	#[error("failed to create canvas element: {0}")]
	CreateCanvas(String),

	#[error("2d rendering context unavailable")]
	ContextUnavailable,

	#[error("failed to create image element: {0}")]
	CreateImage(String),
}
