//! Label text rules and the canvas sizing helpers shared by node labels and
//! connection badges.

use super::surface::DrawingSurface;
use super::theme::Theme;
use super::types::{Aggregation, Connection, GraphNode};

pub const FONT_SIZE: f64 = 18.0;
pub const LINE_SPACING: f64 = FONT_SIZE / 4.0;
/// Horizontal room around node label text, split evenly left and right.
pub const NODE_LABEL_PADDING: f64 = 8.0;
pub const BADGE_PADDING_X: f64 = 16.0;
pub const BADGE_PADDING_Y: f64 = 10.0;

pub fn label_font(theme: &Theme) -> String {
	format!("{}px '{}', sans-serif", FONT_SIZE, theme.font_family)
}

/// Absent metrics read as -1 so every "is it known" check is a `>= 0.0`.
/// Negative zero is folded into zero so it never prints as "-0".
fn or_unknown(value: Option<f64>) -> f64 {
	value.map_or(-1.0, |v| v + 0.0)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeLabelText {
	pub lines: Vec<String>,
	/// First line names the owning app and gets the highlight color.
	pub show_parent: bool,
}

pub fn node_label_text(node: &GraphNode) -> NodeLabelText {
	let metrics = node.metrics.as_ref();
	let request_count = or_unknown(metrics.and_then(|m| m.request_count));
	let error_count = or_unknown(metrics.and_then(|m| m.error_count));
	let response_time = or_unknown(metrics.and_then(|m| m.response_time));

	let mut lines = Vec::new();
	if request_count >= 0.0 {
		let total = if error_count >= 0.0 {
			request_count + error_count
		} else {
			request_count
		};
		lines.push(format!("Requests: {total}"));
	}
	if error_count >= 0.0 {
		lines.push(format!("Errors: {error_count}"));
	}
	if response_time >= 0.0 {
		lines.push(format!("Avg. Resp. Time: {} ms", response_time.floor()));
	}

	let mut show_parent = false;
	if let Some(meta) = &node.metadata {
		if let Some(mapping) = meta.component_mapping.first() {
			let parent = match meta.aggregation {
				Aggregation::Service => Some(mapping.app.clone()),
				Aggregation::Node => Some(format!("{}[{}]", mapping.app, mapping.service)),
				Aggregation::Default => None,
			};
			if let Some(parent) = parent {
				lines.insert(0, parent);
				show_parent = true;
			}
		}
	}

	NodeLabelText { lines, show_parent }
}

pub fn connection_badge_text(connection: &Connection) -> String {
	let connection_time = or_unknown(connection.metadata.connection_time).floor();
	let errors = or_unknown(connection.volume.danger);
	let requests = match connection.volume.normal {
		Some(normal) => normal + connection.volume.danger.unwrap_or(0.0) + 0.0,
		None => -1.0,
	};

	let mut parts = Vec::new();
	if connection_time >= 0.0 {
		parts.push(format!("{connection_time} ms"));
	}
	if requests >= 0.0 {
		parts.push(format!("{requests} Requests"));
	}
	if errors >= 0.0 {
		parts.push(format!("{errors} Errors"));
	}
	parts.join(", ")
}

pub fn measure_lines<S: DrawingSurface>(surface: &S, lines: &[String]) -> Vec<f64> {
	lines.iter().map(|l| surface.measure_text(l)).collect()
}

/// Height of `line_count` lines stacked with `LINE_SPACING` between them.
pub fn stacked_height(line_count: usize) -> f64 {
	if line_count == 0 {
		return 0.0;
	}
	let n = line_count as f64;
	FONT_SIZE * n + LINE_SPACING * (n - 1.0)
}

/// Vertical center of line `idx` within a stacked block.
pub fn line_center(idx: usize) -> f64 {
	FONT_SIZE / 2.0 + (FONT_SIZE + LINE_SPACING) * idx as f64
}
