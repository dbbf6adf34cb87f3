use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, error, info};

use super::connection_stats::ConnectionStatsView;
use super::error::{LayoutError, RenderResourceError};
use super::icons::NoticeIconCache;
use super::layout::{CancelToken, LayoutAdapter, LayoutPoll, LayoutResult, LayoutRun};
use super::node_stats::NodeStatsView;
use super::scene::{ReleasedResources, SceneElement};
use super::surface::SurfaceFactory;
use super::theme::Theme;
use super::types::{BoundingBox, GraphNode, NODE_RADIUS, Point, TrafficGraph};

/// World-space margin kept around the graph when fitting it to the view.
const FIT_PADDING: f64 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutMode {
	/// Step the layout a frame at a time from `tick`.
	#[default]
	Incremental,
	/// Lay out synchronously whenever the topology changes.
	Blocking,
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Point,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<usize>,
	pub neighbors: HashSet<usize>,
	pub highlight_t: f64,
	pub prev_node: Option<usize>,
	pub prev_neighbors: HashSet<usize>,
	delay_t: f64,
}

pub struct TrafficGraphState<F: SurfaceFactory> {
	pub graph: TrafficGraph,
	pub node_views: Vec<NodeStatsView<F::Surface>>,
	pub connection_views: Vec<ConnectionStatsView<F::Surface>>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
	pub last_layout_error: Option<LayoutError>,
	factory: F,
	theme: Rc<Theme>,
	icons: Rc<NoticeIconCache>,
	/// Node indices of each connection's source and target.
	endpoints: Vec<(Option<usize>, Option<usize>)>,
	layout: Option<LayoutRun>,
	layout_cancel: Option<CancelToken>,
	layout_mode: LayoutMode,
}

impl<F: SurfaceFactory> TrafficGraphState<F> {
	pub fn new(
		data: &TrafficGraph,
		factory: F,
		theme: Theme,
		width: f64,
		height: f64,
		layout_mode: LayoutMode,
	) -> Result<Self, RenderResourceError> {
		let icons = Rc::new(NoticeIconCache::new(&theme));
		let mut state = Self {
			graph: data.clone(),
			node_views: Vec::new(),
			connection_views: Vec::new(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			flow_time: 0.0,
			last_layout_error: None,
			factory,
			theme: Rc::new(theme),
			icons,
			endpoints: Vec::new(),
			layout: None,
			layout_cancel: None,
			layout_mode,
		};
		state.build_views()?;
		state.start_layout();
		Ok(state)
	}

	pub fn theme(&self) -> &Theme {
		&self.theme
	}

	pub fn icons(&self) -> &NoticeIconCache {
		&self.icons
	}

	pub fn layout_pending(&self) -> bool {
		self.layout.is_some()
	}

	/// Short status line for the layout, `None` once positions are applied.
	pub fn layout_status(&self) -> Option<String> {
		if self.layout_pending() {
			return Some("Laying out services".into());
		}
		self.last_layout_error
			.as_ref()
			.map(|err| format!("Layout failed: {err}"))
	}

	fn build_views(&mut self) -> Result<(), RenderResourceError> {
		for node in self.graph.nodes.iter_mut() {
			let view = NodeStatsView::new(&self.factory, node, Rc::clone(&self.theme))?;
			self.node_views.push(view);
		}
		for connection in &self.graph.connections {
			let midpoint = self.graph.connection_midpoint(connection);
			let view = ConnectionStatsView::new(
				&self.factory,
				connection,
				midpoint,
				Rc::clone(&self.theme),
				Rc::clone(&self.icons),
			)?;
			self.connection_views.push(view);
			self.endpoints.push((
				self.graph.node_index(&connection.source),
				self.graph.node_index(&connection.target),
			));
		}
		Ok(())
	}

	/// Releases every view and stops any layout in flight.
	fn teardown(&mut self) -> ReleasedResources {
		self.cancel_layout();
		let mut released = ReleasedResources::default();
		let node_views = std::mem::take(&mut self.node_views).into_iter().map(|v| v.cleanup());
		let connection_views = std::mem::take(&mut self.connection_views)
			.into_iter()
			.map(|v| v.cleanup());
		for r in node_views.chain(connection_views) {
			released.textures += r.textures;
			released.materials += r.materials;
		}
		self.endpoints.clear();
		self.hover = HoverState::default();
		self.drag = DragState::default();
		debug!(
			"Released {} textures and {} materials",
			released.textures, released.materials
		);
		released
	}

	fn cancel_layout(&mut self) {
		if let Some(token) = self.layout_cancel.take() {
			token.cancel();
		}
		self.layout = None;
	}

	fn start_layout(&mut self) {
		self.cancel_layout();
		self.last_layout_error = None;
		let dimensions = (self.width, self.height);
		match self.layout_mode {
			LayoutMode::Blocking => {
				let placed = LayoutAdapter.run(&mut self.graph, dimensions, log_placed);
				match placed {
					Ok(_) => self.layout_applied(),
					Err(err) => self.layout_failed(err),
				}
			}
			LayoutMode::Incremental => match LayoutRun::start(&self.graph, dimensions) {
				Ok(run) => {
					self.layout_cancel = Some(run.cancel_token());
					self.layout = Some(run);
				}
				Err(err) => self.layout_failed(err),
			},
		}
	}

	fn finish_layout(&mut self, result: Result<LayoutResult, LayoutError>) {
		self.layout = None;
		self.layout_cancel = None;
		match result {
			Ok(result) => {
				LayoutAdapter::apply(&mut self.graph, &result, log_placed);
				self.layout_applied();
			}
			Err(err) => self.layout_failed(err),
		}
	}

	fn layout_failed(&mut self, err: LayoutError) {
		error!("Layout failed: {err}");
		self.last_layout_error = Some(err);
	}

	/// Chooses label sides, moves every view to its entity and fits the
	/// graph into the canvas.
	fn layout_applied(&mut self) {
		let placed: Vec<Point> = self.graph.nodes.iter().filter_map(|n| n.position).collect();
		let center_x = if placed.is_empty() {
			0.0
		} else {
			placed.iter().map(|p| p.x).sum::<f64>() / placed.len() as f64
		};
		for node in self.graph.nodes.iter_mut() {
			if let Some(p) = node.position {
				node.label_position_left = p.x < center_x;
			}
		}
		for (view, node) in self.node_views.iter_mut().zip(self.graph.nodes.iter_mut()) {
			view.update_position(node);
		}
		self.update_connection_positions();
		self.fit_to_view();
		info!("Layout applied to {} nodes", placed.len());
	}

	fn update_connection_positions(&mut self) {
		for (view, connection) in self.connection_views.iter_mut().zip(&self.graph.connections) {
			if let Some(midpoint) = self.graph.connection_midpoint(connection) {
				view.update_position(midpoint);
			}
		}
	}

	/// Bounds of every placed node, labels included.
	pub fn graph_bounds(&self) -> Option<BoundingBox> {
		self.graph
			.nodes
			.iter()
			.filter(|n| n.position.is_some())
			.map(|n| n.bounding_box)
			.reduce(|a, b| a.union(&b))
	}

	pub fn fit_to_view(&mut self) {
		let Some(bounds) = self.graph_bounds() else {
			return;
		};
		let (w, h) = (
			bounds.width() + 2.0 * FIT_PADDING,
			bounds.height() + 2.0 * FIT_PADDING,
		);
		let k = (self.width / w).min(self.height / h).clamp(0.01, 2.0);
		let (cx, cy) = (
			(bounds.left + bounds.right) / 2.0,
			(bounds.top + bounds.bottom) / 2.0,
		);
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * k,
			y: self.height / 2.0 - cy * k,
			k,
		};
	}

	/// Takes a new snapshot. Metric-only changes refresh the views in place;
	/// topology changes rebuild them and restart the layout.
	pub fn update_data(&mut self, data: &TrafficGraph) -> Result<(), RenderResourceError> {
		if self.graph.same_topology(data) {
			for (node, fresh) in self.graph.nodes.iter_mut().zip(&data.nodes) {
				node.display_name = fresh.display_name.clone();
				node.metrics = fresh.metrics.clone();
				node.metadata = fresh.metadata.clone();
			}
			for (connection, fresh) in self.graph.connections.iter_mut().zip(&data.connections) {
				connection.volume = fresh.volume.clone();
				connection.metadata = fresh.metadata.clone();
			}
			self.refresh_views();
			return Ok(());
		}

		info!("Graph topology changed, rebuilding views");
		self.teardown();
		self.graph = data.clone();
		self.build_views()?;
		self.start_layout();
		Ok(())
	}

	fn refresh_views(&mut self) {
		for (view, node) in self.node_views.iter_mut().zip(self.graph.nodes.iter_mut()) {
			view.refresh(node);
		}
		for (view, connection) in self.connection_views.iter_mut().zip(&self.graph.connections) {
			view.refresh(connection);
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Node whose circle or label lies under the screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let point = Point::new(gx, gy);
		let placed = || {
			self.graph
				.nodes
				.iter()
				.enumerate()
				.filter_map(|(idx, node)| Some((idx, node, node.position?)))
		};
		// Circles win over labels that overlap them.
		placed()
			.filter(|(_, _, p)| (p.x - gx).hypot(p.y - gy) < NODE_RADIUS)
			.map(|(idx, _, _)| idx)
			.last()
			.or_else(|| {
				placed()
					.filter(|(idx, _, _)| {
						self.node_views
							.get(*idx)
							.is_some_and(|view| view.bounding_box().contains(point))
					})
					.map(|(idx, _, _)| idx)
					.last()
			})
	}

	/// Moves a node and everything attached to it.
	pub fn move_node(&mut self, idx: usize, position: Point) {
		let Some(node) = self.graph.nodes.get_mut(idx) else {
			return;
		};
		node.update_position(position);
		if let Some(view) = self.node_views.get_mut(idx) {
			view.update_position(node);
		}
		for (c, &(src, tgt)) in self.endpoints.iter().enumerate() {
			if src != Some(idx) && tgt != Some(idx) {
				continue;
			}
			let midpoint = self.graph.connection_midpoint(&self.graph.connections[c]);
			if let (Some(view), Some(midpoint)) = (self.connection_views.get_mut(c), midpoint) {
				view.update_position(midpoint);
			}
		}
	}

	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors.extend(self.graph.neighbors_of(idx));
		}
		self.sync_highlights();
	}

	/// Redraws the labels whose highlight flag changed with the hover.
	fn sync_highlights(&mut self) {
		let node_wants: Vec<bool> = (0..self.node_views.len())
			.map(|idx| self.is_highlighted(idx))
			.collect();
		let connection_wants: Vec<bool> = (0..self.connection_views.len())
			.map(|c| self.connection_highlighted(c))
			.collect();
		let nodes = self.node_views.iter_mut().zip(self.graph.nodes.iter_mut());
		for ((view, node), want) in nodes.zip(node_wants) {
			if view.highlighted() != want {
				view.set_highlight(want);
				view.refresh(node);
			}
		}
		let connections = self.connection_views.iter_mut().zip(&self.graph.connections);
		for ((view, connection), want) in connections.zip(connection_wants) {
			if view.highlighted() != want {
				view.set_highlight(want);
				view.refresh(connection);
			}
		}
	}

	pub fn is_highlighted(&self, idx: usize) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: usize) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Connections touching the hovered node, or the one fading out.
	pub fn connection_highlighted(&self, c: usize) -> bool {
		let Some(focus) = self.hover.node.or(self.hover.prev_node) else {
			return false;
		};
		self.endpoints
			.get(c)
			.is_some_and(|&(src, tgt)| src == Some(focus) || tgt == Some(focus))
	}

	pub fn tick(&mut self, dt: f64) {
		if let Some(run) = self.layout.as_mut() {
			if let LayoutPoll::Ready(result) = run.poll_frame() {
				self.finish_layout(result);
			}
		}
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 && self.hover.prev_node.is_some() {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
				self.sync_highlights();
			}
		}
		self.apply_opacity();
	}

	/// Fades labels of entities outside the current highlight.
	fn apply_opacity(&mut self) {
		let dimmed = 1.0 - 0.7 * ease_out_cubic(self.hover.highlight_t);
		let active = self.has_active_highlight();
		let node_opacity: Vec<f64> = (0..self.node_views.len())
			.map(|idx| if active && !self.is_highlighted(idx) { dimmed } else { 1.0 })
			.collect();
		let connection_opacity: Vec<f64> = (0..self.connection_views.len())
			.map(|c| if active && !self.connection_highlighted(c) { dimmed } else { 1.0 })
			.collect();
		for (view, opacity) in self.node_views.iter_mut().zip(node_opacity) {
			view.set_opacity(opacity);
		}
		for (view, opacity) in self.connection_views.iter_mut().zip(connection_opacity) {
			view.set_opacity(opacity);
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn log_placed(node: &GraphNode) {
	debug!("Placed {} at {:?}", node.name, node.position);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::traffic_graph::surface::fake::FakeFactory;
	use crate::components::traffic_graph::types::{Connection, Metrics, Volume};
	use test_log::test;

	fn shop() -> TrafficGraph {
		let node = |name: &str, requests: f64| GraphNode {
			metrics: Some(Metrics {
				request_count: Some(requests),
				error_count: Some(1.0),
				response_time: Some(12.5),
			}),
			..GraphNode::new(name)
		};
		let conn = |s: &str, t: &str| Connection {
			volume: Volume {
				normal: Some(10.0),
				danger: Some(1.0),
			},
			..Connection::new(s, t)
		};
		TrafficGraph {
			nodes: vec![
				node("edge", 100.0),
				node("api", 80.0),
				node("cart", 20.0),
				node("db", 60.0),
			],
			connections: vec![conn("edge", "api"), conn("api", "cart"), conn("api", "db")],
		}
	}

	fn blocking(data: &TrafficGraph) -> TrafficGraphState<FakeFactory> {
		TrafficGraphState::new(
			data,
			FakeFactory::default(),
			Theme::default(),
			1200.0,
			800.0,
			LayoutMode::Blocking,
		)
		.unwrap()
	}

	#[test]
	fn blocking_layout_places_nodes_and_labels() {
		let state = blocking(&shop());
		assert_eq!(state.node_views.len(), 4);
		assert_eq!(state.connection_views.len(), 3);
		assert!(!state.layout_pending());
		assert_eq!(state.last_layout_error, None);
		for (node, view) in state.graph.nodes.iter().zip(&state.node_views) {
			assert!(node.position.is_some());
			let label = view.bounding_box();
			assert_eq!(node.bounding_box, node.circle_bounds().union(&label));
			if node.label_position_left {
				assert!(label.right < node.circle_bounds().left);
			} else {
				assert!(label.left > node.circle_bounds().right);
			}
		}
		let c = &state.graph.connections[0];
		let midpoint = state.graph.connection_midpoint(c).unwrap();
		assert_eq!(
			state.connection_views[0].container().position,
			(midpoint.x, midpoint.y, 1.0)
		);
	}

	#[test]
	fn incremental_layout_finishes_through_ticks() {
		let mut state = TrafficGraphState::new(
			&shop(),
			FakeFactory::default(),
			Theme::default(),
			1200.0,
			800.0,
			LayoutMode::Incremental,
		)
		.unwrap();
		assert!(state.layout_pending());
		assert!(state.graph.nodes.iter().all(|n| n.position.is_none()));
		for _ in 0..1000 {
			if !state.layout_pending() {
				break;
			}
			state.tick(0.016);
		}
		assert!(!state.layout_pending());
		assert!(state.graph.nodes.iter().all(|n| n.position.is_some()));
	}

	#[test]
	fn fit_keeps_graph_inside_canvas() {
		let state = blocking(&shop());
		let bounds = state.graph_bounds().unwrap();
		let t = &state.transform;
		assert!(t.k > 0.0);
		assert!(bounds.left * t.k + t.x >= 0.0);
		assert!(bounds.right * t.k + t.x <= state.width);
		assert!(bounds.top * t.k + t.y >= 0.0);
		assert!(bounds.bottom * t.k + t.y <= state.height);
	}

	#[test]
	fn metric_update_refreshes_in_place() {
		let data = shop();
		let mut state = blocking(&data);
		let before: Vec<_> = state.graph.nodes.iter().map(|n| n.position).collect();
		let created = state.factory.created.get();

		let mut fresh = data.clone();
		fresh.nodes[1].metrics.as_mut().unwrap().request_count = Some(999.0);
		fresh.connections[0].volume.normal = Some(5.0);
		state.update_data(&fresh).unwrap();

		assert_eq!(state.factory.created.get(), created);
		let after: Vec<_> = state.graph.nodes.iter().map(|n| n.position).collect();
		assert_eq!(before, after);
		assert_eq!(state.node_views[1].label_state().lines[0], "Requests: 1000");
		assert_eq!(
			state.connection_views[0].label_state().lines[0],
			"6 Requests, 1 Errors"
		);
	}

	#[test]
	fn topology_change_rebuilds_views() {
		let mut state = blocking(&shop());
		let mut fresh = shop();
		fresh.nodes.push(GraphNode::new("cache"));
		fresh.connections.push(Connection::new("api", "cache"));

		assert_eq!(
			state.teardown(),
			ReleasedResources {
				textures: 7,
				materials: 7
			}
		);
		state.update_data(&fresh).unwrap();
		assert_eq!(state.node_views.len(), 5);
		assert_eq!(state.connection_views.len(), 4);
		assert!(state.graph.nodes.iter().all(|n| n.position.is_some()));
	}

	#[test]
	fn relayout_cancels_run_in_flight() {
		let mut state = TrafficGraphState::new(
			&shop(),
			FakeFactory::default(),
			Theme::default(),
			1200.0,
			800.0,
			LayoutMode::Incremental,
		)
		.unwrap();
		let first = state.layout_cancel.clone().unwrap();
		let mut fresh = shop();
		fresh.nodes.pop();
		state.update_data(&fresh).unwrap();
		assert!(first.is_cancelled());
		assert!(state.layout_pending());
	}

	#[test]
	fn hover_highlights_node_neighbors_and_connections() {
		let mut state = blocking(&shop());
		state.set_hover(Some(0));
		assert!(state.node_views[0].highlighted());
		assert!(state.node_views[1].highlighted());
		assert!(!state.node_views[2].highlighted());
		assert!(state.connection_views[0].highlighted());
		assert!(!state.connection_views[1].highlighted());
		assert!(state.connection_highlighted(0));

		// Highlights stay on while fading out, then clear together.
		state.set_hover(None);
		assert!(state.node_views[0].highlighted());
		assert!(state.is_hovered(0));
		for _ in 0..600 {
			state.tick(0.016);
		}
		assert!(!state.is_hovered(0));
		assert!(state.node_views.iter().all(|v| !v.highlighted()));
		assert!(state.connection_views.iter().all(|v| !v.highlighted()));
	}

	#[test]
	fn edge_between_neighbors_fades_with_its_badge() {
		let triangle = TrafficGraph {
			nodes: ["edge", "api", "cart"].map(GraphNode::new).to_vec(),
			connections: vec![
				Connection::new("edge", "api"),
				Connection::new("api", "cart"),
				Connection::new("edge", "cart"),
			],
		};
		let mut state = blocking(&triangle);
		state.set_hover(Some(1));
		for _ in 0..60 {
			state.tick(0.016);
		}
		assert!(state.node_views.iter().all(|v| v.highlighted()));
		for c in 0..3 {
			let view = &state.connection_views[c];
			assert_eq!(view.highlighted(), state.connection_highlighted(c));
			assert_eq!(view.material().opacity == 1.0, state.connection_highlighted(c));
		}
		assert!(!state.connection_highlighted(2));
		assert!(state.connection_views[2].material().opacity < 1.0);
	}

	#[test]
	fn unrelated_labels_fade_while_hovering() {
		let mut state = blocking(&shop());
		state.set_hover(Some(0));
		for _ in 0..60 {
			state.tick(0.016);
		}
		assert_eq!(state.node_views[0].material().opacity, 1.0);
		assert!(state.node_views[3].material().opacity < 1.0);
		assert!(state.connection_views[2].material().opacity < 1.0);

		state.set_hover(None);
		for _ in 0..600 {
			state.tick(0.016);
		}
		assert!(!state.has_active_highlight());
		assert!(state.node_views.iter().all(|v| v.material().opacity == 1.0));
	}

	#[test]
	fn finds_node_under_cursor() {
		let state = blocking(&shop());
		let p = state.graph.nodes[2].position.unwrap();
		let t = &state.transform;
		let (sx, sy) = (p.x * t.k + t.x, p.y * t.k + t.y);
		assert_eq!(state.node_at_position(sx, sy), Some(2));
		assert_eq!(state.node_at_position(-10_000.0, -10_000.0), None);
	}

	#[test]
	fn moving_a_node_drags_its_label_and_badges() {
		let mut state = blocking(&shop());
		state.move_node(1, Point::new(5000.0, 5000.0));
		let node = &state.graph.nodes[1];
		assert!(node.bounding_box.contains(Point::new(5000.0, 5000.0)));
		assert!(state.node_views[1].bounding_box().top > 4000.0);
		for c in 0..3 {
			let midpoint = state.graph.connection_midpoint(&state.graph.connections[c]).unwrap();
			assert_eq!(
				state.connection_views[c].container().position,
				(midpoint.x, midpoint.y, 1.0)
			);
		}
	}

	#[test]
	fn surface_failure_propagates() {
		let result = TrafficGraphState::new(
			&shop(),
			FakeFactory::failing(),
			Theme::default(),
			100.0,
			100.0,
			LayoutMode::Blocking,
		);
		assert_eq!(result.err(), Some(RenderResourceError::ContextUnavailable));
	}

	#[test]
	fn duplicate_nodes_record_layout_error() {
		let mut data = shop();
		data.nodes.push(GraphNode::new("db"));
		let state = blocking(&data);
		assert_eq!(
			state.last_layout_error,
			Some(LayoutError::DuplicateNode("db".into()))
		);
		assert_eq!(
			state.layout_status().as_deref(),
			Some("Layout failed: duplicate node name \"db\"")
		);
	}

	#[test]
	fn status_tracks_incremental_layout() {
		let mut state = TrafficGraphState::new(
			&shop(),
			FakeFactory::default(),
			Theme::default(),
			1200.0,
			800.0,
			LayoutMode::Incremental,
		)
		.unwrap();
		assert_eq!(state.layout_status().as_deref(), Some("Laying out services"));
		while state.layout_pending() {
			state.tick(0.016);
		}
		assert_eq!(state.layout_status(), None);
	}
}
