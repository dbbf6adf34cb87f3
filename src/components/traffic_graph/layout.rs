use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::rc::Rc;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info, warn};

use super::error::LayoutError;
use super::types::{GraphNode, Point, TrafficGraph};

/// Layout units are multiplied by this before they become world positions.
pub const OUTPUT_SCALE: f64 = 8.0;

const STEP_DT: f32 = 0.016;

/// Fixed simulation constants for every layout run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutProfile {
	pub repulsion: f32,
	pub elasticity: f32,
	pub max_force: f32,
	pub node_speed: f32,
	pub damping: f32,
	pub node_mass: f32,
	/// Lower bound for the radius nodes are seeded on.
	pub ideal_edge_length: f64,
	/// Pull towards the origin, per unit of simulated time.
	pub gravity: f64,
	pub max_iterations: u32,
	/// Scales the step size, shrinking by `cooling_factor` every iteration.
	pub initial_temperature: f64,
	pub cooling_factor: f64,
	/// Node pairs the charge pass may visit per frame; sets iterations per frame.
	pub pair_budget_per_frame: usize,
	pub max_iterations_per_frame: u32,
	pub max_frames: u32,
}

pub const LAYOUT_PROFILE: LayoutProfile = LayoutProfile {
	repulsion: 150.0,
	elasticity: 0.05,
	max_force: 100.0,
	node_speed: 3000.0,
	damping: 0.9,
	node_mass: 10.0,
	ideal_edge_length: 50.0,
	gravity: 0.25,
	max_iterations: 2500,
	initial_temperature: 1.0,
	cooling_factor: 0.995,
	pair_budget_per_frame: 60_000,
	max_iterations_per_frame: 50,
	max_frames: 600,
};

/// Engine input: one element per node, one per connection.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutElement {
	Node {
		id: String,
	},
	Edge {
		id: String,
		source: String,
		target: String,
	},
}

pub fn layout_elements(graph: &TrafficGraph) -> Vec<LayoutElement> {
	let nodes = graph.nodes.iter().map(|n| LayoutElement::Node { id: n.name.clone() });
	let edges = graph.connections.iter().map(|c| LayoutElement::Edge {
		id: c.name.clone(),
		source: c.source.clone(),
		target: c.target.clone(),
	});
	nodes.chain(edges).collect()
}

/// Raw engine coordinates per node, in graph order. Not yet scaled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
	pub positions: Vec<(String, Point)>,
	pub iterations: u32,
}

/// Shared flag that stops a run at its next poll.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
	pub fn cancel(&self) {
		self.0.set(true);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.get()
	}
}

#[derive(Debug, PartialEq)]
pub enum LayoutPoll {
	Pending,
	Ready(Result<LayoutResult, LayoutError>),
}

/// One in-flight layout computation, advanced a frame at a time.
pub struct LayoutRun {
	graph: ForceGraph<usize, ()>,
	names: Vec<String>,
	profile: LayoutProfile,
	iteration: u32,
	iterations_per_frame: u32,
	frames: u32,
	temperature: f64,
	cancel: CancelToken,
}

/// Deterministic jitter in [0, 1), so runs are reproducible.
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Charge forces cost one visit per node pair, so larger graphs get fewer
/// iterations per frame and may run out of frames.
fn iterations_per_frame(profile: &LayoutProfile, nodes: usize) -> u32 {
	let pairs = nodes.saturating_mul(nodes).max(1);
	let fits = (profile.pair_budget_per_frame / pairs).max(1);
	fits.min(profile.max_iterations_per_frame as usize) as u32
}

impl LayoutRun {
	pub fn start(graph: &TrafficGraph, dimensions: (f64, f64)) -> Result<Self, LayoutError> {
		let profile = LAYOUT_PROFILE;
		let mut seen = HashSet::new();
		if let Some(dup) = graph.nodes.iter().find(|n| !seen.insert(n.name.as_str())) {
			return Err(LayoutError::DuplicateNode(dup.name.clone()));
		}

		let mut force_graph = ForceGraph::new(SimulationParameters {
			force_charge: profile.repulsion,
			force_spring: profile.elasticity,
			force_max: profile.max_force,
			node_speed: profile.node_speed,
			damping_factor: profile.damping,
		});
		let count = graph.nodes.len().max(1) as f64;
		let spread = (dimensions.0.min(dimensions.1) / (2.0 * OUTPUT_SCALE))
			.max(profile.ideal_edge_length);

		let elements = layout_elements(graph);
		let mut names = Vec::with_capacity(graph.nodes.len());
		let mut indices = HashMap::new();
		let mut skipped = 0usize;
		for element in &elements {
			match element {
				LayoutElement::Node { id } => {
					let i = names.len();
					let angle = (i as f64) * 2.0 * PI / count;
					let radius = spread * (0.75 + 0.5 * rand_simple(i));
					let idx = force_graph.add_node(NodeData {
						x: (radius * angle.cos()) as f32,
						y: (radius * angle.sin()) as f32,
						mass: profile.node_mass,
						is_anchor: false,
						user_data: i,
					});
					indices.insert(id.as_str(), idx);
					names.push(id.clone());
				}
				LayoutElement::Edge { id, source, target } => {
					match (indices.get(source.as_str()), indices.get(target.as_str())) {
						(Some(&src), Some(&tgt)) if src != tgt => {
							force_graph.add_edge(src, tgt, EdgeData::default());
						}
						(Some(_), Some(_)) => {
							debug!("Skipping self-loop connection {id}");
							skipped += 1;
						}
						_ => {
							warn!("Skipping connection {id}: unknown endpoint {source} -> {target}");
							skipped += 1;
						}
					}
				}
			}
		}

		let iterations_per_frame = iterations_per_frame(&profile, names.len());
		info!(
			"Starting layout of {} nodes, {} connections ({} skipped), {} iterations per frame",
			names.len(),
			graph.connections.len() - skipped,
			skipped,
			iterations_per_frame
		);
		Ok(Self {
			graph: force_graph,
			names,
			profile,
			iteration: 0,
			iterations_per_frame,
			frames: 0,
			temperature: profile.initial_temperature,
			cancel: CancelToken::default(),
		})
	}

	pub fn cancel_token(&self) -> CancelToken {
		self.cancel.clone()
	}

	/// Runs one frame worth of iterations.
	pub fn poll_frame(&mut self) -> LayoutPoll {
		if self.cancel.is_cancelled() {
			info!("Layout cancelled after {} iterations", self.iteration);
			return LayoutPoll::Ready(Err(LayoutError::Cancelled));
		}
		self.frames += 1;
		for _ in 0..self.iterations_per_frame {
			if self.settled() {
				break;
			}
			self.step();
		}
		if self.settled() {
			debug!(
				"Layout settled after {} iterations, {} frames",
				self.iteration, self.frames
			);
			return LayoutPoll::Ready(self.collect());
		}
		if self.frames >= self.profile.max_frames {
			warn!(
				"Layout timed out after {} frames, {} of {} iterations",
				self.frames, self.iteration, self.profile.max_iterations
			);
			return LayoutPoll::Ready(Err(LayoutError::TimedOut(self.profile.max_frames)));
		}
		LayoutPoll::Pending
	}

	pub fn run_to_completion(mut self) -> Result<LayoutResult, LayoutError> {
		loop {
			if let LayoutPoll::Ready(result) = self.poll_frame() {
				return result;
			}
		}
	}

	fn settled(&self) -> bool {
		self.iteration >= self.profile.max_iterations
	}

	fn step(&mut self) {
		let dt = STEP_DT * self.temperature as f32;
		self.graph.update(dt);
		let pull = (self.profile.gravity * dt as f64) as f32;
		self.graph.visit_nodes_mut(|node| {
			node.data.x -= node.data.x * pull;
			node.data.y -= node.data.y * pull;
		});
		self.temperature *= self.profile.cooling_factor;
		self.iteration += 1;
	}

	fn collect(&self) -> Result<LayoutResult, LayoutError> {
		let mut raw = vec![None; self.names.len()];
		self.graph.visit_nodes(|node| {
			if let Some(slot) = raw.get_mut(node.data.user_data) {
				*slot = Some(Point::new(node.x() as f64, node.y() as f64));
			}
		});

		let mut positions = Vec::with_capacity(raw.len());
		for (name, point) in self.names.iter().zip(raw) {
			let point = point
				.filter(|p| p.x.is_finite() && p.y.is_finite())
				.ok_or_else(|| LayoutError::NonFinitePosition(name.clone()))?;
			positions.push((name.clone(), point));
		}
		Ok(LayoutResult {
			positions,
			iterations: self.iteration,
		})
	}
}

/// Blocking entry point: lays out a graph and writes positions back.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayoutAdapter;

impl LayoutAdapter {
	/// `on_node_placed` fires once per node, right after its position is
	/// written. The whole layout is complete when this returns `Ok`.
	pub fn run<F>(
		&self,
		graph: &mut TrafficGraph,
		dimensions: (f64, f64),
		on_node_placed: F,
	) -> Result<LayoutResult, LayoutError>
	where
		F: FnMut(&GraphNode),
	{
		let result = LayoutRun::start(graph, dimensions)?.run_to_completion()?;
		Self::apply(graph, &result, on_node_placed);
		Ok(result)
	}

	/// Scales raw positions by `OUTPUT_SCALE` and moves each node there.
	pub fn apply<F>(graph: &mut TrafficGraph, result: &LayoutResult, mut on_node_placed: F)
	where
		F: FnMut(&GraphNode),
	{
		for (name, raw) in &result.positions {
			if let Some(node) = graph.node_mut(name) {
				node.update_position(Point::new(raw.x * OUTPUT_SCALE, raw.y * OUTPUT_SCALE));
				on_node_placed(node);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::traffic_graph::types::Connection;
	use test_log::test;

	fn mesh(n: usize) -> TrafficGraph {
		TrafficGraph {
			nodes: (0..n).map(|i| GraphNode::new(format!("svc-{i}"))).collect(),
			connections: (1..n)
				.map(|i| Connection::new(format!("svc-{}", i / 2), format!("svc-{i}")))
				.collect(),
		}
	}

	#[test]
	fn elements_list_nodes_then_edges() {
		let graph = mesh(3);
		let elements = layout_elements(&graph);
		assert_eq!(elements.len(), 5);
		assert_eq!(elements[0], LayoutElement::Node { id: "svc-0".into() });
		assert_eq!(
			elements[4],
			LayoutElement::Edge {
				id: "svc-1--svc-2".into(),
				source: "svc-1".into(),
				target: "svc-2".into(),
			}
		);
	}

	#[test]
	fn places_every_node_exactly_once() {
		let mut graph = mesh(6);
		let mut placed = Vec::new();
		let result = LayoutAdapter
			.run(&mut graph, (800.0, 600.0), |node| placed.push(node.name.clone()))
			.unwrap();

		let names: Vec<String> = graph.nodes.iter().map(|n| n.name.clone()).collect();
		assert_eq!(placed, names);
		assert_eq!(result.positions.len(), 6);
		assert!(result.iterations > 0);
		for node in &graph.nodes {
			let p = node.position.expect("every node is placed");
			assert!(p.x.is_finite() && p.y.is_finite());
		}
	}

	#[test]
	fn applies_output_scale() {
		let mut graph = mesh(2);
		let result = LayoutResult {
			positions: vec![
				("svc-0".into(), Point::new(1.0, -2.0)),
				("svc-1".into(), Point::new(0.5, 0.0)),
				("gone".into(), Point::new(9.0, 9.0)),
			],
			iterations: 1,
		};
		let mut calls = 0;
		LayoutAdapter::apply(&mut graph, &result, |_| calls += 1);
		assert_eq!(calls, 2);
		assert_eq!(graph.nodes[0].position, Some(Point::new(8.0, -16.0)));
		assert_eq!(graph.nodes[1].position, Some(Point::new(4.0, 0.0)));
	}

	#[test]
	fn nodes_end_up_apart() {
		let mut graph = mesh(2);
		LayoutAdapter.run(&mut graph, (800.0, 600.0), |_| {}).unwrap();
		let (a, b) = (graph.nodes[0].position.unwrap(), graph.nodes[1].position.unwrap());
		assert!((a.x - b.x).hypot(a.y - b.y) > 1.0);
	}

	#[test]
	fn runs_are_deterministic() {
		let graph = mesh(5);
		let a = LayoutRun::start(&graph, (800.0, 600.0)).unwrap().run_to_completion();
		let b = LayoutRun::start(&graph, (800.0, 600.0)).unwrap().run_to_completion();
		assert_eq!(a, b);
	}

	#[test]
	fn empty_graph_completes_without_callbacks() {
		let mut graph = TrafficGraph::default();
		let mut calls = 0;
		let result = LayoutAdapter.run(&mut graph, (100.0, 100.0), |_| calls += 1).unwrap();
		assert!(result.positions.is_empty());
		assert_eq!(calls, 0);
	}

	#[test]
	fn skips_dangling_and_self_connections() {
		let mut graph = mesh(3);
		graph.connections.push(Connection::new("svc-0", "nowhere"));
		graph.connections.push(Connection::new("svc-2", "svc-2"));
		let result = LayoutAdapter.run(&mut graph, (800.0, 600.0), |_| {}).unwrap();
		assert_eq!(result.positions.len(), 3);
	}

	#[test]
	fn duplicate_names_are_rejected() {
		let mut graph = mesh(2);
		graph.nodes.push(GraphNode::new("svc-1"));
		assert_eq!(
			LayoutRun::start(&graph, (800.0, 600.0)).err(),
			Some(LayoutError::DuplicateNode("svc-1".into()))
		);
	}

	#[test]
	fn cancelled_run_reports_cancellation() {
		let mut run = LayoutRun::start(&mesh(4), (800.0, 600.0)).unwrap();
		assert_eq!(run.poll_frame(), LayoutPoll::Pending);
		run.cancel_token().cancel();
		assert_eq!(run.poll_frame(), LayoutPoll::Ready(Err(LayoutError::Cancelled)));
	}

	#[test]
	fn small_graphs_run_every_iteration() {
		let result = LayoutRun::start(&mesh(10), (800.0, 600.0))
			.unwrap()
			.run_to_completion()
			.unwrap();
		assert_eq!(result.iterations, LAYOUT_PROFILE.max_iterations);
	}

	#[test]
	fn frame_work_shrinks_with_graph_size() {
		assert_eq!(iterations_per_frame(&LAYOUT_PROFILE, 0), 50);
		assert_eq!(iterations_per_frame(&LAYOUT_PROFILE, 10), 50);
		assert_eq!(iterations_per_frame(&LAYOUT_PROFILE, 60), 16);
		assert_eq!(iterations_per_frame(&LAYOUT_PROFILE, 110), 4);
		assert_eq!(iterations_per_frame(&LAYOUT_PROFILE, 1000), 1);
	}

	#[test]
	fn large_graph_runs_out_of_frames() {
		// 4 iterations per frame need 625 frames for the full schedule.
		let mut run = LayoutRun::start(&mesh(110), (800.0, 600.0)).unwrap();
		let mut frames = 0;
		let outcome = loop {
			frames += 1;
			if let LayoutPoll::Ready(result) = run.poll_frame() {
				break result;
			}
		};
		assert_eq!(outcome, Err(LayoutError::TimedOut(LAYOUT_PROFILE.max_frames)));
		assert_eq!(frames, LAYOUT_PROFILE.max_frames);
	}
}
