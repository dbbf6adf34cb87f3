use serde::{Deserialize, Serialize};

/// Radius of a service node in world units.
pub const NODE_RADIUS: f64 = 40.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn midpoint(self, other: Point) -> Point {
		Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
	}
}

/// Axis-aligned bounds in world units; `top` is the smaller y.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
	pub left: f64,
	pub right: f64,
	pub top: f64,
	pub bottom: f64,
}

impl BoundingBox {
	pub fn around(center: Point, half_width: f64, half_height: f64) -> Self {
		Self {
			left: center.x - half_width,
			right: center.x + half_width,
			top: center.y - half_height,
			bottom: center.y + half_height,
		}
	}

	pub fn union(&self, other: &BoundingBox) -> BoundingBox {
		BoundingBox {
			left: self.left.min(other.left),
			right: self.right.max(other.right),
			top: self.top.min(other.top),
			bottom: self.bottom.max(other.bottom),
		}
	}

	pub fn width(&self) -> f64 {
		self.right - self.left
	}

	pub fn height(&self) -> f64 {
		self.bottom - self.top
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
	}
}

/// Live request metrics of a node. Absent fields are unknown, not zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
	#[serde(default)]
	pub request_count: Option<f64>,
	#[serde(default)]
	pub error_count: Option<f64>,
	#[serde(default)]
	pub response_time: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
	Service,
	Node,
	#[default]
	Default,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentMapping {
	pub app: String,
	#[serde(default)]
	pub service: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
	#[serde(default)]
	pub component_mapping: Vec<ComponentMapping>,
	#[serde(default)]
	pub aggregation: Aggregation,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	pub name: String,
	#[serde(default)]
	pub display_name: Option<String>,
	#[serde(default)]
	pub metrics: Option<Metrics>,
	#[serde(default)]
	pub metadata: Option<NodeMetadata>,
	/// `None` until the layout has placed the node.
	#[serde(skip)]
	pub position: Option<Point>,
	/// Circle bounds unioned with the current label bounds.
	#[serde(skip)]
	pub bounding_box: BoundingBox,
	#[serde(skip)]
	pub label_position_left: bool,
}

impl GraphNode {
	#[cfg(test)]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn display_name(&self) -> &str {
		self.display_name.as_deref().unwrap_or(&self.name)
	}

	/// Bounds of the node circle alone, ignoring its label.
	pub fn circle_bounds(&self) -> BoundingBox {
		BoundingBox::around(self.position.unwrap_or_default(), NODE_RADIUS, NODE_RADIUS)
	}

	/// Moves the node. Label views must re-run their own position update
	/// afterwards to fold the label back into `bounding_box`.
	pub fn update_position(&mut self, position: Point) {
		self.position = Some(position);
		self.bounding_box = self.circle_bounds();
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
	#[serde(default)]
	pub normal: Option<f64>,
	#[serde(default)]
	pub danger: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
	#[serde(default)]
	pub connection_time: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
	pub name: String,
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub volume: Volume,
	#[serde(default)]
	pub metadata: ConnectionMetadata,
}

impl Connection {
	#[cfg(test)]
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		let (source, target) = (source.into(), target.into());
		Self {
			name: format!("{source}--{target}"),
			source,
			target,
			..Default::default()
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficGraph {
	pub nodes: Vec<GraphNode>,
	#[serde(default)]
	pub connections: Vec<Connection>,
}

impl TrafficGraph {
	pub fn node_index(&self, name: &str) -> Option<usize> {
		self.nodes.iter().position(|n| n.name == name)
	}

	pub fn node(&self, name: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.name == name)
	}

	pub fn node_mut(&mut self, name: &str) -> Option<&mut GraphNode> {
		self.nodes.iter_mut().find(|n| n.name == name)
	}

	/// Midpoint between both endpoints, once both have been placed.
	pub fn connection_midpoint(&self, connection: &Connection) -> Option<Point> {
		let source = self.node(&connection.source)?.position?;
		let target = self.node(&connection.target)?.position?;
		Some(source.midpoint(target))
	}

	/// Indices of nodes sharing a connection with `idx`.
	pub fn neighbors_of(&self, idx: usize) -> Vec<usize> {
		let Some(name) = self.nodes.get(idx).map(|n| n.name.as_str()) else {
			return Vec::new();
		};
		let mut neighbors: Vec<usize> = self
			.connections
			.iter()
			.filter_map(|c| {
				if c.source == name {
					self.node_index(&c.target)
				} else if c.target == name {
					self.node_index(&c.source)
				} else {
					None
				}
			})
			.filter(|&n| n != idx)
			.collect();
		neighbors.sort_unstable();
		neighbors.dedup();
		neighbors
	}

	/// True when both graphs have the same nodes and connections in the same
	/// order, ignoring metrics.
	pub fn same_topology(&self, other: &TrafficGraph) -> bool {
		self.nodes.len() == other.nodes.len()
			&& self.connections.len() == other.connections.len()
			&& self.nodes.iter().zip(&other.nodes).all(|(a, b)| a.name == b.name)
			&& self.connections.iter().zip(&other.connections).all(|(a, b)| {
				a.name == b.name && a.source == b.source && a.target == b.target
			})
	}
}
