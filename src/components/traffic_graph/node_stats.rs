use std::rc::Rc;

use super::error::RenderResourceError;
use super::scene::{Container, Material, PlaneMesh, ReleasedResources, SceneElement, Texture};
use super::surface::{DrawingSurface, SurfaceFactory, TextAlign};
use super::text::{
	FONT_SIZE, LINE_SPACING, NODE_LABEL_PADDING, NodeLabelText, label_font, line_center,
	measure_lines, node_label_text, stacked_height,
};
use super::theme::Theme;
use super::types::{BoundingBox, GraphNode, NODE_RADIUS};

/// Gap between the node circle and the label center offset.
const LABEL_SPACING: f64 = 12.0;

/// Snapshot of what a label view currently shows.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelState {
	pub lines: Vec<String>,
	pub label_width: f64,
	pub canvas_width: f64,
	pub canvas_height: f64,
	pub highlight: bool,
	pub show_parent: bool,
	pub opacity: f64,
}

/// Multi-line metrics label floating beside a node.
pub struct NodeStatsView<S: DrawingSurface> {
	surface: S,
	texture: Texture,
	material: Material,
	container: Container,
	theme: Rc<Theme>,
	radius: f64,
	/// Distance kept between the node circle and the label bounds.
	buffer: f64,
	label_width: f64,
	lines: Vec<String>,
	show_parent: bool,
	highlight: bool,
	bounding_box: BoundingBox,
}

impl<S: DrawingSurface> NodeStatsView<S> {
	pub fn new<F>(factory: &F, node: &mut GraphNode, theme: Rc<Theme>) -> Result<Self, RenderResourceError>
	where
		F: SurfaceFactory<Surface = S>,
	{
		let radius = NODE_RADIUS;
		let surface = factory.create(200.0, FONT_SIZE * 3.0 + 10.0)?;
		let mut view = Self {
			surface,
			texture: Texture::new(),
			material: Material::transparent(),
			container: Container::default(),
			theme,
			radius,
			buffer: (radius * 0.3).max(7.0),
			label_width: 0.0,
			lines: Vec::new(),
			show_parent: false,
			highlight: false,
			bounding_box: BoundingBox::default(),
		};
		view.update_label(node);
		let mesh = PlaneMesh::new(view.surface.width(), view.surface.height());
		view.add_child_element(mesh);
		Ok(view)
	}

	/// Recomputes the text from the node's metrics, resizes the surface to
	/// fit it and redraws.
	pub fn update_label(&mut self, node: &mut GraphNode) {
		let NodeLabelText { lines, show_parent } = node_label_text(node);
		let theme = Rc::clone(&self.theme);

		self.surface.set_font(&label_font(&theme));
		let widths = measure_lines(&self.surface, &lines);
		let max_width = widths.iter().copied().fold(0.0, f64::max);
		self.label_width = max_width + NODE_LABEL_PADDING;
		self.surface.resize(self.label_width, stacked_height(lines.len()));

		self.surface.clear();
		let band = if self.highlight {
			&theme.highlight_background
		} else {
			&theme.background_dark
		};
		for (idx, (text, width)) in lines.iter().zip(&widths).enumerate() {
			let top = (FONT_SIZE + LINE_SPACING) * idx as f64;
			self.surface
				.fill_rect(band, 0.0, top, width + NODE_LABEL_PADDING, FONT_SIZE);
			let color = if idx == 0 && show_parent {
				&theme.traffic.warning
			} else {
				&theme.traffic.normal
			};
			self.surface.fill_text(
				text,
				color,
				TextAlign::Left,
				NODE_LABEL_PADDING / 2.0,
				line_center(idx),
			);
		}
		self.texture.mark_dirty();

		let (width, height) = (self.surface.width(), self.surface.height());
		if let Some(mesh) = self.container.children.first_mut() {
			*mesh = PlaneMesh::new(width, height);
		}
		self.lines = lines;
		self.show_parent = show_parent;
		self.update_position(node);
	}

	/// Places the label beside the node and folds its bounds into the
	/// node's bounding box.
	pub fn update_position(&mut self, node: &mut GraphNode) {
		self.apply_position(node);
		let Some(position) = node.position else {
			return;
		};

		let circle = node.circle_bounds();
		let width = self.surface.width();
		// Labels may overlap a little vertically.
		let y_delta = self.surface.height() * 0.6 / 2.0;
		let (left, right) = if node.label_position_left {
			let right = circle.left - self.buffer;
			(right - width, right)
		} else {
			let left = circle.right + self.buffer;
			(left, left + width)
		};
		self.bounding_box = BoundingBox {
			left,
			right,
			top: position.y - y_delta,
			bottom: position.y + y_delta,
		};
		node.bounding_box = circle.union(&self.bounding_box);
	}

	fn apply_position(&mut self, node: &GraphNode) {
		let x = self.radius + self.surface.width() / 2.0 + LABEL_SPACING;
		let x = if node.label_position_left { -x } else { x };
		self.container.set_position(x, 0.0, 1.0);
	}

	/// Takes effect on the next `refresh`.
	pub fn set_highlight(&mut self, highlight: bool) {
		self.highlight = highlight;
	}

	pub fn highlighted(&self) -> bool {
		self.highlight
	}

	pub fn refresh(&mut self, node: &mut GraphNode) {
		self.update_label(node);
	}

	pub fn bounding_box(&self) -> BoundingBox {
		self.bounding_box
	}

	pub fn surface(&self) -> &S {
		&self.surface
	}

	pub fn texture_mut(&mut self) -> &mut Texture {
		&mut self.texture
	}

	pub fn material(&self) -> &Material {
		&self.material
	}

	pub fn label_state(&self) -> LabelState {
		LabelState {
			lines: self.lines.clone(),
			label_width: self.label_width,
			canvas_width: self.surface.width(),
			canvas_height: self.surface.height(),
			highlight: self.highlight,
			show_parent: self.show_parent,
			opacity: self.material.opacity,
		}
	}
}

impl<S: DrawingSurface> SceneElement for NodeStatsView<S> {
	fn container(&self) -> &Container {
		&self.container
	}

	fn container_mut(&mut self) -> &mut Container {
		&mut self.container
	}

	fn set_opacity(&mut self, opacity: f64) {
		self.container.opacity = opacity;
		self.material.opacity = opacity;
	}

	fn cleanup(mut self) -> ReleasedResources {
		ReleasedResources {
			textures: usize::from(self.texture.dispose()),
			materials: usize::from(self.material.dispose()),
		}
	}
}
