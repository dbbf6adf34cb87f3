use std::rc::Rc;

use super::error::RenderResourceError;
use super::icons::{NoticeIconCache, Severity};
use super::node_stats::LabelState;
use super::scene::{Container, Material, PlaneMesh, ReleasedResources, SceneElement, Texture};
use super::surface::{DrawingSurface, SurfaceFactory, TextAlign};
use super::text::{BADGE_PADDING_X, BADGE_PADDING_Y, FONT_SIZE, connection_badge_text, label_font};
use super::theme::Theme;
use super::types::{Connection, Point};

/// Error share at or above which a connection is flagged as danger.
const DANGER_ERROR_RATIO: f64 = 0.1;

/// Single-line stats badge centered on a connection.
pub struct ConnectionStatsView<S: DrawingSurface> {
	surface: S,
	texture: Texture,
	material: Material,
	container: Container,
	theme: Rc<Theme>,
	icons: Rc<NoticeIconCache>,
	severity: Severity,
	label_width: f64,
	text: String,
	highlight: bool,
}

impl<S: DrawingSurface> ConnectionStatsView<S> {
	pub fn new<F>(
		factory: &F,
		connection: &Connection,
		midpoint: Option<Point>,
		theme: Rc<Theme>,
		icons: Rc<NoticeIconCache>,
	) -> Result<Self, RenderResourceError>
	where
		F: SurfaceFactory<Surface = S>,
	{
		let surface = factory.create(200.0, 200.0)?;
		let mut view = Self {
			surface,
			texture: Texture::new(),
			material: Material::transparent(),
			container: Container::default(),
			theme,
			icons,
			severity: Severity::Normal,
			label_width: 0.0,
			text: String::new(),
			highlight: false,
		};
		view.update_notice_icon(connection);
		let mesh = PlaneMesh::new(view.surface.width(), view.surface.height());
		view.add_child_element(mesh);
		if let Some(midpoint) = midpoint {
			view.update_position(midpoint);
		}
		Ok(view)
	}

	/// Recomputes badge text and severity, resizes and redraws the surface.
	pub fn update_notice_icon(&mut self, connection: &Connection) {
		let text = connection_badge_text(connection);
		let theme = Rc::clone(&self.theme);

		self.surface.set_font(&label_font(&theme));
		self.label_width = self.surface.measure_text(&text) + BADGE_PADDING_X;
		self.surface
			.resize(self.label_width, FONT_SIZE + BADGE_PADDING_Y);

		let (width, height) = (self.surface.width(), self.surface.height());
		self.surface.clear();
		let background = if self.highlight {
			&theme.traffic.warning
		} else {
			&theme.traffic.normal
		};
		self.surface.fill_rect(background, 0.0, 0.0, width, height);
		self.surface.fill_text(
			&text,
			&theme.label_text,
			TextAlign::Center,
			width / 2.0,
			height / 2.0,
		);
		self.texture.mark_dirty();

		if let Some(mesh) = self.container.children.first_mut() {
			*mesh = PlaneMesh::new(width, height);
		}
		self.severity = severity_of(connection);
		self.text = text;
	}

	/// Centers the badge on the connection midpoint, in front of the edge.
	pub fn update_position(&mut self, midpoint: Point) {
		self.container.set_position(midpoint.x, midpoint.y, 1.0);
	}

	/// Takes effect on the next `refresh`.
	pub fn set_highlight(&mut self, highlight: bool) {
		self.highlight = highlight;
	}

	pub fn highlighted(&self) -> bool {
		self.highlight
	}

	pub fn refresh(&mut self, connection: &Connection) {
		self.update_notice_icon(connection);
	}

	pub fn severity(&self) -> Severity {
		self.severity
	}

	/// Icon source for connections that have errors.
	pub fn notice_icon(&self) -> Option<&str> {
		match self.severity {
			Severity::Normal => None,
			severity => Some(self.icons.source(severity)),
		}
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
			lines: if self.text.is_empty() {
				Vec::new()
			} else {
				vec![self.text.clone()]
			},
			label_width: self.label_width,
			canvas_width: self.surface.width(),
			canvas_height: self.surface.height(),
			highlight: self.highlight,
			show_parent: false,
			opacity: self.material.opacity,
		}
	}
}

fn severity_of(connection: &Connection) -> Severity {
	let errors = connection.volume.danger.unwrap_or(0.0);
	if errors <= 0.0 {
		return Severity::Normal;
	}
	let total = errors + connection.volume.normal.unwrap_or(0.0);
	if errors / total >= DANGER_ERROR_RATIO {
		Severity::Danger
	} else {
		Severity::Warning
	}
}

impl<S: DrawingSurface> SceneElement for ConnectionStatsView<S> {
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::traffic_graph::surface::fake::{FakeFactory, FakeSurface, GLYPH_WIDTH};
	use crate::components::traffic_graph::types::{ConnectionMetadata, Volume};
	use test_log::test;

	fn connection(normal: Option<f64>, danger: Option<f64>, time: Option<f64>) -> Connection {
		Connection {
			volume: Volume { normal, danger },
			metadata: ConnectionMetadata {
				connection_time: time,
			},
			..Connection::new("edge", "api")
		}
	}

	fn badge(connection: &Connection, midpoint: Option<Point>) -> ConnectionStatsView<FakeSurface> {
		let theme = Rc::new(Theme::default());
		let icons = Rc::new(NoticeIconCache::new(&theme));
		ConnectionStatsView::new(&FakeFactory::default(), connection, midpoint, theme, icons).unwrap()
	}

	#[test]
	fn renders_centered_stats_text() {
		let conn = connection(Some(40.0), Some(2.0), Some(133.9));
		let view = badge(&conn, None);
		let text = "133 ms, 42 Requests, 2 Errors";
		let state = view.label_state();
		assert_eq!(state.lines, vec![text]);
		assert_eq!(state.canvas_width, text.len() as f64 * GLYPH_WIDTH + 16.0);
		assert_eq!(state.canvas_height, 28.0);

		let drawn = &view.surface().texts[0];
		assert_eq!(drawn.align, TextAlign::Center);
		assert_eq!(drawn.color, Theme::default().label_text);
		assert!(drawn.left >= 0.0 && drawn.right <= state.canvas_width);
	}

	#[test]
	fn empty_badge_is_padding_only() {
		let view = badge(&connection(None, None, None), None);
		let state = view.label_state();
		assert!(state.lines.is_empty());
		assert_eq!((state.canvas_width, state.canvas_height), (16.0, 28.0));
	}

	#[test]
	fn sits_on_midpoint_in_front_of_edge() {
		let conn = connection(Some(1.0), None, None);
		let mut view = badge(&conn, Some(Point::new(10.0, -4.0)));
		assert_eq!(view.container().position, (10.0, -4.0, 1.0));
		view.update_position(Point::new(0.0, 0.0));
		assert_eq!(view.container().position, (0.0, 0.0, 1.0));
	}

	#[test]
	fn severity_follows_error_share() {
		let theme = Theme::default();
		let ok = badge(&connection(Some(100.0), Some(0.0), None), None);
		assert_eq!(ok.severity(), Severity::Normal);
		assert_eq!(ok.notice_icon(), None);

		let warn = badge(&connection(Some(99.0), Some(1.0), None), None);
		assert_eq!(warn.severity(), Severity::Warning);
		let icons = NoticeIconCache::new(&theme);
		assert_eq!(warn.notice_icon(), Some(icons.source(Severity::Warning)));

		let danger = badge(&connection(None, Some(3.0), None), None);
		assert_eq!(danger.severity(), Severity::Danger);
	}

	#[test]
	fn highlight_recolors_background_on_refresh() {
		let theme = Theme::default();
		let conn = connection(Some(5.0), None, None);
		let mut view = badge(&conn, None);
		assert_eq!(view.surface().rects[0].0, theme.traffic.normal);
		view.set_highlight(true);
		view.refresh(&conn);
		assert_eq!(view.surface().rects[0].0, theme.traffic.warning);
	}

	#[test]
	fn refresh_resizes_mesh_and_marks_texture() {
		let mut conn = connection(Some(5.0), None, None);
		let mut view = badge(&conn, None);
		view.texture_mut().upload();
		conn.volume.normal = Some(5000.0);
		view.refresh(&conn);
		let state = view.label_state();
		assert_eq!(state.lines, vec!["5000 Requests"]);
		assert_eq!(view.container().children[0].width, state.canvas_width);
		assert!(view.texture_mut().needs_update());
	}

	#[test]
	fn cleanup_releases_one_texture_and_material() {
		let view = badge(&connection(None, None, None), None);
		let released = view.cleanup();
		assert_eq!((released.textures, released.materials), (1, 1));
	}
}
