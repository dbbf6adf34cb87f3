use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::error::RenderResourceError;
use super::icons::{NoticeIconCache, Severity};
use super::node_stats::LabelState;
use super::scene::{Material, SceneElement, Texture};
use super::state::{TrafficGraphState, ease_out_cubic};
use super::surface::{CanvasFactory, CanvasSurface};
use super::types::{NODE_RADIUS, Point};

const NOTICE_ICON_SIZE: f64 = 28.0;

/// Decoded notice icons, indexed by severity.
pub struct NoticeImages {
	images: Vec<HtmlImageElement>,
}

impl NoticeImages {
	pub fn load(cache: &NoticeIconCache) -> Result<Self, RenderResourceError> {
		let images = cache
			.sources()
			.iter()
			.map(|src| {
				let image = HtmlImageElement::new()
					.map_err(|e| RenderResourceError::CreateImage(format!("{e:?}")))?;
				image.set_src(src);
				Ok(image)
			})
			.collect::<Result<Vec<_>, RenderResourceError>>()?;
		Ok(Self { images })
	}

	fn get(&self, severity: Severity) -> Option<&HtmlImageElement> {
		self.images.get(severity as usize).filter(|image| image.complete())
	}
}

pub fn render(
	state: &mut TrafficGraphState<CanvasFactory>,
	ctx: &CanvasRenderingContext2d,
	icons: Option<&NoticeImages>,
) {
	ctx.set_fill_style_str(&state.theme().page_background);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_connections(state, ctx);
	draw_nodes(state, ctx);
	draw_labels(state, ctx, icons);
	ctx.restore();
}

fn draw_connections(state: &TrafficGraphState<CanvasFactory>, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (2.0 / k, 12.0 / k, 6.0 / k, 14.0 / k);
	let dash_offset = -(state.flow_time * 60.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let has_highlight = state.has_active_highlight();

	for (c, connection) in state.graph.connections.iter().enumerate() {
		let (Some(p1), Some(p2)) = (
			state.graph.node(&connection.source).and_then(|n| n.position),
			state.graph.node(&connection.target).and_then(|n| n.position),
		) else {
			continue;
		};
		let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
		let dist = dx.hypot(dy);
		if dist < 2.0 * NODE_RADIUS {
			continue;
		}

		// t=0: all edges at base alpha, t=1: highlighted brighten, others dim
		let highlighted = has_highlight && state.connection_highlighted(c);
		let alpha = if highlighted {
			0.6 + 0.4 * t
		} else if has_highlight {
			0.6 - 0.45 * t
		} else {
			0.6
		};
		let color = if connection.volume.danger.unwrap_or(0.0) > 0.0 {
			&state.theme().traffic.danger
		} else {
			&state.theme().traffic.normal
		};

		ctx.set_global_alpha(alpha);
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(line_width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(p1.x + ux * NODE_RADIUS, p1.y + uy * NODE_RADIUS);
		ctx.line_to(
			p2.x - ux * (NODE_RADIUS + arrow_size),
			p2.y - uy * (NODE_RADIUS + arrow_size),
		);
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(color);
		let (tip_x, tip_y) = (p2.x - ux * NODE_RADIUS, p2.y - uy * NODE_RADIUS);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(state: &TrafficGraphState<CanvasFactory>, ctx: &CanvasRenderingContext2d) {
	let theme = state.theme();
	let t = ease_out_cubic(state.hover.highlight_t);
	let has_highlight = state.has_active_highlight();

	for (idx, node) in state.graph.nodes.iter().enumerate() {
		let Some(Point { x, y }) = node.position else {
			continue;
		};
		let dimmed = has_highlight && !state.is_highlighted(idx);
		ctx.set_global_alpha(if dimmed { 1.0 - 0.7 * t } else { 1.0 });

		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&theme.background_dark);
		ctx.fill();

		let hovered = state.is_hovered(idx);
		ctx.begin_path();
		let _ = ctx.arc(x, y, NODE_RADIUS + 1.0, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(&theme.node_outline);
		ctx.set_line_width(if hovered { 2.0 + 3.0 * t } else { 2.0 });
		ctx.stroke();

		ctx.set_fill_style_str(&theme.traffic.normal);
		ctx.set_font(&format!("16px '{}', sans-serif", theme.font_family));
		ctx.set_text_align("center");
		ctx.set_text_baseline("top");
		let _ = ctx.fill_text(node.display_name(), x, y + NODE_RADIUS + 6.0);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_labels(
	state: &mut TrafficGraphState<CanvasFactory>,
	ctx: &CanvasRenderingContext2d,
	icons: Option<&NoticeImages>,
) {
	let nodes = state.node_views.iter_mut().zip(&state.graph.nodes);
	for (view, node) in nodes {
		let Some(origin) = node.position else {
			continue;
		};
		upload(view.texture_mut(), &node.name);
		let label = view.label_state();
		// Nodes without metrics have nothing to show.
		if label.lines.is_empty() {
			continue;
		}
		let (ox, oy, _) = view.container().position;
		let opacity = effective_opacity(view.material());
		blit(ctx, view.surface(), &label, origin.x + ox, origin.y + oy, opacity);
	}

	for (view, connection) in state.connection_views.iter_mut().zip(&state.graph.connections) {
		if state.graph.connection_midpoint(connection).is_none() {
			continue;
		}
		upload(view.texture_mut(), &connection.name);
		let label = view.label_state();
		if label.lines.is_empty() {
			continue;
		}
		let (x, y, _) = view.container().position;
		let opacity = effective_opacity(view.material());
		blit(ctx, view.surface(), &label, x, y, opacity);

		if view.notice_icon().is_none() {
			continue;
		}
		if let Some(image) = icons.and_then(|icons| icons.get(view.severity())) {
			let left = x - label.canvas_width / 2.0 - NOTICE_ICON_SIZE - 4.0;
			ctx.set_global_alpha(opacity);
			let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
				image,
				left,
				y - NOTICE_ICON_SIZE / 2.0,
				NOTICE_ICON_SIZE,
				NOTICE_ICON_SIZE,
			);
		}
	}
	ctx.set_global_alpha(1.0);
}

fn upload(texture: &mut Texture, owner: &str) {
	if texture.needs_update() {
		texture.upload();
		log::trace!("Uploaded label texture for {owner}");
	}
}

/// Opaque materials ignore their opacity.
fn effective_opacity(material: &Material) -> f64 {
	if material.transparent {
		material.opacity
	} else {
		1.0
	}
}

/// Draws a label surface centered on `(x, y)`.
fn blit(
	ctx: &CanvasRenderingContext2d,
	surface: &CanvasSurface,
	label: &LabelState,
	x: f64,
	y: f64,
	opacity: f64,
) {
	let (w, h) = (label.canvas_width, label.canvas_height);
	// Zero-sized canvases cannot be drawn.
	if w < 1.0 || h < 1.0 {
		return;
	}
	ctx.set_global_alpha(opacity);
	let _ = ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
		surface.canvas(),
		x - w / 2.0,
		y - h / 2.0,
		w,
		h,
	);
}
