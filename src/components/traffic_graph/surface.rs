use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

use super::error::RenderResourceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
	Left,
	Center,
}

impl TextAlign {
	fn as_css(self) -> &'static str {
		match self {
			TextAlign::Left => "left",
			TextAlign::Center => "center",
		}
	}
}

/// A resizable 2D pixel surface that text can be measured and drawn on.
///
/// Text is drawn with a vertically centered baseline.
pub trait DrawingSurface {
	fn width(&self) -> f64;

	fn height(&self) -> f64;

	/// Resizes to at least `width` x `height`, rounded up to whole pixels.
	/// Content is discarded.
	fn resize(&mut self, width: f64, height: f64);

	fn set_font(&mut self, font: &str);

	fn measure_text(&self, text: &str) -> f64;

	fn clear(&mut self);

	fn fill_rect(&mut self, color: &str, x: f64, y: f64, width: f64, height: f64);

	fn fill_text(&mut self, text: &str, color: &str, align: TextAlign, x: f64, y: f64);
}

pub trait SurfaceFactory {
	type Surface: DrawingSurface;

	fn create(&self, width: f64, height: f64) -> Result<Self::Surface, RenderResourceError>;
}

/// Off-screen `<canvas>` backed surface.
pub struct CanvasSurface {
	canvas: HtmlCanvasElement,
	ctx: CanvasRenderingContext2d,
	font: String,
}

impl CanvasSurface {
	pub fn canvas(&self) -> &HtmlCanvasElement {
		&self.canvas
	}

	fn apply_context_state(&self) {
		self.ctx.set_font(&self.font);
		self.ctx.set_text_baseline("middle");
	}
}

impl DrawingSurface for CanvasSurface {
	fn width(&self) -> f64 {
		self.canvas.width() as f64
	}

	fn height(&self) -> f64 {
		self.canvas.height() as f64
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.canvas.set_width(width.max(0.0).ceil() as u32);
		self.canvas.set_height(height.max(0.0).ceil() as u32);
		// Resizing a canvas resets its 2d context state.
		self.apply_context_state();
	}

	fn set_font(&mut self, font: &str) {
		self.font = font.to_owned();
		self.ctx.set_font(font);
	}

	fn measure_text(&self, text: &str) -> f64 {
		self.ctx
			.measure_text(text)
			.map(|m| m.width())
			.unwrap_or_default()
	}

	fn clear(&mut self) {
		self.ctx.clear_rect(0.0, 0.0, self.width(), self.height());
	}

	fn fill_rect(&mut self, color: &str, x: f64, y: f64, width: f64, height: f64) {
		self.ctx.set_fill_style_str(color);
		self.ctx.fill_rect(x, y, width, height);
	}

	fn fill_text(&mut self, text: &str, color: &str, align: TextAlign, x: f64, y: f64) {
		self.ctx.set_fill_style_str(color);
		self.ctx.set_text_align(align.as_css());
		if let Err(err) = self.ctx.fill_text(text, x, y) {
			log::warn!("fill_text failed: {err:?}");
		}
	}
}

/// Creates detached canvases from the page document.
pub struct CanvasFactory {
	document: Document,
}

impl CanvasFactory {
	pub fn from_window() -> Result<Self, RenderResourceError> {
		let window = web_sys::window().ok_or(RenderResourceError::NoWindow)?;
		let document = window.document().ok_or(RenderResourceError::NoDocument)?;
		Ok(Self { document })
	}
}

impl SurfaceFactory for CanvasFactory {
	type Surface = CanvasSurface;

	fn create(&self, width: f64, height: f64) -> Result<CanvasSurface, RenderResourceError> {
		let canvas: HtmlCanvasElement = self
			.document
			.create_element("canvas")
			.map_err(|e| RenderResourceError::CreateCanvas(format!("{e:?}")))?
			.dyn_into()
			.map_err(|_| RenderResourceError::CreateCanvas("not a canvas element".into()))?;
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.ok_or(RenderResourceError::ContextUnavailable)?
			.dyn_into()
			.map_err(|_| RenderResourceError::ContextUnavailable)?;
		let mut surface = CanvasSurface {
			canvas,
			ctx,
			font: String::new(),
		};
		surface.resize(width, height);
		Ok(surface)
	}
}

#[cfg(test)]
pub(crate) mod fake {
	use std::cell::Cell;

	use super::*;

	/// Every glyph is this wide, so widths are predictable in tests.
	pub const GLYPH_WIDTH: f64 = 9.0;

	#[derive(Clone, Debug, PartialEq)]
	pub struct DrawnText {
		pub text: String,
		pub color: String,
		pub align: TextAlign,
		pub left: f64,
		pub right: f64,
		pub y: f64,
	}

	#[derive(Debug, Default)]
	pub struct FakeSurface {
		pub width: f64,
		pub height: f64,
		pub font: String,
		pub texts: Vec<DrawnText>,
		pub rects: Vec<(String, f64, f64, f64, f64)>,
		/// Order of resize/clear/draw calls, for ordering assertions.
		pub ops: Vec<&'static str>,
	}

	impl DrawingSurface for FakeSurface {
		fn width(&self) -> f64 {
			self.width
		}

		fn height(&self) -> f64 {
			self.height
		}

		fn resize(&mut self, width: f64, height: f64) {
			self.width = width.max(0.0).ceil();
			self.height = height.max(0.0).ceil();
			self.texts.clear();
			self.rects.clear();
			self.ops.push("resize");
		}

		fn set_font(&mut self, font: &str) {
			self.font = font.to_owned();
		}

		fn measure_text(&self, text: &str) -> f64 {
			text.chars().count() as f64 * GLYPH_WIDTH
		}

		fn clear(&mut self) {
			self.texts.clear();
			self.rects.clear();
			self.ops.push("clear");
		}

		fn fill_rect(&mut self, color: &str, x: f64, y: f64, width: f64, height: f64) {
			self.rects.push((color.to_owned(), x, y, width, height));
			self.ops.push("fill_rect");
		}

		fn fill_text(&mut self, text: &str, color: &str, align: TextAlign, x: f64, y: f64) {
			let width = self.measure_text(text);
			let left = match align {
				TextAlign::Left => x,
				TextAlign::Center => x - width / 2.0,
			};
			self.texts.push(DrawnText {
				text: text.to_owned(),
				color: color.to_owned(),
				align,
				left,
				right: left + width,
				y,
			});
			self.ops.push("fill_text");
		}
	}

	#[derive(Debug, Default)]
	pub struct FakeFactory {
		pub created: Cell<usize>,
		pub fail: bool,
	}

	impl FakeFactory {
		pub fn failing() -> Self {
			Self {
				fail: true,
				..Default::default()
			}
		}
	}

	impl SurfaceFactory for FakeFactory {
		type Surface = FakeSurface;

		fn create(&self, width: f64, height: f64) -> Result<FakeSurface, RenderResourceError> {
			if self.fail {
				return Err(RenderResourceError::ContextUnavailable);
			}
			self.created.set(self.created.get() + 1);
			let mut surface = FakeSurface::default();
			surface.resize(width, height);
			surface.ops.clear();
			Ok(surface)
		}
	}
}
