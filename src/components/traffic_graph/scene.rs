/// Wraps a drawing surface as an image the compositor uploads when dirty.
#[derive(Clone, Debug, Default)]
pub struct Texture {
	needs_update: bool,
	disposed: bool,
}

impl Texture {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mark_dirty(&mut self) {
		self.needs_update = true;
	}

	pub fn needs_update(&self) -> bool {
		self.needs_update
	}

	/// Clears the dirty flag. Returns whether an upload was pending.
	pub fn upload(&mut self) -> bool {
		std::mem::take(&mut self.needs_update)
	}

	/// Returns whether this call released the texture.
	pub fn dispose(&mut self) -> bool {
		!std::mem::replace(&mut self.disposed, true)
	}
}

#[derive(Clone, Debug)]
pub struct Material {
	pub opacity: f64,
	pub transparent: bool,
	disposed: bool,
}

impl Material {
	pub fn transparent() -> Self {
		Self {
			opacity: 1.0,
			transparent: true,
			disposed: false,
		}
	}

	/// Returns whether this call released the material.
	pub fn dispose(&mut self) -> bool {
		!std::mem::replace(&mut self.disposed, true)
	}
}

/// Flat rectangle the texture is mapped onto, centered on its container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaneMesh {
	pub width: f64,
	pub height: f64,
}

impl PlaneMesh {
	pub fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}
}

/// Scene node holding meshes at an offset from its parent entity.
#[derive(Clone, Debug)]
pub struct Container {
	pub position: (f64, f64, f64),
	pub opacity: f64,
	pub children: Vec<PlaneMesh>,
}

impl Default for Container {
	fn default() -> Self {
		Self {
			position: (0.0, 0.0, 0.0),
			opacity: 1.0,
			children: Vec::new(),
		}
	}
}

impl Container {
	pub fn set_position(&mut self, x: f64, y: f64, z: f64) {
		self.position = (x, y, z);
	}
}

/// What a view handed back when it was cleaned up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReleasedResources {
	pub textures: usize,
	pub materials: usize,
}

/// Capability shared by everything placed in the scene.
///
/// `cleanup` takes the element by value: once resources are released the
/// element is gone, so it can neither be cleaned up twice nor used again.
pub trait SceneElement {
	fn container(&self) -> &Container;

	fn container_mut(&mut self) -> &mut Container;

	/// Attaches a mesh and returns its index among the container's children.
	fn add_child_element(&mut self, mesh: PlaneMesh) -> usize {
		let children = &mut self.container_mut().children;
		children.push(mesh);
		children.len() - 1
	}

	/// Value is forwarded as is, no range check.
	fn set_opacity(&mut self, opacity: f64) {
		self.container_mut().opacity = opacity;
	}

	fn cleanup(self) -> ReleasedResources
	where
		Self: Sized;
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_log::test;

	#[test]
	fn upload_clears_dirty_flag_once() {
		let mut texture = Texture::new();
		assert!(!texture.upload());
		texture.mark_dirty();
		texture.mark_dirty();
		assert!(texture.needs_update());
		assert!(texture.upload());
		assert!(!texture.upload());
	}

	#[test]
	fn dispose_releases_once() {
		let mut texture = Texture::new();
		assert!(texture.dispose());
		assert!(!texture.dispose());
		let mut material = Material::transparent();
		assert!(material.dispose());
		assert!(!material.dispose());
	}
}
