/// Colors of the three traffic severities.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficColors {
	pub normal: String,
	pub warning: String,
	pub danger: String,
}

/// Palette and font used by every view. Passed in explicitly rather than
/// read from shared global state.
#[derive(Clone, Debug, PartialEq)]
pub struct Theme {
	pub page_background: String,
	pub background_dark: String,
	pub highlight_background: String,
	pub label_text: String,
	pub node_outline: String,
	pub traffic: TrafficColors,
	pub font_family: String,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			page_background: "rgb(45, 45, 55)".into(),
			background_dark: "rgb(35, 35, 40)".into(),
			highlight_background: "rgb(70, 70, 82)".into(),
			label_text: "rgb(35, 35, 40)".into(),
			node_outline: "rgb(192, 213, 217)".into(),
			traffic: TrafficColors {
				normal: "rgb(186, 213, 237)".into(),
				warning: "rgb(255, 185, 73)".into(),
				danger: "rgb(184, 36, 36)".into(),
			},
			font_family: "Source Sans Pro".into(),
		}
	}
}
