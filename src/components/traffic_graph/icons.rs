use super::theme::Theme;

/// How alarming a connection's error share is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
	#[default]
	Normal,
	Warning,
	Danger,
}

const TRIANGLE_SHADOW: &str = "M125.1,899.6c0,0-96-58.5-84-148.5s408-648,408-648l138,9l364.5,621l10.5,148.5l-138,33L125.1,899.6z";
const TRIANGLE_GLYPH: &str = "M513.71 149.5q-48.75 0 -81.25 55l-307.5 512.5q-32.5 55 -10.625 95t86.875 40l625 0q65 0 86.25 -40t-11.25 -95l-307.5 -512.5q-32.5 -55 -80 -55zm0 -105q106.25 0 168.75 106.25l308.75 513.75q62.5 105 11.25 198.75 -51.25 92.5 -176.25 92.5l-625 0q-123.75 0 -177.5 -92.5 -52.5 -92.5 11.25 -198.75l308.75 -513.75q62.5 -106.25 170 -106.25zm-68.75 651.25q0 -68.75 68.75 -68.75 67.5 0 67.5 68.75 0 67.5 -67.5 67.5 -68.75 0 -68.75 -67.5zm146.25 -312.5q0 13.75 -6.25 28.75l-71.25 178.75q-43.75 -107.5 -72.5 -178.75 -6.25 -15 -6.25 -28.75 0 -32.5 23.125 -55.625t55.625 -23.125 55 23.125 22.5 55.625z";

/// Warning-triangle icons, one per severity, built once from a theme.
///
/// Build it at startup and hand the same `Rc` to every badge view.
#[derive(Clone, Debug, PartialEq)]
pub struct NoticeIconCache {
	sources: [String; 3],
}

impl NoticeIconCache {
	pub fn new(theme: &Theme) -> Self {
		let fill = |color: &str| notice_svg(&theme.page_background, color);
		Self {
			sources: [
				data_uri(&fill(&theme.traffic.normal)),
				data_uri(&fill(&theme.traffic.warning)),
				data_uri(&fill(&theme.traffic.danger)),
			],
		}
	}

	pub fn source(&self, severity: Severity) -> &str {
		&self.sources[severity as usize]
	}

	pub fn sources(&self) -> &[String; 3] {
		&self.sources
	}
}

fn notice_svg(background: &str, color: &str) -> String {
	format!(
		r#"<svg xmlns="http://www.w3.org/2000/svg" height="140" width="140" viewBox="0 0 1000 1026"><path d="{TRIANGLE_SHADOW}" fill="{background}"/><path d="{TRIANGLE_GLYPH}" fill="{color}"/></svg>"#
	)
}

fn data_uri(svg: &str) -> String {
	format!("data:image/svg+xml;charset=utf-8,{}", encode_component(svg))
}

#[cfg(not(test))]
fn encode_component(text: &str) -> String {
	js_sys::encode_uri_component(text).into()
}

/// Native stand-in for `encodeURIComponent`, same unreserved set.
#[cfg(test)]
fn encode_component(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for byte in text.bytes() {
		match byte {
			b'A'..=b'Z'
			| b'a'..=b'z'
			| b'0'..=b'9'
			| b'-'
			| b'_'
			| b'.'
			| b'!'
			| b'~'
			| b'*'
			| b'\''
			| b'('
			| b')' => out.push(byte as char),
			_ => out.push_str(&format!("%{byte:02X}")),
		}
	}
	out
}
