use leptos::prelude::*;
use log::info;

use crate::components::traffic_graph::{TrafficGraph, TrafficGraphCanvas};

const SAMPLE_TRAFFIC: &str = include_str!("../../assets/traffic.json");

fn load_sample_traffic() -> Result<TrafficGraph, serde_json::Error> {
	let graph: TrafficGraph = serde_json::from_str(SAMPLE_TRAFFIC)?;
	info!(
		"Loaded sample traffic: {} nodes, {} connections",
		graph.nodes.len(),
		graph.connections.len()
	);
	Ok(graph)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let sample = load_sample_traffic();

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			{sample
				.map(|graph| {
					let graph_data = Signal::derive(move || graph.clone());
					view! {
						<div class="fullscreen-graph">
							<TrafficGraphCanvas data=graph_data fullscreen=true />
							<div class="graph-overlay">
								<h1>"Service Traffic"</h1>
								<p class="subtitle">
									"Hover a service to trace its traffic. Drag nodes to reposition. Scroll to zoom."
								</p>
							</div>
						</div>
					}
				})}
		</ErrorBoundary>
	}
}
