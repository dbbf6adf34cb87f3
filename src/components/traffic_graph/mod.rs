mod component;
mod connection_stats;
mod error;
mod icons;
mod layout;
mod node_stats;
mod render;
mod scene;
mod state;
mod surface;
mod text;
mod theme;
mod types;

pub use component::TrafficGraphCanvas;
pub use types::TrafficGraph;
