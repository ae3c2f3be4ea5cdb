pub mod corner_table;
pub mod diagram;
pub mod handles;
pub mod math;
pub mod separator;
pub mod tripoint;

pub use diagram::VoronoiDiagram;
