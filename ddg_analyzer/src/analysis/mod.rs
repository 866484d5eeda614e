pub mod heatmap;
pub mod significance;
pub mod thresholds;
pub mod transitions;
