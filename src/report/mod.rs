//! Console tables and the actual-vs-predicted chart.

pub mod chart;
pub mod console;

pub use chart::*;
pub use console::*;
