pub mod metrics;
pub mod split;

pub use metrics::*;
pub use split::*;
