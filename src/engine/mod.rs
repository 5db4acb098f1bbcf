pub mod grid_search;
pub mod knn;
pub mod trainer;

pub use grid_search::*;
pub use knn::*;
pub use trainer::*;
