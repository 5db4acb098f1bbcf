pub mod loader;
pub mod summary;

pub use loader::*;
pub use summary::*;
