pub mod spread;

pub use spread::*;
