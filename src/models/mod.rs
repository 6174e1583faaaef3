// Data models (structs)
pub mod analysis;
pub mod patient;

pub use analysis::*;
pub use patient::*;
