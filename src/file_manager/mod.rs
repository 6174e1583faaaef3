pub mod json_ops;
pub mod store;

pub use json_ops::*;
