pub mod engine;
pub mod rolling;

pub use engine::{EPSILON, REQUIRED_COLUMNS, enrich};
