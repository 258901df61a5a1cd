pub mod engine;
pub mod retention;

pub use engine::{CleanOptions, CleanReport, Cleaner};
pub use retention::{partition, select, Selection};
