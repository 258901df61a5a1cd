pub mod config;
pub mod errors;
pub mod format;
pub mod locator;

pub use config::{Config, Credentials, OutputFormat, RunConfig, RunInputs};
pub use errors::CleanupError;
pub use locator::BucketLocator;
