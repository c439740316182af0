pub mod commands;
pub mod core;

pub use crate::core::config::{Config, InconsistentCachePolicy, LoaderOptions, ReleaseChannel};
pub use crate::core::error::{LoaderError, LoaderResult, Lookup};
pub use crate::core::startup::{Startup, StartupOutcome};
