pub mod controller;

pub use controller::{exhaustion_diagnostic, ArtifactVersionController};
