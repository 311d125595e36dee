//! # mailmerge-core
//!
//! Settings, error types, and logging shared by the mailmerge crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Renderer and process settings
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{MergeError, MergeResult};
pub use settings::{RenderSettings, Settings};
