//! # mailmerge
//!
//! Renders personalized HTML documents from a template and tabular data.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `mailmerge` for everything, or on individual crates for
//! finer-grained control.
//!
//! ```rust
//! use mailmerge::prelude::*;
//!
//! let dataset = Dataset::new()
//!     .with_selection("people", vec![Row::new().with("name", "Ann"), Row::new().with("name", "Bob")]);
//! let html = render_template(
//!     "<ul><sg:repeater dataselection=\"people\"><sg:repeateritem><li>[% itemValue('name') %]</li></sg:repeateritem></sg:repeater></ul>",
//!     &dataset,
//! )
//! .unwrap();
//! assert!(html.contains("<ul><li>Ann</li><li>Bob</li></ul>"));
//! ```

/// Settings, error types, and logging.
pub use mailmerge_core as core;

/// Datasets, the expression evaluator, and the template renderer.
pub use mailmerge_template as template;

/// Command framework and built-in commands (CLI).
#[cfg(feature = "cli")]
pub use mailmerge_cli as cli;

/// Third-party crates re-exported for user convenience.
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;

/// The types most programs need.
pub mod prelude {
    pub use mailmerge_core::{MergeError, MergeResult, RenderSettings, Settings};
    pub use mailmerge_template::{
        render_expressions, render_template, Dataset, Row, TemplateRenderer, Value,
    };
}
