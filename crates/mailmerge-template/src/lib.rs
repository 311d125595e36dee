//! # mailmerge-template
//!
//! Renders HTML templates against row-oriented datasets. Templates contain
//! two constructs:
//!
//! - **Repeater blocks**: an element such as `<sg:repeater dataselection="items">`
//!   whose `<sg:repeateritem>` children are rendered once per row of the named
//!   selection and spliced into the document in place of the block.
//! - **Expressions**: `[% itemValue('field') %]` and `[% resource('/path') %]`
//!   markers, resolved against the current row and the dataset's base URL.
//!
//! ## Modules
//!
//! - [`dataset`] - Datasets, rows, and values
//! - [`expression`] - Marker scanning and expression evaluation
//! - [`markup`] - Locating repeater blocks in template source text
//! - [`dom`] - The parsed HTML document tree
//! - [`renderer`] - Repeater expansion, image rewriting, and template outlines

pub mod dataset;
pub mod dom;
pub mod expression;
pub mod markup;
pub mod renderer;

pub use dataset::{Dataset, Row, Value};
pub use expression::render_expressions;
pub use renderer::{render_template, TemplateOutline, TemplateRenderer};
