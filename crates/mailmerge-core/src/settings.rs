//! Settings for mailmerge.
//!
//! This module provides the [`Settings`] struct, which holds process-level
//! configuration (debug mode, log level), and [`RenderSettings`], which names
//! the template constructs the renderer looks for. Settings are plain values
//! passed to the renderer; there is no global instance.

use serde::{Deserialize, Serialize};

/// Default upper bound on template size, in bytes.
pub const DEFAULT_MAX_TEMPLATE_BYTES: usize = 5_000_000;

/// Renderer configuration.
///
/// Tag names are matched against an element's local name with any namespace
/// prefix ignored, so the default `repeater` matches both `<repeater>` and
/// `<sg:repeater>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Tag name of repeater blocks.
    pub repeater_tag: String,
    /// Tag name of repeater items nested in a repeater block.
    pub repeater_item_tag: String,
    /// Attribute on a repeater block naming its data selection.
    pub selection_attribute: String,
    /// Tag name of image elements whose source is rewritten.
    pub image_tag: String,
    /// Attribute on image elements that holds the resource reference.
    pub image_source_attribute: String,
    /// Name of the selection holding `name`/`value` variable rows.
    pub variables_selection: String,
    /// Variable name (case-insensitive) whose value is the base URL.
    pub base_url_variable: String,
    /// Whether repeater blocks are expanded in parallel.
    pub parallel_expansion: bool,
    /// Whether recoverable HTML parse errors abort the render.
    pub strict_parsing: bool,
    /// Templates larger than this many bytes are rejected.
    pub max_template_bytes: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            repeater_tag: "repeater".to_string(),
            repeater_item_tag: "repeateritem".to_string(),
            selection_attribute: "dataselection".to_string(),
            image_tag: "img".to_string(),
            image_source_attribute: "src".to_string(),
            variables_selection: "variables".to_string(),
            base_url_variable: "baseurl".to_string(),
            parallel_expansion: true,
            strict_parsing: false,
            max_template_bytes: DEFAULT_MAX_TEMPLATE_BYTES,
        }
    }
}

/// The complete set of mailmerge settings.
///
/// # Examples
///
/// ```
/// use mailmerge_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.render.repeater_tag, "repeater");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level filter (e.g. "info", "debug", "mailmerge_template=trace").
    pub log_level: String,

    // ── Rendering ────────────────────────────────────────────────────

    /// Renderer configuration.
    pub render: RenderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
            render: RenderSettings::default(),
        }
    }
}
