//! Template rendering: repeater expansion and image rewriting.
//!
//! The [`TemplateRenderer`] is the central entry point. A render:
//!
//! 1. resolves the base URL from the variables selection;
//! 2. locates every repeater block in the template source and replaces it
//!    with its items expanded once per row of its data selection;
//! 3. parses the expanded markup into a [`Document`];
//! 4. rewrites every image source through the expression evaluator;
//! 5. serializes the document.
//!
//! Blocks are expanded before the HTML parser sees the template, so a block
//! sitting inside a table or paragraph keeps its items. Expansions only read
//! the dataset and their own source text, so they are computed in parallel
//! and spliced back in source order.

use std::borrow::Cow;
use std::io::Write;

use mailmerge_core::error::{MergeError, MergeResult};
use mailmerge_core::settings::RenderSettings;
use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::dom::{self, Document};
use crate::expression::{self, Call, Segment};
use crate::markup::{self, SourceElement};

/// Renders templates against datasets.
///
/// # Examples
///
/// ```
/// use mailmerge_template::dataset::{Dataset, Row};
/// use mailmerge_template::renderer::TemplateRenderer;
///
/// let dataset = Dataset::new().with_selection(
///     "people",
///     vec![Row::new().with("name", "Ann"), Row::new().with("name", "Bob")],
/// );
/// let template = concat!(
///     "<ul><sg:repeater dataselection=\"people\">",
///     "<sg:repeateritem><li>[% itemValue('name') %]</li></sg:repeateritem>",
///     "</sg:repeater></ul>",
/// );
///
/// let html = TemplateRenderer::new().render_template(template, &dataset).unwrap();
/// assert!(html.contains("<ul><li>Ann</li><li>Bob</li></ul>"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    settings: RenderSettings,
}

/// The source text needed to expand one repeater block.
#[derive(Debug)]
struct Expansion<'a> {
    selection: &'a str,
    fragments: Vec<&'a str>,
}

/// A structural summary of a template, used for static checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOutline {
    /// Repeater blocks in document order.
    pub repeaters: Vec<RepeaterOutline>,
    /// Number of image elements.
    pub image_count: usize,
    /// Number of image elements without a source attribute.
    pub images_without_source: usize,
    /// Whether any expression in the template is a `resource(...)` call.
    pub uses_resources: bool,
}

/// Summary of one repeater block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeaterOutline {
    /// The block's data selection attribute, if present.
    pub selection: Option<String>,
    /// Number of repeater items inside the block.
    pub item_count: usize,
}

impl TemplateRenderer {
    /// Creates a renderer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer from the given settings.
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Returns the renderer's settings.
    pub const fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Renders a template against a dataset and returns the resulting markup.
    ///
    /// Missing selections, fields, and attributes render as empty output.
    /// Only an unusable template (too large, or unparsable in strict mode)
    /// is an error.
    pub fn render_template(&self, template: &str, dataset: &Dataset) -> MergeResult<String> {
        self.check_size(template)?;

        let base_url = dataset.base_url(
            &self.settings.variables_selection,
            &self.settings.base_url_variable,
        );
        tracing::debug!(base_url = %base_url, "resolved base URL");

        let expanded = self.expand_repeaters(template, dataset, &base_url);
        let document = Document::parse(&expanded, self.settings.strict_parsing)?;
        self.rewrite_images(&document, &base_url);

        document.to_html()
    }

    /// Renders a template and writes the markup to `writer`.
    pub fn render_to_writer<W: Write>(
        &self,
        template: &str,
        dataset: &Dataset,
        mut writer: W,
    ) -> MergeResult<()> {
        let html = self.render_template(template, dataset)?;
        writer.write_all(html.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Summarizes the repeater blocks and images of a template without
    /// rendering it.
    pub fn outline(&self, template: &str) -> MergeResult<TemplateOutline> {
        self.check_size(template)?;
        let document = Document::parse(template, self.settings.strict_parsing)?;

        let repeaters = markup::find_elements(template, &self.settings.repeater_tag)
            .iter()
            .map(|block| RepeaterOutline {
                selection: block
                    .attribute(&self.settings.selection_attribute)
                    .map(str::to_string),
                item_count: markup::find_elements(block.content, &self.settings.repeater_item_tag)
                    .len(),
            })
            .collect();

        let images = dom::find_elements(document.root(), &self.settings.image_tag);
        let images_without_source = images
            .iter()
            .filter(|img| dom::attribute(img, &self.settings.image_source_attribute).is_none())
            .count();

        let uses_resources = expression::tokenize(template).into_iter().any(|segment| {
            matches!(segment, Segment::Expression(body) if matches!(Call::parse(body), Some(Call::Resource(_))))
        });

        Ok(TemplateOutline {
            repeaters,
            image_count: images.len(),
            images_without_source,
            uses_resources,
        })
    }

    fn check_size(&self, template: &str) -> MergeResult<()> {
        let limit = self.settings.max_template_bytes;
        if template.len() > limit {
            return Err(MergeError::TemplateTooLarge {
                size: template.len(),
                limit,
            });
        }
        Ok(())
    }

    /// Replaces every repeater block in the source with its expansion.
    fn expand_repeaters<'t>(
        &self,
        template: &'t str,
        dataset: &Dataset,
        base_url: &str,
    ) -> Cow<'t, str> {
        let blocks = markup::find_elements(template, &self.settings.repeater_tag);
        if blocks.is_empty() {
            return Cow::Borrowed(template);
        }

        let jobs: Vec<Expansion<'_>> = blocks
            .iter()
            .map(|block| self.prepare_expansion(block))
            .collect();

        let expand = |job: &Expansion<'_>| expand_block(job, dataset, base_url);
        let expansions: Vec<String> = if self.settings.parallel_expansion && jobs.len() > 1 {
            jobs.par_iter().map(expand).collect()
        } else {
            jobs.iter().map(expand).collect()
        };
        tracing::debug!(blocks = blocks.len(), "expanded repeater blocks");

        let edits: Vec<_> = blocks
            .into_iter()
            .map(|block| block.span)
            .zip(expansions)
            .collect();
        Cow::Owned(markup::splice(template, &edits))
    }

    /// Reads a block's selection name and the source text of its own items.
    fn prepare_expansion<'a>(&self, block: &SourceElement<'a>) -> Expansion<'a> {
        Expansion {
            selection: block
                .attribute(&self.settings.selection_attribute)
                .unwrap_or_default(),
            fragments: markup::find_elements(block.content, &self.settings.repeater_item_tag)
                .into_iter()
                .map(|item| item.content)
                .collect(),
        }
    }

    /// Resolves resource expressions in every image source attribute.
    fn rewrite_images(&self, document: &Document, base_url: &str) {
        let attr = &self.settings.image_source_attribute;
        let mut rewritten = 0_usize;
        for image in dom::find_elements(document.root(), &self.settings.image_tag) {
            let Some(source) = dom::attribute(&image, attr) else {
                continue;
            };
            let resolved = expression::render_expressions(&source, base_url, None);
            if resolved != source {
                dom::set_attribute(&image, attr, &resolved);
                rewritten += 1;
            }
        }
        tracing::debug!(rewritten, "rewrote image sources");
    }
}

/// Evaluates each item fragment once per row of the block's selection.
///
/// Items are expanded in order, each against the full row sequence, and the
/// results are concatenated without separators.
fn expand_block(job: &Expansion<'_>, dataset: &Dataset, base_url: &str) -> String {
    let Some(rows) = dataset.selection(job.selection) else {
        tracing::debug!(selection = %job.selection, "data selection not found, block renders empty");
        return String::new();
    };

    tracing::debug!(
        selection = %job.selection,
        rows = rows.len(),
        items = job.fragments.len(),
        "expanding repeater block"
    );

    let mut output = String::new();
    for fragment in &job.fragments {
        for row in rows {
            output.push_str(&expression::render_expressions(fragment, base_url, Some(row)));
        }
    }
    output
}

/// Renders a template against a dataset with default settings.
///
/// # Examples
///
/// ```
/// use mailmerge_template::dataset::Dataset;
/// use mailmerge_template::renderer::render_template;
///
/// let dataset: Dataset =
///     r#"{"variables": [{"name": "baseurl", "value": "https://cdn.example.com"}]}"#
///         .parse()
///         .unwrap();
/// let html = render_template("<img src=\"[% resource('/logo.png') %]\">", &dataset).unwrap();
/// assert!(html.contains("<img src=\"https://cdn.example.com/logo.png\">"));
/// ```
pub fn render_template(template: &str, dataset: &Dataset) -> MergeResult<String> {
    TemplateRenderer::new().render_template(template, dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;

    fn rows(field: &str, values: &[&str]) -> Vec<Row> {
        values.iter().map(|v| Row::new().with(field, *v)).collect()
    }

    fn body_of(html: &str) -> &str {
        let start = html.find("<body>").map_or(0, |i| i + "<body>".len());
        let end = html.rfind("</body>").unwrap_or(html.len());
        &html[start..end]
    }

    #[test]
    fn test_expand_block_row_order() {
        let dataset = Dataset::new().with_selection("s", rows("x", &["1", "2", "3"]));
        let job = Expansion {
            selection: "s",
            fragments: vec!["<b>[% itemValue('x') %]</b>"],
        };
        assert_eq!(expand_block(&job, &dataset, ""), "<b>1</b><b>2</b><b>3</b>");
    }

    #[test]
    fn test_expand_block_items_times_rows() {
        let dataset = Dataset::new().with_selection("s", rows("x", &["a", "b"]));
        let job = Expansion {
            selection: "s",
            fragments: vec!["1[% itemValue('x') %]", "2[% itemValue('x') %]"],
        };
        assert_eq!(expand_block(&job, &dataset, ""), "1a1b2a2b");
    }

    #[test]
    fn test_expand_block_unbound_is_empty() {
        let job = Expansion {
            selection: "missing",
            fragments: vec!["x"],
        };
        assert_eq!(expand_block(&job, &Dataset::new(), ""), "");
    }

    #[test]
    fn test_render_repeater_replaces_block() {
        let dataset = Dataset::new().with_selection("s", rows("x", &["1", "2", "3"]));
        let template = "<p>a</p><sg:repeater dataselection=\"s\"><sg:repeateritem><i>[% itemValue('x') %]</i></sg:repeateritem></sg:repeater><p>b</p>";
        let html = render_template(template, &dataset).unwrap();
        assert_eq!(body_of(&html), "<p>a</p><i>1</i><i>2</i><i>3</i><p>b</p>");
        assert!(!html.contains("repeater"));
    }

    #[test]
    fn test_render_missing_selection_attribute() {
        let dataset = Dataset::new().with_selection("", rows("x", &["only"]));
        let template = "<repeater><repeateritem>[% itemValue('x') %]</repeateritem></repeater>";
        // An absent attribute reads as the empty selection name.
        let html = render_template(template, &dataset).unwrap();
        assert_eq!(body_of(&html), "only");
    }

    #[test]
    fn test_render_sequential_matches_parallel() {
        let dataset = Dataset::new()
            .with_selection("a", rows("x", &["1", "2"]))
            .with_selection("b", rows("x", &["3"]));
        let template = "<repeater dataselection=\"a\"><repeateritem>[% itemValue('x') %]</repeateritem></repeater>|<repeater dataselection=\"b\"><repeateritem>[% itemValue('x') %]</repeateritem></repeater>";

        let parallel = TemplateRenderer::new().render_template(template, &dataset).unwrap();
        let sequential = TemplateRenderer::from_settings(&RenderSettings {
            parallel_expansion: false,
            ..RenderSettings::default()
        })
        .render_template(template, &dataset)
        .unwrap();

        assert_eq!(parallel, sequential);
        assert_eq!(body_of(&parallel), "12|3");
    }

    #[test]
    fn test_render_too_large() {
        let renderer = TemplateRenderer::from_settings(&RenderSettings {
            max_template_bytes: 4,
            ..RenderSettings::default()
        });
        let err = renderer.render_template("<p>long</p>", &Dataset::new()).unwrap_err();
        assert!(matches!(err, MergeError::TemplateTooLarge { size: 11, limit: 4 }));
    }

    #[test]
    fn test_render_to_writer() {
        let mut out = Vec::new();
        TemplateRenderer::new()
            .render_to_writer("<p>x</p>", &Dataset::new(), &mut out)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("<p>x</p>"));
    }

    #[test]
    fn test_outline() {
        let template = concat!(
            "<repeater dataselection=\"a\"><repeateritem>x</repeateritem><repeateritem>y</repeateritem></repeater>",
            "<repeater></repeater>",
            "<img src=\"[% resource('/a.png') %]\"><img alt=\"none\">",
        );
        let outline = TemplateRenderer::new().outline(template).unwrap();
        assert_eq!(
            outline.repeaters,
            vec![
                RepeaterOutline {
                    selection: Some("a".into()),
                    item_count: 2
                },
                RepeaterOutline {
                    selection: None,
                    item_count: 0
                },
            ]
        );
        assert_eq!(outline.image_count, 2);
        assert_eq!(outline.images_without_source, 1);
        assert!(outline.uses_resources);
    }

    #[test]
    fn test_outline_without_resources() {
        let outline = TemplateRenderer::new()
            .outline("<p>[% itemValue('resource') %]</p>")
            .unwrap();
        assert!(!outline.uses_resources);
        assert!(outline.repeaters.is_empty());
    }
}
