//! The `check` command.
//!
//! Inspects a template against a dataset without rendering it and reports
//! problems that would make the output silently incomplete.

use async_trait::async_trait;
use mailmerge_core::settings::RenderSettings;
use mailmerge_core::{MergeError, Settings};
use mailmerge_template::dataset::Dataset;
use mailmerge_template::renderer::{TemplateOutline, TemplateRenderer};

use crate::command::{read_input, required_arg, ManagementCommand};

/// Checks a template and dataset for binding problems.
pub struct CheckCommand;

/// The result of a single check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level of this check result.
    pub level: CheckLevel,
    /// A human-readable description of the issue.
    pub msg: String,
    /// An optional hint for how to resolve the issue.
    pub hint: Option<String>,
    /// A unique identifier for this check (e.g. "repeater.E001").
    pub id: String,
}

/// Severity levels for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    /// A warning that may indicate a problem.
    Warning,
    /// An error that must be resolved.
    Error,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Runs the checks for a template outline against a dataset.
pub fn run_checks(
    outline: &TemplateOutline,
    dataset: &Dataset,
    settings: &RenderSettings,
) -> Vec<CheckMessage> {
    let mut messages = Vec::new();

    for (index, block) in outline.repeaters.iter().enumerate() {
        let position = index + 1;
        match &block.selection {
            Some(selection) if !dataset.contains_selection(selection) => {
                messages.push(CheckMessage {
                    level: CheckLevel::Error,
                    msg: format!(
                        "Repeater block {position} is bound to selection '{selection}', which the dataset does not contain"
                    ),
                    hint: Some(format!(
                        "Available selections: {}",
                        dataset.selection_names().join(", ")
                    )),
                    id: "repeater.E001".to_string(),
                });
            }
            Some(_) => {}
            None => {
                messages.push(CheckMessage {
                    level: CheckLevel::Warning,
                    msg: format!(
                        "Repeater block {position} has no '{}' attribute and will render empty",
                        settings.selection_attribute
                    ),
                    hint: None,
                    id: "repeater.W001".to_string(),
                });
            }
        }

        if block.item_count == 0 {
            messages.push(CheckMessage {
                level: CheckLevel::Warning,
                msg: format!("Repeater block {position} contains no repeater items"),
                hint: Some(format!(
                    "Wrap the per-row markup in a <{}> element",
                    settings.repeater_item_tag
                )),
                id: "repeater.W002".to_string(),
            });
        }
    }

    if outline.images_without_source > 0 {
        messages.push(CheckMessage {
            level: CheckLevel::Warning,
            msg: format!(
                "{} image(s) have no '{}' attribute",
                outline.images_without_source, settings.image_source_attribute
            ),
            hint: None,
            id: "image.W001".to_string(),
        });
    }

    if outline.uses_resources
        && dataset
            .base_url(&settings.variables_selection, &settings.base_url_variable)
            .is_empty()
    {
        messages.push(CheckMessage {
            level: CheckLevel::Warning,
            msg: format!(
                "The template uses resource(...) but no '{}' variable is defined",
                settings.base_url_variable
            ),
            hint: Some(format!(
                "Add a row {{\"name\": \"{}\", \"value\": \"...\"}} to the '{}' selection",
                settings.base_url_variable, settings.variables_selection
            )),
            id: "resource.W001".to_string(),
        });
    }

    messages
}

#[async_trait]
impl ManagementCommand for CheckCommand {
    fn name(&self) -> &'static str {
        "check"
    }

    fn help(&self) -> &'static str {
        "Check a template against a JSON dataset"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .long("template")
                .short('t')
                .required(true)
                .value_name("FILE")
                .help("HTML template to check"),
        )
        .arg(
            clap::Arg::new("data")
                .long("data")
                .short('d')
                .required(true)
                .value_name("FILE")
                .help("JSON dataset the template will be rendered with"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), MergeError> {
        let template_path = required_arg(matches, "template")?;
        let data_path = required_arg(matches, "data")?;

        let template = read_input(template_path, "template").await?;
        let dataset = Dataset::from_json_str(&read_input(data_path, "dataset").await?)?;
        let outline = TemplateRenderer::from_settings(&settings.render).outline(&template)?;

        let messages = run_checks(&outline, &dataset, &settings.render);

        if messages.is_empty() {
            eprintln!("Check identified no issues");
            return Ok(());
        }

        let errors = messages.iter().filter(|m| m.level >= CheckLevel::Error).count();
        let warnings = messages.iter().filter(|m| m.level == CheckLevel::Warning).count();

        for msg in &messages {
            let hint_text = msg
                .hint
                .as_ref()
                .map_or(String::new(), |h| format!("\n\tHINT: {h}"));
            eprintln!("{} ({}): {}{}", msg.level, msg.id, msg.msg, hint_text);
        }

        eprintln!(
            "Check identified {} issue(s) ({} error(s), {} warning(s))",
            messages.len(),
            errors,
            warnings
        );

        if errors > 0 {
            return Err(MergeError::ConfigurationError(format!(
                "Check found {errors} error(s)"
            )));
        }

        Ok(())
    }
}
