//! The `render` command.
//!
//! Reads a template and a JSON dataset, renders the template, and writes the
//! result to a file or to stdout.

use async_trait::async_trait;
use mailmerge_core::logging::render_span;
use mailmerge_core::{MergeError, Settings};
use mailmerge_template::dataset::Dataset;
use mailmerge_template::renderer::TemplateRenderer;
use tokio::io::AsyncWriteExt;

use crate::command::{read_input, required_arg, ManagementCommand};

/// Renders a template against a dataset.
pub struct RenderCommand;

/// Loads the inputs and renders them on a blocking task.
///
/// # Errors
///
/// Returns an error if either file cannot be read, the dataset is not valid,
/// or the template cannot be rendered.
pub async fn render_files(
    template_path: &str,
    data_path: &str,
    settings: &Settings,
) -> Result<String, MergeError> {
    let (template, data) = tokio::try_join!(
        read_input(template_path, "template"),
        read_input(data_path, "dataset"),
    )?;
    let dataset = Dataset::from_json_str(&data)?;
    let renderer = TemplateRenderer::from_settings(&settings.render);
    let span = render_span(template_path);

    tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        renderer.render_template(&template, &dataset)
    })
    .await
    .map_err(|e| MergeError::IoError(std::io::Error::other(format!("render task failed: {e}"))))?
}

#[async_trait]
impl ManagementCommand for RenderCommand {
    fn name(&self) -> &'static str {
        "render"
    }

    fn help(&self) -> &'static str {
        "Render a template against a JSON dataset"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("template")
                .long("template")
                .short('t')
                .required(true)
                .value_name("FILE")
                .help("HTML template to render"),
        )
        .arg(
            clap::Arg::new("data")
                .long("data")
                .short('d')
                .required(true)
                .value_name("FILE")
                .help("JSON dataset: selection name -> array of rows"),
        )
        .arg(
            clap::Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Write the result here instead of stdout"),
        )
    }

    async fn handle(
        &self,
        matches: &clap::ArgMatches,
        settings: &Settings,
    ) -> Result<(), MergeError> {
        let template_path = required_arg(matches, "template")?;
        let data_path = required_arg(matches, "data")?;

        let html = render_files(template_path, data_path, settings).await?;

        if let Some(output) = matches.get_one::<String>("output") {
            tokio::fs::write(output, html.as_bytes()).await?;
            tracing::info!(output = %output, bytes = html.len(), "wrote rendered document");
        } else {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(html.as_bytes()).await?;
            stdout.flush().await?;
        }

        Ok(())
    }
}
