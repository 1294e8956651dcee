//! linkds CLI - Build an entity-linking training dataset
//!
//! Usage:
//!   linkds --filtered_items <csv> --link_annotations <jsonl> --page_map <csv> --output <dir>
//!   linkds --filtered_items <set> --link_annotations <jsonl> --page_map <csv>
//!
//! With `--output` the artifact is written to `<dir>/dataset.pkl`; without it
//! a timestamped artifact goes to the configured default directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::EnvFilter;

use linkds_builder::{count_records, run, BuildInputs, OutputTarget};
use linkds_core::config::LoggingConfig;
use linkds_core::{ArtifactFormat, BuilderConfig};

#[derive(Parser, Debug)]
#[command(name = "linkds")]
#[command(about = "Build (text, link span -> entity) training pairs from a link-annotated corpus")]
#[command(version)]
struct Cli {
    /// Path to filtered items file [csv table, json array, or bincode set]
    #[arg(long = "filtered_items")]
    filtered_items: PathBuf,

    /// Path to link annotated text file [json lines]
    #[arg(long = "link_annotations")]
    link_annotations: PathBuf,

    /// Path to page to item map file [csv, first column is the page id]
    #[arg(long = "page_map")]
    page_map: PathBuf,

    /// Directory where to save the dataset; omit for a timestamped file
    /// in the default dataset directory
    #[arg(long = "output")]
    output: Option<PathBuf>,

    /// Artifact encoding
    #[arg(long = "format", value_parser = parse_format)]
    format: Option<ArtifactFormat>,

    /// Annotation records read per chunk
    #[arg(long = "chunk_size")]
    chunk_size: Option<usize>,

    /// Optional TOML configuration file
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<ArtifactFormat, String> {
    s.parse().map_err(|e: linkds_core::ConfigError| e.to_string())
}

impl Cli {
    /// Defaults, then config file, then environment, then flags
    fn resolve_config(&self) -> anyhow::Result<BuilderConfig> {
        let base = match &self.config {
            Some(path) => BuilderConfig::from_file(path)?,
            None => BuilderConfig::default(),
        };
        let mut config = base.with_env_override()?;

        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.input.chunk_size = chunk_size;
        }
        config.validate()?;
        Ok(config)
    }

    fn target(&self, config: &BuilderConfig) -> OutputTarget {
        match &self.output {
            Some(dir) => OutputTarget::Directory(dir.clone()),
            None => OutputTarget::Timestamped(config.output.default_dir.clone()),
        }
    }

    fn inputs(&self) -> BuildInputs {
        BuildInputs {
            filtered_items: self.filtered_items.clone(),
            link_annotations: self.link_annotations.clone(),
            page_map: self.page_map.clone(),
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("linkds={0},linkds_builder={0}", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn progress_bar(total: u64) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stdout());
    progress.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:50.cyan/blue} {pos:>7}/{len:7} records ({eta})",
    )?);
    Ok(progress)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_tracing(&config.logging);
    tracing::debug!(?config, "Resolved configuration");

    let inputs = cli.inputs();
    let target = cli.target(&config);

    let total = count_records(&inputs.link_annotations)
        .with_context(|| format!("counting records in {}", inputs.link_annotations.display()))?;
    let progress = progress_bar(total)?;

    let report = run(&inputs, &target, &config, |records| {
        progress.inc(records as u64)
    })
    .context("dataset build failed")?;
    progress.finish();

    println!(
        "Saved {} entries to {}",
        report.entries,
        report.artifact.display()
    );
    Ok(())
}
