//! Typed Config Validator CLI
//!
//! Validates configuration documents against a schema descriptor set.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use typed_config::config::{load_document, OutputFormat, ValidatorConfig};
use typed_config::report::Report;
use typed_config::{Options, SchemaSet};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "typed-config-validate")]
#[command(about = "Validate configuration documents against a typed schema")]
struct Cli {
    /// Schema descriptor set (JSON or TOML)
    #[arg(short, long)]
    schema: PathBuf,

    /// Schema to validate against (defaults to the set's root)
    #[arg(short, long)]
    root: Option<String>,

    /// Validator settings file
    #[arg(short, long)]
    config: Option<String>,

    /// Accept keys the root schema does not declare
    #[arg(long)]
    ignore_unknown: bool,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Merge <PREFIX>__* environment variables into the documents
    #[arg(long)]
    env_prefix: Option<String>,

    /// Validate every .toml/.json file below this directory separately
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Documents merged in order into one configuration
    files: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let settings = ValidatorConfig::load_from(cli.config.as_deref())
        .context("loading validator settings")?;

    let set = SchemaSet::load(&cli.schema)
        .with_context(|| format!("loading schema set {}", cli.schema.display()))?;
    let mut schema = match &cli.root {
        Some(name) => set.build(name)?,
        None => set.build_root()?,
    };
    if cli.ignore_unknown || settings.validation.ignore_unknown {
        schema.set_options(Options::IgnoreUnknown);
    }

    let format = cli.format.unwrap_or(settings.report.output_format);
    let candidates = settings.report.suggest.then(|| schema.property_paths());
    let env_prefix = cli.env_prefix.or(settings.validation.env_prefix);

    let mut sources: Vec<(String, Vec<PathBuf>)> = Vec::new();
    if !cli.files.is_empty() {
        let label = cli
            .files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        sources.push((label, cli.files.clone()));
    }
    if let Some(dir) = &cli.dir {
        for path in config_files(dir) {
            sources.push((path.display().to_string(), vec![path]));
        }
    }
    if sources.is_empty() {
        bail!("no documents given: pass files or --dir");
    }

    let mut all_valid = true;
    for (label, paths) in sources {
        debug!(source = %label, "validating");
        let document = match load_document(&paths, env_prefix.as_deref()) {
            Ok(document) => document,
            Err(e) => {
                warn!(source = %label, error = %e, "could not load document");
                println!("❌ {} - could not be loaded: {}", label, e);
                all_valid = false;
                continue;
            }
        };

        let result = schema.bind(&document);
        let report = Report { source: label, outcome: result.as_ref() };
        println!("{}", report.render(format, candidates.as_deref())?);
        all_valid &= report.is_valid();
    }

    Ok(all_valid)
}

fn config_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .map(|ext| ext == "toml" || ext == "json")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
