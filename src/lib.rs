pub mod aggregate;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod export;
pub mod ingest;
pub mod io_utils;
pub mod pipeline;
pub mod reshape;
pub mod table;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InputArgs, OutputArgs},
    dataset::Dataset,
    ingest::IngestOptions,
    io_utils::printable_delimiter,
    pipeline::Pipeline,
    reshape::MeltSpec,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datastory_prep", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Preview(args) => handle_preview(&args),
        Commands::Run(args) => handle_run(&args),
        Commands::Melt(args) => handle_melt(&args),
        Commands::GroupMean(args) => handle_group_mean(&args),
        Commands::Rank(args) => handle_rank(&args),
    }
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let dataset = load_input(&args.source)?;
    info!(
        "Loaded {} row(s) x {} column(s), fingerprint {}",
        dataset.row_count(),
        dataset.column_count(),
        dataset.fingerprint()
    );
    table::print_dataset(&dataset, args.rows);
    Ok(())
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let pipeline = Pipeline::load(&args.config)
        .with_context(|| format!("Loading pipeline from {:?}", args.config))?;
    info!(
        "Running pipeline {:?}: {} source(s), {} step(s)",
        args.config,
        pipeline.config().sources.len(),
        pipeline.config().steps.len()
    );
    let datasets = pipeline
        .run()
        .with_context(|| format!("Running pipeline {:?}", args.config))?;
    for (name, dataset) in &datasets {
        debug!("Dataset '{name}' fingerprint {}", dataset.fingerprint());
    }
    if args.skip_outputs {
        info!("Skipping {} output(s)", pipeline.config().outputs.len());
    } else {
        let written = pipeline
            .write_outputs(&datasets)
            .with_context(|| format!("Writing outputs of {:?}", args.config))?;
        info!("Wrote {written} output file(s)");
    }
    if let Some(name) = &args.show {
        let dataset = datasets
            .get(name)
            .with_context(|| format!("Pipeline has no dataset named '{name}'"))?;
        table::print_dataset(dataset, args.rows);
    }
    Ok(())
}

fn handle_melt(args: &cli::MeltArgs) -> Result<()> {
    let dataset = load_input(&args.source)?;
    let mut spec = MeltSpec::new(&args.id_columns, &args.value_columns)
        .named(&args.category_column, &args.value_column);
    if let Some(chars) = args.strip_prefix {
        spec = spec.strip_prefix(chars);
    }
    let melted = reshape::melt(&dataset, &spec)
        .with_context(|| format!("Melting {:?}", args.source.input))?;
    emit(&melted, &args.output)
}

fn handle_group_mean(args: &cli::GroupMeanArgs) -> Result<()> {
    let dataset = load_input(&args.source)?;
    let grouped = aggregate::group_mean(&dataset, &args.key)
        .with_context(|| format!("Grouping {:?} by '{}'", args.source.input, args.key))?;
    emit(&grouped, &args.output)
}

fn handle_rank(args: &cli::RankArgs) -> Result<()> {
    let dataset = load_input(&args.source)?;
    let sort_by = args.sort_by.as_deref().unwrap_or(&args.target);
    let ranked = aggregate::present_sorted(&dataset, &args.target, sort_by)
        .with_context(|| format!("Ranking {:?} by '{sort_by}'", args.source.input))?;
    emit(&ranked, &args.output)
}

fn load_input(args: &InputArgs) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Reading '{}' with delimiter '{}' ({})",
        args.input.display(),
        printable_delimiter(delimiter),
        encoding.name()
    );
    let options = IngestOptions::default()
        .with_delimiter(delimiter)
        .with_encoding(encoding)
        .with_missing_tokens(args.missing.iter().cloned());
    ingest::ingest(&args.input, &options)
        .with_context(|| format!("Ingesting {:?}", args.input))
}

fn emit(dataset: &Dataset, args: &OutputArgs) -> Result<()> {
    match &args.output {
        Some(path) => write_output(dataset, path, args),
        None => {
            table::print_dataset(dataset, args.rows);
            Ok(())
        }
    }
}

fn write_output(dataset: &Dataset, path: &Path, args: &OutputArgs) -> Result<()> {
    let delimiter = io_utils::resolve_output_delimiter(
        path,
        args.output_delimiter,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    export::write_csv(dataset, path, delimiter, encoding)
        .with_context(|| format!("Writing output to {path:?}"))
}
