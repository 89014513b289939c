//! Runs a [`PipelineConfig`]: ingest every source, apply the steps in order,
//! then write the requested outputs.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use encoding_rs::UTF_8;
use log::{debug, info};

use crate::{
    aggregate,
    cli::parse_delimiter,
    config::{OutputConfig, PipelineConfig, RatioConfig, StepConfig, StepOp, resolve_path},
    dataset::Dataset,
    derive::{self, JoinSpec, RatioSpec},
    error::{ConfigError, PipelineError},
    export::{self, SeriesSpec},
    ingest, io_utils,
    reshape::{self, MeltSpec},
};

/// Every dataset produced by a run, keyed by source or step name.
pub type Datasets = BTreeMap<String, Dataset>;

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    base_dir: PathBuf,
}

impl Pipeline {
    /// Loads and validates a pipeline file. Relative paths inside it resolve
    /// against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = PipelineConfig::load(path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::new(config, base_dir)
    }

    pub fn new(config: PipelineConfig, base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            base_dir: base_dir.into(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<Datasets, PipelineError> {
        let mut datasets = Datasets::new();
        for (name, source) in &self.config.sources {
            let options = source.ingest_options(name)?;
            let path = resolve_path(&self.base_dir, &source.path);
            let dataset = ingest::ingest(&path, &options).map_err(|source| {
                PipelineError::Ingest {
                    step: name.clone(),
                    source,
                }
            })?;
            info!(
                "Loaded source '{name}' from {:?}: {} row(s) x {} column(s)",
                path,
                dataset.row_count(),
                dataset.column_count()
            );
            datasets.insert(name.clone(), dataset);
        }

        for step in &self.config.steps {
            let dataset = apply_step(step, &datasets)?;
            info!(
                "Step '{}' ({}) produced {} row(s) x {} column(s)",
                step.name,
                step.op.kind(),
                dataset.row_count(),
                dataset.column_count()
            );
            debug!("Step '{}' fingerprint {}", step.name, dataset.fingerprint());
            datasets.insert(step.name.clone(), dataset);
        }
        Ok(datasets)
    }

    /// Writes every configured output and returns how many files were written.
    pub fn write_outputs(&self, datasets: &Datasets) -> Result<usize, PipelineError> {
        let mut written = 0usize;
        for output in &self.config.outputs {
            let dataset = datasets
                .get(&output.dataset)
                .ok_or_else(|| ConfigError::UnknownOutput(output.dataset.clone()))?;
            let export_err = |source| PipelineError::Export {
                dataset: output.dataset.clone(),
                source,
            };
            if let Some(csv_path) = &output.csv {
                let path = resolve_path(&self.base_dir, csv_path);
                let delimiter = output_delimiter(output, &path)?;
                let encoding = match output.encoding.as_deref() {
                    Some(label) => io_utils::lookup_encoding(label)
                        .ok_or_else(|| ConfigError::Encoding(label.to_string()))?,
                    None => UTF_8,
                };
                export::write_csv(dataset, &path, delimiter, encoding).map_err(export_err)?;
                written += 1;
            }
            if let (Some(series_path), Some(x), Some(y)) = (&output.series, &output.x, &output.y) {
                let spec = SeriesSpec {
                    x: x.clone(),
                    y: y.clone(),
                    group_by: output.group_by.clone(),
                };
                let series = export::series(dataset, &spec).map_err(export_err)?;
                let path = resolve_path(&self.base_dir, series_path);
                export::write_series(&series, &path).map_err(export_err)?;
                written += 1;
            }
        }
        Ok(written)
    }
}

fn output_delimiter(output: &OutputConfig, path: &Path) -> Result<u8, ConfigError> {
    match output.delimiter.as_deref() {
        Some(raw) => parse_delimiter(raw).map_err(|message| ConfigError::InvalidOutput {
            dataset: output.dataset.clone(),
            message,
        }),
        None => Ok(io_utils::resolve_output_delimiter(
            path,
            None,
            io_utils::DEFAULT_CSV_DELIMITER,
        )),
    }
}

fn input<'a>(datasets: &'a Datasets, step: &str, name: &str) -> Result<&'a Dataset, ConfigError> {
    datasets.get(name).ok_or_else(|| ConfigError::UnknownInput {
        step: step.to_string(),
        input: name.to_string(),
    })
}

fn ratio_spec(config: &RatioConfig) -> RatioSpec {
    RatioSpec::new(&config.numerator, &config.denominator, &config.output)
}

fn apply_step(step: &StepConfig, datasets: &Datasets) -> Result<Dataset, PipelineError> {
    let name = step.name.as_str();
    let reshape_err = |source| PipelineError::Reshape {
        step: name.to_string(),
        source,
    };
    let derive_err = |source| PipelineError::Derive {
        step: name.to_string(),
        source,
    };
    let aggregate_err = |source| PipelineError::Aggregate {
        step: name.to_string(),
        source,
    };

    let dataset = match &step.op {
        StepOp::Melt {
            input: source,
            id_columns,
            value_columns,
            category_column,
            value_column,
            strip_prefix,
        } => {
            let mut spec = MeltSpec::new(id_columns, value_columns)
                .named(category_column, value_column);
            if let Some(chars) = *strip_prefix {
                spec = spec.strip_prefix(chars);
            }
            reshape::melt(input(datasets, name, source)?, &spec).map_err(reshape_err)?
        }
        StepOp::Scale {
            input: source,
            column,
            factor,
            output,
        } => derive::scale(
            input(datasets, name, source)?,
            column,
            *factor,
            output.as_deref(),
        )
        .map_err(derive_err)?,
        StepOp::Merge {
            left,
            right,
            left_on,
            right_on,
            ratio,
        } => {
            let left = input(datasets, name, left)?;
            let right = input(datasets, name, right)?;
            let join = JoinSpec::new(left_on, right_on);
            let merged = match ratio {
                Some(ratio) => derive::merge_and_derive(left, right, &join, &ratio_spec(ratio)),
                None => derive::merge(left, right, &join),
            };
            merged.map_err(derive_err)?
        }
        StepOp::Ratio {
            input: source,
            numerator,
            denominator,
            output,
        } => derive::ratio(
            input(datasets, name, source)?,
            &RatioSpec::new(numerator, denominator, output),
        )
        .map_err(derive_err)?,
        StepOp::GroupMean { input: source, key } => {
            aggregate::group_mean(input(datasets, name, source)?, key).map_err(aggregate_err)?
        }
        StepOp::PresentSorted {
            input: source,
            target,
            sort_by,
        } => aggregate::present_sorted(
            input(datasets, name, source)?,
            target,
            sort_by.as_deref().unwrap_or(target),
        )
        .map_err(aggregate_err)?,
    };
    Ok(dataset)
}
