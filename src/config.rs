//! YAML pipeline definitions.
//!
//! A pipeline file declares named sources (ingested files), named steps (each
//! producing a dataset from earlier ones), and optional outputs. Sources and
//! steps share one namespace. Relative paths resolve against the directory
//! holding the pipeline file.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    cli::parse_delimiter,
    error::ConfigError,
    ingest::IngestOptions,
    io_utils,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Extra not-available tokens for this file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(flatten)]
    pub op: StepOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepOp {
    Melt {
        input: String,
        id_columns: Vec<String>,
        #[serde(default)]
        value_columns: Vec<String>,
        #[serde(default = "default_category_column")]
        category_column: String,
        #[serde(default = "default_value_column")]
        value_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strip_prefix: Option<usize>,
    },
    Scale {
        input: String,
        column: String,
        factor: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Merge {
        left: String,
        right: String,
        left_on: Vec<String>,
        right_on: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ratio: Option<RatioConfig>,
    },
    Ratio {
        input: String,
        numerator: String,
        denominator: String,
        output: String,
    },
    GroupMean {
        input: String,
        key: String,
    },
    PresentSorted {
        input: String,
        target: String,
        /// Defaults to `target`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sort_by: Option<String>,
    },
}

impl StepOp {
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            StepOp::Merge { left, right, .. } => vec![left.as_str(), right.as_str()],
            StepOp::Melt { input, .. }
            | StepOp::Scale { input, .. }
            | StepOp::Ratio { input, .. }
            | StepOp::GroupMean { input, .. }
            | StepOp::PresentSorted { input, .. } => vec![input.as_str()],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepOp::Melt { .. } => "melt",
            StepOp::Scale { .. } => "scale",
            StepOp::Merge { .. } => "merge",
            StepOp::Ratio { .. } => "ratio",
            StepOp::GroupMean { .. } => "group_mean",
            StepOp::PresentSorted { .. } => "present_sorted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatioConfig {
    pub numerator: String,
    pub denominator: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

fn default_category_column() -> String {
    crate::reshape::DEFAULT_CATEGORY_COLUMN.to_string()
}

fn default_value_column() -> String {
    crate::reshape::DEFAULT_VALUE_COLUMN.to_string()
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw, path)
    }

    /// `origin` is only used to label parse errors.
    pub fn from_yaml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Checks names, references, delimiters, and encodings before anything
    /// is read from disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut defined: HashSet<&str> = HashSet::new();
        for (name, source) in &self.sources {
            defined.insert(name.as_str());
            source.ingest_options(name)?;
        }
        for step in &self.steps {
            for input in step.op.inputs() {
                if !defined.contains(input) {
                    return Err(ConfigError::UnknownInput {
                        step: step.name.clone(),
                        input: input.to_string(),
                    });
                }
            }
            if !defined.insert(step.name.as_str()) {
                return Err(ConfigError::DuplicateName(step.name.clone()));
            }
        }
        for output in &self.outputs {
            if !defined.contains(output.dataset.as_str()) {
                return Err(ConfigError::UnknownOutput(output.dataset.clone()));
            }
            output.validate()?;
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn ingest_options(&self, name: &str) -> Result<IngestOptions, ConfigError> {
        let delimiter = match self.delimiter.as_deref() {
            Some(raw) => parse_delimiter(raw).map_err(|message| ConfigError::Delimiter {
                source_name: name.to_string(),
                message,
            })?,
            None => io_utils::resolve_input_delimiter(&self.path, None),
        };
        let mut options = IngestOptions::default()
            .with_delimiter(delimiter)
            .with_missing_tokens(self.missing.iter().cloned());
        if let Some(label) = self.encoding.as_deref() {
            let encoding = io_utils::lookup_encoding(label)
                .ok_or_else(|| ConfigError::Encoding(label.to_string()))?;
            options = options.with_encoding(encoding);
        }
        Ok(options)
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.csv.is_none() && self.series.is_none() {
            return Err(ConfigError::InvalidOutput {
                dataset: self.dataset.clone(),
                message: "expected a `csv` or `series` path".to_string(),
            });
        }
        if self.series.is_some() && (self.x.is_none() || self.y.is_none()) {
            return Err(ConfigError::InvalidOutput {
                dataset: self.dataset.clone(),
                message: "series output needs both `x` and `y`".to_string(),
            });
        }
        if let Some(raw) = self.delimiter.as_deref() {
            parse_delimiter(raw).map_err(|message| ConfigError::InvalidOutput {
                dataset: self.dataset.clone(),
                message,
            })?;
        }
        if let Some(label) = self.encoding.as_deref()
            && io_utils::lookup_encoding(label).is_none()
        {
            return Err(ConfigError::Encoding(label.to_string()));
        }
        Ok(())
    }
}

/// Joins `path` onto `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
