use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Prepare tabular open data for story-telling dashboards",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a delimited file and print its first rows as a table
    Preview(PreviewArgs),
    /// Run a YAML pipeline and write its outputs
    Run(RunArgs),
    /// Unpivot value columns into (category, value) rows
    Melt(MeltArgs),
    /// Average every numeric column per distinct key value
    GroupMean(GroupMeanArgs),
    /// Keep rows with a present target value and sort them ascending
    Rank(RankArgs),
}

/// How to read the single input file of an ad-hoc command.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character for reading input (defaults by extension)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Extra tokens to read as missing values, e.g. `..`
    #[arg(long = "missing", action = clap::ArgAction::Append)]
    pub missing: Vec<String>,
}

/// Where the result of an ad-hoc command goes.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output CSV file (prints a table to stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to comma)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output file (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Number of rows to print when no output file is given
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Pipeline definition (YAML)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Print this dataset as a table after the run
    #[arg(long)]
    pub show: Option<String>,
    /// Number of rows to print with --show
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// Run the steps without writing the declared outputs
    #[arg(long = "skip-outputs")]
    pub skip_outputs: bool,
}

#[derive(Debug, Args)]
pub struct MeltArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Identifier columns kept on every output row
    #[arg(long = "id", value_delimiter = ',', required = true)]
    pub id_columns: Vec<String>,
    /// Columns to unpivot (defaults to every non-identifier column)
    #[arg(long = "values", value_delimiter = ',')]
    pub value_columns: Vec<String>,
    /// Name of the output column holding former column names
    #[arg(long = "category-column", default_value = crate::reshape::DEFAULT_CATEGORY_COLUMN)]
    pub category_column: String,
    /// Name of the output column holding the values
    #[arg(long = "value-column", default_value = crate::reshape::DEFAULT_VALUE_COLUMN)]
    pub value_column: String,
    /// Drop this many leading characters from each category and parse the
    /// rest as a number (`y2005` -> 2005)
    #[arg(long = "strip-prefix")]
    pub strip_prefix: Option<usize>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct GroupMeanArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Column to group by
    #[arg(short = 'k', long = "key")]
    pub key: String,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Rows with a missing value in this column are dropped
    #[arg(short = 't', long = "target")]
    pub target: String,
    /// Sort column (defaults to the target column)
    #[arg(long = "sort-by")]
    pub sort_by: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err(format!("Delimiter '{other}' must be a single character"));
            }
            if !first.is_ascii() {
                return Err(format!("Delimiter '{other}' must be ASCII"));
            }
            Ok(first as u8)
        }
    }
}
