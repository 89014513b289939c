#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use datastory_prep::data::{Cell, Value};
use datastory_prep::dataset::Dataset;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a file under `demos/`.
pub fn demo_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join(name)
}

pub fn num(value: f64) -> Cell {
    Some(Value::Number(value))
}

pub fn text(value: &str) -> Cell {
    Some(Value::Text(value.to_string()))
}

/// Builds a dataset from string column names, panicking on shape errors.
pub fn dataset(columns: &[&str], rows: Vec<Vec<Cell>>) -> Dataset {
    Dataset::new(columns.iter().map(|c| c.to_string()).collect(), rows).expect("valid dataset")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Copies a demo file into the workspace under the same name.
    pub fn copy_demo(&self, name: &str) -> PathBuf {
        let bytes = fs::read(demo_path(name)).expect("read demo file");
        self.write_bytes(name, &bytes)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read workspace file")
    }
}
