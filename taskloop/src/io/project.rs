//! Top-level project directories.
//!
//! A project groups tasks under one root and gives each its own isolated
//! subdirectory. Metadata/config key-value loading is a separate collaborator;
//! the project only owns persistence paths.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::io::task::Task;

/// Directory reserved for pipeline outputs; never listed as a task.
const OUTPUT_DIR: &str = "output";

/// A project directory containing zero or more tasks.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    output_dir: PathBuf,
}

impl Project {
    /// Open a project directory, creating it (and `output/`) if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let output_dir = root.join(OUTPUT_DIR);
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("create project directory {}", root.display()))?;
        Ok(Self { root, output_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create (or reopen) a task within this project.
    pub fn create_task(&self, name: &str) -> Result<Task> {
        validate_task_name(name)?;
        Task::open(self.root.join(name))
    }

    /// Return a task if its directory exists, otherwise `None`.
    pub fn get_task(&self, name: &str) -> Result<Option<Task>> {
        validate_task_name(name)?;
        let path = self.root.join(name);
        if path.is_dir() {
            return Ok(Some(Task::open(path)?));
        }
        Ok(None)
    }

    /// Names of tasks in this project, sorted. Skips `output/` and hidden
    /// directories.
    pub fn list_tasks(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("read project directory {}", self.root.display()))?;
        for entry in entries {
            let entry = entry.context("read project entry")?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == OUTPUT_DIR || name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

fn validate_task_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(anyhow!("task name must be non-empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(anyhow!("invalid task name '{name}'"));
    }
    Ok(())
}
