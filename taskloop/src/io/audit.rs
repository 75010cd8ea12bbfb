//! Scoped per-stage logging.
//!
//! Each orchestration stage (planner, environment, runner, analyst, model)
//! runs inside a node-log scope: a uniquely named file under `logs/` receives
//! everything the stage writes, and exactly one reference line lands in the
//! master index when the scope exits, on success and on failure alike. The
//! index stays a small one-line-per-stage timeline while the per-stage files
//! absorb the bulk (raw stdout/stderr, provider payloads).
//!
//! Invariant: no orphaned log files, no index entries pointing at missing
//! files. A stage failure is written into its own log before it propagates,
//! so the failure itself is part of the permanent record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use tracing::debug;

use crate::core::environment::ExecutionEnv;
use crate::core::types::{Plan, render_value};
use crate::error::LogIoFailure;
use crate::io::task::{LOGS_DIR, Task};

/// Timestamp format used for index lines and log file names. Second
/// resolution; non-decreasing across appends within a task.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Open log resource for one stage invocation. Obtained through
/// [`Task::with_node_log`]; never outlives its scope.
#[derive(Debug)]
pub struct NodeLog {
    node: String,
    timestamp: String,
    rel_path: String,
    path: PathBuf,
    file: BufWriter<File>,
}

impl NodeLog {
    /// Write one informational line.
    pub fn info(&mut self, message: &str) -> Result<()> {
        self.write_line("INFO", message)
    }

    /// Write one error line.
    pub fn error(&mut self, message: &str) -> Result<()> {
        self.write_line("ERROR", message)
    }

    /// Node name this log belongs to.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Path of the log file relative to the task root, as indexed.
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    /// Timestamp embedded in the file name and the index line.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn write_line(&mut self, level: &str, message: &str) -> Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.file, "{now} {level} {message}")
            .map_err(|err| LogIoFailure::new(&self.path, err))?;
        Ok(())
    }

    fn close(mut self) -> Result<(String, String, String)> {
        self.file
            .flush()
            .map_err(|err| LogIoFailure::new(&self.path, err))?;
        Ok((self.node, self.rel_path, self.timestamp))
    }
}

/// Rendering used for `"<label>: <result>"` stage log lines.
///
/// Distinct from `Display` so string-ish results print bare and structured
/// results print as compact JSON, matching report formatting.
pub trait StageResult {
    fn render(&self) -> String;
}

impl StageResult for String {
    fn render(&self) -> String {
        self.clone()
    }
}

impl StageResult for serde_json::Value {
    fn render(&self) -> String {
        render_value(self)
    }
}

impl StageResult for ExecutionEnv {
    fn render(&self) -> String {
        self.as_str().to_string()
    }
}

impl StageResult for Plan {
    fn render(&self) -> String {
        let descriptions: Vec<&str> = self
            .steps()
            .iter()
            .map(|step| step.description.as_str())
            .collect();
        format!("{} step(s): [{}]", self.len(), descriptions.join("; "))
    }
}

impl Task {
    /// Acquire a per-node log scope and run `f` inside it.
    ///
    /// Guarantees, on every exit path including a failing `f`:
    /// the log file is flushed and closed, and exactly one reference to it is
    /// appended to the master index. A failure from `f` is logged as an error
    /// inside the scope before it propagates, with the node name and log path
    /// added as context.
    pub fn with_node_log<T>(
        &self,
        node: &str,
        f: impl FnOnce(&mut NodeLog) -> Result<T>,
    ) -> Result<T> {
        let mut log = self.open_node_log(node)?;
        debug!(node, path = %log.rel_path(), "opened stage log");

        let result = f(&mut log);
        if let Err(err) = &result {
            // The failure must be part of the permanent record. If even this
            // write fails the audit substrate is broken, which is fatal.
            log.error(&format!("{err:#}"))?;
        }

        let (node, rel_path, timestamp) = log.close()?;
        self.append_log_reference(&node, &rel_path, &timestamp)?;
        // Callers locating the failure get the stage and its log file without
        // consulting the index first.
        result.map_err(|err| err.context(format!("stage '{node}' failed, details in {rel_path}")))
    }

    /// Run one stage with standard input/result logging.
    ///
    /// Logs `"inputs: <inputs>"` (when non-empty), invokes `f`, then logs
    /// `"<result_label>: <result>"`. Failures from `f` propagate after being
    /// logged by the surrounding scope.
    pub fn run_stage<T: StageResult>(
        &self,
        node: &str,
        inputs: &str,
        result_label: &str,
        f: impl FnOnce(&mut NodeLog) -> Result<T>,
    ) -> Result<T> {
        self.with_node_log(node, |log| {
            if !inputs.is_empty() {
                log.info(&format!("inputs: {inputs}"))?;
            }
            let result = f(log)?;
            log.info(&format!("{result_label}: {}", result.render()))?;
            Ok(result)
        })
    }

    fn open_node_log(&self, node: &str) -> Result<NodeLog> {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        // Same-second reopens of the same node get a numeric disambiguator
        // placed before `_<node>` so `logs/*_<node>.log` globbing still works.
        let mut file_name = format!("{timestamp}_{node}.log");
        let mut n = 1;
        while self.logs_dir.join(&file_name).exists() {
            n += 1;
            file_name = format!("{timestamp}-{n}_{node}.log");
        }
        let path = self.logs_dir.join(&file_name);
        let file = File::create(&path).map_err(|err| LogIoFailure::new(&path, err))?;

        Ok(NodeLog {
            node: node.to_string(),
            timestamp,
            rel_path: format!("{LOGS_DIR}/{file_name}"),
            path,
            file: BufWriter::new(file),
        })
    }
}
