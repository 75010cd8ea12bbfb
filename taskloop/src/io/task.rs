//! Durable task containers.
//!
//! A task owns one directory holding its whole audit trail:
//!
//! - `chat.txt`: append-only transcript, one `"<role>: <message>"` line per turn
//! - `log.txt`: append-only master index, one `"<timestamp> <node>: <path>"`
//!   line per stage invocation
//! - `logs/`: one log file per stage invocation
//!
//! The transcript and index exist (created empty) before any append. Retention
//! is an external concern; nothing here ever deletes task state. A task
//! directory assumes a single writer at a time: line-level append atomicity
//! across concurrent orchestrators is not relied upon.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::LogIoFailure;

/// Transcript file name under a task root.
pub const CHAT_FILE: &str = "chat.txt";
/// Master log-index file name under a task root.
pub const INDEX_FILE: &str = "log.txt";
/// Per-stage log directory name under a task root.
pub const LOGS_DIR: &str = "logs";

/// One isolated orchestration run with its own durable audit trail.
#[derive(Debug, Clone)]
pub struct Task {
    pub(crate) root: PathBuf,
    pub(crate) chat_path: PathBuf,
    pub(crate) index_path: PathBuf,
    pub(crate) logs_dir: PathBuf,
}

impl Task {
    /// Open a task directory, creating the layout if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let logs_dir = root.join(LOGS_DIR);
        std::fs::create_dir_all(&logs_dir).map_err(|err| LogIoFailure::new(&logs_dir, err))?;

        let task = Self {
            chat_path: root.join(CHAT_FILE),
            index_path: root.join(INDEX_FILE),
            logs_dir,
            root,
        };
        // Both append-only files must exist before the first append.
        task.touch(&task.chat_path)?;
        task.touch(&task.index_path)?;
        Ok(task)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chat_path(&self) -> &Path {
        &self.chat_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Append one `"<role>: <message>"` line to the transcript.
    ///
    /// The format is line-oriented, so embedded newlines are flattened to the
    /// literal two-character escape `\n`.
    pub fn append_chat(&self, role: &str, message: &str) -> Result<()> {
        let flat = message.replace('\r', "").replace('\n', "\\n");
        self.append_line(&self.chat_path, &format!("{role}: {flat}"))
    }

    /// Append one `"<timestamp> <node>: <relative-path>"` line to the master
    /// index. `rel_path` is relative to the task root.
    pub fn append_log_reference(&self, node: &str, rel_path: &str, timestamp: &str) -> Result<()> {
        self.append_line(
            &self.index_path,
            &format!("{timestamp} {node}: {rel_path}"),
        )
    }

    fn touch(&self, path: &Path) -> Result<()> {
        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| LogIoFailure::new(path, err))?;
        Ok(())
    }

    fn append_line(&self, path: &Path, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| LogIoFailure::new(path, err))?;
        writeln!(file, "{line}").map_err(|err| LogIoFailure::new(path, err))?;
        Ok(())
    }
}
