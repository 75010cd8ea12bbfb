//! Side-effecting operations: task directories, the audit log, subprocess
//! execution and configuration.

pub mod audit;
pub mod config;
pub mod process;
pub mod project;
pub mod task;
